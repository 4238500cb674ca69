//! 变频器主轴
//!
//! [`VfdSpindle`] 是宿主通用主轴接口调用的操作集合：把启停、设速、查询翻译成总线请求，
//! 由 [`retry`](crate::retry) 监督重试，由 [`correlator`](crate::correlator) 处理应答。
//!
//! # 执行模型
//!
//! 单线程协作式：驱动内部不创建线程，也不做调度。阻塞发送在传输层内部等待收发完成。
//! 阻塞发送拿到的应答在对应操作回到 `Idle`/`Failed` 之后才分派，
//! 因此分派触发的重发不会重入正在执行的重试循环。
//!
//! # 锁
//!
//! 实例状态（[`VfdContext`]）和共享传输层各有一把锁，任何时候最多持有一把；
//! 分派应答时不持有传输层的锁。

use crate::config::VfdConfig;
use crate::correlator::{Correlation, Correlator};
use crate::error::DriverError;
use crate::host::{Alarm, SharedDescriptor, SpindleHost, SpindleId, SpindleSelection};
use crate::retry::{ExceptionCounter, OperationState, send_once, send_with_retries};
use crate::state::{DataRequest, RPM_INVALID, SpindleData, SpindleState};
use crate::transport::{Reply, SharedTransport};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};
use vfd_protocol::{
    Direction, FrequencyCommand, FrequencyScale, RegisterMap, RequestKind, RunStop,
    StatusCommand, read_max_frequency, read_output_frequency,
};

/// 主轴实例状态
pub(crate) struct VfdContext {
    /// 当前 Modbus 地址（选中时解析）
    pub(crate) address: u8,
    /// 当前选择（未被选中时为 None）
    pub(crate) selection: Option<SpindleSelection>,
    pub(crate) state: SpindleState,
    pub(crate) data: SpindleData,
    /// 启停写入的状态机
    pub(crate) status_op: OperationState,
    /// 转速设定的状态机
    pub(crate) speed_op: OperationState,
    pub(crate) exceptions: ExceptionCounter,
    pub(crate) last_poll_ms: Option<u64>,
    pub(crate) rpm_max: Option<f32>,
    /// 待分派的应答
    inbox: VecDeque<Reply>,
    /// 正在分派应答（分派过程中到达的应答排队）
    correlating: bool,
}

impl VfdContext {
    fn new(address: u8, retries: u32) -> Self {
        Self {
            address,
            selection: None,
            state: SpindleState::default(),
            data: SpindleData::default(),
            status_op: OperationState::Idle,
            speed_op: OperationState::Idle,
            exceptions: ExceptionCounter::new(retries),
            last_poll_ms: None,
            rpm_max: None,
            inbox: VecDeque::new(),
            correlating: false,
        }
    }

    pub(crate) fn is_selected(&self) -> bool {
        self.selection.is_some()
    }
}

/// 变频器主轴
///
/// 通过 [`VfdBuilder`](crate::VfdBuilder) 创建并注册到宿主的主轴注册表。
/// 实例以 `Arc` 共享：一份交给宿主的主轴接口，一份作为 [`HostObserver`](crate::HostObserver)
/// 挂到通知链上。
///
/// 所有会访问总线的操作在主轴未被选中时都是空操作（返回 [`DriverError::NotSelected`]）。
pub struct VfdSpindle {
    pub(crate) id: SpindleId,
    pub(crate) config: VfdConfig,
    map: RegisterMap,
    scale: FrequencyScale,
    correlator: Correlator,
    pub(crate) transport: SharedTransport,
    host: Arc<dyn SpindleHost>,
    pub(crate) descriptor: SharedDescriptor,
    pub(crate) ctx: Mutex<VfdContext>,
}

impl VfdSpindle {
    /// 创建主轴实例
    ///
    /// 通常通过 [`VfdBuilder`](crate::VfdBuilder) 调用。
    pub fn new(
        id: SpindleId,
        descriptor: SharedDescriptor,
        config: VfdConfig,
        transport: SharedTransport,
        host: Arc<dyn SpindleHost>,
    ) -> Result<Self, DriverError> {
        config.validate()?;
        let scale = config.frequency_scale()?;
        let correlator = Correlator::new(scale, config.max_frequency_scale()?);
        let ctx = VfdContext::new(config.modbus_address(0), config.retries);

        Ok(Self {
            id,
            map: config.profile.register_map(),
            scale,
            correlator,
            config,
            transport,
            host,
            descriptor,
            ctx: Mutex::new(ctx),
        })
    }

    pub fn id(&self) -> SpindleId {
        self.id
    }

    pub fn config(&self) -> &VfdConfig {
        &self.config
    }

    pub fn descriptor(&self) -> &SharedDescriptor {
        &self.descriptor
    }

    /// 当前 Modbus 地址
    pub fn address(&self) -> u8 {
        self.ctx.lock().address
    }

    pub fn is_selected(&self) -> bool {
        self.ctx.lock().is_selected()
    }

    /// 设备最高转速（读到之前为 None）
    pub fn rpm_max(&self) -> Option<f32> {
        self.ctx.lock().rpm_max
    }

    /// 启停写入的状态
    pub fn status_op_state(&self) -> OperationState {
        self.ctx.lock().status_op
    }

    /// 转速设定的状态
    pub fn speed_op_state(&self) -> OperationState {
        self.ctx.lock().speed_op
    }

    /// 当前设备异常计数
    pub fn exception_count(&self) -> u32 {
        self.ctx.lock().exceptions.count()
    }

    /// 检查总线是否就绪
    pub fn configure(&self) -> bool {
        self.transport.lock().is_up()
    }

    /// 启停 + 方向
    ///
    /// 关闭或零转速总是编码为停机。方向相对上一次调用发生变化时，
    /// 编程转速在发送任何请求之前被置为 [`RPM_INVALID`]。
    /// 启停写入阻塞发送并重试；成功后阻塞设定转速，失败则报警并跳过转速设定。
    pub fn set_state(&self, state: SpindleState, rpm: f32) -> Result<(), DriverError> {
        let request = {
            let mut ctx = self.ctx.lock();
            if !ctx.is_selected() {
                debug!(id = self.id.0, "set_state ignored: spindle not selected");
                return Err(DriverError::NotSelected);
            }
            if ctx.status_op.is_busy() {
                warn!(state = ?ctx.status_op, "set_state rejected: status write in progress");
                return Err(DriverError::Reentrant(RequestKind::SetStatus));
            }

            if ctx.state.ccw != state.ccw {
                ctx.data.rpm_programmed = RPM_INVALID;
            }
            ctx.state.on = state.on;
            ctx.state.ccw = state.ccw;
            ctx.data.state_programmed.on = state.on;
            ctx.data.state_programmed.ccw = state.ccw;
            ctx.status_op = OperationState::Sending;

            StatusCommand::new(
                ctx.address,
                RunStop::for_request(state.on, rpm),
                Direction::from_ccw(state.ccw),
            )
            .to_request(&self.map)
        };

        let result = send_with_retries(&self.transport, &request, self.config.retries, |attempt| {
            self.ctx.lock().status_op = OperationState::Retrying { attempt };
        });

        match result {
            Ok(reply) => {
                self.ctx.lock().status_op = OperationState::Idle;
                if let Some(reply) = reply {
                    self.on_reply(reply);
                }
                self.set_rpm(rpm, true)
            },
            Err(e) => {
                self.ctx.lock().status_op = OperationState::Failed;
                error!(id = self.id.0, error = %e, "Spindle status write failed");
                self.host.raise_alarm(Alarm::Spindle);
                Err(e)
            },
        }
    }

    /// 设定转速
    ///
    /// - 阻塞：传输失败时重试，耗尽后报警
    /// - 非阻塞：单次尝试，失败静默丢弃
    ///
    /// 无论发送结果如何，都会更新编程转速和到速区间。
    pub fn set_rpm(&self, rpm: f32, blocking: bool) -> Result<(), DriverError> {
        let request = {
            let mut ctx = self.ctx.lock();
            if !ctx.is_selected() {
                debug!(id = self.id.0, "set_rpm ignored: spindle not selected");
                return Err(DriverError::NotSelected);
            }
            if ctx.speed_op.is_busy() {
                warn!(state = ?ctx.speed_op, "set_rpm rejected: speed set in progress");
                return Err(DriverError::Reentrant(RequestKind::SetSpeed));
            }
            ctx.speed_op = OperationState::Sending;

            FrequencyCommand::from_rpm(ctx.address, rpm, &self.scale).to_request(&self.map)
        };

        let outcome = if blocking {
            send_with_retries(&self.transport, &request, self.config.retries, |attempt| {
                self.ctx.lock().speed_op = OperationState::Retrying { attempt };
            })
        } else {
            Ok(send_once(&self.transport, &request))
        };

        let tolerance = self.descriptor.read().at_speed_tolerance;
        let reply = {
            let mut ctx = self.ctx.lock();
            ctx.data.set_at_speed_range(rpm, tolerance);
            ctx.speed_op = if outcome.is_ok() {
                OperationState::Idle
            } else {
                OperationState::Failed
            };
            outcome
        };

        match reply {
            Ok(Some(reply)) => {
                self.on_reply(reply);
                Ok(())
            },
            Ok(None) => Ok(()),
            Err(e) => {
                error!(id = self.id.0, rpm, error = %e, "Spindle speed set failed");
                self.host.raise_alarm(Alarm::Spindle);
                Err(e)
            },
        }
    }

    /// 跟踪转速（非阻塞设定）
    pub fn update_rpm(&self, rpm: f32) -> Result<(), DriverError> {
        self.set_rpm(rpm, false)
    }

    /// 查询主轴状态
    ///
    /// 每个轮询间隔最多发出一次非阻塞的输出频率读取（第一次调用总是发出），
    /// 立即返回缓存状态，`at_speed` 取自最近一次到速判定。
    pub fn get_state(&self) -> SpindleState {
        let now = self.host.elapsed_ms();
        let request = {
            let mut ctx = self.ctx.lock();
            let due = ctx
                .last_poll_ms
                .map_or(true, |last| now.saturating_sub(last) >= self.config.poll_interval_ms);
            if ctx.is_selected() && due {
                ctx.last_poll_ms = Some(now);
                Some(read_output_frequency(ctx.address, &self.map))
            } else {
                None
            }
        };

        if let Some(request) = request {
            if let Some(reply) = send_once(&self.transport, &request) {
                self.on_reply(reply);
            }
        }

        let mut ctx = self.ctx.lock();
        ctx.state.at_speed = ctx.data.state_programmed.at_speed;
        ctx.state
    }

    /// 读取派生数据快照（不产生总线请求）
    pub fn get_data(&self, request: DataRequest) -> SpindleData {
        trace!(?request, "get_data");
        self.ctx.lock().data
    }

    /// 读取设备最高频率（非阻塞）
    ///
    /// 型号没有最高频率寄存器时不发送任何请求。
    pub fn request_max_rpm(&self) -> Result<(), DriverError> {
        let request = {
            let ctx = self.ctx.lock();
            if !ctx.is_selected() {
                return Err(DriverError::NotSelected);
            }
            read_max_frequency(ctx.address, &self.map)
        };

        match request {
            Some(request) => {
                if let Some(reply) = send_once(&self.transport, &request) {
                    self.on_reply(reply);
                }
            },
            None => debug!(profile = ?self.config.profile, "No max frequency register"),
        }
        Ok(())
    }

    /// 投递应答
    ///
    /// 非阻塞请求的应答由宿主的总线轮询循环调用本方法投递。
    /// 分派过程中（例如重发转速时）同步到达的应答排队，由外层循环依次处理。
    pub fn on_reply(&self, reply: Reply) {
        {
            let mut ctx = self.ctx.lock();
            ctx.inbox.push_back(reply);
            if ctx.correlating {
                return;
            }
            ctx.correlating = true;
        }

        loop {
            let cold_start = self.host.is_cold_start();
            let correlation = {
                let mut ctx = self.ctx.lock();
                let Some(reply) = ctx.inbox.pop_front() else {
                    ctx.correlating = false;
                    break;
                };
                let ctx = &mut *ctx;
                let correlation =
                    self.correlator
                        .correlate(&reply, cold_start, &mut ctx.data, &mut ctx.exceptions);
                if let Correlation::MaxRpm(rpm) = correlation {
                    ctx.rpm_max = Some(rpm);
                }
                correlation
            };

            if let Some(rpm) = correlation.reissue_rpm() {
                if let Err(e) = self.set_rpm(rpm, false) {
                    debug!(error = %e, "Speed reissue skipped");
                }
            }
            if correlation.escalates() {
                error!(id = self.id.0, ?correlation, "Spindle device exception escalated");
                self.host.raise_alarm(Alarm::Spindle);
            }
        }
    }
}
