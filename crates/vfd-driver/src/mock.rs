//! Mock 传输层、宿主和模拟变频器
//!
//! 用于单元测试、集成测试和 CLI 的仿真模式，不依赖串口硬件。
//!
//! [`MockTransport`] 是可克隆的句柄：测试保留一份克隆用于注入故障和检查已发送的请求，
//! 另一份交给驱动。

use crate::host::{Alarm, SpindleHost};
use crate::transport::{ModbusTransport, Reply, SendMode, TransportError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use vfd_protocol::{
    CommandWord, DeviceProfile, Direction, ExceptionCode, FunctionCode, ModbusFrame,
    ModbusRequest, RegisterMap, RequestKind, RunStop, bytes_to_u16_be, exception_frame,
    read_register_reply,
};

// ============================================================================
// 模拟变频器
// ============================================================================

/// 模拟变频器
///
/// 按寄存器映射响应读写请求：
/// - 写命令寄存器：更新启停和方向
/// - 写频率寄存器：更新设定频率
/// - 读输出频率：运行中返回设定频率，停机返回 0
/// - 读最高频率：返回 `max_frequency`（0.01Hz）
///
/// 地址不匹配时不应答（传输层表现为超时）。
#[derive(Debug, Clone)]
pub struct SimulatedVfd {
    address: u8,
    map: RegisterMap,
    running: bool,
    reverse: bool,
    frequency: u16,
    max_frequency: u16,
    fault_resets: u32,
}

impl SimulatedVfd {
    pub fn new(address: u8, profile: DeviceProfile) -> Self {
        Self {
            address,
            map: profile.register_map(),
            running: false,
            reverse: false,
            frequency: 0,
            // 400.00Hz
            max_frequency: 40000,
            fault_resets: 0,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// 设定频率（寄存器值）
    pub fn frequency_code(&self) -> u16 {
        self.frequency
    }

    /// 输出频率（寄存器值）
    pub fn output_frequency(&self) -> u16 {
        if self.running { self.frequency } else { 0 }
    }

    pub fn set_max_frequency(&mut self, max_frequency: u16) {
        self.max_frequency = max_frequency;
    }

    pub fn fault_resets(&self) -> u32 {
        self.fault_resets
    }

    /// 处理一个请求，返回应答帧（地址不匹配时返回 None）
    pub fn handle(&mut self, request: &ModbusRequest) -> Option<ModbusFrame> {
        let frame = request.frame;
        if frame.address() != self.address {
            return None;
        }
        if frame.len < 6 {
            return Some(exception_frame(
                self.address,
                FunctionCode::WriteRegister,
                ExceptionCode::IllegalDataValue,
            ));
        }

        let register = bytes_to_u16_be([frame.adu[2], frame.adu[3]]);
        let value = bytes_to_u16_be([frame.adu[4], frame.adu[5]]);

        match FunctionCode::try_from(frame.function_byte()) {
            Ok(FunctionCode::WriteRegister) => Some(self.write(frame, register, value)),
            Ok(FunctionCode::ReadHoldingRegisters) => Some(self.read(register)),
            Err(_) => Some(ModbusFrame::new(&[
                self.address,
                frame.function_byte() | vfd_protocol::EXCEPTION_FLAG,
                ExceptionCode::IllegalFunction as u8,
            ])),
        }
    }

    fn write(&mut self, request: ModbusFrame, register: u16, value: u16) -> ModbusFrame {
        if register == self.map.command {
            let word = CommandWord::from(value as u8);
            match word.run_stop() {
                RunStop::Start | RunStop::Jog => self.running = true,
                RunStop::Stop => self.running = false,
                RunStop::NoFunction => {},
            }
            match word.direction() {
                Direction::Forward => self.reverse = false,
                Direction::Reverse => self.reverse = true,
                Direction::Toggle => self.reverse = !self.reverse,
                Direction::NoFunction => {},
            }
            if word.fault_reset() != vfd_protocol::FaultReset::NoFunction {
                self.fault_resets += 1;
            }
            request
        } else if register == self.map.frequency {
            self.frequency = value;
            request
        } else {
            exception_frame(
                self.address,
                FunctionCode::WriteRegister,
                ExceptionCode::IllegalDataAddress,
            )
        }
    }

    fn read(&self, register: u16) -> ModbusFrame {
        if register == self.map.output_frequency {
            read_register_reply(self.address, self.output_frequency())
        } else if Some(register) == self.map.max_frequency {
            read_register_reply(self.address, self.max_frequency)
        } else {
            exception_frame(
                self.address,
                FunctionCode::ReadHoldingRegisters,
                ExceptionCode::IllegalDataAddress,
            )
        }
    }
}

// ============================================================================
// Mock 传输层
// ============================================================================

struct MockInner {
    device: SimulatedVfd,
    up: bool,
    fail_remaining: usize,
    exceptions: VecDeque<ExceptionCode>,
    sent: Vec<(ModbusRequest, SendMode)>,
    pending: VecDeque<Reply>,
    silence_requests: usize,
}

/// Mock 传输层
///
/// - 阻塞发送：同步返回模拟设备的应答
/// - 非阻塞发送：应答进入待投递队列，由测试通过 [`take_pending`](Self::take_pending) 取出后投递
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockInner>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// 创建 Mock 传输层（总线上挂一台地址为 1 的 YL620）
    pub fn new() -> Self {
        Self::with_device(SimulatedVfd::new(1, DeviceProfile::Yl620))
    }

    pub fn with_device(device: SimulatedVfd) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInner {
                device,
                up: true,
                fail_remaining: 0,
                exceptions: VecDeque::new(),
                sent: Vec::new(),
                pending: VecDeque::new(),
                silence_requests: 0,
            })),
        }
    }

    pub fn set_up(&self, up: bool) {
        self.inner.lock().up = up;
    }

    /// 接下来的 `count` 次发送失败（超时）
    pub fn fail_next(&self, count: usize) {
        self.inner.lock().fail_remaining = count;
    }

    /// 接下来的一次应答替换为设备异常
    pub fn except_next(&self, code: ExceptionCode) {
        self.inner.lock().exceptions.push_back(code);
    }

    /// 所有已发送的请求（包括失败的尝试）
    pub fn sent(&self) -> Vec<(ModbusRequest, SendMode)> {
        self.inner.lock().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.inner.lock().sent.len()
    }

    /// 已发送请求的类型标签
    pub fn sent_kinds(&self) -> Vec<RequestKind> {
        self.inner.lock().sent.iter().map(|(r, _)| r.kind).collect()
    }

    pub fn clear_sent(&self) {
        self.inner.lock().sent.clear();
    }

    /// 取出所有待投递的非阻塞应答
    pub fn take_pending(&self) -> Vec<Reply> {
        self.inner.lock().pending.drain(..).collect()
    }

    /// 丢弃所有待投递的非阻塞应答
    pub fn drop_pending(&self) -> usize {
        let mut inner = self.inner.lock();
        let count = inner.pending.len();
        inner.pending.clear();
        count
    }

    pub fn silence_requests(&self) -> usize {
        self.inner.lock().silence_requests
    }

    /// 访问模拟设备
    pub fn device<R>(&self, f: impl FnOnce(&mut SimulatedVfd) -> R) -> R {
        f(&mut self.inner.lock().device)
    }
}

impl ModbusTransport for MockTransport {
    fn is_up(&self) -> bool {
        self.inner.lock().up
    }

    fn set_silence(&mut self) {
        self.inner.lock().silence_requests += 1;
    }

    fn send(
        &mut self,
        request: &ModbusRequest,
        mode: SendMode,
    ) -> Result<Option<Reply>, TransportError> {
        let mut inner = self.inner.lock();
        inner.sent.push((*request, mode));

        if !inner.up {
            return Err(TransportError::NotUp);
        }
        if inner.fail_remaining > 0 {
            inner.fail_remaining -= 1;
            return Err(TransportError::Timeout);
        }

        let reply = match inner.exceptions.pop_front() {
            Some(code) => Reply::exception(request.kind, code),
            None => match inner.device.handle(request) {
                Some(frame) => Reply::from_frame(request.kind, frame),
                None => return Err(TransportError::Timeout),
            },
        };

        match mode {
            SendMode::Blocking => Ok(Some(reply)),
            SendMode::NonBlocking => {
                inner.pending.push_back(reply);
                Ok(None)
            },
        }
    }
}

// ============================================================================
// Mock 宿主
// ============================================================================

/// Mock 宿主：可控时钟、冷启动标志和报警记录
#[derive(Default)]
pub struct MockHost {
    now_ms: AtomicU64,
    cold_start: AtomicBool,
    alarms: Mutex<Vec<Alarm>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// 时钟前进 `ms` 毫秒
    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::Relaxed);
    }

    pub fn set_cold_start(&self, cold_start: bool) {
        self.cold_start.store(cold_start, Ordering::Relaxed);
    }

    pub fn alarms(&self) -> Vec<Alarm> {
        self.alarms.lock().clone()
    }

    pub fn alarm_count(&self) -> usize {
        self.alarms.lock().len()
    }

    pub fn clear_alarms(&self) {
        self.alarms.lock().clear();
    }
}

impl SpindleHost for MockHost {
    fn elapsed_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Relaxed)
    }

    fn raise_alarm(&self, alarm: Alarm) {
        self.alarms.lock().push(alarm);
    }

    fn is_cold_start(&self) -> bool {
        self.cold_start.load(Ordering::Relaxed)
    }
}
