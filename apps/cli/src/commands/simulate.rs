//! 仿真命令
//!
//! 用真实的驱动逻辑驱动一台模拟变频器：选中 → 启动 → 周期轮询 → 停机，
//! 打印每次轮询看到的状态和报警。

use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;
use vfd_driver::mock::{MockHost, MockTransport, SimulatedVfd};
use vfd_driver::{
    DataRequest, HostSettings, ObserverChain, SettingsChanged, SpindleRegistry, SpindleState,
    VfdBuilder, VfdConfig, VfdSpindle, shared,
};

/// 仿真命令参数
#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// 目标转速（RPM）
    #[arg(short, long, default_value_t = 12000.0)]
    pub rpm: f32,

    /// 反转
    #[arg(long)]
    pub ccw: bool,

    /// 轮询次数
    #[arg(short, long, default_value_t = 5)]
    pub ticks: u32,

    /// 每次轮询之间的模拟时间（毫秒）
    #[arg(long, default_value_t = 100)]
    pub tick_ms: u64,

    /// 到速容差（百分比，负数禁用到速检测）
    #[arg(long, default_value_t = 5.0, allow_negative_numbers = true)]
    pub tolerance: f32,

    /// 启动时注入的传输失败次数
    #[arg(long, default_value_t = 0)]
    pub fail: usize,
}

/// 一次仿真的结果
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    /// 每次轮询看到的 (状态, 实测转速)
    pub polls: Vec<(SpindleState, f32)>,
    pub alarms: usize,
    pub rpm_max: Option<f32>,
}

struct Session {
    spindle: Arc<VfdSpindle>,
    mock: MockTransport,
    host: Arc<MockHost>,
}

impl Session {
    fn start(config: &VfdConfig, tolerance: f32) -> Result<Self> {
        let mut registry = SpindleRegistry::new();
        let mock = MockTransport::with_device(SimulatedVfd::new(
            config.modbus_address(0),
            config.profile,
        ));
        let host = Arc::new(MockHost::new());
        let spindle = VfdBuilder::new()
            .config(config.clone())
            .transport(shared(mock.clone()))
            .host(host.clone())
            .build(&mut registry)
            .context("注册主轴失败")?;

        let mut chain = ObserverChain::new();
        chain.add_observer(spindle.clone());
        chain.settings_changed(
            &HostSettings {
                at_speed_tolerance: tolerance,
            },
            SettingsChanged { spindle: true },
        );
        let selection = registry
            .select(spindle.id(), 0)
            .context("主轴未注册")?;
        chain.spindle_selected(&selection);

        Ok(Self {
            spindle,
            mock,
            host,
        })
    }

    /// 投递挂起的非阻塞应答（宿主总线轮询循环的职责）
    fn pump(&self) {
        for reply in self.mock.take_pending() {
            self.spindle.on_reply(reply);
        }
    }
}

impl SimulateCommand {
    /// 运行仿真
    pub fn run(&self, config: &VfdConfig) -> Result<SimulationReport> {
        let session = Session::start(config, self.tolerance)?;
        if let Err(e) = session.spindle.request_max_rpm() {
            tracing::debug!(error = %e, "Max speed query skipped");
        }
        session.pump();

        let state = if self.ccw {
            SpindleState::ccw()
        } else {
            SpindleState::cw()
        };
        session.mock.fail_next(self.fail);
        if let Err(e) = session.spindle.set_state(state, self.rpm) {
            tracing::warn!(error = %e, "Spindle start failed");
        }

        let mut polls = Vec::with_capacity(self.ticks as usize);
        for _ in 0..self.ticks {
            session.host.advance(self.tick_ms);
            session.spindle.get_state();
            session.pump();
            let state = session.spindle.get_state();
            let data = session.spindle.get_data(DataRequest::Rpm);
            polls.push((state, data.rpm));
        }

        if let Err(e) = session.spindle.set_state(SpindleState::off(), 0.0) {
            tracing::warn!(error = %e, "Spindle stop failed");
        }
        session.pump();

        Ok(SimulationReport {
            polls,
            alarms: session.host.alarm_count(),
            rpm_max: session.spindle.rpm_max(),
        })
    }

    pub fn execute(&self, config: &VfdConfig) -> Result<()> {
        println!(
            "🔌 {} @ address {}",
            config.profile.display_name(),
            config.modbus_address(0)
        );

        let report = self.run(config)?;
        if let Some(rpm_max) = report.rpm_max {
            println!("max speed: {:.0} RPM", rpm_max);
        }
        for (i, (state, rpm)) in report.polls.iter().enumerate() {
            println!(
                "[{:>3}] on={} ccw={} at_speed={} rpm={:.1}",
                i, state.on, state.ccw, state.at_speed, rpm
            );
        }

        if report.alarms > 0 {
            println!("⚠️  spindle alarms raised: {}", report.alarms);
        } else {
            println!("✅ session finished without alarms");
        }
        Ok(())
    }
}
