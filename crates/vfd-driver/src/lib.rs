//! 变频器主轴驱动层
//!
//! 本 crate 把 CNC 控制器的通用主轴接口翻译为 Modbus RTU 请求，包括：
//! - 启停、换向、设速（阻塞 / 非阻塞）
//! - 输出频率轮询与到速判定
//! - 传输失败重试、设备异常计数与报警升级
//! - 主轴选择、设置变更与选项报告（[`HostObserver`] 通知链）
//!
//! # 使用场景
//!
//! 宿主提供 [`ModbusTransport`] 和 [`SpindleHost`] 的实现，
//! 通过 [`VfdBuilder`] 注册主轴，再把返回的实例挂到 [`ObserverChain`] 上。
//! 非阻塞请求的应答由宿主的总线轮询循环通过 [`VfdSpindle::on_reply`] 投递。

mod binder;
mod builder;
pub mod config;
pub mod correlator;
mod error;
pub mod hooks;
pub mod host;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod retry;
mod spindle;
pub mod state;
pub mod transport;

pub use builder::VfdBuilder;
pub use config::VfdConfig;
pub use correlator::{Correlation, Correlator};
pub use error::{ConfigError, DriverError};
pub use hooks::{HostObserver, ObserverChain};
pub use host::{
    Alarm, Capabilities, HostSettings, SettingsChanged, SharedDescriptor, SpindleDescriptor,
    SpindleHost, SpindleId, SpindleRegistry, SpindleSelection,
};
pub use retry::{ExceptionCounter, OperationState};
pub use spindle::VfdSpindle;
pub use state::*;
pub use transport::{
    ModbusTransport, Reply, ReplyOutcome, SendMode, SharedTransport, TransportError, shared,
};
