//! 驱动层错误类型定义

use crate::transport::TransportError;
use thiserror::Error;
use vfd_protocol::{ProtocolError, RequestKind};

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML 解析失败
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// 配置值无效
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 传输层错误
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 重试次数耗尽
    #[error("{kind:?} failed after {attempts} attempts: {last}")]
    Exhausted {
        kind: RequestKind,
        attempts: u32,
        last: TransportError,
    },

    /// 主轴未被选中
    #[error("Spindle is not selected")]
    NotSelected,

    /// 同一操作正在进行中
    #[error("{0:?} is already in progress")]
    Reentrant(RequestKind),

    /// 构建参数缺失
    #[error("Missing builder field: {0}")]
    MissingField(&'static str),

    /// 宿主主轴注册表已满
    #[error("Spindle registry is full")]
    RegistryFull,
}
