//! Modbus 传输层抽象
//!
//! 驱动只通过 [`ModbusTransport`] 访问总线：CRC、串口收发、帧间静默和超时都由实现方负责。
//! 同一条总线可能挂多台变频器，因此传输层以 [`SharedTransport`] 的形式在多个主轴实例间共享。
//!
//! # 应答投递
//!
//! - 阻塞发送：传输层完成收发后直接返回 `Ok(Some(reply))`
//! - 非阻塞发送：返回 `Ok(None)`，应答由宿主的轮询循环稍后通过
//!   [`VfdSpindle::on_reply`](crate::VfdSpindle::on_reply) 投递；也可能被静默丢弃

use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use vfd_protocol::{ExceptionCode, ModbusFrame, ModbusRequest, RequestKind, exception_code};

/// 传输层错误（一次收发未能完成）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// 总线未就绪
    #[error("Modbus transport is not up")]
    NotUp,

    /// 应答超时
    #[error("Reply timeout")]
    Timeout,

    /// CRC 校验失败
    #[error("CRC mismatch")]
    Crc,

    /// 发送队列已满（非阻塞发送）
    #[error("Transmit queue full")]
    QueueFull,

    /// 底层 IO 错误
    #[error("IO error: {0}")]
    Io(String),
}

/// 发送模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    /// 阻塞：调用方等待收发完成
    Blocking,
    /// 非阻塞：排队后立即返回
    NonBlocking,
}

/// 应答内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// 正常应答帧
    Response(ModbusFrame),
    /// 设备异常应答（NACK）
    Exception(ExceptionCode),
}

/// 带请求类型标签的应答
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub kind: RequestKind,
    pub outcome: ReplyOutcome,
}

impl Reply {
    /// 由应答帧构建（功能码带异常标志时解析为异常应答）
    pub fn from_frame(kind: RequestKind, frame: ModbusFrame) -> Self {
        let outcome = match exception_code(&frame) {
            Some(code) => ReplyOutcome::Exception(code),
            None => ReplyOutcome::Response(frame),
        };
        Self { kind, outcome }
    }

    pub fn exception(kind: RequestKind, code: ExceptionCode) -> Self {
        Self {
            kind,
            outcome: ReplyOutcome::Exception(code),
        }
    }

    pub fn is_exception(&self) -> bool {
        matches!(self.outcome, ReplyOutcome::Exception(_))
    }
}

/// Modbus 传输层 Trait
pub trait ModbusTransport {
    /// 总线是否就绪
    fn is_up(&self) -> bool;

    /// 请求一段总线静默期（在访问本设备之前调用）
    fn set_silence(&mut self);

    /// 发送请求
    ///
    /// 返回 `Err` 表示本次收发未能完成（由驱动决定是否重试）。
    fn send(
        &mut self,
        request: &ModbusRequest,
        mode: SendMode,
    ) -> Result<Option<Reply>, TransportError>;
}

/// 多个主轴实例共享的传输层
pub type SharedTransport = Arc<Mutex<dyn ModbusTransport + Send>>;

/// 包装为共享传输层
pub fn shared<T: ModbusTransport + Send + 'static>(transport: T) -> SharedTransport {
    Arc::new(Mutex::new(transport))
}
