//! 重试与失败升级
//!
//! 两类失败分开处理：
//!
//! - **传输失败**（一次收发未完成）：阻塞操作在紧循环里立即重试，最多 `retries` 次；
//!   非阻塞操作只尝试一次，失败即静默丢弃。
//! - **设备异常**（NACK）：由 [`ExceptionCounter`] 累计，达到上限时报警并清零。
//!
//! 每个会改变设备状态的操作（启停写入、转速设定）各自持有一个 [`OperationState`]，
//! 处于 `Sending`/`Retrying` 时拒绝重入。

use crate::error::DriverError;
use crate::transport::{Reply, SendMode, SharedTransport, TransportError};
use tracing::{trace, warn};
use vfd_protocol::ModbusRequest;

/// 单个操作的状态机
///
/// ```text
/// Idle ──send──> Sending ──fail──> Retrying{n} ──ok──> Idle
///                   │                  │
///                   └──ok──> Idle      └──exhausted──> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationState {
    /// 空闲（默认）
    #[default]
    Idle,
    /// 首次发送中
    Sending,
    /// 第 `attempt` 次尝试失败后重试中
    Retrying { attempt: u32 },
    /// 上一次执行耗尽重试次数
    Failed,
}

impl OperationState {
    /// 是否正在执行（此时拒绝重入）
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Sending | Self::Retrying { .. })
    }

    pub fn is_failed(self) -> bool {
        self == Self::Failed
    }
}

/// 设备异常计数器（每个主轴实例一个，所有请求类型共享）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionCounter {
    count: u32,
    bound: u32,
}

impl ExceptionCounter {
    pub fn new(bound: u32) -> Self {
        Self { count: 0, bound }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn bound(&self) -> u32 {
        self.bound
    }

    /// 任意非异常应答都会清零
    pub fn clear(&mut self) {
        self.count = 0;
    }

    /// 记录一次异常，返回是否达到上限（达到上限时自动清零）
    pub fn record(&mut self) -> bool {
        self.count += 1;
        if self.count >= self.bound {
            self.count = 0;
            true
        } else {
            false
        }
    }
}

/// 阻塞发送，传输失败时立即重试
///
/// 最多尝试 `retries` 次（至少 1 次）。每次失败后调用 `on_failure(attempt)`，
/// 用于把操作状态推进到 `Retrying`。
pub fn send_with_retries<F>(
    transport: &SharedTransport,
    request: &ModbusRequest,
    retries: u32,
    mut on_failure: F,
) -> Result<Option<Reply>, DriverError>
where
    F: FnMut(u32),
{
    let attempts = retries.max(1);
    let mut last = TransportError::Timeout;

    for attempt in 1..=attempts {
        let result = transport.lock().send(request, SendMode::Blocking);
        match result {
            Ok(reply) => {
                if attempt > 1 {
                    trace!(kind = ?request.kind, attempt, "Blocking send succeeded after retry");
                }
                return Ok(reply);
            },
            Err(e) => {
                trace!(kind = ?request.kind, attempt, error = %e, "Blocking send failed");
                on_failure(attempt);
                last = e;
            },
        }
    }

    warn!(
        kind = ?request.kind,
        attempts,
        error = %last,
        "Blocking send exhausted retries"
    );
    Err(DriverError::Exhausted {
        kind: request.kind,
        attempts,
        last,
    })
}

/// 非阻塞发送（单次尝试）
///
/// 失败只记录日志，返回 `None`。
pub fn send_once(transport: &SharedTransport, request: &ModbusRequest) -> Option<Reply> {
    let result = transport.lock().send(request, SendMode::NonBlocking);
    match result {
        Ok(reply) => reply,
        Err(e) => {
            trace!(kind = ?request.kind, error = %e, "Non-blocking send dropped");
            None
        },
    }
}
