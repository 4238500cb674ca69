//! # VFD Protocol
//!
//! 变频器（VFD）Modbus RTU 协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `function`: Modbus 功能码与异常码
//! - `registers`: 各型号变频器的寄存器映射
//! - `command`: 请求帧构建（启停/方向、频率设定、频率读取）
//! - `response`: 应答帧解析
//!
//! ## 字节序
//!
//! Modbus 寄存器值使用大端字节序（高字节在前）。
//! CRC 校验由传输层负责，本模块构建的帧只包含地址和 PDU。

pub mod command;
pub mod function;
pub mod registers;
pub mod response;

// 重新导出常用类型
pub use command::*;
pub use function::*;
pub use registers::*;
pub use response::*;

use thiserror::Error;

/// 帧缓冲区最大长度（地址 + PDU，不含 CRC）
pub const MAX_FRAME_LEN: usize = 16;

/// CRC 校验长度（由传输层追加/校验）
pub const CRC_LEN: usize = 2;

/// Modbus RTU 帧（地址 + PDU，不含 CRC）
///
/// # 设计目的
///
/// `ModbusFrame` 是协议层和传输层之间的中间抽象：
/// - 协议层只负责构建/解析地址和 PDU
/// - 传输层负责追加 CRC、串口收发和超时
///
/// # 设计特性
///
/// - **Copy trait**：零成本复制
/// - **固定缓冲区**：避免堆分配
///
/// # 示例
///
/// ```rust
/// use vfd_protocol::ModbusFrame;
///
/// let frame = ModbusFrame::new(&[0x01, 0x06, 0x20, 0x00, 0x00, 0x12]);
/// assert_eq!(frame.address(), 0x01);
/// assert_eq!(frame.function_byte(), 0x06);
/// assert_eq!(frame.data_slice().len(), 6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModbusFrame {
    /// 帧数据（未使用部分为 0）
    pub adu: [u8; MAX_FRAME_LEN],

    /// 有效数据长度
    pub len: u8,
}

impl ModbusFrame {
    /// 从字节切片创建帧（超出 `MAX_FRAME_LEN` 的部分被截断）
    pub fn new(data: &[u8]) -> Self {
        let mut adu = [0u8; MAX_FRAME_LEN];
        let len = data.len().min(MAX_FRAME_LEN);
        adu[..len].copy_from_slice(&data[..len]);

        Self {
            adu,
            len: len as u8,
        }
    }

    /// 获取数据切片（只包含有效数据）
    pub fn data_slice(&self) -> &[u8] {
        &self.adu[..self.len as usize]
    }

    /// 从站地址（Byte 0）
    pub fn address(&self) -> u8 {
        self.adu[0]
    }

    /// 功能码原始字节（Byte 1，可能带异常位）
    pub fn function_byte(&self) -> u8 {
        self.adu[1]
    }

    /// 线路上的发送长度（含 CRC）
    pub fn wire_len(&self) -> usize {
        self.len as usize + CRC_LEN
    }
}

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Unexpected function code: expected 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedFunction { expected: u8, actual: u8 },

    #[error("Device exception: {0:?}")]
    Exception(ExceptionCode),

    #[error("Invalid frequency scale: {0} rpm/Hz")]
    InvalidScale(f32),

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: u16 },
}

/// 大端字节序转 u16
pub fn bytes_to_u16_be(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

/// u16 转大端字节序
pub fn u16_to_bytes_be(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}
