//! Modbus 功能码与异常码

/// 异常应答标志（功能码最高位）
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Modbus 功能码（变频器只用到读保持寄存器和写单个寄存器）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, num_enum::TryFromPrimitive, num_enum::IntoPrimitive,
)]
#[repr(u8)]
pub enum FunctionCode {
    /// 读保持寄存器
    ReadHoldingRegisters = 0x03,
    /// 写单个寄存器
    WriteRegister = 0x06,
}

impl FunctionCode {
    /// 对应的异常应答功能码
    pub fn exception_byte(self) -> u8 {
        u8::from(self) | EXCEPTION_FLAG
    }
}

/// Modbus 异常码（设备 NACK）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, num_enum::FromPrimitive)]
#[repr(u8)]
pub enum ExceptionCode {
    /// 非法功能
    IllegalFunction = 0x01,
    /// 非法数据地址
    IllegalDataAddress = 0x02,
    /// 非法数据值
    IllegalDataValue = 0x03,
    /// 从站设备故障
    SlaveDeviceFailure = 0x04,
    /// 确认（处理中）
    Acknowledge = 0x05,
    /// 从站设备忙
    SlaveDeviceBusy = 0x06,
    /// 存储奇偶性差错
    MemoryParityError = 0x08,
    /// 网关路径不可用
    GatewayPathUnavailable = 0x0A,
    /// 网关目标设备无响应
    GatewayTargetFailed = 0x0B,
    /// 未知异常码
    #[default]
    Unknown = 0xFF,
}

/// 判断功能码字节是否带异常标志
pub fn is_exception(function_byte: u8) -> bool {
    function_byte & EXCEPTION_FLAG != 0
}
