//! 应答帧解析
//!
//! 传输层在校验 CRC 之后把应答交给本模块。异常应答（功能码带 0x80 标志）
//! 统一解析为 `ProtocolError::Exception`。

use crate::function::{ExceptionCode, FunctionCode, is_exception};
use crate::{ModbusFrame, ProtocolError, bytes_to_u16_be};

/// 提取异常应答的异常码（非异常应答返回 None）
///
/// 异常应答格式：地址 + (功能码 | 0x80) + 异常码
pub fn exception_code(frame: &ModbusFrame) -> Option<ExceptionCode> {
    if frame.len < 2 || !is_exception(frame.function_byte()) {
        return None;
    }
    let code = if frame.len >= 3 { frame.adu[2] } else { 0xFF };
    Some(ExceptionCode::from(code))
}

fn check_function(frame: &ModbusFrame, expected: FunctionCode) -> Result<(), ProtocolError> {
    if let Some(code) = exception_code(frame) {
        return Err(ProtocolError::Exception(code));
    }
    if frame.len < 2 {
        return Err(ProtocolError::InvalidLength {
            expected: 2,
            actual: frame.len as usize,
        });
    }
    let actual = frame.function_byte();
    if actual != u8::from(expected) {
        return Err(ProtocolError::UnexpectedFunction {
            expected: expected.into(),
            actual,
        });
    }
    Ok(())
}

/// 读单个保持寄存器的应答
///
/// 格式：地址 + 0x03 + 字节数(2) + 值(大端)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRegisterResponse {
    pub address: u8,
    pub value: u16,
}

impl TryFrom<ModbusFrame> for ReadRegisterResponse {
    type Error = ProtocolError;

    fn try_from(frame: ModbusFrame) -> Result<Self, Self::Error> {
        check_function(&frame, FunctionCode::ReadHoldingRegisters)?;

        if frame.len < 5 {
            return Err(ProtocolError::InvalidLength {
                expected: 5,
                actual: frame.len as usize,
            });
        }

        let byte_count = frame.adu[2];
        if byte_count != 2 {
            return Err(ProtocolError::InvalidValue {
                field: "byte_count".to_string(),
                value: byte_count as u16,
            });
        }

        Ok(Self {
            address: frame.address(),
            value: bytes_to_u16_be([frame.adu[3], frame.adu[4]]),
        })
    }
}

/// 写单个寄存器的应答（请求回显）
///
/// 格式：地址 + 0x06 + 寄存器(大端) + 值(大端)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRegisterResponse {
    pub address: u8,
    pub register: u16,
    pub value: u16,
}

impl TryFrom<ModbusFrame> for WriteRegisterResponse {
    type Error = ProtocolError;

    fn try_from(frame: ModbusFrame) -> Result<Self, Self::Error> {
        check_function(&frame, FunctionCode::WriteRegister)?;

        if frame.len < 6 {
            return Err(ProtocolError::InvalidLength {
                expected: 6,
                actual: frame.len as usize,
            });
        }

        Ok(Self {
            address: frame.address(),
            register: bytes_to_u16_be([frame.adu[2], frame.adu[3]]),
            value: bytes_to_u16_be([frame.adu[4], frame.adu[5]]),
        })
    }
}

/// 构建异常应答帧（供模拟设备和测试使用）
pub fn exception_frame(address: u8, function: FunctionCode, code: ExceptionCode) -> ModbusFrame {
    ModbusFrame::new(&[address, function.exception_byte(), code as u8])
}

/// 构建读单个寄存器的应答帧（供模拟设备和测试使用）
pub fn read_register_reply(address: u8, value: u16) -> ModbusFrame {
    let [hi, lo] = value.to_be_bytes();
    ModbusFrame::new(&[
        address,
        FunctionCode::ReadHoldingRegisters.into(),
        2,
        hi,
        lo,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_register_response() {
        let frame = ModbusFrame::new(&[0x01, 0x03, 0x02, 0x05, 0xDC]);
        let resp = ReadRegisterResponse::try_from(frame).unwrap();
        assert_eq!(resp.address, 0x01);
        assert_eq!(resp.value, 1500);
    }

    #[test]
    fn test_read_register_reply_builder() {
        let frame = read_register_reply(0x07, 0x1234);
        let resp = ReadRegisterResponse::try_from(frame).unwrap();
        assert_eq!(resp.address, 0x07);
        assert_eq!(resp.value, 0x1234);
    }

    #[test]
    fn test_read_register_response_short() {
        let frame = ModbusFrame::new(&[0x01, 0x03, 0x02, 0x05]);
        let err = ReadRegisterResponse::try_from(frame).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::InvalidLength {
                expected: 5,
                actual: 4
            }
        );
    }

    #[test]
    fn test_read_register_response_bad_byte_count() {
        let frame = ModbusFrame::new(&[0x01, 0x03, 0x04, 0x05, 0xDC]);
        assert!(matches!(
            ReadRegisterResponse::try_from(frame),
            Err(ProtocolError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_write_register_response() {
        let frame = ModbusFrame::new(&[0x01, 0x06, 0x20, 0x00, 0x00, 0x12]);
        let resp = WriteRegisterResponse::try_from(frame).unwrap();
        assert_eq!(resp.register, 0x2000);
        assert_eq!(resp.value, 0x0012);
    }

    #[test]
    fn test_unexpected_function() {
        let frame = ModbusFrame::new(&[0x01, 0x06, 0x20, 0x00, 0x00, 0x12]);
        let err = ReadRegisterResponse::try_from(frame).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::UnexpectedFunction {
                expected: 0x03,
                actual: 0x06
            }
        );
    }

    #[test]
    fn test_exception_response() {
        let frame = exception_frame(
            0x01,
            FunctionCode::WriteRegister,
            ExceptionCode::SlaveDeviceBusy,
        );
        assert_eq!(frame.data_slice(), &[0x01, 0x86, 0x06]);
        assert_eq!(exception_code(&frame), Some(ExceptionCode::SlaveDeviceBusy));

        let err = WriteRegisterResponse::try_from(frame).unwrap_err();
        assert_eq!(err, ProtocolError::Exception(ExceptionCode::SlaveDeviceBusy));
    }

    #[test]
    fn test_exception_code_absent() {
        let frame = ModbusFrame::new(&[0x01, 0x03, 0x02, 0x00, 0x00]);
        assert_eq!(exception_code(&frame), None);

        // 截断的异常应答：缺少异常码字节
        let frame = ModbusFrame::new(&[0x01, 0x83]);
        assert_eq!(exception_code(&frame), Some(ExceptionCode::Unknown));
    }
}
