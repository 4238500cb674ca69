//! 请求帧构建
//!
//! 提供三类请求帧（外加最高频率读取）的构建方法：
//! - 启停 + 方向：写命令寄存器
//! - 频率设定：写频率寄存器
//! - 频率读取：读输出频率寄存器
//!
//! 编码器只做纯转换，不阻塞、不重试；重试策略由驱动层负责。

use crate::function::FunctionCode;
use crate::registers::RegisterMap;
use crate::{CRC_LEN, ModbusFrame, ProtocolError, u16_to_bytes_be};
use bilge::prelude::*;

// ============================================================================
// 命令寄存器位域
// ============================================================================

/// 启停字段（Bit 1:0）
///
/// - b00: 无功能
/// - b01: 停机
/// - b10: 启动
/// - b11: 点动
#[bitsize(2)]
#[derive(FromBits, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStop {
    NoFunction,
    Stop,
    Start,
    Jog,
}

impl RunStop {
    /// 由主轴请求推导启停字段
    ///
    /// 关闭主轴或请求转速为 0 时总是编码为停机，与方向无关。
    pub fn for_request(on: bool, rpm: f32) -> Self {
        if !on || rpm == 0.0 {
            RunStop::Stop
        } else {
            RunStop::Start
        }
    }
}

/// 方向字段（Bit 5:4）
///
/// - b00: 无功能
/// - b01: 正转
/// - b10: 反转
/// - b11: 切换方向
#[bitsize(2)]
#[derive(FromBits, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    NoFunction,
    Forward,
    Reverse,
    Toggle,
}

impl Direction {
    /// 由 ccw 标志推导方向字段
    pub fn from_ccw(ccw: bool) -> Self {
        if ccw {
            Direction::Reverse
        } else {
            Direction::Forward
        }
    }
}

/// 故障复位字段（Bit 7:6）
///
/// - b00: 无功能
/// - b01: 复位一个故障标志
/// - b10: 复位全部故障标志
/// - b11: 保留
#[bitsize(2)]
#[derive(FromBits, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultReset {
    NoFunction,
    ResetOne,
    ResetAll,
    Reserved,
}

/// 命令寄存器低字节位域
///
/// bilge 默认使用 LSB first 位序，第一个字段对应 Bit 0。
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, PartialEq)]
pub struct CommandWord {
    pub run_stop: RunStop,       // Bit 1:0: 启停
    pub reserved: u2,            // Bit 3:2: 保留
    pub direction: Direction,    // Bit 5:4: 方向
    pub fault_reset: FaultReset, // Bit 7:6: 故障复位
}

// ============================================================================
// 频率换算
// ============================================================================

/// 转速与频率寄存器值之间的换算
///
/// 寄存器值 = round(RPM × units_per_hz / rpm_per_hz)。
/// 截断到设备分辨率（YL620A 为 0.1Hz）是预期行为。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyScale {
    rpm_per_hz: f32,
    units_per_hz: u16,
}

impl FrequencyScale {
    /// 创建换算器
    ///
    /// `rpm_per_hz` 必须为有限正数。
    pub fn new(rpm_per_hz: f32, units_per_hz: u16) -> Result<Self, ProtocolError> {
        if !rpm_per_hz.is_finite() || rpm_per_hz <= 0.0 {
            return Err(ProtocolError::InvalidScale(rpm_per_hz));
        }
        if units_per_hz == 0 {
            return Err(ProtocolError::InvalidValue {
                field: "units_per_hz".to_string(),
                value: units_per_hz,
            });
        }

        Ok(Self {
            rpm_per_hz,
            units_per_hz,
        })
    }

    pub fn rpm_per_hz(&self) -> f32 {
        self.rpm_per_hz
    }

    pub fn units_per_hz(&self) -> u16 {
        self.units_per_hz
    }

    /// RPM -> 寄存器值（负数和 NaN 编码为 0，超出范围饱和到 u16::MAX）
    pub fn rpm_to_code(&self, rpm: f32) -> u16 {
        let code = (rpm.max(0.0) * self.units_per_hz as f32 / self.rpm_per_hz).round();
        code.min(u16::MAX as f32) as u16
    }

    /// 寄存器值 -> RPM
    pub fn code_to_rpm(&self, code: u16) -> f32 {
        code as f32 * self.rpm_per_hz / self.units_per_hz as f32
    }

    /// 一个设备分辨率单位对应的 RPM
    pub fn rpm_quantum(&self) -> f32 {
        self.rpm_per_hz / self.units_per_hz as f32
    }
}

// ============================================================================
// 请求帧
// ============================================================================

/// 请求类型标签
///
/// 随每个请求发出，应答时原样带回，用于应答分派。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// 频率设定
    SetSpeed,
    /// 启停 + 方向
    SetStatus,
    /// 读输出频率
    GetSpeed,
    /// 读最高频率（预留）
    GetMaxSpeed,
}

/// 带标签的 Modbus 请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModbusRequest {
    /// 请求类型标签
    pub kind: RequestKind,
    /// 请求帧（地址 + PDU）
    pub frame: ModbusFrame,
    /// 期望应答长度（含 CRC）
    pub reply_len: u8,
}

/// 构建写单个寄存器请求帧
pub fn write_register_frame(address: u8, register: u16, value: u16) -> ModbusFrame {
    let reg = u16_to_bytes_be(register);
    let val = u16_to_bytes_be(value);
    ModbusFrame::new(&[
        address,
        FunctionCode::WriteRegister.into(),
        reg[0],
        reg[1],
        val[0],
        val[1],
    ])
}

/// 构建读保持寄存器请求帧
pub fn read_holding_frame(address: u8, register: u16, count: u16) -> ModbusFrame {
    let reg = u16_to_bytes_be(register);
    let cnt = u16_to_bytes_be(count);
    ModbusFrame::new(&[
        address,
        FunctionCode::ReadHoldingRegisters.into(),
        reg[0],
        reg[1],
        cnt[0],
        cnt[1],
    ])
}

/// 写单个寄存器的应答为请求回显（6 字节 + CRC）
const WRITE_REPLY_LEN: u8 = 6 + CRC_LEN as u8;
/// 读单个寄存器的应答：地址 + 功能码 + 字节数 + 2 字节数据 + CRC
const READ_ONE_REPLY_LEN: u8 = 5 + CRC_LEN as u8;

/// 启停 + 方向指令
#[derive(Debug, Clone, Copy)]
pub struct StatusCommand {
    pub address: u8,
    pub word: CommandWord,
}

impl StatusCommand {
    /// 创建启停 + 方向指令
    pub fn new(address: u8, run_stop: RunStop, direction: Direction) -> Self {
        let mut word = CommandWord::from(u8::new(0));
        word.set_run_stop(run_stop);
        word.set_direction(direction);
        Self { address, word }
    }

    /// 创建复位全部故障标志的指令（不改变启停和方向）
    pub fn reset_faults(address: u8) -> Self {
        let mut word = CommandWord::from(u8::new(0));
        word.set_fault_reset(FaultReset::ResetAll);
        Self { address, word }
    }

    /// 命令字节值
    pub fn status_byte(&self) -> u8 {
        u8::from(self.word)
    }

    /// 转换为请求
    pub fn to_request(self, map: &RegisterMap) -> ModbusRequest {
        ModbusRequest {
            kind: RequestKind::SetStatus,
            frame: write_register_frame(self.address, map.command, self.status_byte() as u16),
            reply_len: WRITE_REPLY_LEN,
        }
    }
}

/// 频率设定指令
#[derive(Debug, Clone, Copy)]
pub struct FrequencyCommand {
    pub address: u8,
    /// 寄存器值（设备频率单位）
    pub code: u16,
}

impl FrequencyCommand {
    /// 从转速创建频率设定指令
    pub fn from_rpm(address: u8, rpm: f32, scale: &FrequencyScale) -> Self {
        Self {
            address,
            code: scale.rpm_to_code(rpm),
        }
    }

    /// 转换为请求
    pub fn to_request(self, map: &RegisterMap) -> ModbusRequest {
        ModbusRequest {
            kind: RequestKind::SetSpeed,
            frame: write_register_frame(self.address, map.frequency, self.code),
            reply_len: WRITE_REPLY_LEN,
        }
    }
}

/// 构建输出频率读取请求
pub fn read_output_frequency(address: u8, map: &RegisterMap) -> ModbusRequest {
    ModbusRequest {
        kind: RequestKind::GetSpeed,
        frame: read_holding_frame(address, map.output_frequency, 1),
        reply_len: READ_ONE_REPLY_LEN,
    }
}

/// 构建最高频率读取请求（型号不支持时返回 None）
pub fn read_max_frequency(address: u8, map: &RegisterMap) -> Option<ModbusRequest> {
    map.max_frequency.map(|register| ModbusRequest {
        kind: RequestKind::GetMaxSpeed,
        frame: read_holding_frame(address, register, 1),
        reply_len: READ_ONE_REPLY_LEN,
    })
}
