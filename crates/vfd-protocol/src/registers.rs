//! 变频器寄存器映射
//!
//! YL620A 的参数 Pnn.mm 对应寄存器地址高字节 nn、低字节 mm（十进制转十六进制），
//! 例如 P13.16 对应 0x0D10。通信控制寄存器位于 0x2000 段。

// ============================================================================
// Yalang YL620A
// ============================================================================

/// 主频率 P00.00（0.01Hz）
pub const YL620_REG_MAIN_FREQUENCY: u16 = 0x0000;
/// 频率下限 P03.08
pub const YL620_REG_FREQUENCY_LOWER_LIMIT: u16 = 0x0308;
/// 命令寄存器（启停/方向/故障复位）
pub const YL620_REG_COMMAND: u16 = 0x2000;
/// Modbus485 频率指令（0.1Hz，2500 = 250.0Hz）
pub const YL620_REG_FREQUENCY: u16 = 0x2001;
/// 目标频率
pub const YL620_REG_TARGET_FREQUENCY: u16 = 0x200A;
/// 输出频率
pub const YL620_REG_OUTPUT_FREQUENCY: u16 = 0x200B;
/// 输出电流
pub const YL620_REG_OUTPUT_CURRENT: u16 = 0x200C;

// ============================================================================
// Durapulse GS20
// ============================================================================

/// 命令寄存器
pub const GS20_REG_COMMAND: u16 = 0x2000;
/// 频率指令（0.01Hz）
pub const GS20_REG_FREQUENCY: u16 = 0x2001;
/// 输出频率
pub const GS20_REG_OUTPUT_FREQUENCY: u16 = 0x2103;

/// 寄存器映射
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    /// 命令寄存器（启停 + 方向）
    pub command: u16,
    /// 频率设定寄存器
    pub frequency: u16,
    /// 输出频率寄存器
    pub output_frequency: u16,
    /// 最高频率寄存器（部分型号不支持）
    pub max_frequency: Option<u16>,
    /// 频率寄存器分辨率（每 Hz 的单位数）
    pub units_per_hz: u16,
    /// 最高频率寄存器分辨率（每 Hz 的单位数）
    pub max_frequency_units_per_hz: u16,
}

/// 支持的变频器型号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DeviceProfile {
    /// Yalang YL620A（默认）
    #[default]
    Yl620,
    /// Durapulse GS20
    Gs20,
}

impl DeviceProfile {
    /// 获取寄存器映射
    pub const fn register_map(self) -> RegisterMap {
        match self {
            DeviceProfile::Yl620 => RegisterMap {
                command: YL620_REG_COMMAND,
                frequency: YL620_REG_FREQUENCY,
                output_frequency: YL620_REG_OUTPUT_FREQUENCY,
                max_frequency: Some(YL620_REG_MAIN_FREQUENCY),
                units_per_hz: 10,
                max_frequency_units_per_hz: 100,
            },
            DeviceProfile::Gs20 => RegisterMap {
                command: GS20_REG_COMMAND,
                frequency: GS20_REG_FREQUENCY,
                output_frequency: GS20_REG_OUTPUT_FREQUENCY,
                max_frequency: None,
                units_per_hz: 100,
                max_frequency_units_per_hz: 100,
            },
        }
    }

    /// 插件名称（用于选项报告）
    pub const fn display_name(self) -> &'static str {
        match self {
            DeviceProfile::Yl620 => "Yalang VFD YL620A",
            DeviceProfile::Gs20 => "Durapulse VFD GS20",
        }
    }

    /// 插件版本（用于选项报告）
    pub const fn version(self) -> &'static str {
        match self {
            DeviceProfile::Yl620 => "0.03",
            DeviceProfile::Gs20 => "v0.06",
        }
    }
}
