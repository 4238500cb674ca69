//! 驱动配置
//!
//! 配置在使用期间不可变。可从 TOML 加载：
//!
//! ```toml
//! profile = "yl620"
//! rpm_per_hz = 60.0
//! retries = 25
//! poll_interval_ms = 100
//! addresses = [1, 2]
//! query_max_rpm_on_select = false
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use vfd_protocol::{DeviceProfile, FrequencyScale};

/// 默认 Modbus 从站地址
pub const DEFAULT_MODBUS_ADDRESS: u8 = 0x01;

/// 驱动配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfdConfig {
    /// 变频器型号
    pub profile: DeviceProfile,
    /// 每 Hz 对应的 RPM（2 极电机为 60）
    pub rpm_per_hz: f32,
    /// 重试上限（传输失败的总尝试次数，以及设备异常的计数上限）
    pub retries: u32,
    /// 转速轮询最小间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 按宿主主轴编号索引的 Modbus 地址
    pub addresses: Vec<u8>,
    /// 选中时读取设备最高频率
    pub query_max_rpm_on_select: bool,
}

impl Default for VfdConfig {
    fn default() -> Self {
        Self {
            profile: DeviceProfile::Yl620,
            rpm_per_hz: 60.0,
            retries: 25,
            poll_interval_ms: 100,
            addresses: vec![DEFAULT_MODBUS_ADDRESS],
            query_max_rpm_on_select: false,
        }
    }
}

impl VfdConfig {
    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: VfdConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// 校验配置值
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rpm_per_hz.is_finite() || self.rpm_per_hz <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "rpm_per_hz must be positive, got {}",
                self.rpm_per_hz
            )));
        }
        if self.retries == 0 {
            return Err(ConfigError::Invalid("retries must be >= 1".to_string()));
        }
        // Modbus 从站地址范围 1..=247
        if let Some(bad) = self.addresses.iter().find(|a| !(1..=247).contains(*a)) {
            return Err(ConfigError::Invalid(format!(
                "modbus address {} out of range 1..=247",
                bad
            )));
        }
        Ok(())
    }

    /// 查找宿主主轴编号对应的 Modbus 地址
    ///
    /// 编号超出列表时使用第一个地址；列表为空时使用默认地址。
    pub fn modbus_address(&self, binding: u8) -> u8 {
        self.addresses
            .get(binding as usize)
            .or_else(|| self.addresses.first())
            .copied()
            .unwrap_or(DEFAULT_MODBUS_ADDRESS)
    }

    /// 频率寄存器换算
    pub fn frequency_scale(&self) -> Result<FrequencyScale, ConfigError> {
        let map = self.profile.register_map();
        FrequencyScale::new(self.rpm_per_hz, map.units_per_hz)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// 最高频率寄存器换算
    pub fn max_frequency_scale(&self) -> Result<FrequencyScale, ConfigError> {
        let map = self.profile.register_map();
        FrequencyScale::new(self.rpm_per_hz, map.max_frequency_units_per_hz)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
