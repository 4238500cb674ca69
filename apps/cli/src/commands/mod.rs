//! 命令定义和实现

pub mod config;
pub mod encode;
pub mod simulate;

pub use config::ConfigCommand;
pub use encode::EncodeCommand;
pub use simulate::SimulateCommand;

use anyhow::{Context, Result};
use std::path::Path;
use vfd_driver::VfdConfig;
use vfd_protocol::ModbusFrame;

/// 加载驱动配置（未指定路径时使用默认配置）
pub fn load_config(path: Option<&Path>) -> Result<VfdConfig> {
    match path {
        Some(path) => VfdConfig::load(path)
            .with_context(|| format!("加载配置文件失败: {}", path.display())),
        None => Ok(VfdConfig::default()),
    }
}

/// 以十六进制打印帧（不含 CRC）
pub fn format_frame(frame: &ModbusFrame) -> String {
    frame
        .data_slice()
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_frame() {
        let frame = ModbusFrame::new(&[0x01, 0x06, 0x20, 0x00, 0x00, 0x12]);
        assert_eq!(format_frame(&frame), "01 06 20 00 00 12");
    }

    #[test]
    fn test_load_config_default() {
        let config = load_config(None).unwrap();
        assert_eq!(config, VfdConfig::default());
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "profile = \"gs20\"\nretries = 5").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.retries, 5);
        assert_eq!(config.profile, vfd_protocol::DeviceProfile::Gs20);
    }

    #[test]
    fn test_load_config_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "retries = 0").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(format!("{:#}", err).contains("retries"));
    }
}
