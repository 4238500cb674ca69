//! 配置管理命令
//!
//! 查看生效的驱动配置，或生成一份默认配置文件。

use anyhow::{Context, Result};
use clap::Subcommand;
use std::fs;
use std::path::PathBuf;
use vfd_driver::VfdConfig;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印生效的配置（TOML）
    Show,

    /// 写出默认配置
    Init {
        /// 输出路径
        #[arg(default_value = "vfd.toml")]
        path: PathBuf,

        /// 覆盖已存在的文件
        #[arg(short, long)]
        force: bool,
    },

    /// 检查配置
    Check,
}

impl ConfigCommand {
    pub fn execute(self, config: &VfdConfig) -> Result<()> {
        match self {
            ConfigCommand::Show => Self::show_(config),

            ConfigCommand::Init { path, force } => Self::init_(path, force),

            ConfigCommand::Check => Self::check_(config),
        }
    }

    fn show_(config: &VfdConfig) -> Result<()> {
        print!("{}", config.to_toml_string()?);
        Ok(())
    }

    fn init_(path: PathBuf, force: bool) -> Result<()> {
        if path.exists() && !force {
            anyhow::bail!("{} 已存在（使用 --force 覆盖）", path.display());
        }

        let content = VfdConfig::default().to_toml_string()?;
        fs::write(&path, content).context("写入配置文件失败")?;
        println!("✅ 已写入默认配置: {}", path.display());
        Ok(())
    }

    fn check_(config: &VfdConfig) -> Result<()> {
        config.validate()?;

        let scale = config.frequency_scale()?;
        println!("✅ 配置有效");
        println!("  型号: {} {}", config.profile.display_name(), config.profile.version());
        println!("  分辨率: {:.2} RPM", scale.rpm_quantum());
        println!("  重试上限: {}", config.retries);
        println!("  轮询间隔: {} ms", config.poll_interval_ms);
        println!("  地址: {:?}", config.addresses);
        Ok(())
    }
}
