//! # VFD CLI
//!
//! Command-line tool for the Modbus VFD spindle driver.
//!
//! ```bash
//! # 打印启停和设速请求帧
//! vfd-cli encode --state cw --rpm 12000
//!
//! # 对模拟变频器运行一次主轴会话
//! vfd-cli simulate --rpm 12000 --ticks 10
//!
//! # 查看生效的配置
//! vfd-cli --config spindle.toml config show
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{ConfigCommand, EncodeCommand, SimulateCommand};

/// VFD CLI - 变频器主轴命令行工具
#[derive(Parser, Debug)]
#[command(name = "vfd-cli")]
#[command(about = "Encode Modbus VFD spindle frames and simulate spindle sessions", long_about = None)]
#[command(version)]
struct Cli {
    /// 驱动配置文件（TOML），未指定时使用默认配置
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 打印启停和设速请求帧
    Encode {
        #[command(flatten)]
        args: EncodeCommand,
    },

    /// 对模拟变频器运行一次主轴会话
    Simulate {
        #[command(flatten)]
        args: SimulateCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vfd_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Encode { args } => args.execute(&config),
        Commands::Simulate { args } => args.execute(&config),
        Commands::Config(cmd) => cmd.execute(&config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_encode() {
        let cli = Cli::try_parse_from(["vfd-cli", "encode", "--state", "ccw", "--rpm", "6000"])
            .unwrap();
        match cli.command {
            Commands::Encode { args } => assert_eq!(args.rpm, 6000.0),
            other => panic!("Expected Encode, got {:?}", other),
        }
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_global_config() {
        let cli = Cli::try_parse_from(["vfd-cli", "config", "show", "--config", "spindle.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("spindle.toml")));
        assert!(matches!(cli.command, Commands::Config(ConfigCommand::Show)));
    }
}
