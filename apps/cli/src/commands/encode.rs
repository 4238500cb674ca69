//! 帧编码命令
//!
//! 按驱动配置打印一次启停 + 设速会发出的请求帧，不访问总线。

use super::format_frame;
use anyhow::Result;
use clap::{Args, ValueEnum};
use vfd_driver::VfdConfig;
use vfd_protocol::{
    Direction, FrequencyCommand, ModbusRequest, RunStop, StatusCommand, read_max_frequency,
    read_output_frequency,
};

/// 主轴状态参数
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateArg {
    Off,
    Cw,
    Ccw,
}

impl StateArg {
    fn is_on(self) -> bool {
        self != StateArg::Off
    }

    fn is_ccw(self) -> bool {
        self == StateArg::Ccw
    }
}

/// 帧编码命令参数
#[derive(Args, Debug)]
pub struct EncodeCommand {
    /// 主轴状态
    #[arg(short, long, value_enum, default_value = "cw")]
    pub state: StateArg,

    /// 目标转速（RPM）
    #[arg(short, long, default_value_t = 0.0)]
    pub rpm: f32,

    /// 宿主主轴编号（用于查找 Modbus 地址）
    #[arg(short, long, default_value_t = 0)]
    pub binding: u8,

    /// 同时打印查询请求（输出频率、最高频率）
    #[arg(long)]
    pub queries: bool,

    /// 同时打印故障复位请求
    #[arg(long)]
    pub reset_faults: bool,
}

impl EncodeCommand {
    /// 生成请求列表
    pub fn requests(&self, config: &VfdConfig) -> Result<Vec<ModbusRequest>> {
        let map = config.profile.register_map();
        let scale = config.frequency_scale()?;
        let address = config.modbus_address(self.binding);

        let mut requests = Vec::new();
        if self.reset_faults {
            requests.push(StatusCommand::reset_faults(address).to_request(&map));
        }
        requests.push(
            StatusCommand::new(
                address,
                RunStop::for_request(self.state.is_on(), self.rpm),
                Direction::from_ccw(self.state.is_ccw()),
            )
            .to_request(&map),
        );
        requests.push(FrequencyCommand::from_rpm(address, self.rpm, &scale).to_request(&map));

        if self.queries {
            requests.push(read_output_frequency(address, &map));
            requests.extend(read_max_frequency(address, &map));
        }
        Ok(requests)
    }

    pub fn execute(&self, config: &VfdConfig) -> Result<()> {
        let scale = config.frequency_scale()?;
        println!(
            "📟 {} @ address {} ({} RPM/Hz, resolution {:.2} RPM)",
            config.profile.display_name(),
            config.modbus_address(self.binding),
            scale.rpm_per_hz(),
            scale.rpm_quantum()
        );

        for request in self.requests(config)? {
            println!(
                "{:<12} {}  (reply {} bytes)",
                format!("{:?}", request.kind),
                format_frame(&request.frame),
                request.reply_len
            );
        }

        let code = scale.rpm_to_code(self.rpm);
        println!(
            "frequency code {} -> {:.1} RPM",
            code,
            scale.code_to_rpm(code)
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfd_protocol::RequestKind;

    fn command(state: StateArg, rpm: f32) -> EncodeCommand {
        EncodeCommand {
            state,
            rpm,
            binding: 0,
            queries: false,
            reset_faults: false,
        }
    }

    #[test]
    fn test_encode_start_forward() {
        let config = VfdConfig {
            rpm_per_hz: 400.0 / 60.0,
            ..Default::default()
        };
        let requests = command(StateArg::Cw, 1000.0).requests(&config).unwrap();

        assert_eq!(requests.len(), 2);
        assert_eq!(format_frame(&requests[0].frame), "01 06 20 00 00 12");
        assert_eq!(format_frame(&requests[1].frame), "01 06 20 01 05 DC");
    }

    #[test]
    fn test_encode_off_is_stop() {
        let requests = command(StateArg::Off, 1000.0)
            .requests(&VfdConfig::default())
            .unwrap();
        assert_eq!(requests[0].frame.data_slice()[5] & 0x03, 0x01);
    }

    #[test]
    fn test_encode_queries_and_reset() {
        let mut cmd = command(StateArg::Ccw, 6000.0);
        cmd.queries = true;
        cmd.reset_faults = true;

        let kinds: Vec<RequestKind> = cmd
            .requests(&VfdConfig::default())
            .unwrap()
            .iter()
            .map(|r| r.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                RequestKind::SetStatus,
                RequestKind::SetStatus,
                RequestKind::SetSpeed,
                RequestKind::GetSpeed,
                RequestKind::GetMaxSpeed,
            ]
        );
    }
}
