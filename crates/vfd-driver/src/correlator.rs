//! 应答分派
//!
//! 按请求类型标签把应答分派到对应的处理逻辑，更新派生数据，
//! 并告诉调用方是否需要重发或报警。本模块不访问传输层和宿主。

use crate::retry::ExceptionCounter;
use crate::state::SpindleData;
use crate::transport::{Reply, ReplyOutcome};
use tracing::{debug, trace, warn};
use vfd_protocol::{ExceptionCode, FrequencyScale, ReadRegisterResponse, RequestKind};

/// 分派结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correlation {
    /// 写入确认
    Acknowledged(RequestKind),
    /// 实测转速（已完成到速判定）
    Measured { rpm: f32, at_speed: bool },
    /// 设备最高转速
    MaxRpm(f32),
    /// 读应答格式错误（已忽略）
    Malformed(RequestKind),
    /// 设备异常
    ///
    /// `reissue_rpm` 非空时需要以非阻塞方式重发转速设定；
    /// `escalate` 为真时需要触发报警。
    Exception {
        kind: RequestKind,
        code: ExceptionCode,
        reissue_rpm: Option<f32>,
        escalate: bool,
    },
}

impl Correlation {
    /// 是否需要触发报警
    pub fn escalates(&self) -> bool {
        matches!(self, Correlation::Exception { escalate: true, .. })
    }

    /// 需要重发的转速
    pub fn reissue_rpm(&self) -> Option<f32> {
        match self {
            Correlation::Exception { reissue_rpm, .. } => *reissue_rpm,
            _ => None,
        }
    }
}

/// 应答分派器
#[derive(Debug, Clone, Copy)]
pub struct Correlator {
    /// 频率寄存器换算
    scale: FrequencyScale,
    /// 最高频率寄存器换算（分辨率可能不同）
    max_scale: FrequencyScale,
}

impl Correlator {
    pub fn new(scale: FrequencyScale, max_scale: FrequencyScale) -> Self {
        Self { scale, max_scale }
    }

    /// 分派一个应答
    ///
    /// - 非异常应答：先清零异常计数器，再按标签处理
    /// - 异常应答：冷启动阶段立即升级；否则计数，`SetSpeed` 需要重发
    pub fn correlate(
        &self,
        reply: &Reply,
        cold_start: bool,
        data: &mut SpindleData,
        exceptions: &mut ExceptionCounter,
    ) -> Correlation {
        match reply.outcome {
            ReplyOutcome::Response(frame) => {
                exceptions.clear();

                match reply.kind {
                    RequestKind::GetSpeed => match ReadRegisterResponse::try_from(frame) {
                        Ok(resp) => {
                            let rpm = self.scale.code_to_rpm(resp.value);
                            let at_speed = data.validate_at_speed(rpm);
                            trace!(rpm, at_speed, "Spindle speed measured");
                            Correlation::Measured { rpm, at_speed }
                        },
                        Err(e) => {
                            warn!(kind = ?reply.kind, error = %e, "Ignoring malformed reply");
                            Correlation::Malformed(reply.kind)
                        },
                    },
                    RequestKind::GetMaxSpeed => match ReadRegisterResponse::try_from(frame) {
                        Ok(resp) => {
                            let rpm = self.max_scale.code_to_rpm(resp.value);
                            debug!(rpm, "Device max speed read");
                            Correlation::MaxRpm(rpm)
                        },
                        Err(e) => {
                            warn!(kind = ?reply.kind, error = %e, "Ignoring malformed reply");
                            Correlation::Malformed(reply.kind)
                        },
                    },
                    RequestKind::SetStatus | RequestKind::SetSpeed => {
                        Correlation::Acknowledged(reply.kind)
                    },
                }
            },
            ReplyOutcome::Exception(code) => {
                if cold_start {
                    warn!(kind = ?reply.kind, ?code, "Device exception during cold start");
                    return Correlation::Exception {
                        kind: reply.kind,
                        code,
                        reissue_rpm: None,
                        escalate: true,
                    };
                }

                // 只重发转速设定，其余请求等下一次轮询自然纠正
                let reissue_rpm = match reply.kind {
                    RequestKind::SetSpeed => Some(data.reissue_rpm()),
                    _ => None,
                };
                let escalate = exceptions.record();

                debug!(
                    kind = ?reply.kind,
                    ?code,
                    count = exceptions.count(),
                    escalate,
                    "Device exception"
                );

                Correlation::Exception {
                    kind: reply.kind,
                    code,
                    reissue_rpm,
                    escalate,
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RPM_INVALID;
    use vfd_protocol::{ModbusFrame, read_register_reply};

    fn correlator() -> Correlator {
        Correlator::new(
            FrequencyScale::new(400.0 / 60.0, 10).unwrap(),
            FrequencyScale::new(400.0 / 60.0, 100).unwrap(),
        )
    }

    fn speed_reply(code: u16) -> Reply {
        Reply::from_frame(RequestKind::GetSpeed, read_register_reply(1, code))
    }

    #[test]
    fn test_get_speed_decodes_and_validates() {
        let mut data = SpindleData {
            at_speed_enabled: true,
            ..Default::default()
        };
        data.set_at_speed_range(1000.0, 5.0);
        let mut counter = ExceptionCounter::new(3);

        let result = correlator().correlate(&speed_reply(1500), false, &mut data, &mut counter);
        match result {
            Correlation::Measured { rpm, at_speed } => {
                assert!((rpm - 1000.0).abs() < 0.5);
                assert!(at_speed);
            },
            other => panic!("Expected Measured, got {:?}", other),
        }
        assert!(data.state_programmed.at_speed);
        assert!((data.rpm - 1000.0).abs() < 0.5);
    }

    #[test]
    fn test_response_clears_counter() {
        let mut data = SpindleData::default();
        let mut counter = ExceptionCounter::new(3);
        counter.record();
        counter.record();

        let ack = Reply::from_frame(
            RequestKind::SetStatus,
            ModbusFrame::new(&[0x01, 0x06, 0x20, 0x00, 0x00, 0x12]),
        );
        let result = correlator().correlate(&ack, false, &mut data, &mut counter);
        assert_eq!(result, Correlation::Acknowledged(RequestKind::SetStatus));
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn test_malformed_read_is_ignored() {
        let mut data = SpindleData::default();
        data.rpm = 123.0;
        let mut counter = ExceptionCounter::new(3);
        counter.record();

        let reply = Reply::from_frame(RequestKind::GetSpeed, ModbusFrame::new(&[0x01, 0x03, 0x02]));
        let result = correlator().correlate(&reply, false, &mut data, &mut counter);
        assert_eq!(result, Correlation::Malformed(RequestKind::GetSpeed));
        assert_eq!(data.rpm, 123.0);
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn test_max_speed_uses_max_scale() {
        let mut data = SpindleData::default();
        let mut counter = ExceptionCounter::new(3);
        // 400.00Hz -> 400 × 6.667 ≈ 2667 RPM
        let reply = Reply::from_frame(RequestKind::GetMaxSpeed, read_register_reply(1, 40000));
        match correlator().correlate(&reply, false, &mut data, &mut counter) {
            Correlation::MaxRpm(rpm) => assert!((rpm - 2666.67).abs() < 0.5, "rpm = {}", rpm),
            other => panic!("Expected MaxRpm, got {:?}", other),
        }
    }

    #[test]
    fn test_set_speed_exception_reissues() {
        let mut data = SpindleData::default();
        data.rpm_programmed = 1200.0;
        let mut counter = ExceptionCounter::new(3);

        let reply = Reply::exception(RequestKind::SetSpeed, ExceptionCode::SlaveDeviceBusy);
        let result = correlator().correlate(&reply, false, &mut data, &mut counter);
        assert_eq!(result.reissue_rpm(), Some(1200.0));
        assert!(!result.escalates());
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn test_set_speed_exception_clamps_sentinel() {
        let mut data = SpindleData::default();
        data.rpm_programmed = RPM_INVALID;
        let mut counter = ExceptionCounter::new(3);

        let reply = Reply::exception(RequestKind::SetSpeed, ExceptionCode::SlaveDeviceBusy);
        let result = correlator().correlate(&reply, false, &mut data, &mut counter);
        assert_eq!(result.reissue_rpm(), Some(0.0));
    }

    #[test]
    fn test_other_exceptions_do_not_reissue() {
        let mut data = SpindleData::default();
        let mut counter = ExceptionCounter::new(3);

        for kind in [
            RequestKind::GetSpeed,
            RequestKind::SetStatus,
            RequestKind::GetMaxSpeed,
        ] {
            let reply = Reply::exception(kind, ExceptionCode::IllegalDataAddress);
            let result = correlator().correlate(&reply, false, &mut data, &mut counter);
            assert_eq!(result.reissue_rpm(), None);
        }
        // 第三次异常达到上限
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn test_exception_bound_escalates_once() {
        let mut data = SpindleData::default();
        let mut counter = ExceptionCounter::new(3);
        let reply = Reply::exception(RequestKind::GetSpeed, ExceptionCode::SlaveDeviceFailure);

        let escalations = (0..6)
            .map(|_| correlator().correlate(&reply, false, &mut data, &mut counter))
            .filter(Correlation::escalates)
            .count();
        assert_eq!(escalations, 2);
    }

    #[test]
    fn test_cold_start_exception_escalates_immediately() {
        let mut data = SpindleData::default();
        data.rpm_programmed = 500.0;
        let mut counter = ExceptionCounter::new(25);

        let reply = Reply::exception(RequestKind::SetSpeed, ExceptionCode::SlaveDeviceBusy);
        let result = correlator().correlate(&reply, true, &mut data, &mut counter);
        assert!(result.escalates());
        assert_eq!(result.reissue_rpm(), None);
        // 冷启动路径不参与计数
        assert_eq!(counter.count(), 0);
    }
}
