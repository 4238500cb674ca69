//! 主轴选择与设置变更
//!
//! [`VfdSpindle`] 作为 [`HostObserver`] 挂在宿主通知链上：
//!
//! - 本主轴被选中：绑定选择、编程转速置为无效、请求总线静默期、解析 Modbus 地址
//! - 其他主轴被选中：解除绑定
//! - 主轴设置组变更：写入到速容差并更新到速检测开关
//! - 选项报告：输出插件名称和版本

use crate::hooks::HostObserver;
use crate::host::{HostSettings, SettingsChanged, SpindleSelection};
use crate::spindle::VfdSpindle;
use crate::state::RPM_INVALID;
use tracing::{debug, info};

impl VfdSpindle {
    /// 处理主轴选择通知
    pub fn bind(&self, selection: &SpindleSelection) {
        if selection.id != self.id {
            let mut ctx = self.ctx.lock();
            if ctx.selection.take().is_some() {
                debug!(id = self.id.0, other = selection.id.0, "VFD spindle deselected");
            }
            return;
        }

        let address = self.config.modbus_address(selection.binding);
        {
            let mut ctx = self.ctx.lock();
            ctx.selection = Some(selection.clone());
            ctx.data.rpm_programmed = RPM_INVALID;
            ctx.address = address;
        }
        self.transport.lock().set_silence();

        info!(
            id = self.id.0,
            binding = selection.binding,
            address,
            "VFD spindle selected"
        );

        if self.config.query_max_rpm_on_select {
            if let Err(e) = self.request_max_rpm() {
                debug!(error = %e, "Max speed query skipped");
            }
        }
    }

    /// 处理设置变更通知
    pub fn apply_settings(&self, settings: &HostSettings, changed: SettingsChanged) {
        if !changed.spindle {
            return;
        }

        let tolerance = settings.at_speed_tolerance;
        self.descriptor.write().at_speed_tolerance = tolerance;
        self.ctx.lock().data.at_speed_enabled = tolerance >= 0.0;
        debug!(id = self.id.0, tolerance, "At-speed tolerance updated");
    }

    /// 追加插件信息到选项报告
    pub fn report_options(&self, newopt: bool, report: &mut String) {
        if !newopt {
            let profile = self.config.profile;
            report.push_str(&format!(
                "[PLUGIN:{} {}]\n",
                profile.display_name(),
                profile.version()
            ));
        }
    }
}

impl HostObserver for VfdSpindle {
    fn on_spindle_selected(&self, selection: &SpindleSelection) {
        self.bind(selection);
    }

    fn on_settings_changed(&self, settings: &HostSettings, changed: SettingsChanged) {
        self.apply_settings(settings, changed);
    }

    fn on_report_options(&self, newopt: bool, report: &mut String) {
        self.report_options(newopt, report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VfdConfig;
    use crate::host::{Capabilities, SpindleDescriptor, SpindleId, SpindleRegistry};
    use crate::mock::{MockHost, MockTransport};
    use crate::state::DataRequest;
    use crate::transport::shared;
    use std::sync::Arc;
    use vfd_protocol::{DeviceProfile, RequestKind};

    fn make_spindle(config: VfdConfig) -> (VfdSpindle, MockTransport, SpindleRegistry) {
        let mut registry = SpindleRegistry::new();
        registry
            .register(SpindleDescriptor::new("PWM", Capabilities::default()))
            .unwrap();
        let (id, descriptor) = registry
            .register(SpindleDescriptor::new("VFD", Capabilities::vfd()))
            .unwrap();
        let mock = MockTransport::new();
        let spindle = VfdSpindle::new(
            id,
            descriptor,
            config,
            shared(mock.clone()),
            Arc::new(MockHost::new()),
        )
        .unwrap();
        (spindle, mock, registry)
    }

    #[test]
    fn test_bind_resolves_address() {
        let (spindle, mock, registry) = make_spindle(VfdConfig {
            addresses: vec![3, 9],
            ..Default::default()
        });
        spindle.ctx.lock().data.rpm_programmed = 1500.0;

        spindle.bind(&registry.select(spindle.id(), 1).unwrap());

        assert!(spindle.is_selected());
        assert_eq!(spindle.address(), 9);
        assert_eq!(
            spindle.get_data(DataRequest::Rpm).rpm_programmed,
            RPM_INVALID
        );
        assert_eq!(mock.silence_requests(), 1);
        assert_eq!(mock.sent_count(), 0);
    }

    #[test]
    fn test_other_selection_unbinds() {
        let (spindle, mock, registry) = make_spindle(VfdConfig::default());
        spindle.bind(&registry.select(spindle.id(), 0).unwrap());
        assert!(spindle.is_selected());

        spindle.bind(&registry.select(SpindleId(0), 0).unwrap());
        assert!(!spindle.is_selected());
        // 解除绑定不请求静默期
        assert_eq!(mock.silence_requests(), 1);
    }

    #[test]
    fn test_bind_queries_max_rpm_when_enabled() {
        let (spindle, mock, registry) = make_spindle(VfdConfig {
            query_max_rpm_on_select: true,
            ..Default::default()
        });
        spindle.bind(&registry.select(spindle.id(), 0).unwrap());
        assert_eq!(mock.sent_kinds(), vec![RequestKind::GetMaxSpeed]);
    }

    #[test]
    fn test_apply_settings() {
        let (spindle, _mock, _registry) = make_spindle(VfdConfig::default());

        spindle.apply_settings(
            &HostSettings {
                at_speed_tolerance: 5.0,
            },
            SettingsChanged { spindle: true },
        );
        assert_eq!(spindle.descriptor().read().at_speed_tolerance, 5.0);
        assert!(spindle.get_data(DataRequest::AtSpeed).at_speed_enabled);

        spindle.apply_settings(
            &HostSettings {
                at_speed_tolerance: -1.0,
            },
            SettingsChanged { spindle: true },
        );
        assert!(!spindle.get_data(DataRequest::AtSpeed).at_speed_enabled);
    }

    #[test]
    fn test_apply_settings_ignores_other_groups() {
        let (spindle, _mock, _registry) = make_spindle(VfdConfig::default());
        spindle.apply_settings(
            &HostSettings {
                at_speed_tolerance: 5.0,
            },
            SettingsChanged { spindle: false },
        );
        assert_eq!(spindle.descriptor().read().at_speed_tolerance, 0.0);
        assert!(!spindle.get_data(DataRequest::AtSpeed).at_speed_enabled);
    }

    #[test]
    fn test_report_options() {
        let (spindle, _mock, _registry) = make_spindle(VfdConfig::default());
        let mut report = String::new();

        spindle.report_options(true, &mut report);
        assert!(report.is_empty());

        spindle.report_options(false, &mut report);
        assert_eq!(report, "[PLUGIN:Yalang VFD YL620A 0.03]\n");

        let (gs20, _mock, _registry) = make_spindle(VfdConfig {
            profile: DeviceProfile::Gs20,
            ..Default::default()
        });
        let mut report = String::new();
        gs20.report_options(false, &mut report);
        assert_eq!(report, "[PLUGIN:Durapulse VFD GS20 v0.06]\n");
    }
}
