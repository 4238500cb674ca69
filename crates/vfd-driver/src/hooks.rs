//! 宿主通知链
//!
//! 宿主把三类通知按注册顺序广播给所有观察者：
//!
//! - 主轴被选中（或切换到其他主轴）
//! - 设置变更
//! - 选项报告（`$I`）
//!
//! 每个观察者只处理与自己相关的通知，不会覆盖或截断其他观察者。
//!
//! # 使用示例
//!
//! ```rust
//! use vfd_driver::hooks::{HostObserver, ObserverChain};
//! use std::sync::Arc;
//!
//! struct Banner;
//!
//! impl HostObserver for Banner {
//!     fn on_report_options(&self, newopt: bool, report: &mut String) {
//!         if !newopt {
//!             report.push_str("[PLUGIN:Banner 1.0]\n");
//!         }
//!     }
//! }
//!
//! let mut chain = ObserverChain::new();
//! chain.add_observer(Arc::new(Banner));
//!
//! let mut report = String::new();
//! chain.report_options(false, &mut report);
//! assert_eq!(report, "[PLUGIN:Banner 1.0]\n");
//! ```

use crate::host::{HostSettings, SettingsChanged, SpindleSelection};
use std::sync::Arc;

/// 宿主通知观察者
///
/// 所有方法都有空的默认实现，只需实现关心的通知。
pub trait HostObserver: Send + Sync {
    /// 某个主轴被选中
    fn on_spindle_selected(&self, selection: &SpindleSelection) {
        let _ = selection;
    }

    /// 设置变更
    fn on_settings_changed(&self, settings: &HostSettings, changed: SettingsChanged) {
        let _ = (settings, changed);
    }

    /// 选项报告
    ///
    /// `newopt` 为真时只报告新格式的选项行，插件信息只在 `newopt == false` 时输出。
    fn on_report_options(&self, newopt: bool, report: &mut String) {
        let _ = (newopt, report);
    }
}

/// 有序观察者列表
///
/// 回调列表本身不是线程安全的，需要外部同步（宿主通常在主循环中单线程调用）。
#[derive(Default)]
pub struct ObserverChain {
    observers: Vec<Arc<dyn HostObserver>>,
}

impl ObserverChain {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// 追加观察者（追加到链尾，按注册顺序调用）
    pub fn add_observer(&mut self, observer: Arc<dyn HostObserver>) {
        self.observers.push(observer);
    }

    /// 移除所有观察者
    pub fn clear(&mut self) {
        self.observers.clear();
    }

    /// 广播主轴选择通知
    pub fn spindle_selected(&self, selection: &SpindleSelection) {
        for observer in self.observers.iter() {
            observer.on_spindle_selected(selection);
        }
    }

    /// 广播设置变更通知
    pub fn settings_changed(&self, settings: &HostSettings, changed: SettingsChanged) {
        for observer in self.observers.iter() {
            observer.on_settings_changed(settings, changed);
        }
    }

    /// 收集选项报告
    pub fn report_options(&self, newopt: bool, report: &mut String) {
        for observer in self.observers.iter() {
            observer.on_report_options(newopt, report);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Capabilities, SpindleDescriptor, SpindleRegistry};
    use parking_lot::Mutex;

    /// 记录调用顺序的观察者
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl HostObserver for Recorder {
        fn on_spindle_selected(&self, selection: &SpindleSelection) {
            self.log
                .lock()
                .push(format!("{}:selected:{}", self.name, selection.id.0));
        }

        fn on_settings_changed(&self, _settings: &HostSettings, changed: SettingsChanged) {
            self.log
                .lock()
                .push(format!("{}:settings:{}", self.name, changed.spindle));
        }
    }

    #[test]
    fn test_observer_chain_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = ObserverChain::new();
        chain.add_observer(Arc::new(Recorder {
            name: "a",
            log: log.clone(),
        }));
        chain.add_observer(Arc::new(Recorder {
            name: "b",
            log: log.clone(),
        }));
        assert_eq!(chain.len(), 2);

        let mut registry = SpindleRegistry::new();
        let (id, _) = registry
            .register(SpindleDescriptor::new("VFD", Capabilities::vfd()))
            .unwrap();
        let selection = registry.select(id, 0).unwrap();

        chain.spindle_selected(&selection);
        chain.settings_changed(&HostSettings::default(), SettingsChanged { spindle: true });

        assert_eq!(
            *log.lock(),
            vec![
                "a:selected:0".to_string(),
                "b:selected:0".to_string(),
                "a:settings:true".to_string(),
                "b:settings:true".to_string(),
            ]
        );
    }

    #[test]
    fn test_default_methods_are_noops() {
        struct Silent;
        impl HostObserver for Silent {}

        let mut chain = ObserverChain::new();
        chain.add_observer(Arc::new(Silent));

        let mut report = String::new();
        chain.report_options(false, &mut report);
        assert!(report.is_empty());
    }

    #[test]
    fn test_clear() {
        struct Silent;
        impl HostObserver for Silent {}

        let mut chain = ObserverChain::new();
        assert!(chain.is_empty());
        chain.add_observer(Arc::new(Silent));
        chain.clear();
        assert!(chain.is_empty());
    }
}
