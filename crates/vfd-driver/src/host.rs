//! 宿主（CNC 控制器）接口
//!
//! 驱动从宿主消费三项服务：毫秒时钟、报警、冷启动标志。
//! 主轴注册表和选择通知也在此定义，驱动只对"某个主轴被选中"作出反应。

use parking_lot::RwLock;
use std::sync::Arc;

/// 宿主报警类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alarm {
    /// 主轴控制失败
    Spindle,
}

/// 宿主服务 Trait
pub trait SpindleHost: Send + Sync {
    /// 宿主启动以来的毫秒数
    fn elapsed_ms(&self) -> u64;

    /// 触发报警
    fn raise_alarm(&self, alarm: Alarm);

    /// 是否处于冷启动阶段（此时常规的延迟报警路径不可用）
    fn is_cold_start(&self) -> bool;
}

/// 主轴注册 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpindleId(pub u8);

/// 主轴能力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// 支持变速
    pub variable: bool,
    /// 支持到速检测
    pub at_speed: bool,
    /// 支持换向
    pub direction: bool,
    /// 通过命令（而非 PWM 引脚）控制
    pub cmd_controlled: bool,
}

impl Capabilities {
    /// 变频器主轴的完整能力集
    pub const fn vfd() -> Self {
        Self {
            variable: true,
            at_speed: true,
            direction: true,
            cmd_controlled: true,
        }
    }
}

/// 主轴描述（宿主持有，驱动在设置变更时写入到速容差）
#[derive(Debug, Clone, PartialEq)]
pub struct SpindleDescriptor {
    pub name: String,
    pub capabilities: Capabilities,
    /// 到速容差（百分比，负数表示禁用到速检测）
    pub at_speed_tolerance: f32,
}

impl SpindleDescriptor {
    pub fn new(name: impl Into<String>, capabilities: Capabilities) -> Self {
        Self {
            name: name.into(),
            capabilities,
            at_speed_tolerance: 0.0,
        }
    }
}

/// 共享的主轴描述
pub type SharedDescriptor = Arc<RwLock<SpindleDescriptor>>;

/// 主轴选择通知
#[derive(Debug, Clone)]
pub struct SpindleSelection {
    /// 被选中的主轴
    pub id: SpindleId,
    /// 宿主侧的主轴编号（用于查找 Modbus 地址）
    pub binding: u8,
    pub descriptor: SharedDescriptor,
}

/// 宿主设置中与主轴相关的部分
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HostSettings {
    /// 到速容差（百分比）
    pub at_speed_tolerance: f32,
}

/// 设置变更标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettingsChanged {
    /// 主轴设置组有变更
    pub spindle: bool,
}

/// 主轴注册表
///
/// 注册时分配 [`SpindleId`]，之后的选择通知通过该 ID 识别。
#[derive(Default)]
pub struct SpindleRegistry {
    spindles: Vec<SharedDescriptor>,
}

impl SpindleRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            spindles: Vec::new(),
        }
    }

    /// 注册主轴（注册表已满时返回 None）
    pub fn register(&mut self, descriptor: SpindleDescriptor) -> Option<(SpindleId, SharedDescriptor)> {
        let id = u8::try_from(self.spindles.len()).ok()?;
        let shared = Arc::new(RwLock::new(descriptor));
        self.spindles.push(Arc::clone(&shared));
        tracing::debug!(id, "Spindle registered");
        Some((SpindleId(id), shared))
    }

    pub fn get(&self, id: SpindleId) -> Option<SharedDescriptor> {
        self.spindles.get(id.0 as usize).cloned()
    }

    /// 构建选择通知
    pub fn select(&self, id: SpindleId, binding: u8) -> Option<SpindleSelection> {
        self.get(id).map(|descriptor| SpindleSelection {
            id,
            binding,
            descriptor,
        })
    }

    pub fn len(&self) -> usize {
        self.spindles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spindles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_register_and_select() {
        let mut registry = SpindleRegistry::new();
        assert!(registry.is_empty());

        let (first, _) = registry
            .register(SpindleDescriptor::new("PWM", Capabilities::default()))
            .unwrap();
        let (second, descriptor) = registry
            .register(SpindleDescriptor::new("VFD", Capabilities::vfd()))
            .unwrap();

        assert_eq!(first, SpindleId(0));
        assert_eq!(second, SpindleId(1));
        assert_eq!(registry.len(), 2);

        let selection = registry.select(second, 3).unwrap();
        assert_eq!(selection.id, second);
        assert_eq!(selection.binding, 3);
        assert!(Arc::ptr_eq(&selection.descriptor, &descriptor));

        assert!(registry.select(SpindleId(9), 0).is_none());
    }

    #[test]
    fn test_descriptor_is_shared() {
        let mut registry = SpindleRegistry::new();
        let (id, descriptor) = registry
            .register(SpindleDescriptor::new("VFD", Capabilities::vfd()))
            .unwrap();

        descriptor.write().at_speed_tolerance = 5.0;
        let seen = registry.get(id).unwrap();
        assert_eq!(seen.read().at_speed_tolerance, 5.0);
    }

    #[test]
    fn test_vfd_capabilities() {
        let caps = Capabilities::vfd();
        assert!(caps.variable && caps.at_speed && caps.direction && caps.cmd_controlled);
    }
}
