//! Builder 模式实现
//!
//! 提供链式构造并注册 `VfdSpindle` 实例的便捷方式。

use crate::config::VfdConfig;
use crate::error::DriverError;
use crate::host::{Capabilities, SpindleDescriptor, SpindleHost, SpindleRegistry};
use crate::spindle::VfdSpindle;
use crate::transport::SharedTransport;
use std::sync::Arc;

/// VFD 主轴 Builder（链式构造）
///
/// # Example
///
/// ```rust
/// # #[cfg(feature = "mock")]
/// # {
/// use std::sync::Arc;
/// use vfd_driver::mock::{MockHost, MockTransport};
/// use vfd_driver::{ObserverChain, SpindleRegistry, VfdBuilder, VfdConfig, shared};
///
/// let mut registry = SpindleRegistry::new();
/// let spindle = VfdBuilder::new()
///     .config(VfdConfig::default())
///     .transport(shared(MockTransport::new()))
///     .host(Arc::new(MockHost::new()))
///     .build(&mut registry)
///     .unwrap();
///
/// let mut chain = ObserverChain::new();
/// chain.add_observer(spindle.clone());
/// # }
/// ```
pub struct VfdBuilder {
    /// 驱动配置（默认 `VfdConfig::default()`）
    config: Option<VfdConfig>,
    /// 共享传输层（必需）
    transport: Option<SharedTransport>,
    /// 宿主服务（必需）
    host: Option<Arc<dyn SpindleHost>>,
    /// 注册名称（默认使用型号名称）
    name: Option<String>,
}

impl Default for VfdBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VfdBuilder {
    /// 创建新的 Builder
    pub fn new() -> Self {
        Self {
            config: None,
            transport: None,
            host: None,
            name: None,
        }
    }

    /// 设置驱动配置（可选）
    pub fn config(mut self, config: VfdConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 设置共享传输层
    pub fn transport(mut self, transport: SharedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// 设置宿主服务
    pub fn host(mut self, host: Arc<dyn SpindleHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// 设置注册名称（可选）
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 构建并注册主轴
    ///
    /// # Errors
    /// - `DriverError::MissingField`: 缺少传输层或宿主服务
    /// - `DriverError::Config`: 配置校验失败
    /// - `DriverError::RegistryFull`: 注册表已满
    pub fn build(self, registry: &mut SpindleRegistry) -> Result<Arc<VfdSpindle>, DriverError> {
        let transport = self.transport.ok_or(DriverError::MissingField("transport"))?;
        let host = self.host.ok_or(DriverError::MissingField("host"))?;
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let name = self
            .name
            .unwrap_or_else(|| config.profile.display_name().to_string());
        let (id, descriptor) = registry
            .register(SpindleDescriptor::new(name.clone(), Capabilities::vfd()))
            .ok_or(DriverError::RegistryFull)?;

        tracing::info!(
            id = id.0,
            name = %name,
            profile = ?config.profile,
            "VFD spindle registered"
        );

        let spindle = VfdSpindle::new(id, descriptor, config, transport, host)?;
        Ok(Arc::new(spindle))
    }
}
