//! 主轴状态
//!
//! - [`SpindleState`]：发出启停指令时立即（乐观地）更新
//! - [`SpindleData`]：编程转速、实测转速和到速判定

/// 编程转速无效标记（换向和重新选中时写入）
pub const RPM_INVALID: f32 = -1.0;

/// 主轴状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpindleState {
    pub on: bool,
    /// 逆时针（反转）
    pub ccw: bool,
    pub at_speed: bool,
}

impl SpindleState {
    pub const fn off() -> Self {
        Self {
            on: false,
            ccw: false,
            at_speed: false,
        }
    }

    pub const fn cw() -> Self {
        Self {
            on: true,
            ccw: false,
            at_speed: false,
        }
    }

    pub const fn ccw() -> Self {
        Self {
            on: true,
            ccw: true,
            at_speed: false,
        }
    }
}

/// 数据查询类型（当前所有类型都返回同一份快照）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRequest {
    Rpm,
    AtSpeed,
    AngularPosition,
}

/// 主轴派生数据
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpindleData {
    /// 最近一次实测转速
    pub rpm: f32,
    /// 最近一次编程转速（可能为 [`RPM_INVALID`]）
    pub rpm_programmed: f32,
    pub state_programmed: SpindleState,
    pub at_speed_enabled: bool,
    pub rpm_low_limit: f32,
    pub rpm_high_limit: f32,
}

impl SpindleData {
    /// 记录编程转速并计算到速区间
    ///
    /// `tolerance` 为百分比。到速标志清零，等待下一次实测。
    pub fn set_at_speed_range(&mut self, rpm: f32, tolerance: f32) {
        self.rpm_programmed = rpm;
        self.state_programmed.at_speed = false;
        self.rpm_low_limit = rpm * (1.0 - tolerance / 100.0);
        self.rpm_high_limit = rpm * (1.0 + tolerance / 100.0);
    }

    /// 记录实测转速并判定是否到速
    ///
    /// 未启用到速检测时总是判定为到速。
    pub fn validate_at_speed(&mut self, rpm: f32) -> bool {
        self.rpm = rpm;
        self.state_programmed.at_speed = !self.at_speed_enabled
            || (rpm >= self.rpm_low_limit && rpm <= self.rpm_high_limit);
        self.state_programmed.at_speed
    }

    /// 编程转速是否有效
    pub fn has_programmed_rpm(&self) -> bool {
        self.rpm_programmed >= 0.0
    }

    /// 用于重发的编程转速（无效标记钳位到 0）
    pub fn reissue_rpm(&self) -> f32 {
        self.rpm_programmed.max(0.0)
    }
}
