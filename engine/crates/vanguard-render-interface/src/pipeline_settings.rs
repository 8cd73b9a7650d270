use ash::vk;
use serde::{Deserialize, Serialize};

/// 帧级渲染配置
///
/// `output_extent` 是主渲染目标的分辨率，
/// 按比例缩放的 transient 资源（`resolution_scale`）以它为基准。
#[derive(Copy, Clone, Debug)]
pub struct FrameSettings {
    pub color_format: vk::Format,
    pub depth_format: vk::Format,
    pub output_extent: vk::Extent2D,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            color_format: vk::Format::R16G16B16A16_SFLOAT,
            depth_format: vk::Format::D32_SFLOAT,
            output_extent: vk::Extent2D {
                width: 1920,
                height: 1080,
            },
        }
    }
}

impl FrameSettings {
    #[inline]
    pub fn with_extent(mut self, width: u32, height: u32) -> Self {
        self.output_extent = vk::Extent2D { width, height };
        self
    }
}

/// RenderGraph 配置
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderGraphSettings {
    /// 是否允许生命周期不重叠的 transient 资源共享内存。
    /// 关闭后每个 transient 资源都有独立的内存，用于排查 aliasing 问题。
    pub transient_reuse: bool,
    /// 是否在 compile 时校验每个 pass 的声明
    pub validate_passes: bool,
    /// 是否在 compile 后打印执行计划
    pub print_execution_plan: bool,
}

impl Default for RenderGraphSettings {
    fn default() -> Self {
        Self {
            transient_reuse: true,
            validate_passes: cfg!(debug_assertions),
            print_execution_plan: false,
        }
    }
}

/// 配置文件中的分辨率部分
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        let extent = FrameSettings::default().output_extent;
        Self {
            width: extent.width,
            height: extent.height,
        }
    }
}

impl ResolutionSettings {
    pub fn to_frame_settings(self) -> FrameSettings {
        FrameSettings::default().with_extent(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_settings_defaults() {
        let settings = RenderGraphSettings::default();
        assert!(settings.transient_reuse);
        assert!(!settings.print_execution_plan);
    }

    #[test]
    fn test_resolution_to_frame_settings() {
        let frame = ResolutionSettings {
            width: 1280,
            height: 720,
        }
        .to_frame_settings();
        assert_eq!(frame.output_extent.width, 1280);
        assert_eq!(frame.output_extent.height, 720);
        assert_eq!(frame.depth_format, vk::Format::D32_SFLOAT);
    }
}
