use serde::{Deserialize, Serialize};
use std::path::Path;
use vanguard_crate_tools::config_file::load_toml;
use vanguard_render_interface::pipeline_settings::{RenderGraphSettings, ResolutionSettings};

/// 运行时可调的渲染开关
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderCvars {
    /// 云的渲染分辨率相对输出分辨率的比例
    pub cloud_render_scale: f32,
    pub bloom_enabled: bool,
    /// 体积光（云的天空可见性）
    pub render_light_shafts: bool,
    /// 在 back buffer 上叠加 cluster 调试信息
    pub cluster_overlay: bool,
}

impl Default for RenderCvars {
    fn default() -> Self {
        Self {
            cloud_render_scale: 0.5,
            bloom_enabled: true,
            render_light_shafts: true,
            cluster_overlay: false,
        }
    }
}

/// `config/vanguard.toml`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VanguardConfig {
    pub frames: u32,
    pub resize_at_frame: u32,
    pub graph: RenderGraphSettings,
    pub resolution: ResolutionSettings,
    pub cvars: RenderCvars,
}

impl Default for VanguardConfig {
    fn default() -> Self {
        Self {
            frames: 3,
            resize_at_frame: 0,
            graph: RenderGraphSettings::default(),
            resolution: ResolutionSettings::default(),
            cvars: RenderCvars::default(),
        }
    }
}

impl VanguardConfig {
    /// 配置文件不存在时使用默认配置
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            log::warn!("config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        load_toml(path)
    }
}
