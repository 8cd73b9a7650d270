use crate::render_graph::resource_state::RgImageState;
use ash::vk;
use vanguard_render_interface::handles::GfxImageHandle;
use vanguard_render_interface::memory::{GfxImageCreateDesc, infer_aspect};

/// 图像资源描述（用于创建临时资源）
///
/// `width`/`height` 为 0 且 `resolution_scale` 非 0 时，
/// 尺寸在 compile 阶段根据当前输出分辨率推导。
/// usage 不需要手动填写：compile 时会并上各个 pass 声明的绑定方式所需的 usage。
#[derive(Clone, Debug, PartialEq)]
pub struct RgImageDesc {
    /// 图像宽度
    pub width: u32,
    /// 图像高度
    pub height: u32,
    /// 图像深度（3D 纹理）
    pub depth: u32,
    /// 相对于输出分辨率的缩放
    pub resolution_scale: f32,
    /// Mip 级别数
    pub mip_levels: u32,
    /// 数组层数
    pub array_layers: u32,
    /// 图像格式
    pub format: vk::Format,
    /// 额外的图像用途
    pub usage: vk::ImageUsageFlags,
}

impl Default for RgImageDesc {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            depth: 1,
            resolution_scale: 0.0,
            mip_levels: 1,
            array_layers: 1,
            format: vk::Format::R8G8B8A8_UNORM,
            usage: vk::ImageUsageFlags::empty(),
        }
    }
}

// new & init & builder
impl RgImageDesc {
    /// 固定尺寸的 2D 图像
    #[inline]
    pub fn new_2d(width: u32, height: u32, format: vk::Format) -> Self {
        Self {
            width,
            height,
            format,
            ..Default::default()
        }
    }

    /// 相对输出分辨率缩放的 2D 图像
    #[inline]
    pub fn scaled_2d(resolution_scale: f32, format: vk::Format) -> Self {
        Self {
            resolution_scale,
            format,
            ..Default::default()
        }
    }

    /// 固定尺寸的 3D 图像
    #[inline]
    pub fn new_3d(width: u32, height: u32, depth: u32, format: vk::Format) -> Self {
        Self {
            width,
            height,
            depth,
            format,
            ..Default::default()
        }
    }

    /// 追加绑定方式推导不出来的 usage（例如给外部拷贝用的 TRANSFER_SRC）
    #[inline]
    pub fn with_usage(mut self, usage: vk::ImageUsageFlags) -> Self {
        self.usage |= usage;
        self
    }

    #[inline]
    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self
    }

    /// 是否需要根据输出分辨率推导尺寸
    #[inline]
    pub fn is_output_relative(&self) -> bool {
        self.width == 0 && self.height == 0 && self.resolution_scale > 0.0
    }

    /// 解析出最终的创建信息
    ///
    /// # Panics
    /// 尺寸为 0 且没有 `resolution_scale`
    pub fn resolve(&self, name: &str, output_extent: vk::Extent2D) -> GfxImageCreateDesc {
        let (width, height) = if self.is_output_relative() {
            let scale = |v: u32| ((v as f32 * self.resolution_scale) as u32).max(1);
            (scale(output_extent.width), scale(output_extent.height))
        } else {
            assert!(
                self.width > 0 && self.height > 0,
                "RenderGraph: transient image '{}' has zero size and no resolution scale",
                name
            );
            (self.width, self.height)
        };

        GfxImageCreateDesc {
            width,
            height,
            depth: self.depth.max(1),
            mip_levels: self.mip_levels.max(1),
            array_layers: self.array_layers.max(1),
            format: self.format,
            usage: self.usage,
        }
    }
}

/// 外部导入的图像
#[derive(Clone, Copy, Debug)]
pub struct RgImportedImage {
    pub handle: GfxImageHandle,
    pub format: vk::Format,
    /// 帧开始时图像所处的状态
    pub initial_state: RgImageState,
}

impl RgImportedImage {
    #[inline]
    pub fn new(handle: GfxImageHandle, format: vk::Format) -> Self {
        Self {
            handle,
            format,
            initial_state: RgImageState::UNDEFINED,
        }
    }

    #[inline]
    pub fn with_initial_state(mut self, state: RgImageState) -> Self {
        self.initial_state = state;
        self
    }
}

/// 图像资源的来源
#[derive(Clone, Debug)]
pub enum RgImageSource {
    /// 从外部导入的图像
    Imported(RgImportedImage),
    /// 由 RenderGraph 创建的临时图像
    Transient(RgImageDesc),
}

/// 图像资源条目
#[derive(Clone, Debug)]
pub struct RgImageResource {
    pub source: RgImageSource,
    /// 图像格式（用于推断 barrier aspect）
    pub format: vk::Format,
    /// 作为 back buffer 使用，最后一次访问后转换到 present
    pub back_buffer: bool,
}

// new & init
impl RgImageResource {
    pub fn imported(image: RgImportedImage) -> Self {
        Self {
            format: image.format,
            source: RgImageSource::Imported(image),
            back_buffer: false,
        }
    }

    pub fn transient(desc: RgImageDesc) -> Self {
        Self {
            format: desc.format,
            source: RgImageSource::Transient(desc),
            back_buffer: false,
        }
    }
}

// getters
impl RgImageResource {
    /// 根据格式推断 aspect flags
    #[inline]
    pub fn infer_aspect(&self) -> vk::ImageAspectFlags {
        infer_aspect(self.format)
    }

    /// 帧开始时的状态；transient 图像总是从 UNDEFINED 开始
    #[inline]
    pub fn initial_state(&self) -> RgImageState {
        match &self.source {
            RgImageSource::Imported(image) => image.initial_state,
            RgImageSource::Transient(_) => RgImageState::UNDEFINED,
        }
    }

    /// 获取物理 image handle（仅对导入资源有效）
    #[inline]
    pub fn physical_handle(&self) -> Option<GfxImageHandle> {
        match &self.source {
            RgImageSource::Imported(image) => Some(image.handle),
            RgImageSource::Transient(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTENT: vk::Extent2D = vk::Extent2D {
        width: 1920,
        height: 1080,
    };

    #[test]
    fn test_resolve_fixed_size() {
        let desc = RgImageDesc::new_2d(256, 256, vk::Format::R16G16B16A16_SFLOAT).resolve("T", EXTENT);
        assert_eq!((desc.width, desc.height, desc.depth), (256, 256, 1));
    }

    #[test]
    fn test_resolve_scaled() {
        let desc = RgImageDesc::scaled_2d(0.5, vk::Format::R16G16B16A16_SFLOAT).resolve("clouds", EXTENT);
        assert_eq!((desc.width, desc.height), (960, 540));

        let tiny = RgImageDesc::scaled_2d(0.0001, vk::Format::R32_SFLOAT).resolve("tiny", EXTENT);
        assert_eq!((tiny.width, tiny.height), (1, 1));
    }

    #[test]
    #[should_panic(expected = "zero size")]
    fn test_resolve_zero_size_panics() {
        RgImageDesc::default().resolve("broken", EXTENT);
    }
}
