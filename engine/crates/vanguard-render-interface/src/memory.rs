use ash::vk;

/// 内存类别
///
/// 只有同一类别的资源可以放置在同一块内存上。
/// buffer、普通纹理、RT/DS 纹理分开存放（与大多数硬件的 heap 限制一致）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GfxMemoryClass {
    Buffer,
    Texture,
    RenderTarget,
}

impl GfxMemoryClass {
    /// 根据 image usage 推断内存类别
    pub fn from_image_usage(usage: vk::ImageUsageFlags) -> Self {
        if usage.intersects(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT) {
            Self::RenderTarget
        } else {
            Self::Texture
        }
    }
}

/// 资源的内存需求
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxMemoryRequirements {
    pub size: vk::DeviceSize,
    pub alignment: vk::DeviceSize,
    pub class: GfxMemoryClass,
}

impl GfxMemoryRequirements {
    /// 判断一块已有内存是否能容纳该需求
    #[inline]
    pub fn fits(&self, block_size: vk::DeviceSize, block_alignment: vk::DeviceSize, class: GfxMemoryClass) -> bool {
        self.class == class && self.size <= block_size && block_alignment % self.alignment.max(1) == 0
    }
}

/// 创建（放置）图像所需的完整信息，尺寸已经解析完毕
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GfxImageCreateDesc {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub format: vk::Format,
    pub usage: vk::ImageUsageFlags,
}

/// 创建（放置）缓冲区所需的信息
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GfxBufferCreateDesc {
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
}

/// 单个 texel 的字节数（只覆盖 RenderGraph 常用格式）
pub fn format_texel_size(format: vk::Format) -> Option<u64> {
    let size = match format {
        vk::Format::R8_UNORM | vk::Format::R8_UINT | vk::Format::S8_UINT => 1,
        vk::Format::R8G8_UNORM | vk::Format::R16_SFLOAT | vk::Format::R16_UINT | vk::Format::D16_UNORM => 2,
        vk::Format::R8G8B8A8_UNORM
        | vk::Format::R8G8B8A8_SRGB
        | vk::Format::B8G8R8A8_UNORM
        | vk::Format::B8G8R8A8_SRGB
        | vk::Format::A2B10G10R10_UNORM_PACK32
        | vk::Format::B10G11R11_UFLOAT_PACK32
        | vk::Format::R16G16_SFLOAT
        | vk::Format::R32_SFLOAT
        | vk::Format::R32_UINT
        | vk::Format::D32_SFLOAT
        | vk::Format::D24_UNORM_S8_UINT
        | vk::Format::X8_D24_UNORM_PACK32 => 4,
        vk::Format::D32_SFLOAT_S8_UINT => 5,
        vk::Format::R16G16B16A16_SFLOAT | vk::Format::R32G32_SFLOAT | vk::Format::R32G32_UINT => 8,
        vk::Format::R32G32B32A32_SFLOAT | vk::Format::R32G32B32A32_UINT => 16,
        _ => return None,
    };
    Some(size)
}

/// 从格式推断 aspect
pub fn infer_aspect(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D16_UNORM | vk::Format::D32_SFLOAT | vk::Format::X8_D24_UNORM_PACK32 => {
            vk::ImageAspectFlags::DEPTH
        }
        vk::Format::S8_UINT => vk::ImageAspectFlags::STENCIL,
        vk::Format::D16_UNORM_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        _ => vk::ImageAspectFlags::COLOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_class_from_usage() {
        assert_eq!(
            GfxMemoryClass::from_image_usage(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::STORAGE),
            GfxMemoryClass::Texture
        );
        assert_eq!(
            GfxMemoryClass::from_image_usage(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::COLOR_ATTACHMENT),
            GfxMemoryClass::RenderTarget
        );
    }

    #[test]
    fn test_requirements_fit() {
        let req = GfxMemoryRequirements {
            size: 1024,
            alignment: 256,
            class: GfxMemoryClass::Texture,
        };
        assert!(req.fits(1024, 65536, GfxMemoryClass::Texture));
        assert!(!req.fits(512, 65536, GfxMemoryClass::Texture));
        assert!(!req.fits(4096, 128, GfxMemoryClass::Texture));
        assert!(!req.fits(4096, 65536, GfxMemoryClass::Buffer));
    }

    #[test]
    fn test_aspect() {
        assert_eq!(infer_aspect(vk::Format::D32_SFLOAT), vk::ImageAspectFlags::DEPTH);
        assert_eq!(infer_aspect(vk::Format::R16G16B16A16_SFLOAT), vk::ImageAspectFlags::COLOR);
    }
}
