use ash::vk;
use vanguard_render_interface::handles::{GfxBufferHandle, GfxImageHandle};
use vanguard_render_interface::memory::{GfxBufferCreateDesc, GfxImageCreateDesc};
use vanguard_render_interface::null_device::NullGfxDevice;

/// swapchain 中 image 的数量
pub const BACK_BUFFER_COUNT: usize = 2;

/// 跨帧存在的资源，由各个子系统自己创建，每帧导入 RenderGraph
pub struct DemoScene {
    pub back_buffers: [GfxImageHandle; BACK_BUFFER_COUNT],
    pub back_buffer_format: vk::Format,

    pub camera_buffer: GfxBufferHandle,
    pub instance_buffer: GfxBufferHandle,
    pub light_buffer: GfxBufferHandle,
    pub mesh_args_buffer: GfxBufferHandle,

    /// 天气贴图每帧由 compute 队列更新
    pub weather_texture: GfxImageHandle,

    pub instance_count: u32,
    pub light_count: u32,

    /// 创建这些资源时的帧号
    first_frame: u64,
}

// new & init
impl DemoScene {
    pub fn new(device: &mut NullGfxDevice, extent: vk::Extent2D, first_frame: u64) -> Self {
        let back_buffer_format = vk::Format::B8G8R8A8_UNORM;
        let back_buffers = std::array::from_fn(|_| {
            device.create_persistent_image(GfxImageCreateDesc {
                width: extent.width,
                height: extent.height,
                depth: 1,
                mip_levels: 1,
                array_layers: 1,
                format: back_buffer_format,
                usage: vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
            })
        });

        let mut storage_buffer = |size: vk::DeviceSize| {
            device.create_persistent_buffer(GfxBufferCreateDesc {
                size,
                usage: vk::BufferUsageFlags::STORAGE_BUFFER,
            })
        };
        let camera_buffer = storage_buffer(2 * 256);
        let instance_buffer = storage_buffer(4096 * 128);
        let light_buffer = storage_buffer(1024 * 64);
        let mesh_args_buffer = storage_buffer(4096 * 20);

        let weather_texture = device.create_persistent_image(GfxImageCreateDesc {
            width: 512,
            height: 512,
            depth: 1,
            mip_levels: 1,
            array_layers: 1,
            format: vk::Format::R8G8B8A8_UNORM,
            usage: vk::ImageUsageFlags::STORAGE | vk::ImageUsageFlags::SAMPLED,
        });

        Self {
            back_buffers,
            back_buffer_format,
            camera_buffer,
            instance_buffer,
            light_buffer,
            mesh_args_buffer,
            weather_texture,
            instance_count: 4096,
            light_count: 1024,
            first_frame,
        }
    }
}

// getters
impl DemoScene {
    #[inline]
    pub fn back_buffer(&self, frame: u64) -> GfxImageHandle {
        self.back_buffers[frame as usize % BACK_BUFFER_COUNT]
    }

    /// 资源创建之后经过的帧数
    #[inline]
    pub fn frames_alive(&self, frame: u64) -> u64 {
        frame - self.first_frame
    }
}
