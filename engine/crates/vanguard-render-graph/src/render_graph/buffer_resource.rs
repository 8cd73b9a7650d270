use crate::render_graph::resource_state::RgBufferState;
use ash::vk;
use vanguard_render_interface::handles::GfxBufferHandle;
use vanguard_render_interface::memory::GfxBufferCreateDesc;

/// 缓冲区资源描述（用于创建临时资源）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgBufferDesc {
    /// 缓冲区大小（字节）
    pub size: vk::DeviceSize,
    /// 结构化缓冲区的元素大小，0 表示 raw buffer
    pub stride: u32,
    /// 缓冲区用途，compile 时会并上绑定方式所需的 usage
    pub usage: vk::BufferUsageFlags,
}

impl RgBufferDesc {
    #[inline]
    pub fn new(size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> Self {
        Self { size, stride: 0, usage }
    }

    /// `count` 个 `stride` 字节大小的元素
    #[inline]
    pub fn structured(count: u64, stride: u32) -> Self {
        Self {
            size: count * stride as u64,
            stride,
            usage: vk::BufferUsageFlags::STORAGE_BUFFER,
        }
    }

    #[inline]
    pub fn resolve(&self) -> GfxBufferCreateDesc {
        GfxBufferCreateDesc {
            size: self.size,
            usage: self.usage,
        }
    }
}

/// 外部导入的缓冲区
#[derive(Clone, Copy, Debug)]
pub struct RgImportedBuffer {
    pub handle: GfxBufferHandle,
    /// 帧开始时缓冲区所处的状态
    pub initial_state: RgBufferState,
}

impl RgImportedBuffer {
    #[inline]
    pub fn new(handle: GfxBufferHandle) -> Self {
        Self {
            handle,
            initial_state: RgBufferState::UNDEFINED,
        }
    }

    #[inline]
    pub fn with_initial_state(mut self, state: RgBufferState) -> Self {
        self.initial_state = state;
        self
    }
}

/// 缓冲区资源条目
#[derive(Clone, Debug)]
pub enum RgBufferResource {
    Imported(RgImportedBuffer),
    Transient(RgBufferDesc),
}

impl RgBufferResource {
    #[inline]
    pub fn initial_state(&self) -> RgBufferState {
        match self {
            Self::Imported(buffer) => buffer.initial_state,
            Self::Transient(_) => RgBufferState::UNDEFINED,
        }
    }

    #[inline]
    pub fn physical_handle(&self) -> Option<GfxBufferHandle> {
        match self {
            Self::Imported(buffer) => Some(buffer.handle),
            Self::Transient(_) => None,
        }
    }
}
