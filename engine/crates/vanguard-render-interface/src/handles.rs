use slotmap::new_key_type;

new_key_type! {
    /// 设备侧的 Image 句柄
    pub struct GfxImageHandle;
    /// 设备侧的 Buffer 句柄
    pub struct GfxBufferHandle;
    /// 设备侧的一块物理内存（transient 资源放置于其上）
    pub struct GfxMemoryBlockHandle;
}

/// Image 或 Buffer 的物理句柄
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GfxResourceHandle {
    Image(GfxImageHandle),
    Buffer(GfxBufferHandle),
}

impl From<GfxImageHandle> for GfxResourceHandle {
    #[inline]
    fn from(handle: GfxImageHandle) -> Self {
        Self::Image(handle)
    }
}

impl From<GfxBufferHandle> for GfxResourceHandle {
    #[inline]
    fn from(handle: GfxBufferHandle) -> Self {
        Self::Buffer(handle)
    }
}
