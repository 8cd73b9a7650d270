use std::fmt;

/// Shader 通过该索引访问 bindless 描述符数组中的资源
#[derive(Copy, Clone, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(transparent)]
pub struct BindlessIndex(u32);

impl BindlessIndex {
    const INVALID: u32 = u32::MAX;

    #[inline]
    pub fn new(index: u32) -> Self {
        debug_assert!(index != Self::INVALID);
        Self(index)
    }
    #[inline]
    pub fn null() -> Self {
        Self(Self::INVALID)
    }
    #[inline]
    pub fn is_null(&self) -> bool {
        self.0 == Self::INVALID
    }
    #[inline]
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl Default for BindlessIndex {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for BindlessIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() { write!(f, "Bindless(null)") } else { write!(f, "Bindless({})", self.0) }
    }
}

/// 描述符的种类，决定其进入哪一个 bindless 数组
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GfxDescriptorKind {
    /// 只读（sampled image / storage buffer read）
    Srv,
    /// 可读写（storage image / storage buffer）
    Uav,
}

/// 创建描述符所需的视图信息
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxViewDesc {
    pub kind: GfxDescriptorKind,
    /// 起始 mip；None 表示全部 mip
    pub mip: Option<u32>,
}

impl GfxViewDesc {
    #[inline]
    pub fn new(kind: GfxDescriptorKind) -> Self {
        Self { kind, mip: None }
    }

    #[inline]
    pub fn with_mip(mut self, mip: u32) -> Self {
        self.mip = Some(mip);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_index() {
        assert!(BindlessIndex::default().is_null());
        assert!(!BindlessIndex::new(3).is_null());
        assert_eq!(BindlessIndex::new(3).index(), 3);
        assert_eq!(bytemuck::cast::<BindlessIndex, u32>(BindlessIndex::new(9)), 9);
    }
}
