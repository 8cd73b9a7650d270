//! RenderGraph 资源句柄定义
//!
//! 句柄是 graph 内部的虚拟引用（arena + index），与设备侧的物理句柄分离。
//! 句柄只在产生它的那一帧的 graph 中有效：每个 graph 有进程内唯一的 id，
//! 句柄中带着这个 id，其他 graph 的句柄即使 slot 相同也无法解析。

use slotmap::{Key, new_key_type};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

new_key_type! {
    /// 注册表内部的 slot
    pub(crate) struct RgResourceKey;
}

/// graph 的进程内唯一 id，0 保留给默认句柄
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Debug)]
pub struct RgGraphId(u32);

impl RgGraphId {
    pub(crate) fn next() -> Self {
        static NEXT_GRAPH_ID: AtomicU32 = AtomicU32::new(1);
        Self(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Graph 内部的资源句柄（image 或 buffer）
///
/// 默认值不属于任何 graph。
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RgResourceHandle {
    pub(crate) key: RgResourceKey,
    pub(crate) graph: RgGraphId,
}

impl RgResourceHandle {
    #[inline]
    pub(crate) fn new(key: RgResourceKey, graph: RgGraphId) -> Self {
        Self { key, graph }
    }

    /// 产生该句柄的 graph
    #[inline]
    pub fn graph(&self) -> RgGraphId {
        self.graph
    }
}

impl fmt::Debug for RgResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RgResource({:?}@graph{})", self.key.data(), self.graph.0)
    }
}

/// Pass 在 graph 中的声明序号
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RgPassIndex(pub(crate) u32);

impl RgPassIndex {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for RgPassIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RgPass({})", self.0)
    }
}
