//! Pass 执行时的资源解析器

use crate::render_graph::pass::RgPassAccess;
use crate::render_graph::resource_handle::RgResourceHandle;
use crate::render_graph::resource_registry::RgResourceRegistry;
use indexmap::IndexMap;
use std::collections::HashMap;
use vanguard_render_interface::bindless::BindlessIndex;
use vanguard_render_interface::handles::{GfxBufferHandle, GfxImageHandle, GfxResourceHandle};

/// Pass 闭包中可用的资源解析器
///
/// 只能解析当前 pass 声明过的资源；访问未声明的资源会直接 panic。
/// 被禁用的 pass 创建的资源没有物理内存，解析结果为 null。
pub struct RgPassResources<'r> {
    pub(crate) pass_name: &'r str,
    pub(crate) resources: &'r RgResourceRegistry,
    pub(crate) declared: &'r IndexMap<RgResourceHandle, RgPassAccess>,
    pub(crate) physical: &'r HashMap<RgResourceHandle, GfxResourceHandle>,
    /// (资源, 视图名) -> bindless 索引
    pub(crate) views: HashMap<(RgResourceHandle, String), BindlessIndex>,
}

impl<'r> RgPassResources<'r> {
    #[inline]
    pub fn pass_name(&self) -> &str {
        self.pass_name
    }

    /// 获取资源默认视图的 bindless 索引
    #[inline]
    pub fn get(&self, handle: RgResourceHandle) -> BindlessIndex {
        self.get_named(handle, "")
    }

    /// 获取资源某个具名视图的 bindless 索引
    pub fn get_named(&self, handle: RgResourceHandle, view_name: &str) -> BindlessIndex {
        self.check_declared(handle);
        if !self.physical.contains_key(&handle) {
            return BindlessIndex::null();
        }

        self.views.get(&(handle, view_name.to_string())).copied().unwrap_or_else(|| {
            panic!(
                "RenderGraph: pass '{}' has no view named '{}' for '{}'",
                self.pass_name,
                view_name,
                self.resources.name(handle)
            )
        })
    }

    /// 获取图像的物理句柄（渲染目标、拷贝等）
    pub fn get_texture(&self, handle: RgResourceHandle) -> GfxImageHandle {
        self.check_declared(handle);
        match self.physical.get(&handle) {
            Some(GfxResourceHandle::Image(image)) => *image,
            Some(GfxResourceHandle::Buffer(_)) => {
                panic!("RenderGraph: pass '{}' asks '{}' as a texture", self.pass_name, self.resources.name(handle))
            }
            None => GfxImageHandle::default(),
        }
    }

    /// 获取缓冲区的物理句柄
    pub fn get_buffer(&self, handle: RgResourceHandle) -> GfxBufferHandle {
        self.check_declared(handle);
        match self.physical.get(&handle) {
            Some(GfxResourceHandle::Buffer(buffer)) => *buffer,
            Some(GfxResourceHandle::Image(_)) => {
                panic!("RenderGraph: pass '{}' asks '{}' as a buffer", self.pass_name, self.resources.name(handle))
            }
            None => GfxBufferHandle::default(),
        }
    }

    fn check_declared(&self, handle: RgResourceHandle) {
        assert!(
            self.resources.contains(handle),
            "RenderGraph: pass '{}' accesses resource {:?} which was never created or imported in this graph",
            self.pass_name,
            handle
        );
        assert!(
            self.declared.contains_key(&handle),
            "RenderGraph: pass '{}' accesses '{}' without declaring it",
            self.pass_name,
            self.resources.name(handle)
        );
    }
}
