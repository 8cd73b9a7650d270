//! Pass 定义和构建器
//!
//! `RgPassBuilder` 在构建阶段声明 pass 对资源的访问，并绑定执行闭包。
//! 被禁用的 pass 仍然保留名称和队列用于诊断，但不会产生任何访问记录。

use crate::render_graph::buffer_resource::RgBufferDesc;
use crate::render_graph::image_resource::RgImageDesc;
use crate::render_graph::pass_resources::RgPassResources;
use crate::render_graph::resource_handle::{RgPassIndex, RgResourceHandle};
use crate::render_graph::resource_registry::{RgAccessKind, RgResourceKind, RgResourceRegistry};
use crate::render_graph::resource_state::{RgAccessState, RgBufferState, RgImageState};
use crate::render_graph::view::{RgOutputBind, RgResourceBind, RgViewRequest};
use ash::vk;
use indexmap::IndexMap;
use vanguard_render_interface::command_list::{GfxCommandList, GfxLoadOp};
use vanguard_render_interface::queue::GfxQueueType;

/// 最多同时绑定的颜色渲染目标数量
pub const MAX_RENDER_TARGETS: usize = 8;

/// Pass 的执行闭包
pub type RgPassClosure<'a> = Box<dyn FnOnce(&mut dyn GfxCommandList, &RgPassResources<'_>) + 'a>;

/// 一个 pass 对某个资源的全部声明
#[derive(Clone, Debug, Default)]
pub struct RgPassAccess {
    /// 资源由该 pass 创建
    pub created: bool,
    pub read: Option<RgViewRequest>,
    pub write: Option<RgViewRequest>,
    pub output: Option<(RgOutputBind, GfxLoadOp)>,
}

impl RgPassAccess {
    #[inline]
    pub fn is_write(&self) -> bool {
        self.output.is_some() || self.write.is_some() || (self.created && self.read.is_none())
    }

    /// 需要创建描述符的视图请求
    #[inline]
    pub fn view_request(&self) -> Option<&RgViewRequest> {
        self.write.as_ref().or(self.read.as_ref())
    }

    /// 声明的绑定方式要求图像具备的 usage
    pub fn image_usage(&self) -> vk::ImageUsageFlags {
        let mut usage = self.output.map(|(bind, _)| bind.image_usage()).unwrap_or_default();
        for (request, write) in [(&self.read, false), (&self.write, true)] {
            for bind in request.iter().flat_map(|request| request.binds()) {
                usage |= bind.image_usage(write);
            }
        }
        usage
    }

    /// 声明的绑定方式要求缓冲区具备的 usage
    pub fn buffer_usage(&self) -> vk::BufferUsageFlags {
        let mut usage = vk::BufferUsageFlags::empty();
        for (request, write) in [(&self.read, false), (&self.write, true)] {
            for bind in request.iter().flat_map(|request| request.binds()) {
                usage |= bind.buffer_usage(write);
            }
        }
        usage
    }

    /// 该访问要求资源处于的状态
    ///
    /// 优先级：output > write > read；只创建不读写的资源视为通用写入。
    pub fn required_state(&self, is_image: bool, queue: GfxQueueType) -> RgAccessState {
        if is_image {
            let state = match (&self.output, &self.write, &self.read) {
                (Some((bind, _)), _, _) => RgImageState::for_output(*bind),
                (None, Some(write), _) => RgImageState::for_write(write.bind(), queue),
                (None, None, Some(read)) => RgImageState::for_read(read.bind(), queue),
                (None, None, None) => RgImageState::for_write(RgResourceBind::Common, queue),
            };
            RgAccessState::Image(state)
        } else {
            let state = match (&self.write, &self.read) {
                (Some(write), _) => RgBufferState::for_write(write.bind(), queue),
                (None, Some(read)) if self.output.is_none() => RgBufferState::for_read(read.bind(), queue),
                _ => RgBufferState::for_write(RgResourceBind::Common, queue),
            };
            RgAccessState::Buffer(state)
        }
    }
}

/// Pass 节点
pub struct RgPassNode<'a> {
    pub name: String,
    pub queue: GfxQueueType,
    /// 在声明时求值一次
    pub enabled: bool,

    /// 按声明顺序排列的资源访问
    pub(crate) accesses: IndexMap<RgResourceHandle, RgPassAccess>,

    pub(crate) closure: Option<RgPassClosure<'a>>,
}

impl<'a> RgPassNode<'a> {
    pub(crate) fn new(name: String, queue: GfxQueueType, enabled: bool) -> Self {
        Self {
            name,
            queue,
            enabled,
            accesses: IndexMap::new(),
            closure: None,
        }
    }

    #[inline]
    pub fn accesses(&self) -> impl Iterator<Item = (RgResourceHandle, &RgPassAccess)> {
        self.accesses.iter().map(|(handle, access)| (*handle, access))
    }

    #[inline]
    pub fn access(&self, handle: RgResourceHandle) -> Option<&RgPassAccess> {
        self.accesses.get(&handle)
    }

    #[inline]
    pub fn has_outputs(&self) -> bool {
        self.accesses.values().any(|access| access.output.is_some())
    }

    /// 检查 pass 的声明是否合法
    ///
    /// # Panics
    /// 任何一条规则不满足时，panic 信息中包含 pass 名称和资源名称
    pub(crate) fn validate(&self, resources: &RgResourceRegistry) {
        assert!(self.closure.is_some(), "RenderGraph: pass '{}' was never bound to a closure", self.name);

        let mut rtv_count = 0;
        let mut dsv_count = 0;

        for (handle, access) in &self.accesses {
            let resource = resources.resource(*handle);
            let res_name = &resource.name;
            let pass_name = &self.name;

            assert!(
                !(access.read.is_some() && access.write.is_some()),
                "RenderGraph: pass '{pass_name}' both reads and writes '{res_name}' (a write implies a read)"
            );
            assert!(
                !(access.created && access.read.is_some()),
                "RenderGraph: pass '{pass_name}' reads '{res_name}' which it creates"
            );
            if access.created && access.write.is_some() {
                assert!(
                    access.output.is_none(),
                    "RenderGraph: pass '{pass_name}' creates and writes '{res_name}' and also outputs it"
                );
            }
            if access.created && access.write.is_none() {
                assert!(
                    access.output.is_some(),
                    "RenderGraph: pass '{pass_name}' creates '{res_name}' without writing or outputting it"
                );
            }
            if access.output.is_some() {
                assert!(
                    access.read.is_none() && access.write.is_none(),
                    "RenderGraph: pass '{pass_name}' outputs '{res_name}' and also binds it as a shader resource"
                );
            }

            if let Some(write) = &access.write {
                assert!(
                    write.bind().is_writable(),
                    "RenderGraph: pass '{pass_name}' writes '{res_name}' with non-writable bind {:?}",
                    write.bind()
                );
            }

            for request in [&access.read, &access.write].into_iter().flatten() {
                let bind = request.bind();
                if self.queue == GfxQueueType::Copy {
                    assert!(
                        bind == RgResourceBind::Common,
                        "RenderGraph: copy pass '{pass_name}' binds '{res_name}' as {bind:?}, only Common is allowed"
                    );
                }
                match resource.kind {
                    RgResourceKind::Image(_) => assert!(
                        bind != RgResourceBind::Indirect,
                        "RenderGraph: pass '{pass_name}' binds image '{res_name}' as indirect arguments"
                    ),
                    RgResourceKind::Buffer(_) => assert!(
                        bind != RgResourceBind::Dsv,
                        "RenderGraph: pass '{pass_name}' binds buffer '{res_name}' as depth stencil"
                    ),
                }
            }

            if let Some((bind, _)) = access.output {
                assert!(
                    self.queue == GfxQueueType::Graphics,
                    "RenderGraph: pass '{pass_name}' outputs '{res_name}' on the {} queue",
                    self.queue
                );
                assert!(resource.is_image(), "RenderGraph: pass '{pass_name}' outputs buffer '{res_name}'");
                match bind {
                    RgOutputBind::Rtv => rtv_count += 1,
                    RgOutputBind::Dsv => dsv_count += 1,
                }
            }
        }

        assert!(
            rtv_count <= MAX_RENDER_TARGETS,
            "RenderGraph: pass '{}' binds {} render targets (max {})",
            self.name,
            rtv_count,
            MAX_RENDER_TARGETS
        );
        assert!(dsv_count <= 1, "RenderGraph: pass '{}' binds {} depth stencil outputs", self.name, dsv_count);
    }
}

/// Pass 构建器
///
/// 由 `RenderGraph::add_pass` 返回，用于声明资源访问：
///
/// ```ignore
/// let mut pass = graph.add_pass("clouds", GfxQueueType::Compute);
/// let clouds = pass.create_image(RgImageDesc::scaled_2d(0.5, vk::Format::R16G16B16A16_SFLOAT), "clouds");
/// pass.read(transmittance, RgResourceBind::Srv)
///     .write(clouds, RgResourceBind::Uav)
///     .bind(move |cmd, res| {
///         bind_constants(cmd, "clouds", &CloudConstants { target: res.get(clouds), .. });
///         cmd.dispatch(60, 34, 1);
///     });
/// ```
pub struct RgPassBuilder<'g, 'a> {
    pub(crate) index: RgPassIndex,
    pub(crate) node: &'g mut RgPassNode<'a>,
    pub(crate) resources: &'g mut RgResourceRegistry,
}

impl<'g, 'a> RgPassBuilder<'g, 'a> {
    #[inline]
    pub fn index(&self) -> RgPassIndex {
        self.index
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.node.enabled
    }

    /// 声明读取资源
    pub fn read(&mut self, handle: RgResourceHandle, view: impl Into<RgViewRequest>) -> &mut Self {
        if let Some(access) = self.declare(handle, RgAccessKind::Read) {
            access.read = Some(view.into());
        }
        self
    }

    /// 声明写入资源（写入隐含读取）
    pub fn write(&mut self, handle: RgResourceHandle, view: impl Into<RgViewRequest>) -> &mut Self {
        if let Some(access) = self.declare(handle, RgAccessKind::Write) {
            access.write = Some(view.into());
        }
        self
    }

    /// 声明渲染目标
    pub fn output(&mut self, handle: RgResourceHandle, bind: RgOutputBind, load_op: GfxLoadOp) -> &mut Self {
        if let Some(access) = self.declare(handle, RgAccessKind::Output) {
            access.output = Some((bind, load_op));
        }
        self
    }

    /// 创建临时图像
    ///
    /// 同名的多次创建得到互相独立的资源。禁用的 pass 也会返回新的句柄，
    /// 但该资源不会分配内存。
    pub fn create_image(&mut self, desc: RgImageDesc, name: impl Into<String>) -> RgResourceHandle {
        let handle = self.resources.register_transient_image(name, desc, self.index);
        self.declare(handle, RgAccessKind::Create);
        handle
    }

    /// 创建临时缓冲区
    pub fn create_buffer(&mut self, desc: RgBufferDesc, name: impl Into<String>) -> RgResourceHandle {
        let handle = self.resources.register_transient_buffer(name, desc, self.index);
        self.declare(handle, RgAccessKind::Create);
        handle
    }

    /// 绑定执行闭包，闭包在执行阶段最多调用一次
    pub fn bind(&mut self, closure: impl FnOnce(&mut dyn GfxCommandList, &RgPassResources<'_>) + 'a) -> &mut Self {
        assert!(self.node.closure.is_none(), "RenderGraph: pass '{}' is bound twice", self.node.name);
        self.node.closure = Some(Box::new(closure));
        self
    }

    /// 检查句柄并记录访问；禁用的 pass 不记录任何内容
    ///
    /// 其他 graph（例如上一帧）的句柄属于未解析的依赖，即使 pass 被禁用也会 panic。
    fn declare(&mut self, handle: RgResourceHandle, kind: RgAccessKind) -> Option<&mut RgPassAccess> {
        assert!(
            self.resources.contains(handle),
            "RenderGraph: pass '{}' accesses resource {:?} which was never created or imported in this graph",
            self.node.name,
            handle
        );
        if !self.node.enabled {
            return None;
        }

        self.resources.record_access(handle, self.index, kind);
        let access = self.node.accesses.entry(handle).or_default();
        if kind == RgAccessKind::Create {
            access.created = true;
        }
        Some(access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk;

    fn builder<'g, 'a>(
        node: &'g mut RgPassNode<'a>,
        resources: &'g mut RgResourceRegistry,
    ) -> RgPassBuilder<'g, 'a> {
        RgPassBuilder {
            index: RgPassIndex::new(0),
            node,
            resources,
        }
    }

    #[test]
    fn test_accesses_recorded_in_call_order() {
        let mut resources = RgResourceRegistry::new();
        let mut node = RgPassNode::new("bloom".to_string(), GfxQueueType::Compute, true);

        let mut pass = builder(&mut node, &mut resources);
        let a = pass.create_image(RgImageDesc::new_2d(64, 64, vk::Format::R16G16B16A16_SFLOAT), "bloom_a");
        let b = pass.create_image(RgImageDesc::new_2d(64, 64, vk::Format::R16G16B16A16_SFLOAT), "bloom_a");
        pass.write(b, RgResourceBind::Uav).write(a, RgResourceBind::Uav).bind(|_, _| {});

        assert_ne!(a, b);
        let order = node.accesses().map(|(handle, _)| handle).collect::<Vec<_>>();
        assert_eq!(order, vec![a, b]);
        assert_eq!(
            resources.resource(a).accesses.iter().map(|r| r.kind).collect::<Vec<_>>(),
            vec![RgAccessKind::Create, RgAccessKind::Write]
        );
        node.validate(&resources);
    }

    #[test]
    fn test_disabled_pass_records_nothing() {
        let mut resources = RgResourceRegistry::new();
        let mut node = RgPassNode::new("debug_view".to_string(), GfxQueueType::Graphics, false);

        let mut pass = builder(&mut node, &mut resources);
        let tag = pass.create_image(RgImageDesc::new_2d(8, 8, vk::Format::R8G8B8A8_UNORM), "debug");
        pass.write(tag, RgResourceBind::Uav);

        assert!(node.accesses.is_empty());
        assert!(resources.resource(tag).accesses.is_empty());
        assert_eq!(resources.resource(tag).created_by, Some(RgPassIndex::new(0)));
    }

    #[test]
    fn test_required_state_priority() {
        let access = RgPassAccess {
            created: true,
            output: Some((RgOutputBind::Rtv, GfxLoadOp::Clear)),
            ..Default::default()
        };
        assert_eq!(
            access.required_state(true, GfxQueueType::Graphics),
            RgAccessState::Image(RgImageState::COLOR_ATTACHMENT_WRITE)
        );
        assert!(access.is_write());

        let read = RgPassAccess {
            read: Some(RgResourceBind::Indirect.into()),
            ..Default::default()
        };
        assert_eq!(
            read.required_state(false, GfxQueueType::Graphics),
            RgAccessState::Buffer(RgBufferState::INDIRECT_BUFFER)
        );
        assert!(!read.is_write());
    }

    #[test]
    #[should_panic(expected = "both reads and writes 'history'")]
    fn test_validate_read_and_write() {
        let mut resources = RgResourceRegistry::new();
        let history = resources.register_transient_image(
            "history",
            RgImageDesc::new_2d(8, 8, vk::Format::R8G8B8A8_UNORM),
            RgPassIndex::new(0),
        );
        let mut node = RgPassNode::new("taa".to_string(), GfxQueueType::Graphics, true);
        builder(&mut node, &mut resources)
            .read(history, RgResourceBind::Srv)
            .write(history, RgResourceBind::Uav)
            .bind(|_, _| {});
        node.validate(&resources);
    }

    #[test]
    #[should_panic(expected = "without writing or outputting it")]
    fn test_validate_created_must_be_written() {
        let mut resources = RgResourceRegistry::new();
        let mut node = RgPassNode::new("forward".to_string(), GfxQueueType::Graphics, true);
        let mut pass = builder(&mut node, &mut resources);
        pass.create_image(RgImageDesc::new_2d(8, 8, vk::Format::R8G8B8A8_UNORM), "unused");
        pass.bind(|_, _| {});
        node.validate(&resources);
    }

    #[test]
    #[should_panic(expected = "outputs 'gbuffer' on the Compute queue")]
    fn test_validate_output_needs_graphics() {
        let mut resources = RgResourceRegistry::new();
        let mut node = RgPassNode::new("async_gbuffer".to_string(), GfxQueueType::Compute, true);
        let mut pass = builder(&mut node, &mut resources);
        let gbuffer = pass.create_image(RgImageDesc::new_2d(8, 8, vk::Format::R8G8B8A8_UNORM), "gbuffer");
        pass.output(gbuffer, RgOutputBind::Rtv, GfxLoadOp::Clear).bind(|_, _| {});
        node.validate(&resources);
    }

    #[test]
    #[should_panic(expected = "never bound")]
    fn test_validate_requires_bind() {
        let resources = RgResourceRegistry::new();
        let node = RgPassNode::new("empty".to_string(), GfxQueueType::Graphics, true);
        node.validate(&resources);
    }

    #[test]
    #[should_panic(expected = "only Common is allowed")]
    fn test_validate_copy_queue_binds() {
        let mut resources = RgResourceRegistry::new();
        let src = resources.register_transient_buffer(
            "upload",
            RgBufferDesc::new(256, vk::BufferUsageFlags::TRANSFER_SRC),
            RgPassIndex::new(0),
        );
        let mut node = RgPassNode::new("upload".to_string(), GfxQueueType::Copy, true);
        builder(&mut node, &mut resources).read(src, RgResourceBind::Srv).bind(|_, _| {});
        node.validate(&resources);
    }
}
