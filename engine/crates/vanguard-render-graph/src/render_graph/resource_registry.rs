use crate::render_graph::buffer_resource::{RgBufferDesc, RgBufferResource, RgImportedBuffer};
use crate::render_graph::image_resource::{RgImageDesc, RgImageResource, RgImageSource, RgImportedImage};
use crate::render_graph::resource_handle::{RgGraphId, RgPassIndex, RgResourceHandle, RgResourceKey};
use crate::render_graph::resource_state::RgAccessState;
use slotmap::SlotMap;

/// 资源种类
#[derive(Clone, Debug)]
pub enum RgResourceKind {
    Image(RgImageResource),
    Buffer(RgBufferResource),
}

/// 访问类型，按声明顺序记录在资源上
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgAccessKind {
    Read,
    Write,
    Output,
    Create,
}

/// 一条访问记录
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgAccessRecord {
    pub pass: RgPassIndex,
    pub kind: RgAccessKind,
}

/// RenderGraph 中的一个资源条目
#[derive(Clone, Debug)]
pub struct RgResource {
    pub name: String,
    pub kind: RgResourceKind,
    /// 创建该资源的 pass；导入资源为 None
    pub created_by: Option<RgPassIndex>,
    /// 所有启用的 pass 对该资源的访问，按调用顺序排列
    pub accesses: Vec<RgAccessRecord>,
}

impl RgResource {
    #[inline]
    pub fn is_transient(&self) -> bool {
        match &self.kind {
            RgResourceKind::Image(image) => matches!(image.source, RgImageSource::Transient(_)),
            RgResourceKind::Buffer(buffer) => matches!(buffer, RgBufferResource::Transient(_)),
        }
    }

    #[inline]
    pub fn is_image(&self) -> bool {
        matches!(self.kind, RgResourceKind::Image(_))
    }

    #[inline]
    pub fn is_back_buffer(&self) -> bool {
        matches!(&self.kind, RgResourceKind::Image(image) if image.back_buffer)
    }

    /// 帧开始时资源所处的状态
    pub fn initial_state(&self) -> RgAccessState {
        match &self.kind {
            RgResourceKind::Image(image) => RgAccessState::Image(image.initial_state()),
            RgResourceKind::Buffer(buffer) => RgAccessState::Buffer(buffer.initial_state()),
        }
    }
}

/// 资源注册表
///
/// 管理一帧中所有声明的资源（导入的持久资源和 pass 创建的临时资源），
/// 资源句柄由 SlotMap 的 key 和注册表的 graph id 组成。
/// 其他 graph 的句柄在这里一律视为未解析的依赖。
pub struct RgResourceRegistry {
    graph: RgGraphId,
    resources: SlotMap<RgResourceKey, RgResource>,
}

// new & init
impl RgResourceRegistry {
    pub fn new() -> Self {
        Self {
            graph: RgGraphId::next(),
            resources: SlotMap::with_key(),
        }
    }
}

impl Default for RgResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// register
impl RgResourceRegistry {
    pub fn register_imported_image(&mut self, name: impl Into<String>, image: RgImportedImage) -> RgResourceHandle {
        self.insert(name.into(), RgResourceKind::Image(RgImageResource::imported(image)), None)
    }

    pub fn register_imported_buffer(&mut self, name: impl Into<String>, buffer: RgImportedBuffer) -> RgResourceHandle {
        self.insert(name.into(), RgResourceKind::Buffer(RgBufferResource::Imported(buffer)), None)
    }

    pub fn register_transient_image(
        &mut self,
        name: impl Into<String>,
        desc: RgImageDesc,
        creator: RgPassIndex,
    ) -> RgResourceHandle {
        self.insert(name.into(), RgResourceKind::Image(RgImageResource::transient(desc)), Some(creator))
    }

    pub fn register_transient_buffer(
        &mut self,
        name: impl Into<String>,
        desc: RgBufferDesc,
        creator: RgPassIndex,
    ) -> RgResourceHandle {
        self.insert(name.into(), RgResourceKind::Buffer(RgBufferResource::Transient(desc)), Some(creator))
    }

    fn insert(&mut self, name: String, kind: RgResourceKind, created_by: Option<RgPassIndex>) -> RgResourceHandle {
        let key = self.resources.insert(RgResource {
            name,
            kind,
            created_by,
            accesses: Vec::new(),
        });
        RgResourceHandle::new(key, self.graph)
    }

    /// 追加一条访问记录
    pub(crate) fn record_access(&mut self, handle: RgResourceHandle, pass: RgPassIndex, kind: RgAccessKind) {
        self.resource_mut(handle).accesses.push(RgAccessRecord { pass, kind });
    }

    /// 将导入的图像标记为 back buffer
    ///
    /// # Panics
    /// 资源不是导入的图像
    pub fn tag_back_buffer(&mut self, handle: RgResourceHandle) {
        let resource = self.resource_mut(handle);
        match &mut resource.kind {
            RgResourceKind::Image(image) if matches!(image.source, RgImageSource::Imported(_)) => {
                image.back_buffer = true;
            }
            _ => panic!("RenderGraph: back buffer '{}' must be an imported image", resource.name),
        }
    }
}

// getter & iter
impl RgResourceRegistry {
    #[inline]
    pub fn graph(&self) -> RgGraphId {
        self.graph
    }

    #[inline]
    pub fn get(&self, handle: RgResourceHandle) -> Option<&RgResource> {
        if handle.graph != self.graph {
            return None;
        }
        self.resources.get(handle.key)
    }

    /// 句柄是否由当前 graph 创建或导入
    #[inline]
    pub fn contains(&self, handle: RgResourceHandle) -> bool {
        handle.graph == self.graph && self.resources.contains_key(handle.key)
    }

    /// 获取资源
    ///
    /// # Panics
    /// 句柄不属于当前 graph（未创建也未导入）
    #[inline]
    pub fn resource(&self, handle: RgResourceHandle) -> &RgResource {
        self.get(handle).unwrap_or_else(|| {
            panic!("RenderGraph: unresolved resource {:?} (never created or imported in this graph)", handle)
        })
    }

    #[inline]
    fn resource_mut(&mut self, handle: RgResourceHandle) -> &mut RgResource {
        let graph = self.graph;
        self.resources.get_mut(handle.key).filter(|_| handle.graph == graph).unwrap_or_else(|| {
            panic!("RenderGraph: unresolved resource {:?} (never created or imported in this graph)", handle)
        })
    }

    /// 资源名称，找不到时返回 `<unknown>`
    #[inline]
    pub fn name(&self, handle: RgResourceHandle) -> &str {
        self.get(handle).map(|r| r.name.as_str()).unwrap_or("<unknown>")
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// 按注册顺序迭代所有资源
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (RgResourceHandle, &RgResource)> {
        let graph = self.graph;
        self.resources.iter().map(move |(key, resource)| (RgResourceHandle::new(key, graph), resource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk;
    use vanguard_render_interface::handles::GfxImageHandle;

    #[test]
    fn test_register_and_record() {
        let mut registry = RgResourceRegistry::new();
        let imported = registry.register_imported_image(
            "history",
            RgImportedImage::new(GfxImageHandle::default(), vk::Format::R16G16B16A16_SFLOAT),
        );
        let transient = registry.register_transient_buffer(
            "clusters",
            RgBufferDesc::structured(4096, 16),
            RgPassIndex::new(0),
        );

        registry.record_access(transient, RgPassIndex::new(0), RgAccessKind::Create);
        registry.record_access(transient, RgPassIndex::new(0), RgAccessKind::Write);

        assert!(!registry.resource(imported).is_transient());
        assert!(registry.resource(transient).is_transient());
        assert_eq!(registry.resource(transient).accesses.len(), 2);
        assert_eq!(registry.name(transient), "clusters");
    }

    #[test]
    #[should_panic(expected = "must be an imported image")]
    fn test_back_buffer_must_be_imported() {
        let mut registry = RgResourceRegistry::new();
        let transient = registry.register_transient_image(
            "scene_color",
            RgImageDesc::scaled_2d(1.0, vk::Format::R16G16B16A16_SFLOAT),
            RgPassIndex::new(0),
        );
        registry.tag_back_buffer(transient);
    }

    #[test]
    #[should_panic(expected = "unresolved resource")]
    fn test_foreign_handle_is_unresolved() {
        let registry = RgResourceRegistry::new();
        registry.resource(RgResourceHandle::default());
    }

    #[test]
    fn test_handle_from_previous_graph_does_not_resolve() {
        let last_frame = {
            let mut registry = RgResourceRegistry::new();
            registry.register_imported_image(
                "last_frame_color",
                RgImportedImage::new(GfxImageHandle::default(), vk::Format::R16G16B16A16_SFLOAT),
            )
        };

        let mut registry = RgResourceRegistry::new();
        let fresh = registry.register_imported_image(
            "fresh_color",
            RgImportedImage::new(GfxImageHandle::default(), vk::Format::R16G16B16A16_SFLOAT),
        );

        // 两帧的第一个资源占用同一个 slot
        assert_eq!(fresh.key, last_frame.key);
        assert_ne!(fresh, last_frame);
        assert!(!registry.contains(last_frame));
        assert!(registry.get(last_frame).is_none());
        assert_eq!(registry.name(last_frame), "<unknown>");
        assert_eq!(registry.iter().map(|(handle, _)| handle).collect::<Vec<_>>(), vec![fresh]);
    }
}
