//! Pass 对资源的绑定方式与视图请求

use ash::vk;
use vanguard_render_interface::bindless::{GfxDescriptorKind, GfxViewDesc};

/// 资源在 pass 中的绑定方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgResourceBind {
    /// 着色器只读
    Srv,
    /// 着色器读写
    Uav,
    /// 只读深度
    Dsv,
    /// 间接绘制参数
    Indirect,
    /// 不经过着色器（拷贝等）
    Common,
}

impl RgResourceBind {
    /// 该绑定方式默认生成的 bindless 描述符
    #[inline]
    pub fn descriptor_kind(self) -> Option<GfxDescriptorKind> {
        match self {
            Self::Srv => Some(GfxDescriptorKind::Srv),
            Self::Uav => Some(GfxDescriptorKind::Uav),
            Self::Dsv | Self::Indirect | Self::Common => None,
        }
    }

    /// 写操作允许的绑定方式
    #[inline]
    pub fn is_writable(self) -> bool {
        matches!(self, Self::Uav | Self::Common)
    }

    /// 以该方式绑定图像需要的 usage
    pub fn image_usage(self, write: bool) -> vk::ImageUsageFlags {
        match self {
            Self::Srv => vk::ImageUsageFlags::SAMPLED,
            Self::Uav => vk::ImageUsageFlags::STORAGE,
            Self::Dsv => vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            Self::Indirect => vk::ImageUsageFlags::empty(),
            Self::Common if write => vk::ImageUsageFlags::TRANSFER_DST,
            Self::Common => vk::ImageUsageFlags::TRANSFER_SRC,
        }
    }

    /// 以该方式绑定缓冲区需要的 usage
    pub fn buffer_usage(self, write: bool) -> vk::BufferUsageFlags {
        match self {
            Self::Srv | Self::Uav => vk::BufferUsageFlags::STORAGE_BUFFER,
            Self::Indirect => vk::BufferUsageFlags::INDIRECT_BUFFER,
            Self::Dsv => vk::BufferUsageFlags::empty(),
            Self::Common if write => vk::BufferUsageFlags::TRANSFER_DST,
            Self::Common => vk::BufferUsageFlags::TRANSFER_SRC,
        }
    }
}

impl RgOutputBind {
    #[inline]
    pub fn image_usage(self) -> vk::ImageUsageFlags {
        match self {
            Self::Rtv => vk::ImageUsageFlags::COLOR_ATTACHMENT,
            Self::Dsv => vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        }
    }
}

/// 渲染目标的绑定方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgOutputBind {
    Rtv,
    Dsv,
}

/// 一个具名视图
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RgNamedView {
    pub name: String,
    pub view: GfxViewDesc,
}

/// Pass 对某个资源的视图请求
///
/// 默认情况下只根据绑定方式生成一个名为 `""` 的视图；
/// 也可以请求多个具名视图（例如逐 mip 的 UAV），在 pass 中通过
/// `RgPassResources::get_named` 取得对应的 bindless 索引。
///
/// ```ignore
/// pass.write(noise, RgViewRequest::custom().uav_mip("", 0).uav_mip("mip1", 1));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgViewRequest {
    pub(crate) bind: Option<RgResourceBind>,
    pub(crate) views: Vec<RgNamedView>,
}

// new & builder
impl RgViewRequest {
    /// 自定义视图请求，绑定方式由第一个视图决定
    pub fn custom() -> Self {
        Self {
            bind: None,
            views: Vec::new(),
        }
    }

    pub fn srv(self, name: impl Into<String>) -> Self {
        self.push(name.into(), GfxViewDesc::new(GfxDescriptorKind::Srv))
    }

    pub fn srv_mip(self, name: impl Into<String>, mip: u32) -> Self {
        self.push(name.into(), GfxViewDesc::new(GfxDescriptorKind::Srv).with_mip(mip))
    }

    pub fn uav(self, name: impl Into<String>) -> Self {
        self.push(name.into(), GfxViewDesc::new(GfxDescriptorKind::Uav))
    }

    pub fn uav_mip(self, name: impl Into<String>, mip: u32) -> Self {
        self.push(name.into(), GfxViewDesc::new(GfxDescriptorKind::Uav).with_mip(mip))
    }

    fn push(mut self, name: String, view: GfxViewDesc) -> Self {
        if self.bind.is_none() {
            self.bind = Some(match view.kind {
                GfxDescriptorKind::Srv => RgResourceBind::Srv,
                GfxDescriptorKind::Uav => RgResourceBind::Uav,
            });
        }
        self.views.push(RgNamedView { name, view });
        self
    }
}

// getters
impl RgViewRequest {
    /// 绑定方式；空的自定义请求视为 `Common`
    #[inline]
    pub fn bind(&self) -> RgResourceBind {
        self.bind.unwrap_or(RgResourceBind::Common)
    }

    /// 请求涉及的所有绑定方式（包括每个具名视图）
    pub fn binds(&self) -> impl Iterator<Item = RgResourceBind> + '_ {
        let views = self.views.iter().map(|named| match named.view.kind {
            GfxDescriptorKind::Srv => RgResourceBind::Srv,
            GfxDescriptorKind::Uav => RgResourceBind::Uav,
        });
        std::iter::once(self.bind()).chain(views)
    }

    /// 最终需要创建的所有具名视图
    pub fn resolved_views(&self) -> Vec<RgNamedView> {
        if !self.views.is_empty() {
            return self.views.clone();
        }
        match self.bind().descriptor_kind() {
            Some(kind) => vec![RgNamedView {
                name: String::new(),
                view: GfxViewDesc::new(kind),
            }],
            None => Vec::new(),
        }
    }
}

impl From<RgResourceBind> for RgViewRequest {
    fn from(bind: RgResourceBind) -> Self {
        Self {
            bind: Some(bind),
            views: Vec::new(),
        }
    }
}
