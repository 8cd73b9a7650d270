use std::fmt;

/// GPU 队列类型
///
/// 每种队列拥有独立的命令流与执行顺序，跨队列访问需要显式同步。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GfxQueueType {
    Graphics,
    Compute,
    Copy,
}

impl GfxQueueType {
    pub const ALL: [GfxQueueType; 3] = [GfxQueueType::Graphics, GfxQueueType::Compute, GfxQueueType::Copy];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::Graphics => 0,
            Self::Compute => 1,
            Self::Copy => 2,
        }
    }
}

impl fmt::Display for GfxQueueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graphics => write!(f, "Graphics"),
            Self::Compute => write!(f, "Compute"),
            Self::Copy => write!(f, "Copy"),
        }
    }
}

/// 等待另一个队列的 timeline 计数到达 `value`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxTimelineWait {
    pub queue: GfxQueueType,
    pub value: u64,
}
