//! 跨队列同步
//!
//! 每个队列维护一个单调递增的 timeline 计数。帧内每个启用的 pass 在所在队列上
//! 拥有一个从 1 开始的局部序号，实际提交的计数为 `帧基数 + 局部序号`。
//! 跨队列的依赖表示为「消费者等待生产者队列到达某个计数」，生产者 pass 负责 signal。

use vanguard_render_interface::queue::{GfxQueueType, GfxTimelineWait};

/// 一个 pass 的跨队列同步信息（帧内局部计数）
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RgPassSync {
    /// 该 pass 在所在队列上的局部序号，从 1 开始；禁用的 pass 为 0
    pub timeline_value: u64,
    /// 执行前需要等待的其他队列的局部计数
    pub waits: Vec<GfxTimelineWait>,
    /// 其他队列依赖该 pass 的结果
    pub signal: bool,
}

impl RgPassSync {
    #[inline]
    pub fn has_waits(&self) -> bool {
        !self.waits.is_empty()
    }
}

/// 跨帧持久的 timeline 基数
///
/// 由调用者持有，每帧执行完毕后按各队列执行的 pass 数推进。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RgQueueTimelines {
    base: [u64; 3],
}

impl RgQueueTimelines {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn base(&self, queue: GfxQueueType) -> u64 {
        self.base[queue.index()]
    }

    /// 将局部计数转换为设备上的绝对计数
    #[inline]
    pub fn absolute(&self, queue: GfxQueueType, local_value: u64) -> u64 {
        self.base[queue.index()] + local_value
    }

    #[inline]
    pub fn absolute_wait(&self, wait: &GfxTimelineWait) -> GfxTimelineWait {
        GfxTimelineWait {
            queue: wait.queue,
            value: self.absolute(wait.queue, wait.value),
        }
    }

    /// 帧结束时推进
    #[inline]
    pub fn advance(&mut self, queue: GfxQueueType, pass_count: u64) {
        self.base[queue.index()] += pass_count;
    }
}

/// 去掉冗余的等待
///
/// `raw_waits` 按 pass 声明顺序给出（所在队列, 原始等待列表）。同一个生产者队列只保留最大值，
/// 已经被同一消费者队列上更早的等待覆盖的计数会被丢弃。
pub(crate) fn reduce_waits(raw_waits: &[(GfxQueueType, Vec<GfxTimelineWait>)]) -> Vec<Vec<GfxTimelineWait>> {
    let mut satisfied = [[0u64; 3]; 3];

    raw_waits
        .iter()
        .map(|(consumer_queue, waits)| {
            let mut max_per_queue = [0u64; 3];
            for wait in waits {
                let slot = &mut max_per_queue[wait.queue.index()];
                *slot = (*slot).max(wait.value);
            }

            let known = &mut satisfied[consumer_queue.index()];
            GfxQueueType::ALL
                .into_iter()
                .filter_map(|producer_queue| {
                    let value = max_per_queue[producer_queue.index()];
                    if value == 0 || value <= known[producer_queue.index()] {
                        return None;
                    }
                    known[producer_queue.index()] = value;
                    Some(GfxTimelineWait {
                        queue: producer_queue,
                        value,
                    })
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wait(queue: GfxQueueType, value: u64) -> GfxTimelineWait {
        GfxTimelineWait { queue, value }
    }

    #[test]
    fn test_reduce_keeps_max_per_queue() {
        let reduced = reduce_waits(&[(
            GfxQueueType::Graphics,
            vec![wait(GfxQueueType::Compute, 1), wait(GfxQueueType::Compute, 3), wait(GfxQueueType::Copy, 2)],
        )]);
        assert_eq!(reduced[0], vec![wait(GfxQueueType::Compute, 3), wait(GfxQueueType::Copy, 2)]);
    }

    #[test]
    fn test_reduce_drops_implied_waits() {
        let reduced = reduce_waits(&[
            (GfxQueueType::Graphics, vec![wait(GfxQueueType::Compute, 2)]),
            (GfxQueueType::Compute, vec![]),
            (GfxQueueType::Graphics, vec![wait(GfxQueueType::Compute, 1)]),
            (GfxQueueType::Copy, vec![wait(GfxQueueType::Compute, 1)]),
        ]);
        assert_eq!(reduced[0].len(), 1);
        assert!(reduced[2].is_empty());
        assert_eq!(reduced[3], vec![wait(GfxQueueType::Compute, 1)]);
    }

    #[test]
    fn test_timelines_advance() {
        let mut timelines = RgQueueTimelines::new();
        timelines.advance(GfxQueueType::Compute, 4);
        assert_eq!(timelines.absolute(GfxQueueType::Compute, 2), 6);
        assert_eq!(timelines.absolute(GfxQueueType::Graphics, 2), 2);
    }
}
