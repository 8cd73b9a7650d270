//! Vanguard 渲染接口
//!
//! RenderGraph 与具体图形设备之间的边界：物理资源句柄、bindless 索引、
//! barrier 描述、命令录制与队列提交的能力接口，以及帧级配置。
//!
//! `NullGfxDevice` 是一个不依赖 GPU 的实现，它把所有调用记录下来，
//! 用于测试和离线调试 RenderGraph 的调度结果。

pub mod barrier;
pub mod bindless;
pub mod command_list;
pub mod device;
pub mod handles;
pub mod memory;
pub mod null_device;
pub mod pipeline_settings;
pub mod queue;
