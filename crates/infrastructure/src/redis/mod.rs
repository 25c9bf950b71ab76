//! Redis 基础设施
//!
//! 两个职责：滑动窗口限流的原子计数器，以及跨节点的消息广播。
//! 两者都不参与业务一致性，Redis 不可用时上层自行决定放行或拒绝。

pub mod broadcast;
pub mod counter;
