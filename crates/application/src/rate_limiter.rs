//! 准入控制（滑动窗口限流）
//!
//! 所有写操作入口都先经过这里；超出配额的请求在进入下游之前被拒绝，
//! 不消耗任何下游资源。计数存储抽象为 [`CounterStore`]，
//! 内存实现见 [`crate::memory::MemoryCounterStore`]，Redis 实现在基础设施层。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::Timestamp;
use thiserror::Error;

use crate::clock::Clock;

/// 限流动作类别。
///
/// 每个类别有独立的 `(max_count, window)` 策略和独立的计数键空间。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionClass {
    Login,
    Signup,
    SendMessage,
    Like,
    ProfileView,
}

/// 单个动作类别的限流策略
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    /// 窗口内允许的最大动作数
    pub max_count: u32,
    /// 窗口时长
    pub window: Duration,
}

impl ActionClass {
    /// 类别对应的策略。
    pub fn policy(&self) -> RateLimitPolicy {
        match self {
            // 登录：15 分钟 5 次
            ActionClass::Login => RateLimitPolicy {
                max_count: 5,
                window: Duration::from_secs(15 * 60),
            },
            // 注册：每小时 3 次
            ActionClass::Signup => RateLimitPolicy {
                max_count: 3,
                window: Duration::from_secs(60 * 60),
            },
            // 发消息：每分钟 30 条
            ActionClass::SendMessage => RateLimitPolicy {
                max_count: 30,
                window: Duration::from_secs(60),
            },
            // 点赞：每小时 50 次
            ActionClass::Like => RateLimitPolicy {
                max_count: 50,
                window: Duration::from_secs(60 * 60),
            },
            // 查看资料：每小时 100 次
            ActionClass::ProfileView => RateLimitPolicy {
                max_count: 100,
                window: Duration::from_secs(60 * 60),
            },
        }
    }

    /// 计数键前缀，每个类别独立的键空间。
    pub fn key_prefix(&self) -> &'static str {
        match self {
            ActionClass::Login => "login",
            ActionClass::Signup => "signup",
            ActionClass::SendMessage => "message",
            ActionClass::Like => "like",
            ActionClass::ProfileView => "profile_view",
        }
    }

    /// 计数存储不可用时的失败方向。
    ///
    /// 安全敏感类别（登录、注册）失败即拒绝，低风险类别放行。
    pub fn fails_closed(&self) -> bool {
        matches!(self, ActionClass::Login | ActionClass::Signup)
    }
}

/// 某个计数窗口的当前状态
#[derive(Debug, Clone, Copy)]
pub struct WindowState {
    /// 本窗口内已计入的动作数（含本次）
    pub count: u64,
    /// 窗口到期、计数归零的时刻
    pub reset_at: Timestamp,
}

/// 计数存储错误
#[derive(Debug, Error, Clone)]
#[error("counter store error: {message}")]
pub struct CounterStoreError {
    pub message: String,
}

impl CounterStoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 滑动窗口计数存储。
///
/// `incr` 必须是原子的：同一个键的并发调用各自拿到不同的计数值。
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn incr(&self, key: &str, window: Duration) -> Result<WindowState, CounterStoreError>;
}

/// 准入判定结果
#[derive(Debug, Clone, Copy)]
pub struct AdmissionDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: Timestamp,
}

impl AdmissionDecision {
    /// 距离窗口重置的秒数（向上取整，最小 0）。
    pub fn retry_after_secs(&self, now: Timestamp) -> i64 {
        let millis = (self.reset_at - now).num_milliseconds();
        if millis <= 0 {
            0
        } else {
            (millis + 999) / 1000
        }
    }
}

/// 准入控制错误
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// 计数存储不可用且该动作类别配置为失败拒绝
    #[error("admission counter store unavailable: {0}")]
    StoreUnavailable(String),
}

/// 准入控制器
///
/// 按 `(动作类别, 标识符)` 维护滑动窗口计数，超额请求直接拒绝。
pub struct AdmissionController {
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl AdmissionController {
    pub fn new(store: Arc<dyn CounterStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// 判定 `identifier` 是否被允许执行一次 `class` 类动作。
    ///
    /// 计数存储故障时按类别的失败方向处理：失败拒绝的类别返回
    /// [`AdmissionError::StoreUnavailable`]，其余类别放行并记录告警。
    pub async fn admit(
        &self,
        class: ActionClass,
        identifier: &str,
    ) -> Result<AdmissionDecision, AdmissionError> {
        let policy = class.policy();
        let key = format!("ratelimit:{}:{}", class.key_prefix(), identifier);

        let state = match self.store.incr(&key, policy.window).await {
            Ok(state) => state,
            Err(err) => {
                if class.fails_closed() {
                    return Err(AdmissionError::StoreUnavailable(err.message));
                }
                tracing::warn!(
                    class = class.key_prefix(),
                    error = %err,
                    "counter store unavailable, failing open"
                );
                return Ok(AdmissionDecision {
                    allowed: true,
                    limit: policy.max_count,
                    remaining: policy.max_count,
                    reset_at: self.clock.now() + policy.window,
                });
            }
        };

        let allowed = state.count <= u64::from(policy.max_count);
        let remaining = u64::from(policy.max_count).saturating_sub(state.count) as u32;

        if !allowed {
            tracing::debug!(
                class = class.key_prefix(),
                identifier,
                count = state.count,
                "admission rejected"
            );
        }

        Ok(AdmissionDecision {
            allowed,
            limit: policy.max_count,
            remaining,
            reset_at: state.reset_at,
        })
    }
}
