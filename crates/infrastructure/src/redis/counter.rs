//! Redis 滑动窗口计数器
//!
//! INCR 与首次过期设置在同一段 Lua 脚本里执行，保证并发调用下
//! 每个键恰好设置一次过期时间，计数严格递增。

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::Script;

use application::{CounterStore, CounterStoreError, WindowState};

/// 计数加一；键首次出现时设置窗口过期。返回 (计数, 剩余毫秒)。
const INCR_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
return {count, ttl}
"#;

pub struct RedisCounterStore {
    connection: ConnectionManager,
    script: Script,
}

impl RedisCounterStore {
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self {
            connection,
            script: Script::new(INCR_SCRIPT),
        })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str, window: Duration) -> Result<WindowState, CounterStoreError> {
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        let mut conn = self.connection.clone();

        let (count, ttl_ms): (i64, i64) = self
            .script
            .key(key)
            .arg(window_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|err| CounterStoreError::new(err.to_string()))?;

        // PTTL 为负说明键已无过期（过期与查询之间的竞争），按完整窗口兜底
        let remaining_ms = if ttl_ms > 0 { ttl_ms } else { window_ms };
        let reset_at = Utc::now() + chrono::Duration::milliseconds(remaining_ms);

        Ok(WindowState {
            count: u64::try_from(count).unwrap_or(0),
            reset_at,
        })
    }
}
