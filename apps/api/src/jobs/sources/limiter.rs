//! Call-rate ceilings for the authenticated source.
//!
//! A call is permitted only while the counter for the current window is below
//! the ceiling. Rejections are immediate; nothing queues.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

#[async_trait]
pub trait CallLimiter: Send + Sync {
    /// Returns `true` and records the call if the ceiling allows it.
    async fn try_acquire(&self) -> bool;
}

struct Window {
    count: u32,
    started: Instant,
}

/// In-process window: a counter plus the instant the window opened.
/// The window resets once more than `window` has elapsed since it opened.
pub struct SlidingWindowLimiter {
    ceiling: u32,
    window: Duration,
    state: Mutex<Window>,
}

impl SlidingWindowLimiter {
    pub fn new(ceiling: u32, window: Duration) -> Self {
        Self {
            ceiling,
            window,
            state: Mutex::new(Window {
                count: 0,
                started: Instant::now(),
            }),
        }
    }

    pub fn per_minute(ceiling: u32) -> Self {
        Self::new(ceiling, Duration::from_secs(60))
    }
}

#[async_trait]
impl CallLimiter for SlidingWindowLimiter {
    async fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.started.elapsed() > self.window {
            state.count = 0;
            state.started = Instant::now();
        }
        if state.count < self.ceiling {
            state.count += 1;
            true
        } else {
            false
        }
    }
}

/// Redis window shared by every instance: `INCR` on a per-window key that
/// expires with the window. Redis failures permit the call.
pub struct RedisWindowLimiter {
    client: redis::Client,
    ceiling: u32,
    window: Duration,
    key_prefix: String,
}

impl RedisWindowLimiter {
    pub fn new(client: redis::Client, ceiling: u32, window: Duration, key_prefix: &str) -> Self {
        Self {
            client,
            ceiling,
            window,
            key_prefix: key_prefix.to_string(),
        }
    }

    async fn increment(&self) -> redis::RedisResult<u64> {
        let window_secs = self.window.as_secs().max(1);
        let bucket = chrono::Utc::now().timestamp().max(0) as u64 / window_secs;
        let key = format!("{}:{bucket}", self.key_prefix);

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let count: u64 = redis::cmd("INCR")
            .arg(&key)
            .query_async::<_, u64>(&mut conn)
            .await?;
        if count == 1 {
            redis::cmd("EXPIRE")
                .arg(&key)
                .arg(window_secs)
                .query_async::<_, ()>(&mut conn)
                .await?;
        }
        Ok(count)
    }
}

#[async_trait]
impl CallLimiter for RedisWindowLimiter {
    async fn try_acquire(&self) -> bool {
        match self.increment().await {
            Ok(count) => count <= u64::from(self.ceiling),
            Err(e) => {
                warn!("Rate limiter unavailable, permitting call: {e}");
                true
            }
        }
    }
}
