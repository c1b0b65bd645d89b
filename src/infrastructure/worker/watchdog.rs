//! Liveness Watchdog - 空闲超时退出
//!
//! 消费循环在收到消息和处理结束时刷新活动时间；
//! 看门狗按固定间隔检查，空闲时间达到阈值就调用退出钩子。
//! 处理任务期间不计空闲。

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::infrastructure::broker::BrokerCloser;

/// 活动时钟
///
/// 单写（消费循环）单读（看门狗），只用原子量共享
pub struct ActivityClock {
    origin: Instant,
    /// 相对 origin 的毫秒数
    last_activity_ms: AtomicU64,
    in_flight: AtomicBool,
}

impl ActivityClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
            in_flight: AtomicBool::new(false),
        }
    }

    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    /// 刷新活动时间
    pub fn touch(&self) {
        self.last_activity_ms.store(self.now_ms(), Ordering::Release);
    }

    /// 收到消息，开始处理
    pub fn begin_task(&self) {
        self.touch();
        self.in_flight.store(true, Ordering::Release);
    }

    /// 处理结束
    pub fn end_task(&self) {
        self.touch();
        self.in_flight.store(false, Ordering::Release);
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// 空闲时长；处理中返回 None
    pub fn idle_for(&self) -> Option<Duration> {
        if self.is_busy() {
            return None;
        }
        let last = self.last_activity_ms.load(Ordering::Acquire);
        Some(Duration::from_millis(self.now_ms().saturating_sub(last)))
    }
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}

/// 空闲超时后的动作
#[async_trait]
pub trait IdleShutdown: Send + Sync {
    async fn on_idle(&self, idle: Duration);
}

/// 生产环境的退出动作：关闭 broker 连接后直接结束进程
pub struct ProcessExit {
    closer: Option<BrokerCloser>,
    close_timeout: Duration,
}

impl ProcessExit {
    pub fn new(closer: Option<BrokerCloser>) -> Self {
        Self {
            closer,
            close_timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl IdleShutdown for ProcessExit {
    async fn on_idle(&self, idle: Duration) {
        tracing::warn!(idle_secs = idle.as_secs(), "Idle timeout reached, exiting process");
        if let Some(closer) = &self.closer {
            if tokio::time::timeout(self.close_timeout, closer.close()).await.is_err() {
                tracing::warn!("Timed out closing broker connection");
            }
        }
        std::process::exit(0);
    }
}

/// 看门狗
pub struct LivenessWatchdog {
    clock: Arc<ActivityClock>,
    idle_timeout: Duration,
    poll_interval: Duration,
    shutdown: Arc<dyn IdleShutdown>,
}

impl LivenessWatchdog {
    pub fn new(
        clock: Arc<ActivityClock>,
        idle_timeout: Duration,
        poll_interval: Duration,
        shutdown: Arc<dyn IdleShutdown>,
    ) -> Self {
        Self {
            clock,
            idle_timeout,
            poll_interval,
            shutdown,
        }
    }

    pub fn spawn(self) -> JoinHandle<Duration> {
        tokio::spawn(self.run())
    }

    /// 运行到空闲超时为止，返回触发时的空闲时长
    pub async fn run(self) -> Duration {
        tracing::info!(
            idle_timeout_secs = self.idle_timeout.as_secs(),
            poll_interval_secs = self.poll_interval.as_secs(),
            "Watchdog started"
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(idle) = self.clock.idle_for() else {
                continue;
            };
            if idle >= self.idle_timeout {
                self.shutdown.on_idle(idle).await;
                return idle;
            }
        }
    }
}
