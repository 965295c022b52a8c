use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

/// 指数退避：从 `initial` 开始每次翻倍，不超过 `max`
#[derive(Clone, Debug)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        let max = max.max(initial);
        Backoff {
            initial,
            max,
            current: initial,
        }
    }

    /// 返回本次等待时间并推进到下一档
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// 反复运行 `task` 直到它正常返回。每次失败都记录错误并按退避等待后重启，
/// 退避不会因为重启而复位。
pub async fn run_with_restart<F, Fut, E>(mut backoff: Backoff, mut task: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    loop {
        info!("启动轮询任务");
        match task().await {
            Ok(()) => return,
            Err(e) => {
                let delay = backoff.next_delay();
                error!(error = %e, delay_secs = delay.as_secs(), "轮询任务出错，稍后重启");
                sleep(delay).await;
            }
        }
    }
}
