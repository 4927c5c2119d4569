//! 취소 가능한 대기.
//!
//! 수집 파이프라인의 대기 지점(종목 간 간격, 재시도 대기, 라운드 사이 쿨다운)은
//! 모두 `CancellationToken`과 함께 `select!`로 기다립니다. 쿨다운은 남은 시간을
//! 관찰자에게 주기적으로 알려 카운트다운을 표시할 수 있게 합니다.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// 대기 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// 지정한 시간이 모두 지남
    Elapsed,
    /// 취소 신호 수신
    Cancelled,
}

impl WaitOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// 쿨다운 진행 상황 관찰자.
pub trait CooldownObserver: Send + Sync {
    /// 쿨다운 시작. `next_round`는 쿨다운 후 시작할 라운드 번호.
    fn on_start(&self, next_round: u32, total: Duration);

    /// 남은 시간 알림.
    fn on_tick(&self, remaining: Duration);

    /// 쿨다운 종료.
    fn on_finish(&self, outcome: WaitOutcome);
}

/// tracing 로그로 카운트다운을 남기는 관찰자.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCountdown;

impl CooldownObserver for TracingCountdown {
    fn on_start(&self, next_round: u32, total: Duration) {
        tracing::info!(
            next_round,
            cooldown_secs = total.as_secs(),
            "재시도 전 쿨다운 시작"
        );
    }

    fn on_tick(&self, remaining: Duration) {
        let secs = remaining.as_secs();
        if secs % 60 == 0 || secs <= 5 {
            tracing::info!(remaining_secs = secs, "쿨다운 남은 시간");
        } else {
            tracing::debug!(remaining_secs = secs, "쿨다운 남은 시간");
        }
    }

    fn on_finish(&self, outcome: WaitOutcome) {
        match outcome {
            WaitOutcome::Elapsed => tracing::info!("쿨다운 완료"),
            WaitOutcome::Cancelled => tracing::warn!("쿨다운 중 취소됨"),
        }
    }
}

/// 카운트다운을 알리며 기다리는 타이머.
///
/// 마지막 1분 전까지는 `coarse_tick`, 그 이후에는 `fine_tick` 간격으로 알립니다.
#[derive(Debug, Clone)]
pub struct CooldownTimer {
    coarse_tick: Duration,
    fine_tick: Duration,
    fine_threshold: Duration,
}

impl Default for CooldownTimer {
    fn default() -> Self {
        Self {
            coarse_tick: Duration::from_secs(10),
            fine_tick: Duration::from_secs(1),
            fine_threshold: Duration::from_secs(60),
        }
    }
}

impl CooldownTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `duration` 동안 기다립니다. 취소되면 즉시 `Cancelled`를 반환합니다.
    pub async fn wait(
        &self,
        duration: Duration,
        next_round: u32,
        observer: &dyn CooldownObserver,
        cancel: &CancellationToken,
    ) -> WaitOutcome {
        if cancel.is_cancelled() {
            observer.on_finish(WaitOutcome::Cancelled);
            return WaitOutcome::Cancelled;
        }

        observer.on_start(next_round, duration);
        let deadline = Instant::now() + duration;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                observer.on_finish(WaitOutcome::Elapsed);
                return WaitOutcome::Elapsed;
            }

            observer.on_tick(remaining);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    observer.on_finish(WaitOutcome::Cancelled);
                    return WaitOutcome::Cancelled;
                }
                _ = tokio::time::sleep(self.step(remaining)) => {}
            }
        }
    }

    fn step(&self, remaining: Duration) -> Duration {
        let tick = if remaining <= self.fine_threshold {
            self.fine_tick
        } else {
            // 다음 알림이 임계값을 넘지 않도록 맞춤
            self.coarse_tick.min(remaining - self.fine_threshold)
        };
        tick.min(remaining)
    }
}

/// 알림 없이 취소 가능하게 기다립니다. 0이면 바로 반환합니다.
pub async fn pause(duration: Duration, cancel: &CancellationToken) -> WaitOutcome {
    if cancel.is_cancelled() {
        return WaitOutcome::Cancelled;
    }
    if duration.is_zero() {
        return WaitOutcome::Elapsed;
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => WaitOutcome::Cancelled,
        _ = tokio::time::sleep(duration) => WaitOutcome::Elapsed,
    }
}
