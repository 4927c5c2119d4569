//! 종목 단위 재시도 조회.

use super::cooldown::pause;
use crate::config::MarketPolicy;
use stockhist_core::{DateWindow, InstrumentRef, StockRecord};
use stockhist_data::{DailyBarProvider, SymbolAdapter};
use tokio_util::sync::CancellationToken;

/// 종목 하나를 조회한 결과.
#[derive(Debug)]
pub enum FetchOutcome {
    /// 레코드 1건 이상 수신
    Success(Vec<StockRecord>),
    /// 조회는 성공했지만 데이터 없음 (같은 호출 안에서는 재시도하지 않음)
    Empty,
    /// 모든 시도 실패
    Failed { attempts: u32, last_error: String },
    /// 취소 신호 수신
    Cancelled,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// 시장 정책에 따라 제공자 호출을 재시도합니다.
///
/// 에러를 반환하지 않습니다. 모든 실패는 `FetchOutcome`으로 바뀌고 로그로 남습니다.
pub struct FetchWithRetry<'a> {
    provider: &'a dyn DailyBarProvider,
    cancel: &'a CancellationToken,
}

impl<'a> FetchWithRetry<'a> {
    pub fn new(provider: &'a dyn DailyBarProvider, cancel: &'a CancellationToken) -> Self {
        Self { provider, cancel }
    }

    /// 최대 `policy.max_attempts`번 호출합니다.
    ///
    /// i번째 실패 후 `attempt_backoff_base * i`만큼 기다린 뒤 다시 시도합니다.
    pub async fn fetch(
        &self,
        instrument: &InstrumentRef,
        window: &DateWindow,
        policy: &MarketPolicy,
    ) -> FetchOutcome {
        let max_attempts = policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let response = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return FetchOutcome::Cancelled,
                r = self.provider.fetch_daily(&instrument.code, instrument.market, window) => r,
            };

            match response.and_then(|rows| SymbolAdapter::normalize(&rows, instrument)) {
                Ok(records) if records.is_empty() => {
                    tracing::warn!(
                        code = %instrument.code,
                        market = %instrument.market,
                        attempt,
                        "데이터 없음"
                    );
                    return FetchOutcome::Empty;
                }
                Ok(records) => {
                    tracing::debug!(
                        code = %instrument.code,
                        market = %instrument.market,
                        attempt,
                        records = records.len(),
                        "조회 성공"
                    );
                    return FetchOutcome::Success(records);
                }
                Err(e) => {
                    tracing::warn!(
                        code = %instrument.code,
                        market = %instrument.market,
                        attempt,
                        max_attempts,
                        error = %e,
                        "조회 실패"
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < max_attempts
                && pause(policy.backoff_after(attempt), self.cancel)
                    .await
                    .is_cancelled()
            {
                return FetchOutcome::Cancelled;
            }
        }

        tracing::error!(
            code = %instrument.code,
            name = %instrument.name,
            market = %instrument.market,
            attempts = max_attempts,
            error = %last_error,
            "재시도 모두 실패"
        );

        FetchOutcome::Failed {
            attempts: max_attempts,
            last_error,
        }
    }
}
