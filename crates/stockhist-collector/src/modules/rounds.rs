//! 재시도 라운드 관리.
//!
//! ```text
//! 대기 목록 ──► 조회 ──► 실패 없음 ─────────────────► 완료
//!    ▲                  │
//!    │                  ├─ round < max_rounds ─► 쿨다운 ─┐
//!    │                  │                               │
//!    └──────── 실패 종목만 ◄───────────────────────────────┘
//!                       └─ round == max_rounds ─► 완료 (잔여 실패)
//! ```
//!
//! 조회한 레코드는 버퍼에 모아 두었다가 실행 끝에 한 번만 병합합니다.

use super::cooldown::{pause, CooldownObserver, CooldownTimer};
use super::fetch::{FetchOutcome, FetchWithRetry};
use crate::CollectorConfig;
use std::collections::{HashMap, HashSet};
use stockhist_core::{DateWindow, FailureRecord, InstrumentKey, InstrumentRef, Market, StockRecord};
use stockhist_data::DailyBarProvider;
use tokio_util::sync::CancellationToken;

/// 한 라운드의 실패 종목 목록.
///
/// 입력 순서를 유지하며 `(code, market)` 키로 중복 없이 보관합니다.
#[derive(Debug, Default, Clone)]
pub struct FailureSet {
    records: Vec<FailureRecord>,
    index: HashSet<InstrumentKey>,
}

impl FailureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 실패 종목 추가. 이미 있으면 무시.
    pub fn push(&mut self, instrument: &InstrumentRef) {
        if self.index.insert(instrument.key()) {
            self.records.push(FailureRecord::from(instrument));
        }
    }

    pub fn extend<'i>(&mut self, instruments: impl IntoIterator<Item = &'i InstrumentRef>) {
        for instrument in instruments {
            self.push(instrument);
        }
    }

    pub fn contains(&self, key: &InstrumentKey) -> bool {
        self.index.contains(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FailureRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<FailureRecord> {
        self.records
    }
}

/// 라운드 실행 결과.
#[derive(Debug, Default)]
pub struct RoundOutcome {
    /// 성공한 종목들의 레코드 (병합 전)
    pub records: Vec<StockRecord>,
    /// 마지막 라운드 후에도 실패한 종목
    pub residual_failures: Vec<FailureRecord>,
    /// 실행한 라운드 수 (첫 조회 포함)
    pub rounds_executed: u32,
    /// 데이터를 얻은 종목 수
    pub succeeded: usize,
    /// 취소로 중단되었는지 여부
    pub cancelled: bool,
}

/// 재시도 라운드 조정자.
pub struct RoundCoordinator<'a> {
    provider: &'a dyn DailyBarProvider,
    config: &'a CollectorConfig,
    observer: &'a dyn CooldownObserver,
    cancel: &'a CancellationToken,
    timer: CooldownTimer,
}

impl<'a> RoundCoordinator<'a> {
    pub fn new(
        provider: &'a dyn DailyBarProvider,
        config: &'a CollectorConfig,
        observer: &'a dyn CooldownObserver,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            provider,
            config,
            observer,
            cancel,
            timer: CooldownTimer::new(),
        }
    }

    /// 모든 종목을 순서대로 조회하고, 실패한 종목만 다시 조회합니다.
    pub async fn run(&self, instruments: &[InstrumentRef], window: &DateWindow) -> RoundOutcome {
        let max_rounds = self.config.rounds.max_rounds.max(1);
        let fetcher = FetchWithRetry::new(self.provider, self.cancel);

        let mut pending: Vec<InstrumentRef> = instruments.to_vec();
        let mut outcome = RoundOutcome::default();
        let mut round = 1;

        loop {
            tracing::info!(round, max_rounds, pending = pending.len(), %window, "라운드 시작");

            let mut failures = FailureSet::new();
            let mut processed: HashMap<Market, usize> = HashMap::new();
            let totals = count_by_market(&pending);

            for (idx, instrument) in pending.iter().enumerate() {
                if self.cancel.is_cancelled() {
                    failures.extend(&pending[idx..]);
                    outcome.cancelled = true;
                    break;
                }

                let policy = self.config.policy(instrument.market);

                match fetcher.fetch(instrument, window, policy).await {
                    FetchOutcome::Success(records) => {
                        outcome.succeeded += 1;
                        outcome.records.extend(records);
                    }
                    FetchOutcome::Empty | FetchOutcome::Failed { .. } => {
                        failures.push(instrument);
                    }
                    FetchOutcome::Cancelled => {
                        // 조회 중이던 종목부터 남은 종목 모두 실패 처리
                        failures.extend(&pending[idx..]);
                        outcome.cancelled = true;
                        break;
                    }
                }

                let done = processed.entry(instrument.market).or_default();
                *done += 1;
                let total = totals.get(&instrument.market).copied().unwrap_or_default();
                if *done % policy.progress_every.max(1) == 0 || *done == total {
                    tracing::info!(
                        round,
                        market = instrument.market.label(),
                        progress = format!("{}/{}", done, total),
                        failures = failures.len(),
                        "수집 진행"
                    );
                }

                if pause(policy.pacing_delay, self.cancel).await.is_cancelled() {
                    failures.extend(&pending[idx + 1..]);
                    outcome.cancelled = true;
                    break;
                }
            }

            outcome.rounds_executed = round;

            if outcome.cancelled {
                tracing::warn!(round, unresolved = failures.len(), "수집 취소됨");
                outcome.residual_failures = failures.into_records();
                return outcome;
            }

            if failures.is_empty() {
                tracing::info!(round, "모든 종목 수집 완료");
                return outcome;
            }

            if round >= max_rounds {
                tracing::warn!(
                    round,
                    residual = failures.len(),
                    "최대 라운드 도달, 실패 종목 남음"
                );
                outcome.residual_failures = failures.into_records();
                return outcome;
            }

            tracing::info!(round, failures = failures.len(), "실패 종목 재시도 예정");

            let wait = self
                .timer
                .wait(self.config.rounds.cooldown, round + 1, self.observer, self.cancel)
                .await;
            if wait.is_cancelled() {
                outcome.cancelled = true;
                outcome.residual_failures = failures.into_records();
                return outcome;
            }

            pending.retain(|i| failures.contains(&i.key()));
            round += 1;
        }
    }
}

fn count_by_market(instruments: &[InstrumentRef]) -> HashMap<Market, usize> {
    let mut counts = HashMap::new();
    for instrument in instruments {
        *counts.entry(instrument.market).or_default() += 1;
    }
    counts
}
