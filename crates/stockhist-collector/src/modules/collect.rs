//! 일봉 수집 실행.
//!
//! 1. 종목 목록 로드 (A주 필수, 홍콩 선택)
//! 2. 기존 데이터셋 로드 → 조회 기간 결정
//! 3. 라운드 단위 조회 (실패 종목 재시도)
//! 4. 기존 데이터와 한 번 병합 후 저장

use super::cooldown::CooldownObserver;
use super::rounds::RoundCoordinator;
use super::window::{IncrementalWindowPlanner, WindowPlan};
use crate::report::{RunReport, RunStatus};
use crate::{CollectorConfig, CollectorError, Result};
use chrono::NaiveDate;
use std::path::Path;
use std::time::Instant;
use stockhist_core::{Dataset, InstrumentRef, Market};
use stockhist_data::{load_instrument_list, DailyBarProvider, DatasetStore};
use tokio_util::sync::CancellationToken;

/// 수집 실행 결과
#[derive(Debug)]
pub struct CollectionOutcome {
    /// 병합 후 데이터셋
    pub dataset: Dataset,
    pub report: RunReport,
}

/// A주/홍콩 종목 목록을 읽습니다.
///
/// A주 목록을 읽지 못하면 에러입니다. 홍콩 목록은 읽지 못해도 경고만 남기고
/// A주 목록으로 계속 진행합니다.
pub fn load_instruments(primary: &Path, secondary: Option<&Path>) -> Result<Vec<InstrumentRef>> {
    let mut instruments =
        load_instrument_list(primary, Market::Domestic).map_err(CollectorError::InstrumentList)?;

    if let Some(path) = secondary {
        match load_instrument_list(path, Market::HongKong) {
            Ok(hk) => instruments.extend(hk),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "홍콩 종목 목록 로드 실패, A주만 수집"
                );
            }
        }
    }

    Ok(instruments)
}

/// 일봉 수집기
pub struct Collector<'a> {
    provider: &'a dyn DailyBarProvider,
    store: &'a dyn DatasetStore,
    config: &'a CollectorConfig,
    observer: &'a dyn CooldownObserver,
    cancel: CancellationToken,
}

impl<'a> Collector<'a> {
    pub fn new(
        provider: &'a dyn DailyBarProvider,
        store: &'a dyn DatasetStore,
        config: &'a CollectorConfig,
        observer: &'a dyn CooldownObserver,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            provider,
            store,
            config,
            observer,
            cancel,
        }
    }

    /// 한 번의 수집 실행.
    ///
    /// 조회 실패는 에러가 아니며 `report.residual_failures`에 남습니다.
    /// 기존 데이터셋을 읽거나 저장하지 못한 경우만 에러입니다.
    pub async fn run(
        &self,
        instruments: &[InstrumentRef],
        today: NaiveDate,
    ) -> Result<CollectionOutcome> {
        let start = Instant::now();

        let existing = self.store.load().map_err(CollectorError::Storage)?;
        let had_file = existing.is_some();
        let existing = existing.unwrap_or_default();
        let existing_records = existing.len();

        tracing::info!(
            provider = self.provider.name(),
            store = %self.store.location(),
            instruments = instruments.len(),
            existing_records,
            latest = ?existing.latest_date(),
            "수집 시작"
        );

        let planner = IncrementalWindowPlanner::new(self.config.lookback_days);
        let window = match planner.plan(existing.latest_date(), today) {
            WindowPlan::Fetch(window) => window,
            WindowPlan::UpToDate => {
                tracing::info!(latest = ?existing.latest_date(), %today, "이미 최신 데이터");
                let mut report = RunReport::up_to_date(today, instruments.len(), &existing);
                report.elapsed = start.elapsed();
                return Ok(CollectionOutcome {
                    dataset: existing,
                    report,
                });
            }
        };

        if instruments.is_empty() {
            tracing::warn!("수집할 종목이 없습니다");
            let mut report = RunReport::new(
                today,
                RunStatus::Complete,
                Some(window),
                0,
                0,
                &existing,
                existing_records,
            );
            report.elapsed = start.elapsed();
            return Ok(CollectionOutcome {
                dataset: existing,
                report,
            });
        }

        let coordinator =
            RoundCoordinator::new(self.provider, self.config, self.observer, &self.cancel);
        let rounds = coordinator.run(instruments, &window).await;

        let fetched_records = rounds.records.len();
        let dataset = existing.merge(rounds.records);

        // 받은 것도 없고 기존 파일도 없으면 빈 파일을 만들지 않음
        let persisted = if fetched_records == 0 && !had_file {
            tracing::warn!("저장할 데이터 없음");
            false
        } else {
            self.store.save(&dataset).map_err(CollectorError::Storage)?;
            true
        };

        let status = if rounds.cancelled {
            RunStatus::Cancelled
        } else if rounds.residual_failures.is_empty() {
            RunStatus::Complete
        } else {
            RunStatus::Partial
        };

        let mut report = RunReport::new(
            today,
            status,
            Some(window),
            instruments.len(),
            instruments.len(),
            &dataset,
            existing_records,
        )
        .with_results(rounds.succeeded, rounds.residual_failures, rounds.rounds_executed);
        report.fetched_records = fetched_records;
        report.persisted = persisted;
        report.elapsed = start.elapsed();

        Ok(CollectionOutcome { dataset, report })
    }
}
