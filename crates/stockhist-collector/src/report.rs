//! 실행 결과 요약.

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use stockhist_core::{Dataset, DateWindow, FailureRecord, Market};

/// 실행 결과 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// 기존 데이터가 최신이라 조회하지 않음
    UpToDate,
    /// 모든 종목 수집 성공
    Complete,
    /// 일부 종목 실패
    Partial,
    /// 취소됨
    Cancelled,
}

/// 실행 결과 요약
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// 실행 기준일
    pub run_date: NaiveDate,
    pub status: RunStatus,
    /// 조회 기간 (최신이면 없음)
    pub window: Option<DateWindow>,
    /// 목록 파일에 있는 종목 수
    pub listed_instruments: usize,
    /// 이번 실행에서 조회 대상이 된 종목 수
    pub total_instruments: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// 성공률 (%)
    pub success_rate: f64,
    pub residual_failures: Vec<FailureRecord>,
    pub rounds_executed: u32,
    /// 실행 전 레코드 수
    pub existing_records: usize,
    /// 이번에 받아온 레코드 수 (병합 전)
    pub fetched_records: usize,
    /// 병합 후 레코드 수
    pub total_records: usize,
    /// 병합으로 늘어난 레코드 수
    pub new_records: usize,
    pub records_by_market: BTreeMap<Market, usize>,
    pub distinct_instruments: usize,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// 데이터셋 저장 여부
    pub persisted: bool,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl RunReport {
    /// 조회 없이 끝난 실행의 요약
    pub fn up_to_date(run_date: NaiveDate, listed: usize, dataset: &Dataset) -> Self {
        Self::new(run_date, RunStatus::UpToDate, None, listed, 0, dataset, dataset.len())
    }

    /// 기본 필드만 채운 요약을 만듭니다. 조회 결과는 호출 측에서 채웁니다.
    pub fn new(
        run_date: NaiveDate,
        status: RunStatus,
        window: Option<DateWindow>,
        listed_instruments: usize,
        total_instruments: usize,
        dataset: &Dataset,
        existing_records: usize,
    ) -> Self {
        Self {
            run_date,
            status,
            window,
            listed_instruments,
            total_instruments,
            success_count: 0,
            failure_count: 0,
            success_rate: 0.0,
            residual_failures: Vec::new(),
            rounds_executed: 0,
            existing_records,
            fetched_records: 0,
            total_records: dataset.len(),
            new_records: dataset.len().saturating_sub(existing_records),
            records_by_market: dataset.count_by_market(),
            distinct_instruments: dataset.distinct_instruments(),
            date_range: dataset.date_range(),
            persisted: false,
            elapsed: Duration::ZERO,
        }
    }

    /// 성공/실패 집계 반영
    pub fn with_results(
        mut self,
        success_count: usize,
        residual_failures: Vec<FailureRecord>,
        rounds_executed: u32,
    ) -> Self {
        self.success_count = success_count;
        self.failure_count = residual_failures.len();
        self.residual_failures = residual_failures;
        self.rounds_executed = rounds_executed;
        self.success_rate = if self.total_instruments == 0 {
            0.0
        } else {
            (success_count as f64 / self.total_instruments as f64) * 100.0
        };
        self
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self) {
        tracing::info!(
            status = ?self.status,
            window = %self
                .window
                .map(|w| w.to_string())
                .unwrap_or_else(|| "-".to_string()),
            listed = self.listed_instruments,
            total = self.total_instruments,
            success = self.success_count,
            failures = self.failure_count,
            success_rate = format!("{:.1}%", self.success_rate),
            rounds = self.rounds_executed,
            fetched_records = self.fetched_records,
            new_records = self.new_records,
            total_records = self.total_records,
            instruments = self.distinct_instruments,
            persisted = self.persisted,
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );

        for (market, count) in &self.records_by_market {
            tracing::info!(market = market.label(), records = count, "시장별 레코드");
        }

        for failure in &self.residual_failures {
            tracing::warn!(
                code = %failure.code,
                name = %failure.name,
                market = %failure.market,
                "최종 수집 실패"
            );
        }
    }

    /// 실행 로그 파일에 JSON 한 줄로 추가
    pub fn append_to_log(&self, path: &Path) -> std::io::Result<()> {
        let line = serde_json::to_string(self).map_err(std::io::Error::other)?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", line)
    }
}

fn serialize_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}
