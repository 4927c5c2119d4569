//! 수집 파이프라인 통합 테스트.
//!
//! 가상 시간(`start_paused`)에서 실행하므로 간격/재시도/쿨다운 대기가 즉시 끝납니다.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use stockhist_collector::modules::{
    load_instruments, Collector, FetchOutcome, FetchWithRetry, RoundCoordinator, TracingCountdown,
};
use stockhist_collector::{CollectorConfig, CollectorError, MarketPolicy, RoundPolicy, RunStatus};
use stockhist_core::{Dataset, DateWindow, FailureRecord, InstrumentRef, Market, StockRecord};
use stockhist_data::{DailyBarProvider, DataError, DatasetStore, RawDailyRow};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// 종목별 응답 시나리오
#[derive(Clone, Copy)]
enum Script {
    /// 항상 기간 마지막 날 1건 반환
    Ok,
    /// 항상 에러
    Fail,
    /// 항상 빈 응답
    Empty,
    /// 처음 n번 에러 후 성공
    FailTimes(usize),
    /// 지정한 시간 동안 응답을 끌다가 성공
    Slow(Duration),
}

struct ScriptedProvider {
    scripts: HashMap<String, Script>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedProvider {
    fn new(scripts: &[(&str, Script)]) -> Self {
        Self {
            scripts: scripts
                .iter()
                .map(|(code, script)| (code.to_string(), *script))
                .collect(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn calls(&self, code: &str) -> usize {
        self.calls.lock().unwrap().get(code).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl DailyBarProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_daily(
        &self,
        code: &str,
        market: Market,
        window: &DateWindow,
    ) -> stockhist_data::Result<Vec<RawDailyRow>> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(code.to_string()).or_insert(0);
            *n += 1;
            *n
        };

        let row = RawDailyRow {
            date: window.end.format("%Y-%m-%d").to_string(),
            code: match market {
                Market::Domestic => Some(code.to_string()),
                Market::HongKong => None,
            },
            open: "10.0".into(),
            close: "10.5".into(),
            high: "10.8".into(),
            low: "9.9".into(),
            volume: "1000".into(),
            turnover: "10500.0".into(),
        };

        match self.scripts.get(code).copied().unwrap_or(Script::Fail) {
            Script::Ok => Ok(vec![row]),
            Script::Empty => Ok(Vec::new()),
            Script::Fail => Err(DataError::FetchError(format!("{} 연결 끊김", code))),
            Script::FailTimes(n) if call <= n => {
                Err(DataError::FetchError(format!("{} 일시 오류", code)))
            }
            Script::FailTimes(_) => Ok(vec![row]),
            Script::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(vec![row])
            }
        }
    }
}

#[derive(Default)]
struct MemoryStore {
    dataset: Mutex<Option<Dataset>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    fn with(dataset: Dataset) -> Self {
        Self {
            dataset: Mutex::new(Some(dataset)),
            saves: Mutex::new(0),
        }
    }

    fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }

    fn stored(&self) -> Option<Dataset> {
        self.dataset.lock().unwrap().clone()
    }
}

impl DatasetStore for MemoryStore {
    fn load(&self) -> stockhist_data::Result<Option<Dataset>> {
        Ok(self.dataset.lock().unwrap().clone())
    }

    fn save(&self, dataset: &Dataset) -> stockhist_data::Result<()> {
        *self.dataset.lock().unwrap() = Some(dataset.clone());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// 가상 시간 기준 경과 시간 확인 (타이머 해상도 1ms 허용)
fn assert_elapsed(started: Instant, expected: Duration) {
    let elapsed = started.elapsed();
    assert!(
        elapsed >= expected && elapsed <= expected + Duration::from_millis(5),
        "elapsed {:?}, expected {:?}",
        elapsed,
        expected
    );
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2024, 3, 15)
}

fn config(max_rounds: u32, cooldown: Duration) -> CollectorConfig {
    CollectorConfig {
        rounds: RoundPolicy::new(max_rounds, cooldown),
        domestic: MarketPolicy::immediate(2),
        hong_kong: MarketPolicy::immediate(3),
        ..CollectorConfig::default()
    }
}

fn domestic(code: &str, name: &str) -> InstrumentRef {
    InstrumentRef::domestic(code, name).unwrap()
}

fn window() -> DateWindow {
    DateWindow::new(date(2024, 3, 1), today()).unwrap()
}

fn residual_codes(failures: &[FailureRecord]) -> Vec<&str> {
    failures.iter().map(|f| f.code.as_str()).collect()
}

fn record(day: NaiveDate, code: &str, close: rust_decimal::Decimal) -> StockRecord {
    StockRecord {
        date: day,
        code: code.to_string(),
        name: "A".to_string(),
        market: Market::Domestic,
        open: dec!(10.0),
        close,
        high: dec!(10.8),
        low: dec!(9.9),
        volume: 1000,
        turnover: dec!(10500.0),
    }
}

#[tokio::test(start_paused = true)]
async fn test_round_shrinkage_leaves_persistent_failures() {
    let provider = ScriptedProvider::new(&[
        ("000001", Script::Ok),
        ("000002", Script::Fail),
        ("000003", Script::Ok),
        ("000004", Script::Fail),
        ("000005", Script::Ok),
    ]);
    let instruments: Vec<_> = (1..=5)
        .map(|i| domestic(&format!("00000{}", i), &format!("S{}", i)))
        .collect();
    let config = config(3, Duration::from_secs(60));
    let cancel = CancellationToken::new();

    let outcome = RoundCoordinator::new(&provider, &config, &TracingCountdown, &cancel)
        .run(&instruments, &window())
        .await;

    assert_eq!(outcome.rounds_executed, 3);
    assert_eq!(outcome.succeeded, 3);
    assert!(!outcome.cancelled);
    assert_eq!(outcome.records.len(), 3);

    assert_eq!(residual_codes(&outcome.residual_failures), vec!["000002", "000004"]);

    // 성공 종목은 첫 라운드에만 조회
    assert_eq!(provider.calls("000001"), 1);
    assert_eq!(provider.calls("000005"), 1);
    // 실패 종목은 라운드마다 max_attempts번
    assert_eq!(provider.calls("000002"), 3 * 2);
    assert_eq!(provider.calls("000004"), 3 * 2);
}

#[tokio::test(start_paused = true)]
async fn test_first_round_failure_set() {
    let provider = ScriptedProvider::new(&[
        ("000001", Script::Ok),
        ("000002", Script::Fail),
        ("000003", Script::Ok),
        ("000004", Script::Fail),
        ("000005", Script::Ok),
    ]);
    let instruments: Vec<_> = (1..=5)
        .map(|i| domestic(&format!("00000{}", i), &format!("S{}", i)))
        .collect();
    let config = config(1, Duration::from_secs(60));
    let cancel = CancellationToken::new();

    let started = Instant::now();
    let outcome = RoundCoordinator::new(&provider, &config, &TracingCountdown, &cancel)
        .run(&instruments, &window())
        .await;

    // 라운드 1회면 쿨다운 없이 첫 라운드 실패 목록이 그대로 남음
    assert_eq!(outcome.rounds_executed, 1);
    assert_eq!(outcome.succeeded, 3);
    assert!(!outcome.cancelled);
    assert_eq!(residual_codes(&outcome.residual_failures), vec!["000002", "000004"]);
    assert!(outcome.residual_failures.iter().all(|f| f.market == Market::Domestic));
    assert_elapsed(started, Duration::ZERO);
    assert_eq!(provider.calls("000002"), 2);
    assert_eq!(provider.calls("000004"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_two_instrument_scenario() {
    let provider = ScriptedProvider::new(&[("000001", Script::Ok), ("000002", Script::Fail)]);
    let store = MemoryStore::default();
    let config = config(2, Duration::ZERO);
    let instruments = vec![domestic("000001", "A"), domestic("000002", "B")];

    let collector = Collector::new(
        &provider,
        &store,
        &config,
        &TracingCountdown,
        CancellationToken::new(),
    );
    let outcome = collector.run(&instruments, today()).await.unwrap();

    assert!(!outcome.dataset.is_empty());
    assert!(outcome.dataset.records().iter().all(|r| r.code == "000001"));
    assert_eq!(
        outcome.report.residual_failures,
        vec![FailureRecord {
            code: "000002".to_string(),
            name: "B".to_string(),
            market: Market::Domestic,
        }]
    );
    assert_eq!(outcome.report.rounds_executed, 2);
    assert_eq!(outcome.report.status, RunStatus::Partial);
    assert_eq!(outcome.report.success_count, 1);
    assert_eq!(outcome.report.failure_count, 1);
    assert!((outcome.report.success_rate - 50.0).abs() < f64::EPSILON);

    assert!(outcome.report.persisted);
    assert_eq!(store.stored(), Some(outcome.dataset));
}

#[tokio::test(start_paused = true)]
async fn test_up_to_date_run_makes_no_calls() {
    let existing = Dataset::from_records(vec![
        record(date(2024, 3, 14), "000001", dec!(10.1)),
        record(today(), "000001", dec!(10.2)),
    ]);
    let store = MemoryStore::with(existing.clone());
    let provider = ScriptedProvider::new(&[("000001", Script::Ok)]);
    let config = config(5, Duration::from_secs(300));

    let outcome = Collector::new(
        &provider,
        &store,
        &config,
        &TracingCountdown,
        CancellationToken::new(),
    )
    .run(&[domestic("000001", "A")], today())
    .await
    .unwrap();

    assert_eq!(provider.total_calls(), 0);
    assert_eq!(outcome.dataset, existing);
    assert_eq!(outcome.report.status, RunStatus::UpToDate);
    assert_eq!(outcome.report.window, None);
    assert_eq!(outcome.report.rounds_executed, 0);
    assert_eq!(outcome.report.listed_instruments, 1);
    assert_eq!(outcome.report.total_instruments, 0);
    assert!(!outcome.report.persisted);
    assert_eq!(store.saves(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_incremental_run_appends_and_overrides() {
    let latest = date(2024, 3, 10);
    let existing = Dataset::from_records(vec![record(latest, "000001", dec!(9.0))]);
    let store = MemoryStore::with(existing);
    let provider = ScriptedProvider::new(&[("000001", Script::Ok)]);
    let config = config(1, Duration::ZERO);

    let outcome = Collector::new(
        &provider,
        &store,
        &config,
        &TracingCountdown,
        CancellationToken::new(),
    )
    .run(&[domestic("000001", "A")], today())
    .await
    .unwrap();

    let window = outcome.report.window.unwrap();
    assert_eq!(window.start, date(2024, 3, 11));
    assert_eq!(window.end, today());

    assert_eq!(outcome.report.status, RunStatus::Complete);
    assert_eq!(outcome.report.existing_records, 1);
    assert_eq!(outcome.report.fetched_records, 1);
    assert_eq!(outcome.report.total_records, 2);
    assert_eq!(outcome.report.new_records, 1);
    assert!(outcome.dataset.is_canonical());
    assert_eq!(outcome.dataset.latest_date(), Some(today()));
    assert_eq!(store.saves(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_backoff_is_linear() {
    let provider = ScriptedProvider::new(&[("00700", Script::Fail)]);
    let cancel = CancellationToken::new();
    let policy = MarketPolicy {
        max_attempts: 3,
        attempt_backoff_base: Duration::from_millis(100),
        pacing_delay: Duration::ZERO,
        progress_every: 1,
    };
    let instrument = InstrumentRef::hong_kong("700", "T").unwrap();

    let started = Instant::now();
    let outcome = FetchWithRetry::new(&provider, &cancel)
        .fetch(&instrument, &window(), &policy)
        .await;

    // 100ms * 1 + 100ms * 2, 마지막 실패 뒤에는 대기 없음
    assert_elapsed(started, Duration::from_millis(300));
    assert_eq!(provider.calls("00700"), 3);
    match outcome {
        FetchOutcome::Failed { attempts, last_error } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("00700"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_transient_error_recovers_within_call() {
    let provider = ScriptedProvider::new(&[("600276", Script::FailTimes(1))]);
    let cancel = CancellationToken::new();
    let instrument = domestic("600276", "恒瑞医药");

    let outcome = FetchWithRetry::new(&provider, &cancel)
        .fetch(&instrument, &window(), &MarketPolicy::domestic_default())
        .await;

    assert!(outcome.is_success());
    assert_eq!(provider.calls("600276"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_empty_result_is_not_retried_within_call() {
    let provider = ScriptedProvider::new(&[("01801", Script::Empty)]);
    let cancel = CancellationToken::new();
    let instrument = InstrumentRef::hong_kong("1801", "信达生物").unwrap();

    let outcome = FetchWithRetry::new(&provider, &cancel)
        .fetch(&instrument, &window(), &MarketPolicy::hong_kong_default())
        .await;

    assert!(matches!(outcome, FetchOutcome::Empty));
    assert_eq!(provider.calls("01801"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_result_retried_next_round() {
    let provider = ScriptedProvider::new(&[("01801", Script::Empty)]);
    let config = config(3, Duration::ZERO);
    let cancel = CancellationToken::new();
    let instruments = vec![InstrumentRef::hong_kong("1801", "信达生物").unwrap()];

    let outcome = RoundCoordinator::new(&provider, &config, &TracingCountdown, &cancel)
        .run(&instruments, &window())
        .await;

    assert_eq!(provider.calls("01801"), 3);
    assert_eq!(outcome.residual_failures.len(), 1);
    assert_eq!(outcome.residual_failures[0].market, Market::HongKong);
}

#[tokio::test(start_paused = true)]
async fn test_failure_recovers_in_later_round() {
    // 라운드당 2번 시도하므로 3번째 호출(2라운드)에서 성공
    let provider = ScriptedProvider::new(&[("000002", Script::FailTimes(2))]);
    let config = config(5, Duration::from_secs(300));
    let cancel = CancellationToken::new();

    let started = Instant::now();
    let outcome = RoundCoordinator::new(&provider, &config, &TracingCountdown, &cancel)
        .run(&[domestic("000002", "B")], &window())
        .await;

    assert_eq!(outcome.rounds_executed, 2);
    assert!(outcome.residual_failures.is_empty());
    assert_eq!(outcome.succeeded, 1);
    assert_elapsed(started, Duration::from_secs(300));
}

#[tokio::test(start_paused = true)]
async fn test_pacing_applies_per_market() {
    let provider = ScriptedProvider::new(&[("000001", Script::Ok), ("00700", Script::Ok)]);
    let config = CollectorConfig {
        rounds: RoundPolicy::new(1, Duration::ZERO),
        ..CollectorConfig::default()
    };
    let cancel = CancellationToken::new();
    let instruments = vec![
        domestic("000001", "A"),
        InstrumentRef::hong_kong("700", "T").unwrap(),
    ];

    let started = Instant::now();
    let outcome = RoundCoordinator::new(&provider, &config, &TracingCountdown, &cancel)
        .run(&instruments, &window())
        .await;

    assert_eq!(outcome.succeeded, 2);
    assert_elapsed(started, Duration::from_millis(500 + 1500));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_cooldown_keeps_partial_data() {
    let provider = ScriptedProvider::new(&[("000001", Script::Ok), ("000002", Script::Fail)]);
    let store = MemoryStore::default();
    let config = config(5, Duration::from_secs(300));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(60)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let outcome = Collector::new(&provider, &store, &config, &TracingCountdown, cancel)
        .run(&[domestic("000001", "A"), domestic("000002", "B")], today())
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(300));
    assert_eq!(outcome.report.status, RunStatus::Cancelled);
    assert_eq!(outcome.report.rounds_executed, 1);
    assert_eq!(outcome.report.residual_failures.len(), 1);
    assert_eq!(outcome.report.residual_failures[0].code, "000002");
    assert_eq!(outcome.dataset.len(), 1);
    // 취소되어도 받은 데이터는 저장
    assert_eq!(store.saves(), 1);
    assert_eq!(provider.calls("000002"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_in_flight_fetch() {
    let provider = ScriptedProvider::new(&[("000002", Script::Slow(Duration::from_secs(10)))]);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let outcome = FetchWithRetry::new(&provider, &cancel)
        .fetch(&domestic("000002", "B"), &window(), &MarketPolicy::immediate(2))
        .await;

    assert!(matches!(outcome, FetchOutcome::Cancelled));
    assert_elapsed(started, Duration::from_secs(1));
    // 취소된 호출은 재시도하지 않음
    assert_eq!(provider.calls("000002"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_fetch_marks_rest_unresolved() {
    let provider = ScriptedProvider::new(&[
        ("000001", Script::Ok),
        ("000002", Script::Slow(Duration::from_secs(10))),
        ("000003", Script::Ok),
    ]);
    let config = config(3, Duration::ZERO);
    let cancel = CancellationToken::new();
    let instruments = vec![
        domestic("000001", "A"),
        domestic("000002", "B"),
        domestic("000003", "C"),
    ];

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let outcome = RoundCoordinator::new(&provider, &config, &TracingCountdown, &cancel)
        .run(&instruments, &window())
        .await;

    assert!(outcome.cancelled);
    assert_eq!(outcome.rounds_executed, 1);
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(residual_codes(&outcome.residual_failures), vec!["000002", "000003"]);
    assert_eq!(provider.calls("000002"), 1);
    assert_eq!(provider.calls("000003"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_start_resolves_nothing() {
    let provider = ScriptedProvider::new(&[("000001", Script::Ok)]);
    let store = MemoryStore::default();
    let config = config(5, Duration::ZERO);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = Collector::new(&provider, &store, &config, &TracingCountdown, cancel)
        .run(&[domestic("000001", "A"), domestic("000002", "B")], today())
        .await
        .unwrap();

    assert_eq!(provider.total_calls(), 0);
    assert_eq!(outcome.report.status, RunStatus::Cancelled);
    assert_eq!(outcome.report.residual_failures.len(), 2);
    // 받은 것도 없고 기존 파일도 없으므로 저장하지 않음
    assert!(!outcome.report.persisted);
    assert_eq!(store.saves(), 0);
}

#[test]
fn test_hk_list_failure_degrades_to_domestic_only() {
    let dir = tempfile::tempdir().unwrap();
    let primary = dir.path().join("a.csv");
    std::fs::write(&primary, "代码,名称\n600276,恒瑞医药\n1,平安银行\n").unwrap();

    let missing_hk = dir.path().join("missing.csv");
    let instruments = load_instruments(&primary, Some(&missing_hk)).unwrap();
    assert_eq!(instruments.len(), 2);
    assert!(instruments.iter().all(|i| i.market == Market::Domestic));

    let hk = dir.path().join("hk.csv");
    std::fs::write(&hk, "code,name\n700,腾讯控股\n").unwrap();
    let instruments = load_instruments(&primary, Some(&hk)).unwrap();
    assert_eq!(instruments.len(), 3);
    assert_eq!(instruments[2].code, "00700");
    assert_eq!(instruments[2].market, Market::HongKong);
}

#[test]
fn test_missing_primary_list_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_instruments(&dir.path().join("missing.csv"), None).unwrap_err();
    assert!(matches!(err, CollectorError::InstrumentList(_)));
}
