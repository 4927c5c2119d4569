//! 일봉 수집기 CLI.

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use stockhist_collector::modules::{
    self, Collector, CooldownObserver, IncrementalWindowPlanner, TracingCountdown, WaitOutcome,
    WindowPlan,
};
use stockhist_collector::{CollectorConfig, RoundPolicy};
use stockhist_core::logging::{init_logging, LogConfig};
use stockhist_core::Dataset;
use stockhist_data::{CsvDatasetStore, DatasetStore, EastmoneyProvider};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "stockhist")]
#[command(about = "A주/홍콩 종목 일봉 증분 수집기", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 일봉 수집 후 기존 데이터와 병합/저장
    Collect(CollectArgs),

    /// 다음 수집에서 조회할 기간 출력
    Plan {
        /// 데이터셋 파일
        #[arg(long)]
        dataset: Option<PathBuf>,
    },

    /// 저장된 데이터셋 요약
    Summary {
        /// 데이터셋 파일
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
}

#[derive(Args)]
struct CollectArgs {
    /// A주 종목 목록 파일
    #[arg(long)]
    domestic_list: Option<PathBuf>,

    /// 홍콩 종목 목록 파일
    #[arg(long)]
    hk_list: Option<PathBuf>,

    /// 홍콩 종목 수집 안 함
    #[arg(long, conflicts_with = "hk_list")]
    no_hk: bool,

    /// 데이터셋 파일
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// 최대 라운드 수 (첫 조회 포함)
    #[arg(long)]
    max_rounds: Option<u32>,

    /// 라운드 사이 대기 시간 (분)
    #[arg(long)]
    cooldown_minutes: Option<u64>,

    /// 실행 결과를 JSON 한 줄로 추가할 파일
    #[arg(long)]
    run_log: Option<PathBuf>,
}

impl CollectArgs {
    fn apply(self, config: &mut CollectorConfig) {
        if let Some(path) = self.domestic_list {
            config.domestic_list = path;
        }
        if let Some(path) = self.hk_list {
            config.hk_list = Some(path);
        }
        if self.no_hk {
            config.hk_list = None;
        }
        if let Some(path) = self.dataset {
            config.dataset_path = path;
        }
        if let Some(path) = self.run_log {
            config.run_log = Some(path);
        }

        let max_rounds = self.max_rounds.unwrap_or(config.rounds.max_rounds);
        let cooldown = self
            .cooldown_minutes
            .map(|m| Duration::from_secs(m * 60))
            .unwrap_or(config.rounds.cooldown);
        config.rounds = RoundPolicy::new(max_rounds, cooldown);
    }
}

/// 터미널에 쿨다운 카운트다운을 막대로 표시
struct ProgressCountdown {
    style: ProgressStyle,
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressCountdown {
    fn new() -> anyhow::Result<Self> {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}s")?
            .progress_chars("#>-");
        Ok(Self {
            style,
            bar: Mutex::new(None),
        })
    }
}

impl CooldownObserver for ProgressCountdown {
    fn on_start(&self, next_round: u32, total: Duration) {
        TracingCountdown.on_start(next_round, total);

        let bar = ProgressBar::new(total.as_secs());
        bar.set_style(self.style.clone());
        bar.set_message(format!("{}라운드 대기", next_round));
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn on_tick(&self, remaining: Duration) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                let total = bar.length().unwrap_or_default();
                bar.set_position(total.saturating_sub(remaining.as_secs()));
            }
        }
    }

    fn on_finish(&self, outcome: WaitOutcome) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
        TracingCountdown.on_finish(outcome);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 로깅 초기화
    init_logging(LogConfig::new(&cli.log_level).with_env_format())
        .map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {e}"))?;

    let mut config = CollectorConfig::from_env()?;
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::Collect(args) => {
            args.apply(&mut config);
            collect(&config, today).await?;
        }
        Commands::Plan { dataset } => {
            let path = dataset.unwrap_or_else(|| config.dataset_path.clone());
            let store = CsvDatasetStore::new(path);
            let existing = store.load()?.unwrap_or_default();
            let planner = IncrementalWindowPlanner::new(config.lookback_days);

            match planner.plan(existing.latest_date(), today) {
                WindowPlan::Fetch(window) => tracing::info!(
                    start = %window.start,
                    end = %window.end,
                    days = window.days(),
                    "다음 조회 기간"
                ),
                WindowPlan::UpToDate => {
                    tracing::info!(latest = ?existing.latest_date(), "이미 최신 데이터")
                }
            }
        }
        Commands::Summary { dataset } => {
            let path = dataset.unwrap_or_else(|| config.dataset_path.clone());
            let store = CsvDatasetStore::new(path);
            match store.load()? {
                Some(dataset) => log_dataset(&store, &dataset),
                None => tracing::warn!(path = %store.location(), "데이터셋 파일 없음"),
            }
        }
    }

    Ok(())
}

async fn collect(config: &CollectorConfig, today: chrono::NaiveDate) -> anyhow::Result<()> {
    tracing::info!("일봉 수집기 시작");

    let instruments = modules::load_instruments(&config.domestic_list, config.hk_list.as_deref())?;

    let provider = EastmoneyProvider::new(config.provider_timeout())?;
    let store = CsvDatasetStore::new(config.dataset_path.clone());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("종료 신호 수신, 수집 중단 중...");
            trigger.cancel();
        }
    });

    let observer: Box<dyn CooldownObserver> = if std::io::stderr().is_terminal() {
        Box::new(ProgressCountdown::new()?)
    } else {
        Box::new(TracingCountdown)
    };

    let collector = Collector::new(&provider, &store, config, observer.as_ref(), cancel);
    let outcome = collector.run(&instruments, today).await?;

    outcome.report.log_summary();

    if let Some(path) = &config.run_log {
        if let Err(e) = outcome.report.append_to_log(path) {
            tracing::warn!(path = %path.display(), error = %e, "실행 로그 기록 실패");
        }
    }

    tracing::info!("일봉 수집기 종료");
    Ok(())
}

fn log_dataset(store: &CsvDatasetStore, dataset: &Dataset) {
    tracing::info!(
        path = %store.location(),
        records = dataset.len(),
        instruments = dataset.distinct_instruments(),
        range = ?dataset.date_range(),
        "데이터셋 요약"
    );

    for (market, count) in dataset.count_by_market() {
        tracing::info!(market = market.label(), records = count, "시장별 레코드");
    }
}
