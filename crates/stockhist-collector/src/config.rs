//! 환경변수 기반 설정 모듈.

use crate::{CollectorError, Result};
use std::path::PathBuf;
use std::time::Duration;
use stockhist_core::Market;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// A주 종목 목록 파일 (필수)
    pub domestic_list: PathBuf,
    /// 홍콩 종목 목록 파일 (없으면 A주만 수집)
    pub hk_list: Option<PathBuf>,
    /// 데이터셋 CSV 파일
    pub dataset_path: PathBuf,
    /// 실행 결과를 한 줄씩 추가할 로그 파일
    pub run_log: Option<PathBuf>,
    /// 기존 데이터가 없을 때 조회할 일수
    pub lookback_days: i64,
    /// 라운드 설정
    pub rounds: RoundPolicy,
    /// A주 조회 정책
    pub domestic: MarketPolicy,
    /// 홍콩 조회 정책
    pub hong_kong: MarketPolicy,
    /// 제공자 HTTP 타임아웃 (초)
    pub provider_timeout_secs: u64,
}

/// 시장별 조회 정책
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketPolicy {
    /// 종목당 최대 시도 횟수
    pub max_attempts: u32,
    /// 재시도 대기 기본값 (i번째 실패 후 `base * i` 대기)
    pub attempt_backoff_base: Duration,
    /// 종목 조회 후 대기 (성공/실패 무관)
    pub pacing_delay: Duration,
    /// 진행 로그 출력 주기 (종목 수)
    pub progress_every: usize,
}

/// 재시도 라운드 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundPolicy {
    /// 최대 라운드 수 (첫 조회 포함)
    pub max_rounds: u32,
    /// 라운드 사이 대기 시간
    pub cooldown: Duration,
}

impl MarketPolicy {
    /// A주 기본 정책
    pub fn domestic_default() -> Self {
        Self {
            max_attempts: 2,
            attempt_backoff_base: Duration::from_millis(100),
            pacing_delay: Duration::from_millis(500),
            progress_every: 10,
        }
    }

    /// 홍콩 기본 정책
    pub fn hong_kong_default() -> Self {
        Self {
            max_attempts: 3,
            attempt_backoff_base: Duration::from_millis(100),
            pacing_delay: Duration::from_millis(1500),
            progress_every: 5,
        }
    }

    /// 대기 없는 정책 (테스트, 로컬 제공자용)
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            attempt_backoff_base: Duration::ZERO,
            pacing_delay: Duration::ZERO,
            progress_every: 10,
        }
    }

    /// `attempt`번째 실패 후 대기 시간 (선형 증가)
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.attempt_backoff_base * attempt
    }

    fn from_env(prefix: &str, default: Self) -> Self {
        let backoff_ms = env_var_parse(
            &format!("{prefix}_BACKOFF_MS"),
            default.attempt_backoff_base.as_millis() as u64,
        );
        let pacing_ms = env_var_parse(
            &format!("{prefix}_PACING_MS"),
            default.pacing_delay.as_millis() as u64,
        );

        Self {
            max_attempts: env_var_parse(&format!("{prefix}_MAX_ATTEMPTS"), default.max_attempts)
                .max(1),
            attempt_backoff_base: Duration::from_millis(backoff_ms),
            pacing_delay: Duration::from_millis(pacing_ms),
            progress_every: env_var_parse(
                &format!("{prefix}_PROGRESS_EVERY"),
                default.progress_every,
            )
            .max(1),
        }
    }
}

impl Default for RoundPolicy {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            cooldown: Duration::from_secs(5 * 60),
        }
    }
}

impl RoundPolicy {
    pub fn new(max_rounds: u32, cooldown: Duration) -> Self {
        Self {
            max_rounds: max_rounds.max(1),
            cooldown,
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            domestic_list: PathBuf::from("Ashare_innovative_drug_stocks_code.csv"),
            hk_list: Some(PathBuf::from("Hshare_innovative_drug_stocks_code.csv")),
            dataset_path: PathBuf::from("innovative_drug_stocks_data.csv"),
            run_log: None,
            lookback_days: 365,
            rounds: RoundPolicy::default(),
            domestic: MarketPolicy::domestic_default(),
            hong_kong: MarketPolicy::hong_kong_default(),
            provider_timeout_secs: 30,
        }
    }
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let hk_list = match std::env::var("STOCKHIST_HK_LIST") {
            // 빈 값이면 홍콩 목록 사용 안 함
            Ok(v) if v.trim().is_empty() => None,
            Ok(v) => Some(PathBuf::from(v)),
            Err(_) => defaults.hk_list,
        };

        let lookback_days: i64 = env_var_parse("STOCKHIST_LOOKBACK_DAYS", defaults.lookback_days);
        if lookback_days < 0 {
            return Err(CollectorError::Config(format!(
                "STOCKHIST_LOOKBACK_DAYS는 0 이상이어야 합니다: {}",
                lookback_days
            )));
        }

        let cooldown_minutes: u64 = env_var_parse(
            "STOCKHIST_COOLDOWN_MINUTES",
            defaults.rounds.cooldown.as_secs() / 60,
        );

        Ok(Self {
            domestic_list: env_var_path("STOCKHIST_DOMESTIC_LIST", defaults.domestic_list),
            hk_list,
            dataset_path: env_var_path("STOCKHIST_DATASET", defaults.dataset_path),
            run_log: std::env::var("STOCKHIST_RUN_LOG")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            lookback_days,
            rounds: RoundPolicy::new(
                env_var_parse("STOCKHIST_MAX_ROUNDS", defaults.rounds.max_rounds),
                Duration::from_secs(cooldown_minutes * 60),
            ),
            domestic: MarketPolicy::from_env("DOMESTIC", defaults.domestic),
            hong_kong: MarketPolicy::from_env("HK", defaults.hong_kong),
            provider_timeout_secs: env_var_parse(
                "PROVIDER_TIMEOUT_SECS",
                defaults.provider_timeout_secs,
            ),
        })
    }

    /// 시장별 조회 정책
    pub fn policy(&self, market: Market) -> &MarketPolicy {
        match market {
            Market::Domestic => &self.domestic,
            Market::HongKong => &self.hong_kong,
        }
    }

    /// 제공자 HTTP 타임아웃을 Duration으로 반환
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_var_path(key: &str, default: PathBuf) -> PathBuf {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or(default)
}
