//! 증분 조회 기간 계산.

use chrono::{Days, NaiveDate};
use stockhist_core::DateWindow;

/// 이번 실행에서 조회할 기간.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPlan {
    /// 이 기간을 조회
    Fetch(DateWindow),
    /// 기존 데이터가 이미 최신
    UpToDate,
}

/// 기존 데이터의 마지막 날짜로 다음 조회 기간을 정합니다.
///
/// - 기존 데이터 없음: `[today - lookback_days, today]`
/// - 있음: `[latest + 1, today]`, 시작일이 오늘보다 늦으면 `UpToDate`
#[derive(Debug, Clone, Copy)]
pub struct IncrementalWindowPlanner {
    lookback_days: u64,
}

impl IncrementalWindowPlanner {
    pub fn new(lookback_days: i64) -> Self {
        Self {
            lookback_days: lookback_days.max(0) as u64,
        }
    }

    /// `today`는 실행당 한 번만 구해서 넘깁니다.
    pub fn plan(&self, latest: Option<NaiveDate>, today: NaiveDate) -> WindowPlan {
        let start = match latest {
            Some(latest) => match latest.succ_opt() {
                Some(next) => next,
                None => return WindowPlan::UpToDate,
            },
            None => today
                .checked_sub_days(Days::new(self.lookback_days))
                .unwrap_or(NaiveDate::MIN),
        };

        match DateWindow::new(start, today) {
            Ok(window) => WindowPlan::Fetch(window),
            Err(_) => WindowPlan::UpToDate,
        }
    }
}

impl Default for IncrementalWindowPlanner {
    fn default() -> Self {
        Self { lookback_days: 365 }
    }
}
