//! 조회 기간 타입.

use crate::error::{CoreError, CoreResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 일봉 조회 기간 `[start, end]` (양 끝 포함).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// 기간 생성. `start > end`이면 에러.
    pub fn new(start: NaiveDate, end: NaiveDate) -> CoreResult<Self> {
        if start > end {
            return Err(CoreError::InvalidWindow(format!("{} > {}", start, end)));
        }
        Ok(Self { start, end })
    }

    /// 제공자 요청용 시작일 (YYYYMMDD).
    pub fn start_param(&self) -> String {
        self.start.format("%Y%m%d").to_string()
    }

    /// 제공자 요청용 종료일 (YYYYMMDD).
    pub fn end_param(&self) -> String {
        self.end.format("%Y%m%d").to_string()
    }

    /// 기간에 포함된 달력 일수.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", self.start, self.end)
    }
}
