//! 시장 구분 정의.
//!
//! - `Market::Domestic` - 중국 본토 거래소 (상해/심천), 6자리 코드
//! - `Market::HongKong` - 홍콩 거래소, 5자리 코드

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 종목이 상장된 시장.
///
/// 선언 순서가 정렬 순서입니다 (`Domestic < HongKong`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Market {
    /// 본토 A주 시장
    #[serde(rename = "A")]
    Domestic,
    /// 홍콩 시장
    #[serde(rename = "HK")]
    HongKong,
}

impl Market {
    /// 종목코드 자릿수 (0으로 채움).
    pub fn code_width(&self) -> usize {
        match self {
            Market::Domestic => 6,
            Market::HongKong => 5,
        }
    }

    /// 저장 파일에 기록되는 시장 태그.
    pub fn tag(&self) -> &'static str {
        match self {
            Market::Domestic => "A",
            Market::HongKong => "HK",
        }
    }

    /// 로그 출력용 이름.
    pub fn label(&self) -> &'static str {
        match self {
            Market::Domestic => "A주",
            Market::HongKong => "홍콩",
        }
    }

    pub fn all() -> [Market; 2] {
        [Market::Domestic, Market::HongKong]
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Market {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" | "CN" | "DOMESTIC" => Ok(Market::Domestic),
            "HK" | "HONGKONG" | "HONG_KONG" => Ok(Market::HongKong),
            other => Err(CoreError::UnknownMarket(other.to_string())),
        }
    }
}
