//! Eastmoney 일봉 제공자.
//!
//! Eastmoney kline API에서 전일 기준 수정주가(前复权) 일봉을 조회합니다.
//!
//! # 응답 형식
//!
//! ```text
//! {"rc":0,"data":{"code":"000001","market":0,"name":"平安银行",
//!   "klines":["2024-01-02,9.39,9.21,9.42,9.21,1158366,1075742252.45,2.24,-1.92,-0.18,0.60"]}}
//! ```
//!
//! kline 문자열 필드 순서: 날짜, 시가, 종가, 고가, 저가, 거래량, 거래대금, 진폭, 등락률, 등락액, 회전율.
//! 데이터가 없는 종목은 `data`가 `null`로 옵니다.

use super::{DailyBarProvider, RawDailyRow};
use crate::adapter::SymbolAdapter;
use crate::error::{DataError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use stockhist_core::{DateWindow, Market};
use tracing::debug;

/// Eastmoney kline API URL.
const KLINE_API_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";

/// 공개 웹 클라이언트가 사용하는 ut 토큰.
const KLINE_UT: &str = "7eea3edcaed734bea9cbfc24409ed989";

/// 일봉 (klt=101).
const KLINE_DAILY: &str = "101";

/// 전일 기준 수정주가 (fqt=1).
const ADJUST_FORWARD: &str = "1";

#[derive(Debug, Deserialize)]
struct KlineResponse {
    #[serde(default)]
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(default)]
    code: String,
    #[serde(default)]
    klines: Vec<String>,
}

/// Eastmoney 일봉 제공자.
pub struct EastmoneyProvider {
    client: reqwest::Client,
    base_url: String,
}

impl EastmoneyProvider {
    /// 요청 타임아웃을 지정해 생성합니다.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::FetchError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: KLINE_API_URL.to_string(),
        })
    }

    /// API 주소 변경 (프록시/미러 사용 시).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 응답 본문을 원본 행으로 변환.
    ///
    /// A주 응답은 종목코드를 행마다 붙이고, 홍콩 응답은 코드 없이 둡니다.
    fn parse_body(body: &str, market: Market) -> Result<Vec<RawDailyRow>> {
        let response: KlineResponse = serde_json::from_str(body)?;

        let Some(data) = response.data else {
            return Ok(Vec::new());
        };

        let code = match market {
            Market::Domestic => Some(data.code.clone()),
            Market::HongKong => None,
        };

        data.klines
            .iter()
            .map(|line| {
                let fields: Vec<&str> = line.split(',').collect();
                if fields.len() < 7 {
                    return Err(DataError::MalformedResponse(format!(
                        "kline 필드 부족 ({}개): {}",
                        fields.len(),
                        line
                    )));
                }
                Ok(RawDailyRow {
                    date: fields[0].to_string(),
                    code: code.clone(),
                    open: fields[1].to_string(),
                    close: fields[2].to_string(),
                    high: fields[3].to_string(),
                    low: fields[4].to_string(),
                    volume: fields[5].to_string(),
                    turnover: fields[6].to_string(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl DailyBarProvider for EastmoneyProvider {
    fn name(&self) -> &str {
        "eastmoney"
    }

    async fn fetch_daily(
        &self,
        code: &str,
        market: Market,
        window: &DateWindow,
    ) -> Result<Vec<RawDailyRow>> {
        let secid = SymbolAdapter::security_id(code, market);
        let beg = window.start_param();
        let end = window.end_param();

        debug!(code, %market, secid = %secid, beg = %beg, end = %end, "Eastmoney 일봉 조회");

        let params = [
            ("secid", secid.as_str()),
            ("ut", KLINE_UT),
            ("fields1", "f1,f2,f3,f4,f5,f6"),
            ("fields2", "f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61"),
            ("klt", KLINE_DAILY),
            ("fqt", ADJUST_FORWARD),
            ("beg", beg.as_str()),
            ("end", end.as_str()),
            ("lmt", "1000000"),
        ];

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| DataError::FetchError(format!("Eastmoney API 호출 실패: {}", e)))?;

        if !response.status().is_success() {
            return Err(DataError::FetchError(format!(
                "Eastmoney API 오류: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DataError::FetchError(format!("응답 읽기 실패: {}", e)))?;

        Self::parse_body(&body, market)
    }
}
