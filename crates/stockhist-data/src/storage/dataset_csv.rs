//! CSV 데이터셋 저장소.
//!
//! 컬럼: `Date,Code,Open,Close,High,Low,Volume,Trading_Volume,Name,Type`
//!
//! - 읽기: 파일 전체를 읽어 중복 제거/정렬된 `Dataset`으로 반환
//! - 쓰기: 임시 파일에 쓴 뒤 rename (중간에 실패해도 기존 파일 유지)

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use stockhist_core::types::instrument::normalize_code;
use stockhist_core::{Dataset, Market, StockRecord};
use tracing::{debug, info};

/// 데이터셋 영구 저장소.
pub trait DatasetStore: Send + Sync {
    /// 저장된 데이터셋을 읽습니다. 저장된 적이 없으면 `None`.
    fn load(&self) -> Result<Option<Dataset>>;

    /// 데이터셋 전체를 저장합니다.
    fn save(&self, dataset: &Dataset) -> Result<()>;

    /// 로그에 표시할 저장 위치.
    fn location(&self) -> String;
}

/// CSV 파일 한 줄.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Open", with = "rust_decimal::serde::str")]
    open: Decimal,
    #[serde(rename = "Close", with = "rust_decimal::serde::str")]
    close: Decimal,
    #[serde(rename = "High", with = "rust_decimal::serde::str")]
    high: Decimal,
    #[serde(rename = "Low", with = "rust_decimal::serde::str")]
    low: Decimal,
    /// `1158366.0` 같은 실수 표기로 저장된 파일도 있음
    #[serde(rename = "Volume")]
    volume: String,
    #[serde(rename = "Trading_Volume", with = "rust_decimal::serde::str")]
    turnover: Decimal,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Type")]
    market: Market,
}

impl CsvRow {
    fn into_record(self, line: usize) -> Result<StockRecord> {
        // 스프레드시트를 거친 파일은 앞자리 0이 빠져 있을 수 있음
        let code = normalize_code(&self.code, self.market)
            .map_err(|e| DataError::ParseError(format!("{}번째 행: {}", line, e)))?;
        let volume = crate::parse::volume(&self.volume)
            .map_err(|e| DataError::ParseError(format!("{}번째 행: {}", line, e)))?;

        Ok(StockRecord {
            date: self.date,
            code,
            name: self.name,
            market: self.market,
            open: self.open,
            close: self.close,
            high: self.high,
            low: self.low,
            volume,
            turnover: self.turnover,
        })
    }
}

impl From<&StockRecord> for CsvRow {
    fn from(r: &StockRecord) -> Self {
        Self {
            date: r.date,
            code: r.code.clone(),
            open: r.open,
            close: r.close,
            high: r.high,
            low: r.low,
            volume: r.volume.to_string(),
            turnover: r.turnover,
            name: r.name.clone(),
            market: r.market,
        }
    }
}

/// 단일 CSV 파일 데이터셋 저장소.
pub struct CsvDatasetStore {
    path: PathBuf,
}

impl CsvDatasetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl DatasetStore for CsvDatasetStore {
    fn load(&self) -> Result<Option<Dataset>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "기존 데이터 파일 없음");
            return Ok(None);
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        let mut records = Vec::new();
        for (idx, row) in reader.deserialize::<CsvRow>().enumerate() {
            // 헤더가 1행
            let line = idx + 2;
            let row = row.map_err(|e| DataError::ParseError(format!("{}번째 행: {}", line, e)))?;
            records.push(row.into_record(line)?);
        }

        let raw_count = records.len();
        let dataset = Dataset::from_records(records);

        info!(
            path = %self.path.display(),
            records = dataset.len(),
            dropped = raw_count - dataset.len(),
            range = ?dataset.date_range(),
            "기존 데이터 로드 완료"
        );

        Ok(Some(dataset))
    }

    fn save(&self, dataset: &Dataset) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.tmp_path();
        {
            let mut writer = csv::Writer::from_path(&tmp_path)?;
            for record in dataset.records() {
                writer.serialize(CsvRow::from(record))?;
            }
            writer.flush()?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::Io(e)
        })?;

        info!(path = %self.path.display(), records = dataset.len(), "데이터 저장 완료");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
