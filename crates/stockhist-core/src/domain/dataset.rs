//! 정렬된 일봉 데이터셋과 병합.
//!
//! # 정렬 순서
//!
//! 데이터셋은 항상 `(market, code, date)` 오름차순으로 유지됩니다.
//! A주가 홍콩보다 앞서고, 같은 종목의 레코드는 날짜순으로 연속됩니다.
//!
//! # 병합 규칙
//!
//! ```text
//! existing ++ incoming
//!         │
//!         ▼
//! (date, code, market) 키별로 마지막 레코드만 유지
//!         │
//!         ▼
//! (market, code, date) 정렬
//! ```
//!
//! incoming이 뒤에 붙으므로 같은 키라면 새로 가져온 데이터가 항상 이깁니다.

use super::record::{RecordKey, StockRecord};
use crate::types::Market;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};

/// 정렬/중복 제거가 보장된 일봉 데이터셋.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    records: Vec<StockRecord>,
}

impl Dataset {
    /// 빈 데이터셋.
    pub fn new() -> Self {
        Self::default()
    }

    /// 임의 순서의 레코드로 데이터셋을 만듭니다 (중복 제거 + 정렬).
    pub fn from_records(records: Vec<StockRecord>) -> Self {
        DatasetMerger::merge(Self::new(), records)
    }

    pub fn records(&self) -> &[StockRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<StockRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 가장 최근 거래일.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.date).max()
    }

    /// 전체 날짜 범위 `(min, max)`.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|r| r.date).min()?;
        let max = self.records.iter().map(|r| r.date).max()?;
        Some((min, max))
    }

    /// 시장별 레코드 수.
    pub fn count_by_market(&self) -> BTreeMap<Market, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.market).or_insert(0) += 1;
        }
        counts
    }

    /// 데이터가 있는 종목 수.
    pub fn distinct_instruments(&self) -> usize {
        self.records
            .iter()
            .map(|r| (r.market, r.code.as_str()))
            .collect::<HashSet<_>>()
            .len()
    }

    /// 정렬 및 유일성 불변식 검사.
    pub fn is_canonical(&self) -> bool {
        self.records
            .windows(2)
            .all(|pair| pair[0].sort_key() < pair[1].sort_key())
    }

    /// incoming 레코드를 병합한 새 데이터셋.
    pub fn merge(self, incoming: Vec<StockRecord>) -> Self {
        DatasetMerger::merge(self, incoming)
    }
}

/// 기존 데이터셋과 새로 수집한 레코드를 병합합니다.
pub struct DatasetMerger;

impl DatasetMerger {
    /// 병합: 키별 마지막 레코드 유지 후 정렬.
    ///
    /// 같은 배치를 두 번 병합해도 결과가 같습니다 (멱등).
    pub fn merge(existing: Dataset, incoming: Vec<StockRecord>) -> Dataset {
        let existing_len = existing.records.len();
        let incoming_len = incoming.len();

        let combined: Vec<StockRecord> = existing
            .records
            .into_iter()
            .chain(incoming)
            .collect();

        // 키별 마지막 위치
        let mut last_index: HashMap<RecordKey, usize> = HashMap::with_capacity(combined.len());
        for (idx, record) in combined.iter().enumerate() {
            last_index.insert(record.key(), idx);
        }

        let total = combined.len();
        let mut records: Vec<StockRecord> = combined
            .into_iter()
            .enumerate()
            .filter(|(idx, record)| last_index.get(&record.key()) == Some(idx))
            .map(|(_, record)| record)
            .collect();

        records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let replaced = total - records.len();
        if replaced > 0 {
            tracing::debug!(
                existing = existing_len,
                incoming = incoming_len,
                replaced,
                "중복 레코드 제거"
            );
        }

        Dataset { records }
    }
}
