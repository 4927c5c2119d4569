//! 일봉 레코드와 데이터셋.

pub mod dataset;
pub mod record;

pub use dataset::{Dataset, DatasetMerger};
pub use record::{RecordKey, StockRecord};
