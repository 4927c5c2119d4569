//! 파일 저장소.
//!
//! - `dataset_csv`: 일봉 데이터셋 CSV 파일 (전체 읽기/전체 쓰기)
//! - `instrument_list`: 시장별 종목 목록 파일

pub mod dataset_csv;
pub mod instrument_list;

pub use dataset_csv::{CsvDatasetStore, DatasetStore};
pub use instrument_list::load_instrument_list;
