//! 데이터 소스와 파일 저장소.
//!
//! 이 crate는 다음을 제공합니다:
//! - 일봉 제공자 추상화 (`DailyBarProvider`)와 Eastmoney 구현
//! - 제공자 응답을 표준 레코드로 바꾸는 `SymbolAdapter`
//! - CSV 데이터셋 저장소와 종목 목록 로더

pub mod adapter;
pub mod error;
mod parse;
pub mod provider;
pub mod storage;

pub use adapter::SymbolAdapter;
pub use error::{DataError, Result};
pub use provider::{DailyBarProvider, EastmoneyProvider, RawDailyRow};
pub use storage::{load_instrument_list, CsvDatasetStore, DatasetStore};
