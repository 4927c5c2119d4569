//! 기본 타입 정의.

pub mod instrument;
pub mod market;
pub mod window;

pub use instrument::{FailureRecord, InstrumentKey, InstrumentRef};
pub use market::Market;
pub use window::DateWindow;
