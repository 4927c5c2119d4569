//! 데이터 수집 모듈.

pub mod collect;
pub mod cooldown;
pub mod fetch;
pub mod rounds;
pub mod window;

pub use collect::{load_instruments, CollectionOutcome, Collector};
pub use cooldown::{pause, CooldownObserver, CooldownTimer, TracingCountdown, WaitOutcome};
pub use fetch::{FetchOutcome, FetchWithRetry};
pub use rounds::{FailureSet, RoundCoordinator, RoundOutcome};
pub use window::{IncrementalWindowPlanner, WindowPlan};
