pub mod entry_policy;
pub mod exit_policy;
pub mod position_sizer;
pub mod random;
pub mod trading_engine;

pub use entry_policy::{EntryHalt, EntryRules};
pub use exit_policy::{ExitReason, ExitRules};
pub use random::{RandomSource, SequenceRandom, StdRandom};
pub use trading_engine::{CycleReport, EngineConfig, EntryRecord, ExitRecord, TradingEngine};
