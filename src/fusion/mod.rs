//! Decision fusion: weighted combination of provider signals

pub mod aggregator;
pub mod engine;

pub use aggregator::ScoreAggregator;
pub use engine::{FusionEngine, INSUFFICIENT_SIGNAL_DATA};
