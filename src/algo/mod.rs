/// Spike detection and ranking

pub mod analyzer;
pub mod math_calculations;
pub mod ranking;

pub use analyzer::VolumeSpikeAnalyzer;
pub use ranking::ResultAggregator;
