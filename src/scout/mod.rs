pub mod filter;
pub mod scanner;

pub use filter::{FilterStats, Rejection, StructuralFilter};
pub use scanner::{VolumeScanner, WatchlistBuild};

use crate::client::ClientError;
use crate::config::ConfigError;

/// Failures that halt a screening run. Per-symbol problems never surface
/// here; they degrade to neutral results instead.
#[derive(thiserror::Error, Debug)]
pub enum ScreenerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to retrieve market metadata: {0}")]
    Metadata(#[source] ClientError),

    #[error("Market metadata source returned no entries")]
    EmptyMetadata,

    #[error("Failed to list tradable pairs: {0}")]
    TradableListing(#[source] ClientError),

    #[error("No pairs passed the structural filter")]
    EmptyWatchlist,
}
