/// Default screening thresholds

pub const DEFAULT_MAX_MARKET_CAP: f64 = 500_000_000.0;
pub const DEFAULT_MIN_DAILY_VOLUME: f64 = 1_000_000.0;

pub const DEFAULT_EMA_DAYS: usize = 7;
pub const DEFAULT_RATIO_THRESHOLD: f64 = 3.0;
pub const DEFAULT_MAX_PRICE_CHANGE_PCT: f64 = 10.0;

pub const DEFAULT_QUOTE_CURRENCY: &str = "USDT";
pub const DEFAULT_EXCLUDED_MARKERS: [&str; 2] = ["3L", "3S"];

pub const DEFAULT_CONFIG_PATH: &str = "traxcry.toml";

pub const COINGECKO_API: &str = "https://api.coingecko.com/api/v3";
pub const METADATA_TIMEOUT_SECS: u64 = 10;
pub const METADATA_PAGE_SIZE: u32 = 250;
pub const METADATA_PAGES: u32 = 4;

pub const EXCHANGE_TIMEOUT_SECS: u64 = 10;
pub const MIN_REQUEST_INTERVAL_MS: u64 = 100;
/// Largest `limit` the v3 klines endpoint accepts
pub const MAX_KLINES_LIMIT: usize = 1000;

pub const RETRY_MAX_ATTEMPTS: u32 = 3;
pub const RETRY_BASE_BACKOFF_MS: u64 = 500;
