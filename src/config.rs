use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{MonitorError, Result};

/// Supplier member number sent with every pricing request.
pub const MEMBER_NUMBER: &str = "4951";

pub const PRICE_HISTORY_FILE: &str = "price_history.json";
pub const LAST_CHECKED_FILE: &str = "last_checked_time.json";

/// Header carrying the pricing API key.
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
pub const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

/// Time zone used for the human-readable time in announcements.
pub const ANNOUNCEMENT_TZ: chrono_tz::Tz = chrono_tz::America::New_York;

/// Marketplace search pages linked from every announcement, as
/// `(label, base url, query parameter)`.
pub fn marketplace_searches() -> [(&'static str, &'static str, &'static str); 3] {
    [
        ("Amazon", "https://www.amazon.com/s", "k"),
        ("Walmart", "https://www.walmart.com/search/", "query"),
        ("Google", "https://www.google.com/search", "q"),
    ]
}

// ---------------------------------------------------------------------------
// DropPolicy
// ---------------------------------------------------------------------------

/// Which cost changes count as notifiable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropPolicy {
    /// Only a strictly lower cost than the stored one.
    #[default]
    DecreaseOnly,
    /// Any difference from the stored cost, in either direction.
    AnyChange,
}

impl FromStr for DropPolicy {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "decrease" | "decrease_only" | "drop" => Ok(DropPolicy::DecreaseOnly),
            "any" | "any_change" | "change" => Ok(DropPolicy::AnyChange),
            other => Err(MonitorError::Config(format!(
                "DROP_POLICY must be 'decrease' or 'any', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DropPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropPolicy::DecreaseOnly => f.write_str("decrease"),
            DropPolicy::AnyChange => f.write_str("any"),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Everything a run needs to know about its environment.
#[derive(Clone)]
pub struct Settings {
    pub endpoint: String,
    pub api_key: String,
    pub webhook_url: String,
    pub supplier_base_url: String,
    pub stock_api_url: String,
    pub member_number: String,
    pub price_history_file: PathBuf,
    pub last_checked_file: PathBuf,
    pub drop_policy: DropPolicy,
    pub lock_file: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("webhook_url", &"<redacted>")
            .field("supplier_base_url", &self.supplier_base_url)
            .field("stock_api_url", &self.stock_api_url)
            .field("member_number", &self.member_number)
            .field("price_history_file", &self.price_history_file)
            .field("last_checked_file", &self.last_checked_file)
            .field("drop_policy", &self.drop_policy)
            .field("lock_file", &self.lock_file)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honored.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    ///
    /// Empty values are treated the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| MonitorError::Config(format!("{} is not set", key)))
        };

        let drop_policy = match get("DROP_POLICY") {
            Some(raw) => raw.parse()?,
            None => DropPolicy::default(),
        };

        let timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    MonitorError::Config(format!(
                        "HTTP_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                        raw
                    ))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            endpoint: required("ENDPOINT")?,
            api_key: required("API_KEY")?,
            webhook_url: required("DISCORD_WEBHOOK_URL")?,
            supplier_base_url: required("SUPPLIER_BASE_URL")?,
            stock_api_url: required("STOCK_API_URL")?,
            member_number: get("MEMBER_NUMBER").unwrap_or_else(|| MEMBER_NUMBER.to_string()),
            price_history_file: get("PRICE_HISTORY_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(PRICE_HISTORY_FILE)),
            last_checked_file: get("LAST_CHECKED_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(LAST_CHECKED_FILE)),
            drop_policy,
            lock_file: get("LOCK_FILE").map(PathBuf::from),
            timeout,
        })
    }
}
