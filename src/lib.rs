//! Supplier price-drop monitor.
//!
//! Polls a supplier's pricing API for cost changes since the last run,
//! compares them with a locally persisted price snapshot, enriches each
//! dropped item with scraped product details and stock, and announces it to
//! a chat webhook. One call to [`Monitor::run`] is one complete pass.
//!
//! # Quick start
//!
//! ```no_run
//! use price_drop_monitor::{Monitor, Settings};
//!
//! let settings = Settings::from_env().unwrap();
//! let mut monitor = Monitor::builder().settings(settings).build().unwrap();
//! let summary = monitor.run().unwrap();
//! println!("{}", summary);
//! ```

pub mod config;
pub mod detector;
pub mod enricher;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod models;
pub mod notifier;
pub mod state;

pub use config::{DropPolicy, Settings};
pub use detector::{detect, Candidate, Detection, Direction};
pub use enricher::{parse_product_page, ProductEnricher};
pub use error::{MonitorError, Result};
pub use fetcher::ChangeFetcher;
pub use notifier::{NotifiedSet, Notifier, NotifyOutcome};
pub use state::{RunLock, StateStore};

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::http::HttpClient;

// ---------------------------------------------------------------------------
// MonitorBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`Monitor`].
///
/// Start from [`Settings`] (usually [`Settings::from_env`]) and override
/// individual knobs as needed.
#[derive(Default)]
pub struct MonitorBuilder {
    settings: Option<Settings>,
    price_history_file: Option<PathBuf>,
    last_checked_file: Option<PathBuf>,
    drop_policy: Option<DropPolicy>,
    lock_file: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl MonitorBuilder {
    /// Base settings. Required.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Override where the price snapshot is stored.
    pub fn price_history_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.price_history_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Override where the last-checked marker is stored.
    pub fn last_checked_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.last_checked_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Which cost changes are announced. Defaults to decreases only.
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = Some(policy);
        self
    }

    /// Refuse to run while `path` exists, and hold it for the whole run.
    pub fn lock_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.lock_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Per-request HTTP timeout. Without one, requests never time out.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Monitor> {
        let mut settings = self
            .settings
            .ok_or_else(|| MonitorError::Config("no settings provided".to_string()))?;

        if let Some(path) = self.price_history_file {
            settings.price_history_file = path;
        }
        if let Some(path) = self.last_checked_file {
            settings.last_checked_file = path;
        }
        if let Some(policy) = self.drop_policy {
            settings.drop_policy = policy;
        }
        if let Some(path) = self.lock_file {
            settings.lock_file = Some(path);
        }
        if let Some(timeout) = self.timeout {
            settings.timeout = Some(timeout);
        }

        for (key, value) in [
            ("ENDPOINT", &settings.endpoint),
            ("DISCORD_WEBHOOK_URL", &settings.webhook_url),
            ("SUPPLIER_BASE_URL", &settings.supplier_base_url),
            ("STOCK_API_URL", &settings.stock_api_url),
        ] {
            url::Url::parse(value).map_err(|e| {
                MonitorError::Config(format!("{} is not a valid URL ({}): {}", key, e, value))
            })?;
        }

        let store = StateStore::new(
            settings.price_history_file.clone(),
            settings.last_checked_file.clone(),
        );
        let http = HttpClient::new(settings.timeout);

        Ok(Monitor {
            settings,
            store,
            http,
        })
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// One configured monitor. Each [`run`](Monitor::run) is an independent pass
/// with its own deduplication set.
pub struct Monitor {
    settings: Settings,
    store: StateStore,
    http: HttpClient,
}

impl Monitor {
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::default()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run one full pass: fetch, detect, enrich, notify, persist.
    ///
    /// Fails only on fatal conditions (unexpected pricing API status,
    /// unreadable state files, lock held by another run). Per-item problems
    /// are logged and counted in the summary. State is persisted only after
    /// every item has been processed.
    pub fn run(&mut self) -> Result<RunSummary> {
        let _lock = match &self.settings.lock_file {
            Some(path) => Some(RunLock::acquire(path)?),
            None => None,
        };

        let client = self.http.client()?;
        let settings = &self.settings;

        let last_checked = self.store.get_last_checked()?;
        let records = ChangeFetcher::new(
            client,
            &settings.endpoint,
            &settings.api_key,
            &settings.member_number,
        )
        .fetch_cost_changes(last_checked)?;

        let previous = self.store.load_prices()?;
        let detection = detect(&records, &previous, settings.drop_policy);

        let mut summary = RunSummary {
            fetched: records.len(),
            candidates: detection.candidates.len(),
            ..RunSummary::default()
        };

        let enricher = ProductEnricher::new(client, &settings.supplier_base_url, &settings.stock_api_url);
        let notifier = Notifier::new(client, &settings.webhook_url);
        let mut notified = NotifiedSet::new();

        for candidate in &detection.candidates {
            let (details, stock) = enricher.enrich(&candidate.sku);
            match notifier.notify(candidate, details.as_ref(), &stock, &mut notified) {
                NotifyOutcome::Sent => summary.notified += 1,
                NotifyOutcome::AlreadyNotified | NotifyOutcome::MissingDetails => summary.skipped += 1,
                NotifyOutcome::Rejected(_) | NotifyOutcome::Failed(_) => summary.failed += 1,
            }
        }

        self.store.save_prices(&detection.snapshot)?;
        self.store.save_last_checked(Utc::now())?;

        if summary.failed > 0 {
            warn!(failed = summary.failed, "some announcements were not delivered");
        }
        info!(%summary, "run complete");
        Ok(summary)
    }
}

impl fmt::Display for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Monitor(endpoint={}, price_history={}, last_checked={}, policy={})",
            self.settings.endpoint,
            self.store.price_history_file.display(),
            self.store.last_checked_file.display(),
            self.settings.drop_policy
        )
    }
}

// ---------------------------------------------------------------------------
// RunSummary
// ---------------------------------------------------------------------------

/// Counts from one [`Monitor::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Change records returned by the pricing API.
    pub fetched: usize,
    /// Records that passed the drop policy.
    pub candidates: usize,
    /// Announcements the webhook accepted.
    pub notified: usize,
    /// Candidates skipped for missing details or an earlier announcement.
    pub skipped: usize,
    /// Announcements rejected by the webhook or that errored.
    pub failed: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetched={} candidates={} notified={} skipped={} failed={}",
            self.fetched, self.candidates, self.notified, self.skipped, self.failed
        )
    }
}
