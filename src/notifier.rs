//! Webhook announcements for detected price drops.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::{error, info, warn};
use url::Url;

use crate::config::{marketplace_searches, ANNOUNCEMENT_TZ};
use crate::detector::{Candidate, Direction};
use crate::error::{MonitorError, Result};
use crate::models::{Embed, EmbedField, ProductDetails, StockLevel, Thumbnail, WebhookPayload};

// ---------------------------------------------------------------------------
// NotifiedSet
// ---------------------------------------------------------------------------

/// SKUs already announced during this run.
#[derive(Debug, Clone, Default)]
pub struct NotifiedSet(HashSet<String>);

impl NotifiedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, sku: &str) -> bool {
        self.0.contains(sku)
    }

    /// Returns `false` if `sku` was already present.
    pub fn insert(&mut self, sku: impl Into<String>) -> bool {
        self.0.insert(sku.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    AlreadyNotified,
    MissingDetails,
    /// Webhook answered with something other than 204.
    Rejected(u16),
    /// Building or sending the message failed.
    Failed(String),
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

pub struct Notifier<'a> {
    client: &'a Client,
    webhook_url: &'a str,
}

impl<'a> Notifier<'a> {
    pub fn new(client: &'a Client, webhook_url: &'a str) -> Self {
        Self {
            client,
            webhook_url,
        }
    }

    /// Announce `candidate` unless it has no product details or was already
    /// announced this run.
    ///
    /// Never fails: problems are logged and reported in the outcome. The SKU
    /// is added to `notified` only when the webhook answers 204.
    pub fn notify(
        &self,
        candidate: &Candidate,
        details: Option<&ProductDetails>,
        stock: &StockLevel,
        notified: &mut NotifiedSet,
    ) -> NotifyOutcome {
        let sku = candidate.sku.as_str();
        let Some(details) = details else {
            warn!(sku = %sku, "skipping, failed to retrieve product details");
            return NotifyOutcome::MissingDetails;
        };

        if notified.contains(sku) {
            return NotifyOutcome::AlreadyNotified;
        }

        let name = details.display_name();
        match self.send(candidate, details, stock) {
            Ok(StatusCode::NO_CONTENT) => {
                info!(sku = %sku, product = %name, "webhook sent");
                notified.insert(sku);
                NotifyOutcome::Sent
            }
            Ok(status) => {
                warn!(sku = %sku, product = %name, status = status.as_u16(), "webhook rejected");
                NotifyOutcome::Rejected(status.as_u16())
            }
            Err(e) => {
                error!(sku = %sku, error = %e, "error posting to webhook");
                NotifyOutcome::Failed(e.to_string())
            }
        }
    }

    fn send(&self, candidate: &Candidate, details: &ProductDetails, stock: &StockLevel) -> Result<StatusCode> {
        let embed = build_embed(candidate, details, stock, Utc::now())?;
        let payload = WebhookPayload { embeds: vec![embed] };
        let resp = self.client.post(self.webhook_url).json(&payload).send()?;
        Ok(resp.status())
    }
}

// ---------------------------------------------------------------------------
// Message formatting
// ---------------------------------------------------------------------------

/// Percentage below retail, `0.0` when there is no positive retail price.
pub fn discount_percent(retail: f64, current: f64) -> f64 {
    if retail > 0.0 {
        (retail - current) / retail * 100.0
    } else {
        0.0
    }
}

/// `now` in Eastern time, e.g. `"March 05 at 02:07 PM"`.
pub fn format_local_timestamp(now: DateTime<Utc>) -> String {
    now.with_timezone(&ANNOUNCEMENT_TZ)
        .format("%B %d at %I:%M %p")
        .to_string()
}

/// `image` as a thumbnail, if it is an absolute http(s) URL.
pub fn thumbnail_for(image: Option<&str>) -> Option<Thumbnail> {
    let image = image?;
    let parsed = Url::parse(image).ok()?;
    if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() {
        Some(Thumbnail {
            url: image.to_string(),
        })
    } else {
        None
    }
}

/// Markdown links searching each marketplace for `product_name`.
pub fn marketplace_links(product_name: &str) -> Result<String> {
    let links = marketplace_searches()
        .iter()
        .map(|(label, base, param)| {
            Url::parse_with_params(base, &[(*param, product_name)])
                .map(|url| format!("[{}]({})", label, url))
                .map_err(|e| MonitorError::InvalidArgument(format!("{} search URL: {}", label, e)))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(links.join(" - "))
}

/// Build the announcement embed for one candidate.
pub fn build_embed(
    candidate: &Candidate,
    details: &ProductDetails,
    stock: &StockLevel,
    now: DateTime<Utc>,
) -> Result<Embed> {
    let name = details.display_name();
    let retail = candidate.record.retail_price();
    let current = candidate.current_cost;
    let discount = discount_percent(retail, current);

    let (headline, verb) = match candidate.direction {
        Direction::Decrease => ("Price drop", "decreased"),
        Direction::Increase => ("Price change", "increased"),
    };

    let mut fields = Vec::new();
    if let Some(brand) = &details.brand {
        fields.push(EmbedField::new("Brand", brand.as_str()));
    }
    if let Some(category) = &details.category {
        fields.push(EmbedField::new("Category", category.as_str()));
    }
    if let Some(sku) = &candidate.record.sku {
        fields.push(EmbedField::new("SKU", sku.as_str()));
    }
    fields.push(EmbedField::new("Model Number", details.display_model()));
    if let Some(upc) = &details.upc {
        fields.push(EmbedField::new("UPC", upc.as_str()));
    }
    fields.push(EmbedField::inline("Current Price", format!("${:.2}", current), true));
    fields.push(EmbedField::inline("Retail Price", format!("${:.2}", retail), true));
    fields.push(EmbedField::inline("Discount %", format!("{:.1}%", discount), true));
    fields.push(EmbedField::inline("Total Stock", stock.to_string(), true));
    fields.push(EmbedField::inline("Links", marketplace_links(name)?, false));

    Ok(Embed {
        title: format!("Price Alert! 🛒 {} for {}", headline, name),
        description: format!("The price for **{}** has {}.", name, verb),
        url: details.link.clone(),
        timestamp: format_local_timestamp(now),
        thumbnail: thumbnail_for(details.image.as_deref()),
        fields,
    })
}
