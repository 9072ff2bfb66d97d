//! Pricing API client: all cost changes since a given date.

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::{error, info};

use crate::config::SUBSCRIPTION_KEY_HEADER;
use crate::error::{MonitorError, Result};
use crate::http::body_text;
use crate::models::CostChangeRecord;

/// Query interface for the supplier's cost-change feed.
pub struct ChangeFetcher<'a> {
    client: &'a Client,
    endpoint: &'a str,
    api_key: &'a str,
    member_number: &'a str,
}

impl<'a> ChangeFetcher<'a> {
    pub fn new(client: &'a Client, endpoint: &'a str, api_key: &'a str, member_number: &'a str) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            member_number,
        }
    }

    /// Fetch every cost change since the calendar date of `since`.
    ///
    /// The time of day is dropped; the API only filters by date. A 404 means
    /// no changes and yields an empty list. Any other non-200 status is an
    /// error.
    pub fn fetch_cost_changes(&self, since: DateTime<Utc>) -> Result<Vec<CostChangeRecord>> {
        let changes_since = changes_since_param(since);
        let resp = self
            .client
            .get(self.endpoint)
            .header(SUBSCRIPTION_KEY_HEADER, self.api_key)
            .query(&[
                ("changesSince", changes_since.as_str()),
                ("memberNumber", self.member_number),
            ])
            .send()?;

        match resp.status() {
            StatusCode::OK => {
                let records: Vec<CostChangeRecord> = resp.json()?;
                info!(count = records.len(), since = %changes_since, "fetched cost changes");
                Ok(records)
            }
            StatusCode::NOT_FOUND => {
                info!(since = %changes_since, "no changes found");
                Ok(Vec::new())
            }
            status => {
                let url = resp.url().to_string();
                let body = body_text(resp);
                error!(status = status.as_u16(), body = %body, "failed to fetch cost changes");
                Err(MonitorError::UnexpectedStatus {
                    url,
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

/// `YYYY-MM-DD` form of `since` used in the `changesSince` parameter.
pub fn changes_since_param(since: DateTime<Utc>) -> String {
    since.format("%Y-%m-%d").to_string()
}
