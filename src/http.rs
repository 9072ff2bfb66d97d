//! Shared blocking HTTP client.
//!
//! Every remote call of a run (pricing API, product pages, stock endpoint,
//! webhook) goes through one client built on first use.

use std::time::Duration;

use reqwest::blocking::{Client, Response};

use crate::error::Result;

pub struct HttpClient {
    timeout: Option<Duration>,
    client: Option<Client>,
}

impl HttpClient {
    /// `timeout` of `None` means requests wait as long as the server does.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            client: None,
        }
    }

    /// Lazy HTTP client, created on first use.
    pub fn client(&mut self) -> Result<&Client> {
        let client = match self.client.take() {
            Some(client) => client,
            None => Client::builder()
                .timeout(self.timeout)
                .redirect(reqwest::redirect::Policy::limited(10))
                .build()?,
        };
        Ok(&*self.client.insert(client))
    }
}

/// Read a response body for logging, never failing.
pub(crate) fn body_text(resp: Response) -> String {
    resp.text().unwrap_or_else(|e| format!("<unreadable body: {}>", e))
}
