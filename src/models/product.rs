use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const UNKNOWN_PRODUCT: &str = "Unknown Product";
pub const NO_MODEL_NUMBER: &str = "No model number found";

// ---------------------------------------------------------------------------
// ProductDetails - Fields scraped from a product page
// ---------------------------------------------------------------------------

/// Product metadata scraped from the supplier's product page.
///
/// `link` is the page that was fetched and is always present. Every other
/// field is `None` when its selector matched nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub link: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub upc: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub model: Option<String>,
}

impl ProductDetails {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_PRODUCT)
    }

    pub fn display_model(&self) -> &str {
        self.model.as_deref().unwrap_or(NO_MODEL_NUMBER)
    }
}

// ---------------------------------------------------------------------------
// StockLevel
// ---------------------------------------------------------------------------

/// Stock reported by the stock endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StockLevel {
    /// The endpoint's `stock` value, as sent.
    Known(Value),
    #[default]
    Unknown,
}

impl fmt::Display for StockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockLevel::Known(Value::String(s)) => f.write_str(s),
            StockLevel::Known(v) => write!(f, "{}", v),
            StockLevel::Unknown => f.write_str("N/A"),
        }
    }
}
