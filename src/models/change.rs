use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// CostChangeRecord - One entry from the pricing API's change feed
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostChangeRecord {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub current_cost: Option<f64>,
    #[serde(default)]
    pub suggested_retail_price: Option<f64>,
    /// Fields the monitor does not interpret, kept as received.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CostChangeRecord {
    /// Build a record with just the fields the monitor looks at.
    pub fn new(sku: impl Into<String>, current_cost: f64, suggested_retail_price: Option<f64>) -> Self {
        Self {
            sku: Some(sku.into()),
            current_cost: Some(current_cost),
            suggested_retail_price,
            extra: Map::new(),
        }
    }

    /// Suggested retail price, or `0.0` when the API omitted it.
    pub fn retail_price(&self) -> f64 {
        self.suggested_retail_price.unwrap_or(0.0)
    }
}
