//! Product page scraping and stock lookup for a single SKU.
//!
//! A page that cannot be fetched means the item is skipped. Anything short of
//! that is partial data: each scraped field is independently optional, and a
//! stock lookup that fails in any way is reported as unknown.

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::StatusCode;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{BROWSER_ACCEPT, BROWSER_ACCEPT_LANGUAGE, BROWSER_USER_AGENT};
use crate::models::{ProductDetails, StockLevel};

const NAME_SELECTOR: &str = r#"span[role="name"].font-black"#;
const IMAGE_SELECTOR: &str = ".pdp__prodimage";
const UPC_SELECTOR: &str = r#"span[role="upc"]"#;
const SPEC_CELL_SELECTOR: &str = "td";
const BREADCRUMB_SELECTOR: &str = r#"span[itemprop="name"].cmp-breadcrumb__name"#;
const MODEL_SELECTOR: &str = r#"span[role="modelNumber"]"#;

/// Label of the specifications row holding the brand.
const BRAND_LABEL: &str = "Brand";

// ---------------------------------------------------------------------------
// ProductEnricher
// ---------------------------------------------------------------------------

/// Looks up product metadata and stock for candidate SKUs.
pub struct ProductEnricher<'a> {
    client: &'a Client,
    supplier_base_url: &'a str,
    stock_api_url: &'a str,
}

impl<'a> ProductEnricher<'a> {
    pub fn new(client: &'a Client, supplier_base_url: &'a str, stock_api_url: &'a str) -> Self {
        Self {
            client,
            supplier_base_url,
            stock_api_url,
        }
    }

    /// Product page URL for `sku`.
    pub fn product_url(&self, sku: &str) -> String {
        format!("{}/product/{}/", self.supplier_base_url.trim_end_matches('/'), sku)
    }

    /// Fetch and parse the product page for `sku`.
    ///
    /// Returns `None` only when the page itself could not be fetched.
    pub fn scrape_product_details(&self, sku: &str) -> Option<ProductDetails> {
        let url = self.product_url(sku);
        let resp = self
            .client
            .get(&url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, BROWSER_ACCEPT)
            .header(ACCEPT_LANGUAGE, BROWSER_ACCEPT_LANGUAGE)
            .send();

        let resp = match resp {
            Ok(resp) => resp,
            Err(e) => {
                warn!(sku = %sku, error = %e, "error fetching product page");
                return None;
            }
        };

        if resp.status() != StatusCode::OK {
            warn!(sku = %sku, status = resp.status().as_u16(), "failed to fetch product page");
            return None;
        }

        match resp.text() {
            Ok(html) => Some(parse_product_page(&html, url)),
            Err(e) => {
                warn!(sku = %sku, error = %e, "error reading product page");
                None
            }
        }
    }

    /// Current stock for `sku`, or [`StockLevel::Unknown`] on any failure.
    pub fn fetch_stock(&self, sku: &str) -> StockLevel {
        let url = format!("{}{}", self.stock_api_url, sku);
        let resp = match self.client.get(&url).send() {
            Ok(resp) => resp,
            Err(e) => {
                warn!(sku = %sku, error = %e, "error fetching stock level");
                return StockLevel::Unknown;
            }
        };

        if resp.status() != StatusCode::OK {
            debug!(sku = %sku, status = resp.status().as_u16(), "stock level unavailable");
            return StockLevel::Unknown;
        }

        match resp.json::<Value>() {
            Ok(body) => stock_from_body(&body),
            Err(e) => {
                warn!(sku = %sku, error = %e, "malformed stock response");
                StockLevel::Unknown
            }
        }
    }

    /// Page details and stock for `sku`.
    pub fn enrich(&self, sku: &str) -> (Option<ProductDetails>, StockLevel) {
        let details = self.scrape_product_details(sku);
        let stock = self.fetch_stock(sku);
        (details, stock)
    }
}

/// `stock` entry of a stock endpoint body.
pub fn stock_from_body(body: &Value) -> StockLevel {
    match body.get("stock") {
        Some(Value::Null) | None => StockLevel::Unknown,
        Some(v) => StockLevel::Known(v.clone()),
    }
}

// ---------------------------------------------------------------------------
// Page parsing
// ---------------------------------------------------------------------------

/// Extract product fields from a product page.
///
/// `link` is recorded as the canonical product URL. Fields whose selector
/// matches nothing, or matches only whitespace, are `None`.
pub fn parse_product_page(html: &str, link: impl Into<String>) -> ProductDetails {
    let doc = Html::parse_document(html);

    ProductDetails {
        link: link.into(),
        name: first_text(&doc, NAME_SELECTOR),
        image: first_element(&doc, IMAGE_SELECTOR)
            .and_then(|el| el.value().attr("src"))
            .map(str::trim)
            .filter(|src| !src.is_empty())
            .map(str::to_string),
        upc: first_text(&doc, UPC_SELECTOR),
        brand: labeled_cell(&doc, BRAND_LABEL),
        category: nth_text(&doc, BREADCRUMB_SELECTOR, 1),
        model: first_text(&doc, MODEL_SELECTOR),
    }
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!(selector = css, error = %e, "invalid selector");
            None
        }
    }
}

fn first_element<'d>(doc: &'d Html, css: &str) -> Option<ElementRef<'d>> {
    let sel = selector(css)?;
    doc.select(&sel).next()
}

fn first_text(doc: &Html, css: &str) -> Option<String> {
    nth_text(doc, css, 0)
}

fn nth_text(doc: &Html, css: &str, n: usize) -> Option<String> {
    let sel = selector(css)?;
    doc.select(&sel).nth(n).and_then(element_text)
}

/// Value cell following the cell whose text is exactly `label`.
fn labeled_cell(doc: &Html, label: &str) -> Option<String> {
    let sel = selector(SPEC_CELL_SELECTOR)?;
    let mut cells = doc.select(&sel);
    cells.find(|cell| element_text(*cell).as_deref() == Some(label))?;
    cells.next().and_then(element_text)
}

/// Whitespace-collapsed text content, `None` if empty.
fn element_text(el: ElementRef<'_>) -> Option<String> {
    let text = el
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
