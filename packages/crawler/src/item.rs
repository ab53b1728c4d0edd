//! One retailer listing observation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A product observed on a retailer listing or detail page.
///
/// Invariants after the cleaning stage: `price > 0`, `product_url`
/// absolute, `name` non-empty — anything else is dropped before
/// persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedItem {
    pub name: String,
    pub price: Decimal,
    pub product_url: String,
    pub retailer_slug: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub in_stock: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub specs: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<DateTime<Utc>>,
}

impl ScrapedItem {
    pub fn new(
        name: impl Into<String>,
        retailer_slug: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            price: Decimal::ZERO,
            product_url: String::new(),
            retailer_slug: retailer_slug.into(),
            category: category.into(),
            image_url: None,
            brand: None,
            in_stock: None,
            specs: BTreeMap::new(),
            scraped_at: None,
        }
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = price;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.product_url = url.into();
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_spec(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.specs.insert(key.into(), value.into());
        self
    }

    /// URL-safe identity used for upsert matching alongside the URL.
    pub fn slug(&self) -> String {
        crate::spider::base::slugify(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_round_trip() {
        let item = ScrapedItem::new("AMD Ryzen 5 5600", "startech", "processor")
            .with_price(Decimal::from(17500))
            .with_url("https://www.startech.com.bd/amd-ryzen-5-5600")
            .with_brand("AMD")
            .with_spec("Socket", "AM4");

        assert_eq!(item.slug(), "amd-ryzen-5-5600");
        assert!(item.price > Decimal::ZERO);
        assert_eq!(item.specs.len(), 1);
    }
}
