//! # Product Types
//!
//! Product catalog types for sokocart.
//! Products are loaded from `config/products.toml`.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    KES,
    USD,
    EUR,
    TZS,
    UGX,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::KES => "kes",
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::TZS => "tzs",
            Currency::UGX => "ugx",
        }
    }

    /// Returns the number of decimal places for this currency
    /// (UGX has 0 decimals, the others have 2)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::UGX => 0,
            _ => 2,
        }
    }

    /// Convert a decimal amount to the smallest currency unit (cents)
    pub fn to_smallest_unit(&self, amount: f64) -> i64 {
        let multiplier = 10_f64.powi(self.decimal_places() as i32);
        (amount * multiplier).round() as i64
    }

    /// Convert from smallest unit back to decimal
    pub fn from_smallest_unit(&self, amount: i64) -> f64 {
        let divisor = 10_f64.powi(self.decimal_places() as i32);
        amount as f64 / divisor
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::KES
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Price with amount in smallest currency unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in smallest currency unit (cents for KES)
    pub amount: i64,
    /// Currency
    pub currency: Currency,
}

impl Price {
    /// Create a new price from decimal amount
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self {
            amount: currency.to_smallest_unit(amount),
            currency,
        }
    }

    /// Create a price from smallest unit (cents)
    pub fn from_cents(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Get the decimal amount
    pub fn as_decimal(&self) -> f64 {
        self.currency.from_smallest_unit(self.amount)
    }

    /// Format for display (e.g., "KSh 1,000.00" style without grouping)
    pub fn display(&self) -> String {
        let symbol = match self.currency {
            Currency::KES => "KSh ",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::TZS => "TSh ",
            Currency::UGX => "USh ",
        };
        if self.currency.decimal_places() == 0 {
            format!("{}{}", symbol, self.amount)
        } else {
            format!("{}{:.2}", symbol, self.as_decimal())
        }
    }
}

/// A configurable option a product exposes (size, color, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    /// Option name (e.g., "Size")
    pub name: String,
    /// Allowed values (e.g., ["S", "M", "L"])
    pub values: Vec<String>,
}

/// A product in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier (e.g., "kitenge-tote")
    pub id: String,

    /// Display name
    pub name: String,

    /// Short description
    #[serde(default)]
    pub description: String,

    /// Price
    pub price: Price,

    /// Whether stock levels are tracked for this product
    #[serde(default)]
    pub track_quantity: bool,

    /// Units in stock (meaningful only when `track_quantity` is true)
    #[serde(default)]
    pub available_quantity: u32,

    /// Whether this product is active and available for purchase
    #[serde(default = "default_true")]
    pub active: bool,

    /// Options the buyer selects per line item
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ProductOption>,

    /// Optional image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Product {
    /// Create a new untracked product
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Price) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            price,
            track_quantity: false,
            available_quantity: 0,
            active: true,
            options: Vec::new(),
            image_url: None,
        }
    }

    /// Builder: track stock with the given on-hand quantity
    pub fn with_stock(mut self, available: u32) -> Self {
        self.track_quantity = true;
        self.available_quantity = available;
        self
    }

    /// Builder: set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder: set image URL
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Builder: add a selectable option
    pub fn with_option(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.options.push(ProductOption {
            name: name.into(),
            values,
        });
        self
    }
}

/// Product catalog (loaded from config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    pub products: Vec<Product>,
}

impl ProductCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            products: Vec::new(),
        }
    }

    /// Add a product to the catalog
    pub fn add(&mut self, product: Product) {
        self.products.push(product);
    }

    /// Find a product by ID
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Get all active products
    pub fn active_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.active)
    }

    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load the catalog from `config/products.toml`, searching upward
    /// from the working directory. Falls back to an empty catalog when
    /// no config file exists.
    pub fn load() -> StoreResult<Self> {
        let config_paths = [
            "config/products.toml",
            "../config/products.toml",
            "../../config/products.toml",
        ];

        for path in config_paths {
            if let Ok(content) = std::fs::read_to_string(path) {
                let catalog = Self::from_toml(&content).map_err(|e| {
                    StoreError::Configuration(format!("Failed to parse {path}: {e}"))
                })?;
                tracing::info!("Loaded {} products from {}", catalog.products.len(), path);
                return Ok(catalog);
            }
        }

        tracing::warn!("No product catalog found, using empty catalog");
        Ok(Self::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_conversion() {
        let kes = Currency::KES;
        assert_eq!(kes.to_smallest_unit(10.99), 1099);
        assert_eq!(kes.from_smallest_unit(1099), 10.99);

        let ugx = Currency::UGX;
        assert_eq!(ugx.to_smallest_unit(1000.0), 1000);
        assert_eq!(ugx.from_smallest_unit(1000), 1000.0);
    }

    #[test]
    fn test_price_display() {
        let price = Price::new(1250.0, Currency::KES);
        assert_eq!(price.display(), "KSh 1250.00");

        let price_usd = Price::new(29.99, Currency::USD);
        assert_eq!(price_usd.display(), "$29.99");
    }

    #[test]
    fn test_product_builder() {
        let product = Product::new("kitenge-tote", "Kitenge Tote", Price::new(950.0, Currency::KES))
            .with_description("Hand-stitched tote bag")
            .with_stock(12)
            .with_option("Color", vec!["Red".into(), "Blue".into()]);

        assert_eq!(product.id, "kitenge-tote");
        assert!(product.track_quantity);
        assert_eq!(product.available_quantity, 12);
        assert_eq!(product.options.len(), 1);
    }

    #[test]
    fn test_catalog_loads_from_config_file() {
        // Reads config/products.toml at the workspace root
        let catalog = ProductCatalog::load().unwrap();
        assert!(catalog.get("tea-500g").is_some());
        let shuka = catalog.get("shuka").unwrap();
        assert!(shuka.track_quantity);
        assert_eq!(shuka.options[0].name, "Color");
    }

    #[test]
    fn test_catalog_from_toml() {
        let toml_str = r#"
            [[products]]
            id = "tea-500g"
            name = "Kericho Gold 500g"
            price = { amount = 45000, currency = "kes" }
            track_quantity = true
            available_quantity = 40
        "#;

        let catalog = ProductCatalog::from_toml(toml_str).unwrap();
        let product = catalog.get("tea-500g").unwrap();
        assert_eq!(product.price.amount, 45000);
        assert!(product.track_quantity);
        assert_eq!(catalog.active_products().count(), 1);
    }
}
