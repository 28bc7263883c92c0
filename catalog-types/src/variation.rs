use crate::attribute::AttributeValue;
use crate::product::Product;
use crate::Price;
use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use typesafe_repository::async_ops::{Get, Save, Select};
use typesafe_repository::macros::Id;
use typesafe_repository::prelude::*;
use typesafe_repository::{IdentityOf, SelectBy, Selector};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariationStatus {
    Active,
    Inactive,
}

impl VariationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariationStatus::Active => "active",
            VariationStatus::Inactive => "inactive",
        }
    }
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "inactive" => VariationStatus::Inactive,
            _ => VariationStatus::Active,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Id)]
#[Id(ref_id, get_id)]
pub struct Variation {
    #[id]
    pub id: Uuid,
    pub product_id: IdentityOf<Product>,
    pub sku: String,
    pub title: String,
    pub price: Option<Price>,
    pub color: Option<IdentityOf<AttributeValue>>,
    pub format: Option<IdentityOf<AttributeValue>>,
    pub material: Option<IdentityOf<AttributeValue>>,
    pub stock_level: Option<Decimal>,
    pub status: VariationStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Variation {
    pub fn new<S: Into<String>>(product_id: IdentityOf<Product>, sku: S) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: crate::random_id(),
            product_id,
            sku: sku.into(),
            title: String::new(),
            price: None,
            color: None,
            format: None,
            material: None,
            stock_level: None,
            status: VariationStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Exact SKU match within an already loaded collection.
pub fn find_by_sku<'a>(variations: &'a [Variation], sku: &str) -> Option<&'a Variation> {
    variations.iter().find(|v| v.sku == sku)
}

/// Catalog-wide SKU lookup, creation order.
pub struct BySku(pub String);

impl Selector for BySku {}
impl SelectBy<BySku> for Variation {}

#[async_trait]
pub trait VariationRepository:
    Repository<Variation, Error = anyhow::Error>
    + Save<Variation>
    + Get<Variation>
    + Select<Variation, BySku>
    + Send
    + Sync
{
    async fn clear(&self) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_by_sku_is_exact() {
        let product = Uuid::new_v4();
        let items = vec![
            Variation::new(product, "P100-RED"),
            Variation::new(product, "P100-BLUE"),
        ];
        assert_eq!(
            find_by_sku(&items, "P100-BLUE").map(|v| v.id),
            Some(items[1].id)
        );
        assert!(find_by_sku(&items, "p100-red").is_none());
        assert!(find_by_sku(&items, "P100").is_none());
    }

    #[test]
    fn status_defaults_to_active() {
        assert_eq!(VariationStatus::from_str("inactive"), VariationStatus::Inactive);
        assert_eq!(VariationStatus::from_str("whatever"), VariationStatus::Active);
    }
}
