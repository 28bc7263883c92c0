use crate::taxonomy::Term;
use crate::variation::Variation;
use crate::Availability;
use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use typesafe_repository::async_ops::{Get, List, Save, Select};
use typesafe_repository::macros::Id;
use typesafe_repository::prelude::*;
use typesafe_repository::{IdentityOf, SelectBy, Selector};
use uuid::Uuid;

/// Ownership context attached to products on creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreContext {
    pub store_id: String,
    pub product_type: String,
}

#[derive(Clone, Debug, PartialEq, Id)]
#[Id(ref_id, get_id)]
pub struct Product {
    #[id]
    pub id: Uuid,
    pub custom_product_id: String,
    pub title: String,
    pub brand: Option<IdentityOf<Term>>,
    pub category: Option<IdentityOf<Term>>,
    pub article_group: Option<String>,
    pub merchandise_group: Option<String>,
    pub guise: Option<String>,
    pub weight: Option<Decimal>,
    pub customs_tariff_number: Option<String>,
    pub available: Availability,
    pub store: StoreContext,
    /// Owned variations in attachment order.
    pub variations: Vec<IdentityOf<Variation>>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Product {
    pub fn new<S: Into<String>>(custom_product_id: S, store: StoreContext) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: crate::random_id(),
            custom_product_id: custom_product_id.into(),
            title: String::new(),
            brand: None,
            category: None,
            article_group: None,
            merchandise_group: None,
            guise: None,
            weight: None,
            customs_tariff_number: None,
            available: Availability::NotAvailable,
            store,
            variations: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn owns(&self, variation: &IdentityOf<Variation>) -> bool {
        self.variations.contains(variation)
    }

    pub fn attach(&mut self, variation: IdentityOf<Variation>) {
        if !self.owns(&variation) {
            self.variations.push(variation);
        }
    }
}

/// Business-key lookup, first match in creation order.
pub struct ByCustomId(pub String);

impl Selector for ByCustomId {}
impl SelectBy<ByCustomId> for Product {}

#[async_trait]
pub trait ProductRepository:
    Repository<Product, Error = anyhow::Error>
    + Save<Product>
    + Get<Product>
    + List<Product>
    + Select<Product, ByCustomId>
    + Send
    + Sync
{
    async fn clear(&self) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> StoreContext {
        StoreContext {
            store_id: "1".to_string(),
            product_type: "default".to_string(),
        }
    }

    #[test]
    fn attach_keeps_order_and_skips_duplicates() {
        let mut p = Product::new("P100", store());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        p.attach(a);
        p.attach(b);
        p.attach(a);
        assert_eq!(p.variations, vec![a, b]);
        assert!(p.owns(&b));
    }
}
