use crate::variation::Variation;
use crate::Price;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use typesafe_repository::async_ops::{Save, Select};
use typesafe_repository::macros::Id;
use typesafe_repository::prelude::*;
use typesafe_repository::{IdentityOf, SelectBy, Selector};
use uuid::Uuid;

pub const DEFAULT_PRICE_LIST: &str = "Price table";

/// One (minimum order quantity, unit price) pair.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tier {
    pub quantity: Decimal,
    pub price: Decimal,
}

impl Tier {
    pub fn new(quantity: Decimal, price: Decimal) -> Self {
        Self {
            quantity: quantity.normalize(),
            price,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Id)]
#[Id(ref_id, get_id)]
pub struct PriceList {
    #[id]
    pub id: Uuid,
    pub name: String,
}

impl PriceList {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            id: crate::random_id(),
            name: name.into(),
        }
    }
}

pub struct ByListName(pub String);

impl Selector for ByListName {}
impl SelectBy<ByListName> for PriceList {}

pub trait PriceListRepository:
    Repository<PriceList, Error = anyhow::Error>
    + Save<PriceList>
    + Select<PriceList, ByListName>
    + Send
    + Sync
{
}

#[derive(Clone, Debug, PartialEq, Id)]
#[Id(ref_id, get_id)]
pub struct PriceListEntry {
    #[id]
    pub id: Uuid,
    pub price_list_id: IdentityOf<PriceList>,
    pub variation_id: IdentityOf<Variation>,
    /// Normalized, so `10` and `10.00` address the same tier.
    pub quantity: Decimal,
    pub price: Price,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl PriceListEntry {
    pub fn new(
        price_list_id: IdentityOf<PriceList>,
        variation_id: IdentityOf<Variation>,
        quantity: Decimal,
        price: Price,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: crate::random_id(),
            price_list_id,
            variation_id,
            quantity: quantity.normalize(),
            price,
            created_at: now,
            updated_at: now,
        }
    }
}

pub struct ByTier {
    pub price_list: IdentityOf<PriceList>,
    pub variation: IdentityOf<Variation>,
    pub quantity: Decimal,
}

pub struct ByVariation(pub IdentityOf<Variation>);

impl Selector for ByTier {}
impl Selector for ByVariation {}
impl SelectBy<ByTier> for PriceListEntry {}
impl SelectBy<ByVariation> for PriceListEntry {}

#[async_trait]
pub trait PriceListEntryRepository:
    Repository<PriceListEntry, Error = anyhow::Error>
    + Save<PriceListEntry>
    + Select<PriceListEntry, ByTier>
    + Send
    + Sync
{
    async fn clear(&self) -> Result<(), Self::Error>;
}
