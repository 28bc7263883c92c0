use async_trait::async_trait;
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use typesafe_repository::Selector;
use uuid::Uuid;

pub mod attribute;
pub mod price_list;
pub mod product;
pub mod taxonomy;
pub mod variation;

pub const DEFAULT_CURRENCY: &str = "EUR";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[repr(u8)]
pub enum Availability {
    #[display("Out of stock")]
    NotAvailable = 0,
    #[display("In stock")]
    Available = 1,
}

impl From<u8> for Availability {
    fn from(a: u8) -> Self {
        match a {
            0 => Self::NotAvailable,
            _ => Self::Available,
        }
    }
}

impl From<bool> for Availability {
    fn from(in_stock: bool) -> Self {
        if in_stock {
            Self::Available
        } else {
            Self::NotAvailable
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{amount} {currency}")]
pub struct Price {
    pub amount: Decimal,
    pub currency: String,
}

impl Price {
    pub fn new<S: Into<String>>(amount: Decimal, currency: S) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    /// Numeric comparison, so `19.99 EUR` equals `19.990 EUR`.
    pub fn same_as(&self, amount: Decimal, currency: &str) -> bool {
        self.amount == amount && self.currency == currency
    }
}

/// Lookup of a named entity inside a scope (vocabulary, attribute category).
pub struct ByName<S>(pub S, pub String);

impl<S> Selector for ByName<S> {}

pub fn random_id() -> Uuid {
    Uuid::new_v4()
}

/// Unit of work spanning every store that shares the same backing connection.
#[async_trait]
pub trait Transactional: Send + Sync {
    async fn begin(&self) -> Result<(), anyhow::Error>;
    async fn commit(&self) -> Result<(), anyhow::Error>;
    async fn rollback(&self) -> Result<(), anyhow::Error>;
}
