use crate::ByName;
use derive_more::Display;
use time::OffsetDateTime;
use typesafe_repository::async_ops::{Save, Select};
use typesafe_repository::macros::Id;
use typesafe_repository::prelude::*;
use typesafe_repository::SelectBy;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum Vocabulary {
    #[display("brands")]
    Brands,
    /// Product categories.
    #[display("product")]
    Product,
}

impl Vocabulary {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vocabulary::Brands => "brands",
            Vocabulary::Product => "product",
        }
    }
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "brands" => Some(Vocabulary::Brands),
            "product" => Some(Vocabulary::Product),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Id)]
#[Id(ref_id, get_id)]
pub struct Term {
    #[id]
    pub id: Uuid,
    pub vocabulary: Vocabulary,
    pub name: String,
    pub created_at: OffsetDateTime,
}

impl Term {
    pub fn new<S: Into<String>>(vocabulary: Vocabulary, name: S) -> Self {
        Self {
            id: crate::random_id(),
            vocabulary,
            name: name.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

impl SelectBy<ByName<Vocabulary>> for Term {}

/// Terms come back in creation order.
pub trait TermRepository:
    Repository<Term, Error = anyhow::Error>
    + Save<Term>
    + Select<Term, ByName<Vocabulary>>
    + Send
    + Sync
{
}
