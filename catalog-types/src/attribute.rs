use crate::ByName;
use derive_more::Display;
use time::OffsetDateTime;
use typesafe_repository::async_ops::{Get, Save, Select};
use typesafe_repository::macros::Id;
use typesafe_repository::prelude::*;
use typesafe_repository::SelectBy;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum AttributeKind {
    #[display("color")]
    Color,
    #[display("select_format")]
    SelectFormat,
    #[display("select_materials")]
    SelectMaterials,
}

impl AttributeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeKind::Color => "color",
            AttributeKind::SelectFormat => "select_format",
            AttributeKind::SelectMaterials => "select_materials",
        }
    }
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "color" => Some(AttributeKind::Color),
            "select_format" => Some(AttributeKind::SelectFormat),
            "select_materials" => Some(AttributeKind::SelectMaterials),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Id)]
#[Id(ref_id, get_id)]
pub struct AttributeValue {
    #[id]
    pub id: Uuid,
    pub kind: AttributeKind,
    pub name: String,
    pub created_at: OffsetDateTime,
}

impl AttributeValue {
    pub fn new<S: Into<String>>(kind: AttributeKind, name: S) -> Self {
        Self {
            id: crate::random_id(),
            kind,
            name: name.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

impl SelectBy<ByName<AttributeKind>> for AttributeValue {}

pub trait AttributeValueRepository:
    Repository<AttributeValue, Error = anyhow::Error>
    + Save<AttributeValue>
    + Get<AttributeValue>
    + Select<AttributeValue, ByName<AttributeKind>>
    + Send
    + Sync
{
}
