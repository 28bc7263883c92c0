use async_trait::async_trait;
use catalog_types::attribute::{AttributeKind, AttributeValue, AttributeValueRepository};
use catalog_types::ByName;
use rusqlite::params;
use rusqlite::types::Type;
use tokio_rusqlite::Connection;
use typesafe_repository::async_ops::{Get, Save, Select};
use typesafe_repository::prelude::*;
use typesafe_repository::IdentityOf;

pub struct SqliteAttributeValueRepository {
    conn: Connection,
}

impl SqliteAttributeValueRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS attribute_value (
                    id BLOB PRIMARY KEY,
                    kind TEXT NOT NULL,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL
                )",
                [],
            )?;
            conn.execute(
                "CREATE INDEX IF NOT EXISTS attribute_value_name ON attribute_value (kind, name)",
                [],
            )?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }
}

fn row_to_attribute(row: &rusqlite::Row<'_>) -> rusqlite::Result<AttributeValue> {
    let kind = row.get::<_, String>(1)?;
    let kind = AttributeKind::from_str(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            Type::Text,
            format!("Unknown attribute {kind}").into(),
        )
    })?;
    Ok(AttributeValue {
        id: row.get(0)?,
        kind,
        name: row.get(2)?,
        created_at: row.get(3)?,
    })
}

impl Repository<AttributeValue> for SqliteAttributeValueRepository {
    type Error = anyhow::Error;
}

#[async_trait]
impl Save<AttributeValue> for SqliteAttributeValueRepository {
    async fn save(&self, a: AttributeValue) -> Result<(), Self::Error> {
        Ok(self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO attribute_value (id, kind, name, created_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET kind=?2, name=?3",
                    params![a.id, a.kind.as_str(), a.name, a.created_at],
                )?;
                Ok(())
            })
            .await?)
    }
}

#[async_trait]
impl Get<AttributeValue> for SqliteAttributeValueRepository {
    async fn get_one(
        &self,
        id: &IdentityOf<AttributeValue>,
    ) -> Result<Option<AttributeValue>, Self::Error> {
        let id = *id;
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, kind, name, created_at FROM attribute_value WHERE id = ?1",
                )?;
                let mut rows = stmt.query([id])?;
                let row = match rows.next()? {
                    Some(r) => r,
                    None => return Ok(None),
                };
                Ok(Some(row_to_attribute(row)?))
            })
            .await?)
    }
}

#[async_trait]
impl Select<AttributeValue, ByName<AttributeKind>> for SqliteAttributeValueRepository {
    async fn select(
        &self,
        ByName(kind, name): &ByName<AttributeKind>,
    ) -> Result<Vec<AttributeValue>, Self::Error> {
        let kind = kind.as_str();
        let name = name.clone();
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, kind, name, created_at FROM attribute_value
                     WHERE kind = ?1 AND name = ?2 ORDER BY rowid",
                )?;
                let items = stmt
                    .query_map(params![kind, name], row_to_attribute)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?)
    }
}

impl AttributeValueRepository for SqliteAttributeValueRepository {}
