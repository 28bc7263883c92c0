use super::{decimal_from_sql, decimal_to_sql, opt_decimal_from_sql};
use async_trait::async_trait;
use catalog_types::variation::{BySku, Variation, VariationRepository, VariationStatus};
use catalog_types::Price;
use rusqlite::params;
use tokio_rusqlite::Connection;
use typesafe_repository::async_ops::{Get, Save, Select};
use typesafe_repository::prelude::*;
use typesafe_repository::IdentityOf;

const COLUMNS: &str = "id, product_id, sku, title, price, currency, color, format, material, stock_level, status, created_at, updated_at";

pub struct SqliteVariationRepository {
    conn: Connection,
}

impl SqliteVariationRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS variation (
                    id BLOB PRIMARY KEY,
                    product_id BLOB NOT NULL,
                    sku TEXT NOT NULL,
                    title TEXT NOT NULL DEFAULT '',
                    price TEXT,
                    currency TEXT,
                    color BLOB,
                    format BLOB,
                    material BLOB,
                    stock_level TEXT,
                    status TEXT NOT NULL DEFAULT 'active',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )",
                [],
            )?;
            conn.execute(
                "CREATE INDEX IF NOT EXISTS variation_sku ON variation (sku)",
                [],
            )?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }
}

fn row_to_variation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Variation> {
    let price = match row.get::<_, Option<String>>(5)? {
        Some(currency) if row.get::<_, Option<String>>(4)?.is_some() => Some(Price {
            amount: decimal_from_sql(row, 4)?,
            currency,
        }),
        _ => None,
    };
    Ok(Variation {
        id: row.get(0)?,
        product_id: row.get(1)?,
        sku: row.get(2)?,
        title: row.get(3)?,
        price,
        color: row.get(6)?,
        format: row.get(7)?,
        material: row.get(8)?,
        stock_level: opt_decimal_from_sql(row, 9)?,
        status: VariationStatus::from_str(row.get::<_, String>(10)?.as_str()),
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

impl Repository<Variation> for SqliteVariationRepository {
    type Error = anyhow::Error;
}

#[async_trait]
impl Save<Variation> for SqliteVariationRepository {
    async fn save(&self, v: Variation) -> Result<(), Self::Error> {
        Ok(self
            .conn
            .call(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO variation ({COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                         ON CONFLICT(id) DO UPDATE SET product_id=?2, sku=?3, title=?4, price=?5,
                            currency=?6, color=?7, format=?8, material=?9, stock_level=?10,
                            status=?11, updated_at=?13"
                    ),
                    params![
                        v.id,
                        v.product_id,
                        v.sku,
                        v.title,
                        v.price.as_ref().map(|p| decimal_to_sql(&p.amount)),
                        v.price.as_ref().map(|p| p.currency.clone()),
                        v.color,
                        v.format,
                        v.material,
                        v.stock_level.as_ref().map(decimal_to_sql),
                        v.status.as_str(),
                        v.created_at,
                        v.updated_at,
                    ],
                )?;
                Ok(())
            })
            .await?)
    }
}

#[async_trait]
impl Get<Variation> for SqliteVariationRepository {
    async fn get_one(&self, id: &IdentityOf<Variation>) -> Result<Option<Variation>, Self::Error> {
        let id = *id;
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT {COLUMNS} FROM variation WHERE id = ?1"))?;
                let mut rows = stmt.query([id])?;
                let row = match rows.next()? {
                    Some(r) => r,
                    None => return Ok(None),
                };
                Ok(Some(row_to_variation(row)?))
            })
            .await?)
    }
}

#[async_trait]
impl Select<Variation, BySku> for SqliteVariationRepository {
    async fn select(&self, BySku(sku): &BySku) -> Result<Vec<Variation>, Self::Error> {
        let sku = sku.clone();
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM variation WHERE sku = ?1 ORDER BY rowid"
                ))?;
                let items = stmt
                    .query_map([sku], row_to_variation)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?)
    }
}

#[async_trait]
impl VariationRepository for SqliteVariationRepository {
    async fn clear(&self) -> Result<(), Self::Error> {
        Ok(self
            .conn
            .call(|conn| {
                conn.execute("DELETE FROM variation", [])?;
                Ok(())
            })
            .await?)
    }
}
