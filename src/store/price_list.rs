use super::{decimal_from_sql, decimal_to_sql};
use async_trait::async_trait;
use catalog_types::price_list::{
    ByListName, ByTier, ByVariation, PriceList, PriceListEntry, PriceListEntryRepository,
    PriceListRepository,
};
use catalog_types::Price;
use rusqlite::params;
use tokio_rusqlite::Connection;
use typesafe_repository::async_ops::{Save, Select};
use typesafe_repository::prelude::*;

pub struct SqlitePriceListRepository {
    conn: Connection,
}

impl SqlitePriceListRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS price_list (
                    id BLOB PRIMARY KEY,
                    name TEXT NOT NULL
                )",
                [],
            )?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }
}

impl Repository<PriceList> for SqlitePriceListRepository {
    type Error = anyhow::Error;
}

#[async_trait]
impl Save<PriceList> for SqlitePriceListRepository {
    async fn save(&self, l: PriceList) -> Result<(), Self::Error> {
        Ok(self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO price_list (id, name) VALUES (?1, ?2)
                     ON CONFLICT(id) DO UPDATE SET name=?2",
                    params![l.id, l.name],
                )?;
                Ok(())
            })
            .await?)
    }
}

#[async_trait]
impl Select<PriceList, ByListName> for SqlitePriceListRepository {
    async fn select(&self, ByListName(name): &ByListName) -> Result<Vec<PriceList>, Self::Error> {
        let name = name.clone();
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT id, name FROM price_list WHERE name = ?1 ORDER BY rowid")?;
                let items = stmt
                    .query_map([name], |row| {
                        Ok(PriceList {
                            id: row.get(0)?,
                            name: row.get(1)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?)
    }
}

impl PriceListRepository for SqlitePriceListRepository {}

const ENTRY_COLUMNS: &str =
    "id, price_list_id, variation_id, quantity, price, currency, created_at, updated_at";

pub struct SqlitePriceListEntryRepository {
    conn: Connection,
}

impl SqlitePriceListEntryRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS price_list_item (
                    id BLOB PRIMARY KEY,
                    price_list_id BLOB NOT NULL,
                    variation_id BLOB NOT NULL,
                    quantity TEXT NOT NULL,
                    price TEXT NOT NULL,
                    currency TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )",
                [],
            )?;
            conn.execute(
                "CREATE INDEX IF NOT EXISTS price_list_item_tier
                    ON price_list_item (price_list_id, variation_id, quantity)",
                [],
            )?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<PriceListEntry> {
    Ok(PriceListEntry {
        id: row.get(0)?,
        price_list_id: row.get(1)?,
        variation_id: row.get(2)?,
        quantity: decimal_from_sql(row, 3)?,
        price: Price {
            amount: decimal_from_sql(row, 4)?,
            currency: row.get(5)?,
        },
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl Repository<PriceListEntry> for SqlitePriceListEntryRepository {
    type Error = anyhow::Error;
}

#[async_trait]
impl Save<PriceListEntry> for SqlitePriceListEntryRepository {
    async fn save(&self, e: PriceListEntry) -> Result<(), Self::Error> {
        Ok(self
            .conn
            .call(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO price_list_item ({ENTRY_COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                         ON CONFLICT(id) DO UPDATE SET price_list_id=?2, variation_id=?3,
                            quantity=?4, price=?5, currency=?6, updated_at=?8"
                    ),
                    params![
                        e.id,
                        e.price_list_id,
                        e.variation_id,
                        decimal_to_sql(&e.quantity),
                        decimal_to_sql(&e.price.amount),
                        e.price.currency,
                        e.created_at,
                        e.updated_at,
                    ],
                )?;
                Ok(())
            })
            .await?)
    }
}

#[async_trait]
impl Select<PriceListEntry, ByTier> for SqlitePriceListEntryRepository {
    async fn select(&self, tier: &ByTier) -> Result<Vec<PriceListEntry>, Self::Error> {
        let price_list = tier.price_list;
        let variation = tier.variation;
        let quantity = decimal_to_sql(&tier.quantity);
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM price_list_item
                     WHERE price_list_id = ?1 AND variation_id = ?2 AND quantity = ?3
                     ORDER BY rowid"
                ))?;
                let items = stmt
                    .query_map(params![price_list, variation, quantity], row_to_entry)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?)
    }
}

#[async_trait]
impl Select<PriceListEntry, ByVariation> for SqlitePriceListEntryRepository {
    async fn select(
        &self,
        ByVariation(variation): &ByVariation,
    ) -> Result<Vec<PriceListEntry>, Self::Error> {
        let variation = *variation;
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM price_list_item WHERE variation_id = ?1 ORDER BY rowid"
                ))?;
                let items = stmt
                    .query_map([variation], row_to_entry)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?)
    }
}

#[async_trait]
impl PriceListEntryRepository for SqlitePriceListEntryRepository {
    async fn clear(&self) -> Result<(), Self::Error> {
        Ok(self
            .conn
            .call(|conn| {
                conn.execute("DELETE FROM price_list_item", [])?;
                Ok(())
            })
            .await?)
    }
}
