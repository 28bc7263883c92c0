use super::{decimal_to_sql, opt_decimal_from_sql};
use async_trait::async_trait;
use catalog_types::product::{ByCustomId, Product, ProductRepository, StoreContext};
use catalog_types::variation::Variation;
use catalog_types::Availability;
use rusqlite::params;
use rusqlite::types::Type;
use tokio_rusqlite::Connection;
use typesafe_repository::async_ops::{Get, List, Save, Select};
use typesafe_repository::prelude::*;
use typesafe_repository::IdentityOf;
use uuid::Uuid;

const COLUMNS: &str = "id, custom_product_id, title, brand, category, article_group, merchandise_group, guise, weight, customs_tariff_number, available, store_id, product_type, variations, created_at, updated_at";

pub struct SqliteProductRepository {
    conn: Connection,
}

impl SqliteProductRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS product (
                    id BLOB PRIMARY KEY,
                    custom_product_id TEXT NOT NULL,
                    title TEXT NOT NULL DEFAULT '',
                    brand BLOB,
                    category BLOB,
                    article_group TEXT,
                    merchandise_group TEXT,
                    guise TEXT,
                    weight TEXT,
                    customs_tariff_number TEXT,
                    available INTEGER NOT NULL DEFAULT 0,
                    store_id TEXT NOT NULL,
                    product_type TEXT NOT NULL,
                    variations TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )",
                [],
            )?;
            conn.execute(
                "CREATE INDEX IF NOT EXISTS product_custom_id ON product (custom_product_id)",
                [],
            )?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }
}

fn variations_as_str(variations: &[IdentityOf<Variation>]) -> String {
    itertools::intersperse(variations.iter().map(Uuid::to_string), ",".to_string()).collect()
}

fn variations_from_str(idx: usize, s: &str) -> rusqlite::Result<Vec<IdentityOf<Variation>>> {
    s.split(',')
        .filter(|v| !v.is_empty())
        .map(|v| {
            Uuid::parse_str(v).map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
            })
        })
        .collect()
}

fn row_to_product(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        custom_product_id: row.get(1)?,
        title: row.get(2)?,
        brand: row.get(3)?,
        category: row.get(4)?,
        article_group: row.get(5)?,
        merchandise_group: row.get(6)?,
        guise: row.get(7)?,
        weight: opt_decimal_from_sql(row, 8)?,
        customs_tariff_number: row.get(9)?,
        available: Availability::from(row.get::<_, u8>(10)?),
        store: StoreContext {
            store_id: row.get(11)?,
            product_type: row.get(12)?,
        },
        variations: variations_from_str(13, &row.get::<_, String>(13)?)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

impl Repository<Product> for SqliteProductRepository {
    type Error = anyhow::Error;
}

#[async_trait]
impl Save<Product> for SqliteProductRepository {
    async fn save(&self, p: Product) -> Result<(), Self::Error> {
        Ok(self
            .conn
            .call(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO product ({COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                         ON CONFLICT(id) DO UPDATE SET custom_product_id=?2, title=?3, brand=?4, category=?5,
                            article_group=?6, merchandise_group=?7, guise=?8, weight=?9,
                            customs_tariff_number=?10, available=?11, store_id=?12, product_type=?13,
                            variations=?14, updated_at=?16"
                    ),
                    params![
                        p.id,
                        p.custom_product_id,
                        p.title,
                        p.brand,
                        p.category,
                        p.article_group,
                        p.merchandise_group,
                        p.guise,
                        p.weight.as_ref().map(decimal_to_sql),
                        p.customs_tariff_number,
                        p.available as u8,
                        p.store.store_id,
                        p.store.product_type,
                        variations_as_str(&p.variations),
                        p.created_at,
                        p.updated_at,
                    ],
                )?;
                Ok(())
            })
            .await?)
    }
}

#[async_trait]
impl Get<Product> for SqliteProductRepository {
    async fn get_one(&self, id: &IdentityOf<Product>) -> Result<Option<Product>, Self::Error> {
        let id = *id;
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT {COLUMNS} FROM product WHERE id = ?1"))?;
                let mut rows = stmt.query([id])?;
                let row = match rows.next()? {
                    Some(r) => r,
                    None => return Ok(None),
                };
                Ok(Some(row_to_product(row)?))
            })
            .await?)
    }
}

#[async_trait]
impl List<Product> for SqliteProductRepository {
    async fn list(&self) -> Result<Vec<Product>, Self::Error> {
        Ok(self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT {COLUMNS} FROM product ORDER BY rowid"))?;
                let items = stmt
                    .query_map([], row_to_product)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?)
    }
}

#[async_trait]
impl Select<Product, ByCustomId> for SqliteProductRepository {
    async fn select(
        &self,
        ByCustomId(custom_id): &ByCustomId,
    ) -> Result<Vec<Product>, Self::Error> {
        let custom_id = custom_id.clone();
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM product WHERE custom_product_id = ?1 ORDER BY rowid"
                ))?;
                let items = stmt
                    .query_map([custom_id], row_to_product)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?)
    }
}

#[async_trait]
impl ProductRepository for SqliteProductRepository {
    async fn clear(&self) -> Result<(), Self::Error> {
        Ok(self
            .conn
            .call(|conn| {
                conn.execute("DELETE FROM product", [])?;
                Ok(())
            })
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn store() -> StoreContext {
        StoreContext {
            store_id: "1".to_string(),
            product_type: "default".to_string(),
        }
    }

    #[tokio::test]
    async fn saves_and_loads_product() -> Result<(), anyhow::Error> {
        let repo = SqliteProductRepository::init(Connection::open_in_memory().await?).await?;
        let mut p = Product::new("P100", store());
        p.title = "Lamp".to_string();
        p.weight = Some(dec!(1.250));
        p.available = Availability::Available;
        p.attach(Uuid::new_v4());
        p.attach(Uuid::new_v4());
        repo.save(p.clone()).await?;

        let loaded = repo.get_one(&p.id).await?.expect("product saved");
        assert_eq!(loaded.title, "Lamp");
        assert_eq!(loaded.weight, Some(dec!(1.25)));
        assert_eq!(loaded.available, Availability::Available);
        assert_eq!(loaded.variations, p.variations);
        assert_eq!(loaded.store, store());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_custom_ids_come_back_in_creation_order() -> Result<(), anyhow::Error> {
        let repo = SqliteProductRepository::init(Connection::open_in_memory().await?).await?;
        let first = Product::new("P1", store());
        let second = Product::new("P1", store());
        repo.save(first.clone()).await?;
        repo.save(second.clone()).await?;
        repo.save(first.clone()).await?;
        let found = repo.select(&ByCustomId("P1".to_string())).await?;
        assert_eq!(
            found.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
        assert!(repo.select(&ByCustomId("p1".to_string())).await?.is_empty());
        Ok(())
    }
}
