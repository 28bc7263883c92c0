use anyhow::Context as AnyhowContext;
use async_trait::async_trait;
use catalog_types::attribute::AttributeValueRepository;
use catalog_types::price_list::{PriceListEntryRepository, PriceListRepository};
use catalog_types::product::ProductRepository;
use catalog_types::taxonomy::TermRepository;
use catalog_types::variation::VariationRepository;
use catalog_types::Transactional;
use log_error::LogError;
use rusqlite::types::Type;
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Arc;
use tokio_rusqlite::Connection;

pub mod attribute;
pub mod price_list;
pub mod product;
pub mod taxonomy;
pub mod variation;

pub use attribute::SqliteAttributeValueRepository;
pub use price_list::{SqlitePriceListEntryRepository, SqlitePriceListRepository};
pub use product::SqliteProductRepository;
pub use taxonomy::SqliteTermRepository;
pub use variation::SqliteVariationRepository;

/// Every store the reconcilers work with. All of them share one connection,
/// so a transaction opened through `transactions` covers each of them.
#[derive(Clone)]
pub struct Catalog {
    pub products: Arc<dyn ProductRepository>,
    pub variations: Arc<dyn VariationRepository>,
    pub terms: Arc<dyn TermRepository>,
    pub attributes: Arc<dyn AttributeValueRepository>,
    pub price_lists: Arc<dyn PriceListRepository>,
    pub price_list_entries: Arc<dyn PriceListEntryRepository>,
    pub transactions: Arc<dyn Transactional>,
}

impl Catalog {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Unable to create {}", dir.display()))?;
        }
        let conn = Connection::open(path)
            .await
            .with_context(|| format!("Unable to open catalog {}", path.display()))?;
        Self::sqlite(conn).await
    }

    pub async fn sqlite(conn: Connection) -> Result<Self, anyhow::Error> {
        Ok(Self {
            products: Arc::new(SqliteProductRepository::init(conn.clone()).await?),
            variations: Arc::new(SqliteVariationRepository::init(conn.clone()).await?),
            terms: Arc::new(SqliteTermRepository::init(conn.clone()).await?),
            attributes: Arc::new(SqliteAttributeValueRepository::init(conn.clone()).await?),
            price_lists: Arc::new(SqlitePriceListRepository::init(conn.clone()).await?),
            price_list_entries: Arc::new(SqlitePriceListEntryRepository::init(conn.clone()).await?),
            transactions: Arc::new(SqliteTransactions::new(conn)),
        })
    }

    /// Removes every product with its variations and price tiers and returns
    /// how many products were removed. Terms, attribute values and price
    /// lists stay.
    pub async fn purge(&self) -> Result<usize, anyhow::Error> {
        self.transactions.begin().await?;
        let res = async {
            let removed = self.products.list().await?.len();
            self.price_list_entries.clear().await?;
            self.variations.clear().await?;
            self.products.clear().await?;
            Ok::<_, anyhow::Error>(removed)
        }
        .await;
        match res {
            Ok(removed) => {
                self.transactions.commit().await?;
                Ok(removed)
            }
            Err(err) => {
                self.transactions
                    .rollback()
                    .await
                    .log_error("Unable to roll back purge");
                Err(err.context("Unable to purge catalog"))
            }
        }
    }
}

pub struct SqliteTransactions {
    conn: Connection,
}

impl SqliteTransactions {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    async fn execute(&self, sql: &'static str) -> Result<(), anyhow::Error> {
        Ok(self
            .conn
            .call(move |conn| {
                conn.execute_batch(sql)?;
                Ok(())
            })
            .await?)
    }
}

#[async_trait]
impl Transactional for SqliteTransactions {
    async fn begin(&self) -> Result<(), anyhow::Error> {
        self.execute("BEGIN IMMEDIATE").await
    }
    async fn commit(&self) -> Result<(), anyhow::Error> {
        self.execute("COMMIT").await
    }
    async fn rollback(&self) -> Result<(), anyhow::Error> {
        self.execute("ROLLBACK").await
    }
}

/// Decimals are stored as text to keep their exact value.
pub(crate) fn decimal_to_sql(d: &Decimal) -> String {
    d.normalize().to_string()
}

pub(crate) fn decimal_from_sql(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    raw.parse::<Decimal>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into()))
}

pub(crate) fn opt_decimal_from_sql(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<Decimal>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => decimal_from_sql(row, idx).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_types::product::{ByCustomId, Product, StoreContext};

    fn store() -> StoreContext {
        StoreContext {
            store_id: "1".to_string(),
            product_type: "default".to_string(),
        }
    }

    #[tokio::test]
    async fn rollback_discards_row_writes() -> Result<(), anyhow::Error> {
        let catalog = Catalog::sqlite(Connection::open_in_memory().await?).await?;
        catalog.transactions.begin().await?;
        catalog.products.save(Product::new("P1", store())).await?;
        catalog.transactions.rollback().await?;
        assert!(catalog
            .products
            .select(&ByCustomId("P1".to_string()))
            .await?
            .is_empty());

        catalog.transactions.begin().await?;
        catalog.products.save(Product::new("P2", store())).await?;
        catalog.transactions.commit().await?;
        assert_eq!(catalog.products.list().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn open_creates_parent_directory() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("storage").join("catalog.db");
        let catalog = Catalog::open(&path).await?;
        catalog.products.save(Product::new("P1", store())).await?;
        assert!(path.exists());
        Ok(())
    }
}
