use crate::config::ImportConfig;
use crate::error::RowError;
use crate::reconcile::{reconcile_product, Change, ReferenceResolver, TierChanges};
use crate::row::{ImportRow, RowData};
use crate::store::Catalog;
use catalog_types::price_list::{ByListName, PriceList};
use catalog_types::Transactional;
use log_error::LogError;
use serde::Serialize;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// What one successfully applied row changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowReport {
    pub custom_product_id: Option<String>,
    pub sku: String,
    pub product: Option<Change>,
    pub variation: Option<Change>,
    pub tiers: TierChanges,
    pub references_created: usize,
    pub encoding_repairs: usize,
}

#[derive(Debug)]
pub struct RowOutcome {
    /// Position in the submitted batch.
    pub index: usize,
    pub result: Result<RowReport, RowError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    pub index: usize,
    pub kind: &'static str,
    pub reason: String,
    pub retryable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub rows_ok: usize,
    pub rows_failed: usize,
    pub products_created: usize,
    pub products_updated: usize,
    pub variations_created: usize,
    pub variations_updated: usize,
    pub tiers: TierChanges,
    pub references_created: usize,
    pub encoding_repairs: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: &RowOutcome) {
        let report = match &outcome.result {
            Ok(report) => report,
            Err(_) => {
                self.rows_failed += 1;
                return;
            }
        };
        self.rows_ok += 1;
        match report.product {
            Some(Change::Created) => self.products_created += 1,
            Some(Change::Updated) => self.products_updated += 1,
            None => (),
        }
        match report.variation {
            Some(Change::Created) => self.variations_created += 1,
            Some(Change::Updated) => self.variations_updated += 1,
            None => (),
        }
        self.tiers.add(report.tiers);
        self.references_created += report.references_created;
        self.encoding_repairs += report.encoding_repairs;
    }

    pub fn merge(&mut self, other: &BatchSummary) {
        self.rows_ok += other.rows_ok;
        self.rows_failed += other.rows_failed;
        self.products_created += other.products_created;
        self.products_updated += other.products_updated;
        self.variations_created += other.variations_created;
        self.variations_updated += other.variations_updated;
        self.tiers.add(other.tiers);
        self.references_created += other.references_created;
        self.encoding_repairs += other.encoding_repairs;
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows applied, {} failed; products {} created / {} updated; \
             variations {} created / {} updated; tiers {} created / {} updated / {} unchanged; \
             {} references created; {} fields re-encoded",
            self.rows_ok,
            self.rows_failed,
            self.products_created,
            self.products_updated,
            self.variations_created,
            self.variations_updated,
            self.tiers.created,
            self.tiers.updated,
            self.tiers.unchanged,
            self.references_created,
            self.encoding_repairs,
        )
    }
}

#[derive(Debug, Default)]
pub struct BatchResult {
    pub outcomes: Vec<RowOutcome>,
    pub summary: BatchSummary,
    pub cancelled: bool,
}

impl BatchResult {
    pub(crate) fn push(&mut self, index: usize, result: Result<RowReport, RowError>) {
        match &result {
            Ok(report) => log::debug!("Row {index} ({}) applied", report.sku),
            Err(err) => log::warn!("Row {index} rejected: {err}"),
        }
        let outcome = RowOutcome { index, result };
        self.summary.record(&outcome);
        self.outcomes.push(outcome);
    }

    /// Marks every row from `from` on as not attempted.
    pub(crate) fn cancel_from(&mut self, from: usize, total: usize) {
        if from < total {
            log::warn!("Import cancelled, {} rows not attempted", total - from);
        }
        self.cancelled = true;
        for index in from..total {
            let outcome = RowOutcome {
                index,
                result: Err(RowError::Cancelled),
            };
            self.summary.record(&outcome);
            self.outcomes.push(outcome);
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = (usize, &RowError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.index, e)))
    }

    /// Rows the caller may resubmit as they are.
    pub fn retryable_rows(&self) -> Vec<usize> {
        self.errors()
            .filter(|(_, e)| e.is_retryable())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn failures(&self) -> Vec<RowFailure> {
        self.errors()
            .map(|(index, e)| RowFailure {
                index,
                kind: e.kind(),
                reason: e.to_string(),
                retryable: e.is_retryable(),
            })
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.summary.rows_failed == 0
    }
}

/// Commits on success, rolls back otherwise.
pub(crate) async fn finish<T>(
    transactions: &dyn Transactional,
    result: Result<T, RowError>,
) -> Result<T, RowError> {
    match result {
        Ok(v) => match transactions.commit().await {
            Ok(()) => Ok(v),
            Err(err) => {
                transactions
                    .rollback()
                    .await
                    .log_error("Unable to roll back after failed commit");
                Err(RowError::PersistenceFailure {
                    entity: "transaction",
                    error: err,
                })
            }
        },
        Err(err) => {
            transactions
                .rollback()
                .await
                .log_error("Unable to roll back row");
            Err(err)
        }
    }
}

/// Get-or-create for the price list all tiers are written to.
pub async fn price_list(catalog: &Catalog, name: &str) -> Result<PriceList, RowError> {
    let found = catalog
        .price_lists
        .select(&ByListName(name.to_string()))
        .await
        .map_err(RowError::resolution(format!("price list {name}")))?;
    if let Some(list) = found.into_iter().next() {
        return Ok(list);
    }
    let list = PriceList::new(name);
    catalog
        .price_lists
        .save(list.clone())
        .await
        .map_err(RowError::resolution(format!("price list {name}")))?;
    log::info!("Created price list {name}");
    Ok(list)
}

async fn import_row(
    catalog: &Catalog,
    config: &ImportConfig,
    price_list: &PriceList,
    row: &ImportRow,
) -> Result<RowReport, RowError> {
    let data = RowData::parse(row)?;
    catalog
        .transactions
        .begin()
        .await
        .map_err(RowError::persistence("transaction"))?;
    let mut resolver = ReferenceResolver::new(catalog);
    let res = reconcile_product(
        catalog,
        &mut resolver,
        price_list,
        &config.currency,
        &config.store_context(),
        &data,
    )
    .await;
    let outcome = finish(catalog.transactions.as_ref(), res).await?;
    Ok(RowReport {
        custom_product_id: Some(data.custom_product_id),
        sku: data.sku,
        product: Some(outcome.change),
        variation: Some(outcome.variation.change),
        tiers: outcome.variation.tiers,
        references_created: resolver.created(),
        encoding_repairs: data.encoding_repairs,
    })
}

/// Reconciles `rows` in order, one transaction per row. A failing row is
/// recorded and the batch goes on; cancellation stops between rows.
pub async fn import_batch(
    catalog: &Catalog,
    config: &ImportConfig,
    rows: Vec<ImportRow>,
    token: &CancellationToken,
) -> BatchResult {
    let mut result = BatchResult::default();
    let total = rows.len();
    let price_list = match price_list(catalog, &config.price_list).await {
        Ok(list) => list,
        Err(err) => {
            log::error!("Unable to prepare batch: {err}");
            let reason = err.to_string();
            for index in 0..total {
                result.push(
                    index,
                    Err(RowError::ReferenceResolutionFailure {
                        reference: format!("price list {}", config.price_list),
                        error: anyhow::anyhow!("{reason}"),
                    }),
                );
            }
            return result;
        }
    };
    for (index, row) in rows.iter().enumerate() {
        if token.is_cancelled() {
            result.cancel_from(index, total);
            break;
        }
        let res = import_row(catalog, config, &price_list, row).await;
        result.push(index, res);
    }
    log::info!("Batch of {total}: {}", result.summary);
    result
}
