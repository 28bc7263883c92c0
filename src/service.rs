use crate::attribute_feed::import_attributes;
use crate::config::ImportConfig;
use crate::importer::{import_batch, BatchResult, BatchSummary};
use crate::row::ImportRow;
use crate::store::Catalog;
use actix::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Owns the catalog and applies one batch at a time, so reconciliations
/// never interleave.
pub struct ImportService {
    catalog: Catalog,
    config: Arc<ImportConfig>,
    token: CancellationToken,
    report: Report,
}

impl ImportService {
    pub fn new(catalog: Catalog, config: ImportConfig, token: CancellationToken) -> Self {
        Self {
            catalog,
            config: Arc::new(config),
            token,
            report: Report::default(),
        }
    }

    fn record(&mut self, res: &BatchResult) {
        self.report.batches += 1;
        self.report.summary.merge(&res.summary);
        self.report.cancelled |= res.cancelled;
    }
}

impl Actor for ImportService {
    type Context = Context<Self>;
}

/// Running totals since the service started.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub batches: usize,
    pub summary: BatchSummary,
    pub cancelled: bool,
}

#[derive(Message)]
#[rtype(result = "BatchResult")]
pub struct ImportBatch(pub Vec<ImportRow>);

#[derive(Message)]
#[rtype(result = "BatchResult")]
pub struct ImportAttributes(pub Vec<ImportRow>);

#[derive(Message)]
#[rtype(result = "Report")]
pub struct GetReport;

#[derive(Message)]
#[rtype(result = "Result<usize, anyhow::Error>")]
pub struct Purge;

impl Handler<ImportBatch> for ImportService {
    type Result = AtomicResponse<Self, BatchResult>;

    fn handle(&mut self, ImportBatch(rows): ImportBatch, _: &mut Self::Context) -> Self::Result {
        let catalog = self.catalog.clone();
        let config = self.config.clone();
        let token = self.token.clone();
        AtomicResponse::new(Box::pin(
            async move { import_batch(&catalog, &config, rows, &token).await }
                .into_actor(self)
                .map(|res, act, _| {
                    act.record(&res);
                    res
                }),
        ))
    }
}

impl Handler<ImportAttributes> for ImportService {
    type Result = AtomicResponse<Self, BatchResult>;

    fn handle(
        &mut self,
        ImportAttributes(rows): ImportAttributes,
        _: &mut Self::Context,
    ) -> Self::Result {
        let catalog = self.catalog.clone();
        let token = self.token.clone();
        AtomicResponse::new(Box::pin(
            async move { import_attributes(&catalog, rows, &token).await }
                .into_actor(self)
                .map(|res, act, _| {
                    act.record(&res);
                    res
                }),
        ))
    }
}

impl Handler<GetReport> for ImportService {
    type Result = MessageResult<GetReport>;

    fn handle(&mut self, _: GetReport, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.report.clone())
    }
}

impl Handler<Purge> for ImportService {
    type Result = AtomicResponse<Self, Result<usize, anyhow::Error>>;

    fn handle(&mut self, _: Purge, _: &mut Self::Context) -> Self::Result {
        let catalog = self.catalog.clone();
        AtomicResponse::new(Box::pin(
            async move { catalog.purge().await }.into_actor(self),
        ))
    }
}
