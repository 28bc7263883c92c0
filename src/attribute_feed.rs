use crate::error::RowError;
use crate::importer::{finish, BatchResult, RowReport};
use crate::reconcile::{Change, ReferenceResolver};
use crate::row::{AttributeField, FieldReader, ImportRow};
use crate::store::Catalog;
use catalog_types::attribute::AttributeKind;
use catalog_types::variation::BySku;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

/// Row of the format/material feed. Image columns are not read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRow {
    pub custom_product_id: Option<String>,
    pub sku: String,
    pub format: AttributeField,
    pub material: AttributeField,
    pub encoding_repairs: usize,
}

impl AttributeRow {
    pub fn parse(row: &ImportRow) -> Result<Self, RowError> {
        let mut r = FieldReader::new(row);
        let sku = r.required("sku")?;
        let mut parsed = AttributeRow {
            custom_product_id: r.text("custom_product_id"),
            sku,
            format: r.attribute("format"),
            material: r.attribute("material_thickness"),
            encoding_repairs: 0,
        };
        parsed.encoding_repairs = r.repaired();
        Ok(parsed)
    }
}

async fn apply_row(catalog: &Catalog, row: &ImportRow) -> Result<RowReport, RowError> {
    let data = AttributeRow::parse(row)?;
    catalog
        .transactions
        .begin()
        .await
        .map_err(RowError::persistence("transaction"))?;
    let mut resolver = ReferenceResolver::new(catalog);
    let res = async {
        let mut variation = catalog
            .variations
            .select(&BySku(data.sku.clone()))
            .await
            .map_err(RowError::persistence("variation"))?
            .into_iter()
            .next()
            .ok_or_else(|| RowError::UnknownSku {
                sku: data.sku.clone(),
            })?;
        variation.format = resolver
            .attribute_field(AttributeKind::SelectFormat, &data.format, variation.format)
            .await?;
        variation.material = resolver
            .attribute_field(
                AttributeKind::SelectMaterials,
                &data.material,
                variation.material,
            )
            .await?;
        variation.updated_at = OffsetDateTime::now_utc();
        catalog
            .variations
            .save(variation)
            .await
            .map_err(RowError::persistence("variation"))
    }
    .await;
    finish(catalog.transactions.as_ref(), res).await?;
    Ok(RowReport {
        custom_product_id: data.custom_product_id,
        sku: data.sku,
        product: None,
        variation: Some(Change::Updated),
        references_created: resolver.created(),
        encoding_repairs: data.encoding_repairs,
        ..Default::default()
    })
}

/// Sets format and material-thickness references on variations found by
/// SKU anywhere in the catalog. Same per-row semantics as the catalog feed.
pub async fn import_attributes(
    catalog: &Catalog,
    rows: Vec<ImportRow>,
    token: &CancellationToken,
) -> BatchResult {
    let mut result = BatchResult::default();
    let total = rows.len();
    for (index, row) in rows.iter().enumerate() {
        if token.is_cancelled() {
            result.cancel_from(index, total);
            break;
        }
        let res = apply_row(catalog, row).await;
        result.push(index, res);
    }
    log::info!("Attribute batch of {total}: {}", result.summary);
    result
}
