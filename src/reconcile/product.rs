use super::resolver::ReferenceResolver;
use super::variation::{reconcile_variation, VariationOutcome};
use super::Change;
use crate::error::RowError;
use crate::row::RowData;
use crate::store::Catalog;
use catalog_types::price_list::PriceList;
use catalog_types::product::{ByCustomId, Product, StoreContext};
use catalog_types::taxonomy::{Term, Vocabulary};
use catalog_types::Availability;
use time::OffsetDateTime;
use typesafe_repository::IdentityOf;

#[derive(Debug, Clone)]
pub struct ProductOutcome {
    pub product: Product,
    pub change: Change,
    pub variation: VariationOutcome,
}

/// Applies the row's descriptive fields. A missing brand or customs tariff
/// number never clears the stored value; a missing category does.
pub fn merge_product(
    existing: Option<Product>,
    row: &RowData,
    brand: Option<IdentityOf<Term>>,
    category: Option<IdentityOf<Term>>,
    store: &StoreContext,
) -> (Product, Change) {
    let (mut product, change) = match existing {
        Some(p) => (p, Change::Updated),
        None => (
            Product::new(row.custom_product_id.clone(), store.clone()),
            Change::Created,
        ),
    };
    if let Some(title) = &row.product_title {
        product.title = title.clone();
    }
    if brand.is_some() {
        product.brand = brand;
    }
    product.category = category;
    product.article_group = row.article_group.clone();
    product.merchandise_group = row.merchandise_group.clone();
    product.guise = row.guise.as_ref().map(|g| g.to_lowercase());
    product.weight = row.weight;
    if let Some(tariff) = &row.customs_tariff_number {
        product.customs_tariff_number = Some(tariff.clone());
    }
    product.available = Availability::from(row.in_stock());
    (product, change)
}

/// Looks the product up by its custom id, merges the row into it (or creates
/// it), reconciles the row's variation and persists the product last.
pub async fn reconcile_product(
    catalog: &Catalog,
    resolver: &mut ReferenceResolver<'_>,
    price_list: &PriceList,
    currency: &str,
    store: &StoreContext,
    row: &RowData,
) -> Result<ProductOutcome, RowError> {
    let brand = match &row.brand {
        Some(name) => Some(resolver.term(Vocabulary::Brands, name).await?),
        None => None,
    };
    let category = match &row.category {
        Some(name) => Some(resolver.term(Vocabulary::Product, name).await?),
        None => None,
    };

    let mut found = catalog
        .products
        .select(&ByCustomId(row.custom_product_id.clone()))
        .await
        .map_err(RowError::persistence("product"))?;
    if found.len() > 1 {
        log::warn!(
            "{} products share custom id {}, using the oldest",
            found.len(),
            row.custom_product_id
        );
    }
    let existing = if found.is_empty() {
        None
    } else {
        Some(found.swap_remove(0))
    };

    let (mut product, change) = merge_product(existing, row, brand, category, store);
    let variation =
        reconcile_variation(catalog, resolver, price_list, currency, &mut product, row).await?;
    product.updated_at = OffsetDateTime::now_utc();
    catalog
        .products
        .save(product.clone())
        .await
        .map_err(RowError::persistence("product"))?;
    Ok(ProductOutcome {
        product,
        change,
        variation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::ImportRow;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn store() -> StoreContext {
        StoreContext {
            store_id: "1".to_string(),
            product_type: "default".to_string(),
        }
    }

    fn row(pairs: &[(&str, &str)]) -> RowData {
        let row: ImportRow = pairs.iter().copied().collect();
        RowData::parse(&row).expect("valid row")
    }

    #[test]
    fn new_product_gets_store_context() {
        let data = row(&[
            ("custom_product_id", "P100"),
            ("sku", "P100-RED"),
            ("product_title", "Lamp"),
            ("guise", "Matte BLACK"),
            ("weight (kg)", "1,5"),
            ("stock", "3"),
        ]);
        let brand = Some(Uuid::new_v4());
        let (p, change) = merge_product(None, &data, brand, None, &store());
        assert_eq!(change, Change::Created);
        assert_eq!(p.custom_product_id, "P100");
        assert_eq!(p.title, "Lamp");
        assert_eq!(p.brand, brand);
        assert_eq!(p.guise.as_deref(), Some("matte black"));
        assert_eq!(p.weight, Some(dec!(1.5)));
        assert_eq!(p.available, Availability::Available);
        assert_eq!(p.store, store());
    }

    #[test]
    fn update_keeps_brand_and_tariff_when_missing() {
        let mut existing = Product::new("P100", store());
        existing.brand = Some(Uuid::new_v4());
        existing.category = Some(Uuid::new_v4());
        existing.customs_tariff_number = Some("94052040".to_string());
        existing.available = Availability::Available;

        let data = row(&[
            ("custom_product_id", "P100"),
            ("sku", "P100-RED"),
            ("customs_tariff_number", ""),
            ("stock", "0"),
        ]);
        let (p, change) = merge_product(Some(existing.clone()), &data, None, None, &store());
        assert_eq!(change, Change::Updated);
        assert_eq!(p.id, existing.id);
        assert_eq!(p.brand, existing.brand);
        assert_eq!(p.customs_tariff_number.as_deref(), Some("94052040"));
        assert_eq!(p.category, None);
        assert_eq!(p.available, Availability::NotAvailable);
    }
}
