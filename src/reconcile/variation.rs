use super::price_tier::reconcile_tiers;
use super::resolver::ReferenceResolver;
use super::{Change, TierChanges};
use crate::error::RowError;
use crate::row::RowData;
use crate::store::Catalog;
use catalog_types::attribute::{AttributeKind, AttributeValue};
use catalog_types::price_list::PriceList;
use catalog_types::product::Product;
use catalog_types::variation::{find_by_sku, Variation};
use catalog_types::Price;
use time::OffsetDateTime;
use typesafe_repository::IdentityOf;

#[derive(Debug, Clone)]
pub struct VariationOutcome {
    pub variation: Variation,
    pub change: Change,
    pub tiers: TierChanges,
}

/// Attribute references after resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedAttributes {
    pub color: Option<IdentityOf<AttributeValue>>,
    pub format: Option<IdentityOf<AttributeValue>>,
    pub material: Option<IdentityOf<AttributeValue>>,
}

/// Applies the row to an existing variation or builds a new one owned by
/// `product_id`. Fields the row does not describe stay untouched.
pub fn merge_variation(
    existing: Option<Variation>,
    product_id: IdentityOf<Product>,
    row: &RowData,
    attributes: ResolvedAttributes,
    currency: &str,
) -> (Variation, Change) {
    let (mut variation, change) = match existing {
        Some(v) => (v, Change::Updated),
        None => (Variation::new(product_id, row.sku.clone()), Change::Created),
    };
    if let Some(title) = &row.variation_title {
        variation.title = title.clone();
    }
    variation.color = attributes.color;
    variation.format = attributes.format;
    variation.material = attributes.material;
    if let Some(price) = row.price {
        variation.price = Some(Price::new(price, currency));
    }
    if let Some(stock) = row.stock {
        variation.stock_level = Some(stock);
    }
    if change == Change::Updated {
        variation.updated_at = OffsetDateTime::now_utc();
    }
    (variation, change)
}

async fn owned_variations(
    catalog: &Catalog,
    product: &Product,
) -> Result<Vec<Variation>, RowError> {
    let mut variations = Vec::with_capacity(product.variations.len());
    for id in &product.variations {
        match catalog
            .variations
            .get_one(id)
            .await
            .map_err(RowError::persistence("variation"))?
        {
            Some(v) => variations.push(v),
            None => log::warn!(
                "Product {} links missing variation {id}",
                product.custom_product_id
            ),
        }
    }
    Ok(variations)
}

/// Finds the row's SKU among `product`'s own variations and updates it, or
/// creates a new variation and attaches it to `product`. The caller persists
/// `product` afterwards.
pub async fn reconcile_variation(
    catalog: &Catalog,
    resolver: &mut ReferenceResolver<'_>,
    price_list: &PriceList,
    currency: &str,
    product: &mut Product,
    row: &RowData,
) -> Result<VariationOutcome, RowError> {
    let variations = owned_variations(catalog, product).await?;
    let existing = find_by_sku(&variations, &row.sku).cloned();
    let current = existing
        .as_ref()
        .map(|v| ResolvedAttributes {
            color: v.color,
            format: v.format,
            material: v.material,
        })
        .unwrap_or_default();
    let attributes = ResolvedAttributes {
        color: resolver
            .attribute_field(AttributeKind::Color, &row.color, current.color)
            .await?,
        format: resolver
            .attribute_field(AttributeKind::SelectFormat, &row.format, current.format)
            .await?,
        material: resolver
            .attribute_field(AttributeKind::SelectMaterials, &row.material, current.material)
            .await?,
    };

    let (variation, change) = merge_variation(existing, product.id, row, attributes, currency);
    catalog
        .variations
        .save(variation.clone())
        .await
        .map_err(RowError::persistence("variation"))?;
    if change == Change::Created {
        product.attach(variation.id);
    }

    let tiers = reconcile_tiers(
        catalog.price_list_entries.as_ref(),
        price_list,
        variation.id,
        &row.tiers,
        currency,
    )
    .await?;
    Ok(VariationOutcome {
        variation,
        change,
        tiers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::ImportRow;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn row(pairs: &[(&str, &str)]) -> RowData {
        let row: ImportRow = pairs.iter().copied().collect();
        RowData::parse(&row).expect("valid row")
    }

    #[test]
    fn new_variation_takes_row_values() {
        let product = Uuid::new_v4();
        let color = Some(Uuid::new_v4());
        let data = row(&[
            ("custom_product_id", "P100"),
            ("sku", "P100-RED"),
            ("variation_title", "Lamp red"),
            ("price", "19.99"),
            ("stock", "4"),
        ]);
        let attributes = ResolvedAttributes {
            color,
            ..Default::default()
        };
        let (v, change) = merge_variation(None, product, &data, attributes, "EUR");
        assert_eq!(change, Change::Created);
        assert_eq!(v.product_id, product);
        assert_eq!(v.sku, "P100-RED");
        assert_eq!(v.title, "Lamp red");
        assert_eq!(v.color, color);
        assert_eq!(v.price, Some(Price::new(dec!(19.99), "EUR")));
        assert_eq!(v.stock_level, Some(dec!(4)));
    }

    #[test]
    fn update_clears_references_but_keeps_missing_values() {
        let product = Uuid::new_v4();
        let mut existing = Variation::new(product, "P100-RED");
        existing.title = "Lamp red".to_string();
        existing.color = Some(Uuid::new_v4());
        existing.price = Some(Price::new(dec!(19.99), "EUR"));
        existing.stock_level = Some(dec!(4));

        let data = row(&[("custom_product_id", "P100"), ("sku", "P100-RED"), ("color", "")]);
        let (v, change) = merge_variation(
            Some(existing.clone()),
            product,
            &data,
            ResolvedAttributes::default(),
            "EUR",
        );
        assert_eq!(change, Change::Updated);
        assert_eq!(v.id, existing.id);
        assert_eq!(v.color, None);
        assert_eq!(v.title, "Lamp red");
        assert_eq!(v.price, existing.price);
        assert_eq!(v.stock_level, existing.stock_level);
    }
}
