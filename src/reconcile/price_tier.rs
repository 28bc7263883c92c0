use super::TierChanges;
use crate::error::RowError;
use catalog_types::price_list::{ByTier, PriceList, PriceListEntry, PriceListEntryRepository, Tier};
use catalog_types::variation::Variation;
use catalog_types::Price;
use time::OffsetDateTime;
use typesafe_repository::IdentityOf;

/// Merges the supplied tiers into `price_list` for one variation. Absent
/// tiers and entries for quantities the row no longer carries are left alone.
pub async fn reconcile_tiers(
    entries: &dyn PriceListEntryRepository,
    price_list: &PriceList,
    variation: IdentityOf<Variation>,
    tiers: &[Option<Tier>],
    currency: &str,
) -> Result<TierChanges, RowError> {
    let mut changes = TierChanges::default();
    for tier in tiers.iter().flatten() {
        let existing = entries
            .select(&ByTier {
                price_list: price_list.id,
                variation,
                quantity: tier.quantity,
            })
            .await
            .map_err(RowError::persistence("price list entry"))?;
        match existing.into_iter().next() {
            None => {
                let entry = PriceListEntry::new(
                    price_list.id,
                    variation,
                    tier.quantity,
                    Price::new(tier.price, currency),
                );
                entries
                    .save(entry)
                    .await
                    .map_err(RowError::persistence("price list entry"))?;
                changes.created += 1;
            }
            Some(entry) if entry.price.same_as(tier.price, currency) => {
                changes.unchanged += 1;
            }
            Some(mut entry) => {
                log::debug!(
                    "Tier {} of {variation}: {} -> {} {currency}",
                    tier.quantity,
                    entry.price,
                    tier.price
                );
                entry.price = Price::new(tier.price, currency);
                entry.updated_at = OffsetDateTime::now_utc();
                entries
                    .save(entry)
                    .await
                    .map_err(RowError::persistence("price list entry"))?;
                changes.updated += 1;
            }
        }
    }
    Ok(changes)
}
