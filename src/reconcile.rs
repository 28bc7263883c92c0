use serde::Serialize;

pub mod price_tier;
pub mod product;
pub mod resolver;
pub mod variation;

pub use price_tier::reconcile_tiers;
pub use product::{reconcile_product, ProductOutcome};
pub use resolver::ReferenceResolver;
pub use variation::{reconcile_variation, VariationOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    Created,
    Updated,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierChanges {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl TierChanges {
    pub fn add(&mut self, other: TierChanges) {
        self.created += other.created;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
    }

    pub fn written(&self) -> usize {
        self.created + self.updated
    }
}
