use crate::error::RowError;
use crate::row::AttributeField;
use crate::store::Catalog;
use catalog_types::attribute::{AttributeKind, AttributeValue};
use catalog_types::taxonomy::{Term, Vocabulary};
use catalog_types::ByName;
use typesafe_repository::IdentityOf;

/// Get-or-create for taxonomy terms and attribute values. Lookup is an exact,
/// case-sensitive name match; duplicates resolve to the oldest entry.
pub struct ReferenceResolver<'a> {
    catalog: &'a Catalog,
    created: usize,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            created: 0,
        }
    }

    /// Number of references this resolver had to create.
    pub fn created(&self) -> usize {
        self.created
    }

    pub async fn term(
        &mut self,
        vocabulary: Vocabulary,
        name: &str,
    ) -> Result<IdentityOf<Term>, RowError> {
        let reference = format!("{vocabulary}/{name}");
        let found = self
            .catalog
            .terms
            .select(&ByName(vocabulary, name.to_string()))
            .await
            .map_err(RowError::resolution(&reference))?;
        if let Some(term) = found.into_iter().next() {
            return Ok(term.id);
        }
        let term = Term::new(vocabulary, name);
        let id = term.id;
        self.catalog
            .terms
            .save(term)
            .await
            .map_err(RowError::resolution(&reference))?;
        log::info!("Created term {reference}");
        self.created += 1;
        Ok(id)
    }

    pub async fn attribute(
        &mut self,
        kind: AttributeKind,
        name: &str,
    ) -> Result<IdentityOf<AttributeValue>, RowError> {
        let reference = format!("{kind}/{name}");
        let found = self
            .catalog
            .attributes
            .select(&ByName(kind, name.to_string()))
            .await
            .map_err(RowError::resolution(&reference))?;
        if let Some(value) = found.into_iter().next() {
            return Ok(value.id);
        }
        let value = AttributeValue::new(kind, name);
        let id = value.id;
        self.catalog
            .attributes
            .save(value)
            .await
            .map_err(RowError::resolution(&reference))?;
        log::info!("Created attribute value {reference}");
        self.created += 1;
        Ok(id)
    }

    /// New value of a nullable attribute reference: kept when the column is
    /// absent, cleared when it is empty.
    pub async fn attribute_field(
        &mut self,
        kind: AttributeKind,
        field: &AttributeField,
        current: Option<IdentityOf<AttributeValue>>,
    ) -> Result<Option<IdentityOf<AttributeValue>>, RowError> {
        match field {
            AttributeField::Absent => Ok(current),
            AttributeField::Empty => Ok(None),
            AttributeField::Value(name) => self.attribute(kind, name).await.map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_rusqlite::Connection;

    async fn catalog() -> Result<(Catalog, Connection), anyhow::Error> {
        let conn = Connection::open_in_memory().await?;
        Ok((Catalog::sqlite(conn.clone()).await?, conn))
    }

    #[tokio::test]
    async fn resolving_twice_returns_same_identity() -> Result<(), anyhow::Error> {
        let (catalog, _) = catalog().await?;
        let mut resolver = ReferenceResolver::new(&catalog);
        let first = resolver.term(Vocabulary::Brands, "Acme").await?;
        let second = resolver.term(Vocabulary::Brands, "Acme").await?;
        assert_eq!(first, second);
        let category = resolver.term(Vocabulary::Product, "Acme").await?;
        assert_ne!(first, category);
        let red = resolver.attribute(AttributeKind::Color, "Red").await?;
        assert_eq!(red, resolver.attribute(AttributeKind::Color, "Red").await?);
        assert_ne!(red, resolver.attribute(AttributeKind::Color, "red").await?);
        assert_eq!(resolver.created(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn duplicates_resolve_to_oldest() -> Result<(), anyhow::Error> {
        let (catalog, _) = catalog().await?;
        let oldest = Term::new(Vocabulary::Brands, "Acme");
        catalog.terms.save(oldest.clone()).await?;
        catalog.terms.save(Term::new(Vocabulary::Brands, "Acme")).await?;
        let mut resolver = ReferenceResolver::new(&catalog);
        assert_eq!(resolver.term(Vocabulary::Brands, "Acme").await?, oldest.id);
        assert_eq!(resolver.created(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn attribute_field_follows_column_state() -> Result<(), anyhow::Error> {
        let (catalog, _) = catalog().await?;
        let mut resolver = ReferenceResolver::new(&catalog);
        let current = Some(resolver.attribute(AttributeKind::SelectFormat, "A4").await?);
        let kind = AttributeKind::SelectFormat;
        assert_eq!(
            resolver.attribute_field(kind, &AttributeField::Absent, current).await?,
            current
        );
        assert_eq!(
            resolver.attribute_field(kind, &AttributeField::Empty, current).await?,
            None
        );
        let a5 = resolver
            .attribute_field(kind, &AttributeField::Value("A5".to_string()), current)
            .await?;
        assert!(a5.is_some() && a5 != current);
        Ok(())
    }

    #[tokio::test]
    async fn store_failure_is_retryable() -> Result<(), anyhow::Error> {
        let (catalog, conn) = catalog().await?;
        conn.call(|conn| {
            conn.execute_batch("DROP TABLE taxonomy_term")?;
            Ok(())
        })
        .await?;
        let mut resolver = ReferenceResolver::new(&catalog);
        let err = resolver
            .term(Vocabulary::Brands, "Acme")
            .await
            .expect_err("table is gone");
        assert!(matches!(err, RowError::ReferenceResolutionFailure { .. }));
        assert!(err.is_retryable());
        Ok(())
    }
}
