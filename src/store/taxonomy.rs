use async_trait::async_trait;
use catalog_types::taxonomy::{Term, TermRepository, Vocabulary};
use catalog_types::ByName;
use rusqlite::params;
use rusqlite::types::Type;
use tokio_rusqlite::Connection;
use typesafe_repository::async_ops::{Get, Save, Select};
use typesafe_repository::prelude::*;
use typesafe_repository::IdentityOf;

pub struct SqliteTermRepository {
    conn: Connection,
}

impl SqliteTermRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS taxonomy_term (
                    id BLOB PRIMARY KEY,
                    vocabulary TEXT NOT NULL,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL
                )",
                [],
            )?;
            conn.execute(
                "CREATE INDEX IF NOT EXISTS taxonomy_term_name ON taxonomy_term (vocabulary, name)",
                [],
            )?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }
}

fn row_to_term(row: &rusqlite::Row<'_>) -> rusqlite::Result<Term> {
    let vocabulary = row.get::<_, String>(1)?;
    let vocabulary = Vocabulary::from_str(&vocabulary).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            Type::Text,
            format!("Unknown vocabulary {vocabulary}").into(),
        )
    })?;
    Ok(Term {
        id: row.get(0)?,
        vocabulary,
        name: row.get(2)?,
        created_at: row.get(3)?,
    })
}

impl Repository<Term> for SqliteTermRepository {
    type Error = anyhow::Error;
}

#[async_trait]
impl Save<Term> for SqliteTermRepository {
    async fn save(&self, t: Term) -> Result<(), Self::Error> {
        Ok(self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO taxonomy_term (id, vocabulary, name, created_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET vocabulary=?2, name=?3",
                    params![t.id, t.vocabulary.as_str(), t.name, t.created_at],
                )?;
                Ok(())
            })
            .await?)
    }
}

#[async_trait]
impl Get<Term> for SqliteTermRepository {
    async fn get_one(&self, id: &IdentityOf<Term>) -> Result<Option<Term>, Self::Error> {
        let id = *id;
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, vocabulary, name, created_at FROM taxonomy_term WHERE id = ?1",
                )?;
                let mut rows = stmt.query([id])?;
                let row = match rows.next()? {
                    Some(r) => r,
                    None => return Ok(None),
                };
                Ok(Some(row_to_term(row)?))
            })
            .await?)
    }
}

#[async_trait]
impl Select<Term, ByName<Vocabulary>> for SqliteTermRepository {
    async fn select(
        &self,
        ByName(vocabulary, name): &ByName<Vocabulary>,
    ) -> Result<Vec<Term>, Self::Error> {
        let vocabulary = vocabulary.as_str();
        let name = name.clone();
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, vocabulary, name, created_at FROM taxonomy_term
                     WHERE vocabulary = ?1 AND name = ?2 ORDER BY rowid",
                )?;
                let items = stmt
                    .query_map(params![vocabulary, name], row_to_term)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?)
    }
}

impl TermRepository for SqliteTermRepository {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_is_scoped_and_case_sensitive() -> Result<(), anyhow::Error> {
        let repo = SqliteTermRepository::init(Connection::open_in_memory().await?).await?;
        let brand = Term::new(Vocabulary::Brands, "Acme");
        repo.save(brand.clone()).await?;
        repo.save(Term::new(Vocabulary::Product, "Acme")).await?;

        let found = repo
            .select(&ByName(Vocabulary::Brands, "Acme".to_string()))
            .await?;
        assert_eq!(found.iter().map(|t| t.id).collect::<Vec<_>>(), vec![brand.id]);
        assert!(repo
            .select(&ByName(Vocabulary::Brands, "acme".to_string()))
            .await?
            .is_empty());
        let loaded = repo.get_one(&brand.id).await?.expect("term saved");
        assert_eq!(loaded.name, "Acme");
        assert_eq!(loaded.vocabulary, Vocabulary::Brands);
        Ok(())
    }
}
