//! pgvector persistence for embedded records.

use async_trait::async_trait;
use pgvector::Vector;
use thiserror::Error;
use tokio_postgres::{Client, NoTls};

use crate::config::ConfigError;
use crate::embeddings::EmbeddedRecord;

/// Errors raised while storing a record.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The database could not be reached or refused the session.
    #[error("failed to connect to Postgres: {source}")]
    Connect {
        /// Driver error.
        #[source]
        source: tokio_postgres::Error,
    },
    /// Creating the extension or table failed.
    #[error("failed to prepare {table}: {source}")]
    Prepare {
        /// Qualified table name.
        table: String,
        /// Driver error.
        #[source]
        source: tokio_postgres::Error,
    },
    /// The INSERT statement failed.
    #[error("failed to insert embedding into {table}: {source}")]
    Insert {
        /// Qualified table name.
        table: String,
        /// Driver error.
        #[source]
        source: tokio_postgres::Error,
    },
    /// The record could not be serialized for output.
    #[error("failed to encode embedding record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Postgres table name with an optional schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: Option<String>,
    table: String,
}

impl TableName {
    /// Builds a new table identifier.
    pub fn new<T>(schema: Option<String>, table: T) -> Result<Self, ConfigError>
    where
        T: Into<String>,
    {
        let table = table.into();
        if table.trim().is_empty() {
            return Err(ConfigError::EmptyIdentifier("table"));
        }
        if schema.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(ConfigError::EmptyIdentifier("schema"));
        }
        Ok(Self { schema, table })
    }

    /// Table reference with quoted identifiers, schema-qualified when set.
    pub fn qualified(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.table)),
            None => quote_ident(&self.table),
        }
    }

    /// Returns the raw schema string.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Returns the raw table string.
    pub fn table(&self) -> &str {
        &self.table
    }
}

/// Quotes Postgres identifiers, escaping embedded quotes.
pub fn quote_ident(input: &str) -> String {
    let escaped = input.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Parameterized insert of `(description, embedding)`.
pub fn insert_sql(table: &TableName) -> String {
    format!(
        "INSERT INTO {} (description, embedding) VALUES ($1, $2)",
        table.qualified()
    )
}

fn create_table_sql(table: &TableName, dims: usize) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            description TEXT NOT NULL,
            embedding VECTOR({dims}) NOT NULL
        )",
        table.qualified()
    )
}

/// Destination for the single record a run produces.
#[async_trait]
pub trait VectorSink: Send + Sync {
    /// Stores `record`; called at most once per run.
    async fn persist(&self, record: &EmbeddedRecord) -> Result<(), PersistenceError>;
}

/// Inserts records into a pgvector table, one connection per call.
#[derive(Debug, Clone)]
pub struct PgVectorStore {
    database_url: String,
    table: TableName,
    prepare_table: bool,
}

impl PgVectorStore {
    /// Creates a store; no connection is made until `persist`.
    pub fn new(database_url: impl Into<String>, table: TableName, prepare_table: bool) -> Self {
        Self {
            database_url: database_url.into(),
            table,
            prepare_table,
        }
    }

    /// Target table.
    pub fn table(&self) -> &TableName {
        &self.table
    }

    async fn ensure_vector_extension(&self, client: &Client) -> Result<(), PersistenceError> {
        client
            .execute("CREATE EXTENSION IF NOT EXISTS vector", &[])
            .await
            .map_err(|source| PersistenceError::Prepare {
                table: self.table.qualified(),
                source,
            })?;
        Ok(())
    }

    async fn ensure_table(&self, client: &Client, dims: usize) -> Result<(), PersistenceError> {
        client
            .execute(&create_table_sql(&self.table, dims), &[])
            .await
            .map_err(|source| PersistenceError::Prepare {
                table: self.table.qualified(),
                source,
            })?;
        Ok(())
    }

    async fn write(
        &self,
        client: &Client,
        record: &EmbeddedRecord,
    ) -> Result<u64, PersistenceError> {
        if self.prepare_table {
            self.ensure_vector_extension(client).await?;
            self.ensure_table(client, record.dimensions()).await?;
        }
        self.insert(client, record).await
    }

    async fn insert(
        &self,
        client: &Client,
        record: &EmbeddedRecord,
    ) -> Result<u64, PersistenceError> {
        let vector = Vector::from(record.embedding.clone());
        client
            .execute(&insert_sql(&self.table), &[&record.description, &vector])
            .await
            .map_err(|source| PersistenceError::Insert {
                table: self.table.qualified(),
                source,
            })
    }
}

#[async_trait]
impl VectorSink for PgVectorStore {
    async fn persist(&self, record: &EmbeddedRecord) -> Result<(), PersistenceError> {
        let (client, connection) = tokio_postgres::connect(&self.database_url, NoTls)
            .await
            .map_err(|source| PersistenceError::Connect { source })?;
        let driver = tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::error!(error = %err, "postgres connection error");
            }
        });

        let result = self.write(&client, record).await;

        drop(client);
        if let Err(err) = driver.await {
            tracing::warn!(error = %err, "postgres connection task did not shut down cleanly");
        }

        let rows = result?;
        tracing::info!(
            table = %self.table.qualified(),
            rows,
            dimensions = record.dimensions(),
            "inserted embedding"
        );
        Ok(())
    }
}

/// Dry-run sink that prints the record as one JSON line on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

#[async_trait]
impl VectorSink for StdoutSink {
    async fn persist(&self, record: &EmbeddedRecord) -> Result<(), PersistenceError> {
        let line = serde_json::to_string(record)?;
        println!("{line}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_unqualified() {
        let table = TableName::new(None, "embeddings").expect("table");
        assert_eq!(table.qualified(), "\"embeddings\"");
        assert_eq!(
            insert_sql(&table),
            "INSERT INTO \"embeddings\" (description, embedding) VALUES ($1, $2)"
        );
    }

    #[test]
    fn schema_qualifies_and_escapes() {
        let table = TableName::new(Some("my\"schema".into()), "vecs").expect("table");
        assert_eq!(table.qualified(), "\"my\"\"schema\".\"vecs\"");
        assert_eq!(table.schema(), Some("my\"schema"));
        assert_eq!(table.table(), "vecs");
    }

    #[test]
    fn blank_identifiers_are_rejected() {
        assert!(TableName::new(None, " ").is_err());
        assert!(TableName::new(Some(String::new()), "embeddings").is_err());
    }

    #[test]
    fn create_table_sizes_vector_column() {
        let table = TableName::new(None, "embeddings").expect("table");
        let ddl = create_table_sql(&table, 384);
        assert!(ddl.contains("CREATE TABLE IF NOT EXISTS \"embeddings\""));
        assert!(ddl.contains("embedding VECTOR(384) NOT NULL"));
    }

    #[tokio::test]
    async fn stdout_sink_accepts_record() {
        let record = EmbeddedRecord::new("hello world", vec![2.0, 3.0, 4.0]);
        StdoutSink.persist(&record).await.expect("persist");
    }
}
