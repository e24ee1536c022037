//! JSON export of every collection to `BACKUP_DIR`.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::AppState;
use crate::infrastructure::repositories::{carts, customers, orders, products, promotions, reviews};
use crate::Result;

#[derive(Debug, Serialize)]
pub struct BackupSummary {
    pub directory: String,
    pub collections: Vec<CollectionBackup>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CollectionBackup {
    pub name: &'static str,
    pub documents: usize,
}

pub struct BackupService<'a> {
    state: &'a AppState,
}

impl<'a> BackupService<'a> {
    pub fn new(state: &'a AppState) -> Self { Self { state } }

    /// Overwrites `<BACKUP_DIR>/<collection>.json` for every collection.
    /// Customer documents never include password hashes.
    pub async fn run(&self) -> Result<BackupSummary> {
        let dir = self.state.config().backup_dir.as_path();
        tokio::fs::create_dir_all(dir).await?;
        let pool = self.state.pool();

        let collections = vec![
            write_collection(dir, "customers", &customers::list_all(pool).await?).await?,
            write_collection(dir, "products", &products::list_all(pool).await?).await?,
            write_collection(dir, "carts", &carts::list_all(pool).await?).await?,
            write_collection(dir, "orders", &orders::list_all(pool).await?).await?,
            write_collection(dir, "promotions", &promotions::list(pool, true).await?).await?,
            write_collection(dir, "promotion_targets", &promotions::list_all_targets(pool).await?).await?,
            write_collection(dir, "reviews", &reviews::list_all(pool).await?).await?,
        ];

        let summary = BackupSummary { directory: dir.display().to_string(), collections, finished_at: Utc::now() };
        tracing::info!(
            directory = %summary.directory,
            documents = summary.collections.iter().map(|c| c.documents).sum::<usize>(),
            "Backup written"
        );
        Ok(summary)
    }
}

async fn write_collection<T: Serialize>(dir: &Path, name: &'static str, docs: &[T]) -> Result<CollectionBackup> {
    let path = dir.join(format!("{name}.json"));
    tokio::fs::write(&path, serde_json::to_vec_pretty(docs)?).await?;
    tracing::debug!(collection = name, documents = docs.len(), path = %path.display(), "Collection exported");
    Ok(CollectionBackup { name, documents: docs.len() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Customer;
    use crate::domain::value_objects::Phone;

    #[tokio::test]
    async fn test_write_collection_omits_password_hash() {
        let dir = std::env::temp_dir().join(format!("storefront-backup-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let customer = Customer::register("KH1", Phone::parse("0901234567").unwrap(), "An", None, "secret-hash".into());

        let written = write_collection(&dir, "customers", &[customer]).await.unwrap();
        assert_eq!(written.documents, 1);

        let text = tokio::fs::read_to_string(dir.join("customers.json")).await.unwrap();
        assert!(text.contains("0901234567"));
        assert!(!text.contains("secret-hash"));
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
