//! Bounded concurrent hashing of local files

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use replica_fs::{LocalStorage, blob_hash};

use crate::{Error, Result};

/// Blob hash of every path, reading at most `concurrency` files at once.
pub async fn hash_local_files(
    storage: Arc<dyn LocalStorage>,
    paths: Vec<String>,
    concurrency: usize,
) -> Result<BTreeMap<String, String>> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for path in paths {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| Error::Task {
                message: e.to_string(),
            })?;
        let storage = Arc::clone(&storage);
        tasks.spawn_blocking(move || {
            let _permit = permit;
            let content = storage.read_bytes(&path)?;
            Ok::<_, replica_fs::Error>((path, blob_hash(&content)))
        });
    }

    let mut hashes = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
        let (path, hash) = joined??;
        hashes.insert(path, hash);
    }
    Ok(hashes)
}
