//! Durable snapshots of the document index.
//!
//! One JSON file holds both collections with their embeddings. Saves are
//! full overwrites through a temp file and rename, so a crash never leaves
//! a half-written snapshot behind. A missing file means an empty index; a
//! file that exists but does not parse is an error the caller must see.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Result, RetrievalError};
use crate::store::{DocumentStore, IndexedEmail, IndexedEvent};

/// Current snapshot format version.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    emails: Vec<IndexedEmail>,
    events: Vec<IndexedEvent>,
}

/// Load a snapshot from `path`.
///
/// Returns `Ok(None)` when no file exists. Content that cannot be parsed
/// is surfaced as [`RetrievalError::SnapshotCorrupt`] rather than treated
/// as empty, so a damaged index is never silently discarded.
pub async fn load(path: &Path) -> Result<Option<DocumentStore>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!("no snapshot at {}, starting empty", path.display());
            return Ok(None);
        }
        Err(err) => {
            return Err(RetrievalError::SnapshotIo {
                path: path.to_path_buf(),
                source: err,
            });
        }
    };

    let snapshot: SnapshotFile =
        serde_json::from_str(&content).map_err(|err| RetrievalError::SnapshotCorrupt {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(RetrievalError::SnapshotCorrupt {
            path: path.to_path_buf(),
            reason: format!("unsupported snapshot version {}", snapshot.version),
        });
    }

    let mut store = DocumentStore::new();
    store.replace(snapshot.emails, snapshot.events);
    info!(
        "loaded snapshot: {} emails, {} events",
        store.email_count(),
        store.event_count()
    );
    Ok(Some(store))
}

/// Write the full store contents to `path`, replacing any previous file.
pub async fn save(path: &Path, store: &DocumentStore) -> Result<()> {
    let snapshot = SnapshotFile {
        version: SNAPSHOT_VERSION,
        emails: store.emails(),
        events: store.events(),
    };
    let content = serde_json::to_string(&snapshot)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| RetrievalError::SnapshotIo {
                    path: parent.to_path_buf(),
                    source: err,
                })?;
        }
    }

    // Write through a temp file and rename so readers never observe a
    // partial snapshot.
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &content)
        .await
        .map_err(|err| RetrievalError::SnapshotIo {
            path: temp_path.clone(),
            source: err,
        })?;
    fs::rename(&temp_path, path)
        .await
        .map_err(|err| RetrievalError::SnapshotIo {
            path: path.to_path_buf(),
            source: err,
        })?;

    debug!(
        "saved snapshot: {} emails, {} events",
        snapshot.emails.len(),
        snapshot.events.len()
    );
    Ok(())
}
