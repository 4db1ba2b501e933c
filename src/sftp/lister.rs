//! Directory lister
//!
//! Turns raw server entries into the tree shape the panel renders. The sort
//! order is a user-visible contract: directories first, then files, each
//! group case-insensitively by name, stable across repeated listings.

use tracing::debug;

use super::error::ListError;
use super::path_utils::join_remote_path;
use super::transport::RemoteFs;

/// One displayable entry of a remote directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub is_directory: bool,
    /// Remote path of the entry, joined from the listed directory
    pub full_path: String,
}

/// Fetch and order-normalize the entries of a remote directory
pub async fn list(session: &dyn RemoteFs, remote_path: &str) -> Result<Vec<Entry>, ListError> {
    let raw = session.read_dir(remote_path).await?;

    let mut entries: Vec<Entry> = raw
        .into_iter()
        .filter(|e| e.name != "." && e.name != "..")
        .map(|e| Entry {
            full_path: join_remote_path(remote_path, &e.name),
            is_directory: e.is_directory,
            name: e.name,
        })
        .collect();

    // Directories first, then case-insensitive by name. sort_by is stable,
    // so equal keys keep the server's order.
    entries.sort_by(|a, b| {
        if a.is_directory != b.is_directory {
            return b.is_directory.cmp(&a.is_directory);
        }
        a.name.to_lowercase().cmp(&b.name.to_lowercase())
    });

    debug!("Listed {} entries in {}", entries.len(), remote_path);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sftp::testing::MemoryRemoteFs;

    async fn seeded() -> MemoryRemoteFs {
        let fs = MemoryRemoteFs::detached();
        fs.insert_dir("/srv");
        fs.insert_dir("/Etc");
        fs.insert_file("/readme.txt", b"hi");
        fs.insert_file("/Makefile", b"all:");
        fs.insert_file("/srv/app.conf", b"");
        fs
    }

    #[tokio::test]
    async fn dirs_first_then_case_insensitive_names() {
        let fs = seeded().await;
        let entries = list(&fs, "/").await.unwrap();

        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Etc", "srv", "Makefile", "readme.txt"]);
        assert!(entries[0].is_directory);
        assert!(entries[1].is_directory);
        assert!(!entries[2].is_directory);
    }

    #[tokio::test]
    async fn listing_is_idempotent() {
        let fs = seeded().await;
        let first = list(&fs, "/").await.unwrap();
        let second = list(&fs, "/").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn full_path_joins_without_doubling_root_separator() {
        let fs = seeded().await;
        let entries = list(&fs, "/").await.unwrap();

        let readme = entries.iter().find(|e| e.name == "readme.txt").unwrap();
        assert_eq!(readme.full_path, "/readme.txt");

        let nested = list(&fs, "/srv").await.unwrap();
        assert_eq!(nested[0].full_path, "/srv/app.conf");
    }

    #[tokio::test]
    async fn fetch_error_propagates() {
        let fs = MemoryRemoteFs::detached();
        let err = list(&fs, "/missing").await.unwrap_err();
        assert!(matches!(err, ListError::Remote { .. }));
    }
}
