//! Remote path joining and deterministic temp-file naming
//!
//! Remote SFTP paths always use `/` as separator, regardless of either OS.

use std::path::PathBuf;

/// Join remote SFTP path components using `/` separator.
///
/// Must not double the separator when the base is `/` or already ends
/// with one.
pub fn join_remote_path(base: &str, component: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, component)
    } else {
        format!("{}/{}", base, component)
    }
}

/// Scratch directory for materialized remote files
pub fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join("sshpanel")
}

/// Deterministic local temp path for a remote file.
///
/// The name is derived from the host and the path-escaped remote path, so
/// repeated opens of the same remote file land on the same local path and
/// distinct (host, remotePath) pairs never collide.
pub fn local_temp_path(host: &str, remote_path: &str) -> PathBuf {
    scratch_dir().join(format!(
        "{}{}",
        escape_component(host),
        escape_component(remote_path)
    ))
}

/// Percent-escape `/` (and `%` itself) so the mapping into a flat file
/// name is injective: no two distinct inputs share an escaped form, and
/// the `%2F` of the leading path separator marks the host/path boundary.
fn escape_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_does_not_double_separator_at_root() {
        assert_eq!(join_remote_path("/", "bin"), "/bin");
        assert_eq!(join_remote_path("/home", "file.txt"), "/home/file.txt");
        assert_eq!(join_remote_path("/home/", "file.txt"), "/home/file.txt");
    }

    #[test]
    fn temp_path_is_deterministic_and_collision_free() {
        let a = local_temp_path("10.0.0.5", "/etc/nginx/nginx.conf");
        let b = local_temp_path("10.0.0.5", "/etc/nginx/nginx.conf");
        assert_eq!(a, b);

        // Same path on another host, and another path on the same host,
        // must map elsewhere.
        assert_ne!(a, local_temp_path("10.0.0.6", "/etc/nginx/nginx.conf"));
        assert_ne!(a, local_temp_path("10.0.0.5", "/etc/nginx/mime.types"));

        let name = a.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, "10.0.0.5%2Fetc%2Fnginx%2Fnginx.conf");
    }

    #[test]
    fn temp_path_distinguishes_separators_from_name_characters() {
        // Dashes in file names or hosts must never be mistaken for path
        // separators in the flattened name.
        assert_ne!(
            local_temp_path("h", "/x-y.txt"),
            local_temp_path("h", "/x/y.txt")
        );
        assert_ne!(
            local_temp_path("a-b", "/c"),
            local_temp_path("a", "/b-c")
        );
        assert_ne!(
            local_temp_path("h", "/100%2Fdone"),
            local_temp_path("h", "/100/done")
        );
    }
}
