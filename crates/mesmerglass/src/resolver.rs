//! `std::fs`-backed collaborator implementations (§6): the only concrete
//! adapters this crate supplies. Library crates only ever see the
//! `MediaBankResolver`/`FileReader` traits.

use std::path::Path;

use mesmerglass_core::interfaces::MediaBankResolver;
use tracing::warn;

/// Lists a Media Bank directory's member files via `std::fs::read_dir`,
/// in a stable (sorted) order so re-runs produce the same cycling sequence.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsMediaBankResolver;

impl MediaBankResolver for FsMediaBankResolver {
    fn list(&self, bank_path: &str) -> Vec<String> {
        let dir = Path::new(bank_path);
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %bank_path, error = %e, "media bank directory could not be read");
                return Vec::new();
            }
        };

        let mut paths: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.path().display().to_string())
            .collect();
        paths.sort();
        paths
    }
}
