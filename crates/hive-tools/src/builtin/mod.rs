pub mod file_reader;
pub mod firecrawl;
pub mod serializer;
pub mod web_scraper;

use std::path::{Path, PathBuf};

/// Resolve a tool-supplied path against the working directory.
pub(crate) fn resolve_path(path: &str, working_dir: &Path) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        working_dir.join(p)
    }
}
