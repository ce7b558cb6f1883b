//! Polling change detection over markdown trees.

use crate::error::Result;
use crate::io::markdown_files;
use std::path::PathBuf;
use std::time::SystemTime;

/// Most recent modification time of any `*.md` file under `roots`.
///
/// Files that vanish between listing and stat are ignored. `None` when no markdown exists.
pub fn latest_mtime(roots: &[PathBuf]) -> Result<Option<SystemTime>> {
    let mut latest = None;
    for root in roots {
        for path in markdown_files(root)? {
            let modified = match std::fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(t) => t,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            latest = latest.max(Some(modified));
        }
    }
    Ok(latest)
}

/// Remembers the last observed mtime and reports when a newer one appears.
#[derive(Debug)]
pub struct MtimeWatcher {
    roots: Vec<PathBuf>,
    last_seen: Option<SystemTime>,
}

impl MtimeWatcher {
    pub fn new(roots: Vec<PathBuf>) -> Result<Self> {
        let last_seen = latest_mtime(&roots)?;
        Ok(Self { roots, last_seen })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// True when some markdown file is newer than anything seen before.
    pub fn poll(&mut self) -> Result<bool> {
        let latest = latest_mtime(&self.roots)?;
        if latest > self.last_seen {
            self.last_seen = latest;
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(path: &std::path::Path, when: SystemTime) {
        let file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(when).unwrap();
    }

    #[test]
    fn latest_over_several_roots() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        std::fs::write(a.path().join("x.md"), "x").unwrap();
        std::fs::write(b.path().join("y.md"), "y").unwrap();
        std::fs::write(b.path().join("z.txt"), "z").unwrap();

        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        touch(&a.path().join("x.md"), base);
        touch(&b.path().join("y.md"), base + Duration::from_secs(60));
        touch(&b.path().join("z.txt"), base + Duration::from_secs(600));

        let roots = vec![a.path().to_path_buf(), b.path().to_path_buf()];
        assert_eq!(
            latest_mtime(&roots).unwrap(),
            Some(base + Duration::from_secs(60))
        );
    }

    #[test]
    fn empty_or_missing_roots() {
        let dir = TempDir::new().unwrap();
        let roots = vec![dir.path().to_path_buf(), dir.path().join("missing")];
        assert_eq!(latest_mtime(&roots).unwrap(), None);
    }

    #[test]
    fn watcher_fires_once_per_change() {
        let dir = TempDir::new().unwrap();
        let doc = dir.path().join("doc.md");
        std::fs::write(&doc, "v1").unwrap();
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        touch(&doc, base);

        let mut watcher = MtimeWatcher::new(vec![dir.path().to_path_buf()]).unwrap();
        assert!(!watcher.poll().unwrap());

        touch(&doc, base + Duration::from_secs(5));
        assert!(watcher.poll().unwrap());
        assert!(!watcher.poll().unwrap());
    }
}
