//! Optional append-only persistence of the convergence log (§6).

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use log::warn;

const CONVERGENCE_PATH: &str = "/shared_data/testesConvergencia/convergence_data.txt";

/// Appends each `(elapsed_seconds, router_count)` entry to the shared
/// convergence file. Failures (missing directory, permissions) are logged
/// and otherwise ignored: this path is diagnostic, not load-bearing. Returns
/// whether every entry was written, so the caller only drains its in-memory
/// log on success and retries on the next supervisor tick otherwise.
pub fn flush(router_id: &str, entries: &[(f64, usize)]) -> bool {
    flush_to(Path::new(CONVERGENCE_PATH), router_id, entries)
}

fn flush_to(path: &Path, router_id: &str, entries: &[(f64, usize)]) -> bool {
    if entries.is_empty() {
        return true;
    }
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("could not create convergence log directory {}: {}", parent.display(), e);
            return false;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path);
    let mut file = match file {
        Ok(f) => f,
        Err(e) => {
            warn!("could not open convergence log {}: {}", path.display(), e);
            return false;
        }
    };
    for (elapsed, count) in entries {
        let line = format!(" Roteador : {}  Tempo : {:.2}  Roteadores Descobertos : {}\n", router_id, elapsed, count);
        if let Err(e) = file.write_all(line.as_bytes()) {
            warn!("failed to append convergence entry: {}", e);
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn formats_lines_in_the_expected_shape() {
        let dir = std::env::temp_dir().join(format!("convergence-test-{:?}", std::thread::current().id()));
        let _ = fs::remove_file(&dir);
        assert!(flush_to(&dir, "A", &[(1.23, 2)]));
        let contents = fs::read_to_string(&dir).unwrap();
        assert_eq!(contents, " Roteador : A  Tempo : 1.23  Roteadores Descobertos : 2\n");
        let _ = fs::remove_file(&dir);
    }

    #[test]
    fn empty_entries_is_a_noop() {
        let dir = std::env::temp_dir().join("convergence-test-empty-noop");
        let _ = fs::remove_file(&dir);
        assert!(flush_to(&dir, "A", &[]));
        assert!(!dir.exists());
    }

    #[test]
    fn creates_missing_parent_directories() {
        let base = std::env::temp_dir().join(format!("convergence-test-nested-{:?}", std::thread::current().id()));
        let _ = fs::remove_dir_all(&base);
        let path = base.join("nested").join("convergence_data.txt");
        assert!(flush_to(&path, "A", &[(0.5, 1)]));
        assert!(path.exists());
        let _ = fs::remove_dir_all(&base);
    }
}
