use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Config;

/// Walk a project directory and collect Python source files.
///
/// Respects `.gitignore` rules, always excludes `__pycache__`, and applies
/// any additional exclusions from `config.exclude`. The result is sorted so
/// downstream passes see a deterministic file order regardless of directory
/// iteration order.
pub fn walk_project(root: &Path, config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(true)
        // Read .gitignore files even when the directory is not inside a git
        // repository, so exclusions work for standalone trees and fixtures.
        .require_git(false)
        .build();

    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!("walk error: {err}");
                continue;
            }
        };

        let path = entry.path();
        if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
            continue;
        }
        if path_contains_pycache(path) {
            continue;
        }
        if is_excluded_by_config(path, config) {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("py") {
            continue;
        }

        debug!("discovered {}", path.display());
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

/// Returns true if any component of `path` is named `__pycache__`.
fn path_contains_pycache(path: &Path) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|s| s == "__pycache__")
            .unwrap_or(false)
    })
}

/// Returns true if `path` matches any exclusion pattern from config.
fn is_excluded_by_config(path: &Path, config: &Config) -> bool {
    let patterns = match &config.exclude {
        Some(p) => p,
        None => return false,
    };

    let path_str = path.to_string_lossy();
    for pattern in patterns {
        if let Ok(matched) = glob::Pattern::new(pattern)
            && matched.matches(&path_str)
        {
            return true;
        }
        for component in path.components() {
            if let Some(s) = component.as_os_str().to_str()
                && let Ok(matched) = glob::Pattern::new(pattern)
                && matched.matches(s)
            {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("tempdir")
    }

    #[test]
    fn test_walk_finds_only_python_files_sorted() {
        let dir = tmp();
        fs::write(dir.path().join("b.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("a.py"), "y = 2\n").unwrap();
        fs::write(dir.path().join("README.md"), "# hi\n").unwrap();

        let files = walk_project(dir.path(), &Config::default()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.py", "b.py"], "sorted, Python only");
    }

    #[test]
    fn test_walk_excludes_pycache() {
        let dir = tmp();
        let cache = dir.path().join("__pycache__");
        fs::create_dir_all(&cache).unwrap();
        fs::write(cache.join("mod.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("mod.py"), "x = 1\n").unwrap();

        let files = walk_project(dir.path(), &Config::default()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(!files[0].to_string_lossy().contains("__pycache__"));
    }

    #[test]
    fn test_walk_respects_config_exclusions() {
        let dir = tmp();
        let migrations = dir.path().join("migrations");
        fs::create_dir_all(&migrations).unwrap();
        fs::write(migrations.join("0001_init.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("app.py"), "x = 1\n").unwrap();

        let config = Config {
            exclude: Some(vec!["migrations".to_string()]),
            ..Config::default()
        };
        let files = walk_project(dir.path(), &config).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("app.py"));
    }
}
