//! Helpers for build and maintenance scripts
//!
//! Cache-busting stamps, filtered directory listings and mtime touching.
//! The stamp is also available to every template as `cachebreak`.

use chrono::{DateTime, Utc};
use std::fs::{File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::logger;

/// Template token carrying [`cachebreak`]
pub const CACHEBREAK_TOKEN: &str = "cachebreak";

/// Current time in whole minutes since the epoch, rounded to the nearest minute
pub fn cachebreak() -> i64 {
    cachebreak_at(Utc::now())
}

pub fn cachebreak_at(at: DateTime<Utc>) -> i64 {
    let secs = (at.timestamp_millis() + 500).div_euclid(1000);
    (secs + 30).div_euclid(60)
}

/// Filter matching file names that end with `suffix`
pub fn has_suffix(suffix: &str) -> impl Fn(&str) -> bool + '_ {
    move |name| name.ends_with(suffix)
}

/// Paths of the entries in `dir` whose file name passes `filter`, sorted by name
pub async fn iterate_file_path<F>(dir: &Path, filter: F) -> io::Result<Vec<PathBuf>>
where
    F: Fn(&str) -> bool,
{
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut matched = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name().to_str().is_some_and(|name| filter(name)) {
            matched.push(entry.path());
        }
    }
    matched.sort();
    Ok(matched)
}

/// Blocking [`iterate_file_path`]
pub fn iterate_file_path_sync<F>(dir: &Path, filter: F) -> io::Result<Vec<PathBuf>>
where
    F: Fn(&str) -> bool,
{
    let mut matched = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_str().is_some_and(|name| filter(name)) {
            matched.push(entry.path());
        }
    }
    matched.sort();
    Ok(matched)
}

/// Set the access and modification times of every path to now.
///
/// Stops at the first path that cannot be opened or updated.
pub fn touch_files<P: AsRef<Path>>(paths: &[P]) -> io::Result<()> {
    let now = SystemTime::now();
    let times = FileTimes::new().set_accessed(now).set_modified(now);
    for path in paths {
        File::open(path)?.set_times(times)?;
        logger::debug(&format!("[Scripting] Touched '{}'", path.as_ref().display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_cachebreak_rounds_to_nearest_minute() {
        let at = |secs| Utc.timestamp_opt(secs, 0).unwrap();
        assert_eq!(cachebreak_at(at(0)), 0);
        assert_eq!(cachebreak_at(at(29)), 0);
        assert_eq!(cachebreak_at(at(30)), 1);
        assert_eq!(cachebreak_at(at(60 * 1000 + 89)), 1001);
        assert_eq!(cachebreak_at(at(60 * 1000 + 90)), 1002);
        assert!(cachebreak() > 28_000_000);
    }

    fn sample_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.css", "a.css", "site.js", "notes.css.bak"] {
            std::fs::write(dir.path().join(name), name).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_iterate_file_path_filters_by_suffix() {
        let dir = sample_dir();
        let found = iterate_file_path(dir.path(), has_suffix(".css")).await.unwrap();
        assert_eq!(found, vec![dir.path().join("a.css"), dir.path().join("b.css")]);

        let none = iterate_file_path(dir.path(), has_suffix(".png")).await.unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_iterate_file_path_sync_accepts_any_filter() {
        let dir = sample_dir();
        let found = iterate_file_path_sync(dir.path(), |name| name.starts_with("site")).unwrap();
        assert_eq!(found, vec![dir.path().join("site.js")]);

        assert!(iterate_file_path_sync(&dir.path().join("missing"), has_suffix(".css")).is_err());
    }

    #[test]
    fn test_touch_files_updates_mtime() {
        let dir = sample_dir();
        let path = dir.path().join("a.css");
        let old = SystemTime::now() - Duration::from_secs(3600);
        File::open(&path)
            .unwrap()
            .set_times(FileTimes::new().set_modified(old))
            .unwrap();

        touch_files(&[&path]).unwrap();
        let modified = std::fs::metadata(&path).unwrap().modified().unwrap();
        assert!(modified > old + Duration::from_secs(3000));

        assert!(touch_files(&[dir.path().join("missing.css")]).is_err());
    }
}
