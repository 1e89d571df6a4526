use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::errors::AppError;
use crate::models::config::AppConfig;
use crate::models::snapshot::{History, PriceMap, PriceSnapshot};

/// JSON-file backed price history with a fixed-size sliding window.
pub struct HistoryStore {
    path: PathBuf,
    max_len: usize,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, max_len: usize) -> Self {
        HistoryStore {
            path: path.into(),
            max_len: max_len.max(1),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.history_path, config.max_history)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored history. A missing file is an empty history.
    pub fn load(&self) -> Result<History, AppError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            AppError::FileRead(format!("{}: {}", self.path.display(), e))
        })?;
        let history: History = serde_json::from_str(&content)?;
        Ok(history)
    }

    /// Replace the stored history with `history`.
    pub fn save(&self, history: &[PriceSnapshot]) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(history)
            .map_err(|e| AppError::Serialization(e.to_string()))?;
        write_atomic(&self.path, json.as_bytes())
    }

    /// Append a snapshot taken at `at`, trim to the window, persist, and return
    /// the new history.
    pub fn update(&self, prices: PriceMap, at: DateTime<Utc>) -> Result<History, AppError> {
        let mut history = self.load()?;
        history.push(PriceSnapshot::new(at, prices));
        truncate_front(&mut history, self.max_len);
        self.save(&history)?;
        info!(
            "History updated: {} entries in {}",
            history.len(),
            self.path.display()
        );
        Ok(history)
    }

    pub fn update_now(&self, prices: PriceMap) -> Result<History, AppError> {
        self.update(prices, Utc::now())
    }
}

/// Drop the oldest entries so at most `max_len` remain.
pub fn truncate_front<T>(items: &mut Vec<T>, max_len: usize) {
    if items.len() > max_len {
        let excess = items.len() - max_len;
        items.drain(..excess);
    }
}

/// Write `bytes` to a temporary file next to `path`, then rename it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)
        .map_err(|e| AppError::FileWrite(format!("{}: {}", dir.display(), e)))?;
    let write_err = |e: std::io::Error| AppError::FileWrite(format!("{}: {}", path.display(), e));

    // Temp files are created owner-only; keep the mode the target had.
    if let Some(perms) = target_permissions(path).map_err(write_err)? {
        tmp.as_file().set_permissions(perms).map_err(write_err)?;
    }
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(write_err)?;
    tmp.persist(path)?;
    Ok(())
}

/// Permissions of the existing target, or `rw-r--r--` for a new file on unix.
fn target_permissions(path: &Path) -> std::io::Result<Option<std::fs::Permissions>> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.permissions())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(new_file_permissions()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn new_file_permissions() -> Option<std::fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<std::fs::Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn prices(pairs: &[(&str, f64)]) -> PriceMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 45).unwrap()
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"), 30);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "[{\"time\": ").unwrap();
        let store = HistoryStore::new(&path, 30);
        assert_eq!(store.load().unwrap_err().code(), "PARSE");
    }

    #[test]
    fn test_save_then_load_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"), 30);
        let history = vec![
            PriceSnapshot::new(base_time(), prices(&[("VOO", 500.12), ("QQQ", 480.55)])),
            PriceSnapshot::new(base_time() + Duration::hours(6), prices(&[("SPY", 510.0)])),
            PriceSnapshot::new(base_time() + Duration::hours(12), PriceMap::new()),
        ];
        store.save(&history).unwrap();
        assert_eq!(store.load().unwrap(), history);
    }

    #[test]
    fn test_save_overwrites_not_merges() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"), 30);
        let first = vec![PriceSnapshot::new(base_time(), prices(&[("VOO", 1.0)]))];
        let second = vec![PriceSnapshot::new(base_time(), prices(&[("QQQ", 2.0)]))];
        store.save(&first).unwrap();
        store.save(&second).unwrap();
        assert_eq!(store.load().unwrap(), second);
    }

    #[test]
    fn test_first_update_from_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("market_history.json");
        let store = HistoryStore::new(&path, 30);
        let fetched = crate::data::client::parse_quotes(
            r#"[{"symbol":"VOO","price":500.12},{"symbol":"QQQ","price":480.55},{"symbol":"SPY","price":510.00},{"symbol":"QLD","price":90.3}]"#,
        )
        .unwrap();

        let history = store.update(fetched, base_time()).unwrap();
        assert_eq!(history.len(), 1);

        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let entries = on_disk.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["time"], "2024-01-02 14:30");
        assert_eq!(entries[0]["VOO"], 500.12);
        assert_eq!(entries[0]["QQQ"], 480.55);
        assert_eq!(entries[0]["SPY"], 510.0);
        assert_eq!(entries[0]["QLD"], 90.3);
    }

    #[test]
    fn test_full_window_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"), 30);
        let prior: History = (0..30)
            .map(|i| {
                PriceSnapshot::new(
                    base_time() + Duration::hours(i),
                    prices(&[("VOO", 400.0 + i as f64)]),
                )
            })
            .collect();
        store.save(&prior).unwrap();

        let at = base_time() + Duration::hours(30);
        let history = store.update(prices(&[("VOO", 999.0)]), at).unwrap();

        assert_eq!(history.len(), 30);
        assert_eq!(&history[..29], &prior[1..]);
        assert_eq!(history[29].price("VOO"), Some(999.0));
        assert_eq!(store.load().unwrap(), history);
    }

    #[test]
    fn test_window_invariant_over_many_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"), 30);
        let mut history = Vec::new();
        for i in 0..45 {
            let at = base_time() + Duration::minutes(i);
            history = store.update(prices(&[("SPY", i as f64)]), at).unwrap();
            assert!(history.len() <= 30);
            assert_eq!(history.len(), (i as usize + 1).min(30));
        }
        // 30 most recent, oldest first.
        assert_eq!(history[0].price("SPY"), Some(15.0));
        assert_eq!(history[29].price("SPY"), Some(44.0));
        assert!(history.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn test_snapshot_missing_ticker_still_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"), 30);
        store.update(prices(&[("VOO", 1.0), ("QQQ", 2.0)]), base_time()).unwrap();
        let history = store
            .update(prices(&[("VOO", 1.5)]), base_time() + Duration::hours(1))
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].price("QQQ"), None);
    }

    #[test]
    fn test_truncate_front() {
        let mut v: Vec<u32> = (0..10).collect();
        truncate_front(&mut v, 3);
        assert_eq!(v, vec![7, 8, 9]);
        truncate_front(&mut v, 5);
        assert_eq!(v, vec![7, 8, 9]);
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_keeps_existing_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("README.md");
        std::fs::write(&path, "old").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();

        write_atomic(&path, b"new").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_new_file_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"), 30);
        store.update(prices(&[("VOO", 1.0)]), base_time()).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }
}
