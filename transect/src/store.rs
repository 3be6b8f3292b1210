//! Per-project key/value settings persisted as a JSON object.
//!
//! Rendered profiles are recorded as `profile_{label} -> image path`,
//! and the directory charts are written to as [SAVE_DIR_KEY].

use crate::{image_path, TransectError};
use log::{debug, warn};
use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

/// Key holding the directory charts are saved to.
pub const SAVE_DIR_KEY: &str = "profile_save_dir";

/// Returns the store key under which profile `label`'s image path
/// is recorded.
pub fn image_key(label: &str) -> String {
    format!("profile_{label}")
}

#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl Store {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TransectError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no store at {path:?}, starting empty");
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_entry(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn write_entry<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.entries.insert(key.into(), value.into());
    }

    /// Writes every entry back to the store's file.
    pub fn save(&self) -> Result<(), TransectError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }
}

/// Finds the chart of profile `label` the way a layout would.
///
/// Tries, in order, the recorded image path, the recorded save
/// directory, and the system temp directory. The first existing file
/// wins.
pub fn locate_image(store: &Store, label: &str) -> Result<PathBuf, TransectError> {
    let recorded = store.read_entry(&image_key(label)).map(PathBuf::from);
    let in_save_dir = store
        .read_entry(SAVE_DIR_KEY)
        .map(|dir| image_path(Path::new(dir), label));
    let in_temp = image_path(&std::env::temp_dir(), label);
    let path = recorded.clone().unwrap_or_else(|| in_temp.clone());

    if let Some(found) = recorded
        .into_iter()
        .chain(in_save_dir)
        .chain([in_temp])
        .find(|candidate| candidate.is_file())
    {
        return Ok(found);
    }

    warn!("no image for profile {label}, expected at {path:?}");
    Err(TransectError::MissingImage {
        label: label.to_owned(),
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::{image_key, locate_image, Store, SAVE_DIR_KEY};
    use crate::TransectError;

    #[test]
    fn test_open_save_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project").join("store.json");

        let mut store = Store::open(&path).unwrap();
        assert_eq!(store.read_entry(SAVE_DIR_KEY), None);
        store.write_entry(SAVE_DIR_KEY, "/srv/charts");
        store.write_entry(image_key("A-B"), "/srv/charts/profile_A-B.png");
        store.save().unwrap();

        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.read_entry(SAVE_DIR_KEY), Some("/srv/charts"));
        assert_eq!(
            reopened.read_entry("profile_A-B"),
            Some("/srv/charts/profile_A-B.png")
        );
    }

    #[test]
    fn test_open_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(Store::open(&path), Err(TransectError::Json(_))));
    }

    #[test]
    fn test_locate_image() {
        let dir = tempfile::tempdir().unwrap();
        let charts = dir.path().join("charts");
        std::fs::create_dir_all(&charts).unwrap();
        let mut store = Store::open(dir.path().join("store.json")).unwrap();

        // Recorded path.
        let recorded = dir.path().join("elsewhere.png");
        std::fs::write(&recorded, b"png").unwrap();
        store.write_entry(image_key("A-B"), recorded.to_str().unwrap());
        assert_eq!(locate_image(&store, "A-B").unwrap(), recorded);

        // Save directory fallback, for a stale recorded path.
        store.write_entry(SAVE_DIR_KEY, charts.to_str().unwrap());
        std::fs::remove_file(&recorded).unwrap();
        let in_charts = charts.join("profile_A-B.png");
        std::fs::write(&in_charts, b"png").unwrap();
        assert_eq!(locate_image(&store, "A-B").unwrap(), in_charts);

        // Label never rendered anywhere.
        let label = "QQQQ-QQQR";
        assert!(matches!(
            locate_image(&store, label),
            Err(TransectError::MissingImage { label: l, .. }) if l == label
        ));
    }
}
