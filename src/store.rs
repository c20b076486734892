//! Default-contacts store: a JSON array of contact records in the per-user
//! data directory. A missing file is expected (first run), not an error.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::BaseDirs;

use crate::contact::Contact;

const APP_NAME: &str = "labeldex";
const STORE_FILE_NAME: &str = "contacts.json";

/// Resolve the store path, honoring a `--data-dir` override.
pub fn store_path(data_dir: Option<&Path>) -> Result<PathBuf> {
    let dir = match data_dir {
        Some(dir) => dir.to_path_buf(),
        None => {
            let base = BaseDirs::new().context("unable to determine base directories")?;
            base.data_dir().join(APP_NAME)
        }
    };
    Ok(dir.join(STORE_FILE_NAME))
}

/// Load the stored contacts. `Ok(None)` means no store exists yet.
pub fn load(path: &Path) -> Result<Option<Vec<Contact>>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read contact store at {}", path.display()))?;
    let contacts: Vec<Contact> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse contact store at {}", path.display()))?;
    Ok(Some(contacts))
}

/// Write the contacts back, creating the data directory as needed.
pub fn save(path: &Path, contacts: &[Contact]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create data dir: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(contacts)?;
    fs::write(path, json)
        .with_context(|| format!("failed to write contact store at {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::parse_contact;
    use tempfile::TempDir;

    #[test]
    fn missing_store_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let path = store_path(Some(dir.path())).unwrap();
        assert!(load(&path).unwrap().is_none());
    }

    #[test]
    fn round_trips_contacts() {
        let dir = TempDir::new().unwrap();
        let path = store_path(Some(dir.path())).unwrap();

        let contacts = vec![
            parse_contact("Jane Doe\n123 Main St\nSpringfield IL 62701").unwrap(),
            parse_contact("The Johnson Family\n9 Oak Ln").unwrap(),
        ];
        save(&path, &contacts).unwrap();

        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded, contacts);
        assert_eq!(loaded[1].sort_key, "JOHNSON");
    }

    #[test]
    fn corrupt_store_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = store_path(Some(dir.path())).unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();
        assert!(load(&path).is_err());
    }
}
