use crate::error::{Result, StoreError};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "dimicall";
const DB_FILENAME: &str = "dimicall.sqlite3";

/// `$XDG_DATA_HOME/dimicall`, falling back to `~/.local/share/dimicall`.
pub fn data_dir() -> Result<PathBuf> {
    match env::var_os("XDG_DATA_HOME") {
        Some(dir) if dir.is_empty() => Err(StoreError::InvalidDataPath(PathBuf::from(dir))),
        Some(dir) => Ok(PathBuf::from(dir).join(APP_DIR)),
        None => {
            let home = dirs::home_dir().ok_or(StoreError::MissingHomeDir)?;
            Ok(home.join(".local").join("share").join(APP_DIR))
        }
    }
}

pub fn ensure_data_dir() -> Result<PathBuf> {
    let dir = data_dir()?;
    fs::create_dir_all(&dir)?;
    restrict_dir_permissions(&dir)?;
    Ok(dir)
}

/// The database file to open: `explicit` when given, the default location otherwise.
pub fn resolve_db_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) if path.as_os_str().is_empty() => {
            Err(StoreError::InvalidDataPath(path.to_path_buf()))
        }
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(db_path_in(&ensure_data_dir()?)),
    }
}

pub fn db_path_in(dir: &Path) -> PathBuf {
    dir.join(DB_FILENAME)
}

#[cfg(unix)]
fn restrict_dir_permissions(dir: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_dir_permissions(_dir: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{db_path_in, resolve_db_path};
    use crate::error::StoreError;
    use std::path::Path;

    #[test]
    fn explicit_path_wins() {
        let path = resolve_db_path(Some(Path::new("/tmp/contacts.sqlite3"))).unwrap();
        assert_eq!(path, Path::new("/tmp/contacts.sqlite3"));
    }

    #[test]
    fn empty_explicit_path_is_rejected() {
        let err = resolve_db_path(Some(Path::new(""))).unwrap_err();
        assert!(matches!(err, StoreError::InvalidDataPath(_)));
    }

    #[test]
    fn db_file_lives_in_the_data_dir() {
        assert_eq!(
            db_path_in(Path::new("/data")),
            Path::new("/data/dimicall.sqlite3")
        );
    }
}
