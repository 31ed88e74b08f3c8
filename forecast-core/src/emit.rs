//! Serialization targets for an [`OutputTable`](crate::table::OutputTable).
//!
//! Every file is staged in a temporary file next to its destination and only
//! moved into place once fully written, so a failed run leaves the previous
//! output untouched.

use std::{
    io::{BufWriter, Write},
    path::Path,
};

use tempfile::NamedTempFile;

use crate::error::{Result, SnapshotError};

pub mod csv_file;
pub mod html_page;

pub use csv_file::{csv_file_name, read_csv, render_csv, write_csv, write_csv_file};
pub use html_page::{HTML_FILE_NAME, render_html, write_html_file};

/// Writes `path` through a sibling temp file that replaces it on success.
pub(crate) fn write_atomically<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let tmp = NamedTempFile::new_in(dir).map_err(|e| SnapshotError::emission(path, e))?;
    keep_published_mode(tmp.as_file(), path)?;
    {
        let mut out = BufWriter::new(tmp.as_file());
        fill(&mut out)?;
        out.flush().map_err(|e| SnapshotError::emission(path, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| SnapshotError::emission(path, e))?;

    tmp.persist(path)
        .map_err(|e| SnapshotError::emission(path, e.error))?;
    Ok(())
}

/// Mode given to files that did not exist before the run.
#[cfg(unix)]
const PUBLISHED_MODE: u32 = 0o644;

/// Temp files are created owner-only; the emitted files are meant to be
/// served, so they take the mode of the file they replace, or 0644.
#[cfg(unix)]
fn keep_published_mode(tmp: &std::fs::File, path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = match std::fs::metadata(path) {
        Ok(existing) => existing.permissions().mode() & 0o7777,
        Err(_) => PUBLISHED_MODE,
    };
    tmp.set_permissions(std::fs::Permissions::from_mode(mode))
        .map_err(|e| SnapshotError::emission(path, e))
}

#[cfg(not(unix))]
fn keep_published_mode(_tmp: &std::fs::File, _path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn failed_fill_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "previous").unwrap();

        let err = write_atomically(&path, |out| {
            out.write_all(b"half a fi").unwrap();
            Err(SnapshotError::Template {
                what: "csv",
                reason: "interrupted".into(),
            })
        })
        .unwrap_err();

        assert!(err.to_string().contains("interrupted"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn successful_fill_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "previous").unwrap();

        write_atomically(&path, |out| {
            out.write_all(b"fresh")
                .map_err(|e| SnapshotError::emission("out.csv", e))
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh");
    }

    #[cfg(unix)]
    #[test]
    fn new_file_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");

        write_atomically(&path, |_| Ok(())).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn replaced_file_keeps_its_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "previous").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o664)).unwrap();

        write_atomically(&path, |out| {
            out.write_all(b"fresh")
                .map_err(|e| SnapshotError::emission("out.csv", e))
        })
        .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o664);
    }

    #[test]
    fn missing_directory_is_an_emission_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("out.csv");

        let err = write_atomically(&path, |_| Ok(())).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Emission);
    }
}
