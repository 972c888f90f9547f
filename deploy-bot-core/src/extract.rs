//! Pulls data files out of a downloaded repository archive.
//!
//! GitHub zipballs wrap the tree in a single `<owner>-<repo>-<sha>/` folder.
//! That folder is stripped so the data directory mirrors the repository root.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::ExtractError;

/// File extensions merged into the place file.
pub const DATA_EXTENSIONS: &[&str] = &["json", "lua", "luau", "txt", "csv"];

/// True when the file name carries one of [`DATA_EXTENSIONS`] as its real
/// extension. `notes.json.bak` and a bare `.json` do not match.
pub fn is_data_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| DATA_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Extracts every data file in `archive` into `target`, returning the written
/// paths relative to `target`, sorted. Anything else in the archive is skipped.
///
/// `target` is emptied first, so it only ever holds files from `archive`.
pub fn extract_data_files(archive: &Path, target: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let zip_err = |source| ExtractError::Zip {
        path: archive.to_path_buf(),
        source,
    };

    let file = File::open(archive).map_err(|source| ExtractError::Io {
        path: archive.to_path_buf(),
        source,
    })?;
    let mut zip = ZipArchive::new(file).map_err(zip_err)?;

    let target_err = |source| ExtractError::Io {
        path: target.to_path_buf(),
        source,
    };
    match fs::remove_dir_all(target) {
        Ok(()) => debug!(target = %target.display(), "Cleared previous data files"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(target_err(e)),
    }
    fs::create_dir_all(target).map_err(target_err)?;

    let entries: Vec<PathBuf> = (0..zip.len())
        .map(|i| {
            zip.by_index(i)
                .map(|entry| entry.enclosed_name().unwrap_or_default())
        })
        .collect::<Result<_, _>>()
        .map_err(zip_err)?;
    let wrapper = common_wrapper(&entries);
    debug!(entries = entries.len(), wrapper = ?wrapper, "Scanned archive");

    let mut written = Vec::new();
    for (index, name) in entries.iter().enumerate() {
        // `enclosed_name` yields an empty path for entries escaping the root.
        if name.as_os_str().is_empty() || !is_data_file(name) {
            continue;
        }
        let relative = match &wrapper {
            Some(root) => match name.strip_prefix(root) {
                Ok(rest) => rest.to_path_buf(),
                Err(_) => name.clone(),
            },
            None => name.clone(),
        };
        if relative.as_os_str().is_empty() {
            continue;
        }

        let mut entry = zip.by_index(index).map_err(zip_err)?;
        if entry.is_dir() {
            continue;
        }

        let out_path = target.join(&relative);
        let io_err = |source| ExtractError::Io {
            path: out_path.clone(),
            source,
        };
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut out = File::create(&out_path).map_err(io_err)?;
        io::copy(&mut entry, &mut out).map_err(io_err)?;

        debug!(file = %relative.display(), "Extracted data file");
        written.push(relative);
    }

    written.sort();
    info!(
        archive = %archive.display(),
        target = %target.display(),
        count = written.len(),
        "Extracted data files"
    );
    Ok(written)
}

/// The single top-level directory shared by every entry, if there is one.
fn common_wrapper(entries: &[PathBuf]) -> Option<PathBuf> {
    let mut wrapper: Option<&std::ffi::OsStr> = None;
    let mut has_nested = false;
    for name in entries.iter().filter(|n| !n.as_os_str().is_empty()) {
        let mut components = name.components();
        let first = match components.next() {
            Some(Component::Normal(first)) => first,
            _ => return None,
        };
        match wrapper {
            None => wrapper = Some(first),
            Some(existing) if existing != first => return None,
            Some(_) => {}
        }
        has_nested |= components.next().is_some();
    }
    // A lone file at the root is not a wrapper.
    if has_nested {
        wrapper.map(PathBuf::from)
    } else {
        None
    }
}
