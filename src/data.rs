// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Loads every record in a data directory.
//!
//! A data directory holds any number of `.txt` files in the format read by
//! [`store`](crate::store). Files are read in name order and their records
//! concatenated, so a CV can be split into `01-jobs.txt`, `02-pubs.txt`, and
//! so on. Dot-files and files with other extensions are ignored.

use crate::record::Record;
use crate::store;
use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// An error loading a data directory.
#[derive(Debug, Error)]
pub enum Error {
    /// The directory did not contain any records.
    #[error("no data found in {}", .0.display())]
    NoData(PathBuf),

    /// The directory could not be listed.
    #[error("cannot read directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A data file could not be read or parsed.
    #[error("{}: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: store::Error,
    },
}

/// The result of loading data.
pub type Result<T> = std::result::Result<T, Error>;

/// Lists the data files in `dir`, sorted by name.
pub fn list_data_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let directory_error = |source| Error::Directory {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(directory_error)? {
        let entry = entry.map_err(directory_error)?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            debug!("Skipping non-UTF-8 file name {:?}", entry.file_name());
            continue;
        };
        if name.starts_with('.') || !name.ends_with(".txt") {
            continue;
        }
        files.push(entry.path());
    }

    files.sort();
    Ok(files)
}

/// Loads all the records in `dir`.
///
/// Fails with [`Error::NoData`] if there are no data files or the data files
/// hold no records.
pub fn load(dir: impl AsRef<Path>) -> Result<Vec<Record>> {
    let dir = dir.as_ref();
    let files = list_data_files(dir)?;

    let mut records = Vec::new();
    for path in files {
        let store_error = |source| Error::Store {
            path: path.clone(),
            source,
        };
        let before = records.len();
        for record in store::read(&path).map_err(store_error)? {
            records.push(record.map_err(store_error)?);
        }
        debug!("Loaded {} records from {}", records.len() - before, path.display());
    }

    if records.is_empty() {
        return Err(Error::NoData(dir.to_path_buf()));
    }

    info!("Loaded {} records from {}", records.len(), dir.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::do_logging;
    use pretty_assertions::assert_eq;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn it_lists_only_visible_text_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.txt", "");
        write(dir.path(), "a.txt", "");
        write(dir.path(), ".hidden.txt", "");
        write(dir.path(), "notes.md", "");
        write(dir.path(), "c.txt~", "");

        let files = list_data_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.txt"), dir.path().join("b.txt")]
        );
    }

    #[test]
    fn it_concatenates_records_in_file_order() {
        do_logging();

        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "02-pubs.txt", "[pub]\ntitle = Second\n");
        write(dir.path(), "01-jobs.txt", "[job]\ntitle = First\n\n[job]\ntitle = Also first\n");

        let records = load(dir.path()).unwrap();
        let titles: Vec<&str> = records.iter().filter_map(|r| r.get("title")).collect();
        assert_eq!(titles, vec!["First", "Also first", "Second"]);
        assert_eq!(records[2].section(), "pub");
    }

    #[test]
    fn it_fails_on_a_directory_without_data_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "README", "[pub]\n");

        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NoData(_)), "{err:?}");
    }

    #[test]
    fn it_fails_on_data_files_without_records() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "empty.txt", "# nothing here yet\n\n");

        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NoData(_)), "{err:?}");
    }

    #[test]
    fn it_names_the_file_with_bad_data() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good.txt", "[pub]\ntitle = Fine\n");
        write(dir.path(), "oops.txt", "title = no section\n");

        let err = load(dir.path()).unwrap_err();
        match err {
            Error::Store { path, source } => {
                assert_eq!(path, dir.path().join("oops.txt"));
                assert!(
                    matches!(source, store::Error::KeyWithoutSection { line: 1, .. }),
                    "{source:?}"
                );
            }
            err => panic!("unexpected error: {err:?}"),
        }
    }

    #[test]
    fn it_fails_on_a_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, Error::Directory { .. }), "{err:?}");
    }
}
