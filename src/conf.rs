//! Environment and configuration utilities.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// The environment variable holding extra template directories.
pub const TEMPLATES_VAR: &str = "VITAE_TEMPLATES";

/// The template directory that is always searched last, relative to the
/// working directory.
pub const DEFAULT_TEMPLATES: &str = "templates";

/// Returns the directories in which templates are looked up, in order.
///
/// Directories named in `$VITAE_TEMPLATES` (separated like `$PATH`) come
/// first, followed by `./templates`.
pub fn template_dirs() -> Vec<PathBuf> {
    template_dirs_from(env::var_os(TEMPLATES_VAR).as_deref())
}

/// Like [`template_dirs()`], but reads the directory list from `value`
/// instead of the environment.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use vitae::conf::template_dirs_from;
/// assert_eq!(template_dirs_from(None), vec![PathBuf::from("templates")]);
/// ```
pub fn template_dirs_from(value: Option<&OsStr>) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = value
        .map(|value| {
            env::split_paths(value)
                .filter(|path| !path.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default();
    dirs.push(PathBuf::from(DEFAULT_TEMPLATES));
    dirs
}

/// Finds a template file by name in the first directory that has it.
///
/// A `name` containing a path separator is taken as a path in its own right
/// and is only returned if it exists.
pub fn find_template(dirs: &[PathBuf], name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    if path.components().count() > 1 || path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }

    dirs.iter()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::fs;

    #[test]
    fn it_searches_configured_directories_first() {
        let value = env::join_paths(["/a/templates", "/b/templates"]).unwrap();
        let dirs = template_dirs_from(Some(&value));
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/a/templates"),
                PathBuf::from("/b/templates"),
                PathBuf::from("templates"),
            ]
        );
    }

    #[test]
    fn it_ignores_an_empty_variable() {
        let dirs = template_dirs_from(Some(&OsString::new()));
        assert_eq!(dirs, vec![PathBuf::from("templates")]);
    }

    #[test]
    fn it_finds_templates_in_search_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(second.path().join("cv.tex"), "second").unwrap();
        fs::write(second.path().join("pubs.html"), "second").unwrap();
        fs::write(first.path().join("pubs.html"), "first").unwrap();

        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        assert_eq!(
            find_template(&dirs, "cv.tex"),
            Some(second.path().join("cv.tex"))
        );
        assert_eq!(
            find_template(&dirs, "pubs.html"),
            Some(first.path().join("pubs.html"))
        );
        assert_eq!(find_template(&dirs, "missing.txt"), None);
    }

    #[test]
    fn it_accepts_explicit_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.tex");
        fs::write(&path, "").unwrap();

        let name = path.to_str().unwrap();
        assert_eq!(find_template(&[], name), Some(path.clone()));
        assert_eq!(find_template(&[], &format!("{name}.missing")), None);
    }
}
