//! Relative paths and document identifiers.
//!
//! Every path handed to the workspace is relative to a root (the frames
//! or datasets directory). Anything that would resolve outside that root
//! is rejected before touching the disk.

use crate::errors::{WorkspaceError, WorkspaceResult};
use std::path::{Component, Path, PathBuf};

/// Join `relative` onto `root`, refusing absolute paths and `..`
pub fn resolve_within(root: &Path, relative: &str) -> WorkspaceResult<PathBuf> {
    let mut resolved = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(WorkspaceError::Traversal(relative.to_string()));
            }
        }
    }
    Ok(resolved)
}

/// `<folder>/<name>.json`, or `<name>.json` at the root
pub fn document_identifier(folder: &str, name: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        format!("{}.json", name)
    } else {
        format!("{}/{}.json", folder, name)
    }
}

/// Same relative path with its extension swapped for `.json`
pub(crate) fn with_json_extension(relative: &str) -> String {
    Path::new(relative)
        .with_extension("json")
        .to_string_lossy()
        .replace('\\', "/")
}

/// Folder part and file stem of a relative path
pub(crate) fn split_relative(relative: &str) -> (Vec<String>, String) {
    let path = Path::new(relative);
    let folders = path
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    (folders, stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_within_root() {
        let root = Path::new("/data/frames");
        assert_eq!(
            resolve_within(root, "street/0001/f1.png").unwrap(),
            PathBuf::from("/data/frames/street/0001/f1.png")
        );
        assert_eq!(resolve_within(root, "./street").unwrap(), PathBuf::from("/data/frames/street"));
        assert_eq!(resolve_within(root, "").unwrap(), PathBuf::from("/data/frames"));
    }

    #[test]
    fn test_traversal_rejected() {
        let root = Path::new("/data/frames");
        for bad in ["../secrets", "street/../../etc", "/etc/passwd"] {
            assert!(
                matches!(resolve_within(root, bad), Err(WorkspaceError::Traversal(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_document_identifier() {
        assert_eq!(document_identifier("street/0001", "f1"), "street/0001/f1.json");
        assert_eq!(document_identifier("street/", "f1"), "street/f1.json");
        assert_eq!(document_identifier("", "f1"), "f1.json");
    }

    #[test]
    fn test_json_extension_and_split() {
        assert_eq!(with_json_extension("street/0001/f1.png"), "street/0001/f1.json");
        assert_eq!(with_json_extension("f1.PNG"), "f1.json");

        let (folders, stem) = split_relative("street/0001/f1.png");
        assert_eq!(folders, vec!["street".to_string(), "0001".to_string()]);
        assert_eq!(stem, "f1");

        let (folders, stem) = split_relative("f1.png");
        assert!(folders.is_empty());
        assert_eq!(stem, "f1");
    }
}
