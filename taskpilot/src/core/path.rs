//! Lexical confinement of caller-supplied paths to the data root.

use std::path::{Component, Path, PathBuf};

/// Why a caller path was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathViolation {
    #[error("path is empty")]
    Empty,
    #[error("path '{0}' is outside the data root")]
    OutsideRoot(String),
    #[error("path '{0}' contains a parent-directory component")]
    ParentComponent(String),
}

/// Return `requested` as a path relative to `root`.
///
/// Relative paths are taken as-is. Absolute paths are accepted only when they
/// already sit under `root`. Any `..` component is refused, so the result can
/// be joined onto `root` without escaping it lexically.
///
/// The check never touches the filesystem, so symlinks are not resolved: a
/// link under `root` that points elsewhere is still accepted.
pub fn relative_under_root(root: &Path, requested: &str) -> Result<PathBuf, PathViolation> {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return Err(PathViolation::Empty);
    }
    let requested_path = Path::new(trimmed);
    let relative = if requested_path.is_absolute() {
        requested_path
            .strip_prefix(root)
            .map_err(|_| PathViolation::OutsideRoot(trimmed.to_string()))?
    } else {
        requested_path
    };

    let mut clean = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir => return Err(PathViolation::ParentComponent(trimmed.to_string())),
            Component::RootDir | Component::Prefix(_) => {
                return Err(PathViolation::OutsideRoot(trimmed.to_string()));
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(PathViolation::Empty);
    }
    Ok(clean)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/data")
    }

    #[test]
    fn relative_path_is_kept() {
        assert_eq!(
            relative_under_root(&root(), "docs/index.json"),
            Ok(PathBuf::from("docs/index.json"))
        );
    }

    #[test]
    fn cur_dir_components_are_dropped() {
        assert_eq!(
            relative_under_root(&root(), "./logs/./a.log"),
            Ok(PathBuf::from("logs/a.log"))
        );
    }

    #[test]
    fn absolute_path_under_root_is_accepted() {
        assert_eq!(
            relative_under_root(&root(), "/data/format.md"),
            Ok(PathBuf::from("format.md"))
        );
    }

    #[test]
    fn absolute_path_elsewhere_is_refused() {
        assert_eq!(
            relative_under_root(&root(), "/etc/passwd"),
            Err(PathViolation::OutsideRoot("/etc/passwd".to_string()))
        );
    }

    /// `/database` shares a string prefix with `/data` but is a different directory.
    #[test]
    fn sibling_with_common_prefix_is_refused() {
        assert!(matches!(
            relative_under_root(&root(), "/database/x"),
            Err(PathViolation::OutsideRoot(_))
        ));
    }

    #[test]
    fn parent_components_are_refused() {
        assert!(matches!(
            relative_under_root(&root(), "../etc/passwd"),
            Err(PathViolation::ParentComponent(_))
        ));
        assert!(matches!(
            relative_under_root(&root(), "/data/logs/../../etc"),
            Err(PathViolation::ParentComponent(_))
        ));
    }

    /// Only the spelling of the path is inspected.
    #[test]
    fn symlink_names_are_not_followed() {
        assert_eq!(
            relative_under_root(&root(), "/data/link-to-etc/passwd"),
            Ok(PathBuf::from("link-to-etc/passwd"))
        );
    }

    #[test]
    fn empty_and_root_only_are_refused() {
        assert_eq!(relative_under_root(&root(), " "), Err(PathViolation::Empty));
        assert_eq!(relative_under_root(&root(), "/data"), Err(PathViolation::Empty));
        assert_eq!(relative_under_root(&root(), "."), Err(PathViolation::Empty));
    }
}
