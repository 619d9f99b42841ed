//! Path policy decisions. Nothing in here touches the filesystem except
//! [`Denylist::standard`], which runs once per process.

use crate::error::{Error, RejectReason, Result};
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

/// Roots whose whole subtree is off limits.
pub const DENIED_SUBTREES: &[&str] = &["/etc", "/sys", "/proc", "/dev", "/boot", "/root"];

/// Paths denied by exact match only. The filesystem root is listed here so
/// that its non-sensitive children stay reachable.
pub const DENIED_EXACT: &[&str] = &["/", "/etc/shadow", "/etc/passwd"];

static STANDARD: LazyLock<Denylist> = LazyLock::new(|| {
    let mut list = Denylist::from_parts(DENIED_EXACT.iter(), DENIED_SUBTREES.iter());
    list.add_canonical_forms();
    list
});

/// Set of denied locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denylist {
    exact: Vec<PathBuf>,
    subtrees: Vec<PathBuf>,
}

impl Denylist {
    /// The built-in denylist, including canonical spellings of each entry
    /// (e.g. `/private/etc` where `/etc` is a symlink).
    pub fn standard() -> Self {
        STANDARD.clone()
    }

    /// Build a list from explicit entries without consulting the filesystem.
    pub fn from_parts<E, S>(exact: E, subtrees: S) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<Path>,
        S: IntoIterator,
        S::Item: AsRef<Path>,
    {
        Self {
            exact: exact.into_iter().map(|p| p.as_ref().to_path_buf()).collect(),
            subtrees: subtrees
                .into_iter()
                .map(|p| p.as_ref().to_path_buf())
                .collect(),
        }
    }

    /// Add more denied subtrees.
    pub fn with_extra_subtrees<I>(mut self, roots: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        for root in roots {
            let root = root.as_ref().to_path_buf();
            if root.is_absolute() && !self.subtrees.contains(&root) {
                self.subtrees.push(root);
            }
        }
        self.add_canonical_forms();
        self
    }

    fn add_canonical_forms(&mut self) {
        let extra_exact: Vec<PathBuf> = self
            .exact
            .iter()
            .filter_map(|p| std::fs::canonicalize(p).ok())
            .filter(|c| !self.exact.contains(c))
            .collect();
        let extra_subtrees: Vec<PathBuf> = self
            .subtrees
            .iter()
            .filter_map(|p| std::fs::canonicalize(p).ok())
            .filter(|c| !self.subtrees.contains(c))
            .collect();
        self.exact.extend(extra_exact);
        self.subtrees.extend(extra_subtrees);
    }

    /// Denied subtree roots.
    pub fn subtrees(&self) -> &[PathBuf] {
        &self.subtrees
    }

    /// Return the entry that denies `path`, if any.
    pub fn matching_entry(&self, path: &Path) -> Option<&Path> {
        if let Some(hit) = self.exact.iter().find(|e| same_path_ci(path, e)) {
            return Some(hit.as_path());
        }
        self.subtrees
            .iter()
            .find(|root| starts_with_ci(path, root))
            .map(PathBuf::as_path)
    }

    /// Reject `path` if it is denied.
    pub fn check(&self, path: &Path) -> Result<()> {
        match self.matching_entry(path) {
            Some(entry) => Err(Error::rejected(
                RejectReason::Denylisted,
                format!("access to '{}' is restricted", entry.display()),
            )),
            None => Ok(()),
        }
    }
}

fn component_eq_ci(a: Component<'_>, b: Component<'_>) -> bool {
    a.as_os_str()
        .as_encoded_bytes()
        .eq_ignore_ascii_case(b.as_os_str().as_encoded_bytes())
}

fn starts_with_ci(path: &Path, root: &Path) -> bool {
    let mut path = path.components();
    for want in root.components() {
        match path.next() {
            Some(have) if component_eq_ci(have, want) => {}
            _ => return false,
        }
    }
    true
}

fn same_path_ci(a: &Path, b: &Path) -> bool {
    a.components().count() == b.components().count() && starts_with_ci(a, b)
}

/// Turn raw input into an absolute, `..`-free path without touching the
/// filesystem. Relative input is joined to `base`; `~` expands to `home`
/// when one is given. Backslashes count as separators.
pub fn normalize_lexically(raw: &str, base: &Path, home: Option<&Path>) -> Result<PathBuf> {
    if raw.trim().is_empty() {
        return Err(Error::rejected(RejectReason::Unparseable, "path is empty"));
    }
    if raw.contains('\0') {
        return Err(Error::rejected(
            RejectReason::Unparseable,
            "path contains a NUL byte",
        ));
    }

    let cleaned = raw.replace('\\', "/");
    let joined = match (home, cleaned.as_str()) {
        (Some(home), "~") => home.to_path_buf(),
        (Some(home), s) if s.starts_with("~/") => home.join(&s[2..]),
        (_, s) if s.starts_with('/') => PathBuf::from(s),
        (_, s) => base.join(s),
    };

    if !joined.is_absolute() {
        return Err(Error::rejected(
            RejectReason::Unparseable,
            format!("cannot anchor '{}' to an absolute location", raw),
        ));
    }

    let mut out = PathBuf::from("/");
    for component in joined.components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
            Component::Prefix(_) => {
                return Err(Error::rejected(
                    RejectReason::Unparseable,
                    "path prefixes are not supported",
                ))
            }
        }
    }
    Ok(out)
}

/// Whether the raw input contains a `..` component.
pub fn has_parent_component(raw: &str) -> bool {
    raw.replace('\\', "/").split('/').any(|part| part == "..")
}

/// Check that `path` is `boundary` or lies below it.
pub fn check_boundary(raw: &str, path: &Path, boundary: &Path) -> Result<()> {
    if path.starts_with(boundary) {
        return Ok(());
    }
    let reason = if has_parent_component(raw) {
        RejectReason::Traversal
    } else {
        RejectReason::OutsideBoundary
    };
    Err(Error::rejected(
        reason,
        format!("'{}' is outside '{}'", raw, boundary.display()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed() -> Denylist {
        Denylist::from_parts(DENIED_EXACT.iter(), DENIED_SUBTREES.iter())
    }

    fn reason(err: Error) -> RejectReason {
        match err {
            Error::Rejected { reason, .. } => reason,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_collapses_parent_dirs() {
        let base = Path::new("/srv/data");
        let p = normalize_lexically("a/b/../c", base, None).unwrap();
        assert_eq!(p, PathBuf::from("/srv/data/a/c"));

        let p = normalize_lexically("/tmp/../../../../etc", base, None).unwrap();
        assert_eq!(p, PathBuf::from("/etc"));
    }

    #[test]
    fn test_normalize_backslashes_and_dots() {
        let p = normalize_lexically("\\etc\\.\\passwd", Path::new("/"), None).unwrap();
        assert_eq!(p, PathBuf::from("/etc/passwd"));
    }

    #[test]
    fn test_normalize_home() {
        let home = Path::new("/home/ops");
        let p = normalize_lexically("~/scripts", Path::new("/"), Some(home)).unwrap();
        assert_eq!(p, PathBuf::from("/home/ops/scripts"));
        let p = normalize_lexically("~", Path::new("/"), Some(home)).unwrap();
        assert_eq!(p, home);
        // Without a home, `~` is an ordinary name.
        let p = normalize_lexically("~", Path::new("/x"), None).unwrap();
        assert_eq!(p, PathBuf::from("/x/~"));
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        for raw in ["", "   ", "a\0b"] {
            let err = normalize_lexically(raw, Path::new("/"), None).unwrap_err();
            assert_eq!(reason(err), RejectReason::Unparseable, "{raw:?}");
        }
    }

    #[test]
    fn test_denylist_subtrees_and_exact() {
        let list = fixed();
        assert!(list.matching_entry(Path::new("/etc")).is_some());
        assert!(list.matching_entry(Path::new("/etc/hosts")).is_some());
        assert!(list.matching_entry(Path::new("/proc/self/environ")).is_some());
        assert!(list.matching_entry(Path::new("/root/.ssh")).is_some());
        assert!(list.matching_entry(Path::new("/")).is_some());

        assert!(list.matching_entry(Path::new("/tmp")).is_none());
        assert!(list.matching_entry(Path::new("/etcetera")).is_none());
        assert!(list.matching_entry(Path::new("/home/root")).is_none());
    }

    #[test]
    fn test_denylist_ignores_ascii_case() {
        let list = fixed();
        assert!(list.matching_entry(Path::new("/ETC/passwd")).is_some());
        assert!(list.matching_entry(Path::new("/Proc")).is_some());
    }

    #[test]
    fn test_denylist_traversal_tricks_after_normalization() {
        let list = fixed();
        for raw in [
            "/tmp/../etc/shadow",
            "/tmp/./../../../../etc",
            "\\..\\..\\Etc\\passwd",
            "//etc//shadow",
            "/var/../sys/kernel",
        ] {
            let p = normalize_lexically(raw, Path::new("/tmp"), None).unwrap();
            assert_eq!(reason(list.check(&p).unwrap_err()), RejectReason::Denylisted, "{raw}");
        }
    }

    #[test]
    fn test_exact_files_without_subtree() {
        let list = Denylist::from_parts(["/etc/shadow"], Vec::<PathBuf>::new());
        assert!(list.check(Path::new("/etc/shadow")).is_err());
        assert!(list.check(Path::new("/etc/hosts")).is_ok());
    }

    #[test]
    fn test_extra_subtrees() {
        let list = fixed().with_extra_subtrees(["/srv/secret", "relative/ignored"]);
        assert!(list.check(Path::new("/srv/secret/key")).is_err());
        assert!(list.check(Path::new("/srv/public")).is_ok());
        assert!(!list.subtrees().contains(&PathBuf::from("relative/ignored")));
    }

    #[test]
    fn test_boundary_reasons() {
        let boundary = Path::new("/scripts");
        let inside = normalize_lexically("a.sh", boundary, None).unwrap();
        assert!(check_boundary("a.sh", &inside, boundary).is_ok());

        let raw = "../etc/x.sh";
        let escaped = normalize_lexically(raw, boundary, None).unwrap();
        let err = check_boundary(raw, &escaped, boundary).unwrap_err();
        assert_eq!(reason(err), RejectReason::Traversal);

        let raw = "/opt/other.sh";
        let elsewhere = normalize_lexically(raw, boundary, None).unwrap();
        let err = check_boundary(raw, &elsewhere, boundary).unwrap_err();
        assert_eq!(reason(err), RejectReason::OutsideBoundary);
    }

    #[test]
    fn test_boundary_is_component_wise() {
        let boundary = Path::new("/scripts");
        let sibling = Path::new("/scripts-old/x.sh");
        assert!(check_boundary("/scripts-old/x.sh", sibling, boundary).is_err());
    }
}
