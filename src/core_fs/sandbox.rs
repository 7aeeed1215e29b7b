use crate::core_error::FtpError;
use log::{debug, warn};
use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Maps client paths onto a directory tree and refuses anything that would
/// land outside of it.
#[derive(Debug, Clone)]
pub struct PathSandbox {
    root: PathBuf,
}

/// A client path after sandbox resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Real filesystem location, always at or below the sandbox root.
    pub absolute: PathBuf,
    /// The same location as the client sees it, e.g. `/music/a.mp3`.
    pub virtual_path: String,
}

impl ResolvedPath {
    pub fn is_root(&self) -> bool {
        self.virtual_path == "/"
    }
}

impl PathSandbox {
    pub fn new(root: &Path) -> io::Result<Self> {
        let root = root.canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("sandbox root is not a directory: {:?}", root),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `requested` against the sandbox.
    ///
    /// Absolute requests start at the sandbox root, relative ones at
    /// `current_dir` (a virtual path). `.` and `..` are folded lexically, then
    /// the longest existing prefix is canonicalized so symlinks are followed
    /// before the containment check. The path does not have to exist, which
    /// lets STOR and MKD name new entries.
    pub fn resolve(&self, requested: &str, current_dir: &str) -> Result<ResolvedPath, FtpError> {
        let relative = normalize(requested, current_dir)?;
        let candidate = self.root.join(&relative);

        let absolute = self.canonicalize_existing_prefix(&candidate, requested)?;
        if !absolute.starts_with(&self.root) {
            warn!(
                "Rejected path {:?}: resolves outside of the root to {:?}",
                requested, absolute
            );
            return Err(FtpError::PathEscape(requested.to_string()));
        }

        let virtual_path = self.to_virtual(&absolute);
        debug!("Resolved {:?} to {:?} ({})", requested, absolute, virtual_path);
        Ok(ResolvedPath {
            absolute,
            virtual_path,
        })
    }

    fn canonicalize_existing_prefix(
        &self,
        candidate: &Path,
        requested: &str,
    ) -> Result<PathBuf, FtpError> {
        let escape = || FtpError::PathEscape(requested.to_string());

        let mut existing = candidate;
        let mut missing: Vec<OsString> = Vec::new();
        loop {
            match existing.canonicalize() {
                Ok(mut resolved) => {
                    for part in missing.iter().rev() {
                        resolved.push(part);
                    }
                    return Ok(resolved);
                }
                Err(_) => {
                    // Present but not canonicalizable means a dangling symlink;
                    // following it on create could write anywhere.
                    if existing.symlink_metadata().is_ok() {
                        warn!("Rejected path {:?}: dangling symlink {:?}", requested, existing);
                        return Err(escape());
                    }
                    missing.push(existing.file_name().ok_or_else(escape)?.to_os_string());
                    existing = existing.parent().ok_or_else(escape)?;
                }
            }
        }
    }

    fn to_virtual(&self, absolute: &Path) -> String {
        let relative = absolute.strip_prefix(&self.root).unwrap_or(Path::new(""));
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        format!("/{}", parts.join("/"))
    }
}

/// Folds the request into a root-relative path. Climbing above the virtual
/// root is an escape, not a clamp.
fn normalize(requested: &str, current_dir: &str) -> Result<PathBuf, FtpError> {
    let escape = || FtpError::PathEscape(requested.to_string());

    let joined = if requested.starts_with('/') || requested.starts_with('\\') {
        requested.to_string()
    } else {
        format!("{}/{}", current_dir, requested)
    };

    let mut parts: Vec<&str> = Vec::new();
    for segment in joined.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop().ok_or_else(escape)?;
            }
            part => {
                if part.contains('\0') {
                    return Err(escape());
                }
                parts.push(part);
            }
        }
    }

    let relative: PathBuf = parts.iter().collect();
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return Err(escape());
    }
    Ok(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sandbox() -> (tempfile::TempDir, PathSandbox) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pub/music")).unwrap();
        fs::write(dir.path().join("pub/readme.txt"), b"hello").unwrap();
        let sandbox = PathSandbox::new(dir.path()).unwrap();
        (dir, sandbox)
    }

    #[test]
    fn test_relative_and_absolute_requests() {
        let (_dir, sandbox) = sandbox();

        let rel = sandbox.resolve("music", "/pub").unwrap();
        assert_eq!(rel.virtual_path, "/pub/music");
        assert!(rel.absolute.starts_with(sandbox.root()));
        assert!(rel.absolute.is_dir());

        let abs = sandbox.resolve("/pub/readme.txt", "/pub/music").unwrap();
        assert_eq!(abs.virtual_path, "/pub/readme.txt");
        assert!(abs.absolute.is_file());
    }

    #[test]
    fn test_dot_segments_are_folded() {
        let (_dir, sandbox) = sandbox();

        let resolved = sandbox.resolve("./music/../readme.txt", "/pub").unwrap();
        assert_eq!(resolved.virtual_path, "/pub/readme.txt");

        let root = sandbox.resolve("..", "/pub").unwrap();
        assert!(root.is_root());
        assert_eq!(root.absolute, sandbox.root());
    }

    #[test]
    fn test_parent_traversal_is_rejected() {
        let (_dir, sandbox) = sandbox();

        for request in ["../../etc/passwd", "..", "/../etc", "pub/../../x", "..\\..\\windows"] {
            assert!(
                matches!(sandbox.resolve(request, "/"), Err(FtpError::PathEscape(_))),
                "{} should escape",
                request
            );
        }
        assert!(matches!(
            sandbox.resolve("../../../etc/passwd", "/pub/music"),
            Err(FtpError::PathEscape(_))
        ));
    }

    #[test]
    fn test_absolute_paths_stay_inside_root() {
        let (_dir, sandbox) = sandbox();

        let resolved = sandbox.resolve("/etc/passwd", "/").unwrap();
        assert!(resolved.absolute.starts_with(sandbox.root()));
        assert_eq!(resolved.virtual_path, "/etc/passwd");
        assert!(!resolved.absolute.exists());
    }

    #[test]
    fn test_missing_targets_resolve_below_existing_parent() {
        let (_dir, sandbox) = sandbox();

        let resolved = sandbox.resolve("new/deeper/file.bin", "/pub").unwrap();
        assert_eq!(resolved.virtual_path, "/pub/new/deeper/file.bin");
        assert_eq!(
            resolved.absolute,
            sandbox.root().join("pub/new/deeper/file.bin")
        );
    }

    #[test]
    fn test_nul_byte_is_rejected() {
        let (_dir, sandbox) = sandbox();
        assert!(matches!(
            sandbox.resolve("bad\0name", "/"),
            Err(FtpError::PathEscape(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_outside_root_is_rejected() {
        let (dir, sandbox) = sandbox();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.txt"), b"secret").unwrap();

        std::os::unix::fs::symlink(outside.path(), dir.path().join("pub/escape")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            dir.path().join("pub/secret-link"),
        )
        .unwrap();

        assert!(matches!(
            sandbox.resolve("escape/secret.txt", "/pub"),
            Err(FtpError::PathEscape(_))
        ));
        assert!(matches!(
            sandbox.resolve("/pub/secret-link", "/"),
            Err(FtpError::PathEscape(_))
        ));
        assert!(matches!(
            sandbox.resolve("escape/new-file", "/pub"),
            Err(FtpError::PathEscape(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_inside_root_is_followed() {
        let (dir, sandbox) = sandbox();
        std::os::unix::fs::symlink(dir.path().join("pub/music"), dir.path().join("tunes"))
            .unwrap();

        let resolved = sandbox.resolve("/tunes", "/").unwrap();
        assert_eq!(resolved.virtual_path, "/pub/music");
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_rejected() {
        let (dir, sandbox) = sandbox();
        std::os::unix::fs::symlink("/tmp/lanftpd-does-not-exist", dir.path().join("dangling"))
            .unwrap();

        assert!(matches!(
            sandbox.resolve("dangling", "/"),
            Err(FtpError::PathEscape(_))
        ));
    }

    #[test]
    fn test_root_must_be_a_directory() {
        let (dir, _sandbox) = sandbox();
        assert!(PathSandbox::new(&dir.path().join("pub/readme.txt")).is_err());
        assert!(PathSandbox::new(&dir.path().join("missing")).is_err());
    }
}
