//! Executable lookup.

use std::env;
use std::path::{Path, PathBuf};

/// Usual `sadc` locations, checked in order.
pub const SADC_CANDIDATES: &[&str] = &[
    "/usr/lib/sysstat/sadc", // Debian/Ubuntu
    "/usr/lib/sa/sadc",      // Arch
    "/usr/lib64/sa/sadc",    // RHEL/CentOS
    "/usr/libexec/sa/sadc",  // Fedora
];

/// Returns `true` if `path` is a regular file the current user may execute.
pub fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = path.metadata() else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Resolves `name` through the `PATH` environment variable.
///
/// Names containing a path separator are checked as-is.
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    if name.contains('/') {
        let path = PathBuf::from(name);
        return is_executable(&path).then_some(path);
    }

    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

/// Finds `sadc`, which normally lives outside `PATH`.
pub fn find_sadc() -> Option<PathBuf> {
    SADC_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| is_executable(p))
        .or_else(|| find_in_path("sadc"))
}
