//! I/O helper utilities.
//!
//! Enriches io::Error with the operation, the path and a platform-aware hint so
//! failure logs and `FailureKind::CopyFailed` reasons are actionable.
//!
//! Usage:
//!   fs::read(p).map_err(io_error_with_help("read index", p))?;

use anyhow::anyhow;
use std::io;
use std::path::Path;

/// Short hint for the common failure causes seen while relocating a data tree.
fn hint_for(e: &io::Error) -> Option<&'static str> {
    #[cfg(unix)]
    {
        if let Some(code) = e.raw_os_error() {
            let hint = match code {
                libc::EACCES | libc::EPERM => Some("permission denied; check ownership and write permissions"),
                libc::ENOSPC => Some("insufficient space on device"),
                libc::EROFS => Some("read-only filesystem; cannot write here"),
                libc::EEXIST => Some("already exists; remove the target or pick another root"),
                libc::ENOENT => Some("path not found; verify it exists"),
                libc::ENAMETOOLONG => Some("filename or path too long for the destination filesystem"),
                libc::EMFILE | libc::ENFILE => Some("too many open files"),
                _ => None,
            };
            if hint.is_some() {
                return hint;
            }
        }
    }
    match e.kind() {
        io::ErrorKind::PermissionDenied => Some("permission denied; check ownership and write permissions"),
        io::ErrorKind::NotFound => Some("path not found; verify it exists"),
        io::ErrorKind::AlreadyExists => Some("already exists; remove the target or pick another root"),
        _ => None,
    }
}

/// Human-friendly "<op> '<path>': <error> (hint) [os code: N]".
pub fn describe_io(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);
    if let Some(h) = hint_for(e) {
        msg.push_str(" (");
        msg.push_str(h);
        msg.push(')');
    }
    if let Some(code) = e.raw_os_error() {
        msg.push_str(&format!(" [os code: {code}]"));
    }
    msg
}

/// Adapter for anyhow::Result code.
/// Returns a closure suitable for `.map_err(...)` that converts io::Error -> anyhow::Error.
pub fn io_error_with_help<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> anyhow::Error + 'a {
    move |e: io::Error| anyhow!(describe_io(op, path, &e))
}
