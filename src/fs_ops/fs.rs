//! Filesystem seam used by the migration workflow.
//!
//! Every primitive is fallible and path based so the checker, copier and cleaner
//! can run against the real disk (`StdFs`) or a fault-injecting wrapper in tests.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::platform;

/// What a directory entry is, without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    /// Sockets, FIFOs, devices.
    Other,
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Filesystem primitives the migration needs.
pub trait Filesystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    /// Kind of `path` itself (symlinks not followed); `None` when absent.
    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>>;
    fn can_read(&self, path: &Path) -> bool;
    fn can_write(&self, path: &Path) -> bool;
    fn free_space(&self, path: &Path) -> io::Result<u64>;
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<Entry>>;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    /// Copy file contents; never clobbers an existing `dst`. Returns bytes copied.
    fn copy_file(&self, src: &Path, dst: &Path) -> io::Result<u64>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    /// Remove an empty directory.
    fn remove_dir(&self, path: &Path) -> io::Result<()>;
    /// Target of the symlink at `path`.
    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }
    /// Total size in bytes of regular files under `root`, including files
    /// reached through a symlink (0 when absent).
    fn tree_size(&self, root: &Path) -> io::Result<u64>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFs;

impl Filesystem for StdFs {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        match fs::symlink_metadata(path) {
            Ok(meta) => Ok(Some(kind_of(meta.file_type()))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn can_read(&self, path: &Path) -> bool {
        platform::can_read_dir(path)
    }

    fn can_write(&self, path: &Path) -> bool {
        platform::can_write_dir(path)
    }

    fn free_space(&self, path: &Path) -> io::Result<u64> {
        platform::free_space_bytes(path)
    }

    fn list_entries(&self, dir: &Path) -> io::Result<Vec<Entry>> {
        let mut out = Vec::new();
        for ent in fs::read_dir(dir)? {
            let ent = ent?;
            let kind = kind_of(ent.file_type()?);
            out.push(Entry { path: ent.path(), kind });
        }
        // Stable order keeps logs and failure points reproducible.
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn copy_file(&self, src: &Path, dst: &Path) -> io::Result<u64> {
        copy_streaming(src, dst)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }

    fn tree_size(&self, root: &Path) -> io::Result<u64> {
        if fs::symlink_metadata(root).is_err() {
            return Ok(0);
        }
        let mut total: u64 = 0;
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry.map_err(io::Error::from)?;
            let ft = entry.file_type();
            if ft.is_file() {
                total = total.saturating_add(entry.metadata().map_err(io::Error::from)?.len());
            } else if ft.is_symlink()
                && let Ok(target) = fs::metadata(entry.path())
                && target.is_file()
            {
                // The copier writes the contents of symlinked files.
                total = total.saturating_add(target.len());
            }
        }
        Ok(total)
    }
}

fn kind_of(ft: fs::FileType) -> EntryKind {
    if ft.is_symlink() {
        EntryKind::Symlink
    } else if ft.is_dir() {
        EntryKind::Dir
    } else if ft.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    }
}

/// Copy `src` -> `dst` with 1 MiB buffers, then fsync the destination.
/// `dst` is opened with `create_new` so an existing file is never overwritten.
fn copy_streaming(src: &Path, dst: &Path) -> io::Result<u64> {
    const BUF_SIZE: usize = 1024 * 1024;

    let input = File::open(src)?;
    let output = OpenOptions::new().write(true).create_new(true).open(dst)?;

    let mut reader = BufReader::with_capacity(BUF_SIZE, input);
    let mut writer = BufWriter::with_capacity(BUF_SIZE, output);
    let mut buf = vec![0u8; BUF_SIZE];
    let mut total: u64 = 0;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    writer.flush()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(total)
}
