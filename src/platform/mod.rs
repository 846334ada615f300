//! Platform-specific helpers.
//! This module hides OS differences (Unix/Windows) behind a uniform API so
//! the rest of the codebase can remain platform-agnostic.

mod temp;
#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

pub use temp::tmp_sibling_name;

#[cfg(unix)]
pub use unix::{
    atomic_write_0600, can_read_dir, can_write_dir, free_space_bytes, open_log_file_secure_append,
    set_dir_mode_0700,
};

#[cfg(not(unix))]
pub use windows::{
    atomic_write_0600, can_read_dir, can_write_dir, free_space_bytes, open_log_file_secure_append,
    set_dir_mode_0700,
};
