//! Config validation.
//! Checks that a migration request can be formed: required fields present, a
//! single-component data folder name, and roots that neither coincide nor nest
//! inside each other's data folder. Existence and permissions are left to the
//! availability check so they surface as run failures.

use anyhow::Result;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::errors::MigrateError;
use crate::migration::MigrationRequest;

use super::types::Config;

fn invalid(msg: String) -> anyhow::Error {
    MigrateError::Config(msg).into()
}

fn real(p: &Path) -> PathBuf {
    dunce::canonicalize(p).unwrap_or_else(|_| p.to_path_buf())
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let source = self.source_root.as_deref().ok_or_else(|| invalid("source_root is not set".into()))?;
        let target = self.target_root.as_deref().ok_or_else(|| invalid("target_root is not set".into()))?;
        if self.user.as_deref().is_none_or(str::is_empty) {
            return Err(invalid("user is not set".into()));
        }

        let mut comps = Path::new(&self.data_folder).components();
        match (comps.next(), comps.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => {
                return Err(invalid(format!(
                    "data_folder must be a single folder name, got '{}'",
                    self.data_folder
                )));
            }
        }

        if self.sync_poll_interval.is_zero() {
            return Err(invalid("sync_poll_interval_ms must be greater than zero".into()));
        }

        let src = real(source);
        let dst = real(target);
        if src == dst {
            return Err(invalid(format!("source_root and target_root are the same path: '{}'", src.display())));
        }
        if dst.starts_with(src.join(&self.data_folder)) {
            return Err(invalid(format!(
                "target_root '{}' must not be inside the source data folder",
                dst.display()
            )));
        }
        if src.starts_with(dst.join(&self.data_folder)) {
            return Err(invalid(format!(
                "source_root '{}' must not be inside the target data folder",
                src.display()
            )));
        }

        debug!(source = %source.display(), target = %target.display(), "config validated");
        Ok(())
    }

    /// Validate and build the request for one run.
    pub fn request(&self) -> Result<MigrationRequest> {
        self.validate()?;
        let (Some(source), Some(target), Some(user)) = (&self.source_root, &self.target_root, &self.user) else {
            return Err(invalid("incomplete configuration".into()));
        };
        Ok(MigrationRequest::new(source, target, self.data_folder.clone(), user.clone()).with_scope(self.scope()))
    }
}
