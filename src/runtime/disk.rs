//! File system usage statistics.

use anyhow::Result;
use std::path::Path;

use super::{DiskUsage, RealRuntime};

impl RealRuntime {
    #[cfg(unix)]
    #[tracing::instrument(skip(self))]
    pub(crate) fn disk_usage_impl(&self, path: &Path) -> Result<DiskUsage> {
        use anyhow::Context;

        let stats = nix::sys::statvfs::statvfs(path)
            .with_context(|| format!("Failed to stat file system at {:?}", path))?;

        Ok(DiskUsage {
            free_blocks: stats.blocks_free() as u64,
            total_blocks: stats.blocks() as u64,
        })
    }

    #[cfg(not(unix))]
    #[tracing::instrument(skip(self))]
    pub(crate) fn disk_usage_impl(&self, path: &Path) -> Result<DiskUsage> {
        anyhow::bail!("Disk usage is not supported on this platform ({:?})", path)
    }
}
