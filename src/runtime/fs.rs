//! File system reads.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn read_to_string_impl(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{RealRuntime, Runtime};
    use tempfile::tempdir;

    #[test]
    fn test_read_to_string() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("version_label");
        std::fs::write(&path, "release-42\n").unwrap();

        let runtime = RealRuntime;
        assert_eq!(runtime.read_to_string(&path).unwrap(), "release-42\n");
    }

    #[test]
    fn test_read_to_string_missing_file() {
        let dir = tempdir().unwrap();
        let runtime = RealRuntime;
        let err = runtime
            .read_to_string(&dir.path().join("missing"))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
