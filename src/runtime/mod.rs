//! Runtime abstraction for system operations.
//!
//! This module provides a trait-based abstraction over the few system
//! operations the crate needs, enabling dependency injection and testability.
//!
//! # Structure
//!
//! - `env` - Environment variables
//! - `fs` - File reads
//! - `disk` - File system usage statistics

mod disk;
mod env;
mod fs;

use anyhow::Result;
use std::env as std_env;
use std::path::Path;

/// Block counts for the file system holding a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    pub free_blocks: u64,
    pub total_blocks: u64,
}

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // Environment
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError>;

    /// All environment variables that are valid unicode.
    fn env_vars(&self) -> Vec<(String, String)>;

    // File System
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Free and total block counts of the file system containing `path`.
    fn disk_usage(&self, path: &Path) -> Result<DiskUsage>;
}

pub struct RealRuntime;

impl Runtime for RealRuntime {
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError> {
        self.env_var_impl(key)
    }

    fn env_vars(&self) -> Vec<(String, String)> {
        self.env_vars_impl()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.read_to_string_impl(path)
    }

    fn disk_usage(&self, path: &Path) -> Result<DiskUsage> {
        self.disk_usage_impl(path)
    }
}
