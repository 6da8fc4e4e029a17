//! # Configuration
//!
//! Settings shared by every analysis context of one process.
//!
//! ## Environment Variables
//!
//! [`CheckerConfig::from_env`] reads:
//! - `POLYCHECK_META_BASE` (required): metadata base path. The allocation
//!   table is `<base>.allocs`, the type descriptor binary `<base>-meta.so`.
//! - `POLYCHECK_SOURCE_ROOT`: directory relative allocation-site files are
//!   resolved against (default: the current working directory).
//! - `POLYCHECK_OFFSET_THRESHOLD`: offset oracle lock-in threshold (default 10).
//! - `POLYCHECK_CONFUSION_POLICY`: `report` (default) or `abort`.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{PolycheckError, PolycheckResult};
use crate::oracle::DEFAULT_THRESHOLD;

const ALLOCS_SUFFIX: &str = ".allocs";
const DESCRIPTORS_SUFFIX: &str = "-meta.so";

/// What a detected type confusion does to the enclosing check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfusionPolicy
{
    /// Log the confusion and return it in the report (default)
    #[default]
    Report,
    /// Additionally fail the check with [`PolycheckError::TypeConfusion`]
    Abort,
}

impl FromStr for ConfusionPolicy
{
    type Err = PolycheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "report" | "warn" => Ok(ConfusionPolicy::Report),
            "abort" | "fail" => Ok(ConfusionPolicy::Abort),
            _ => Err(PolycheckError::InvalidConfig(format!(
                "Unknown confusion policy: {s}. Use 'report' or 'abort'"
            ))),
        }
    }
}

impl fmt::Display for ConfusionPolicy
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            ConfusionPolicy::Report => write!(f, "report"),
            ConfusionPolicy::Abort => write!(f, "abort"),
        }
    }
}

/// Checker settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerConfig
{
    /// Metadata base path
    pub meta_base: PathBuf,
    /// Directory relative site files are joined onto (`None`: use them as is)
    pub source_root: Option<PathBuf>,
    /// Offset oracle lock-in threshold
    pub offset_threshold: u32,
    /// Handling of detected type confusion
    pub confusion_policy: ConfusionPolicy,
}

impl CheckerConfig
{
    /// Configuration for `meta_base`, rooted at the current working directory.
    pub fn new(meta_base: impl Into<PathBuf>) -> Self
    {
        Self {
            meta_base: meta_base.into(),
            source_root: env::current_dir().ok(),
            offset_threshold: DEFAULT_THRESHOLD,
            confusion_policy: ConfusionPolicy::default(),
        }
    }

    /// Build the configuration from `POLYCHECK_*` environment variables.
    ///
    /// ## Errors
    ///
    /// Returns [`PolycheckError::InvalidConfig`] if `POLYCHECK_META_BASE` is
    /// unset or another variable holds an invalid value.
    pub fn from_env() -> PolycheckResult<Self>
    {
        let meta_base = env::var_os("POLYCHECK_META_BASE")
            .ok_or_else(|| PolycheckError::InvalidConfig("POLYCHECK_META_BASE is not set".to_string()))?;
        let mut config = Self::new(meta_base);

        if let Some(root) = env::var_os("POLYCHECK_SOURCE_ROOT") {
            config.source_root = Some(PathBuf::from(root));
        }
        if let Ok(threshold) = env::var("POLYCHECK_OFFSET_THRESHOLD") {
            config.offset_threshold = threshold.trim().parse().map_err(|err| {
                PolycheckError::InvalidConfig(format!("POLYCHECK_OFFSET_THRESHOLD '{threshold}': {err}"))
            })?;
        }
        if let Ok(policy) = env::var("POLYCHECK_CONFUSION_POLICY") {
            config.confusion_policy = policy.parse()?;
        }
        Ok(config)
    }

    /// Replace the source root.
    #[must_use]
    pub fn with_source_root(mut self, root: Option<PathBuf>) -> Self
    {
        self.source_root = root;
        self
    }

    /// Replace the offset oracle threshold.
    #[must_use]
    pub fn with_offset_threshold(mut self, threshold: u32) -> Self
    {
        self.offset_threshold = threshold;
        self
    }

    /// Replace the confusion policy.
    #[must_use]
    pub fn with_confusion_policy(mut self, policy: ConfusionPolicy) -> Self
    {
        self.confusion_policy = policy;
        self
    }

    /// Path of the allocation table (`<meta_base>.allocs`).
    #[must_use]
    pub fn allocs_path(&self) -> PathBuf
    {
        with_suffix(&self.meta_base, ALLOCS_SUFFIX)
    }

    /// Path of the type descriptor binary (`<meta_base>-meta.so`).
    #[must_use]
    pub fn descriptors_path(&self) -> PathBuf
    {
        with_suffix(&self.meta_base, DESCRIPTORS_SUFFIX)
    }

    /// Qualify a site file reported by the instrumentation.
    ///
    /// Relative paths are joined onto the source root; absolute paths and
    /// configurations without a root leave `file` unchanged.
    #[must_use]
    pub fn qualify(&self, file: &str) -> String
    {
        match &self.source_root {
            Some(root) if Path::new(file).is_relative() => root.join(file).to_string_lossy().into_owned(),
            _ => file.to_string(),
        }
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf
{
    let mut path = OsString::from(base.as_os_str());
    path.push(suffix);
    PathBuf::from(path)
}
