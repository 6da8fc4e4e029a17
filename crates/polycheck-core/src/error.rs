//! # Error Types
//!
//! General error handling for the allocation checker.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Note that a detected type confusion is normally *not* an error: it is the
//! result the checker exists to produce and is reported through
//! [`TypecheckReport`](crate::report::TypecheckReport). It only becomes a
//! [`PolycheckError::TypeConfusion`] when the caller opts into
//! [`ConfusionPolicy::Abort`](crate::config::ConfusionPolicy::Abort).

use std::path::PathBuf;

use thiserror::Error;

use crate::report::TypecheckReport;

/// Main error type for checker operations
///
/// ## Error Categories
///
/// 1. **Load-time (fatal)**: MetadataOpen, MalformedRecord, UnresolvedType, DescriptorLoad
/// 2. **Per-check usage errors**: UnresolvedPointer, AmbiguousPointer
/// 3. **Policy**: TypeConfusion (only with `ConfusionPolicy::Abort`)
/// 4. **Configuration**: InvalidConfig
#[derive(Error, Debug, Clone)]
pub enum PolycheckError
{
    /// The allocation metadata table could not be opened or read
    #[error("Failed to read allocation metadata {}: {reason}", path.display())]
    MetadataOpen
    {
        /// Path of the `.allocs` table
        path: PathBuf,
        /// Underlying I/O failure
        reason: String,
    },

    /// A record in the metadata table is malformed
    ///
    /// Static metadata is trusted input produced by the build. A record with
    /// an empty file field, a missing column or a non-numeric line bound
    /// means the build is corrupt, so loading stops here.
    #[error("Malformed metadata record on line {line}: {reason}")]
    MalformedRecord
    {
        /// 1-based line number in the metadata table
        line: usize,
        /// What was wrong with the record
        reason: String,
    },

    /// A metadata record names a type the descriptor binary does not define
    #[error("Unresolvable type '{name}' referenced on metadata line {line}")]
    UnresolvedType
    {
        /// Type name as written in the table
        name: String,
        /// 1-based line number in the metadata table
        line: usize,
    },

    /// The type descriptor binary could not be loaded
    #[error("Failed to load type descriptors from {}: {reason}", path.display())]
    DescriptorLoad
    {
        /// Path of the descriptor binary
        path: PathBuf,
        /// Parser or I/O failure
        reason: String,
    },

    /// The target operand of a typecheck did not resolve to any memory object
    #[error("Typecheck target pointer does not resolve to a memory object")]
    UnresolvedPointer,

    /// The target operand of a typecheck resolved to more than one memory object
    ///
    /// The checked type is taken from the target's allocation, so the target
    /// must be concrete. A symbolic target is a usage error in the analysed
    /// program's instrumentation.
    #[error("Typecheck target pointer is ambiguous: resolves to {count} memory objects")]
    AmbiguousPointer
    {
        /// Number of memory objects the pointer may denote
        count: usize,
    },

    /// At least one typecheck combination failed and the policy is to abort
    ///
    /// `target` and `examined` name the first failing candidate pair.
    #[error("Type confusion: {target} is not contained in {examined}")]
    TypeConfusion
    {
        /// Type name of the checked (target) operand
        target: String,
        /// Type name of the object the target was expected to live in
        examined: String,
        /// The complete check, including the outcomes of every other
        /// object the examined pointer may alias
        report: Box<TypecheckReport>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PolycheckError
{
    /// Whether this error prevents the type map from being built.
    ///
    /// Fatal errors terminate initialisation of the subsystem; everything
    /// else is scoped to a single registration or check.
    #[must_use]
    pub fn is_fatal(&self) -> bool
    {
        matches!(
            self,
            Self::MetadataOpen { .. } | Self::MalformedRecord { .. } | Self::UnresolvedType { .. } | Self::DescriptorLoad { .. }
        )
    }
}

/// Convenience type alias for `Result<T, PolycheckError>`
///
/// ```rust
/// use polycheck_core::error::PolycheckResult;
/// fn foo() -> PolycheckResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type PolycheckResult<T> = std::result::Result<T, PolycheckError>;
