//! # Offset Oracle
//!
//! Some toolchain combinations disagree by exactly one line between the line
//! the instrumentation reports for an allocating instruction and the line
//! the metadata extractor recorded for the same allocation. Which builds are
//! affected is not known up front, so the oracle discovers the correction at
//! runtime.
//!
//! ## State machine
//!
//! ```text
//!            miss while successes <= threshold
//!   NoCorrection  <------------------------------>  AddOne
//! ```
//!
//! - A successful lookup increments `successes`.
//! - A failed lookup with `successes > 0` is treated as transient and only
//!   decrements `successes`.
//! - A failed lookup with `successes == 0` flips the mode.
//! - Once `successes` exceeds the threshold the active mode is considered
//!   validated and never flips again.
//! - A flip is tentative until the retry under the new mode hits. If the
//!   retry misses too, [`OffsetOracle::abandon_retry`] puts the old mode
//!   back, so a site missing under both corrections leaves the mode as it
//!   was.
//!
//! Each analysis context owns its own oracle; forking a context clones it.

use std::fmt;

use tracing::debug;

/// Default number of successes after which the active mode is locked in.
pub const DEFAULT_THRESHOLD: u32 = 10;

/// Line correction applied to reported allocation lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OffsetMode
{
    /// Use the reported line unchanged.
    #[default]
    NoCorrection,
    /// Look the allocation up one line below the reported one.
    AddOne,
}

impl OffsetMode
{
    /// The other mode.
    #[must_use]
    pub const fn flipped(self) -> Self
    {
        match self {
            Self::NoCorrection => Self::AddOne,
            Self::AddOne => Self::NoCorrection,
        }
    }
}

impl fmt::Display for OffsetMode
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::NoCorrection => write!(f, "no-correction"),
            Self::AddOne => write!(f, "add-one"),
        }
    }
}

/// Adaptive line-offset heuristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetOracle
{
    mode: OffsetMode,
    successes: u32,
    threshold: u32,
}

impl OffsetOracle
{
    /// Oracle in `NoCorrection` mode with the default threshold.
    #[must_use]
    pub fn new() -> Self
    {
        Self::with_threshold(DEFAULT_THRESHOLD)
    }

    /// Oracle in `NoCorrection` mode locking in after `threshold` successes.
    #[must_use]
    pub const fn with_threshold(threshold: u32) -> Self
    {
        Self {
            mode: OffsetMode::NoCorrection,
            successes: 0,
            threshold,
        }
    }

    /// Current correction.
    #[must_use]
    pub const fn mode(&self) -> OffsetMode
    {
        self.mode
    }

    /// Net count of successful lookups.
    #[must_use]
    pub const fn consecutive_successes(&self) -> u32
    {
        self.successes
    }

    /// Lock-in threshold.
    #[must_use]
    pub const fn threshold(&self) -> u32
    {
        self.threshold
    }

    /// Whether the active mode has been validated and will no longer flip.
    #[must_use]
    pub const fn is_locked(&self) -> bool
    {
        self.successes > self.threshold
    }

    /// Apply the current correction to `line`.
    #[must_use]
    pub const fn add_offset(&self, line: u32) -> u32
    {
        match self.mode {
            OffsetMode::NoCorrection => line,
            OffsetMode::AddOne => line.saturating_add(1),
        }
    }

    /// Flip the mode if it is not locked in yet.
    ///
    /// Returns `true` if the mode changed, i.e. a retry with the new
    /// correction is worthwhile.
    pub fn maybe_retry_offset(&mut self) -> bool
    {
        if self.is_locked() {
            return false;
        }
        let previous = self.mode;
        self.mode = previous.flipped();
        debug!(from = %previous, to = %self.mode, successes = self.successes, "Offset oracle flipped mode");
        true
    }

    /// Feed back the outcome of a lookup.
    pub fn report_result(&mut self, found: bool)
    {
        if found {
            self.successes = self.successes.saturating_add(1);
        } else if self.successes == 0 {
            self.maybe_retry_offset();
        } else {
            self.successes -= 1;
        }
    }

    /// Undo a flip made by [`maybe_retry_offset`](Self::maybe_retry_offset)
    /// whose retry missed as well.
    ///
    /// The mode goes back to `previous` and the miss counts once against
    /// `successes`. A site that resolves under neither correction says
    /// nothing about which correction is right.
    pub fn abandon_retry(&mut self, previous: OffsetMode)
    {
        if self.mode != previous {
            debug!(from = %self.mode, to = %previous, successes = self.successes, "Offset oracle restored mode");
            self.mode = previous;
        }
        self.successes = self.successes.saturating_sub(1);
    }
}

impl Default for OffsetOracle
{
    fn default() -> Self
    {
        Self::new()
    }
}
