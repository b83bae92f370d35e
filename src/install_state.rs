//! Pipeline progress tracking
//!
//! [`InstallerContext`] records which stage the run is in. Stages are entered
//! one at a time, in order; the only way off the chain is [`InstallerContext::fail`].
//!
//! ```text
//! NotStarted -> Preflight -> RemoveLegacy -> RepositorySetup
//!     -> InstallPackages -> Verify -> Cleanup -> Report -> Done
//!
//! Failed is reachable from every stage except Done
//! ```

use strum::{Display, EnumIter, IntoEnumIterator};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[repr(u8)]
pub enum InstallStage {
    #[strum(to_string = "Not started")]
    NotStarted = 0,

    /// Root and PATH checks
    #[strum(to_string = "Pre-flight checks")]
    Preflight = 1,

    #[strum(to_string = "Removing legacy packages")]
    RemoveLegacy = 2,

    /// Key, architecture, codename and apt source entry
    #[strum(to_string = "Setting up repository")]
    RepositorySetup = 3,

    #[strum(to_string = "Installing packages")]
    InstallPackages = 4,

    #[strum(to_string = "Verifying installation")]
    Verify = 5,

    /// Best effort; never fails the run
    #[strum(to_string = "Cleaning up")]
    Cleanup = 6,

    #[strum(to_string = "Reporting")]
    Report = 7,

    #[strum(to_string = "Done")]
    Done = 8,

    #[strum(to_string = "Failed")]
    Failed = 255,
}

impl InstallStage {
    /// Position in the chain; Failed sorts last.
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// The stage entered after this one on success.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::Preflight),
            Self::Preflight => Some(Self::RemoveLegacy),
            Self::RemoveLegacy => Some(Self::RepositorySetup),
            Self::RepositorySetup => Some(Self::InstallPackages),
            Self::InstallPackages => Some(Self::Verify),
            Self::Verify => Some(Self::Cleanup),
            Self::Cleanup => Some(Self::Report),
            Self::Report => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// NotStarted through Done.
    pub fn all_stages() -> Vec<Self> {
        Self::iter().filter(|s| *s != Self::Failed).collect()
    }
}

/// A stage change the chain does not allow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallTransitionError {
    #[error("{to} does not directly follow {from}")]
    SkippedStage {
        from: InstallStage,
        to: InstallStage,
    },

    #[error("{to} was already passed (currently at {from})")]
    BackwardTransition {
        from: InstallStage,
        to: InstallStage,
    },

    #[error("run already finished ({from})")]
    FromTerminalState { from: InstallStage },

    #[error("already in {stage}")]
    AlreadyAtStage { stage: InstallStage },
}

/// Current stage plus a timestamped trail of every stage entered.
///
/// ```
/// use dockerup::install_state::{InstallerContext, InstallStage};
///
/// let mut ctx = InstallerContext::new();
/// ctx.transition_to(InstallStage::Preflight).unwrap();
/// assert!(ctx.transition_to(InstallStage::Verify).is_err());
/// assert_eq!(ctx.current_stage(), InstallStage::Preflight);
/// ```
#[derive(Debug, Clone)]
pub struct InstallerContext {
    current: InstallStage,
    failed_at: Option<InstallStage>,
    /// (stage, seconds since epoch)
    stage_history: Vec<(InstallStage, u64)>,
}

impl Default for InstallerContext {
    fn default() -> Self {
        Self::new()
    }
}

impl InstallerContext {
    pub fn new() -> Self {
        Self {
            current: InstallStage::NotStarted,
            failed_at: None,
            stage_history: Vec::new(),
        }
    }

    #[inline]
    pub fn current_stage(&self) -> InstallStage {
        self.current
    }

    /// Stage that was running when [`fail`](Self::fail) was called.
    #[inline]
    pub fn failed_at(&self) -> Option<InstallStage> {
        self.failed_at
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current == InstallStage::Done
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.current == InstallStage::Failed
    }

    pub fn stage_history(&self) -> &[(InstallStage, u64)] {
        &self.stage_history
    }

    /// Enter `target`, which must be the stage right after the current one.
    pub fn transition_to(
        &mut self,
        target: InstallStage,
    ) -> Result<InstallStage, InstallTransitionError> {
        let from = self.current;
        if from.is_terminal() {
            return Err(InstallTransitionError::FromTerminalState { from });
        }
        if target == from {
            return Err(InstallTransitionError::AlreadyAtStage { stage: target });
        }
        // Failed goes through fail() so failed_at gets recorded
        if target != InstallStage::Failed && target.order() < from.order() {
            return Err(InstallTransitionError::BackwardTransition { from, to: target });
        }
        if from.next() != Some(target) {
            return Err(InstallTransitionError::SkippedStage { from, to: target });
        }

        self.enter(target);
        Ok(target)
    }

    /// Leave the chain, remembering where.
    pub fn fail(&mut self) -> Result<(), InstallTransitionError> {
        if self.current.is_terminal() {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        }
        self.failed_at = Some(self.current);
        self.enter(InstallStage::Failed);
        Ok(())
    }

    fn enter(&mut self, stage: InstallStage) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        self.stage_history.push((stage, now));
        self.current = stage;
    }
}

impl From<InstallTransitionError> for crate::error::ProvisionError {
    fn from(err: InstallTransitionError) -> Self {
        crate::error::ProvisionError::Transition(err.to_string())
    }
}
