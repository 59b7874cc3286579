//! Unit state definitions for tracking one page through the crawl driver
//!
//! A unit moves `Pending → Rendering → Hashing → {Unchanged | Saved | Failed}`.
//! `Failed` is also reachable from `Pending` and `Rendering`.

use crate::SweepError;
use std::fmt;

/// Represents the current state of a page unit inside the crawl driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitState {
    // ===== Active States =====
    /// Unit has been taken from the frontier but not yet rendered
    Pending,

    /// The render capability is producing the final HTML
    Rendering,

    /// Rendered HTML is being transformed and hashed
    Hashing,

    // ===== Terminal States =====
    /// Content hash matched the prior record; nothing was written
    Unchanged,

    /// Transformed content was written to the output location
    Saved,

    /// Render, transform or save failed; the unit is consumed
    Failed,
}

impl UnitState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Unchanged | Self::Saved | Self::Failed)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Unchanged | Self::Saved)
    }

    /// Returns true if the driver may move from `self` to `next`
    pub fn can_transition_to(&self, next: UnitState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Rendering)
                | (Self::Pending, Self::Failed)
                | (Self::Rendering, Self::Hashing)
                | (Self::Rendering, Self::Failed)
                | (Self::Hashing, Self::Unchanged)
                | (Self::Hashing, Self::Saved)
                | (Self::Hashing, Self::Failed)
        )
    }

    /// Moves to `next`, rejecting transitions the state machine does not allow
    pub fn transition(self, next: UnitState) -> Result<UnitState, SweepError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SweepError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Rendering => "rendering",
            Self::Hashing => "hashing",
            Self::Unchanged => "unchanged",
            Self::Saved => "saved",
            Self::Failed => "failed",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "rendering" => Some(Self::Rendering),
            "hashing" => Some(Self::Hashing),
            "unchanged" => Some(Self::Unchanged),
            "saved" => Some(Self::Saved),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible unit states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Rendering,
            Self::Hashing,
            Self::Unchanged,
            Self::Saved,
            Self::Failed,
        ]
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
