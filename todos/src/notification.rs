//! Transient error notification.
//!
//! Holds the single error currently shown to the user. Every raise bumps a
//! generation counter; the display timer carries the generation it was
//! started for, so a timer left over from an earlier error never hides a
//! newer one.

use crate::types::ErrorKind;
use chrono::{DateTime, Utc};

/// The most recent error and the bookkeeping for its display timer
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorChannel {
    kind: ErrorKind,
    generation: u64,
    raised_at: Option<DateTime<Utc>>,
}

impl ErrorChannel {
    /// Shows `kind`, replacing whatever was shown, and returns the new generation
    ///
    /// Raising [`ErrorKind::Empty`] is the same as dismissing.
    pub fn raise(&mut self, kind: ErrorKind, at: DateTime<Utc>) -> u64 {
        if kind.is_empty() {
            self.dismiss();
            return self.generation;
        }

        self.kind = kind;
        self.generation += 1;
        self.raised_at = Some(at);
        self.generation
    }

    /// Hides the current error
    pub fn dismiss(&mut self) {
        self.kind = ErrorKind::Empty;
        self.raised_at = None;
    }

    /// Hides the current error if its timer is the one expiring
    ///
    /// Returns whether anything was hidden.
    pub fn expire(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.kind.is_empty() {
            return false;
        }
        self.dismiss();
        true
    }

    /// Currently shown error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Generation of the latest raise
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// When the current error was raised
    #[must_use]
    pub const fn raised_at(&self) -> Option<DateTime<Utc>> {
        self.raised_at
    }

    /// User-facing message of the current error
    #[must_use]
    pub const fn message(&self) -> Option<&'static str> {
        self.kind.message()
    }
}
