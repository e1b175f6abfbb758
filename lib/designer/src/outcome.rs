//! Stage results.

use crate::error::DesignError;
use rootcause::Report;

/// Result of a pipeline stage.
///
/// `Empty` is a valid answer that carries no data (the model chose nothing);
/// `Failed` means the stage could not produce an answer at all.
#[derive(Debug)]
pub enum StageOutcome<T> {
    Ready(T),
    Empty,
    Failed(Report<DesignError>),
}

impl<T> StageOutcome<T> {
    /// Wraps a failure.
    #[must_use]
    pub fn failed(error: DesignError) -> Self {
        Self::Failed(error.into())
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Returns the value if the stage produced one.
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Empty | Self::Failed(_) => None,
        }
    }
}
