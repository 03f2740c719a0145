//! Batch bookkeeping for file operations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{LegReport, OperationError};

/// The type of operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    Copy,
    Move,
    Delete,
    Create,
    Rename,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy => write!(f, "Copy"),
            Self::Move => write!(f, "Move"),
            Self::Delete => write!(f, "Delete"),
            Self::Create => write!(f, "Create"),
            Self::Rename => write!(f, "Rename"),
        }
    }
}

/// Groups the legs started by one user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchId(pub u64);

/// Running result of a batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// The type of operation.
    pub operation_type: OperationType,
    /// Number of legs planned.
    pub total: usize,
    /// Number of legs that finished successfully.
    pub succeeded: usize,
    /// Number of legs that failed.
    pub failed: usize,
    /// Errors that occurred.
    pub errors: Vec<OperationError>,
}

impl BatchReport {
    pub fn new(operation_type: OperationType, total: usize) -> Self {
        Self {
            operation_type,
            total,
            succeeded: 0,
            failed: 0,
            errors: Vec::new(),
        }
    }

    /// Count a finished leg.
    pub fn record(&mut self, report: &LegReport) {
        match &report.error {
            None => self.succeeded += 1,
            Some(error) => {
                self.failed += 1;
                self.errors.push(error.clone());
            }
        }
    }

    /// Count a leg that failed before it was started.
    pub fn record_failure(&mut self, error: OperationError) {
        self.failed += 1;
        self.errors.push(error);
    }

    /// True once every planned leg has reported.
    pub fn is_complete(&self) -> bool {
        self.succeeded + self.failed >= self.total
    }

    /// Check if the operation was fully successful.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Get a human-readable summary of the operation.
    pub fn summary(&self) -> String {
        let action = match self.operation_type {
            OperationType::Copy => "Copied",
            OperationType::Move => "Moved",
            OperationType::Delete => "Deleted",
            OperationType::Create => "Created",
            OperationType::Rename => "Renamed",
        };
        let noun = if self.succeeded == 1 { "item" } else { "items" };

        if self.failed == 0 {
            format!("{} {} {}", action, self.succeeded, noun)
        } else {
            format!(
                "{} {} {}, {} failed",
                action, self.succeeded, noun, self.failed
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let mut report = BatchReport::new(OperationType::Move, 3);
        report.succeeded = 2;
        assert!(!report.is_complete());
        report.record_failure(OperationError::new("/x".into(), "exit 1"));
        assert!(report.is_complete());
        assert!(!report.is_success());
        assert_eq!(report.summary(), "Moved 2 items, 1 failed");

        let mut single = BatchReport::new(OperationType::Copy, 1);
        single.succeeded = 1;
        assert_eq!(single.summary(), "Copied 1 item");
    }
}
