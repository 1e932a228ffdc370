use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncomError {
    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),

    #[error("Index out of bounds: {0}")]
    BoundsError(String),

    #[error("Angular field is empty")]
    EmptyAngularField,

    #[error("Angular field length mismatch: expected {expected}, found {found}")]
    AngularFieldLengthMismatch { expected: usize, found: usize },

    #[error("Invalid angular statistics record at line {line}: {reason}")]
    InvalidAngularRecord { line: usize, reason: String },

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl PartialEq for SyncomError {
    fn eq(&self, other: &Self) -> bool {
        use SyncomError::*;
        match (self, other) {
            (ConfigurationError(a), ConfigurationError(b)) => a == b,
            (BoundsError(a), BoundsError(b)) => a == b,
            (
                AngularFieldLengthMismatch {
                    expected: e1,
                    found: f1,
                },
                AngularFieldLengthMismatch {
                    expected: e2,
                    found: f2,
                },
            ) => e1 == e2 && f1 == f2,
            (
                InvalidAngularRecord {
                    line: l1,
                    reason: r1,
                },
                InvalidAngularRecord {
                    line: l2,
                    reason: r2,
                },
            ) => l1 == l2 && r1 == r2,

            // not comparable: same variant is enough
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,

            (EmptyAngularField, EmptyAngularField) => true,

            _ => false,
        }
    }
}
