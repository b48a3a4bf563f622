use chrono::NaiveDate;
use thiserror::Error;

/// Why a bar history could not be turned into a [`Series`](super::Series).
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("missing required column `{0}`")]
    MissingColumn(&'static str),

    #[error("row {row}: missing value for `{field}`")]
    MissingValue { row: usize, field: &'static str },

    #[error("row {row}: cannot parse `{field}` from {value:?}")]
    UnparsableValue {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("row {row}: `{field}` out of range ({value})")]
    InvalidValue {
        row: usize,
        field: &'static str,
        value: f64,
    },

    #[error("duplicate bar for {0}")]
    DuplicateDate(NaiveDate),

    #[error("series contains no bars")]
    Empty,

    #[error("failed to read bar file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid csv: {0}")]
    Csv(#[from] csv::Error),
}

impl IngestError {
    /// True when the data itself is bad (reject and skip), false for
    /// environmental failures such as I/O errors.
    pub fn is_malformed(&self) -> bool {
        match self {
            Self::Io(_) => false,
            Self::Csv(e) => !matches!(e.kind(), csv::ErrorKind::Io(_)),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_not_malformed() {
        let err = IngestError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(!err.is_malformed());
        assert!(IngestError::MissingColumn("close").is_malformed());
        assert!(IngestError::Empty.is_malformed());
        assert!(IngestError::InvalidValue { row: 1, field: "open", value: -1.0 }.is_malformed());
    }

    #[test]
    fn messages_name_the_field() {
        let err = IngestError::MissingValue { row: 4, field: "volume" };
        assert_eq!(err.to_string(), "row 4: missing value for `volume`");
    }
}
