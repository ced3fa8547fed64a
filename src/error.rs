use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("Missing required column(s): {}", missing.join(", "))]
    MissingColumn { missing: Vec<String> },

    #[error("Unknown category '{category}' (not present in the fitted encoder)")]
    UnknownCategory { category: String },

    #[error("No rows remain after exclusions ({input_records} input records)")]
    EmptyResult { input_records: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type FeatureResult<T> = Result<T, FeatureError>;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Feature column '{0}' not found in table header")]
    UnknownFeature(String),

    #[error("Label column '{0}' not found in table header")]
    MissingLabel(String),

    #[error("No labelled rows available in {0}")]
    NoLabelledRows(String),

    #[error("Model training failed: {0}")]
    Training(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

pub type ClassifierResult<T> = Result<T, ClassifierError>;

// Record-level failures. These never abort a run; they are excluded,
// tallied, and summarised at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IssueKind {
    MalformedTimestamp,
    MalformedAmount,
    MalformedRecord,
    InvalidBirthDate,
    UndefinedMetric,
    UnseenCategory,
}

impl IssueKind {
    pub fn label(self) -> &'static str {
        match self {
            IssueKind::MalformedTimestamp => "malformed timestamp",
            IssueKind::MalformedAmount => "malformed amount",
            IssueKind::MalformedRecord => "malformed record",
            IssueKind::InvalidBirthDate => "missing or invalid date of birth",
            IssueKind::UndefinedMetric => "undefined metric",
            IssueKind::UnseenCategory => "unseen category (sentinel-mapped)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordIssue {
    pub kind: IssueKind,
    // Identifying key: account and timestamp when known, otherwise the CSV line.
    pub key: String,
    pub detail: String,
}

impl RecordIssue {
    pub fn new(kind: IssueKind, key: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            detail: detail.into(),
        }
    }
}
