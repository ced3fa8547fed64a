// Transaction store: typed transaction records and the CSV loader that builds them.
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::config::PipelineConfig;
use crate::error::{FeatureError, FeatureResult, IssueKind, RecordIssue};

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";

// Row as it appears in the ledger. Timestamp and amount stay textual so a bad
// value becomes a record-level issue instead of a failed deserialize.
#[derive(Debug, Deserialize)]
struct RawTransaction {
    #[serde(rename = "cc_num")]
    account: String,
    #[serde(rename = "amt")]
    amount: String,
    #[serde(rename = "trans_date_trans_time")]
    timestamp: String,
    #[serde(rename = "category")]
    category: String,
    #[serde(rename = "city_pop")]
    city_pop: i64,
    #[serde(rename = "merchant")]
    merchant: String,
    #[serde(rename = "merch_lat")]
    merchant_lat: f64,
    #[serde(rename = "merch_long")]
    merchant_long: f64,
    #[serde(rename = "is_fraud", default)]
    label: Option<String>,
    #[serde(rename = "dob", default)]
    dob: Option<String>,
    #[serde(rename = "zip", default)]
    zip: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    // Ingestion position among accepted records.
    pub position: usize,
    pub account: String,
    pub timestamp: NaiveDateTime,
    // Timestamp exactly as it appeared in the source, for passthrough.
    pub timestamp_text: String,
    pub amount: f64,
    pub merchant: String,
    pub category: String,
    pub city_pop: i64,
    pub label: Option<bool>,
    pub merchant_lat: f64,
    pub merchant_long: f64,
    pub dob: Option<NaiveDate>,
    pub zip: Option<String>,
}

impl TransactionRecord {
    // `account@timestamp`, used when reporting issues.
    pub fn key(&self) -> String {
        format!("{}@{}", self.account, self.timestamp_text)
    }

    pub fn epoch_seconds(&self) -> i64 {
        self.timestamp.and_utc().timestamp()
    }
}

// Immutable, ingestion-ordered collection of accepted records plus the
// record-level issues hit while loading.
#[derive(Debug, Clone, Default)]
pub struct TransactionStore {
    records: Vec<TransactionRecord>,
    issues: Vec<RecordIssue>,
}

impl TransactionStore {
    pub fn from_records(mut records: Vec<TransactionRecord>) -> Self {
        for (position, record) in records.iter_mut().enumerate() {
            record.position = position;
        }
        Self {
            records,
            issues: Vec::new(),
        }
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn get(&self, position: usize) -> &TransactionRecord {
        &self.records[position]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn issues(&self) -> &[RecordIssue] {
        &self.issues
    }
}

pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

pub fn parse_birth_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), BIRTH_DATE_FORMAT).ok()
}

fn parse_amount(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
}

fn parse_label(text: &str) -> Option<Option<bool>> {
    match text.trim() {
        "" => Some(None),
        "1" | "true" | "True" | "TRUE" => Some(Some(true)),
        "0" | "false" | "False" | "FALSE" => Some(Some(false)),
        _ => None,
    }
}

// Fails with `MissingColumn` naming every required column absent from `headers`.
pub fn check_columns(headers: &csv::StringRecord, config: &PipelineConfig) -> FeatureResult<()> {
    let present: HashSet<&str> = headers.iter().map(str::trim).collect();
    let missing: Vec<String> = config
        .required_columns()
        .into_iter()
        .filter(|column| !present.contains(column))
        .map(str::to_string)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(FeatureError::MissingColumn { missing })
    }
}

pub fn read_transactions(file_path: &Path, config: &PipelineConfig) -> FeatureResult<TransactionStore> {
    let file = File::open(file_path)?;
    read_transactions_from(file, config)
}

// Loads a ledger from any reader
// Inputs: CSV source and the run configuration (for required columns)
// Outputs: store of accepted records plus record-level issues
// Key steps:
// 1. Check the header for every required column
// 2. Deserialize rows; undecodable rows become MalformedRecord issues
// 3. Parse timestamp, amount and label, reporting rows that fail
pub fn read_transactions_from<R: Read>(reader: R, config: &PipelineConfig) -> FeatureResult<TransactionStore> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    check_columns(rdr.headers()?, config)?;

    let mut records = Vec::new();
    let mut issues = Vec::new();

    for result in rdr.deserialize::<RawTransaction>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(err) => match err.kind() {
                csv::ErrorKind::Deserialize { .. }
                | csv::ErrorKind::UnequalLengths { .. }
                | csv::ErrorKind::Utf8 { .. } => {
                    let line = err.position().map(|p| p.line()).unwrap_or_default();
                    issues.push(RecordIssue::new(
                        IssueKind::MalformedRecord,
                        format!("line {line}"),
                        err.to_string(),
                    ));
                    continue;
                }
                _ => return Err(err.into()),
            },
        };

        let key = format!("{}@{}", raw.account, raw.timestamp);
        let Some(timestamp) = parse_timestamp(&raw.timestamp) else {
            issues.push(RecordIssue::new(
                IssueKind::MalformedTimestamp,
                key,
                format!("cannot parse '{}'", raw.timestamp),
            ));
            continue;
        };
        let Some(amount) = parse_amount(&raw.amount) else {
            issues.push(RecordIssue::new(
                IssueKind::MalformedAmount,
                key,
                format!("cannot parse '{}' as a non-negative amount", raw.amount),
            ));
            continue;
        };
        let Some(label) = parse_label(raw.label.as_deref().unwrap_or("")) else {
            issues.push(RecordIssue::new(
                IssueKind::MalformedRecord,
                key,
                format!("unrecognised label '{}'", raw.label.unwrap_or_default()),
            ));
            continue;
        };

        records.push(TransactionRecord {
            position: records.len(),
            account: raw.account,
            timestamp,
            timestamp_text: raw.timestamp,
            amount,
            merchant: raw.merchant,
            category: raw.category,
            city_pop: raw.city_pop,
            label,
            merchant_lat: raw.merchant_lat,
            merchant_long: raw.merchant_long,
            dob: raw.dob.as_deref().and_then(parse_birth_date),
            zip: raw.zip.map(|zip| zip.trim().to_string()).filter(|zip| !zip.is_empty()),
        });
    }

    log::info!(
        "Loaded {} transactions ({} rejected)",
        records.len(),
        issues.len()
    );
    Ok(TransactionStore { records, issues })
}
