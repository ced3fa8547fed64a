use std::fs::File;
use std::io::Read;
use std::path::Path;

use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use linfa_trees::DecisionTree;
use ndarray::{Array1, Array2};

use crate::error::{ClassifierError, ClassifierResult};
use crate::table::{FeatureTable, LABEL_COLUMN};

pub const DEFAULT_FEATURES: [&str; 3] = ["category_code", "amt", "city_pop"];
pub const DEFAULT_MAX_DEPTH: usize = 10;

pub type FraudModel = DecisionTree<f64, usize>;

// Numeric feature matrix with 0/1 targets. Rows without a label, or with a
// feature cell that is not a finite number, are skipped.
#[derive(Debug, Clone)]
pub struct LabelledMatrix {
    pub records: Array2<f64>,
    pub labels: Array1<usize>,
    pub skipped: usize,
}

impl LabelledMatrix {
    fn build(
        rows: impl Iterator<Item = (Vec<Option<f64>>, Option<usize>)>,
        width: usize,
        source: &str,
    ) -> ClassifierResult<Self> {
        let mut flat = Vec::new();
        let mut labels = Vec::new();
        let mut skipped = 0;

        for (values, label) in rows {
            let complete: Option<Vec<f64>> = values
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect();
            match (complete, label) {
                (Some(values), Some(label)) => {
                    flat.extend(values);
                    labels.push(label);
                }
                _ => skipped += 1,
            }
        }

        if labels.is_empty() {
            return Err(ClassifierError::NoLabelledRows(source.to_string()));
        }
        if skipped > 0 {
            log::warn!("Skipped {skipped} unusable rows in {source}");
        }
        Ok(Self {
            records: Array2::from_shape_vec((labels.len(), width), flat)?,
            labels: Array1::from(labels),
            skipped,
        })
    }

    pub fn from_table(table: &FeatureTable, features: &[String]) -> ClassifierResult<Self> {
        let indices = features
            .iter()
            .map(|f| {
                table
                    .column_index(f)
                    .ok_or_else(|| ClassifierError::UnknownFeature(f.clone()))
            })
            .collect::<ClassifierResult<Vec<usize>>>()?;
        let rows = table.rows().iter().map(|row| {
            let values = indices.iter().map(|&i| row.values[i].as_f64()).collect();
            (values, row.label.map(usize::from))
        });
        Self::build(rows, features.len(), "feature table")
    }

    pub fn from_reader<R: Read>(reader: R, features: &[String], source: &str) -> ClassifierResult<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);

        let indices = features
            .iter()
            .map(|f| position(f.as_str()).ok_or_else(|| ClassifierError::UnknownFeature(f.clone())))
            .collect::<ClassifierResult<Vec<usize>>>()?;
        let label_index =
            position(LABEL_COLUMN).ok_or_else(|| ClassifierError::MissingLabel(LABEL_COLUMN.to_string()))?;

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let values = indices
                .iter()
                .map(|&i| record.get(i).and_then(|cell| cell.trim().parse::<f64>().ok()))
                .collect();
            let label = match record.get(label_index).map(str::trim) {
                Some("1") => Some(1),
                Some("0") => Some(0),
                _ => None,
            };
            rows.push((values, label));
        }
        Self::build(rows.into_iter(), features.len(), source)
    }
}

pub fn read_feature_matrix(file_path: &Path, features: &[String]) -> ClassifierResult<LabelledMatrix> {
    let file = File::open(file_path).map_err(csv::Error::from)?;
    LabelledMatrix::from_reader(file, features, &file_path.display().to_string())
}

// Fits the decision tree
// Inputs: labelled feature matrix, maximum depth
// Outputs: trained model or a training error
pub fn train(data: &LabelledMatrix, max_depth: usize) -> ClassifierResult<FraudModel> {
    let dataset = Dataset::new(data.records.clone(), data.labels.clone());
    DecisionTree::params()
        .max_depth(Some(max_depth))
        .fit(&dataset)
        .map_err(|err| ClassifierError::Training(err.to_string()))
}

pub fn predict(model: &FraudModel, records: &Array2<f64>) -> Array1<usize> {
    model.predict(records)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetrics {
    pub label: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub accuracy: f64,
    pub classes: Vec<ClassMetrics>,
    pub total: usize,
}

impl Evaluation {
    pub fn macro_average(&self) -> (f64, f64, f64) {
        let n = self.classes.len().max(1) as f64;
        let sum = |f: fn(&ClassMetrics) -> f64| self.classes.iter().map(f).sum::<f64>() / n;
        (sum(|c| c.precision), sum(|c| c.recall), sum(|c| c.f1))
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

// Accuracy and per-class precision/recall/F1 over labels 0 and 1.
pub fn evaluate(truth: &Array1<usize>, predicted: &Array1<usize>) -> Evaluation {
    let total = truth.len();
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();

    let classes = [0usize, 1]
        .into_iter()
        .map(|label| {
            let tp = truth
                .iter()
                .zip(predicted)
                .filter(|(t, p)| **t == label && **p == label)
                .count();
            let predicted_as = predicted.iter().filter(|p| **p == label).count();
            let support = truth.iter().filter(|t| **t == label).count();

            let precision = ratio(tp, predicted_as);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                label,
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    Evaluation {
        accuracy: ratio(correct, total),
        classes,
        total,
    }
}
