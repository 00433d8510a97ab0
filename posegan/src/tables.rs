//! Pair and annotation tables.
//!
//! The pair table lists `(from, to)` image ids, one training pair per row.
//! The annotation table maps an image id to its keypoint strings and is
//! colon-separated, since the keypoint lists themselves contain commas.

use std::{collections::HashMap, path::Path};

use csv::{ReaderBuilder, Trim};
use pose_ops::PoseKeypoints;
use rand::{seq::SliceRandom, Rng};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{DatasetError, DatasetResult};

/// One training pair: translate the person in `from` into the pose of `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairRecord {
    pub from: String,
    pub to: String,
}

impl PairRecord {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// One annotated image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub name: String,
    /// JSON list of 18 row coordinates.
    pub keypoints_y: String,
    /// JSON list of 18 column coordinates.
    pub keypoints_x: String,
}

/// Ordered list of training pairs.
#[derive(Debug, Clone, Default)]
pub struct PairTable {
    pairs: Vec<PairRecord>,
}

impl PairTable {
    /// Read a comma-separated file with header `from,to`.
    pub fn load(path: impl AsRef<Path>) -> DatasetResult<Self> {
        let pairs = read_records(path.as_ref(), b',')?;
        Ok(Self { pairs })
    }

    pub fn from_records(pairs: Vec<PairRecord>) -> Self {
        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PairRecord> {
        self.pairs.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PairRecord> {
        self.pairs.iter()
    }

    /// Randomly permute the pair order.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.pairs.shuffle(rng);
    }
}

/// Keypoint annotations indexed by image id.
#[derive(Debug, Clone, Default)]
pub struct AnnotationTable {
    records: HashMap<String, AnnotationRecord>,
    rows: usize,
}

impl AnnotationTable {
    /// Read a colon-separated file with header `name:keypoints_y:keypoints_x`.
    ///
    /// When a name appears more than once the last row wins.
    pub fn load(path: impl AsRef<Path>) -> DatasetResult<Self> {
        let records: Vec<AnnotationRecord> = read_records(path.as_ref(), b':')?;
        Ok(Self::from_records(records))
    }

    pub fn from_records(records: impl IntoIterator<Item = AnnotationRecord>) -> Self {
        let mut rows = 0;
        let records = records
            .into_iter()
            .inspect(|_| rows += 1)
            .map(|record| (record.name.clone(), record))
            .collect();
        Self { records, rows }
    }

    /// Number of distinct image ids.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Number of rows read, duplicates included.
    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&AnnotationRecord> {
        self.records.get(name)
    }

    /// Annotated image ids, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Parse the keypoints of `name`.
    pub fn keypoints(&self, name: &str) -> DatasetResult<PoseKeypoints> {
        let record = self.get(name).ok_or_else(|| DatasetError::UnknownImage {
            name: name.to_owned(),
        })?;
        PoseKeypoints::from_strings(&record.keypoints_y, &record.keypoints_x).map_err(|source| {
            DatasetError::InvalidKeypoints {
                name: name.to_owned(),
                source,
            }
        })
    }
}

fn read_records<T: DeserializeOwned>(path: &Path, delimiter: u8) -> DatasetResult<Vec<T>> {
    let to_error = |source: csv::Error| DatasetError::TableReadFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .trim(Trim::All)
        .from_path(path)
        .map_err(to_error)?;
    let records = reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(to_error)?;
    Ok(records)
}
