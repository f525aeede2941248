// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record classification into measurement values and tags.
//!
//! Each field is checked twice, independently:
//! - numeric fields become values,
//! - fields named in the tag key set become tags when their trimmed
//!   string form is non-empty.
//!
//! Everything else is dropped. The time field is never classified; it is
//! returned separately for the time resolver.

use crate::value::{FieldValue, Numeric, RawRecord};
use std::collections::{BTreeMap, HashSet};

/// Output of [`RecordClassifier::classify`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedRecord {
    /// Numeric fields.
    pub values: BTreeMap<String, Numeric>,
    /// Tag fields with non-blank string forms.
    pub tags: BTreeMap<String, String>,
    /// The raw time field, if present.
    pub time: Option<FieldValue>,
}

/// Splits records into values and tags.
#[derive(Debug, Clone)]
pub struct RecordClassifier {
    tag_keys: HashSet<String>,
    time_key: String,
}

impl RecordClassifier {
    pub fn new<I, S>(tag_keys: I, time_key: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tag_keys: tag_keys.into_iter().map(Into::into).collect(),
            time_key: time_key.into(),
        }
    }

    pub fn classify(&self, record: &RawRecord) -> ClassifiedRecord {
        let time = record.get(&self.time_key).cloned();

        let mut values = BTreeMap::new();
        let mut tags = BTreeMap::new();

        for (key, value) in record.iter() {
            if *key == self.time_key {
                continue;
            }
            if let Some(n) = value.as_numeric() {
                values.insert(key.clone(), n);
            }
            if self.tag_keys.contains(key) {
                let s = value.to_tag_string();
                // The untrimmed form is kept; trimming only decides presence.
                if !s.trim().is_empty() {
                    tags.insert(key.clone(), s);
                }
            }
        }

        ClassifiedRecord { values, tags, time }
    }
}
