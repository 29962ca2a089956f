use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MetadataSource {
    Exif,
    VideoTrack,
    FileTimestamp,
}

/// Every value a file name template can refer to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Sequence,
    Artist,
    Make,
    Model,
    Height,
    Folder,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum FieldValue {
    Int(u64),
    Text(String),
}

/// Normalized view of one file's metadata, keyed by [`Field`].
///
/// Adapters never hand library-specific tag shapes past this point; the
/// template engine only looks values up here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataRecord {
    pub source: MetadataSource,
    values: BTreeMap<Field, FieldValue>,
    sequence_width: usize,
}

impl MetadataRecord {
    pub fn build(partial: PartialMetadata, fallback_date: NaiveDateTime, folder: &str) -> Self {
        let (date, source) = match partial.date {
            Some(date) => (date, partial.source.unwrap_or(MetadataSource::Exif)),
            None => (fallback_date, MetadataSource::FileTimestamp),
        };

        let mut values = BTreeMap::new();
        values.insert(Field::Year, FieldValue::Int(u64::try_from(date.year()).unwrap_or_default()));
        values.insert(Field::Month, FieldValue::Int(u64::from(date.month())));
        values.insert(Field::Day, FieldValue::Int(u64::from(date.day())));
        values.insert(Field::Hour, FieldValue::Int(u64::from(date.hour())));
        values.insert(Field::Minute, FieldValue::Int(u64::from(date.minute())));
        values.insert(Field::Second, FieldValue::Int(u64::from(date.second())));

        if let Some(artist) = partial.artist {
            values.insert(Field::Artist, FieldValue::Text(artist));
        }
        if let Some(make) = partial.make {
            values.insert(Field::Make, FieldValue::Text(make));
        }
        if let Some(model) = partial.model {
            values.insert(Field::Model, FieldValue::Text(model));
        }
        if let Some(height) = partial.height {
            values.insert(Field::Height, FieldValue::Int(u64::from(height)));
        }
        if !folder.is_empty() {
            values.insert(Field::Folder, FieldValue::Text(folder.to_string()));
        }

        Self {
            source,
            values,
            sequence_width: 0,
        }
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    pub fn sequence_width(&self) -> usize {
        self.sequence_width
    }

    pub fn with_sequence(&self, value: u64, width: usize) -> Self {
        let mut next = self.clone();
        next.values.insert(Field::Sequence, FieldValue::Int(value));
        next.sequence_width = width;
        next
    }
}

/// Whatever one extractor managed to read. Missing pieces stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialMetadata {
    pub source: Option<MetadataSource>,
    pub date: Option<NaiveDateTime>,
    pub artist: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub height: Option<u32>,
}

impl PartialMetadata {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.artist.is_none()
            && self.make.is_none()
            && self.model.is_none()
            && self.height.is_none()
    }

    pub fn merge_missing_from(&mut self, fallback: &PartialMetadata) {
        if self.date.is_none() {
            self.date = fallback.date;
            if self.source.is_none() {
                self.source = fallback.source;
            }
        }
        if self.artist.is_none() {
            self.artist = fallback.artist.clone();
        }
        if self.make.is_none() {
            self.make = fallback.make.clone();
        }
        if self.model.is_none() {
            self.model = fallback.model.clone();
        }
        if self.height.is_none() {
            self.height = fallback.height;
        }
    }
}

pub(crate) fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim_matches(|c: char| c == '\0' || c.is_whitespace()).to_string())
        .filter(|v| !v.is_empty())
}
