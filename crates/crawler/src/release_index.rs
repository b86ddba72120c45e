// ABOUTME: Immutable set-name to release-date lookup loaded from the set table CSV.
// ABOUTME: Built once per crawler and shared by reference; resolves set names to ISO dates.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::dates::normalize_date;
use crate::error::IndexError;
use crate::record::UNKNOWN;

/// Header of the column holding set names.
pub const SET_NAME_COLUMN: &str = "SetName";
/// Header of the column holding raw release dates.
pub const RELEASE_DATE_COLUMN: &str = "Release Date";

/// Read-only mapping from set name to the raw release date scraped for it.
#[derive(Debug, Clone, Default)]
pub struct ReleaseDateIndex {
    dates: HashMap<String, String>,
}

impl ReleaseDateIndex {
    /// Loads the table at `path`. A missing or unreadable file is fatal.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let index = Self::from_reader(file)?;
        tracing::info!(path = %path.display(), sets = index.len(), "loaded release table");
        Ok(index)
    }

    /// Loads a table from any CSV reader. Extra columns are ignored and a
    /// repeated set name keeps the last row's date.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, IndexError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let set_col = headers
            .iter()
            .position(|h| h == SET_NAME_COLUMN)
            .ok_or(IndexError::MissingColumn(SET_NAME_COLUMN))?;
        let date_col = headers
            .iter()
            .position(|h| h == RELEASE_DATE_COLUMN)
            .ok_or(IndexError::MissingColumn(RELEASE_DATE_COLUMN))?;

        let mut dates = HashMap::new();
        for row in rdr.records() {
            let row = row?;
            let set = row.get(set_col).unwrap_or_default();
            if set.is_empty() {
                continue;
            }
            let date = row.get(date_col).unwrap_or_default();
            dates.insert(set.to_string(), date.to_string());
        }
        Ok(Self { dates })
    }

    /// Builds an index from in-memory pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            dates: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The raw release-date text recorded for `set_name`, if any.
    pub fn lookup(&self, set_name: &str) -> Option<&str> {
        self.dates.get(set_name.trim()).map(String::as_str)
    }

    /// Resolves `set_name` to `YYYY-MM-DD`, or the unknown sentinel when the
    /// set is absent or its recorded date does not parse.
    pub fn resolve(&self, set_name: &str) -> String {
        match self.lookup(set_name) {
            Some(raw) => normalize_date(raw),
            None => UNKNOWN.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}
