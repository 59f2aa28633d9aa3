//! Parameterized data rows (CSV/JSON) shared read-only across actors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::Rng;
use serde_json::Value;

use crate::error::DataSourceError;
use crate::template::Variables;

/// One parameterized row: field name to JSON value.
pub type Row = HashMap<String, Value>;

/// How a [`DataSource`] hands out rows across `next()` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Advance an atomic counter; index = `counter mod len`.
    Sequential,
    /// Uniform sample of `0..len` per call, guarded by a mutex.
    Random,
}

enum Cursor {
    Sequential(AtomicU64),
    Random(Mutex<rand::rngs::StdRng>),
}

/// A finite, non-empty, shared set of parameterized rows with a selection
/// cursor.
pub struct DataSource {
    rows: Vec<Row>,
    cursor: Cursor,
}

impl DataSource {
    /// Loads a CSV file: first row is the header, subsequent rows become
    /// string-valued rows keyed by header name. Rejects files with no data
    /// rows.
    pub fn load_csv(path: impl AsRef<Path>, mode: SelectionMode) -> Result<Self, DataSourceError> {
        let path = path.as_ref();
        let mut reader =
            csv::Reader::from_path(path).map_err(|source| to_csv_err(path, source))?;
        let headers = reader.headers().map_err(|source| to_csv_err(path, source))?.clone();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| to_csv_err(path, source))?;
            let mut row = Row::new();
            for (header, value) in headers.iter().zip(record.iter()) {
                row.insert(header.to_string(), Value::String(value.to_string()));
            }
            rows.push(row);
        }
        Self::from_rows(path, rows, mode)
    }

    /// Loads a JSON file containing a top-level array of objects; values
    /// preserve their JSON type.
    pub fn load_json(
        path: impl AsRef<Path>,
        mode: SelectionMode,
    ) -> Result<Self, DataSourceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| DataSourceError::Open { path: path.to_path_buf(), source })?;
        let parsed: Value = serde_json::from_str(&text)
            .map_err(|source| DataSourceError::Json { path: path.to_path_buf(), source })?;
        let array =
            parsed.as_array().ok_or_else(|| DataSourceError::NotAnArray(path.to_path_buf()))?;

        let mut rows = Vec::with_capacity(array.len());
        for entry in array {
            let object = entry
                .as_object()
                .ok_or_else(|| DataSourceError::NotAnArray(path.to_path_buf()))?;
            rows.push(object.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
        }
        Self::from_rows(path, rows, mode)
    }

    fn from_rows(path: &Path, rows: Vec<Row>, mode: SelectionMode) -> Result<Self, DataSourceError> {
        if rows.is_empty() {
            return Err(DataSourceError::Empty(path.to_path_buf()));
        }
        let cursor = match mode {
            SelectionMode::Sequential => Cursor::Sequential(AtomicU64::new(0)),
            SelectionMode::Random => Cursor::Random(Mutex::new(rand::SeedableRng::from_entropy())),
        };
        Ok(Self { rows, cursor })
    }

    /// Returns a distinct, stable snapshot of the next selected row.
    pub fn next(&self) -> Row {
        let index = match &self.cursor {
            Cursor::Sequential(counter) => {
                counter.fetch_add(1, Ordering::Relaxed) as usize % self.rows.len()
            }
            Cursor::Random(rng) => rng.lock().gen_range(0..self.rows.len()),
        };
        self.rows[index].clone()
    }

    /// Number of rows available.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether this source has no rows (never true post-construction).
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn to_csv_err(path: &Path, source: csv::Error) -> DataSourceError {
    DataSourceError::Csv { path: path.to_path_buf(), source }
}

/// A named collection of [`DataSource`]s shared across all actors.
#[derive(Clone, Default)]
pub struct Sources {
    named: Vec<(String, Arc<DataSource>)>,
}

impl Sources {
    /// Builds a source set from `(name, source)` pairs.
    pub fn new(named: Vec<(String, Arc<DataSource>)>) -> Self {
        Self { named }
    }

    /// Whether any sources are configured.
    pub fn is_empty(&self) -> bool {
        self.named.is_empty()
    }

    /// Calls `next()` on each source once and writes `data.<source>.<field>`
    /// keys into `vars`.
    pub fn inject(&self, vars: &mut Variables) {
        for (name, source) in &self.named {
            let row = source.next();
            for (field, value) in row {
                vars.insert(format!("data.{name}.{field}"), value);
            }
        }
    }
}

/// Convenience path-based loader matching the config's `mode` string.
pub fn load(path: &PathBuf, mode: SelectionMode) -> Result<DataSource, DataSourceError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => DataSource::load_json(path, mode),
        _ => DataSource::load_csv(path, mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        file
    }

    #[test]
    fn sequential_wraps_around() {
        let file = write_csv(&["username", "row1", "row2", "row3"]);
        let ds = DataSource::load_csv(file.path(), SelectionMode::Sequential).unwrap();
        let got: Vec<String> = (0..4)
            .map(|_| ds.next().get("username").unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(got, vec!["row1", "row2", "row3", "row1"]);
    }

    #[test]
    fn empty_csv_is_rejected() {
        let file = write_csv(&["username"]);
        assert!(matches!(
            DataSource::load_csv(file.path(), SelectionMode::Sequential),
            Err(DataSourceError::Empty(_))
        ));
    }

    #[test]
    fn random_mode_stays_in_bounds() {
        let file = write_csv(&["username", "row1", "row2", "row3"]);
        let ds = DataSource::load_csv(file.path(), SelectionMode::Random).unwrap();
        for _ in 0..50 {
            let row = ds.next();
            assert!(["row1", "row2", "row3"]
                .contains(&row.get("username").unwrap().as_str().unwrap()));
        }
    }

    #[test]
    fn inject_writes_namespaced_keys() {
        let file = write_csv(&["username", "alice"]);
        let ds = Arc::new(DataSource::load_csv(file.path(), SelectionMode::Sequential).unwrap());
        let sources = Sources::new(vec![("users".to_string(), ds)]);
        let mut vars = Variables::new();
        sources.inject(&mut vars);
        assert_eq!(vars.get("data.users.username").unwrap(), "alice");
    }
}
