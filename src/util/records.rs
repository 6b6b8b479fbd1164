use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use crate::error::SyncError;

/// One CSV row keyed by header name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Value of a column, or "" when the file has no such column.
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }
}

pub fn parse_records<R: Read>(reader: R) -> Result<Vec<Record>, SyncError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        let fields = headers
            .iter()
            .zip(row.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        records.push(Record { fields });
    }
    Ok(records)
}

pub fn load_records(path: &Path) -> Result<Vec<Record>, SyncError> {
    let file = std::fs::File::open(path)?;
    parse_records(file)
}

/// Records from `path` when given, otherwise from the bundled default.
pub fn load_or_default(path: Option<&Path>, bundled: &str) -> Result<Vec<Record>, SyncError> {
    match path {
        Some(path) => load_records(path),
        None => parse_records(bundled.as_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_keep_file_order() {
        let data = "title,body,labels\nA,,\nB,hi,\"bug,urgent\"\n";
        let records = parse_records(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("title"), "A");
        assert_eq!(records[1].get("title"), "B");
        assert_eq!(records[1].get("labels"), "bug,urgent");
    }

    #[test]
    fn missing_column_reads_empty() {
        let records = parse_records("title\nOnly title\n".as_bytes()).unwrap();
        assert_eq!(records[0].get("body"), "");
    }

    #[test]
    fn short_rows_are_tolerated() {
        let records = parse_records("name,color\nbug\n".as_bytes()).unwrap();
        assert_eq!(records[0].get("name"), "bug");
        assert_eq!(records[0].get("color"), "");
    }

    #[test]
    fn header_only_file_is_empty() {
        let records = parse_records("title,body,labels\n".as_bytes()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("milestones.csv");
        std::fs::write(&path, "title\nv1.0\nv2.0\n").unwrap();

        let records = load_or_default(Some(&path), "title\nbundled\n").unwrap();
        let titles: Vec<&str> = records.iter().map(|r| r.get("title")).collect();
        assert_eq!(titles, ["v1.0", "v2.0"]);
    }

    #[test]
    fn falls_back_to_bundled() {
        let records = load_or_default(None, "title\nbundled\n").unwrap();
        assert_eq!(records[0].get("title"), "bundled");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_records(Path::new("/nonexistent/trolley.csv")).unwrap_err();
        assert!(matches!(err, SyncError::Io(_)));
    }
}
