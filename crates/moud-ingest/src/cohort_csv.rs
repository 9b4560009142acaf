//! CSV cohort reading with encoding fallback.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, warn};

use moud_model::{Cohort, FieldValue, IngestError, PatientId, PatientRecord, Timepoint};

/// Encoding a snapshot was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// Permissive single-byte fallback; every byte sequence decodes.
    Latin1,
}

/// Decode raw snapshot bytes.
///
/// UTF-8 is attempted first; on failure the bytes are decoded as Latin-1,
/// which cannot fail, so a decoding problem alone never aborts a run. A
/// leading UTF-8 BOM is stripped.
pub fn decode_text(bytes: &[u8]) -> (String, TextEncoding) {
    match std::str::from_utf8(bytes) {
        Ok(text) => {
            let text = text.strip_prefix('\u{feff}').unwrap_or(text);
            (text.to_string(), TextEncoding::Utf8)
        }
        Err(_) => {
            let text: String = bytes.iter().map(|&byte| char::from(byte)).collect();
            (text, TextEncoding::Latin1)
        }
    }
}

/// Read one timepoint's snapshot into a cohort.
///
/// Blank, whitespace-only, and absent cells become [`FieldValue::Missing`].
/// Row order is preserved. Fails when the file is unreadable, the header
/// row is absent, the identifier column is missing, an identifier is
/// blank, or a patient identifier repeats within the file.
pub fn read_cohort(
    path: &Path,
    timepoint: Timepoint,
    id_column: &str,
) -> Result<Cohort, IngestError> {
    let bytes = std::fs::read(path).map_err(|source| IngestError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let (text, encoding) = decode_text(&bytes);
    if encoding == TextEncoding::Latin1 {
        warn!(
            timepoint = %timepoint,
            path = %path.display(),
            "input is not valid UTF-8, fell back to Latin-1"
        );
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?
        .clone();
    if headers.is_empty() || headers.iter().all(|header| header.trim().is_empty()) {
        return Err(IngestError::MissingHeader {
            path: path.to_path_buf(),
        });
    }

    let columns: Vec<String> = headers.iter().map(|header| header.trim().to_string()).collect();
    let id_index = columns
        .iter()
        .position(|column| column.eq_ignore_ascii_case(id_column))
        .ok_or_else(|| IngestError::MissingIdColumn {
            path: path.to_path_buf(),
            column: id_column.to_string(),
        })?;

    let mut cohort = Cohort::new(timepoint, columns.clone());
    let mut seen: BTreeSet<PatientId> = BTreeSet::new();

    for (index, result) in reader.records().enumerate() {
        let record_number = (index as u64) + 1;
        let record = result.map_err(|error| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;

        let raw_id = record.get(id_index).unwrap_or("").trim();
        let patient_id =
            PatientId::new(raw_id).map_err(|_| IngestError::BlankPatientId {
                path: path.to_path_buf(),
                record: record_number,
            })?;
        if !seen.insert(patient_id.clone()) {
            return Err(IngestError::DuplicatePatientId {
                path: path.to_path_buf(),
                id: patient_id.as_str().to_string(),
            });
        }

        let mut row = PatientRecord::new(patient_id, timepoint);
        for (column, value) in columns.iter().zip(record.iter()) {
            row.set_field(column.clone(), FieldValue::from_raw(value));
        }
        cohort.push_record(row);
    }

    cohort.declare_response_count(cohort.len());
    debug!(
        timepoint = %timepoint,
        path = %path.display(),
        records = cohort.len(),
        columns = cohort.columns.len(),
        "cohort read"
    );
    Ok(cohort)
}

/// Read several timepoint snapshots, one worker thread per file.
///
/// Cohorts have no cross-dependency until the aggregator's join, so the
/// five reads fan out and this call is the single synchronization point.
/// The first ingest failure fails the whole batch.
pub fn read_cohorts(
    files: &[(Timepoint, std::path::PathBuf)],
    id_column: &str,
) -> Result<Vec<Cohort>, IngestError> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = files
            .iter()
            .map(|(timepoint, path)| {
                scope.spawn(move || read_cohort(path, *timepoint, id_column))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(payload) => std::panic::resume_unwind(payload),
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_passes_through() {
        let (text, encoding) = decode_text("CID,sex\n1,2\n".as_bytes());
        assert_eq!(encoding, TextEncoding::Utf8);
        assert!(text.starts_with("CID"));
    }

    #[test]
    fn invalid_utf8_falls_back_to_latin1() {
        // 0xE9 is 'é' in Latin-1 and invalid on its own in UTF-8.
        let bytes = b"CID,clinic\n1,caf\xE9\n";
        let (text, encoding) = decode_text(bytes);
        assert_eq!(encoding, TextEncoding::Latin1);
        assert!(text.contains("café"));
    }

    #[test]
    fn bom_is_stripped() {
        let (text, encoding) = decode_text("\u{feff}CID\n1\n".as_bytes());
        assert_eq!(encoding, TextEncoding::Utf8);
        assert!(text.starts_with("CID"));
    }
}
