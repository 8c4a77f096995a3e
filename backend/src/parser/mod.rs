//! CSV reader with encoding and delimiter auto-detection.
//!
//! Turns an uploaded file into [`RawRow`]s keyed by header name. Cells stay
//! loosely typed ([`RawCell`]); numeric coercion happens in the metrics
//! pipeline, not here.

use std::io::Read;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::{RawCell, RawRow};

/// Delimiters tried by [`detect_delimiter`], in tie-break order.
const CANDIDATE_DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed rows, keyed by header
    pub rows: Vec<RawRow>,
    /// Detected encoding
    pub encoding: String,
    /// Detected or forced delimiter
    pub delimiter: char,
    /// Column headers, in file order
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes.
///
/// Valid UTF-8 is taken as-is; chardet only guesses for everything else.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the given encoding, dropping any BOM.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        // utf-8 and anything unknown: lossy UTF-8
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    match decoded.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => decoded,
    }
}

/// Detect the delimiter by counting unquoted occurrences in the header line.
///
/// Falls back to `,` when no candidate appears.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("");

    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;
    for c in first_line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(i) = CANDIDATE_DELIMITERS.iter().position(|&d| d == c) {
            counts[i] += 1;
        }
    }

    let mut best = CANDIDATE_DELIMITERS[0];
    let mut best_count = 0;
    for (i, &sep) in CANDIDATE_DELIMITERS.iter().enumerate() {
        if counts[i] > best_count {
            best_count = counts[i];
            best = sep;
        }
    }
    best
}

/// Parse CSV from a reader with an explicit delimiter.
///
/// Returns the trimmed headers and one [`RawRow`] per non-blank record.
/// Short records pad with [`RawCell::Empty`]; extra fields are ignored.
pub fn parse_csv<R: Read>(reader: R, delimiter: char) -> CsvResult<(Vec<String>, Vec<RawRow>)> {
    if !delimiter.is_ascii() {
        return Err(CsvError::Malformed {
            line: 1,
            message: format!("Delimiter '{}' is not a single-byte character", delimiter),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() {
        return Err(CsvError::EmptyFile);
    }
    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let mut row = RawRow::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            let cell = record.get(i).map(RawCell::from_text).unwrap_or_default();
            // duplicate header names: the leftmost column wins
            row.entry(header.clone()).or_insert(cell);
        }
        rows.push(row);
    }

    Ok((headers, rows))
}

/// Parse a CSV string with an explicit delimiter.
///
/// # Example
/// ```ignore
/// use installboard::parser::csv_to_rows;
///
/// let (headers, rows) = csv_to_rows("Cluster,Hospital\nNorth,H1", ',').unwrap();
/// assert_eq!(headers, vec!["Cluster", "Hospital"]);
/// assert_eq!(rows[0]["Hospital"].as_label(), "H1");
/// ```
pub fn csv_to_rows(csv: &str, delimiter: char) -> CsvResult<(Vec<String>, Vec<RawRow>)> {
    if csv.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }
    parse_csv(skip_blank_lines(csv).as_bytes(), delimiter)
}

/// Drop whitespace-only lines before the header row.
fn skip_blank_lines(content: &str) -> &str {
    let mut rest = content;
    while let Some(end) = rest.find('\n') {
        if !rest[..end].trim().is_empty() {
            break;
        }
        rest = &rest[end + 1..];
    }
    rest
}

/// Parse CSV bytes, detecting the encoding and (unless forced) the delimiter.
pub fn parse_bytes_auto(bytes: &[u8], delimiter: Option<char>) -> CsvResult<ParseResult> {
    if bytes.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));

    let (headers, rows) = csv_to_rows(&content, delimiter)?;

    Ok(ParseResult {
        rows,
        encoding,
        delimiter,
        headers,
    })
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
///
/// # Example
/// ```ignore
/// let result = parse_csv_file_auto("progress.csv", None)?;
/// println!("Encoding: {}, Delimiter: '{}'", result.encoding, result.delimiter);
/// println!("Rows: {}", result.rows.len());
/// ```
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P, delimiter: Option<char>) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes, delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(row: &RawRow, col: &str) -> String {
        row[col].as_label()
    }

    #[test]
    fn test_simple_csv() {
        let csv = "Cluster,Hospital,# Tanks MoH,# Installed\nNorth,H1,10,4\nSouth,H2,5,5";
        let (headers, rows) = csv_to_rows(csv, ',').unwrap();

        assert_eq!(headers, vec!["Cluster", "Hospital", "# Tanks MoH", "# Installed"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(label(&rows[0], "Hospital"), "H1");
        assert_eq!(rows[0]["# Tanks MoH"], RawCell::Text("10".into()));
        assert_eq!(label(&rows[1], "Cluster"), "South");
    }

    #[test]
    fn test_quoted_values_with_commas() {
        let csv = "Cluster,Hospital\n\"North, East\",\"St. Mary's \"\"General\"\"\"";
        let (_, rows) = csv_to_rows(csv, ',').unwrap();

        assert_eq!(label(&rows[0], "Cluster"), "North, East");
        assert_eq!(label(&rows[0], "Hospital"), "St. Mary's \"General\"");
    }

    #[test]
    fn test_empty_lines_skipped() {
        let csv = "a,b\n1,2\n\n,\n3,4\n";
        let (_, rows) = csv_to_rows(csv, ',').unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_missing_values() {
        let csv = "a,b,c\n1,,3\n4";
        let (_, rows) = csv_to_rows(csv, ',').unwrap();

        assert_eq!(rows[0]["b"], RawCell::Empty);
        assert_eq!(rows[1]["b"], RawCell::Empty);
        assert_eq!(rows[1]["c"], RawCell::Empty);
    }

    #[test]
    fn test_extra_columns_ignored() {
        let csv = "a,b\n1,2,3,4";
        let (_, rows) = csv_to_rows(csv, ',').unwrap();

        assert_eq!(rows[0].len(), 2);
        assert_eq!(label(&rows[0], "b"), "2");
    }

    #[test]
    fn test_headers_trimmed() {
        let csv = " Cluster , # Installed \nA,1";
        let (headers, rows) = csv_to_rows(csv, ',').unwrap();
        assert_eq!(headers, vec!["Cluster", "# Installed"]);
        assert_eq!(label(&rows[0], "# Installed"), "1");
    }

    #[test]
    fn test_header_only_csv() {
        let (headers, rows) = csv_to_rows("Cluster,Hospital\n", ',').unwrap();
        assert_eq!(headers.len(), 2);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(csv_to_rows("", ','), Err(CsvError::EmptyFile)));
        assert!(matches!(parse_bytes_auto(b"", None), Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        assert!(matches!(
            csv_to_rows("a§b\n1§2", '§'),
            Err(CsvError::Malformed { .. })
        ));
    }

    #[test]
    fn test_detect_delimiter_comma() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
    }

    #[test]
    fn test_detect_delimiter_semicolon() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
    }

    #[test]
    fn test_detect_delimiter_tab_and_pipe() {
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
    }

    #[test]
    fn test_detect_delimiter_ignores_quoted() {
        assert_eq!(detect_delimiter("\"a;b;c\",d\n"), ',');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_auto_parse() {
        let csv = "Cluster;Hospital\nNorth;H1\nSouth;H2";
        let result = parse_bytes_auto(csv.as_bytes(), None).unwrap();

        assert_eq!(result.delimiter, ';');
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.headers, vec!["Cluster", "Hospital"]);
    }

    #[test]
    fn test_forced_delimiter() {
        let csv = "a;b,c\n1;2,3";
        let result = parse_bytes_auto(csv.as_bytes(), Some(',')).unwrap();
        assert_eq!(result.headers, vec!["a;b", "c"]);
    }

    #[test]
    fn test_bom_stripped() {
        let bytes = b"\xEF\xBB\xBFCluster,Hospital\nA,H1";
        let result = parse_bytes_auto(bytes, None).unwrap();
        assert_eq!(result.headers[0], "Cluster");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_utf8_labels_preserved() {
        let csv = "Cluster,Hospital,# Tanks MoH,# Installed\nA,São Paulo,1,1\n";
        let result = parse_bytes_auto(csv.as_bytes(), None).unwrap();
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(label(&result.rows[0], "Hospital"), "São Paulo");

        let csv = "Cluster,Hospital,# Tanks MoH,# Installed\nA,Café,1,1\n";
        let result = parse_bytes_auto(csv.as_bytes(), None).unwrap();
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(label(&result.rows[0], "Hospital"), "Café");
    }

    #[test]
    fn test_non_utf8_bytes_decoded() {
        // "Société" in ISO-8859-1 is not valid UTF-8
        let mut bytes = b"Cluster,Hospital\nA,Soci".to_vec();
        bytes.extend_from_slice(&[0xE9, 0x74, 0xE9, b'\n']);
        let result = parse_bytes_auto(&bytes, None).unwrap();
        assert_eq!(result.rows.len(), 1);
        assert!(label(&result.rows[0], "Hospital").starts_with("Soci"));
    }

    #[test]
    fn test_leading_blank_lines_skipped() {
        let bytes = b" \n\t\nCluster,Hospital,# Tanks MoH,# Installed\nA,H,1,1\n";
        let result = parse_bytes_auto(bytes, None).unwrap();
        assert_eq!(result.headers, vec!["Cluster", "Hospital", "# Tanks MoH", "# Installed"]);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(label(&result.rows[0], "Hospital"), "H");
    }

    #[test]
    fn test_file_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.csv");
        std::fs::write(&path, "Cluster,Hospital\nA,H1\n").unwrap();

        let result = parse_csv_file_auto(&path, None).unwrap();
        assert_eq!(result.rows.len(), 1);
        assert!(matches!(
            parse_csv_file_auto(dir.path().join("missing.csv"), None),
            Err(CsvError::Io(_))
        ));
    }
}
