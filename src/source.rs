//! Source loader - reads the delimited input file
//!
//! Expected layout: a header row naming the `tags` and `proverb` columns
//! (any order), then one record per line. Fields are comma separated and may
//! be double-quoted; inside quotes `""` is a literal quote. Blank lines are
//! skipped. Tag parsing happens later, per row, in the import pipeline.

use std::path::Path;
use crate::{Error, Result};
use crate::proverb::{InvalidProverb, NewProverb};

const FIELD_SEPARATOR: char = ',';
const TAGS_COLUMN: &str = "tags";
const TEXT_COLUMN: &str = "proverb";

/// One data row of the source file, not yet validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    /// 1-indexed line number in the source file
    pub line: usize,
    /// Raw `tags` field, tags joined by `TAG_DELIMITER`
    pub tags: String,
    pub text: String,
}

impl SourceRecord {
    pub fn new(line: usize, tags: impl Into<String>, text: impl Into<String>) -> Self {
        Self { line, tags: tags.into(), text: text.into() }
    }

    /// Validate into a storable candidate
    pub fn to_new_proverb(&self) -> std::result::Result<NewProverb, InvalidProverb> {
        NewProverb::parse(&self.tags, self.text.as_str())
    }
}

/// Read and parse a source file
pub fn load_file(path: &Path) -> Result<Vec<SourceRecord>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        Error::import(None, format!("cannot read {}: {}", path.display(), e))
    })?;
    let records = load_str(&contents)?;
    tracing::debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Parse source text already in memory
pub fn load_str(contents: &str) -> Result<Vec<SourceRecord>> {
    // Spreadsheet exports often start with a byte order mark
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
    let mut rows = contents
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty());

    let (header_line, header) = rows
        .next()
        .ok_or_else(|| Error::import(None, "source is empty (missing header row)"))?;
    let header = split_fields(header).map_err(|m| Error::import(Some(header_line), m))?;
    let columns = Columns::locate(&header).map_err(|m| Error::import(Some(header_line), m))?;

    rows.map(|(line, raw)| {
        let fields = split_fields(raw).map_err(|m| Error::import(Some(line), m))?;
        if fields.len() != header.len() {
            return Err(Error::import(
                Some(line),
                format!("expected {} fields, found {}", header.len(), fields.len()),
            ));
        }
        Ok(SourceRecord::new(line, fields[columns.tags].clone(), fields[columns.text].clone()))
    })
    .collect()
}

struct Columns {
    tags: usize,
    text: usize,
}

impl Columns {
    fn locate(header: &[String]) -> std::result::Result<Self, String> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| format!("header is missing the {name:?} column"))
        };
        Ok(Self { tags: find(TAGS_COLUMN)?, text: find(TEXT_COLUMN)? })
    }
}

/// Split one line into fields, honoring double quotes
fn split_fields(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            c if c == FIELD_SEPARATOR && !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(current);
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_basic() {
        let src = "tags,proverb\ncgo,Cgo is not Go.\nerror,Errors are values\n";
        let records = load_str(src).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], SourceRecord::new(2, "cgo", "Cgo is not Go."));
        assert_eq!(records[1].text, "Errors are values");
        assert_eq!(records[1].line, 3);
    }

    #[test]
    fn test_quoted_fields_and_column_order() {
        let src = "Proverb,Tags\r\n\"Don't just check errors, handle them gracefully.\",error|style\r\n\"Say \"\"hi\"\"\",\r\n";
        let records = load_str(src).unwrap();
        assert_eq!(records[0].text, "Don't just check errors, handle them gracefully.");
        assert_eq!(records[0].tags, "error|style");
        assert_eq!(records[1].text, "Say \"hi\"");
        assert_eq!(records[1].tags, "");
    }

    #[test]
    fn test_byte_order_mark_ignored() {
        let records = load_str("\u{feff}tags,proverb\ngo,Don't panic.\n").unwrap();
        assert_eq!(records, vec![SourceRecord::new(2, "go", "Don't panic.")]);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let src = "\ntags,proverb\n\ngo,A little copying is better than a little dependency.\n\n";
        let records = load_str(src).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].line, 4);
    }

    #[test]
    fn test_missing_column() {
        let err = load_str("tags,text\na,b\n").unwrap_err();
        assert!(matches!(err, Error::Import { line: Some(1), .. }));
    }

    #[test]
    fn test_wrong_field_count() {
        let err = load_str("tags,proverb\na,b,c\n").unwrap_err();
        assert!(matches!(err, Error::Import { line: Some(2), .. }));
    }

    #[test]
    fn test_unterminated_quote() {
        let err = load_str("tags,proverb\na,\"open\n").unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn test_empty_source() {
        assert!(load_str("").is_err());
        assert!(load_str("tags,proverb\n").unwrap().is_empty());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proverbs.csv");
        std::fs::write(&path, "tags,proverb\nsync,Don't communicate by sharing memory.\n").unwrap();
        let records = load_file(&path).unwrap();
        assert_eq!(records.len(), 1);

        let missing = load_file(&dir.path().join("nope.csv")).unwrap_err();
        assert_eq!(missing.exit_code(), 3);
    }
}
