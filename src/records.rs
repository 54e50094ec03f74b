//! Append-Only Record Log
//!
//! Keeps a CSV file of `name,text` records, for example each sentence the
//! classifier was asked about together with who asked. Opening an existing
//! log appends to it; opening a missing or empty file writes the header
//! first.
//!
//! ## CSV Format
//!
//! ```text
//! name,text
//! "alice","I love this movie"
//! "bob","He said ""meh"", then left"
//! ```
//!
//! Every field is quoted and embedded quotes are doubled, so commas, quotes
//! and newlines inside a field survive a round trip through
//! [`read_records`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

const HEADER: &str = "name,text";

/// One row of the log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub text: String,
}

impl Record {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Appends [`Record`]s to a CSV file
///
/// # Example
///
/// ```rust,no_run
/// use bagwise::{Record, RecordLog};
///
/// let mut log = RecordLog::open("records.csv")?;
/// log.append(&Record::new("alice", "I love this movie"))?;
/// # Ok::<(), bagwise::Error>(())
/// ```
pub struct RecordLog {
    file: File,
}

impl RecordLog {
    /// Open `path` for appending, writing the header if the file is new or empty
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if file.metadata()?.len() == 0 {
            writeln!(file, "{}", HEADER)?;
        }
        Ok(Self { file })
    }

    /// Append one record and flush it to disk
    pub fn append(&mut self, record: &Record) -> Result<()> {
        writeln!(
            self.file,
            "{},{}",
            quote(&record.name),
            quote(&record.text)
        )?;
        self.file.flush()?;
        tracing::debug!(name = %record.name, "appended record");
        Ok(())
    }

    /// Append several records
    pub fn extend<'a, I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        for record in records {
            self.append(record)?;
        }
        Ok(())
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Read every record from a log written by [`RecordLog`]
///
/// # Errors
///
/// [`Error::Csv`] if the header is not `name,text`, a row does not have
/// exactly two fields, or a quoted field is never closed.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<Record>> {
    let contents = fs::read_to_string(path)?;
    let rows = parse_csv(&contents)?;

    let mut rows = rows.into_iter();
    match rows.next() {
        None => return Ok(Vec::new()),
        Some((_, header)) if header == ["name", "text"] => {}
        Some((line, header)) => {
            return Err(Error::Csv {
                line,
                message: format!("expected header \"{}\", got {:?}", HEADER, header),
            })
        }
    }

    rows.map(|(line, mut fields)| {
        if fields.len() != 2 {
            return Err(Error::Csv {
                line,
                message: format!("expected 2 fields, got {}", fields.len()),
            });
        }
        let text = fields.pop().unwrap_or_default();
        let name = fields.pop().unwrap_or_default();
        Ok(Record { name, text })
    })
    .collect()
}

/// Split CSV text into rows of fields, tagging each row with its starting line
fn parse_csv(contents: &str) -> Result<Vec<(usize, Vec<String>)>> {
    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_line = 1;
    let mut row_has_content = false;

    let mut chars = contents.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(ch);
                }
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            '"' => {
                in_quotes = true;
                row_has_content = true;
            }
            ',' => {
                fields.push(std::mem::take(&mut field));
                row_has_content = true;
            }
            '\r' => {}
            '\n' => {
                if row_has_content || !field.is_empty() {
                    fields.push(std::mem::take(&mut field));
                    rows.push((row_line, std::mem::take(&mut fields)));
                }
                row_has_content = false;
                line += 1;
                row_line = line;
            }
            _ => {
                field.push(ch);
                row_has_content = true;
            }
        }
    }

    if in_quotes {
        return Err(Error::Csv {
            line: row_line,
            message: "unterminated quoted field".to_string(),
        });
    }
    if row_has_content || !field.is_empty() {
        fields.push(field);
        rows.push((row_line, fields));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.csv");

        {
            let mut log = RecordLog::open(&path).unwrap();
            log.append(&Record::new("alice", "first")).unwrap();
        }
        {
            let mut log = RecordLog::open(&path).unwrap();
            log.append(&Record::new("bob", "second")).unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches(HEADER).count(), 1);
        assert_eq!(
            read_records(&path).unwrap(),
            vec![Record::new("alice", "first"), Record::new("bob", "second")]
        );
    }

    #[test]
    fn test_awkward_fields_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.csv");

        let records = vec![
            Record::new("carol", "He said \"meh\", then left"),
            Record::new("dave, jr.", "line one\nline two"),
            Record::new("", ""),
        ];
        RecordLog::open(&path).unwrap().extend(&records).unwrap();

        assert_eq!(read_records(&path).unwrap(), records);
    }

    #[test]
    fn test_quote_doubles_quotes() {
        assert_eq!(quote("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_read_unquoted_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.csv");
        fs::write(&path, "name,text\r\neve,hello there\r\n").unwrap();

        assert_eq!(
            read_records(&path).unwrap(),
            vec![Record::new("eve", "hello there")]
        );
    }

    #[test]
    fn test_rejects_bad_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");

        fs::write(&path, "who,what\na,b\n").unwrap();
        assert!(matches!(
            read_records(&path),
            Err(Error::Csv { line: 1, .. })
        ));

        fs::write(&path, "name,text\na,b,c\n").unwrap();
        assert!(matches!(
            read_records(&path),
            Err(Error::Csv { line: 2, .. })
        ));

        fs::write(&path, "name,text\n\"a,b\n").unwrap();
        assert!(matches!(
            read_records(&path),
            Err(Error::Csv { line: 2, .. })
        ));
    }

    #[test]
    fn test_empty_file_has_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();
        assert!(read_records(&path).unwrap().is_empty());
    }
}
