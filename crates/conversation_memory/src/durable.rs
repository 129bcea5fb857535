use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::error::ConversationStoreError;
use crate::schema::{ConversationHeader, JsonLine, TurnRecord, HISTORY_VERSION};
use crate::store::{next_sequence, ConversationStore, Turn};

/// JSON-lines history file: one header line, then one line per turn.
///
/// Every `add` is flushed with `sync_data` before it returns, so a turn the
/// caller saw recorded survives a crash. `clear` swaps in a header-only file
/// through a rename, never leaving a half-written history behind.
#[derive(Debug)]
pub struct JsonlConversationStore {
    path: PathBuf,
    file: File,
    header: ConversationHeader,
    turns: Vec<Turn>,
    committed_len: u64,
}

impl JsonlConversationStore {
    /// Opens the history at `path`, creating it (and missing parent
    /// directories) when absent.
    pub fn open(path: &Path) -> Result<Self, ConversationStoreError> {
        if path.exists() {
            Self::load(path)
        } else {
            Self::create(path)
        }
    }

    fn create(path: &Path) -> Result<Self, ConversationStoreError> {
        let path = path.to_path_buf();
        if let Some(parent) = non_empty_parent(&path) {
            fs::create_dir_all(parent).map_err(|source| {
                ConversationStoreError::io("creating history directory", parent, source)
            })?;
        }

        let header = ConversationHeader::v1(uuid::Uuid::new_v4().to_string(), now_rfc3339()?);
        let committed_len = write_fresh_file(&path, &header)?;
        let file = open_for_append(&path)?;
        debug!(path = %path.display(), conversation_id = %header.conversation_id, "created history file");

        Ok(Self {
            path,
            file,
            header,
            turns: Vec::new(),
            committed_len,
        })
    }

    fn load(path: &Path) -> Result<Self, ConversationStoreError> {
        let path = path.to_path_buf();
        let bytes = fs::read(&path)
            .map_err(|source| ConversationStoreError::io("reading history file", &path, source))?;

        let mut header: Option<ConversationHeader> = None;
        let mut turns: Vec<Turn> = Vec::new();
        let mut committed_len = 0usize;

        for (line_index, raw_line) in bytes.split_inclusive(|byte| *byte == b'\n').enumerate() {
            let line_number = line_index + 1;
            let terminated = raw_line.ends_with(b"\n");

            let parsed = std::str::from_utf8(raw_line)
                .map_err(|_| ConversationStoreError::InvalidUtf8 {
                    path: path.clone(),
                    line: line_number,
                })
                .and_then(|line| parse_json_line(&path, line_number, line));

            let parsed = match parsed {
                Ok(parsed) => parsed,
                Err(error) if !terminated => {
                    warn!(
                        path = %path.display(),
                        line = line_number,
                        %error,
                        "dropping torn trailing history record"
                    );
                    break;
                }
                Err(error) => return Err(error),
            };

            if line_number == 1 {
                match parsed {
                    JsonLine::Conversation(parsed_header) => {
                        validate_header_line(&path, line_number, &parsed_header)?;
                        header = Some(parsed_header);
                    }
                    JsonLine::Turn(_) => {
                        return Err(ConversationStoreError::InvalidHeaderRecord {
                            path,
                            line: line_number,
                        });
                    }
                }
            } else {
                match parsed {
                    JsonLine::Conversation(_) => {
                        return Err(ConversationStoreError::InvalidTurnRecord {
                            path,
                            line: line_number,
                        });
                    }
                    JsonLine::Turn(record) => {
                        let previous = turns.last().map_or(0, Turn::sequence);
                        validate_turn_line(&path, line_number, previous, &record)?;
                        turns.push(Turn::new(record.seq, record.user, record.response));
                    }
                }
            }

            committed_len += raw_line.len();
        }

        let header = header.ok_or_else(|| ConversationStoreError::MissingHeader {
            path: path.clone(),
        })?;

        if committed_len < bytes.len() {
            truncate_to(&path, committed_len as u64)?;
        }

        let mut file = open_for_append(&path)?;
        let mut committed_len = committed_len as u64;
        if committed_len.checked_sub(1).and_then(|last| bytes.get(last as usize)) != Some(&b'\n') {
            file.write_all(b"\n")
                .and_then(|()| file.sync_data())
                .map_err(|source| {
                    ConversationStoreError::io("terminating last history record", &path, source)
                })?;
            committed_len += 1;
        }

        debug!(path = %path.display(), turns = turns.len(), "opened history file");

        Ok(Self {
            path,
            file,
            header,
            turns,
            committed_len,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn header(&self) -> &ConversationHeader {
        &self.header
    }
}

impl ConversationStore for JsonlConversationStore {
    fn add(&mut self, user: &str, response: &str) -> Result<&Turn, ConversationStoreError> {
        let sequence = next_sequence(&self.turns);
        let record = TurnRecord::new(sequence, now_rfc3339()?, user, response);
        let mut line = serde_json::to_string(&record)
            .map_err(|source| ConversationStoreError::json_serialize(&self.path, source))?;
        line.push('\n');

        let written = self
            .file
            .write_all(line.as_bytes())
            .and_then(|()| self.file.sync_data());
        if let Err(source) = written {
            // Cut off any partial line so later appends stay parseable.
            rollback_partial_append(&self.file, self.committed_len, &self.path);
            return Err(ConversationStoreError::io(
                "appending turn",
                &self.path,
                source,
            ));
        }

        self.committed_len += line.len() as u64;
        self.turns.push(Turn::new(sequence, user, response));
        debug!(path = %self.path.display(), sequence, "committed turn");

        Ok(&self.turns[self.turns.len() - 1])
    }

    fn list(&self) -> &[Turn] {
        &self.turns
    }

    fn clear(&mut self) -> Result<(), ConversationStoreError> {
        let committed_len = write_fresh_file(&self.path, &self.header)?;
        self.file = open_for_append(&self.path)?;
        self.committed_len = committed_len;
        self.turns.clear();
        debug!(path = %self.path.display(), "cleared history file");
        Ok(())
    }
}

fn now_rfc3339() -> Result<String, ConversationStoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(ConversationStoreError::ClockFormat)
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|parent| !parent.as_os_str().is_empty())
}

fn open_for_append(path: &Path) -> Result<File, ConversationStoreError> {
    OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|source| ConversationStoreError::io("opening history file for append", path, source))
}

fn truncate_to(path: &Path, len: u64) -> Result<(), ConversationStoreError> {
    OpenOptions::new()
        .write(true)
        .open(path)
        .and_then(|file| {
            file.set_len(len)?;
            file.sync_all()
        })
        .map_err(|source| ConversationStoreError::io("truncating torn history record", path, source))
}

/// Returns `false` when the file could not be cut back, leaving a torn
/// record for the next `open` to drop.
fn rollback_partial_append(file: &File, committed_len: u64, path: &Path) -> bool {
    match file.set_len(committed_len) {
        Ok(()) => true,
        Err(error) => {
            warn!(
                path = %path.display(),
                committed_len,
                %error,
                "failed to roll back partial history record"
            );
            false
        }
    }
}

/// Atomically replaces `path` with a file holding only `header`.
fn write_fresh_file(
    path: &Path,
    header: &ConversationHeader,
) -> Result<u64, ConversationStoreError> {
    let directory = non_empty_parent(path).unwrap_or_else(|| Path::new("."));
    let mut line = serde_json::to_string(header)
        .map_err(|source| ConversationStoreError::json_serialize(path, source))?;
    line.push('\n');

    let mut temp = NamedTempFile::new_in(directory).map_err(|source| {
        ConversationStoreError::io("creating temporary history file", directory, source)
    })?;
    temp.write_all(line.as_bytes())
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|source| {
            ConversationStoreError::io("writing temporary history file", temp.path(), source)
        })?;
    temp.persist(path).map_err(|error| {
        ConversationStoreError::io("replacing history file", path, error.error)
    })?;

    Ok(line.len() as u64)
}

pub(crate) fn parse_json_line(
    path: &Path,
    line_number: usize,
    line: &str,
) -> Result<JsonLine, ConversationStoreError> {
    let value = serde_json::from_str::<Value>(line)
        .map_err(|source| ConversationStoreError::json_line(path, line_number, source))?;
    let record_type = value.get("type").and_then(Value::as_str).map(str::to_owned);

    match record_type.as_deref() {
        Some("conversation") => serde_json::from_value(value)
            .map(JsonLine::Conversation)
            .map_err(|source| ConversationStoreError::json_line(path, line_number, source)),
        Some("turn") => serde_json::from_value(value)
            .map(JsonLine::Turn)
            .map_err(|source| ConversationStoreError::json_line(path, line_number, source)),
        _ => Err(ConversationStoreError::UnknownRecordType {
            path: path.to_path_buf(),
            line: line_number,
            found: record_type,
        }),
    }
}

pub(crate) fn validate_header_line(
    path: &Path,
    line_number: usize,
    header: &ConversationHeader,
) -> Result<(), ConversationStoreError> {
    if header.version != HISTORY_VERSION {
        return Err(ConversationStoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            line: line_number,
            found: header.version,
        });
    }

    validate_rfc3339(path, line_number, "created_at", &header.created_at)
}

pub(crate) fn validate_turn_line(
    path: &Path,
    line_number: usize,
    previous: u64,
    record: &TurnRecord,
) -> Result<(), ConversationStoreError> {
    if record.seq <= previous {
        return Err(ConversationStoreError::NonMonotonicSequence {
            path: path.to_path_buf(),
            line: line_number,
            previous,
            found: record.seq,
        });
    }

    validate_rfc3339(path, line_number, "ts", &record.ts)
}

pub(crate) fn validate_rfc3339(
    path: &Path,
    line_number: usize,
    field: &'static str,
    value: &str,
) -> Result<(), ConversationStoreError> {
    if OffsetDateTime::parse(value, &Rfc3339).is_err() {
        return Err(ConversationStoreError::InvalidTimestamp {
            path: path.to_path_buf(),
            line: line_number,
            field,
            value: value.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_cuts_back_to_the_committed_length() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.jsonl");
        fs::write(&path, "{\"committed\":1}\n{\"torn\":").expect("seed");
        let file = OpenOptions::new().append(true).open(&path).expect("open");

        assert!(rollback_partial_append(&file, 16, &path));
        assert_eq!(fs::read_to_string(&path).expect("read"), "{\"committed\":1}\n");
    }

    #[test]
    fn rollback_failure_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.jsonl");
        fs::write(&path, "{\"committed\":1}\n{\"torn\":").expect("seed");
        let read_only = File::open(&path).expect("open");

        assert!(!rollback_partial_append(&read_only, 16, &path));
        assert_eq!(fs::metadata(&path).expect("metadata").len(), 24);
    }
}
