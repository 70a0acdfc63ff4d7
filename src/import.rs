use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;

use crate::error::ReplyError;

pub const REQUIRED_COLUMNS: [&str; 3] = ["sender", "subject", "content"];

const MAX_SENDER_LEN: usize = 320;

/// The `(sender, subject, content)` triple every email starts from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailInput {
    pub sender: String,
    pub subject: String,
    pub content: String,
}

impl EmailInput {
    /// Trims the sender and rejects records that cannot be stored.
    pub fn validated(self) -> Result<Self, ReplyError> {
        let sender = self.sender.trim();
        if sender.is_empty() {
            return Err(ReplyError::InvalidInput("sender must not be empty".into()));
        }
        if sender.chars().count() > MAX_SENDER_LEN {
            return Err(ReplyError::InvalidInput(format!(
                "sender must be at most {MAX_SENDER_LEN} characters"
            )));
        }
        Ok(Self {
            sender: sender.to_string(),
            subject: self.subject,
            content: self.content,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    /// 1-based line number; the header is line 1.
    pub line: usize,
    pub input: EmailInput,
}

#[derive(Debug, Default)]
pub struct CsvBatch {
    pub rows: Vec<CsvRow>,
    pub errors: Vec<String>,
}

fn column_positions(headers: &StringRecord) -> Option<[usize; 3]> {
    let position = |name: &str| {
        headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(name))
    };
    Some([
        position(REQUIRED_COLUMNS[0])?,
        position(REQUIRED_COLUMNS[1])?,
        position(REQUIRED_COLUMNS[2])?,
    ])
}

/// Splits a `sender,subject,content` CSV document into importable rows.
///
/// Bad rows are reported in [`CsvBatch::errors`] and skipped; a header missing
/// any required column yields no rows at all.
pub fn parse_email_csv(data: &str) -> CsvBatch {
    let data = data.strip_prefix('\u{feff}').unwrap_or(data);
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(data.as_bytes());

    let mut batch = CsvBatch::default();

    let columns = match reader.headers() {
        Ok(headers) => column_positions(headers),
        Err(err) => {
            batch.errors.push(format!("CSV parsing error: {err}"));
            return batch;
        }
    };
    let Some([sender_at, subject_at, content_at]) = columns else {
        batch.errors.push(format!(
            "CSV must contain columns: {}",
            REQUIRED_COLUMNS.join(", ")
        ));
        return batch;
    };

    for (index, record) in reader.records().enumerate() {
        let line = index + 2;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                batch.errors.push(format!("Row {line}: {err}"));
                continue;
            }
        };

        let field = |at: usize| record.get(at).unwrap_or_default().to_string();
        let input = EmailInput {
            sender: field(sender_at),
            subject: field(subject_at),
            content: field(content_at),
        };

        match input.validated() {
            Ok(input) => batch.rows.push(CsvRow { line, input }),
            Err(err) => batch.errors.push(format!("Row {line}: {err}")),
        }
    }

    batch
}
