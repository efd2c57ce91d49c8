//! Record codec: one self-tagged, tab-separated line per record.
//!
//! A row is `tag \t field \t field ...`. The tag is always plain text and
//! selects the restore handler. Fields are either plain text (validated to
//! contain no separator or line break when encoding) or payloads, which are
//! base64-wrapped so raw request/response bytes can never corrupt row
//! boundaries. Decoding never panics on arbitrary input; a payload that
//! fails base64 or UTF-8 yields a `CodecError` for the caller to map to its
//! row policy.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

/// Field separator between the tag and every field of a row.
pub const SEPARATOR: char = '\t';

/// Tags with a dedicated restore handler.
pub const KNOWN_TAGS: &[&str] = &[
    "ReplaceString",
    "ApiKey",
    "AiModel",
    "AiApiUrl",
    "EDFilter",
    "EDFilterUnauth",
    "IFFilter",
    "AndOrType",
    "AndOrTypeUnauth",
    "MatchReplace",
    "TemporaryHeader",
    "CheckBoxes",
    "RemoveDuplicates",
    "SavedHeader",
];

/// Number of positional fields in a legacy exchange row: three
/// host/port/protocol/request/response quintets plus two status labels.
pub const EXCHANGE_FIELD_COUNT: usize = 17;

/// Failure to encode or decode a single field.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("field {index} is missing")]
    MissingField { index: usize },

    #[error("field {index} is not valid base64: {source}")]
    Payload {
        index: usize,
        source: base64::DecodeError,
    },

    #[error("field {index} is not valid UTF-8")]
    NotUtf8 { index: usize },

    #[error("plain field contains the separator or a line break")]
    SeparatorInValue,
}

pub fn is_known_tag(field: &str) -> bool {
    KNOWN_TAGS.contains(&field)
}

/// Whether a first field could be a record tag at all, as opposed to the
/// leading host field of a legacy exchange row. Unknown tag-shaped rows come
/// from newer writers and are skipped rather than misread as exchanges.
pub fn is_tag_shaped(field: &str) -> bool {
    let mut chars = field.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Builds one encoded row.
#[derive(Debug)]
pub struct RowBuilder {
    fields: Vec<String>,
    error: Option<CodecError>,
}

impl RowBuilder {
    /// Start a row with its dispatch tag.
    pub fn tagged(tag: &str) -> Self {
        Self {
            fields: vec![tag.to_string()],
            error: None,
        }
    }

    /// Start a row with no tag, for legacy positional exchange records.
    pub fn positional() -> Self {
        Self {
            fields: Vec::new(),
            error: None,
        }
    }

    /// Append a plain-text field.
    pub fn text(mut self, value: impl ToString) -> Self {
        let value = value.to_string();
        if value.contains(SEPARATOR) || value.contains('\n') || value.contains('\r') {
            self.error.get_or_insert(CodecError::SeparatorInValue);
        }
        self.fields.push(value);
        self
    }

    /// Append a binary-safe payload field.
    pub fn payload(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.fields.push(BASE64.encode(bytes));
        self
    }

    pub fn finish(self) -> Result<String, CodecError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.fields.join("\t")),
        }
    }
}

/// One decoded row; fields are borrowed from the input line.
#[derive(Debug)]
pub struct Row<'a> {
    fields: Vec<&'a str>,
}

impl<'a> Row<'a> {
    pub fn parse(line: &'a str) -> Self {
        Self {
            fields: line.split(SEPARATOR).collect(),
        }
    }

    /// First field of the row. `split` always yields at least one field, so
    /// an empty line has the empty tag.
    pub fn tag(&self) -> &'a str {
        self.fields[0]
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Plain-text field at `index`.
    pub fn text(&self, index: usize) -> Result<&'a str, CodecError> {
        self.fields
            .get(index)
            .copied()
            .ok_or(CodecError::MissingField { index })
    }

    /// Payload field at `index`, decoded back to raw bytes.
    pub fn payload(&self, index: usize) -> Result<Vec<u8>, CodecError> {
        let field = self.text(index)?;
        BASE64
            .decode(field)
            .map_err(|source| CodecError::Payload { index, source })
    }

    /// Payload field at `index`, decoded as UTF-8 text.
    pub fn payload_text(&self, index: usize) -> Result<String, CodecError> {
        String::from_utf8(self.payload(index)?).map_err(|_| CodecError::NotUtf8 { index })
    }
}
