use crate::constants::ROW_ELEMENT;
use crate::errors::{AppError, AppResult};
use crate::models::Record;
use quick_xml::encoding::Decoder;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Deserialize;
use std::io::BufRead;
use tracing::{debug, warn};

/// What to do with a `<row>` element whose attributes cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedRowPolicy {
    /// Log the row and continue with the next one
    #[default]
    Skip,
    /// Stop the stream with an error
    Abort,
}

impl MalformedRowPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Abort => "abort",
        }
    }
}

impl std::str::FromStr for MalformedRowPolicy {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(AppError::InvalidInput(format!(
                "Unknown malformed-row policy '{other}', expected 'skip' or 'abort'"
            ))),
        }
    }
}

/// Streams `<row .../>` elements out of a dump as [`Record`]s.
///
/// Only one element is held in memory at a time. Everything that is not a
/// row element (declaration, root element, whitespace, comments) is ignored.
/// Once the iterator returns `None` or an error it stays exhausted.
///
/// Input that ends while an element is still open (a dump cut off between two
/// rows) is reported as [`AppError::Xml`] rather than a clean end.
pub struct RowReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    policy: MalformedRowPolicy,
    open_elements: usize,
    rows_read: u64,
    rows_skipped: u64,
    finished: bool,
}

impl<R: BufRead> RowReader<R> {
    pub fn new(source: R, policy: MalformedRowPolicy) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(true);

        Self {
            reader,
            buf: Vec::with_capacity(8192),
            policy,
            open_elements: 0,
            rows_read: 0,
            rows_skipped: 0,
            finished: false,
        }
    }

    /// Number of records produced so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Number of row elements dropped under [`MalformedRowPolicy::Skip`].
    pub fn rows_skipped(&self) -> u64 {
        self.rows_skipped
    }

    fn fail(&mut self, err: AppError) -> Option<AppResult<Record>> {
        self.finished = true;
        Some(Err(err))
    }
}

impl<R: BufRead> Iterator for RowReader<R> {
    type Item = AppResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            self.buf.clear();
            let position = self.reader.buffer_position() as u64;

            let parsed = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) => {
                    self.open_elements += 1;
                    if e.name().as_ref() != ROW_ELEMENT {
                        continue;
                    }
                    record_from_element(&e, self.reader.decoder())
                }
                Ok(Event::Empty(e)) if e.name().as_ref() == ROW_ELEMENT => {
                    record_from_element(&e, self.reader.decoder())
                }
                Ok(Event::End(_)) => {
                    self.open_elements = self.open_elements.saturating_sub(1);
                    continue;
                }
                Ok(Event::Eof) if self.open_elements > 0 => {
                    self.finished = true;
                    return Some(Err(AppError::Xml {
                        position: self.reader.buffer_position() as u64,
                        message: format!(
                            "unexpected end of input: {} element(s) not closed",
                            self.open_elements
                        ),
                    }));
                }
                Ok(Event::Eof) => {
                    debug!(rows = self.rows_read, "Reached end of dump");
                    self.finished = true;
                    return None;
                }
                Ok(_) => continue,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(AppError::Xml {
                        position: self.reader.error_position() as u64,
                        message: e.to_string(),
                    }));
                }
            };

            match parsed {
                Ok(record) => {
                    self.rows_read += 1;
                    return Some(Ok(record));
                }
                Err(reason) => match self.policy {
                    MalformedRowPolicy::Skip => {
                        self.rows_skipped += 1;
                        warn!(position, reason = %reason, "Skipping malformed row");
                    }
                    MalformedRowPolicy::Abort => {
                        return self.fail(AppError::MalformedRow { position, reason });
                    }
                },
            }
        }
    }
}

/// Builds a record from the attributes of one row element.
///
/// Values are XML-unescaped. Literal tabs and line breaks in a value are
/// normalized to spaces as XML requires; escaped ones (`&#xA;`) are kept.
fn record_from_element(element: &BytesStart, decoder: Decoder) -> Result<Record, String> {
    let mut fields = Vec::with_capacity(20);

    for attr in element.attributes() {
        let attr = attr.map_err(|e| format!("invalid attribute: {e}"))?;
        let name = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| format!("attribute name is not UTF-8: {e}"))?
            .to_string();
        let raw = decoder
            .decode(&attr.value)
            .map_err(|e| format!("invalid value for attribute '{name}': {e}"))?;
        let value = unescape(&normalize_whitespace(&raw))
            .map_err(|e| format!("invalid value for attribute '{name}': {e}"))?
            .into_owned();
        fields.push((name, value));
    }

    Ok(fields.into_iter().collect())
}

fn normalize_whitespace(raw: &str) -> String {
    raw.replace("\r\n", " ").replace(['\t', '\n', '\r'], " ")
}
