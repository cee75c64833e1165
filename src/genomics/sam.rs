//! Line-level access to SAM text records.
//!
//! Only the fields needed for recoding are interpreted. An alignment line is
//! split into its first ten columns plus the untouched remainder (QUAL, any
//! optional tags and the line terminator), so a rebuilt record differs from
//! its input in the SEQ column only.

use std::borrow::Cow;

use thiserror::Error;

/// First byte of a SAM header line.
pub const HEADER_MARKER: u8 = b'@';
/// FLAG bit marking an unmapped segment.
pub const FLAG_UNMAPPED: u16 = 0x4;

const FIELD_SEPARATOR: u8 = b'\t';
const SPLIT_FIELDS: usize = 10;

const QNAME: usize = 0;
const FLAG: usize = 1;
const RNAME: usize = 2;
const POS: usize = 3;
const CIGAR: usize = 5;
const SEQ: usize = 9;

/// Errors raised for lines that cannot be read as SAM alignments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The line is not a well-formed alignment record.
    #[error("malformed SAM record: {0}")]
    MalformedRecord(String),
}

/// A single input line, classified.
#[derive(Debug, Clone, Copy)]
pub enum SamLine<'a> {
    /// `@`-prefixed header line.
    Header(&'a [u8]),
    /// Line holding nothing but its terminator.
    Blank(&'a [u8]),
    /// Alignment record.
    Record(SamRecord<'a>),
}

impl<'a> SamLine<'a> {
    /// Classify a raw line (terminator included).
    pub fn parse(line: &'a [u8]) -> Result<Self, RecordError> {
        if line.first() == Some(&HEADER_MARKER) {
            return Ok(Self::Header(line));
        }
        if line.iter().all(|&b| b == b'\n' || b == b'\r') {
            return Ok(Self::Blank(line));
        }
        SamRecord::parse(line).map(Self::Record)
    }
}

/// Borrowed view over one alignment line.
#[derive(Debug, Clone, Copy)]
pub struct SamRecord<'a> {
    fields: [&'a [u8]; SPLIT_FIELDS],
    rest: &'a [u8],
    reference_name: &'a str,
    flags: u16,
    position: u32,
}

impl<'a> SamRecord<'a> {
    /// Split a raw alignment line into its fields.
    pub fn parse(line: &'a [u8]) -> Result<Self, RecordError> {
        let mut fields: [&'a [u8]; SPLIT_FIELDS] = [&b""[..]; SPLIT_FIELDS];
        let mut columns = line.splitn(SPLIT_FIELDS + 1, |&b| b == FIELD_SEPARATOR);

        for (idx, slot) in fields.iter_mut().enumerate() {
            *slot = columns.next().ok_or_else(|| {
                RecordError::MalformedRecord(format!(
                    "expected at least 11 tab-separated fields, found {idx}"
                ))
            })?;
        }
        let rest = columns.next().ok_or_else(|| {
            RecordError::MalformedRecord(format!(
                "expected at least 11 tab-separated fields, found {SPLIT_FIELDS}"
            ))
        })?;

        let flags = parse_number::<u16>(fields[FLAG], "FLAG")?;
        let position = parse_number::<u32>(fields[POS], "POS")?;
        let reference_name = std::str::from_utf8(fields[RNAME])
            .map_err(|_| RecordError::MalformedRecord("RNAME is not valid UTF-8".to_string()))?;

        let record = Self {
            fields,
            rest,
            reference_name,
            flags,
            position,
        };
        if record.is_mapped() && position == 0 {
            return Err(RecordError::MalformedRecord(
                "mapped record with POS 0".to_string(),
            ));
        }
        Ok(record)
    }

    /// QNAME column.
    pub fn read_name(&self) -> &'a [u8] {
        self.fields[QNAME]
    }

    /// FLAG column.
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// RNAME column.
    pub fn reference_name(&self) -> &'a str {
        self.reference_name
    }

    /// 1-based POS column.
    pub fn position(&self) -> u32 {
        self.position
    }

    /// 0-based leftmost reference offset, `None` for POS 0.
    pub fn start(&self) -> Option<usize> {
        (self.position as usize).checked_sub(1)
    }

    /// CIGAR column.
    pub fn cigar(&self) -> &'a [u8] {
        self.fields[CIGAR]
    }

    /// SEQ column.
    pub fn sequence(&self) -> &'a [u8] {
        self.fields[SEQ]
    }

    /// Whether the record names a reference and lacks the unmapped flag.
    pub fn is_mapped(&self) -> bool {
        self.reference_name != "*" && self.flags & FLAG_UNMAPPED == 0
    }

    /// Whether SEQ holds bases rather than the `*` placeholder.
    pub fn has_sequence(&self) -> bool {
        self.sequence() != b"*"
    }

    /// Serialize the record with `sequence` in the SEQ column.
    pub fn rebuild(&self, sequence: &[u8]) -> Vec<u8> {
        let capacity = self.fields.iter().map(|f| f.len() + 1).sum::<usize>()
            + self.rest.len()
            + sequence.len();
        let mut line = Vec::with_capacity(capacity);
        for (idx, &field) in self.fields.iter().enumerate() {
            let field = if idx == SEQ { sequence } else { field };
            line.extend_from_slice(field);
            line.push(FIELD_SEPARATOR);
        }
        line.extend_from_slice(self.rest);
        line
    }

    /// Raw line when `sequence` equals the stored one, a rebuilt copy otherwise.
    pub fn with_sequence(&self, original: &'a [u8], sequence: &[u8]) -> Cow<'a, [u8]> {
        if sequence == self.sequence() {
            Cow::Borrowed(original)
        } else {
            Cow::Owned(self.rebuild(sequence))
        }
    }
}

fn parse_number<T: std::str::FromStr>(field: &[u8], column: &str) -> Result<T, RecordError> {
    std::str::from_utf8(field)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| {
            RecordError::MalformedRecord(format!(
                "{column} '{}' is not a valid number",
                String::from_utf8_lossy(field)
            ))
        })
}
