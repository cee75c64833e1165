//! Streaming recoder over SAM text.
//!
//! Header and blank lines are copied verbatim. Mapped alignment records have
//! their SEQ column recoded against the reference they name; everything else
//! passes through. The first fatal error stops the run and carries the
//! offending line so callers can report it.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, BufRead, Write};

use thiserror::Error;
use tracing::{info, warn};

use crate::genomics::{
    Cigar, Mode, RecordError, ReferenceCache, ReferenceError, ReferenceOverrun,
    ReferenceProvider, SamLine, SamRecord, TranscodeError, Transcoder,
};

/// Overrun warnings logged individually before the rest are only counted.
pub const DEFAULT_WARNING_LOG_LIMIT: usize = 20;

/// Run-level settings for [`RecodePipeline`].
#[derive(Debug, Clone)]
pub struct RecodeConfig {
    /// Direction of the recoding.
    pub mode: Mode,
    /// Maximum number of reference overruns logged one by one.
    pub warning_log_limit: usize,
}

impl RecodeConfig {
    /// Default settings for `mode`.
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            warning_log_limit: DEFAULT_WARNING_LOG_LIMIT,
        }
    }

    /// Override how many overrun warnings are logged individually.
    pub fn with_warning_log_limit(mut self, limit: usize) -> Self {
        self.warning_log_limit = limit;
        self
    }
}

impl Default for RecodeConfig {
    fn default() -> Self {
        Self::new(Mode::Encode)
    }
}

/// Counters reported at the end of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Header lines copied through.
    pub header_lines: u64,
    /// Alignment records seen.
    pub records: u64,
    /// Mapped records whose sequence went through the transcoder.
    pub modified: u64,
    /// Unmapped records passed through.
    pub unmapped: u64,
    /// Mapped records without a stored sequence (`*`).
    pub skipped: u64,
    /// Reference overruns met across all records.
    pub overrun_warnings: u64,
    /// Reference lookups served by the cache slot.
    pub cache_hits: u64,
    /// Reference lookups that went to the provider.
    pub cache_misses: u64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Modified {} out of {} reads", self.modified, self.records)
    }
}

/// Reason a single record could not be recoded.
#[derive(Debug, Error)]
pub enum RecordFailure {
    /// The line is not a usable SAM record.
    #[error(transparent)]
    Record(#[from] RecordError),
    /// The record names a reference that was not loaded.
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    /// CIGAR and sequence could not be recoded.
    #[error(transparent)]
    Transcode(#[from] TranscodeError),
}

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A record could not be recoded.
    #[error("line {line_number}: {source}")]
    Record {
        /// 1-based line number of the offending record.
        line_number: u64,
        /// Raw offending line, terminator included.
        line: Vec<u8>,
        /// What went wrong.
        #[source]
        source: RecordFailure,
    },
}

impl PipelineError {
    /// Raw line that stopped the run, if a record was at fault.
    pub fn offending_line(&self) -> Option<&[u8]> {
        match self {
            Self::Record { line, .. } => Some(line.as_slice()),
            Self::Io(_) => None,
        }
    }

    /// Whether the run stopped on a reference missing from the loaded set.
    pub fn is_unknown_reference(&self) -> bool {
        matches!(
            self,
            Self::Record {
                source: RecordFailure::Reference(ReferenceError::UnknownReference(_)),
                ..
            }
        )
    }
}

/// Sequential recoder owning the reference cache for one run.
#[derive(Debug)]
pub struct RecodePipeline<'a, P: ?Sized> {
    config: RecodeConfig,
    transcoder: Transcoder,
    cache: ReferenceCache<'a, P>,
    summary: RunSummary,
}

impl<'a, P: ReferenceProvider + ?Sized> RecodePipeline<'a, P> {
    /// Create a pipeline reading references from `provider`.
    pub fn new(provider: &'a P, config: RecodeConfig) -> Self {
        Self {
            transcoder: Transcoder::new(config.mode),
            cache: ReferenceCache::new(provider),
            config,
            summary: RunSummary::default(),
        }
    }

    /// Recode every line of `reader` into `writer`.
    pub fn run<R, W>(mut self, mut reader: R, mut writer: W) -> Result<RunSummary, PipelineError>
    where
        R: BufRead,
        W: Write,
    {
        let mut buffer = Vec::new();
        let mut line_number = 0u64;

        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer)? == 0 {
                break;
            }
            line_number += 1;

            let output = self
                .recode_line(&buffer)
                .map_err(|source| PipelineError::Record {
                    line_number,
                    line: buffer.clone(),
                    source,
                })?;
            writer.write_all(&output)?;
        }
        writer.flush()?;

        self.summary.cache_hits = self.cache.hits();
        self.summary.cache_misses = self.cache.misses();
        let summary = self.summary;
        info!(
            mode = %self.config.mode,
            records = summary.records,
            modified = summary.modified,
            unmapped = summary.unmapped,
            skipped = summary.skipped,
            header_lines = summary.header_lines,
            overrun_warnings = summary.overrun_warnings,
            "recoding finished"
        );
        Ok(summary)
    }

    /// Recode one raw line, returning the bytes to emit.
    pub fn recode_line<'l>(&mut self, line: &'l [u8]) -> Result<Cow<'l, [u8]>, RecordFailure> {
        let record = match SamLine::parse(line)? {
            SamLine::Header(raw) => {
                self.summary.header_lines += 1;
                return Ok(Cow::Borrowed(raw));
            }
            SamLine::Blank(raw) => return Ok(Cow::Borrowed(raw)),
            SamLine::Record(record) => record,
        };

        self.summary.records += 1;
        if !record.is_mapped() {
            self.summary.unmapped += 1;
            return Ok(Cow::Borrowed(line));
        }
        if !record.has_sequence() {
            self.summary.skipped += 1;
            return Ok(Cow::Borrowed(line));
        }

        let reference = self.cache.get(record.reference_name())?;
        let cigar = Cigar::parse(record.cigar()).map_err(TranscodeError::from)?;
        let start = record
            .start()
            .ok_or_else(|| RecordError::MalformedRecord("mapped record with POS 0".to_string()))?;
        let transcoded = self
            .transcoder
            .transcode(&reference, record.sequence(), start, &cigar)?;

        for warning in &transcoded.warnings {
            self.report_overrun(&record, warning);
        }
        self.summary.modified += 1;

        Ok(record.with_sequence(line, &transcoded.sequence))
    }

    /// Counters accumulated so far.
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    fn report_overrun(&mut self, record: &SamRecord<'_>, warning: &ReferenceOverrun) {
        self.summary.overrun_warnings += 1;
        let seen = self.summary.overrun_warnings;
        let limit = self.config.warning_log_limit as u64;
        if seen <= limit {
            warn!(
                read = %String::from_utf8_lossy(record.read_name()),
                reference = record.reference_name(),
                cigar = %String::from_utf8_lossy(record.cigar()),
                "{warning}"
            );
        } else if seen == limit + 1 {
            warn!("further reference overrun warnings suppressed; see the run summary");
        }
    }
}

/// Recode a whole SAM stream with a fresh pipeline.
pub fn recode_stream<P, R, W>(
    provider: &P,
    config: RecodeConfig,
    reader: R,
    writer: W,
) -> Result<RunSummary, PipelineError>
where
    P: ReferenceProvider + ?Sized,
    R: BufRead,
    W: Write,
{
    RecodePipeline::new(provider, config).run(reader, writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::ReferenceSet;

    fn references() -> ReferenceSet {
        let mut set = ReferenceSet::new();
        set.insert("chrT", "ACGTWWWACGT").unwrap();
        set
    }

    fn recode(mode: Mode, input: &str) -> Result<(String, RunSummary), PipelineError> {
        let set = references();
        let mut output = Vec::new();
        let config = RecodeConfig::new(mode);
        let summary = recode_stream(&set, config, input.as_bytes(), &mut output)?;
        Ok((String::from_utf8(output).unwrap(), summary))
    }

    #[test]
    fn header_and_unmapped_lines_pass_through() {
        let input = "@HD\tVN:1.6\n\
                     u1\t4\t*\t0\t0\t*\t*\t0\t0\tTWWWA\tIIIII\n";
        let (output, summary) = recode(Mode::Encode, input).unwrap();
        assert_eq!(output, input);
        assert_eq!(summary.header_lines, 1);
        assert_eq!(summary.records, 1);
        assert_eq!(summary.unmapped, 1);
        assert_eq!(summary.modified, 0);
    }

    #[test]
    fn mapped_records_are_recoded_both_ways() {
        let plain = "r1\t0\tchrT\t4\t60\t5M\t*\t0\t0\tTWWWA\tIIIII\tNM:i:0\n";
        let coded = "r1\t0\tchrT\t4\t60\t5M\t*\t0\t0\t=====\tIIIII\tNM:i:0\n";

        let (encoded, summary) = recode(Mode::Encode, plain).unwrap();
        assert_eq!(encoded, coded);
        assert_eq!(summary.modified, 1);
        assert_eq!(summary.to_string(), "Modified 1 out of 1 reads");

        let (decoded, _) = recode(Mode::Decode, coded).unwrap();
        assert_eq!(decoded, plain);
    }

    #[test]
    fn missing_sequence_is_skipped() {
        let input = "r1\t0\tchrT\t4\t60\t5M\t*\t0\t0\t*\t*\n";
        let (output, summary) = recode(Mode::Encode, input).unwrap();
        assert_eq!(output, input);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.modified, 0);
    }

    #[test]
    fn unknown_reference_stops_the_run_with_the_line() {
        let bad = "r2\t0\tchrZ\t1\t60\t2M\t*\t0\t0\tAC\tII\n";
        let err = recode(Mode::Encode, bad).unwrap_err();
        assert!(err.is_unknown_reference());
        assert_eq!(err.offending_line(), Some(bad.as_bytes()));
        assert!(err.to_string().starts_with("line 1:"));
    }

    #[test]
    fn overruns_are_counted_not_fatal() {
        let input = "r1\t0\tchrT\t9\t60\t5M\t*\t0\t0\tCGTAA\tIIIII\n";
        let set = references();
        let mut output = Vec::new();
        let config = RecodeConfig::new(Mode::Encode).with_warning_log_limit(0);
        let summary = recode_stream(&set, config, input.as_bytes(), &mut output).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "r1\t0\tchrT\t9\t60\t5M\t*\t0\t0\t===AA\tIIIII\n"
        );
        assert_eq!(summary.overrun_warnings, 1);
    }
}
