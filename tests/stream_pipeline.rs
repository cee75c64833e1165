#[path = "common/mod.rs"]
mod common;

use common::reference_set;
use samequals::genomics::{CigarError, Mode, TranscodeError};
use samequals::pipeline::RecordFailure;
use samequals::{recode_stream, PipelineError, RecodeConfig, RecodePipeline};

fn encode_stream(input: &str) -> Result<String, PipelineError> {
    let references = reference_set();
    let mut output = Vec::new();
    recode_stream(
        &references,
        RecodeConfig::new(Mode::Encode),
        input.as_bytes(),
        &mut output,
    )?;
    Ok(String::from_utf8(output).unwrap())
}

#[test]
fn last_line_without_newline_is_preserved() {
    let input = "r1\t0\tchrT\t4\t60\t5M\t*\t0\t0\tTWWWA\tIIIII";
    let output = encode_stream(input).unwrap();
    assert_eq!(output, "r1\t0\tchrT\t4\t60\t5M\t*\t0\t0\t=====\tIIIII");
}

#[test]
fn crlf_terminators_and_tags_pass_through() {
    let input = "@CO\tconverted on windows\r\nr1\t0\tchrT\t4\t60\t5M\t*\t0\t0\tTWWWA\tIIIII\tXA:Z:odd\ttabs\r\n";
    let output = encode_stream(input).unwrap();
    assert_eq!(
        output,
        "@CO\tconverted on windows\r\nr1\t0\tchrT\t4\t60\t5M\t*\t0\t0\t=====\tIIIII\tXA:Z:odd\ttabs\r\n"
    );
}

#[test]
fn inconsistent_cigar_aborts_at_offending_record() {
    let input = "r1\t0\tchrT\t4\t60\t5M\t*\t0\t0\tTWWWA\tIIIII\n\
                 r2\t0\tchrT\t4\t60\t5=\t*\t0\t0\tTWAWA\tIIIII\n\
                 r3\t0\tchrT\t4\t60\t5M\t*\t0\t0\tTWWWA\tIIIII\n";
    let err = encode_stream(input).unwrap_err();
    match &err {
        PipelineError::Record {
            line_number,
            source: RecordFailure::Transcode(TranscodeError::CigarConsistency { read_offset, .. }),
            ..
        } => {
            assert_eq!(*line_number, 2);
            assert_eq!(*read_offset, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        err.offending_line(),
        Some("r2\t0\tchrT\t4\t60\t5=\t*\t0\t0\tTWAWA\tIIIII\n".as_bytes())
    );
    assert!(!err.is_unknown_reference());
}

#[test]
fn bad_cigar_and_short_lines_are_fatal() {
    let err = encode_stream("r1\t0\tchrT\t4\t60\t5Q\t*\t0\t0\tTWWWA\tIIIII\n").unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Record {
            source: RecordFailure::Transcode(TranscodeError::Cigar(
                CigarError::UnsupportedOperator { .. }
            )),
            ..
        }
    ));

    let err = encode_stream("r1\t0\tchrT\t4\n").unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Record { source: RecordFailure::Record(_), .. }
    ));
}

#[test]
fn unknown_reference_is_flagged() {
    let err = encode_stream("r1\t0\tchr9\t4\t60\t5M\t*\t0\t0\tTWWWA\tIIIII\n").unwrap_err();
    assert!(err.is_unknown_reference());
}

#[test]
fn line_by_line_recoding_tracks_summary() {
    let references = reference_set();
    let mut pipeline = RecodePipeline::new(&references, RecodeConfig::new(Mode::Decode));

    let line = b"r1\t0\tchrT\t4\t60\t5M\t*\t0\t0\t=====\tIIIII\n";
    let out = pipeline.recode_line(line).unwrap();
    assert_eq!(&*out, b"r1\t0\tchrT\t4\t60\t5M\t*\t0\t0\tTWWWA\tIIIII\n");

    let header = b"@SQ\tSN:chrT\tLN:11\n";
    assert_eq!(&*pipeline.recode_line(header).unwrap(), &header[..]);

    assert_eq!(pipeline.summary().records, 1);
    assert_eq!(pipeline.summary().modified, 1);
    assert_eq!(pipeline.summary().header_lines, 1);
}

#[test]
fn soft_masked_read_round_trips_through_stream() {
    let plain = "r1\t0\tchrT\t4\t60\t5M\t*\t0\t0\ttWwWa\tIIIII\n";
    let encoded = encode_stream(plain).unwrap();
    assert_eq!(encoded, "r1\t0\tchrT\t4\t60\t5M\t*\t0\t0\tt=w=a\tIIIII\n");

    let references = reference_set();
    let mut decoded = Vec::new();
    recode_stream(
        &references,
        RecodeConfig::new(Mode::Decode),
        encoded.as_bytes(),
        &mut decoded,
    )
    .unwrap();
    assert_eq!(String::from_utf8(decoded).unwrap(), plain);
}
