//! File format adapters
//!
//! Readers for GFF3/GTF (through the transcript assembler) and BED12, and
//! writers for BED12, BED6 and EXTB, tied together by the `convert` driver.

pub mod assembler;
pub mod attributes;
pub mod bed;
pub mod extb;
pub mod gff;

pub use assembler::{assemble, AssembledTranscripts, KinshipTable, TranscriptAssembler, TranscriptEntry};
pub use attributes::{parse_attributes, AttributeParseError, AttributePolicy, Attributes};
pub use bed::{parse_bed12_line, to_bed12, to_bed6, BedParseError, BedReader, BedRecordView};
pub use extb::to_extb;
pub use gff::{check_format, detect_format, FeatureKind, FileFormat, GffParseError, LineRecord};

use crate::core::annotation::{GenomicAnnotation, OrientationPolicy};
use crate::core::error::{GenialError, Result};
use crate::core::filter::AnnotationFilter;
use log::{debug, info};
use std::io::{BufRead, Write};

/// Accepted input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Gff3,
    Gtf,
    Bed,
}

impl InputFormat {
    /// Parse from string (for CLI argument)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gff3" | "gff" => Some(InputFormat::Gff3),
            "gtf" => Some(InputFormat::Gtf),
            "bed" | "bed12" => Some(InputFormat::Bed),
            _ => None,
        }
    }

    /// GFF flavour this input is read as; `None` for BED
    pub fn file_format(self) -> Option<FileFormat> {
        match self {
            InputFormat::Gff3 => Some(FileFormat::Gff3),
            InputFormat::Gtf => Some(FileFormat::Gtf),
            InputFormat::Bed => None,
        }
    }
}

/// Produced output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// BED12, one row per transcript
    Bed,
    /// BED6, one row per block
    Bed6,
    Extb,
}

impl OutputFormat {
    /// Parse from string (for CLI argument)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bed" | "bed12" => Some(OutputFormat::Bed),
            "bed6" => Some(OutputFormat::Bed6),
            "extb" => Some(OutputFormat::Extb),
            _ => None,
        }
    }
}

/// Resolve a format name, failing with `UnsupportedFormat`
pub fn input_format(name: &str) -> Result<InputFormat> {
    InputFormat::from_str(name).ok_or_else(|| GenialError::UnsupportedFormat(name.to_string()))
}

/// Resolve a format name, failing with `UnsupportedFormat`
pub fn output_format(name: &str) -> Result<OutputFormat> {
    OutputFormat::from_str(name).ok_or_else(|| GenialError::UnsupportedFormat(name.to_string()))
}

/// Parsing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    /// Handling of attribute tokens that do not parse
    pub attribute_policy: AttributePolicy,
    /// How blocks are brought into ascending order
    pub orientation_policy: OrientationPolicy,
    /// Skip detection and read GFF/GTF lines as this flavour
    pub format: Option<FileFormat>,
}

/// Configuration of a whole conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    pub input_format: InputFormat,
    pub output_format: OutputFormat,
    /// Merge blocks separated by at most this many bases
    pub small_gap: Option<u64>,
    pub filter: AnnotationFilter,
    pub parse: ParseOptions,
}

impl ConvertOptions {
    pub fn new(input_format: InputFormat, output_format: OutputFormat) -> Self {
        Self {
            input_format,
            output_format,
            small_gap: None,
            filter: AnnotationFilter::default(),
            parse: ParseOptions::default(),
        }
    }
}

/// Conversion statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversionStats {
    /// Annotations read
    pub total: usize,
    /// Annotations written
    pub written: usize,
    /// Annotations dropped by the filter
    pub filtered: usize,
    /// Annotations that lost blocks to gap merging
    pub merged: usize,
}

/// Annotation stream of any supported input
pub type Annotations<'a> = Box<dyn Iterator<Item = Result<GenomicAnnotation>> + 'a>;

/// Parse an input stream into annotations.
///
/// GFF3 and GTF go through the same assembler, read as the requested
/// flavour unless `options.format` names another one. The first data
/// line must match it, otherwise the parse fails with `UnsupportedFormat`.
pub fn parse<'a, R: BufRead + 'a>(
    reader: R,
    input_format: InputFormat,
    options: &ParseOptions,
) -> Result<Annotations<'a>> {
    match input_format {
        InputFormat::Gff3 | InputFormat::Gtf => {
            let options = ParseOptions {
                format: options.format.or(input_format.file_format()),
                ..*options
            };
            let transcripts = assemble(reader, &options)?;
            info!("Block orientation: {}", transcripts.orientation());
            Ok(Box::new(transcripts))
        }
        InputFormat::Bed => Ok(Box::new(BedReader::new(reader, options.orientation_policy))),
    }
}

/// Format one annotation; BED6 output spans several lines
pub fn format_annotation(annotation: &GenomicAnnotation, format: OutputFormat) -> String {
    match format {
        OutputFormat::Bed => to_bed12(annotation),
        OutputFormat::Bed6 => to_bed6(annotation),
        OutputFormat::Extb => to_extb(annotation),
    }
}

/// Run a conversion: parse, merge small gaps, filter, write.
///
/// A closed output pipe ends the conversion early without error; the
/// returned statistics cover what was written until then.
pub fn convert<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    options: &ConvertOptions,
) -> Result<ConversionStats> {
    let mut stats = ConversionStats::default();

    for annotation in parse(reader, options.input_format, &options.parse)? {
        let mut annotation = annotation?;
        stats.total += 1;

        if let Some(gap) = options.small_gap {
            let before = annotation.block_count();
            if annotation.merge_small_gaps(gap).block_count() < before {
                stats.merged += 1;
            }
        }

        if !options.filter.accepts(&annotation) {
            stats.filtered += 1;
            continue;
        }

        let line = format_annotation(&annotation, options.output_format);
        match writeln!(writer, "{}", line).map_err(GenialError::from) {
            Ok(()) => stats.written += 1,
            Err(e) if e.is_broken_pipe() => {
                debug!("output closed after {} annotations", stats.written);
                return Ok(stats);
            }
            Err(e) => return Err(e),
        }
    }

    match writer.flush().map_err(GenialError::from) {
        Err(e) if !e.is_broken_pipe() => Err(e),
        _ => Ok(stats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, ErrorKind};

    const GFF3: &str = "\
##gff-version 3
chr1\tsrc\tgene\t1\t1000\t.\t+\t.\tID=g1
chr1\tsrc\tmRNA\t101\t400\t.\t+\t.\tID=tx1;Parent=g1
chr1\tsrc\texon\t101\t200\t.\t+\t.\tParent=tx1
chr1\tsrc\texon\t206\t400\t.\t+\t.\tParent=tx1
chr1\tsrc\tmRNA\t101\t200\t.\t+\t.\tID=tx2;Parent=g1
chr1\tsrc\texon\t101\t200\t.\t+\t.\tParent=tx2
";

    fn run(options: &ConvertOptions) -> (String, ConversionStats) {
        let mut out = Vec::new();
        let stats = convert(GFF3.as_bytes(), &mut out, options).unwrap();
        (String::from_utf8(out).unwrap(), stats)
    }

    #[test]
    fn test_convert_gff3_to_extb() {
        let options = ConvertOptions::new(InputFormat::Gff3, OutputFormat::Extb);
        let (out, stats) = run(&options);
        assert_eq!(
            out,
            "chr1:101-400\t+\ttx1\tg1\t2\t295\t100,195\t5\nchr1:101-200\t+\ttx2\tg1\t1\t100\t100\tNA\n"
        );
        assert_eq!(stats.total, 2);
        assert_eq!(stats.written, 2);
    }

    #[test]
    fn test_convert_merge_and_filter() {
        let mut options = ConvertOptions::new(InputFormat::Gff3, OutputFormat::Bed);
        options.small_gap = Some(5);
        options.filter.min_exon_count = 2;
        let (out, stats) = run(&options);
        assert_eq!(out, "");
        assert_eq!(stats.merged, 1);
        assert_eq!(stats.filtered, 2);

        options.filter.invert_match = true;
        let (out, _) = run(&options);
        assert_eq!(out.lines().count(), 2);
        assert!(out.starts_with("chr1\t100\t400\ttx1\t1000\t+\t100\t100\t200,155,55\t1\t300\t0\n"));
    }

    #[test]
    fn test_convert_bed6() {
        let options = ConvertOptions::new(InputFormat::Gff3, OutputFormat::Bed6);
        let (out, stats) = run(&options);
        assert_eq!(out.lines().count(), 3);
        assert_eq!(stats.written, 2);
    }

    #[test]
    fn test_unknown_format_names() {
        assert!(matches!(output_format("gff3"), Err(GenialError::UnsupportedFormat(_))));
        assert!(matches!(input_format("vcf"), Err(GenialError::UnsupportedFormat(_))));
        assert_eq!(input_format("BED12").unwrap(), InputFormat::Bed);
        assert_eq!(OutputFormat::from_str("extb"), Some(OutputFormat::Extb));
    }

    const GENCODE_GTF: &str = "\
chr1\tHAVANA\ttranscript\t11869\t14409\t.\t+\t.\tgene_id \"ENSG00000223972.5\"; transcript_id \"ENST00000456328.2\"; gene_type \"transcribed_unprocessed_pseudogene\"; level 2; tag \"basic\";
chr1\tHAVANA\texon\t11869\t12227\t.\t+\t.\tgene_id \"ENSG00000223972.5\"; transcript_id \"ENST00000456328.2\"; exon_number 1; level 2;
chr1\tHAVANA\texon\t12613\t12721\t.\t+\t.\tgene_id \"ENSG00000223972.5\"; transcript_id \"ENST00000456328.2\"; exon_number 2; level 2;
";

    #[test]
    fn test_gencode_gtf_with_unquoted_values() {
        let options = ConvertOptions::new(InputFormat::Gtf, OutputFormat::Extb);
        let mut out = Vec::new();
        let stats = convert(GENCODE_GTF.as_bytes(), &mut out, &options).unwrap();
        assert_eq!(stats.written, 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "chr1:11869-12721\t+\tENST00000456328.2\tENSG00000223972.5\t2\t468\t359,109\t385\n"
        );
    }

    #[test]
    fn test_requested_format_is_binding() {
        let options = ConvertOptions::new(InputFormat::Gtf, OutputFormat::Bed);
        let result = convert(GFF3.as_bytes(), &mut Vec::<u8>::new(), &options);
        assert!(matches!(result, Err(GenialError::UnsupportedFormat(_))));

        let options = ConvertOptions::new(InputFormat::Gff3, OutputFormat::Bed);
        let result = convert(GENCODE_GTF.as_bytes(), &mut Vec::<u8>::new(), &options);
        assert!(matches!(result, Err(GenialError::UnsupportedFormat(_))));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_broken_pipe_is_not_an_error() {
        let options = ConvertOptions::new(InputFormat::Gff3, OutputFormat::Bed);
        let stats = convert(GFF3.as_bytes(), &mut ClosedPipe, &options).unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.written, 0);
    }
}
