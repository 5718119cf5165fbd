//! GFF3/GTF line adapter
//!
//! Typed view over one 9-column annotation line, plus detection of the
//! flavour (GFF3 or GTF) from the attribute column.
//! GFF coordinates are 1-based and closed (unlike BED which is 0-based).

use crate::core::error::{GenialError, Result};
use crate::formats::attributes::{
    has_id_token, parse_attributes, AttributeParseError, AttributePolicy, Attributes,
};
use memchr::memchr;
use std::fmt;
use std::str::FromStr;

/// Number of tab-separated columns in a GFF/GTF line
pub const GFF_FIELDS: usize = 9;

/// Annotation line flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Gff3,
    Gtf,
}

impl FileFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Gff3 => "gff3",
            FileFormat::Gtf => "gtf",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FileFormat {
    type Err = GenialError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gff3" | "gff" => Ok(FileFormat::Gff3),
            "gtf" | "gff2" => Ok(FileFormat::Gtf),
            other => Err(GenialError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Feature column values the assembler cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Gene,
    Transcript,
    Exon,
    Cds,
    Other,
}

impl FeatureKind {
    pub fn from_feature(feature: &str) -> Self {
        match feature {
            "gene" => FeatureKind::Gene,
            "transcript" | "mRNA" => FeatureKind::Transcript,
            "exon" => FeatureKind::Exon,
            "CDS" => FeatureKind::Cds,
            _ => FeatureKind::Other,
        }
    }

    /// Exon and CDS lines carry block coordinates
    pub fn is_block(&self) -> bool {
        matches!(self, FeatureKind::Exon | FeatureKind::Cds)
    }
}

/// GFF/GTF parse error
#[derive(Debug, Clone, thiserror::Error)]
pub enum GffParseError {
    #[error("Empty line")]
    EmptyLine,

    #[error("Wrong number of fields: expected {expected}, found {found}")]
    WrongFieldCount { expected: usize, found: usize },

    #[error("Invalid number in field {0}: {1}")]
    InvalidNumber(&'static str, String),

    #[error(transparent)]
    Attribute(#[from] AttributeParseError),
}

impl GffParseError {
    /// Lift into the crate error, attaching the line number
    pub fn at_line(self, line: usize) -> GenialError {
        match self {
            GffParseError::Attribute(source) => GenialError::AttributeParse { line, source },
            other => GenialError::malformed(line, other.to_string()),
        }
    }
}

/// Split a line on tabs
pub(crate) fn split_fields(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut fields = Vec::with_capacity(GFF_FIELDS + 3);
    let mut start_pos = 0;

    while let Some(tab_pos) = memchr(b'\t', &bytes[start_pos..]) {
        let end_pos = start_pos + tab_pos;
        fields.push(&line[start_pos..end_pos]);
        start_pos = end_pos + 1;
    }
    // Last field
    fields.push(&line[start_pos..]);
    fields
}

fn split_gff_fields(line: &str) -> std::result::Result<Vec<&str>, GffParseError> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.is_empty() {
        return Err(GffParseError::EmptyLine);
    }
    let fields = split_fields(line);
    if fields.len() != GFF_FIELDS {
        return Err(GffParseError::WrongFieldCount {
            expected: GFF_FIELDS,
            found: fields.len(),
        });
    }
    Ok(fields)
}

/// Typed view over one GFF3/GTF line
/// Fields: seqname, source, feature, start, end, score, strand, frame, attributes
/// Coordinates are 1-based, closed interval [start, end]
#[derive(Debug, Clone)]
pub struct LineRecord<'a> {
    /// Sequence name (chromosome)
    pub chrom: &'a str,
    pub source: &'a str,
    /// Feature type
    pub feature: &'a str,
    /// Start position (1-based)
    pub start: u64,
    /// End position (1-based, inclusive)
    pub end: u64,
    pub score: &'a str,
    /// Strand as written; validated when the annotation is built
    pub strand: &'a str,
    /// Frame/phase field
    pub frame: &'a str,
    pub attributes: Attributes,
    pub file_format: FileFormat,
}

impl<'a> LineRecord<'a> {
    /// Parse a GFF/GTF line with the given flavour
    pub fn parse(
        line: &'a str,
        file_format: FileFormat,
        policy: AttributePolicy,
    ) -> std::result::Result<Self, GffParseError> {
        let fields = split_gff_fields(line)?;

        let start: u64 = fields[3]
            .parse()
            .map_err(|_| GffParseError::InvalidNumber("start", fields[3].to_string()))?;
        let end: u64 = fields[4]
            .parse()
            .map_err(|_| GffParseError::InvalidNumber("end", fields[4].to_string()))?;

        let attributes = parse_attributes(fields[8], file_format, policy)?;

        Ok(Self {
            chrom: fields[0],
            source: fields[1],
            feature: fields[2],
            start,
            end,
            score: fields[5],
            strand: fields[6],
            frame: fields[7],
            attributes,
            file_format,
        })
    }

    pub fn kind(&self) -> FeatureKind {
        FeatureKind::from_feature(self.feature)
    }

    /// Phase as a number; `None` for '.'
    pub fn phase(&self) -> Option<u8> {
        self.frame.parse().ok()
    }

    /// Transcripts owning this exon/CDS line.
    /// GFF3 uses `Parent` (possibly several), GTF uses `transcript_id`.
    pub fn block_parents(&self) -> Vec<&str> {
        match self.file_format {
            FileFormat::Gff3 => {
                let parents = self.attributes.parents();
                if parents.is_empty() {
                    self.attributes.transcript_id().into_iter().collect()
                } else {
                    parents
                }
            }
            FileFormat::Gtf => self.attributes.transcript_id().into_iter().collect(),
        }
    }

    /// Id of a gene/transcript-level line and its parent reference
    pub fn kinship(&self) -> Option<(&str, Option<&str>)> {
        match self.file_format {
            FileFormat::Gff3 => {
                let id = self.attributes.id()?;
                Some((id, self.attributes.parents().first().copied()))
            }
            FileFormat::Gtf => {
                let id = self.attributes.transcript_id()?;
                Some((id, self.attributes.gene_id()))
            }
        }
    }
}

/// True if `attributes` reads as `format`: every token parses, or, under
/// warn-and-skip, at least one id token does.
fn reads_as(attributes: &str, format: FileFormat, policy: AttributePolicy) -> bool {
    parse_attributes(attributes, format, AttributePolicy::FailFast).is_ok()
        || (policy == AttributePolicy::WarnAndSkip && has_id_token(attributes, format))
}

/// Decide whether a line is GFF3 or GTF by trial-parsing its attributes.
/// A format whose tokens all parse wins, GFF3 first. Under warn-and-skip a
/// format with parseable id keys is accepted next, so GTF lines carrying
/// unquoted values (`level 2;`) still detect.
pub fn detect_format(line: &str, line_number: usize, policy: AttributePolicy) -> Result<FileFormat> {
    let fields = split_gff_fields(line).map_err(|e| e.at_line(line_number))?;
    let attributes = fields[GFF_FIELDS - 1];
    let candidates = [FileFormat::Gff3, FileFormat::Gtf];

    candidates
        .into_iter()
        .find(|&format| parse_attributes(attributes, format, AttributePolicy::FailFast).is_ok())
        .or_else(|| {
            candidates
                .into_iter()
                .find(|&format| reads_as(attributes, format, policy))
        })
        .ok_or_else(|| {
            GenialError::UnsupportedFormat(format!(
                "line {} does not look like GFF3 or GTF: {}",
                line_number, attributes
            ))
        })
}

/// Check that a line matches the requested flavour
pub fn check_format(
    line: &str,
    line_number: usize,
    format: FileFormat,
    policy: AttributePolicy,
) -> Result<()> {
    let fields = split_gff_fields(line).map_err(|e| e.at_line(line_number))?;
    let attributes = fields[GFF_FIELDS - 1];
    if reads_as(attributes, format, policy) {
        Ok(())
    } else {
        Err(GenialError::UnsupportedFormat(format!(
            "line {} does not look like {}: {}",
            line_number, format, attributes
        )))
    }
}
