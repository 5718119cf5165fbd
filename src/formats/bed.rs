//! BED format adapter
//!
//! Reads BED12 rows straight into annotations (one row, one transcript)
//! and writes annotations back out as BED12 or BED6.
//! BED coordinates are 0-based and half-open.

use crate::core::annotation::{join_values, parse_coords, GenomicAnnotation, Orientation, OrientationPolicy};
use crate::core::error::{GenialError, Result};
use crate::core::io::LineIterator;
use crate::formats::gff::split_fields;
use log::debug;
use std::io::BufRead;

/// Score column written for every BED row
pub const BED_SCORE: &str = "1000";

/// Minimum number of columns of a BED12 row
pub const BED12_FIELDS: usize = 12;

/// BED parsing error
#[derive(Debug, Clone, thiserror::Error)]
pub enum BedParseError {
    #[error("Empty line")]
    EmptyLine,

    #[error("Too few fields: expected at least {expected}, found {found}")]
    TooFewFields { expected: usize, found: usize },

    #[error("Invalid number in field {0}: {1}")]
    InvalidNumber(&'static str, String),

    #[error("blockCount is {count} but {sizes} sizes and {starts} starts are listed")]
    BlockCountMismatch { count: usize, sizes: usize, starts: usize },
}

/// Borrowed view over one BED12 row
#[derive(Debug, Clone)]
pub struct BedRecordView<'a> {
    fields: Vec<&'a str>,
    /// Chromosome name
    pub chrom: &'a str,
    /// Start position (0-based)
    pub start: u64,
    /// End position
    pub end: u64,
}

impl<'a> BedRecordView<'a> {
    /// Parse a BED12 line; coordinate columns are checked eagerly
    pub fn parse(line: &'a str) -> std::result::Result<Self, BedParseError> {
        if line.is_empty() {
            return Err(BedParseError::EmptyLine);
        }

        let fields = split_fields(line);
        if fields.len() < BED12_FIELDS {
            return Err(BedParseError::TooFewFields {
                expected: BED12_FIELDS,
                found: fields.len(),
            });
        }

        let start: u64 = fields[1]
            .parse()
            .map_err(|_| BedParseError::InvalidNumber("chromStart", fields[1].to_string()))?;
        let end: u64 = fields[2]
            .parse()
            .map_err(|_| BedParseError::InvalidNumber("chromEnd", fields[2].to_string()))?;

        Ok(Self {
            chrom: fields[0],
            start,
            end,
            fields,
        })
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn name(&self) -> &'a str {
        self.fields[3]
    }

    pub fn strand(&self) -> &'a str {
        self.fields[5]
    }

    pub fn thick_start(&self) -> Option<u64> {
        self.fields[6].parse().ok()
    }

    pub fn thick_end(&self) -> Option<u64> {
        self.fields[7].parse().ok()
    }

    pub fn item_rgb(&self) -> &'a str {
        self.fields[8]
    }

    pub fn block_count(&self) -> Option<usize> {
        self.fields[9].parse().ok()
    }

    pub fn block_sizes(&self) -> &'a str {
        self.fields[10]
    }

    pub fn block_starts(&self) -> &'a str {
        self.fields[11]
    }

    /// Absolute block coordinates: chromStart + blockStarts, + blockSizes
    pub fn blocks(&self) -> Result<(Vec<u64>, Vec<u64>)> {
        let sizes = parse_coords(self.block_sizes())?;
        let offsets = parse_coords(self.block_starts())?;

        if let Some(count) = self.block_count() {
            if count != sizes.len() || count != offsets.len() {
                return Err(GenialError::InvalidBlocks(
                    BedParseError::BlockCountMismatch {
                        count,
                        sizes: sizes.len(),
                        starts: offsets.len(),
                    }
                    .to_string(),
                ));
            }
        }

        let overflow = || {
            GenialError::InvalidBlocks(format!("{}: block coordinates overflow", self.name()))
        };
        let starts = offsets
            .iter()
            .map(|&o| self.start.checked_add(o).ok_or_else(overflow))
            .collect::<Result<Vec<u64>>>()?;
        let ends = starts
            .iter()
            .zip(&sizes)
            .map(|(&s, &size)| s.checked_add(size).ok_or_else(overflow))
            .collect::<Result<Vec<u64>>>()?;
        Ok((starts, ends))
    }

    /// Build the annotation described by this row
    pub fn to_annotation(&self, policy: OrientationPolicy) -> Result<GenomicAnnotation> {
        let (starts, ends) = self.blocks()?;

        let mut builder = GenomicAnnotation::builder(self.chrom, self.strand())
            .transcript_id(self.name())
            .blocks(starts, ends)
            .starts_offset(0)
            .orientation(Orientation::Unknown)
            .policy(policy)
            .item_rgb(self.item_rgb());
        if let (Some(ts), Some(te)) = (self.thick_start(), self.thick_end()) {
            builder = builder.thick(ts, te);
        }
        builder.build()
    }
}

/// Header-like lines that carry no record
fn is_header(line: &str) -> bool {
    line.trim().is_empty()
        || line.starts_with('#')
        || line.starts_with("track")
        || line.starts_with("browser")
}

/// Parse one BED12 line, attaching the line number to errors
pub fn parse_bed12_line(
    line: &str,
    line_number: usize,
    policy: OrientationPolicy,
) -> Result<GenomicAnnotation> {
    let view = BedRecordView::parse(line).map_err(|e| GenialError::malformed(line_number, e.to_string()))?;
    view.to_annotation(policy)
}

/// Iterator over the annotations of a BED12 stream
pub struct BedReader<R: BufRead> {
    lines: LineIterator<R>,
    policy: OrientationPolicy,
}

impl<R: BufRead> BedReader<R> {
    pub fn new(reader: R, policy: OrientationPolicy) -> Self {
        Self {
            lines: LineIterator::new(reader),
            policy,
        }
    }
}

impl<R: BufRead> Iterator for BedReader<R> {
    type Item = Result<GenomicAnnotation>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line_number = self.lines.line_number() + 1;
            let line = match self.lines.next_line()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if is_header(line) {
                debug!("line {}: skipping header line", line_number);
                continue;
            }
            return Some(parse_bed12_line(line, line_number, self.policy));
        }
    }
}

/// Format an annotation as one BED12 row
///
/// Without a known coding span, thickStart and thickEnd are both set to
/// the annotation start.
pub fn to_bed12(annotation: &GenomicAnnotation) -> String {
    let start = annotation.start();
    let (thick_start, thick_end) = match (annotation.thick_start(), annotation.thick_end()) {
        (Some(ts), Some(te)) => (ts, te),
        _ => (start, start),
    };
    let relative_starts: Vec<u64> = annotation.starts().iter().map(|&s| s - start).collect();

    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        annotation.chrom(),
        start,
        annotation.end(),
        annotation.transcript_id(),
        BED_SCORE,
        annotation.strand(),
        thick_start,
        thick_end,
        annotation.item_rgb(),
        annotation.block_count(),
        join_values(&annotation.block_sizes()),
        join_values(&relative_starts),
    )
}

/// Format an annotation as BED6, one row per block, rows joined by '\n'
pub fn to_bed6(annotation: &GenomicAnnotation) -> String {
    annotation
        .blocks()
        .map(|(s, e)| {
            format!(
                "{}\t{}\t{}\t{}\t{}\t{}",
                annotation.chrom(),
                s,
                e,
                annotation.transcript_id(),
                BED_SCORE,
                annotation.strand()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
