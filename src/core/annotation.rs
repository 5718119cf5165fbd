//! Normalized genomic annotation model
//!
//! One `GenomicAnnotation` describes one transcript as a list of exon blocks
//! (0-based, half-open) plus optional CDS blocks. Blocks are always kept in
//! ascending genomic order regardless of strand or of the order in which the
//! source file listed them.
//!
//! Derived features (exon lengths, introns, ORF size, per-exon coding
//! fraction) are computed on demand from the block lists.

use crate::core::error::{GenialError, Result};
use log::debug;
use std::fmt;
use std::str::FromStr;

/// Marker written where a derived value does not exist
/// (introns of a single-block transcript, unknown gene id).
pub const NOT_APPLICABLE: &str = "NA";

/// Default BED12 itemRgb for annotations that did not come with a colour
pub const DEFAULT_ITEM_RGB: &str = "200,155,55";

/// Strand orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Strand {
    #[default]
    Plus,
    Minus,
}

impl Strand {
    /// Parse strand from char
    ///
    /// # Examples
    /// ```
    /// use genial::core::Strand;
    /// assert_eq!(Strand::from_char('+'), Some(Strand::Plus));
    /// assert_eq!(Strand::from_char('-'), Some(Strand::Minus));
    /// assert_eq!(Strand::from_char('.'), None);
    /// ```
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Strand::Plus),
            '-' => Some(Strand::Minus),
            _ => None,
        }
    }

    /// Convert to char
    pub fn to_char(&self) -> char {
        match self {
            Strand::Plus => '+',
            Strand::Minus => '-',
        }
    }
}

impl FromStr for Strand {
    type Err = GenialError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "+" => Ok(Strand::Plus),
            "-" => Ok(Strand::Minus),
            other => Err(GenialError::InvalidStrand(other.to_string())),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// How a file lists the blocks of minus-strand transcripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Ascending genomic coordinates
    Genomic,
    /// Transcription order (descending on the minus strand)
    Transcript,
    /// Not determined yet
    #[default]
    Unknown,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Orientation::Genomic => "genomic",
            Orientation::Transcript => "transcript",
            Orientation::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// Policy used to bring blocks into ascending genomic order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrientationPolicy {
    /// Sort blocks by start, independent of strand
    #[default]
    Sort,
    /// Legacy heuristic: reverse minus-strand blocks listed in
    /// transcription order. Falls back to sorting if the result is still
    /// out of order.
    Reverse,
}

impl OrientationPolicy {
    /// Parse from string (for CLI argument)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sort" | "default" => Some(OrientationPolicy::Sort),
            "reverse" | "legacy" => Some(OrientationPolicy::Reverse),
            _ => None,
        }
    }
}

/// Coordinates given either as comma-joined text or as numbers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coords {
    Text(String),
    Values(Vec<u64>),
}

impl Coords {
    fn into_values(self) -> Result<Vec<u64>> {
        match self {
            Coords::Text(text) => parse_coords(&text),
            Coords::Values(values) => Ok(values),
        }
    }
}

impl Default for Coords {
    fn default() -> Self {
        Coords::Values(Vec::new())
    }
}

impl From<&str> for Coords {
    fn from(s: &str) -> Self {
        Coords::Text(s.to_string())
    }
}

impl From<String> for Coords {
    fn from(s: String) -> Self {
        Coords::Text(s)
    }
}

impl From<Vec<u64>> for Coords {
    fn from(v: Vec<u64>) -> Self {
        Coords::Values(v)
    }
}

impl From<&[u64]> for Coords {
    fn from(v: &[u64]) -> Self {
        Coords::Values(v.to_vec())
    }
}

/// Parse a comma-joined coordinate list, tolerating a trailing comma
///
/// # Examples
/// ```
/// use genial::core::parse_coords;
/// assert_eq!(parse_coords("101,301,").unwrap(), vec![101, 301]);
/// ```
pub fn parse_coords(text: &str) -> Result<Vec<u64>> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map_err(|_| GenialError::InvalidBlocks(format!("not a coordinate: '{}'", s)))
        })
        .collect()
}

/// Join values with commas, no trailing comma
pub fn join_values<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Coding blocks of an annotation
#[derive(Debug, Clone, PartialEq, Eq)]
struct CdsBlocks {
    starts: Vec<u64>,
    ends: Vec<u64>,
    frames: Vec<Option<u8>>,
}

/// Builder for `GenomicAnnotation`
///
/// Collects raw inputs; all validation and normalization happens in `build`.
#[derive(Debug, Clone, Default)]
pub struct AnnotationBuilder {
    chrom: String,
    strand: String,
    transcript_id: String,
    gene_id: Option<String>,
    starts: Coords,
    ends: Coords,
    cds: Option<(Coords, Coords)>,
    frames: Vec<Option<u8>>,
    starts_offset: u64,
    orientation: Orientation,
    policy: OrientationPolicy,
    thick: Option<(u64, u64)>,
    item_rgb: Option<String>,
}

impl AnnotationBuilder {
    /// Start a builder. Coordinates default to 1-based (GFF/GTF).
    pub fn new(chrom: impl Into<String>, strand: impl Into<String>) -> Self {
        Self {
            chrom: chrom.into(),
            strand: strand.into(),
            starts_offset: 1,
            ..Default::default()
        }
    }

    pub fn transcript_id(mut self, id: impl Into<String>) -> Self {
        self.transcript_id = id.into();
        self
    }

    pub fn gene_id(mut self, id: Option<String>) -> Self {
        self.gene_id = id;
        self
    }

    /// Exon blocks
    pub fn blocks(mut self, starts: impl Into<Coords>, ends: impl Into<Coords>) -> Self {
        self.starts = starts.into();
        self.ends = ends.into();
        self
    }

    /// CDS blocks, using the same starts offset as the exons
    pub fn cds(mut self, starts: impl Into<Coords>, ends: impl Into<Coords>) -> Self {
        self.cds = Some((starts.into(), ends.into()));
        self
    }

    /// CDS phases, one per CDS block (`None` for '.')
    pub fn frames(mut self, frames: Vec<Option<u8>>) -> Self {
        self.frames = frames;
        self
    }

    /// 1 for GFF/GTF input, 0 for BED/internal coordinates
    pub fn starts_offset(mut self, offset: u64) -> Self {
        self.starts_offset = offset;
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn policy(mut self, policy: OrientationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Explicit thickStart/thickEnd (0-based), e.g. from BED12 input
    pub fn thick(mut self, thick_start: u64, thick_end: u64) -> Self {
        self.thick = Some((thick_start, thick_end));
        self
    }

    pub fn item_rgb(mut self, rgb: impl Into<String>) -> Self {
        self.item_rgb = Some(rgb.into());
        self
    }

    /// Validate and normalize into an annotation
    pub fn build(self) -> Result<GenomicAnnotation> {
        let mut starts = self.starts.into_values()?;
        let ends = self.ends.into_values()?;

        let strand: Strand = self.strand.parse()?;

        if starts.len() != ends.len() {
            return Err(GenialError::InvalidBlocks(format!(
                "{}: {} starts but {} ends",
                self.transcript_id,
                starts.len(),
                ends.len()
            )));
        }
        if starts.is_empty() {
            return Err(GenialError::InvalidBlocks(format!(
                "{}: no blocks",
                self.transcript_id
            )));
        }

        shift_starts(&mut starts, self.starts_offset, &self.transcript_id)?;
        check_blocks(&starts, &ends, &self.transcript_id)?;

        let cds = match self.cds {
            Some((cds_starts, cds_ends)) => {
                let mut cds_starts = cds_starts.into_values()?;
                let cds_ends = cds_ends.into_values()?;
                if cds_starts.len() != cds_ends.len() {
                    return Err(GenialError::InvalidBlocks(format!(
                        "{}: {} CDS starts but {} CDS ends",
                        self.transcript_id,
                        cds_starts.len(),
                        cds_ends.len()
                    )));
                }
                if cds_starts.is_empty() {
                    None
                } else {
                    shift_starts(&mut cds_starts, self.starts_offset, &self.transcript_id)?;
                    check_blocks(&cds_starts, &cds_ends, &self.transcript_id)?;
                    let frames = if self.frames.len() == cds_starts.len() {
                        self.frames
                    } else {
                        vec![None; cds_starts.len()]
                    };
                    Some(CdsBlocks {
                        starts: cds_starts,
                        ends: cds_ends,
                        frames,
                    })
                }
            }
            None => None,
        };

        let (thick_start, thick_end) = match (self.thick, &cds) {
            (Some((ts, te)), _) => (Some(ts), Some(te)),
            (None, Some(c)) => (c.starts.iter().min().copied(), c.ends.iter().max().copied()),
            (None, None) => (None, None),
        };

        let mut annotation = GenomicAnnotation {
            chrom: self.chrom,
            strand,
            transcript_id: self.transcript_id,
            gene_id: self.gene_id,
            starts,
            ends,
            cds,
            thick_start,
            thick_end,
            item_rgb: self.item_rgb,
        };
        annotation.fix_orientation(self.orientation, self.policy);
        Ok(annotation)
    }
}

fn shift_starts(starts: &mut [u64], offset: u64, id: &str) -> Result<()> {
    for s in starts.iter_mut() {
        *s = s.checked_sub(offset).ok_or_else(|| {
            GenialError::InvalidBlocks(format!("{}: start {} below offset {}", id, s, offset))
        })?;
    }
    Ok(())
}

fn check_blocks(starts: &[u64], ends: &[u64], id: &str) -> Result<()> {
    for (s, e) in starts.iter().zip(ends) {
        if s >= e {
            return Err(GenialError::InvalidBlocks(format!(
                "{}: block start {} not before end {}",
                id, s, e
            )));
        }
    }
    Ok(())
}

fn is_ascending(starts: &[u64]) -> bool {
    starts.windows(2).all(|w| w[0] <= w[1])
}

/// Sort paired starts/ends by start; ties keep their input order
fn sort_pairs(starts: &mut Vec<u64>, ends: &mut Vec<u64>) {
    let mut pairs: Vec<(u64, u64)> = starts.iter().copied().zip(ends.iter().copied()).collect();
    pairs.sort_by_key(|&(s, _)| s);
    *starts = pairs.iter().map(|&(s, _)| s).collect();
    *ends = pairs.iter().map(|&(_, e)| e).collect();
}

impl CdsBlocks {
    fn sort(&mut self) {
        let mut triples: Vec<(u64, u64, Option<u8>)> = self
            .starts
            .iter()
            .zip(&self.ends)
            .zip(&self.frames)
            .map(|((&s, &e), &f)| (s, e, f))
            .collect();
        triples.sort_by_key(|&(s, _, _)| s);
        self.starts = triples.iter().map(|t| t.0).collect();
        self.ends = triples.iter().map(|t| t.1).collect();
        self.frames = triples.iter().map(|t| t.2).collect();
    }

    fn reverse(&mut self) {
        self.starts.reverse();
        self.ends.reverse();
        self.frames.reverse();
    }
}

/// Interval model of one transcript
#[derive(Debug, Clone, PartialEq)]
pub struct GenomicAnnotation {
    chrom: String,
    strand: Strand,
    transcript_id: String,
    gene_id: Option<String>,
    starts: Vec<u64>,
    ends: Vec<u64>,
    cds: Option<CdsBlocks>,
    thick_start: Option<u64>,
    thick_end: Option<u64>,
    item_rgb: Option<String>,
}

impl GenomicAnnotation {
    /// Start building an annotation
    pub fn builder(chrom: impl Into<String>, strand: impl Into<String>) -> AnnotationBuilder {
        AnnotationBuilder::new(chrom, strand)
    }

    fn fix_orientation(&mut self, orientation: Orientation, policy: OrientationPolicy) {
        if self.block_count() > 1 || self.cds.as_ref().map_or(false, |c| c.starts.len() > 1) {
            match policy {
                OrientationPolicy::Sort => self.sort_blocks(),
                OrientationPolicy::Reverse => {
                    let descending = self.starts.last() < self.starts.first();
                    let reverse = self.strand == Strand::Minus
                        && match orientation {
                            Orientation::Transcript => true,
                            Orientation::Unknown => descending,
                            Orientation::Genomic => false,
                        };
                    if reverse {
                        self.starts.reverse();
                        self.ends.reverse();
                        if let Some(cds) = self.cds.as_mut() {
                            cds.reverse();
                        }
                    }
                    let cds_ascending = self.cds.as_ref().map_or(true, |c| is_ascending(&c.starts));
                    if !is_ascending(&self.starts) || !cds_ascending {
                        debug!(
                            "{}: blocks still unordered after reversal, sorting",
                            self.transcript_id
                        );
                        self.sort_blocks();
                    }
                }
            }
        }
    }

    fn sort_blocks(&mut self) {
        if !is_ascending(&self.starts) {
            sort_pairs(&mut self.starts, &mut self.ends);
        }
        if let Some(cds) = self.cds.as_mut() {
            if !is_ascending(&cds.starts) {
                cds.sort();
            }
        }
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    pub fn transcript_id(&self) -> &str {
        &self.transcript_id
    }

    pub fn gene_id(&self) -> Option<&str> {
        self.gene_id.as_deref()
    }

    /// Block starts (0-based, ascending)
    pub fn starts(&self) -> &[u64] {
        &self.starts
    }

    /// Block ends (exclusive)
    pub fn ends(&self) -> &[u64] {
        &self.ends
    }

    pub fn cds_starts(&self) -> Option<&[u64]> {
        self.cds.as_ref().map(|c| c.starts.as_slice())
    }

    pub fn cds_ends(&self) -> Option<&[u64]> {
        self.cds.as_ref().map(|c| c.ends.as_slice())
    }

    /// CDS phases in CDS block order
    pub fn frames(&self) -> Option<&[Option<u8>]> {
        self.cds.as_ref().map(|c| c.frames.as_slice())
    }

    pub fn has_cds(&self) -> bool {
        self.cds.is_some()
    }

    pub fn thick_start(&self) -> Option<u64> {
        self.thick_start
    }

    pub fn thick_end(&self) -> Option<u64> {
        self.thick_end
    }

    pub fn item_rgb(&self) -> &str {
        self.item_rgb.as_deref().unwrap_or(DEFAULT_ITEM_RGB)
    }

    /// Blocks as (start, end) pairs
    pub fn blocks(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.starts.iter().copied().zip(self.ends.iter().copied())
    }

    pub fn block_count(&self) -> usize {
        self.starts.len()
    }

    /// Leftmost position covered by the annotation
    pub fn start(&self) -> u64 {
        self.starts[0]
    }

    /// Rightmost position covered by the annotation
    pub fn end(&self) -> u64 {
        self.ends.iter().copied().max().unwrap_or(self.starts[0])
    }

    /// Exon lengths
    pub fn exons(&self) -> Vec<u64> {
        self.blocks().map(|(s, e)| e - s).collect()
    }

    /// Alias of `exons`, named after the BED12 column
    pub fn block_sizes(&self) -> Vec<u64> {
        self.exons()
    }

    /// Exons without the first and the last one
    pub fn internal_exons(&self) -> Vec<u64> {
        let exons = self.exons();
        if exons.len() < 3 {
            return Vec::new();
        }
        exons[1..exons.len() - 1].to_vec()
    }

    /// Gaps between consecutive blocks; `None` for a single block.
    /// Overlapping blocks give negative values.
    pub fn introns(&self) -> Option<Vec<i64>> {
        if self.block_count() < 2 {
            return None;
        }
        Some(
            self.starts[1..]
                .iter()
                .zip(&self.ends[..self.ends.len() - 1])
                .map(|(&next_start, &end)| next_start as i64 - end as i64)
                .collect(),
        )
    }

    /// CDS block lengths
    pub fn cds(&self) -> Option<Vec<u64>> {
        self.cds.as_ref().map(|c| {
            c.starts
                .iter()
                .zip(&c.ends)
                .map(|(&s, &e)| e.saturating_sub(s))
                .collect()
        })
    }

    /// Alias of `cds`
    pub fn orf_blocks(&self) -> Option<Vec<u64>> {
        self.cds()
    }

    pub fn orf_size(&self) -> Option<u64> {
        self.cds().map(|blocks| blocks.iter().sum())
    }

    /// Collapse blocks separated by at most `gap` bases into one block.
    ///
    /// Gaps exactly equal to `gap` are merged. Operates in place on the
    /// exon blocks; CDS blocks are left as they are.
    pub fn merge_small_gaps(&mut self, gap: u64) -> &mut Self {
        if self.block_count() < 2 {
            return self;
        }

        let mut merged: Vec<(u64, u64)> = Vec::with_capacity(self.block_count());
        for (s, e) in self.blocks() {
            match merged.last_mut() {
                Some(last) if s <= last.1.saturating_add(gap) => {
                    last.1 = last.1.max(e);
                }
                _ => merged.push((s, e)),
            }
        }

        self.starts = merged.iter().map(|&(s, _)| s).collect();
        self.ends = merged.iter().map(|&(_, e)| e).collect();
        self
    }

    /// Fraction of each exon that lies in the coding span.
    ///
    /// For a single exon the value is relative to the exon length; for
    /// several exons it is relative to the ORF size, so coding exons sum
    /// to 1. Returns `None` when the annotation has no CDS.
    pub fn exon_contrib_to_orf(&self) -> Option<Vec<f64>> {
        let cds = self.cds.as_ref()?;
        let cds_start = *cds.starts.first()? as f64;
        let cds_end = *cds.ends.last()? as f64;

        if self.block_count() == 1 {
            let total = (self.ends[0] - self.starts[0]) as f64;
            return Some(vec![(cds_end - cds_start) / total]);
        }

        let orf = self.orf_size()? as f64;
        if orf == 0.0 {
            return Some(vec![0.0; self.block_count()]);
        }

        // exon holding the start codon
        let start_index = self
            .starts
            .iter()
            .rposition(|&s| (s as f64) <= cds_start)
            .unwrap_or(0);

        // exon holding the stop codon
        let stop_index = (0..self.block_count())
            .rev()
            .find_map(|i| {
                let end = self.ends[i] as f64;
                if cds_end > end {
                    Some(i + 1)
                } else if cds_end == end {
                    Some(i)
                } else {
                    None
                }
            })
            .unwrap_or(0);

        let exons = self.exons();
        let contrib = (0..self.block_count())
            .map(|i| {
                if i < start_index || i > stop_index {
                    0.0
                } else if i == start_index && i == stop_index {
                    (cds_end - cds_start) / orf
                } else if i == start_index {
                    (self.ends[i] as f64 - cds_start) / orf
                } else if i < stop_index {
                    exons[i] as f64 / orf
                } else {
                    (cds_end - self.starts[i] as f64) / orf
                }
            })
            .collect();

        Some(contrib)
    }
}

impl fmt::Display for GenomicAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.transcript_id, join_values(&self.exons()))
    }
}
