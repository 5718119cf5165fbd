//! Transcript assembler
//!
//! Streams GFF3/GTF lines and groups exon/CDS blocks by owning transcript.
//! Gene and transcript lines feed a kinship table used afterwards to
//! resolve the gene of each transcript.
//!
//! Annotations can only be built once the whole input is consumed, since a
//! multi-parent exon may add blocks to any transcript at any point.

use crate::core::annotation::{GenomicAnnotation, Orientation, OrientationPolicy};
use crate::core::error::{GenialError, Result};
use crate::core::io::LineIterator;
use crate::formats::attributes::{AttributePolicy, Attributes};
use crate::formats::gff::{check_format, detect_format, FeatureKind, FileFormat, LineRecord};
use crate::formats::ParseOptions;
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::io::BufRead;

/// Maximum number of parent hops walked when resolving a gene
pub const MAX_KINSHIP_DEPTH: usize = 64;

/// Child id to parent id map, plus the attributes of each feature line
#[derive(Debug, Default, Clone)]
pub struct KinshipTable {
    parent_of: HashMap<String, String>,
    attributes_of: HashMap<String, Attributes>,
}

impl KinshipTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a gene/transcript-level feature
    pub fn record(&mut self, id: &str, parent: Option<&str>, attributes: &Attributes) {
        if let Some(parent) = parent {
            self.parent_of.insert(id.to_string(), parent.to_string());
        }
        self.attributes_of
            .entry(id.to_string())
            .or_default()
            .update(attributes);
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.parent_of.get(id).map(String::as_str)
    }

    pub fn attributes_of(&self, id: &str) -> Option<&Attributes> {
        self.attributes_of.get(id)
    }

    /// Walk up from `id` to its topmost ancestor.
    ///
    /// Returns `Ok(None)` if `id` has no recorded parent, and
    /// `MissingReference` if the chain does not end within
    /// `MAX_KINSHIP_DEPTH` hops (a cycle).
    pub fn resolve_gene(&self, id: &str) -> Result<Option<String>> {
        let mut current = match self.parent_of.get(id) {
            Some(parent) => parent,
            None => return Ok(None),
        };

        for _ in 0..MAX_KINSHIP_DEPTH {
            match self.parent_of.get(current) {
                Some(next) => current = next,
                None => return Ok(Some(current.clone())),
            }
        }

        Err(GenialError::MissingReference(format!(
            "parent chain of '{}' does not end after {} hops",
            id, MAX_KINSHIP_DEPTH
        )))
    }
}

/// Blocks collected for one transcript
#[derive(Debug, Clone, Default)]
pub struct TranscriptEntry {
    pub chrom: String,
    pub strand: String,
    pub exon_starts: Vec<u64>,
    pub exon_ends: Vec<u64>,
    pub cds_starts: Vec<u64>,
    pub cds_ends: Vec<u64>,
    pub frames: Vec<Option<u8>>,
    pub attributes: Attributes,
}

impl TranscriptEntry {
    fn new(record: &LineRecord<'_>) -> Self {
        Self {
            chrom: record.chrom.to_string(),
            strand: record.strand.to_string(),
            attributes: record.attributes.clone(),
            ..Default::default()
        }
    }

    /// Append the block of an exon/CDS line; returns the starts touched
    fn push(&mut self, record: &LineRecord<'_>) -> &[u64] {
        match record.kind() {
            FeatureKind::Cds => {
                self.cds_starts.push(record.start);
                self.cds_ends.push(record.end);
                self.frames.push(record.phase());
                &self.cds_starts
            }
            _ => {
                self.exon_starts.push(record.start);
                self.exon_ends.push(record.end);
                &self.exon_starts
            }
        }
    }
}

/// Streaming GFF3/GTF transcript assembler
#[derive(Debug)]
pub struct TranscriptAssembler {
    attribute_policy: AttributePolicy,
    orientation_policy: OrientationPolicy,
    format: Option<FileFormat>,
    format_checked: bool,
    orientation: Orientation,
    kinship: KinshipTable,
    entries: IndexMap<String, TranscriptEntry>,
    finished: bool,
}

impl TranscriptAssembler {
    pub fn new(options: &ParseOptions) -> Self {
        Self {
            attribute_policy: options.attribute_policy,
            orientation_policy: options.orientation_policy,
            format: options.format,
            format_checked: false,
            orientation: Orientation::Unknown,
            kinship: KinshipTable::new(),
            entries: IndexMap::new(),
            finished: false,
        }
    }

    /// Format in use (detected or configured)
    pub fn format(&self) -> Option<FileFormat> {
        self.format
    }

    /// File-wide orientation guess so far
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn kinship(&self) -> &KinshipTable {
        &self.kinship
    }

    pub fn entries(&self) -> &IndexMap<String, TranscriptEntry> {
        &self.entries
    }

    /// True once a FASTA section was reached
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Consume one line. Returns `Ok(false)` once the FASTA sentinel is
    /// seen; later lines are ignored.
    pub fn feed_line(&mut self, line: &str, line_number: usize) -> Result<bool> {
        if self.finished {
            return Ok(false);
        }
        if line.starts_with('>') {
            debug!("line {}: FASTA section reached, stopping", line_number);
            self.finished = true;
            return Ok(false);
        }
        if line.trim().is_empty() || line.starts_with('#') {
            debug!("line {}: skipping comment or blank line", line_number);
            return Ok(true);
        }

        let format = match (self.format, self.format_checked) {
            (Some(format), true) => format,
            (Some(requested), false) => {
                check_format(line, line_number, requested, self.attribute_policy)?;
                self.format_checked = true;
                requested
            }
            (None, _) => {
                let format = detect_format(line, line_number, self.attribute_policy)?;
                info!("Detected input format: {}", format);
                self.format = Some(format);
                self.format_checked = true;
                format
            }
        };

        let record = LineRecord::parse(line, format, self.attribute_policy)
            .map_err(|e| e.at_line(line_number))?;

        if record.kind().is_block() {
            self.add_block(&record, line_number);
        } else if let Some((id, parent)) = record.kinship() {
            self.kinship.record(id, parent, &record.attributes);
        }
        Ok(true)
    }

    fn add_block(&mut self, record: &LineRecord<'_>, line_number: usize) {
        let parents = record.block_parents();
        if parents.is_empty() {
            warn!(
                "line {}: {} without a transcript reference, skipped",
                line_number, record.feature
            );
            return;
        }

        for parent in parents {
            if !self.entries.contains_key(parent) {
                if record.file_format == FileFormat::Gtf
                    && record.attributes.gene_id().is_none()
                    && !self.has_gene(parent)
                {
                    let err = GenialError::MissingReference(format!(
                        "line {}: no gene_id for new transcript '{}'",
                        line_number, parent
                    ));
                    warn!("{}, skipped", err);
                    continue;
                }
                self.entries
                    .insert(parent.to_string(), TranscriptEntry::new(record));
            }

            let entry = match self.entries.get_mut(parent) {
                Some(entry) => entry,
                None => continue,
            };
            entry.attributes.merge_missing(&record.attributes);
            let starts = entry.push(record);

            if self.orientation == Orientation::Unknown
                && record.strand == "-"
                && starts.len() >= 2
            {
                let first = starts[0];
                let last = starts[starts.len() - 1];
                if last != first {
                    self.orientation = if last > first {
                        Orientation::Genomic
                    } else {
                        Orientation::Transcript
                    };
                    info!("Block orientation guessed from '{}': {}", parent, self.orientation);
                }
            }
        }
    }

    /// True if a transcript-level line already tied `transcript_id` to a gene
    fn has_gene(&self, transcript_id: &str) -> bool {
        matches!(self.kinship.resolve_gene(transcript_id), Ok(Some(_)))
    }

    /// Read every line of `reader`
    pub fn read_all<R: BufRead>(&mut self, reader: R) -> Result<()> {
        let mut lines = LineIterator::new(reader);
        loop {
            let line_number = lines.line_number() + 1;
            let line = match lines.next_line() {
                Some(line) => line?,
                None => break,
            };
            if !self.feed_line(line, line_number)? {
                break;
            }
        }
        Ok(())
    }

    /// Turn the collected entries into annotations, in first-seen order
    pub fn finish(self) -> AssembledTranscripts {
        AssembledTranscripts {
            entries: self.entries.into_iter(),
            kinship: self.kinship,
            orientation: self.orientation,
            policy: self.orientation_policy,
        }
    }
}

/// Parse a whole GFF3/GTF stream
pub fn assemble<R: BufRead>(reader: R, options: &ParseOptions) -> Result<AssembledTranscripts> {
    let mut assembler = TranscriptAssembler::new(options);
    assembler.read_all(reader)?;
    Ok(assembler.finish())
}

/// Lazily built annotations of an assembled file
pub struct AssembledTranscripts {
    entries: indexmap::map::IntoIter<String, TranscriptEntry>,
    kinship: KinshipTable,
    orientation: Orientation,
    policy: OrientationPolicy,
}

impl AssembledTranscripts {
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    fn build(&self, transcript_id: String, entry: TranscriptEntry) -> Result<GenomicAnnotation> {
        let mut attributes = entry.attributes;
        if let Some(own) = self.kinship.attributes_of(&transcript_id) {
            attributes.update(own);
        }

        let gene_id = match attributes.gene_id() {
            Some(gene) => Some(gene.to_string()),
            None => self.kinship.resolve_gene(&transcript_id).unwrap_or_else(|e| {
                warn!("{}", e);
                None
            }),
        };

        // CDS-only transcripts use their coding blocks as exons
        let (starts, ends) = if entry.exon_starts.is_empty() {
            (entry.cds_starts.clone(), entry.cds_ends.clone())
        } else {
            (entry.exon_starts, entry.exon_ends)
        };

        GenomicAnnotation::builder(entry.chrom, entry.strand)
            .transcript_id(transcript_id)
            .gene_id(gene_id)
            .blocks(starts, ends)
            .cds(entry.cds_starts, entry.cds_ends)
            .frames(entry.frames)
            .starts_offset(1)
            .orientation(self.orientation)
            .policy(self.policy)
            .build()
    }
}

impl Iterator for AssembledTranscripts {
    type Item = Result<GenomicAnnotation>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, entry) = self.entries.next()?;
        Some(self.build(id, entry))
    }
}
