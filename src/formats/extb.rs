//! EXTB writer
//!
//! EXTB ("exon table") is a tab-separated summary with one row per
//! transcript:
//!
//! ```text
//! region  strand  transcript_id  gene_id  blockCount  length  exons  introns
//! ```
//!
//! `region` is `chrom:start-end` with a 1-based start. Values that do not
//! exist (unknown gene, introns of a single-block transcript) are written
//! as `NA`.

use crate::core::annotation::{join_values, GenomicAnnotation, NOT_APPLICABLE};

/// Format an annotation as one EXTB row
pub fn to_extb(annotation: &GenomicAnnotation) -> String {
    let exons = annotation.exons();
    let total: u64 = exons.iter().sum();
    let introns = annotation
        .introns()
        .map(|introns| join_values(&introns))
        .unwrap_or_else(|| NOT_APPLICABLE.to_string());

    format!(
        "{}:{}-{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        annotation.chrom(),
        annotation.start() + 1,
        annotation.end(),
        annotation.strand(),
        annotation.transcript_id(),
        annotation.gene_id().unwrap_or(NOT_APPLICABLE),
        annotation.block_count(),
        total,
        join_values(&exons),
        introns,
    )
}
