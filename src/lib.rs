//! GenIAL - gene annotation interval parsing and conversion
//!
//! Reads GFF3, GTF and BED12 annotation files into a normalized per-transcript
//! interval model and writes it back out as BED12, BED6 or EXTB.
//!
//! # Features
//!
//! - Transcript assembly from flat, unordered, multi-parent GFF3/GTF lines
//! - Strand-independent block ordering
//! - Derived introns, ORF size and per-exon coding fraction
//! - Small-gap merging and exon/intron filters
//! - Transparent gzip/bzip2 input
//!
//! # Example
//!
//! ```
//! use genial::formats::{convert, ConvertOptions, InputFormat, OutputFormat};
//!
//! let gff = "chr1\tsrc\texon\t101\t200\t.\t+\t.\tParent=tx1\n\
//!            chr1\tsrc\texon\t301\t400\t.\t+\t.\tParent=tx1\n";
//! let options = ConvertOptions::new(InputFormat::Gff3, OutputFormat::Bed);
//!
//! let mut out = Vec::new();
//! let stats = convert(gff.as_bytes(), &mut out, &options).unwrap();
//! assert_eq!(stats.written, 1);
//! assert_eq!(
//!     String::from_utf8(out).unwrap(),
//!     "chr1\t100\t400\ttx1\t1000\t+\t100\t100\t200,155,55\t2\t100,100\t0,200\n"
//! );
//! ```

pub mod core;
pub mod formats;

// Re-export commonly used types
pub use core::{
    AnnotationFilter, GenialError, GenomicAnnotation, Orientation, OrientationPolicy, Result,
    Strand,
};
pub use formats::{
    convert, format_annotation, parse, AttributePolicy, ConversionStats, ConvertOptions,
    FileFormat, InputFormat, OutputFormat, ParseOptions,
};
