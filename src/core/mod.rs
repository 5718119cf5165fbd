//! Core annotation model
//!
//! This module contains the normalized transcript model, its derived
//! features, annotation filters, the error taxonomy and input helpers.

pub mod annotation;
pub mod error;
pub mod filter;
pub mod io;

pub use annotation::{
    join_values, parse_coords, AnnotationBuilder, Coords, GenomicAnnotation, Orientation,
    OrientationPolicy, Strand, DEFAULT_ITEM_RGB, NOT_APPLICABLE,
};
pub use error::{GenialError, Result};
pub use filter::AnnotationFilter;
pub use io::{detect_compression, open_input, CompressionFormat, LineIterator, DEFAULT_BUFFER_SIZE};
