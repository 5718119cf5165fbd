//! Annotation filters
//!
//! Selects annotations by exon count and intron size, optionally inverted
//! (keep only what would have been rejected, like `grep -v`).

use crate::core::annotation::GenomicAnnotation;

/// Exon-count and intron-size filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationFilter {
    /// Minimum number of blocks
    pub min_exon_count: usize,
    /// Reject annotations with any intron smaller than this
    pub ignore_gaps_smaller_than: Option<i64>,
    /// Reject annotations with any intron bigger than this
    pub ignore_gaps_bigger_than: Option<i64>,
    /// Keep rejected annotations instead of accepted ones
    pub invert_match: bool,
}

impl Default for AnnotationFilter {
    fn default() -> Self {
        Self {
            min_exon_count: 1,
            ignore_gaps_smaller_than: None,
            ignore_gaps_bigger_than: None,
            invert_match: false,
        }
    }
}

impl AnnotationFilter {
    /// Check whether the annotation satisfies every criterion
    pub fn matches(&self, annotation: &GenomicAnnotation) -> bool {
        if annotation.block_count() < self.min_exon_count {
            return false;
        }

        // gap criteria only make sense with introns
        let introns = match annotation.introns() {
            Some(introns) => introns,
            None => return true,
        };

        if let Some(small) = self.ignore_gaps_smaller_than {
            if introns.iter().any(|&gap| gap < small) {
                return false;
            }
        }
        if let Some(huge) = self.ignore_gaps_bigger_than {
            if introns.iter().any(|&gap| gap > huge) {
                return false;
            }
        }
        true
    }

    /// Decide whether the annotation is emitted, honoring `invert_match`
    pub fn accepts(&self, annotation: &GenomicAnnotation) -> bool {
        self.matches(annotation) != self.invert_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(starts: Vec<u64>, ends: Vec<u64>) -> GenomicAnnotation {
        GenomicAnnotation::builder("chr1", "+")
            .transcript_id("tx")
            .blocks(starts, ends)
            .starts_offset(0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_accepts_everything() {
        let filter = AnnotationFilter::default();
        assert!(filter.accepts(&annotation(vec![0], vec![10])));
        assert!(filter.accepts(&annotation(vec![0, 11], vec![10, 20])));
    }

    #[test]
    fn test_min_exon_count() {
        let filter = AnnotationFilter {
            min_exon_count: 2,
            ..Default::default()
        };
        assert!(!filter.accepts(&annotation(vec![0], vec![10])));
        assert!(filter.accepts(&annotation(vec![0, 20], vec![10, 30])));
    }

    #[test]
    fn test_gap_limits() {
        let ann = annotation(vec![0, 15, 1000], vec![10, 20, 1100]);
        assert_eq!(ann.introns(), Some(vec![5, 980]));

        let small = AnnotationFilter {
            ignore_gaps_smaller_than: Some(6),
            ..Default::default()
        };
        assert!(!small.accepts(&ann));

        let small_exact = AnnotationFilter {
            ignore_gaps_smaller_than: Some(5),
            ..Default::default()
        };
        assert!(small_exact.accepts(&ann));

        let huge = AnnotationFilter {
            ignore_gaps_bigger_than: Some(500),
            ..Default::default()
        };
        assert!(!huge.accepts(&ann));
    }

    #[test]
    fn test_single_block_ignores_gap_limits() {
        let filter = AnnotationFilter {
            ignore_gaps_smaller_than: Some(100),
            ignore_gaps_bigger_than: Some(1),
            ..Default::default()
        };
        assert!(filter.accepts(&annotation(vec![0], vec![10])));
    }

    #[test]
    fn test_invert_match() {
        let filter = AnnotationFilter {
            min_exon_count: 2,
            invert_match: true,
            ..Default::default()
        };
        assert!(filter.accepts(&annotation(vec![0], vec![10])));
        assert!(!filter.accepts(&annotation(vec![0, 20], vec![10, 30])));
    }
}
