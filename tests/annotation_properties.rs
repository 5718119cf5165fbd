//! Property-based tests for the annotation model
//!
//! Block ordering, gap merging, introns and ORF coverage.

use genial::core::{GenomicAnnotation, OrientationPolicy};
use proptest::prelude::*;

/// Ascending, non-overlapping blocks separated by gaps of at least 1
fn arb_ascending_blocks(max_blocks: usize) -> impl Strategy<Value = (Vec<u64>, Vec<u64>)> {
    prop::collection::vec((1u64..1000, 2u64..500), 1..=max_blocks).prop_map(|parts| {
        let mut starts = Vec::with_capacity(parts.len());
        let mut ends = Vec::with_capacity(parts.len());
        let mut pos = 0u64;
        for (gap, len) in parts {
            pos += gap;
            starts.push(pos);
            pos += len;
            ends.push(pos);
        }
        (starts, ends)
    })
}

/// Arbitrary (possibly overlapping, unordered) blocks
fn arb_any_blocks() -> impl Strategy<Value = (Vec<u64>, Vec<u64>)> {
    prop::collection::vec((0u64..100_000, 1u64..2000), 1..12).prop_map(|blocks| {
        let starts = blocks.iter().map(|&(s, _)| s).collect();
        let ends = blocks.iter().map(|&(s, len)| s + len).collect();
        (starts, ends)
    })
}

fn arb_strand() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("+"), Just("-")]
}

fn arb_policy() -> impl Strategy<Value = OrientationPolicy> {
    prop_oneof![Just(OrientationPolicy::Sort), Just(OrientationPolicy::Reverse)]
}

fn build(starts: Vec<u64>, ends: Vec<u64>, strand: &str) -> GenomicAnnotation {
    GenomicAnnotation::builder("chr1", strand)
        .transcript_id("tx")
        .blocks(starts, ends)
        .starts_offset(0)
        .build()
        .unwrap()
}

/// Multi-exon transcript with a CDS fully inside the exon span
fn arb_coding_transcript() -> impl Strategy<Value = GenomicAnnotation> {
    (arb_ascending_blocks(8), any::<prop::sample::Index>(), any::<prop::sample::Index>(), any::<u64>(), any::<u64>())
        .prop_filter("need two exons", |((starts, _), ..)| starts.len() >= 2)
        .prop_map(|((starts, ends), first, second, a, b)| {
            let n = starts.len();
            let (i, j) = {
                let x = first.index(n);
                let y = second.index(n);
                (x.min(y), x.max(y))
            };

            let cds_start = starts[i] + a % (ends[i] - starts[i]);
            let cds_end = if i == j {
                cds_start + 1 + b % (ends[i] - cds_start)
            } else {
                starts[j] + 1 + b % (ends[j] - starts[j])
            };

            let (cds_starts, cds_ends): (Vec<u64>, Vec<u64>) = (i..=j)
                .map(|k| (starts[k].max(cds_start), ends[k].min(cds_end)))
                .unzip();

            GenomicAnnotation::builder("chr1", "+")
                .transcript_id("coding")
                .blocks(starts, ends)
                .cds(cds_starts, cds_ends)
                .starts_offset(0)
                .build()
                .unwrap()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Blocks are ascending after construction, whatever the input order
    #[test]
    fn prop_starts_non_decreasing(
        (starts, ends) in arb_any_blocks(),
        strand in arb_strand(),
        policy in arb_policy(),
    ) {
        let ann = GenomicAnnotation::builder("chr1", strand)
            .blocks(starts, ends)
            .starts_offset(0)
            .policy(policy)
            .build()
            .unwrap();
        prop_assert!(ann.starts().windows(2).all(|w| w[0] <= w[1]));
    }

    /// Sorting keeps every (start, end) pair together
    #[test]
    fn prop_sort_keeps_pairs((starts, ends) in arb_any_blocks(), strand in arb_strand()) {
        let mut expected: Vec<(u64, u64)> = starts.iter().copied().zip(ends.iter().copied()).collect();
        expected.sort();
        let ann = build(starts, ends, strand);
        let mut actual: Vec<(u64, u64)> = ann.blocks().collect();
        actual.sort();
        prop_assert_eq!(actual, expected);
    }

    /// Merging twice with the same threshold equals merging once
    #[test]
    fn prop_merge_idempotent((starts, ends) in arb_any_blocks(), gap in 0u64..500) {
        let mut once = build(starts, ends, "+");
        once.merge_small_gaps(gap);
        let mut twice = once.clone();
        twice.merge_small_gaps(gap);
        prop_assert_eq!(once.starts(), twice.starts());
        prop_assert_eq!(once.ends(), twice.ends());
    }

    /// After a merge every remaining gap is larger than the threshold
    #[test]
    fn prop_merge_leaves_only_large_gaps((starts, ends) in arb_any_blocks(), gap in 0u64..500) {
        let mut ann = build(starts, ends, "-");
        ann.merge_small_gaps(gap);
        if let Some(introns) = ann.introns() {
            prop_assert!(introns.iter().all(|&i| i > gap as i64));
        }
    }

    /// Threshold 0 leaves blocks separated by real gaps untouched
    #[test]
    fn prop_merge_zero_is_identity((starts, ends) in arb_ascending_blocks(10)) {
        let mut ann = build(starts.clone(), ends.clone(), "+");
        ann.merge_small_gaps(0);
        prop_assert_eq!(ann.starts(), starts.as_slice());
        prop_assert_eq!(ann.ends(), ends.as_slice());
    }

    /// One intron fewer than exons, none for a single exon
    #[test]
    fn prop_intron_count((starts, ends) in arb_ascending_blocks(10)) {
        let ann = build(starts, ends, "+");
        match ann.introns() {
            Some(introns) => prop_assert_eq!(introns.len(), ann.exons().len() - 1),
            None => prop_assert_eq!(ann.block_count(), 1),
        }
    }

    /// Exon sizes add up to the covered length minus the introns
    #[test]
    fn prop_exons_and_introns_span((starts, ends) in arb_ascending_blocks(10)) {
        let ann = build(starts, ends, "+");
        let exons: u64 = ann.exons().iter().sum();
        let introns: i64 = ann.introns().unwrap_or_default().iter().sum();
        prop_assert_eq!(exons as i64 + introns, (ann.end() - ann.start()) as i64);
    }

    /// Per-exon coding fractions sum to 1
    #[test]
    fn prop_orf_contribution_sums_to_one(ann in arb_coding_transcript()) {
        let contrib = ann.exon_contrib_to_orf().unwrap();
        prop_assert_eq!(contrib.len(), ann.block_count());
        let total: f64 = contrib.iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-9, "sum was {}", total);
        prop_assert!(contrib.iter().all(|&c| c >= 0.0));
    }

    /// thickStart/thickEnd frame the CDS
    #[test]
    fn prop_thick_frames_cds(ann in arb_coding_transcript()) {
        let cds_starts = ann.cds_starts().unwrap();
        let cds_ends = ann.cds_ends().unwrap();
        prop_assert_eq!(ann.thick_start(), cds_starts.iter().min().copied());
        prop_assert_eq!(ann.thick_end(), cds_ends.iter().max().copied());
        prop_assert_eq!(
            ann.orf_size().unwrap(),
            ann.orf_blocks().unwrap().iter().sum::<u64>()
        );
    }
}

#[test]
fn test_invalid_strand_is_rejected() {
    let result = GenomicAnnotation::builder("chr1", ".")
        .blocks(vec![0], vec![10])
        .starts_offset(0)
        .build();
    assert!(matches!(result, Err(genial::GenialError::InvalidStrand(_))));
}
