//! Performance benchmarks for GenIAL
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use genial::core::GenomicAnnotation;
use genial::formats::attributes::{parse_attributes, AttributePolicy};
use genial::formats::gff::FileFormat;
use genial::formats::{convert, ConvertOptions, InputFormat, OutputFormat};

/// Synthetic GTF with `transcripts` transcripts of `exons` exons each,
/// listed in transcription order on the minus strand
fn synthetic_gtf(transcripts: usize, exons: usize) -> String {
    let mut out = String::new();
    for t in 0..transcripts {
        let origin = 1 + t as u64 * 100_000;
        for e in (0..exons).rev() {
            let start = origin + e as u64 * 1000;
            out.push_str(&format!(
                "chr1\tbench\texon\t{}\t{}\t.\t-\t.\tgene_id \"G{}\"; transcript_id \"T{}\"; exon_number \"{}\";\n",
                start,
                start + 499,
                t,
                t,
                exons - e
            ));
        }
    }
    out
}

fn bench_attribute_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("attributes");

    let inputs = [
        ("gtf", "gene_id \"ENSG00000223972\"; transcript_id \"ENST00000456328\"; gene_name \"DDX11L1\";", FileFormat::Gtf),
        ("gff3", "ID=transcript:ENST00000456328;Parent=gene:ENSG00000223972;Name=DDX11L1-202", FileFormat::Gff3),
        ("gff3_escaped", "ID=tx1;Note=R&amp;D&#59;done;Parent=g1", FileFormat::Gff3),
    ];

    for (name, raw, format) in inputs.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), raw, |b, raw| {
            b.iter(|| {
                let attrs = parse_attributes(black_box(raw), *format, AttributePolicy::WarnAndSkip);
                black_box(attrs)
            })
        });
    }

    group.finish();
}

fn bench_gtf_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("gtf_to_bed12");

    for transcripts in [100usize, 1000].iter() {
        let input = synthetic_gtf(*transcripts, 8);
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(transcripts), &input, |b, input| {
            let options = ConvertOptions::new(InputFormat::Gtf, OutputFormat::Bed);
            b.iter(|| {
                let mut out = Vec::with_capacity(input.len());
                let stats = convert(black_box(input.as_bytes()), &mut out, &options).unwrap();
                black_box((stats, out))
            })
        });
    }

    group.finish();
}

fn bench_derived_features(c: &mut Criterion) {
    let starts: Vec<u64> = (0..50).map(|i| i * 1000).collect();
    let ends: Vec<u64> = starts.iter().map(|s| s + 500).collect();
    let ann = GenomicAnnotation::builder("chr1", "+")
        .transcript_id("bench")
        .blocks(starts.clone(), ends.clone())
        .cds(vec![250, 1000], vec![500, 1300])
        .starts_offset(0)
        .build()
        .unwrap();

    c.bench_function("merge_small_gaps_50", |b| {
        b.iter(|| {
            let mut copy = ann.clone();
            copy.merge_small_gaps(black_box(600));
            black_box(copy)
        })
    });

    c.bench_function("exon_contrib_to_orf_50", |b| {
        b.iter(|| black_box(ann.exon_contrib_to_orf()))
    });
}

criterion_group!(
    benches,
    bench_attribute_parsing,
    bench_gtf_conversion,
    bench_derived_features,
);
criterion_main!(benches);
