//! GenIAL CLI entry point
//!
//! Converts GFF3/GTF/BED12 annotation files to BED12, BED6 or EXTB.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use genial::core::{open_input, AnnotationFilter, OrientationPolicy};
use genial::formats::{self, AttributePolicy, ConvertOptions, InputFormat, OutputFormat, ParseOptions};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

const OUTPUT_BUFFER_SIZE: usize = 128 * 1024;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InputFormatArg {
    #[value(name = "gff3")]
    Gff3,
    #[value(name = "gtf")]
    Gtf,
    /// BED12
    #[value(name = "bed", alias = "bed12")]
    Bed,
}

impl From<InputFormatArg> for InputFormat {
    fn from(arg: InputFormatArg) -> Self {
        match arg {
            InputFormatArg::Gff3 => InputFormat::Gff3,
            InputFormatArg::Gtf => InputFormat::Gtf,
            InputFormatArg::Bed => InputFormat::Bed,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormatArg {
    /// BED12, one row per transcript
    #[value(name = "bed", alias = "bed12")]
    Bed,
    /// BED6, one row per exon
    #[value(name = "bed6")]
    Bed6,
    /// Exon table
    #[value(name = "extb")]
    Extb,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Bed => OutputFormat::Bed,
            OutputFormatArg::Bed6 => OutputFormat::Bed6,
            OutputFormatArg::Extb => OutputFormat::Extb,
        }
    }
}

/// What to do with attribute tokens that do not parse
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum AttributePolicyArg {
    /// Log a warning and drop the token
    #[default]
    #[value(name = "warn")]
    Warn,
    /// Abort on the first bad token
    #[value(name = "strict")]
    Strict,
}

impl From<AttributePolicyArg> for AttributePolicy {
    fn from(arg: AttributePolicyArg) -> Self {
        match arg {
            AttributePolicyArg::Warn => AttributePolicy::WarnAndSkip,
            AttributePolicyArg::Strict => AttributePolicy::FailFast,
        }
    }
}

/// How minus-strand blocks are put in genomic order
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum OrientationPolicyArg {
    /// Sort blocks by start
    #[default]
    #[value(name = "sort")]
    Sort,
    /// Reverse minus-strand blocks listed in transcription order
    #[value(name = "reverse")]
    Reverse,
}

impl From<OrientationPolicyArg> for OrientationPolicy {
    fn from(arg: OrientationPolicyArg) -> Self {
        match arg {
            OrientationPolicyArg::Sort => OrientationPolicy::Sort,
            OrientationPolicyArg::Reverse => OrientationPolicy::Reverse,
        }
    }
}

#[derive(Parser)]
#[command(name = "genial")]
#[command(about = "Gene annotation interval parser and converter")]
#[command(version)]
struct Cli {
    /// Attribute parsing policy for GFF3/GTF input
    #[arg(long = "attribute-policy", global = true, default_value = "warn")]
    attribute_policy: AttributePolicyArg,

    /// Block ordering policy
    #[arg(long = "orientation-policy", global = true, default_value = "sort")]
    orientation_policy: OrientationPolicyArg,

    #[command(subcommand)]
    command: Commands,
}

/// Input/output arguments shared by every subcommand
#[derive(Args)]
struct IoArgs {
    /// Input annotation file ('-' for stdin, .gz/.bz2 accepted)
    input: PathBuf,
    /// Output file (stdout if not specified)
    output: Option<PathBuf>,
    /// Input format
    #[arg(short = 'i', long = "input-format", default_value = "gff3")]
    input_format: InputFormatArg,
    /// Output format
    #[arg(short = 'o', long = "output-format", default_value = "bed")]
    output_format: OutputFormatArg,
}

/// Exon-count and intron-size filters
#[derive(Args)]
struct FilterArgs {
    /// Keep only transcripts with at least this many exons
    #[arg(long = "min-exon-count", default_value = "1")]
    min_exon_count: usize,
    /// Drop transcripts with an intron smaller than this
    #[arg(long = "ignore-gaps-smaller-than")]
    ignore_gaps_smaller_than: Option<i64>,
    /// Drop transcripts with an intron bigger than this
    #[arg(long = "ignore-gaps-bigger-than")]
    ignore_gaps_bigger_than: Option<i64>,
    /// Keep only transcripts the filters would drop
    #[arg(short = 'v', long = "invert-match")]
    invert_match: bool,
}

impl From<&FilterArgs> for AnnotationFilter {
    fn from(args: &FilterArgs) -> Self {
        AnnotationFilter {
            min_exon_count: args.min_exon_count,
            ignore_gaps_smaller_than: args.ignore_gaps_smaller_than,
            ignore_gaps_bigger_than: args.ignore_gaps_bigger_than,
            invert_match: args.invert_match,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an annotation file
    Convert {
        #[command(flatten)]
        io: IoArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// Merge exons separated by at most this many bases
        #[arg(long = "merge-gaps")]
        merge_gaps: Option<u64>,
    },
    /// Merge exons separated by small gaps
    MergeGaps {
        #[command(flatten)]
        io: IoArgs,
        /// Largest gap (in bases) that is merged
        #[arg(short = 'g', long = "gap", default_value = "9")]
        gap: u64,
    },
}

fn open_output(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {:?}", path))?;
            Box::new(BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, file))
        }
        None => Box::new(BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, io::stdout().lock())),
    };
    Ok(writer)
}

fn run(files: &IoArgs, options: &ConvertOptions) -> anyhow::Result<formats::ConversionStats> {
    let reader = open_input(&files.input)
        .with_context(|| format!("Failed to open input file {:?}", files.input))?;
    let mut writer = open_output(files.output.as_deref())?;

    match &files.output {
        Some(output) => eprintln!("Converting: {:?} -> {:?}", files.input, output),
        None => eprintln!("Converting: {:?} -> stdout", files.input),
    }
    let stats = formats::convert(reader, &mut writer, options)
        .with_context(|| format!("Failed to convert {:?}", files.input))?;
    Ok(stats)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start = Instant::now();

    let parse = ParseOptions {
        attribute_policy: cli.attribute_policy.into(),
        orientation_policy: cli.orientation_policy.into(),
        format: None,
    };

    let (files, options) = match &cli.command {
        Commands::Convert { io, filter, merge_gaps } => {
            let mut options = ConvertOptions::new(io.input_format.into(), io.output_format.into());
            options.small_gap = *merge_gaps;
            options.filter = filter.into();
            options.parse = parse;
            (io, options)
        }
        Commands::MergeGaps { io, gap } => {
            let mut options = ConvertOptions::new(io.input_format.into(), io.output_format.into());
            options.small_gap = Some(*gap);
            options.parse = parse;
            (io, options)
        }
    };

    let stats = run(files, &options)?;

    eprintln!("\n=== Conversion Statistics ===");
    eprintln!("Total records:   {}", stats.total);
    eprintln!("Written:         {}", stats.written);
    eprintln!("Filtered:        {}", stats.filtered);
    if options.small_gap.is_some() {
        eprintln!("Gap-merged:      {}", stats.merged);
    }
    eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}
