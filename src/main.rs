use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tmx_stream::{
    BatchReport, Config, ConfigBuilder, DEFAULT_MAX_TU_COUNT, ErrorPolicy, Pipeline, PruneOptions,
    RewriteOptions, SplitOptions, TransformSummary,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "tmx-stream",
    version,
    author,
    about = "Streaming transforms for TMX translation memory files",
    long_about = "Streaming transforms for TMX translation memory files.\n\n\
    Every command selects files with glob patterns relative to the working \
    directory and processes them one at a time in a single pass, so files of \
    any size run in constant memory.\n\n\
    USAGE EXAMPLES:\n  \
      # Statistics as JSON\n  \
      tmx-stream file-stats -F '**/*.tmx'\n\n  \
      # Drop notes and props, keeping one prop type\n  \
      tmx-stream remove-info-elements -F '**/*.tmx' -O cleaned -K x-context\n\n  \
      # Rename a language\n  \
      tmx-stream search-replace-attributes -F '**/*.tmx' -O fixed -A xml:lang -S '^en-US$' -V en-GB\n\n  \
      # Split into files of 50000 units\n  \
      tmx-stream split-files-by-tu-count -F '**/*.tmx' -O split -M 50000"
)]
struct Cli {
    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Keep processing the remaining files when one fails
    #[arg(long, global = true)]
    keep_going: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print header attributes, unit and language counts and size as JSON
    FileStats {
        #[command(flatten)]
        files: FileSelection,
    },

    /// Remove note and prop elements
    RemoveInfoElements {
        #[command(flatten)]
        files: FileSelection,

        #[command(flatten)]
        output: OutputDir,

        /// Keep note elements
        #[arg(short = 'N', long)]
        keep_notes: bool,

        /// Prop types to keep (can be used multiple times)
        #[arg(short = 'K', long, value_name = "TYPE")]
        keep_prop_types: Vec<String>,
    },

    /// Search and replace attribute values
    SearchReplaceAttributes {
        #[command(flatten)]
        files: FileSelection,

        #[command(flatten)]
        output: OutputDir,

        /// Tag names to limit the substitution to (default: all)
        #[arg(short = 'T', long, value_name = "NAME")]
        tag_names: Vec<String>,

        /// Attribute names to limit the substitution to (default: all)
        #[arg(short = 'A', long, value_name = "NAME")]
        attribute_names: Vec<String>,

        /// Regular expression searched in attribute values
        #[arg(short = 'S', long, value_name = "REGEX")]
        search_pattern: String,

        /// Flags for the search pattern (g, i, m, s, u)
        #[arg(short = 'R', long, default_value = "", value_name = "FLAGS")]
        search_flags: String,

        /// Replacement value; `$1`, `$&`, `$<name>` refer to the match
        #[arg(short = 'V', long, value_name = "VALUE", allow_hyphen_values = true)]
        replacement_value: String,
    },

    /// Split files into numbered parts of at most N translation units
    SplitFilesByTuCount {
        #[command(flatten)]
        files: FileSelection,

        #[command(flatten)]
        output: OutputDir,

        /// Maximum translation units per output file
        #[arg(short = 'M', long, default_value_t = DEFAULT_MAX_TU_COUNT, value_parser = clap::value_parser!(u64).range(1..))]
        max_tu_count: u64,
    },
}

#[derive(Args, Debug)]
struct FileSelection {
    /// Working directory in which to search for TMX files
    #[arg(short = 'W', long, default_value = ".", value_name = "PATH")]
    cwd: PathBuf,

    /// File match glob pattern(s), e.g. '**/*.tmx'
    #[arg(short = 'F', long, required = true, value_name = "GLOB")]
    file_match: Vec<String>,

    /// File ignore glob pattern(s)
    #[arg(short = 'I', long, value_name = "GLOB")]
    file_ignore: Vec<String>,
}

impl FileSelection {
    fn builder(self, keep_going: bool) -> ConfigBuilder {
        let policy = if keep_going {
            ErrorPolicy::Continue
        } else {
            ErrorPolicy::FailFast
        };

        Config::builder()
            .cwd(self.cwd)
            .file_matches(self.file_match)
            .file_ignores(self.file_ignore)
            .error_policy(policy)
    }
}

#[derive(Args, Debug)]
struct OutputDir {
    /// Output directory for TMX files
    #[arg(short = 'O', long = "output-path", value_name = "PATH")]
    path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    match cli.command {
        Command::FileStats { files } => {
            let config = files
                .builder(cli.keep_going)
                .build()
                .context("Failed to build configuration")?;
            let report = Pipeline::new(config)
                .context("Failed to create pipeline")?
                .file_stats()
                .context("file-stats failed")?;

            println!("{}", report.to_json()?);
            finish(&report)
        }

        Command::RemoveInfoElements {
            files,
            output,
            keep_notes,
            keep_prop_types,
        } => {
            let options = PruneOptions::new()
                .keep_notes(keep_notes)
                .keep_prop_types(keep_prop_types);
            let report = pipeline(files, output, cli.keep_going)?
                .remove_info_elements(&options)
                .context("remove-info-elements failed")?;
            summarize(&report);
            finish(&report)
        }

        Command::SearchReplaceAttributes {
            files,
            output,
            tag_names,
            attribute_names,
            search_pattern,
            search_flags,
            replacement_value,
        } => {
            let options = RewriteOptions::new(search_pattern, replacement_value)
                .tag_names(tag_names)
                .attribute_names(attribute_names)
                .flags(search_flags);
            let report = pipeline(files, output, cli.keep_going)?
                .search_replace_attributes(&options)
                .context("search-replace-attributes failed")?;
            summarize(&report);
            finish(&report)
        }

        Command::SplitFilesByTuCount {
            files,
            output,
            max_tu_count,
        } => {
            let report = pipeline(files, output, cli.keep_going)?
                .split_files_by_tu_count(&SplitOptions::new(max_tu_count))
                .context("split-files-by-tu-count failed")?;
            summarize(&report);
            finish(&report)
        }
    }
}

fn pipeline(files: FileSelection, output: OutputDir, keep_going: bool) -> anyhow::Result<Pipeline> {
    let config = files
        .builder(keep_going)
        .output_dir(output.path)
        .build()
        .context("Failed to build configuration")?;

    Pipeline::new(config).context("Failed to create pipeline")
}

fn summarize(report: &BatchReport<TransformSummary>) {
    for (path, summary) in &report.results {
        info!(
            "{}: {} units -> {} file(s)",
            path,
            summary.units,
            summary.outputs.len()
        );
    }
}

fn finish<T>(report: &BatchReport<T>) -> anyhow::Result<()> {
    if report.is_success() {
        return Ok(());
    }

    for (path, error) in &report.failures {
        warn!("{}: {}", path, error);
    }
    bail!(
        "{} of {} files failed",
        report.failures.len(),
        report.processed()
    )
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("tmx_stream=info"),
        1 => EnvFilter::new("tmx_stream=debug"),
        _ => EnvFilter::new("tmx_stream=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false),
        )
        .init();

    Ok(())
}
