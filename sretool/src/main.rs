use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod context;
mod format;
mod logging;

/// sretool - container image toolbox for SRE automation
///
/// Parses image references, resolves tags to digests, compares images and
/// drives skopeo copies.
#[derive(Parser, Debug)]
#[command(name = "sretool")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file
    #[arg(long, global = true, env = "SRETOOL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Display version information
    Version,
    /// Parse, resolve and compare image references
    Image {
        #[command(subcommand)]
        command: ImageCommands,
    },
    /// Run skopeo with configured credentials
    Skopeo {
        #[command(subcommand)]
        command: SkopeoCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ImageCommands {
    /// Show the parsed fields of a reference (no network access)
    Parse {
        /// Image reference
        reference: String,
        /// Output format: pretty, json, yaml
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Resolve a reference to its manifest digest
    Digest {
        /// Image reference
        reference: String,
        /// Output format: pretty, json, yaml
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Check whether two references point to the same image (exit 1 if not)
    Compare {
        /// First image reference
        first: String,
        /// Second image reference
        second: String,
        /// Compare manifest content instead of digests
        #[arg(long)]
        content: bool,
        /// Output format: pretty, json, yaml
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// List the tags of a repository
    Tags {
        /// Image reference (tag and digest are ignored)
        reference: String,
        /// Output format: pretty, json, yaml
        #[arg(short, long, default_value = "pretty")]
        format: String,
        /// Show only tag names
        #[arg(short, long)]
        quiet: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SkopeoCommands {
    /// Show skopeo's inspection of an image
    Inspect {
        /// Image reference or skopeo transport argument
        image: String,
        /// Output format: pretty, json, yaml
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Copy an image between registries
    Copy {
        /// Source image
        src: String,
        /// Destination image
        dst: String,
        /// Copy all architectures of a multi-arch image
        #[arg(long)]
        all: bool,
        /// Log the copy without running it
        #[arg(long)]
        dry_run: bool,
        /// Output format: pretty, json, yaml
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let verbosity = context::VerbosityLevel::from_count(cli.verbose);
    logging::init(verbosity);

    let ctx = match context::AppContext::build(cli.config.as_deref(), verbosity) {
        Ok(ctx) => ctx,
        Err(e) => {
            format::error(&e);
            std::process::exit(1);
        }
    };
    tracing::debug!(config = ?ctx.config_path, verbosity = ?ctx.verbosity, "context ready");

    match cli.command {
        Commands::Version => {
            commands::version::print_version();
        }
        Commands::Image { command } => match command {
            ImageCommands::Parse { reference, format } => {
                let fmt = format::OutputFormat::from(format.as_str());
                commands::image::handlers::handle_image_parse(&reference, fmt);
            }
            ImageCommands::Digest { reference, format } => {
                let fmt = format::OutputFormat::from(format.as_str());
                commands::image::handlers::handle_image_digest(&ctx, &reference, fmt);
            }
            ImageCommands::Compare {
                first,
                second,
                content,
                format,
            } => {
                let fmt = format::OutputFormat::from(format.as_str());
                commands::image::handlers::handle_image_compare(
                    &ctx, &first, &second, content, fmt,
                );
            }
            ImageCommands::Tags {
                reference,
                format,
                quiet,
            } => {
                let fmt = format::OutputFormat::from(format.as_str());
                commands::image::handlers::handle_image_tags(&ctx, &reference, fmt, quiet);
            }
        },
        Commands::Skopeo { command } => match command {
            SkopeoCommands::Inspect { image, format } => {
                let fmt = format::OutputFormat::from(format.as_str());
                commands::skopeo::handlers::handle_skopeo_inspect(&ctx, &image, fmt);
            }
            SkopeoCommands::Copy {
                src,
                dst,
                all,
                dry_run,
                format,
            } => {
                let fmt = format::OutputFormat::from(format.as_str());
                commands::skopeo::handlers::handle_skopeo_copy(
                    &ctx, &src, &dst, all, dry_run, fmt,
                );
            }
        },
    }
}
