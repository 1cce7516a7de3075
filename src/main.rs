//! sbom-resolver: provider-based SBOM metadata resolution.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use sbom_resolver::{
    cli,
    config::load_or_default,
    generate::SbomFormat,
};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sbom-resolver")]
#[command(version)]
#[command(about = "Resolve, merge, and sanitize SBOM component metadata", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Enrich every component of an SBOM from package registries
    sbom-resolver enrich sbom.cdx.json

    # Fill top-level supplier/license data from project manifests
    sbom-resolver augment sbom.cdx.json --root .

    # Generate an SBOM from a lock file
    sbom-resolver generate --lock-file Cargo.lock -o sbom.cdx.json

    # Check what the sanitizer does to a license string
    sbom-resolver license \"Commercial - see LICENSE.txt\"")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich SBOM components with registry metadata
    Enrich {
        /// CycloneDX SBOM file
        sbom: PathBuf,
        /// Output file (defaults to in-place)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fill top-level metadata from organizational sources
    Augment {
        /// CycloneDX SBOM file
        sbom: PathBuf,
        /// Workspace root holding the project manifests
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Output file (defaults to in-place)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate an SBOM from a lock file or container image
    Generate {
        /// Lock file to generate from
        #[arg(long, conflicts_with = "docker_image")]
        lock_file: Option<PathBuf>,
        /// Container image to generate from
        #[arg(long)]
        docker_image: Option<String>,
        /// Output file
        #[arg(short, long, default_value = "sbom.json")]
        output: PathBuf,
        /// Output format
        #[arg(long, default_value = "cyclonedx")]
        format: String,
        /// Spec version (generator default when omitted)
        #[arg(long)]
        spec_version: Option<String>,
    },
    /// Upload an SBOM to the first configured destination
    Upload {
        /// SBOM file to upload
        sbom: PathBuf,
        /// SBOM format
        #[arg(long, default_value = "cyclonedx")]
        format: String,
        /// Component name (for destinations that key on it)
        #[arg(long, env = "COMPONENT_NAME")]
        component_name: Option<String>,
        /// Component version
        #[arg(long, env = "COMPONENT_VERSION")]
        component_version: Option<String>,
    },
    /// List registered providers per capability
    Sources,
    /// Sanitize an SPDX license expression
    License {
        /// License expression or free-form license text
        expression: String,
        /// Emit the full outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sbom_resolver={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let (mut config, loaded_from) = load_or_default(cli.config.as_deref())?;
    if let Some(path) = &loaded_from {
        tracing::debug!(config = %path.display(), "using config file");
    }
    config.overlay_env();

    let exit_code = match cli.command {
        Commands::Enrich { sbom, output } => cli::run_enrich(&config, &sbom, output.as_deref())?,
        Commands::Augment { sbom, root, output } => {
            cli::run_augment(&config, &sbom, &root, output.as_deref())?
        }
        Commands::Generate {
            lock_file,
            docker_image,
            output,
            format,
            spec_version,
        } => {
            let format = SbomFormat::parse(&format)?;
            cli::run_generate(&config, lock_file, docker_image, output, format, spec_version)?
        }
        Commands::Upload {
            sbom,
            format,
            component_name,
            component_version,
        } => {
            let format = SbomFormat::parse(&format)?;
            cli::run_upload(&config, sbom, format, component_name, component_version)?
        }
        Commands::Sources => cli::run_sources(&config)?,
        Commands::License { expression, json } => cli::run_license(&expression, json)?,
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            let name = command.get_name().to_string();
            generate(shell, &mut command, name, &mut io::stdout());
            0
        }
    };

    std::process::exit(exit_code);
}
