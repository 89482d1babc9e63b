use clap::{Parser, Subcommand};

pub mod config;
pub mod encode;
pub mod input;
pub mod keygen;
pub mod logging;
pub mod match_profiles;
pub mod mnemonic;
pub mod score;
pub mod version;

use config::StrmatchConfig;
use encode::OutputFormat;
use match_profiles::MatchArgs;

#[derive(Parser)]
#[command(name = "strmatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Privacy-preserving STR profile matching", long_about = None)]
pub struct Cli {
    /// Path to config file (default: ~/.config/strmatch/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Log at debug level (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a new enclave mnemonic and print its fingerprint
    Keygen {
        /// Write the mnemonic here (mode 0600) instead of stderr
        #[arg(long)]
        output: Option<String>,
    },

    /// Pseudonymize a plaintext profile under the enclave key
    Encode {
        /// Profile JSON file
        #[arg(long)]
        profile: String,

        /// Path to file containing the enclave mnemonic
        #[arg(long)]
        mnemonic_file: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Output file (stdout if not specified; required for cbor)
        #[arg(long)]
        output: Option<String>,
    },

    /// Score two plaintext profiles
    Score {
        /// First profile JSON file
        #[arg(long)]
        first: String,

        /// Second profile JSON file
        #[arg(long)]
        second: String,

        /// Include per-locus shared/not-shared flags
        #[arg(long)]
        breakdown: bool,
    },

    /// Match a query profile against a candidate set
    Match {
        /// Query profile JSON file
        #[arg(long)]
        query: String,

        /// JSON array of plaintext candidate profiles
        #[arg(long)]
        candidates: Option<String>,

        /// CBOR file of candidates already encoded under this enclave
        #[arg(long)]
        encoded_candidates: Option<String>,

        /// Drop results scoring below this (tiers are unaffected)
        #[arg(long)]
        threshold: Option<f64>,

        /// Keep only the best N results
        #[arg(long)]
        top_n: Option<usize>,

        /// Include per-locus shared/not-shared flags
        #[arg(long)]
        breakdown: bool,

        /// Stop dispatching after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Path to file containing the enclave mnemonic
        #[arg(long)]
        mnemonic_file: Option<String>,
    },

    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a commented default config
    Init {
        /// Target path (default: ~/.config/strmatch/config.toml)
        #[arg(long)]
        path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // A broken config must not block `config init` from replacing it
    let config = match cli.command {
        Commands::Version | Commands::Config { .. } | Commands::Keygen { .. } => {
            StrmatchConfig::default()
        }
        _ => StrmatchConfig::resolve(cli.config.as_deref())?,
    };
    logging::init(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Keygen { output } => keygen::execute(output),
        Commands::Encode {
            profile,
            mnemonic_file,
            format,
            output,
        } => encode::execute(profile, mnemonic_file, format, output, config.profile),
        Commands::Score {
            first,
            second,
            breakdown,
        } => score::execute(first, second, breakdown, config.profile, config.thresholds),
        Commands::Match {
            query,
            candidates,
            encoded_candidates,
            threshold,
            top_n,
            breakdown,
            timeout_ms,
            mnemonic_file,
        } => {
            let args = MatchArgs {
                query,
                candidates,
                encoded_candidates,
                threshold,
                top_n,
                breakdown,
                timeout_ms,
                mnemonic_file,
            };
            match_profiles::execute(args, &config).await
        }
        Commands::Config {
            command: ConfigCommands::Init { path, force },
        } => config::execute_init(path, force),
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}
