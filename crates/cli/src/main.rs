mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use commands::inspect::cmd_inspect;
use commands::mapping::{cmd_map, Mapping};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Map JSON data through schema bundles.
#[derive(Parser)]
#[command(name = "modelmap", version, about = "Map JSON data through schema bundles")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress all output; report through the exit code only
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build instances from external data and print them keyed by attribute name
    FromData {
        /// Path to the schema bundle JSON file
        #[arg(long)]
        schema: PathBuf,
        /// Name of the model to map through
        #[arg(long)]
        model: String,
        /// Input JSON file, object or array; `-` or absent reads stdin
        input: Option<PathBuf>,
    },

    /// Build instances from local values and print their external data
    ToData {
        /// Path to the schema bundle JSON file
        #[arg(long)]
        schema: PathBuf,
        /// Name of the model to map through
        #[arg(long)]
        model: String,
        /// Input JSON file, object or array; `-` or absent reads stdin
        input: Option<PathBuf>,
    },

    /// Read external data and write it back out through the same model
    RoundTrip {
        /// Path to the schema bundle JSON file
        #[arg(long)]
        schema: PathBuf,
        /// Name of the model to map through
        #[arg(long)]
        model: String,
        /// Input JSON file, object or array; `-` or absent reads stdin
        input: Option<PathBuf>,
    },

    /// List the models, attributes and field paths of a schema bundle
    Inspect {
        /// Path to the schema bundle JSON file
        #[arg(long)]
        schema: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::FromData {
            schema,
            model,
            input,
        } => cmd_map(
            Mapping::FromData,
            &schema,
            &model,
            input.as_deref(),
            cli.output,
            cli.quiet,
        ),
        Commands::ToData {
            schema,
            model,
            input,
        } => cmd_map(
            Mapping::ToData,
            &schema,
            &model,
            input.as_deref(),
            cli.output,
            cli.quiet,
        ),
        Commands::RoundTrip {
            schema,
            model,
            input,
        } => cmd_map(
            Mapping::RoundTrip,
            &schema,
            &model,
            input.as_deref(),
            cli.output,
            cli.quiet,
        ),
        Commands::Inspect { schema } => cmd_inspect(&schema, cli.output, cli.quiet),
    }
}

/// Report an error to stderr in the requested format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}

/// Report a mapping error; JSON output carries the error kind as well.
pub(crate) fn report_model_error(err: &modelmap_core::ModelError, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", err),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": err.to_json_value() })),
    }
}
