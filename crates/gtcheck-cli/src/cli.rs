use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gtcheck",
    about = "gtcheck: validate prompt ground-truth call traces against mock backends and APIs",
    version,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Log progress to stderr at info level (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Arguments for `check` when no subcommand is given
    #[command(flatten)]
    pub check: CheckArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate every prompt ground truth in the corpus (the default)
    Check(CheckArgs),

    /// Parse one call expression and show its method name and arguments
    ParseCall {
        /// Call expression, e.g. `get_message("me", "18c2a0f3b4d5e6f7")`
        call: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the backend fixtures and API surfaces discovered in the corpus
    Registries {
        #[command(flatten)]
        corpus: CorpusArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    /// Corpus base directory (holds Prompts/, Backends/ and *Apis.* files)
    #[arg(long, env = "GTCHECK_BASE_DIR", default_value = ".")]
    pub base_dir: String,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Output the report as JSON
    #[arg(long)]
    pub json: bool,
}
