//! gtcheck CLI: the `gtcheck` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    support::init_tracing(cli.verbose);

    match cli.command.unwrap_or(Commands::Check(cli.check)) {
        Commands::Check(args) => commands::check::run(args.corpus.base_dir, args.json),

        Commands::ParseCall { call, json } => commands::parse_call::run(call, json),

        Commands::Registries { corpus, json } => commands::registries::run(corpus.base_dir, json),
    }
}
