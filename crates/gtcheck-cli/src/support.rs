use gtcheck_rules::{CorpusLayout, Registries};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logs go to stderr so stdout carries only command output.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

pub fn layout_or_exit(base_dir: &str) -> CorpusLayout {
    let base = Path::new(base_dir);
    if !base.is_dir() {
        eprintln!("error: corpus base directory not found: {}", base.display());
        std::process::exit(2);
    }
    CorpusLayout::from_base_dir(base)
}

pub fn load_registries_or_exit(layout: &CorpusLayout) -> Registries {
    Registries::load(layout).unwrap_or_else(|e| {
        eprintln!("error: failed to load registries: {e}");
        std::process::exit(2);
    })
}

pub fn print_json_or_exit<T: Serialize>(payload: &T, label: &str) {
    let rendered = serde_json::to_string_pretty(payload).unwrap_or_else(|e| {
        eprintln!("error: failed to render {label} payload: {e}");
        std::process::exit(2);
    });
    println!("{rendered}");
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
