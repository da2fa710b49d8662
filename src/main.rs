//! coin-atlas CLI entry point
//!
//! Elongated-coin machine locator - crawler, search CLI + JSON API

use coin_atlas::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
