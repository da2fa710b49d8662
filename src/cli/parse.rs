//! Coordinate command handlers
//!
//! Running the coordinate parser by hand and storing manual corrections.

use crate::config::Config;
use crate::coord::parse::find_gps;
use crate::error::{Error, Result};
use crate::format::not_found;
use crate::store::Store;
use clap::Args;

/// Parse command arguments
#[derive(Args)]
pub struct ParseArgs {
    /// Free-form coordinate text
    #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
    pub text: Vec<String>,
}

/// Correct command arguments
#[derive(Args)]
pub struct CorrectArgs {
    /// Location ID
    pub id: u64,

    /// Coordinates in any format the parser understands
    #[arg(num_args = 0.., allow_hyphen_values = true, required_unless_present = "clear")]
    pub coords: Vec<String>,

    /// Remove the manual correction
    #[arg(long, conflicts_with = "coords")]
    pub clear: bool,
}

/// Run the parse command
pub fn parse(args: ParseArgs) -> Result<()> {
    let text = args.text.join(" ");
    match find_gps(&text) {
        Some(point) => println!("{}", point),
        None => {
            eprintln!("No coordinates found in: {}", text);
            std::process::exit(1);
        }
    }
    Ok(())
}

/// Run the correct command
pub fn correct(args: CorrectArgs) -> Result<()> {
    let corrected = if args.clear {
        None
    } else {
        let text = args.coords.join(" ");
        let point = find_gps(&text)
            .ok_or_else(|| Error::InvalidCoordinates(format!("No coordinates found in: {}", text)))?;
        Some(point)
    };

    let config = Config::load()?;
    let store = Store::open(&config)?;
    let mut db = store.load()?;

    let Some(loc) = db.location_mut(args.id) else {
        println!("{}", not_found(args.id));
        return Ok(());
    };
    loc.corrected_gps = corrected;
    let name = loc.name.clone();
    store.save(&db)?;

    match corrected {
        Some(point) => println!("{}: {} -> {}", args.id, name, point),
        None => println!("{}: {} correction removed", args.id, name),
    }
    Ok(())
}
