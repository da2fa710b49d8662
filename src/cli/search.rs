//! Search command handlers
//!
//! Nearest-N, within-radius, show-all and detail lookups against the
//! clean database.

use crate::config::Config;
use crate::coord::Point;
use crate::error::{Error, Result};
use crate::format::url::UrlFormatter;
use crate::format::{available_formats, detail_card, get_formatter, not_found, unknown_address, SearchReport};
use crate::geo::get_geocoder;
use crate::search::{
    all_located, find_closest_n_points, find_closest_radius, get_detail, resolve_origin, Origin,
    OriginQuery,
};
use crate::store::Store;
use clap::Args;

/// Where to search from
#[derive(Args)]
#[group(required = true, multiple = true)]
pub struct OriginArgs {
    /// Latitude
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Address (geocoded)
    #[arg(long, short = 'l', conflicts_with_all = ["lat", "lng"])]
    pub location: Option<String>,
}

impl OriginArgs {
    fn query(&self) -> Result<OriginQuery> {
        match (&self.location, self.lat, self.lng) {
            (Some(address), _, _) => Ok(OriginQuery::Address(address.clone())),
            (None, Some(lat), Some(lng)) => Ok(OriginQuery::Point(Point::try_new(lat, lng)?)),
            _ => Err(Error::InvalidCoordinates(
                "Either --lat and --lng or --location is required".to_string(),
            )),
        }
    }
}

/// How to print results
#[derive(Args)]
pub struct OutputArgs {
    /// Output format
    #[arg(long, short = 'f')]
    pub format: Option<String>,

    /// Map URL provider for the url format
    #[arg(long)]
    pub provider: Option<String>,

    /// Write output to file
    #[arg(long, short = 'o')]
    pub output: Option<String>,
}

/// Nearest command arguments
#[derive(Args)]
pub struct NearestArgs {
    #[command(flatten)]
    pub origin: OriginArgs,

    /// Number of results
    #[arg(long, short = 'n')]
    pub count: Option<usize>,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Radius command arguments
#[derive(Args)]
pub struct RadiusArgs {
    #[command(flatten)]
    pub origin: OriginArgs,

    /// Search radius in km
    #[arg(long, short = 'r')]
    pub radius: Option<f64>,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// All command arguments
#[derive(Args)]
pub struct AllArgs {
    #[command(flatten)]
    pub output: OutputArgs,

    /// List available formats
    #[arg(short = 'F', long = "list-formats")]
    pub list_formats: bool,
}

/// Details command arguments
#[derive(Args)]
pub struct DetailsArgs {
    /// Location ID
    pub id: u64,
}

/// Run the nearest command
pub fn nearest(args: NearestArgs) -> Result<()> {
    let config = Config::load()?;
    let Some(origin) = locate(&config, &args.origin)? else {
        return Ok(());
    };
    let count = args.count.unwrap_or(config.search.default_count);

    let db = Store::open(&config)?.load_clean()?;
    let hits = find_closest_n_points(&db, origin.point, count);
    emit(&SearchReport { origin: Some(origin), hits }, &args.output, &config)
}

/// Run the radius command
pub fn radius(args: RadiusArgs) -> Result<()> {
    let config = Config::load()?;
    let radius = args.radius.unwrap_or(config.search.default_radius_km);
    if !radius.is_finite() || radius < 0.0 {
        return Err(Error::Config(format!("Radius must be a non-negative number of km, got {}", radius)));
    }
    let Some(origin) = locate(&config, &args.origin)? else {
        return Ok(());
    };

    let db = Store::open(&config)?.load_clean()?;
    let hits = find_closest_radius(&db, origin.point, radius);
    emit(&SearchReport { origin: Some(origin), hits }, &args.output, &config)
}

/// Run the all command
pub fn all(args: AllArgs) -> Result<()> {
    if args.list_formats {
        list_formats();
        return Ok(());
    }

    let config = Config::load()?;
    let db = Store::open(&config)?.load_clean()?;
    let report = SearchReport {
        origin: None,
        hits: all_located(&db),
    };
    emit(&report, &args.output, &config)
}

/// Run the details command
pub fn details(args: DetailsArgs) -> Result<()> {
    let config = Config::load()?;
    let db = Store::open(&config)?.load_clean()?;

    match get_detail(&db, args.id) {
        Some(loc) => println!("{}", detail_card(args.id, loc)),
        None => println!("{}", not_found(args.id)),
    }
    Ok(())
}

/// Resolve the origin; prints the unknown-address message and yields `None`
/// when geocoding finds nothing
fn locate(config: &Config, args: &OriginArgs) -> Result<Option<Origin>> {
    let query = args.query()?;
    let geocoder = get_geocoder(config)?;

    let origin = resolve_origin(&geocoder, &query)?;
    match (&origin, &query) {
        (Some(origin), _) => {
            if let Some(label) = &origin.label {
                eprintln!("Standort: {}", label);
            }
        }
        (None, OriginQuery::Address(address)) => println!("{}", unknown_address(address)),
        (None, OriginQuery::Point(_)) => {}
    }
    Ok(origin)
}

fn emit(report: &SearchReport, args: &OutputArgs, config: &Config) -> Result<()> {
    let format = args.format.clone().unwrap_or_else(|| config.search.format.clone());

    let output = if format.eq_ignore_ascii_case("url") {
        UrlFormatter.format_with_provider(report, config, args.provider.as_deref())?
    } else {
        let formatter = get_formatter(&format)
            .ok_or_else(|| Error::Config(format!("Unknown format: {}", format)))?;
        formatter.format(report, config)?
    };

    // Write output
    if let Some(path) = &args.output {
        std::fs::write(path, &output)?;
        eprintln!("Output written to {}", path);
    } else {
        println!("{}", output);
    }
    Ok(())
}

/// Print available output formats
fn list_formats() {
    println!("Available output formats:");
    for format in available_formats() {
        println!("  {:6} - {}", format.name, format.description);
    }
}
