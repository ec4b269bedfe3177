use anyhow::{Context, anyhow};
use wundercast_core::{Coordinate, LocationFix};

pub const HELP: &str = "\
Type a city name to search, or:
  :geo LAT LON [ACCURACY_M]  search by location
  :key                       enter a new API key
  :help                      show this help
  :quit                      exit";

/// Accuracy assumed for a hand-typed coordinate.
const TYPED_FIX_ACCURACY_M: f64 = 5.0;

/// One line of interactive input.
#[derive(Debug, PartialEq)]
pub enum Input {
    Search(String),
    Geo(LocationFix),
    Key,
    Help,
    Quit,
    Nothing,
}

pub fn parse(line: &str) -> anyhow::Result<Input> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Input::Nothing);
    }

    let Some(command) = trimmed.strip_prefix(':') else {
        // The raw text is the cache key, so keep it as typed.
        return Ok(Input::Search(line.to_string()));
    };

    let mut words = command.split_whitespace();
    match words.next() {
        Some("q") | Some("quit") => Ok(Input::Quit),
        Some("h") | Some("help") => Ok(Input::Help),
        Some("key") => Ok(Input::Key),
        Some("geo") => {
            let args: Vec<&str> = words.collect();
            parse_geo(&args).map(Input::Geo)
        }
        Some(other) => Err(anyhow!("Unknown command ':{other}'. Type :help for the list.")),
        None => Err(anyhow!("Missing command after ':'")),
    }
}

fn parse_geo(args: &[&str]) -> anyhow::Result<LocationFix> {
    let number = |name: &str, raw: Option<&&str>| -> anyhow::Result<f64> {
        let raw = raw.ok_or_else(|| anyhow!("Usage: :geo LAT LON [ACCURACY_M]"))?;
        raw.parse::<f64>().with_context(|| format!("Invalid {name} '{raw}'"))
    };

    if args.len() > 3 {
        return Err(anyhow!("Usage: :geo LAT LON [ACCURACY_M]"));
    }

    let latitude = number("latitude", args.first())?;
    let longitude = number("longitude", args.get(1))?;
    let accuracy = match args.get(2) {
        Some(_) => number("accuracy", args.get(2))?,
        None => TYPED_FIX_ACCURACY_M,
    };

    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(anyhow!("Coordinate out of range: {latitude}, {longitude}"));
    }

    Ok(LocationFix::new(Coordinate::new(latitude, longitude), accuracy))
}

/// Rejects a fix the search would never use, so nothing waits on it.
pub fn require_accuracy(fix: LocationFix, threshold_m: f64) -> anyhow::Result<LocationFix> {
    if fix.is_within(threshold_m) {
        Ok(fix)
    } else {
        Err(anyhow!(
            "No accurate fix: {} m is worse than the {threshold_m} m the search needs",
            fix.horizontal_accuracy_m
        ))
    }
}
