use wundercast_core::{Notice, WeatherResult};

pub const SEARCHING: &str = "Searching...";

pub fn weather(w: &WeatherResult) -> String {
    if w.is_empty() {
        return "No weather data available".to_string();
    }

    format!(
        "{}  {}  {:.0}° C  {}%",
        w.city_name,
        w.icon_glyph(),
        w.temperature_c,
        w.humidity_pct
    )
}

pub fn notice(n: &Notice) -> String {
    format!("! {n}")
}

pub fn error(e: &anyhow::Error) -> String {
    format!("error: {e:#}")
}
