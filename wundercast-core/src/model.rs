use serde::{Deserialize, Serialize};

/// Current conditions for one place, as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WeatherResult {
    pub city_name: String,
    pub temperature_c: f64,
    pub humidity_pct: u8,
    /// OpenWeatherMap icon code, e.g. `"10d"`.
    pub icon: String,
}

impl WeatherResult {
    /// The "no data available" placeholder.
    ///
    /// Only distinguishable from a real reading by convention: every field is
    /// zero or blank.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    /// Display glyph for the icon code. Unknown codes render as `"?"`.
    pub fn icon_glyph(&self) -> &'static str {
        if self.icon.is_empty() {
            return "";
        }

        let night = self.icon.ends_with('n');
        match self.icon.get(..2) {
            Some("01") if night => "🌙",
            Some("01") => "☀️",
            Some("02") if night => "☁️",
            Some("02") => "⛅",
            Some("03") | Some("04") => "☁️",
            Some("09") => "🌧️",
            Some("10") => "🌦️",
            Some("11") => "⛈️",
            Some("13") => "❄️",
            Some("50") => "🌫️",
            _ => "?",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// One sample from the location collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub coordinate: Coordinate,
    /// Radius of uncertainty in meters; smaller is better.
    pub horizontal_accuracy_m: f64,
}

impl LocationFix {
    pub fn new(coordinate: Coordinate, horizontal_accuracy_m: f64) -> Self {
        Self { coordinate, horizontal_accuracy_m }
    }

    pub fn is_within(&self, threshold_m: f64) -> bool {
        self.horizontal_accuracy_m >= 0.0 && self.horizontal_accuracy_m <= threshold_m
    }
}
