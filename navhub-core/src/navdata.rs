//! The merged, flag-tagged snapshot of current vessel state.
//!
//! Every decoded sentence and every simulator tick produces one of these.
//! A field carries meaning only when its `has_*` flag is set; consumers that
//! accumulate updates use [`NavData::merge_from`] and never look at unflagged
//! fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavData {
    /// Absolute instant the data was produced (or the sentence UTC time,
    /// when the sentence carries one).
    pub timestamp: DateTime<Utc>,
    /// Origin tag, e.g. `"SERIAL:<id>"`, `"UDP:<id>"` or `"SIMULATOR"`.
    pub source_id: String,

    /// Degrees true.
    pub heading: f64,
    /// Degrees true.
    pub course_over_ground: f64,
    /// Knots.
    pub speed_over_ground: f64,
    /// Knots.
    pub speed_through_water: f64,

    pub latitude: f64,
    pub longitude: f64,
    /// Meters above mean sea level.
    pub altitude: f64,

    /// Meters below surface.
    pub depth: f64,
    /// Degrees Celsius.
    pub water_temperature: f64,

    /// Degrees relative to the bow.
    pub wind_angle: f64,
    /// Knots.
    pub wind_speed: f64,

    /// Receiver reports a trusted fix. Independent of `has_position`: a
    /// receiver may report position fields without a fix.
    pub gps_valid: bool,

    pub has_position: bool,
    pub has_speed: bool,
    pub has_heading: bool,
    pub has_wind: bool,
    pub has_depth: bool,
    pub has_water_temperature: bool,
    pub has_water_speed: bool,
}

impl NavData {
    /// Fresh record stamped now, with all flags cleared.
    pub fn new(source_id: impl Into<String>) -> Self {
        NavData {
            timestamp: Utc::now(),
            source_id: source_id.into(),
            heading: 0.0,
            course_over_ground: 0.0,
            speed_over_ground: 0.0,
            speed_through_water: 0.0,
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            depth: 0.0,
            water_temperature: 0.0,
            wind_angle: 0.0,
            wind_speed: 0.0,
            gps_valid: false,
            has_position: false,
            has_speed: false,
            has_heading: false,
            has_wind: false,
            has_depth: false,
            has_water_temperature: false,
            has_water_speed: false,
        }
    }

    /// Fold an incoming update into an accumulated view.
    ///
    /// Timestamp and source are copied unconditionally. Each flag-guarded
    /// group overwrites only when the incoming flag is set, and flags are
    /// never cleared. `gps_valid` travels with the position group.
    pub fn merge_from(&mut self, incoming: &NavData) {
        self.timestamp = incoming.timestamp;
        self.source_id.clone_from(&incoming.source_id);

        if incoming.has_position {
            self.latitude = incoming.latitude;
            self.longitude = incoming.longitude;
            self.altitude = incoming.altitude;
            self.gps_valid = incoming.gps_valid;
            self.has_position = true;
        }
        if incoming.has_speed {
            self.speed_over_ground = incoming.speed_over_ground;
            self.course_over_ground = incoming.course_over_ground;
            self.has_speed = true;
        }
        if incoming.has_heading {
            self.heading = incoming.heading;
            self.has_heading = true;
        }
        if incoming.has_wind {
            self.wind_angle = incoming.wind_angle;
            self.wind_speed = incoming.wind_speed;
            self.has_wind = true;
        }
        if incoming.has_depth {
            self.depth = incoming.depth;
            self.has_depth = true;
        }
        if incoming.has_water_temperature {
            self.water_temperature = incoming.water_temperature;
            self.has_water_temperature = true;
        }
        if incoming.has_water_speed {
            self.speed_through_water = incoming.speed_through_water;
            self.has_water_speed = true;
        }
    }
}

impl Default for NavData {
    fn default() -> Self {
        NavData::new("")
    }
}
