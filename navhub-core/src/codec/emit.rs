//! Sentence emission helpers.
//!
//! Producers build the content string without the leading delimiter and the
//! `*XX` trailer; [`seal`] and [`seal_encapsulated`] close the line.

use chrono::{DateTime, Utc};

use super::checksum;

/// Close a `$`-prefixed sentence: `"$" + content + "*" + hex checksum`.
pub fn seal(content: &str) -> String {
    format!("${}*{:02X}", content, checksum(content))
}

/// Close a `!`-prefixed (AIVDM) line, same checksum rule.
pub fn seal_encapsulated(content: &str) -> String {
    format!("!{}*{:02X}", content, checksum(content))
}

/// Latitude as `DDMM.mmmm` plus hemisphere letter.
pub fn format_latitude(latitude: f64) -> (String, char) {
    let abs = latitude.abs();
    let degrees = abs.trunc();
    let minutes = (abs - degrees) * 60.0;
    (
        format!("{:02}{:07.4}", degrees as u32, minutes),
        if latitude >= 0.0 { 'N' } else { 'S' },
    )
}

/// Longitude as `DDDMM.mmmm` plus hemisphere letter.
pub fn format_longitude(longitude: f64) -> (String, char) {
    let abs = longitude.abs();
    let degrees = abs.trunc();
    let minutes = (abs - degrees) * 60.0;
    (
        format!("{:03}{:07.4}", degrees as u32, minutes),
        if longitude >= 0.0 { 'E' } else { 'W' },
    )
}

/// Build a complete RMC line for the given ground track at the given instant.
pub fn rmc(latitude: f64, longitude: f64, sog: f64, cog: f64, when: DateTime<Utc>) -> String {
    let (lat, ns) = format_latitude(latitude);
    let (lon, ew) = format_longitude(longitude);
    let content = format!(
        "GPRMC,{},A,{},{},{},{},{:.1},{:.1},{},,,A",
        when.format("%H%M%S"),
        lat,
        ns,
        lon,
        ew,
        sog,
        cog,
        when.format("%d%m%y"),
    );
    seal(&content)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::{decode_into, verify_checksum, DecoderOptions};
    use crate::navdata::NavData;
    use chrono::TimeZone;

    #[test]
    fn sealed_sentences_verify() {
        let line = seal("IIMTW,19.5,C");
        assert!(verify_checksum(&line).is_ok());
        let bang = seal_encapsulated("AIVDM,1,1,1,A,,0");
        assert!(bang.starts_with('!'));
        assert_eq!(&bang[1..bang.rfind('*').unwrap()], "AIVDM,1,1,1,A,,0");
    }

    #[test]
    fn coordinate_formatting() {
        let (lat, ns) = format_latitude(48.1173);
        assert_eq!(lat, "4807.0380");
        assert_eq!(ns, 'N');
        let (lon, ew) = format_longitude(-11.516_667);
        assert_eq!(lon, "01131.0000");
        assert_eq!(ew, 'W');
    }

    #[test]
    fn rmc_round_trip() {
        let when = Utc.with_ymd_and_hms(1994, 3, 23, 12, 35, 19).unwrap();
        let line = rmc(48.1173, 11.516_667, 22.4, 84.4, when);

        let mut data = NavData::new("loopback");
        assert!(decode_into(&line, &mut data, &DecoderOptions::default()).unwrap());
        assert!((data.latitude - 48.1173).abs() < 1e-4);
        assert!((data.longitude - 11.516_667).abs() < 1e-4);
        assert!((data.speed_over_ground - 22.4).abs() < 0.1);
        assert!((data.course_over_ground - 84.4).abs() < 0.1);
        assert_eq!(data.timestamp, when);
    }

    #[test]
    fn rmc_near_equator_and_meridian() {
        let when = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let line = rmc(-0.004, 0.002, 0.0, 0.0, when);
        let mut data = NavData::new("loopback");
        assert!(decode_into(&line, &mut data, &DecoderOptions::default()).unwrap());
        assert!((data.latitude + 0.004).abs() < 1e-4);
        assert!((data.longitude - 0.002).abs() < 1e-4);
    }
}
