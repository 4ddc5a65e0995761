//! Per-type field handlers for the decoder.
//!
//! Each handler receives the comma-split content fields (header included at
//! index 0), mutates the record and reports whether anything was applied.
//! Absent fields are skipped, never inferred; malformed numerics are decode
//! errors.

use chrono::{TimeZone, Utc};

use crate::error::CodecError;
use crate::navdata::NavData;

use super::DecoderOptions;

fn field<'a>(fields: &[&'a str], idx: usize) -> &'a str {
    fields.get(idx).copied().unwrap_or("")
}

/// Optional numeric field: empty is `None`, unparsable is an error.
fn pick_number(fields: &[&str], idx: usize) -> Result<Option<f64>, CodecError> {
    let raw = field(fields, idx);
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| CodecError::Malformed(format!("field {idx} is not a number: {raw:?}")))
}

/// DDMM.mmmm / DDDMM.mmmm plus hemisphere into signed decimal degrees.
fn pick_coordinate(
    fields: &[&str],
    value_idx: usize,
    hemi_idx: usize,
    negative_hemi: &str,
    positive_hemi: &str,
) -> Result<Option<f64>, CodecError> {
    let Some(raw) = pick_number(fields, value_idx)? else {
        return Ok(None);
    };
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    let decimal = degrees + minutes / 60.0;
    let hemi = field(fields, hemi_idx);
    if hemi == negative_hemi {
        Ok(Some(-decimal))
    } else if hemi == positive_hemi {
        Ok(Some(decimal))
    } else {
        Err(CodecError::Malformed(format!(
            "invalid hemisphere indicator: {hemi:?}"
        )))
    }
}

/// HHMMSS[.ss] + DDMMYY assembled as UTC. Years below 80 are 20xx.
fn pick_utc(
    fields: &[&str],
    time_idx: usize,
    date_idx: usize,
) -> Result<Option<chrono::DateTime<Utc>>, CodecError> {
    let time = field(fields, time_idx);
    let date = field(fields, date_idx);
    if time.len() < 6 || date.len() != 6 {
        return Ok(None);
    }
    let digits = |s: &str, range: std::ops::Range<usize>| -> Result<u32, CodecError> {
        s.get(range)
            .and_then(|part| part.parse::<u32>().ok())
            .ok_or_else(|| CodecError::Malformed(format!("invalid time/date digits: {s:?}")))
    };
    let hour = digits(time, 0..2)?;
    let minute = digits(time, 2..4)?;
    let second = digits(time, 4..6)?;
    let day = digits(date, 0..2)?;
    let month = digits(date, 2..4)?;
    let yy = digits(date, 4..6)?;
    let year = if yy < 80 { 2000 + yy } else { 1900 + yy } as i32;
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
        .map(Some)
        .ok_or_else(|| CodecError::Malformed(format!("invalid UTC instant: {time} {date}")))
}

/// RMC: recommended minimum position, speed and course.
pub(super) fn rmc(
    fields: &[&str],
    data: &mut NavData,
    opts: &DecoderOptions,
) -> Result<bool, CodecError> {
    if fields.len() < 10 {
        return Ok(false);
    }
    let mut updated = false;

    if field(fields, 2) == "A" {
        data.gps_valid = true;
        updated = true;
    }
    if let (Some(lat), Some(lon)) = (
        pick_coordinate(fields, 3, 4, "S", "N")?,
        pick_coordinate(fields, 5, 6, "W", "E")?,
    ) {
        data.latitude = lat;
        data.longitude = lon;
        data.has_position = true;
        updated = true;
    }
    if let Some(sog) = pick_number(fields, 7)? {
        data.speed_over_ground = sog;
        data.has_speed = true;
        updated = true;
    }
    if let Some(cog) = pick_number(fields, 8)? {
        data.course_over_ground = cog;
        if opts.heading_from_cog {
            data.heading = cog;
            data.has_heading = true;
        }
        updated = true;
    }
    if let Some(utc) = pick_utc(fields, 1, 9)? {
        data.timestamp = utc;
        updated = true;
    }
    Ok(updated)
}

/// GGA: fix quality, position and antenna altitude.
pub(super) fn gga(fields: &[&str], data: &mut NavData) -> Result<bool, CodecError> {
    if fields.len() < 10 {
        return Ok(false);
    }
    let mut updated = false;

    if let Some(quality) = pick_number(fields, 6)? {
        data.gps_valid = quality > 0.0;
        updated = true;
    }
    if let (Some(lat), Some(lon)) = (
        pick_coordinate(fields, 2, 3, "S", "N")?,
        pick_coordinate(fields, 4, 5, "W", "E")?,
    ) {
        data.latitude = lat;
        data.longitude = lon;
        data.has_position = true;
        updated = true;
    }
    if let Some(alt) = pick_number(fields, 9)? {
        data.altitude = alt;
        updated = true;
    }
    Ok(updated)
}

/// MWV: relative wind. Applied only when the status field reports valid.
pub(super) fn mwv(fields: &[&str], data: &mut NavData) -> Result<bool, CodecError> {
    if fields.len() < 6 || field(fields, 5) != "A" {
        return Ok(false);
    }
    let mut updated = false;
    if let Some(angle) = pick_number(fields, 1)? {
        data.wind_angle = angle;
        data.has_wind = true;
        updated = true;
    }
    if let Some(speed) = pick_number(fields, 3)? {
        data.wind_speed = speed;
        data.has_wind = true;
        updated = true;
    }
    Ok(updated)
}

/// HDT: heading, true.
pub(super) fn hdt(fields: &[&str], data: &mut NavData) -> Result<bool, CodecError> {
    if let Some(heading) = pick_number(fields, 1)? {
        data.heading = heading;
        data.has_heading = true;
        return Ok(true);
    }
    Ok(false)
}

/// DPT: depth below transducer.
pub(super) fn dpt(fields: &[&str], data: &mut NavData) -> Result<bool, CodecError> {
    if let Some(depth) = pick_number(fields, 1)? {
        data.depth = depth;
        data.has_depth = true;
        return Ok(true);
    }
    Ok(false)
}

/// DBS: depth below surface; the meters value sits in field 3.
pub(super) fn dbs(fields: &[&str], data: &mut NavData) -> Result<bool, CodecError> {
    if let Some(depth) = pick_number(fields, 3)? {
        data.depth = depth;
        data.has_depth = true;
        return Ok(true);
    }
    Ok(false)
}

/// MTW: water temperature.
pub(super) fn mtw(fields: &[&str], data: &mut NavData) -> Result<bool, CodecError> {
    if let Some(temp) = pick_number(fields, 1)? {
        data.water_temperature = temp;
        data.has_water_temperature = true;
        return Ok(true);
    }
    Ok(false)
}

/// VHW: water speed and heading.
pub(super) fn vhw(fields: &[&str], data: &mut NavData) -> Result<bool, CodecError> {
    let mut updated = false;
    if let Some(heading) = pick_number(fields, 1)? {
        data.heading = heading;
        data.has_heading = true;
        updated = true;
    }
    if let Some(stw) = pick_number(fields, 5)? {
        data.speed_through_water = stw;
        data.has_water_speed = true;
        updated = true;
    }
    Ok(updated)
}
