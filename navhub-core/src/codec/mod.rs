//! NMEA-0183 sentence codec.
//!
//! Bidirectional handling of the wire format: checksum machinery, decoding of
//! the supported sentence types into a [`NavData`] record, sentence emission
//! helpers and the AIVDM payload encoder used by the AIS simulator.
//!
//! Decoding is pure: the same input line always yields the same result, no
//! state is kept between calls.

pub mod ais;
pub mod emit;
mod sentences;

use tracing::trace;

use crate::error::CodecError;
use crate::navdata::NavData;

/// Decoder behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// When an RMC sentence carries a course over ground, also mirror it
    /// into the heading field. Dedicated heading sentences (HDT, VHW)
    /// overwrite the approximation whenever they arrive.
    pub heading_from_cog: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions {
            heading_from_cog: true,
        }
    }
}

/// XOR checksum over the content bytes (everything between the leading
/// `$`/`!` and the `*` delimiter).
pub fn checksum(content: &str) -> u8 {
    content.bytes().fold(0, |acc, b| acc ^ b)
}

/// Verify the `*XX` trailer of a sentence and return the content between the
/// leading delimiter and the `*`.
pub fn verify_checksum(sentence: &str) -> Result<&str, CodecError> {
    let star = sentence
        .rfind('*')
        .ok_or_else(|| CodecError::MissingChecksum(sentence.to_string()))?;
    let received = sentence
        .get(star + 1..star + 3)
        .ok_or_else(|| CodecError::MissingChecksum(sentence.to_string()))?;
    let content = &sentence[1..star];
    let computed = checksum(content);
    let claimed = u8::from_str_radix(received, 16).map_err(|_| CodecError::ChecksumMismatch {
        computed,
        received: received.to_string(),
        sentence: sentence.to_string(),
    })?;
    if claimed != computed {
        return Err(CodecError::ChecksumMismatch {
            computed,
            received: received.to_string(),
            sentence: sentence.to_string(),
        });
    }
    Ok(content)
}

/// Decode one NMEA line into `data`.
///
/// Returns `Ok(true)` when the record was updated, `Ok(false)` when the line
/// is not a `$` sentence or its type is unknown (not an error: mixed streams
/// are normal), and `Err` on checksum or format violations.
pub fn decode_into(
    sentence: &str,
    data: &mut NavData,
    opts: &DecoderOptions,
) -> Result<bool, CodecError> {
    if !sentence.starts_with('$') {
        return Ok(false);
    }

    let content = verify_checksum(sentence)?;
    let fields: Vec<&str> = content.split(',').collect();
    let header = fields[0];
    if header.len() < 3 {
        return Err(CodecError::Malformed(format!(
            "sentence header too short: {header:?}"
        )));
    }

    // Talker-agnostic dispatch: "GPRMC" and "GNRMC" are both RMC.
    let type_code = header
        .get(header.len() - 3..)
        .ok_or_else(|| CodecError::Malformed(format!("invalid sentence header: {header:?}")))?;
    let updated = match type_code {
        "RMC" => sentences::rmc(&fields, data, opts)?,
        "GGA" => sentences::gga(&fields, data)?,
        "MWV" => sentences::mwv(&fields, data)?,
        "HDT" => sentences::hdt(&fields, data)?,
        "DPT" => sentences::dpt(&fields, data)?,
        "DBS" => sentences::dbs(&fields, data)?,
        "MTW" => sentences::mtw(&fields, data)?,
        "VHW" => sentences::vhw(&fields, data)?,
        _ => {
            trace!("ignoring unsupported sentence type {type_code}");
            false
        }
    };
    Ok(updated)
}
