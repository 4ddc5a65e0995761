//! AIVDM payload encoding (ITU-R M.1371 bit layout).
//!
//! Messages are built as a bitstream of fixed-width big-endian fields, packed
//! into 6-bit groups, armored into the AIS ASCII alphabet and split into
//! AIVDM line fragments of at most 60 payload characters.

use bitvec::prelude::*;

use super::emit::seal_encapsulated;

pub type PayloadBits = BitVec<u8, Msb0>;

/// Maximum payload characters per AIVDM fragment.
const FRAGMENT_CHARS: usize = 60;

/// Append `width` bits of an unsigned value, MSB first.
pub fn push_uint(bits: &mut PayloadBits, value: u64, width: usize) {
    for i in (0..width).rev() {
        bits.push((value >> i) & 1 == 1);
    }
}

/// Append `width` bits of a signed value in two's complement.
pub fn push_int(bits: &mut PayloadBits, value: i64, width: usize) {
    let mask = if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    };
    push_uint(bits, (value as u64) & mask, width);
}

/// Append a string in 6-bit AIS encoding, padded with `@` to `chars`.
///
/// `@`–`_` map to 0–31, space–`?` keep their ASCII code (32–63), anything
/// else becomes `@`.
pub fn push_text(bits: &mut PayloadBits, text: &str, chars: usize) {
    for i in 0..chars {
        let code = match text.as_bytes().get(i).copied() {
            Some(b @ b'@'..=b'_') => (b - b'@') as u64,
            Some(b @ b' '..=b'?') => b as u64,
            _ => 0,
        };
        push_uint(bits, code, 6);
    }
}

/// Pack the bitstream into 6-bit groups and armor them into the AIVDM
/// character set. Returns the payload string and the number of zero bits
/// appended to fill the final group.
pub fn armor(bits: &PayloadBits) -> (String, u32) {
    let mut payload = String::with_capacity(bits.len() / 6 + 1);
    let mut index = 0;
    while index < bits.len() {
        let mut value: u8 = 0;
        for offset in 0..6 {
            value <<= 1;
            if bits.get(index + offset).map(|b| *b).unwrap_or(false) {
                value |= 1;
            }
        }
        let mut ch = value + 48;
        if ch > 87 {
            ch += 8;
        }
        payload.push(ch as char);
        index += 6;
    }
    let fill = (6 - bits.len() % 6) % 6;
    (payload, fill as u32)
}

/// Inverse of [`armor`]: recover the bitstream (fill bits included) from an
/// AIVDM payload string.
pub fn dearmor(payload: &str) -> PayloadBits {
    let mut bits = PayloadBits::with_capacity(payload.len() * 6);
    for ch in payload.bytes() {
        let mut value = ch.wrapping_sub(48);
        if value > 40 {
            value -= 8;
        }
        push_uint(&mut bits, value as u64, 6);
    }
    bits
}

/// Render a bitstream as one or more AIVDM lines, joined with CRLF.
///
/// The sequence id is shared by every fragment of the message; the fill-bit
/// field is zero on all fragments except possibly the last.
pub fn aivdm_lines(bits: &PayloadBits, sequence_id: u8) -> String {
    let (payload, fill) = armor(bits);
    let fragments: Vec<&str> = payload
        .as_bytes()
        .chunks(FRAGMENT_CHARS)
        // Armored payload is pure ASCII, chunk boundaries are char boundaries.
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or(""))
        .collect();
    let total = fragments.len().max(1);

    let mut lines = Vec::with_capacity(total);
    for (index, fragment) in fragments.iter().enumerate() {
        let fill_field = if index + 1 == total { fill } else { 0 };
        let content = format!(
            "AIVDM,{},{},{},A,{},{}",
            total,
            index + 1,
            sequence_id,
            fragment,
            fill_field,
        );
        lines.push(seal_encapsulated(&content));
    }
    lines.join("\r\n")
}

/// Message 1 (position report), 168 bits.
pub fn position_report(
    mmsi: u32,
    sog_knots: f64,
    longitude: f64,
    latitude: f64,
    cog: f64,
    heading: f64,
) -> PayloadBits {
    let mut bits = PayloadBits::with_capacity(168);
    push_uint(&mut bits, 1, 6); // message type
    push_uint(&mut bits, 0, 2); // repeat indicator
    push_uint(&mut bits, mmsi as u64, 30);
    push_uint(&mut bits, 0, 4); // nav status: under way using engine
    push_uint(&mut bits, 0, 8); // rate of turn
    push_uint(&mut bits, (sog_knots * 10.0) as u64, 10);
    push_uint(&mut bits, 1, 1); // position accuracy
    push_int(&mut bits, (longitude * 600_000.0) as i64, 28);
    push_int(&mut bits, (latitude * 600_000.0) as i64, 27);
    push_uint(&mut bits, (cog * 10.0) as u64, 12);
    push_uint(&mut bits, heading as u64, 9);
    push_uint(&mut bits, 60, 6); // timestamp: unavailable
    push_uint(&mut bits, 0, 2); // maneuver indicator
    push_uint(&mut bits, 0, 3); // spare
    push_uint(&mut bits, 0, 1); // RAIM
    push_uint(&mut bits, 0, 19); // radio status
    bits
}

/// Message 5 (static and voyage data), 424 bits.
pub fn static_report(
    mmsi: u32,
    callsign: &str,
    name: &str,
    ship_type: u8,
    length: u16,
    width: u16,
) -> PayloadBits {
    let mut bits = PayloadBits::with_capacity(424);
    push_uint(&mut bits, 5, 6); // message type
    push_uint(&mut bits, 0, 2); // repeat indicator
    push_uint(&mut bits, mmsi as u64, 30);
    push_uint(&mut bits, 0, 2); // AIS version
    push_uint(&mut bits, mmsi as u64, 30); // IMO number, mirrored from MMSI
    push_text(&mut bits, callsign, 7);
    push_text(&mut bits, name, 20);
    push_uint(&mut bits, ship_type as u64, 8);
    push_uint(&mut bits, length as u64, 9); // dimension to bow
    push_uint(&mut bits, width as u64, 9); // dimension to stern
    push_uint(&mut bits, 0, 6); // dimension to port
    push_uint(&mut bits, 0, 6); // dimension to starboard
    push_uint(&mut bits, 1, 4); // EPFD: GPS
    push_uint(&mut bits, 0, 4); // ETA month
    push_uint(&mut bits, 0, 5); // ETA day
    push_uint(&mut bits, 0, 5); // ETA hour
    push_uint(&mut bits, 0, 6); // ETA minute
    push_uint(&mut bits, 0, 8); // draught
    push_text(&mut bits, "DEST", 20);
    push_uint(&mut bits, 0, 1); // DTE
    push_uint(&mut bits, 0, 1); // spare
    bits
}

/// Read an unsigned field back out of a bitstream (test and diagnostic use).
pub fn pick_uint(bits: &PayloadBits, index: usize, width: usize) -> u64 {
    let mut value = 0;
    for pos in index..index + width {
        value <<= 1;
        if bits.get(pos).map(|b| *b).unwrap_or(false) {
            value |= 1;
        }
    }
    value
}

/// Read a two's-complement field back out of a bitstream.
pub fn pick_int(bits: &PayloadBits, index: usize, width: usize) -> i64 {
    let raw = pick_uint(bits, index, width);
    let sign = 1u64 << (width - 1);
    if raw & sign != 0 {
        (raw & (sign - 1)) as i64 - sign as i64
    } else {
        raw as i64
    }
}
