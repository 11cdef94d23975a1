//! WebM duration repair.
//!
//! Fragments concatenated straight off an interval-driven encoder produce a
//! Segment whose Info element carries no Duration, so players report an
//! unknown length and cannot seek. This module walks just enough EBML to
//! patch (or insert) the Duration element in place, using the measured
//! wall-clock recording time.

use std::time::Duration;

use crate::error::{GenStreamError, Result};

const ID_EBML: u64 = 0x1A45_DFA3;
const ID_SEGMENT: u64 = 0x1853_8067;
const ID_INFO: u64 = 0x1549_A966;
const ID_TIMECODE_SCALE: u64 = 0x2A_D7B1;
const ID_DURATION: u64 = 0x4489;
const ID_CLUSTER: u64 = 0x1F43_B675;

/// Nanoseconds per timecode tick when the Info element does not say otherwise.
const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;

/// Patch the Segment Info so the container reports `duration`.
///
/// Rewrites an existing Duration element in place, or inserts one at the end
/// of the Info payload (adjusting the Info and Segment declared sizes). The
/// caller treats failure as non-fatal; nothing before the Info element is
/// modified on error.
pub fn repair_duration(data: &mut Vec<u8>, duration: Duration) -> Result<()> {
    let layout = scan(data)?;

    let ticks = duration.as_nanos() as f64 / layout.timecode_scale as f64;

    if let Some((offset, len)) = layout.duration_payload {
        match len {
            4 => data[offset..offset + 4].copy_from_slice(&(ticks as f32).to_be_bytes()),
            8 => data[offset..offset + 8].copy_from_slice(&ticks.to_be_bytes()),
            other => {
                return Err(GenStreamError::internal(format!(
                    "Unexpected Duration payload width: {} bytes",
                    other
                )))
            }
        }
        return Ok(());
    }

    // No Duration element: build one (id + one-byte size + f64) and splice it
    // in at the end of the Info payload.
    let mut element = Vec::with_capacity(11);
    element.extend_from_slice(&[0x44, 0x89, 0x88]);
    element.extend_from_slice(&ticks.to_be_bytes());
    let grown = element.len() as u64;

    // Both declared sizes must still fit their existing field widths before
    // anything is mutated
    let new_info_len = layout.info_payload_len + grown;
    if !vint_fits(new_info_len, layout.info_size_width) {
        return Err(GenStreamError::internal("Info size field cannot grow"));
    }
    if let Some((_, width, declared)) = layout.segment_size {
        if !vint_fits(declared + grown, width) {
            return Err(GenStreamError::internal("Segment size field cannot grow"));
        }
    }

    rewrite_size(
        data,
        layout.info_size_offset,
        layout.info_size_width,
        new_info_len,
    );
    if let Some((offset, width, declared)) = layout.segment_size {
        rewrite_size(data, offset, width, declared + grown);
    }

    let insert_at = layout.info_payload_offset + layout.info_payload_len as usize;
    data.splice(insert_at..insert_at, element);
    Ok(())
}

/// Read back the container duration in milliseconds, if one is declared.
pub fn read_duration_ms(data: &[u8]) -> Option<f64> {
    let layout = scan(data).ok()?;
    let (offset, len) = layout.duration_payload?;
    let ticks = match len {
        4 => f32::from_be_bytes(data[offset..offset + 4].try_into().ok()?) as f64,
        8 => f64::from_be_bytes(data[offset..offset + 8].try_into().ok()?),
        _ => return None,
    };
    Some(ticks * layout.timecode_scale as f64 / 1_000_000.0)
}

struct Layout {
    /// Offset/width of the Segment size field, plus its declared value,
    /// when the Segment size is known (streamed captures leave it unknown).
    segment_size: Option<(usize, usize, u64)>,
    info_size_offset: usize,
    info_size_width: usize,
    info_payload_offset: usize,
    info_payload_len: u64,
    timecode_scale: u64,
    /// Offset/length of an existing Duration payload within Info.
    duration_payload: Option<(usize, usize)>,
}

fn scan(data: &[u8]) -> Result<Layout> {
    let mut pos = 0usize;

    let (id, _) = read_id(data, &mut pos)?;
    if id != ID_EBML {
        return Err(GenStreamError::internal("Not an EBML stream"));
    }
    let header_size = read_size(data, &mut pos)?
        .ok_or_else(|| GenStreamError::internal("EBML header with unknown size"))?;
    pos = pos
        .checked_add(header_size as usize)
        .filter(|p| *p <= data.len())
        .ok_or_else(|| GenStreamError::internal("Truncated EBML header"))?;

    let (id, _) = read_id(data, &mut pos)?;
    if id != ID_SEGMENT {
        return Err(GenStreamError::internal("No Segment element"));
    }
    let segment_size_offset = pos;
    let first = *data
        .get(pos)
        .ok_or_else(|| GenStreamError::internal("Truncated Segment size"))?;
    let segment_size_width = vint_width(first)?;
    let segment_size = read_size(data, &mut pos)?;
    let segment_end = match segment_size {
        Some(s) => (pos + s as usize).min(data.len()),
        None => data.len(),
    };

    // Walk Segment children until Info; Clusters only appear after Info in
    // well-formed captures, so hitting one means Info is missing.
    while pos < segment_end {
        let (id, _) = read_id(data, &mut pos)?;
        let size_offset = pos;
        let first = *data
            .get(pos)
            .ok_or_else(|| GenStreamError::internal("Truncated element size"))?;
        let size_width = vint_width(first)?;
        let size = read_size(data, &mut pos)?;

        if id == ID_INFO {
            let payload_len = size
                .ok_or_else(|| GenStreamError::internal("Info element with unknown size"))?;
            let payload_offset = pos;
            if payload_offset + payload_len as usize > data.len() {
                return Err(GenStreamError::internal("Truncated Info element"));
            }
            let (timecode_scale, duration_payload) =
                scan_info(data, payload_offset, payload_len as usize)?;
            return Ok(Layout {
                segment_size: segment_size.map(|s| (segment_size_offset, segment_size_width, s)),
                info_size_offset: size_offset,
                info_size_width: size_width,
                info_payload_offset: payload_offset,
                info_payload_len: payload_len,
                timecode_scale,
                duration_payload,
            });
        }
        if id == ID_CLUSTER {
            break;
        }
        let skip = size.ok_or_else(|| {
            GenStreamError::internal("Cannot skip element with unknown size")
        })?;
        pos = pos
            .checked_add(skip as usize)
            .filter(|p| *p <= data.len())
            .ok_or_else(|| GenStreamError::internal("Truncated element"))?;
    }

    Err(GenStreamError::internal("No Info element before first Cluster"))
}

fn scan_info(
    data: &[u8],
    payload_offset: usize,
    payload_len: usize,
) -> Result<(u64, Option<(usize, usize)>)> {
    let end = payload_offset + payload_len;
    let mut pos = payload_offset;
    let mut timecode_scale = DEFAULT_TIMECODE_SCALE;
    let mut duration_payload = None;

    while pos < end {
        let (id, _) = read_id(data, &mut pos)?;
        let size = read_size(data, &mut pos)?
            .ok_or_else(|| GenStreamError::internal("Info child with unknown size"))?
            as usize;
        if pos + size > end {
            return Err(GenStreamError::internal("Truncated Info child"));
        }
        match id {
            ID_TIMECODE_SCALE => {
                let mut value = 0u64;
                for &b in &data[pos..pos + size] {
                    value = (value << 8) | b as u64;
                }
                if value > 0 {
                    timecode_scale = value;
                }
            }
            ID_DURATION => duration_payload = Some((pos, size)),
            _ => {}
        }
        pos += size;
    }

    Ok((timecode_scale, duration_payload))
}

/// Number of bytes in a vint whose first byte is `first`.
fn vint_width(first: u8) -> Result<usize> {
    if first == 0 {
        return Err(GenStreamError::internal("Invalid EBML vint"));
    }
    Ok(first.leading_zeros() as usize + 1)
}

/// Read an element ID, marker bits retained.
fn read_id(data: &[u8], pos: &mut usize) -> Result<(u64, usize)> {
    let first = *data
        .get(*pos)
        .ok_or_else(|| GenStreamError::internal("Truncated element ID"))?;
    let width = vint_width(first)?;
    if width > 4 || *pos + width > data.len() {
        return Err(GenStreamError::internal("Invalid element ID"));
    }
    let mut id = 0u64;
    for &b in &data[*pos..*pos + width] {
        id = (id << 8) | b as u64;
    }
    *pos += width;
    Ok((id, width))
}

/// Read an element size, `None` meaning "unknown size".
fn read_size(data: &[u8], pos: &mut usize) -> Result<Option<u64>> {
    let first = *data
        .get(*pos)
        .ok_or_else(|| GenStreamError::internal("Truncated element size"))?;
    let width = vint_width(first)?;
    if width > 8 || *pos + width > data.len() {
        return Err(GenStreamError::internal("Invalid element size"));
    }
    let mut value = first as u64 & ((1u64 << (8 - width)) - 1);
    for &b in &data[*pos + 1..*pos + width] {
        value = (value << 8) | b as u64;
    }
    *pos += width;
    // All value bits set means unknown size
    if value == (1u64 << (7 * width)) - 1 {
        return Ok(None);
    }
    Ok(Some(value))
}

/// Whether `value` is encodable in a `width`-byte vint. The all-ones
/// encoding is reserved for "unknown", hence the -2.
fn vint_fits(value: u64, width: usize) -> bool {
    value <= (1u64 << (7 * width)) - 2
}

/// Re-encode a declared size in place, keeping the field width. The caller
/// has already checked `vint_fits`.
fn rewrite_size(data: &mut [u8], offset: usize, width: usize, value: u64) {
    for i in 0..width {
        data[offset + i] = (value >> (8 * (width - 1 - i))) as u8;
    }
    data[offset] |= 1 << (8 - width);
}
