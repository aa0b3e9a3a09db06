//! Minimal JPEG marker walking for tagged comment (COM) segments.
//!
//! Only the header is inspected: segments are walked from SOI up to the
//! start-of-scan marker. Entropy-coded data is copied through untouched.

use crate::error::{CaptureError, Result};

const MARKER: u8 = 0xFF;
const SOI: u8 = 0xD8;
const SOS: u8 = 0xDA;
const EOI: u8 = 0xD9;
const COM: u8 = 0xFE;
const APP0: u8 = 0xE0;
const APP15: u8 = 0xEF;

/// Largest payload a single segment can carry (length field counts itself).
pub const MAX_SEGMENT_PAYLOAD: usize = u16::MAX as usize - 2;

#[derive(Debug, Clone, Copy)]
struct Segment {
    marker: u8,
    /// Offset of the 0xFF byte.
    start: usize,
    /// Offset one past the segment's last byte.
    end: usize,
}

impl Segment {
    fn payload<'a>(&self, jpeg: &'a [u8]) -> &'a [u8] {
        &jpeg[self.start + 4..self.end]
    }
}

fn invalid(reason: &str) -> CaptureError {
    CaptureError::Metadata(format!("not a valid JPEG: {reason}"))
}

/// Header segments between SOI and SOS, in file order.
fn header_segments(jpeg: &[u8]) -> Result<Vec<Segment>> {
    if jpeg.len() < 4 || jpeg[0] != MARKER || jpeg[1] != SOI {
        return Err(invalid("missing SOI marker"));
    }

    let mut segments = Vec::new();
    let mut pos = 2;
    loop {
        if pos >= jpeg.len() || jpeg[pos] != MARKER {
            return Err(invalid("expected a marker"));
        }
        let start = pos;
        // Markers may be preceded by any number of fill bytes.
        while pos < jpeg.len() && jpeg[pos] == MARKER {
            pos += 1;
        }
        let Some(&marker) = jpeg.get(pos) else {
            return Err(invalid("truncated marker"));
        };
        pos += 1;

        if marker == SOS || marker == EOI {
            segments.push(Segment {
                marker,
                start,
                end: start,
            });
            return Ok(segments);
        }

        let Some(len_bytes) = jpeg.get(pos..pos + 2) else {
            return Err(invalid("truncated segment length"));
        };
        let len = usize::from(u16::from_be_bytes([len_bytes[0], len_bytes[1]]));
        if len < 2 || pos + len > jpeg.len() {
            return Err(invalid("segment overruns file"));
        }
        let end = pos + len;
        // Normalise fill bytes away so payload offsets stay fixed.
        segments.push(Segment {
            marker,
            start: pos - 2,
            end,
        });
        pos = end;
    }
}

fn tagged_payload<'a>(segment: &Segment, jpeg: &'a [u8], tag: &[u8]) -> Option<&'a [u8]> {
    if segment.marker != COM {
        return None;
    }
    segment
        .payload(jpeg)
        .strip_prefix(tag)
        .and_then(|rest| rest.strip_prefix(b"\0"))
}

/// Find the body of the first COM segment tagged `tag`.
pub fn find_comment(jpeg: &[u8], tag: &str) -> Result<Option<Vec<u8>>> {
    let segments = header_segments(jpeg)?;
    Ok(segments
        .iter()
        .find_map(|s| tagged_payload(s, jpeg, tag.as_bytes()))
        .map(<[u8]>::to_vec))
}

/// Return a copy of `jpeg` with a COM segment `tag\0body` inserted after the
/// leading APPn segments.
///
/// # Errors
///
/// Fails if the input is not a JPEG, already carries a segment with this tag,
/// or the payload does not fit in one segment.
pub fn insert_comment(jpeg: &[u8], tag: &str, body: &[u8]) -> Result<Vec<u8>> {
    let segments = header_segments(jpeg)?;
    if segments
        .iter()
        .any(|s| tagged_payload(s, jpeg, tag.as_bytes()).is_some())
    {
        return Err(CaptureError::Metadata(format!(
            "image already carries a {tag} segment"
        )));
    }

    let payload_len = tag.len() + 1 + body.len();
    if payload_len > MAX_SEGMENT_PAYLOAD {
        return Err(CaptureError::Metadata(format!(
            "record is {payload_len} bytes, segment limit is {MAX_SEGMENT_PAYLOAD}"
        )));
    }

    let insert_at = segments
        .iter()
        .take_while(|s| (APP0..=APP15).contains(&s.marker))
        .last()
        .map_or(2, |s| s.end);

    let length = u16::try_from(payload_len + 2)
        .map_err(|_| CaptureError::Metadata("segment length overflow".to_string()))?;

    let mut out = Vec::with_capacity(jpeg.len() + payload_len + 4);
    out.extend_from_slice(&jpeg[..insert_at]);
    out.extend_from_slice(&[MARKER, COM]);
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(tag.as_bytes());
    out.push(0);
    out.extend_from_slice(body);
    out.extend_from_slice(&jpeg[insert_at..]);
    Ok(out)
}
