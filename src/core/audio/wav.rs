//! # WAV Parsing & Assembly
//!
//! Hand-rolled RIFF handling for merging synthesized audio chunks into one
//! continuous container. Chunks must agree on PCM parameters; a
//! mixed-parameter merge would be silently corrupt, so it is rejected rather
//! than coerced. Compressed or unrecognized inputs merge by plain
//! concatenation as a best-effort, since re-encoding is out of scope.

use tracing::warn;

use crate::errors::{MediaError, MediaResult};

/// PCM container parameters carried by a parsed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavParams {
    pub channels: u16,
    pub bits_per_sample: u16,
    pub sample_rate: u32,
}

impl WavParams {
    fn block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / 8)
    }

    fn byte_rate(&self) -> u32 {
        self.sample_rate * u32::from(self.block_align())
    }
}

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes([*bytes.get(at)?, *bytes.get(at + 1)?]))
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_le_bytes([
        *bytes.get(at)?,
        *bytes.get(at + 1)?,
        *bytes.get(at + 2)?,
        *bytes.get(at + 3)?,
    ]))
}

/// Walks the RIFF chunk list and extracts the PCM parameters and the data
/// payload. Returns `None` for anything that is not a parseable PCM WAV.
pub fn parse_wav(bytes: &[u8]) -> Option<(WavParams, &[u8])> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return None;
    }

    let mut params: Option<WavParams> = None;
    let mut data: Option<&[u8]> = None;
    let mut offset = 12usize;

    while offset + 8 <= bytes.len() {
        let chunk_id = &bytes[offset..offset + 4];
        let chunk_size = read_u32(bytes, offset + 4)? as usize;
        let body_start = offset + 8;
        let body_end = body_start.checked_add(chunk_size)?;
        if body_end > bytes.len() {
            // Tolerate a truncated final data chunk; some encoders stream
            // the payload without fixing up the declared size.
            if chunk_id == b"data" && data.is_none() {
                data = Some(&bytes[body_start..]);
            }
            break;
        }

        match chunk_id {
            b"fmt " => {
                if chunk_size < 16 {
                    return None;
                }
                let audio_format = read_u16(bytes, body_start)?;
                if audio_format != 1 {
                    // not PCM
                    return None;
                }
                params = Some(WavParams {
                    channels: read_u16(bytes, body_start + 2)?,
                    sample_rate: read_u32(bytes, body_start + 4)?,
                    bits_per_sample: read_u16(bytes, body_start + 14)?,
                });
            }
            b"data" => {
                data = Some(&bytes[body_start..body_end]);
            }
            _ => {}
        }

        // chunk bodies are word-aligned
        offset = body_end + (chunk_size & 1);
    }

    Some((params?, data?))
}

/// Serializes PCM data under a canonical 44-byte RIFF header.
pub fn write_wav(params: WavParams, data: &[u8]) -> Vec<u8> {
    let data_len = data.len() as u32;
    let mut out = Vec::with_capacity(44 + data.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&params.channels.to_le_bytes());
    out.extend_from_slice(&params.sample_rate.to_le_bytes());
    out.extend_from_slice(&params.byte_rate().to_le_bytes());
    out.extend_from_slice(&params.block_align().to_le_bytes());
    out.extend_from_slice(&params.bits_per_sample.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(data);
    out
}

/// Merges ordered audio chunks into one buffer.
///
/// PCM WAV inputs are parsed, checked for identical parameters, and
/// rewritten under a single header whose frame count is the sum of the
/// inputs. If the summed payload would overflow the RIFF 32-bit size field,
/// the merge degrades to raw frame concatenation with a warning instead of
/// failing outright. Inputs that do not parse as PCM WAV merge by plain
/// byte concatenation with a warning.
pub fn merge_chunks(chunks: &[Vec<u8>]) -> MediaResult<Vec<u8>> {
    if chunks.is_empty() {
        return Err(MediaError::InvalidInput(
            "cannot merge an empty chunk list".to_string(),
        ));
    }

    let mut parsed: Vec<(WavParams, &[u8])> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        match parse_wav(chunk) {
            Some(entry) => parsed.push(entry),
            None => {
                warn!(
                    chunks = chunks.len(),
                    "non-PCM chunk in merge input, falling back to plain concatenation"
                );
                return Ok(chunks.concat());
            }
        }
    }

    let (first_params, _) = parsed[0];
    for (index, (params, _)) in parsed.iter().enumerate().skip(1) {
        if *params != first_params {
            return Err(MediaError::Consistency(format!(
                "chunk {index} has {params:?}, first chunk has {first_params:?}"
            )));
        }
    }

    let total: u64 = parsed.iter().map(|(_, data)| data.len() as u64).sum();
    if total + 36 > u64::from(u32::MAX) {
        warn!(
            total_bytes = total,
            "merged payload exceeds the RIFF size field, concatenating raw frames"
        );
        let mut out = Vec::new();
        for (_, data) in &parsed {
            out.extend_from_slice(data);
        }
        return Ok(out);
    }

    let mut data = Vec::with_capacity(total as usize);
    for (_, frames) in &parsed {
        data.extend_from_slice(frames);
    }
    Ok(write_wav(first_params, &data))
}
