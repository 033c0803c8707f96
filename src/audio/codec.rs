//! Telephony audio codec conversion.
//!
//! Converts between the carrier's 8 kHz G.711 mu-law encoding and the
//! pipeline's 16 kHz 16-bit little-endian linear PCM. Resampling is a 1:2
//! ratio in both directions, so the conversions are simple interpolation
//! (upsample) and pair averaging (downsample).

use crate::error::{BridgeError, Result};

const BIAS: i32 = 0x84;
const CLIP: i32 = 32_635;

/// Encodes one linear-PCM sample as a G.711 mu-law byte.
pub fn encode_mulaw_sample(sample: i16) -> u8 {
    let mut pcm = sample as i32;
    let sign: u8 = if pcm < 0 {
        pcm = -pcm;
        0x80
    } else {
        0x00
    };
    if pcm > CLIP {
        pcm = CLIP;
    }
    pcm += BIAS;

    let mut exponent: u32 = 7;
    let mut mask = 0x4000;
    while exponent > 0 && (pcm & mask) == 0 {
        exponent -= 1;
        mask >>= 1;
    }
    let mantissa = ((pcm >> (exponent + 3)) & 0x0F) as u8;

    !(sign | ((exponent as u8) << 4) | mantissa)
}

/// Decodes one G.711 mu-law byte to a linear-PCM sample.
pub fn decode_mulaw_sample(byte: u8) -> i16 {
    let byte = !byte;
    let sign = byte & 0x80;
    let exponent = (byte >> 4) & 0x07;
    let mantissa = byte & 0x0F;

    let mut sample = (((mantissa as i32) << 3) + BIAS) << exponent;
    sample -= BIAS;

    if sign != 0 { -sample as i16 } else { sample as i16 }
}

/// Decodes a mu-law byte sequence to linear-PCM samples.
pub fn decode_mulaw(bytes: &[u8]) -> Vec<i16> {
    bytes.iter().map(|&b| decode_mulaw_sample(b)).collect()
}

/// Encodes linear-PCM samples as a mu-law byte sequence.
pub fn encode_mulaw(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&s| encode_mulaw_sample(s)).collect()
}

/// Converts 16-bit little-endian PCM bytes to samples.
///
/// A trailing odd byte is ignored; callers that must not lose it carry it
/// over themselves (see the speech chunker).
pub fn pcm16_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Converts samples to 16-bit little-endian PCM bytes.
pub fn samples_to_pcm16(samples: &[i16]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|&s| s.to_le_bytes())
        .collect()
}

/// Doubles the sample rate by linear interpolation between neighbours.
fn upsample_2x(samples: &[i16]) -> Vec<i16> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for (i, &sample) in samples.iter().enumerate() {
        out.push(sample);
        let next = samples.get(i + 1).copied().unwrap_or(sample);
        out.push(((sample as i32 + next as i32) / 2) as i16);
    }
    out
}

/// Halves the sample rate by averaging adjacent sample pairs.
fn downsample_2x(samples: &[i16]) -> Vec<i16> {
    samples
        .chunks(2)
        .map(|pair| {
            let sum: i32 = pair.iter().map(|&s| s as i32).sum();
            (sum / pair.len() as i32) as i16
        })
        .collect()
}

/// Converts carrier media audio (8 kHz mu-law) to pipeline PCM bytes
/// (16 kHz 16-bit little-endian).
pub fn carrier_to_pipeline(mulaw: &[u8]) -> Vec<u8> {
    let pcm_8k = decode_mulaw(mulaw);
    let pcm_16k = upsample_2x(&pcm_8k);
    samples_to_pcm16(&pcm_16k)
}

/// Converts pipeline PCM bytes (16 kHz 16-bit little-endian) to carrier
/// media audio (8 kHz mu-law).
///
/// Fails on an odd byte count; the caller logs and drops the chunk.
pub fn pipeline_to_carrier(pcm: &[u8]) -> Result<Vec<u8>> {
    if pcm.len() % 2 != 0 {
        return Err(BridgeError::Codec {
            message: format!("odd PCM byte count: {}", pcm.len()),
        });
    }
    let pcm_16k = pcm16_to_samples(pcm);
    let pcm_8k = downsample_2x(&pcm_16k);
    Ok(encode_mulaw(&pcm_8k))
}
