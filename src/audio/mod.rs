//! Audio conversion and analysis.

pub mod codec;
pub mod vad;

pub use codec::{
    carrier_to_pipeline, decode_mulaw, encode_mulaw, pcm16_to_samples, pipeline_to_carrier,
    samples_to_pcm16,
};
pub use vad::{Vad, VadConfig, VadEvent};
