//! Aberrant - Real-time Vocal Aberration Pipeline
//!
//! Transforms clean anchor speech into monstrous archetype voices (vampire,
//! zombie, werewolf, wraith) with a fixed chain of DSP kernels driven by a
//! single, always-valid parameter record.
//!
//! # Architecture
//!
//! Leaf first:
//! - `params`: clamped parameter newtypes, archetype presets, emotion modulation
//! - `engine`: `AudioBuffer` and WAV I/O (setup time only)
//! - `dsp`: smoother, filter primitives and the seven voice kernels
//! - `voice`: `MidLodKernel` orchestration and the lock-free parameter handoff
//!
//! Everything reachable from `MidLodKernel::process` is allocation-free and
//! infallible. Only file I/O, configuration and buffer construction return
//! errors.

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod params;
pub mod voice;

pub use config::VoiceConfig;
pub use engine::AudioBuffer;
pub use error::{AberrantError, Result};
pub use params::{AberrationParams, Archetype, Emotion, EmotionState};
pub use voice::{LiveVoice, MidLodKernel};
