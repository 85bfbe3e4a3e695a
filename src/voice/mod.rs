//! Per-voice orchestration
//!
//! `MidLodKernel` runs the full seven-stage pipeline for one voice.
//! `handoff` moves parameter updates from a control thread onto the audio
//! thread without locks.

pub mod handoff;
pub mod mid_lod;

pub use handoff::{param_channel, LiveVoice, ParamReceiver, ParamSender, DEFAULT_HANDOFF_CAPACITY};
pub use mid_lod::{Listener, MidLodKernel, StagePosition};
