//! Audio Engine Module
//!
//! Buffer and file I/O layer shared by every DSP stage:
//! - Audio buffer management
//! - WAV load/save

pub mod buffer;
pub mod io;

pub use buffer::{db_to_linear, linear_to_db, AudioBuffer, MAX_CHANNELS, SILENCE_THRESHOLD};
pub use io::{load_wav, save_wav_pcm16};
