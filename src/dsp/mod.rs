//! Voice DSP kernels
//!
//! Every stage of the per-voice pipeline implements `VoiceKernel` and owns its
//! own state and noise source. Kernels never share mutable state; all
//! coordination flows through the parameters the orchestrator hands them.

pub mod biquad;
pub mod breathiness;
pub mod corporeal;
pub mod envelope;
pub mod formant;
pub mod glottal;
pub mod kernel;
pub mod noise;
pub mod pitch;
pub mod roughness;
pub mod smoother;
pub mod subharmonic;

pub use biquad::{Biquad, FilterKind, OnePole};
pub use breathiness::Breathiness;
pub use corporeal::{CorporealNoise, CorporealProfile};
pub use envelope::EnvelopeFollower;
pub use formant::FormantBank;
pub use glottal::GlottalIncoherence;
pub use kernel::VoiceKernel;
pub use noise::{derive_kernel_seed, NoiseSource, SeededNoise};
pub use pitch::PitchStabilizer;
pub use roughness::Roughness;
pub use smoother::ParameterSmoother;
pub use subharmonic::SubharmonicGenerator;
