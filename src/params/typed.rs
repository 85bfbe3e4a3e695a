//! Physically clamped parameter types
//!
//! Every aberration control is its own newtype so a breathiness value can
//! never be passed where a formant shift is expected. Construction never
//! fails: values are clamped into range, and NaN falls back to the
//! parameter's default. Parameters are driven by continuous modulation
//! (distance, health, emotion) on the way to the audio thread, so there is no
//! error path to handle.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! clamped_param {
    (
        $(#[$meta:meta])*
        $name:ident, min = $min:expr, max = $max:expr, default = $default:expr, unit = $unit:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
        #[serde(from = "f32", into = "f32")]
        pub struct $name(f32);

        impl $name {
            /// Lower bound of the valid range
            pub const MIN: f32 = $min;
            /// Upper bound of the valid range
            pub const MAX: f32 = $max;
            /// Clean-human baseline value
            pub const DEFAULT: f32 = $default;
            /// Display unit used by `describe()`
            pub const UNIT: &'static str = $unit;

            /// Create a value, clamping into range
            #[inline]
            pub fn new(value: f32) -> Self {
                if value.is_nan() {
                    Self(Self::DEFAULT)
                } else {
                    Self(value.clamp(Self::MIN, Self::MAX))
                }
            }

            #[inline]
            pub fn get(self) -> f32 {
                self.0
            }

            /// Replace the value, clamping into range
            #[inline]
            pub fn set(&mut self, value: f32) {
                *self = Self::new(value);
            }

            /// Position of the value within its range, 0 at `MIN` and 1 at `MAX`
            #[inline]
            pub fn normalized(self) -> f32 {
                (self.0 - Self::MIN) / (Self::MAX - Self::MIN)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self(Self::DEFAULT)
            }
        }

        impl From<f32> for $name {
            fn from(value: f32) -> Self {
                Self::new(value)
            }
        }

        impl From<$name> for f32 {
            fn from(value: $name) -> f32 {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if Self::UNIT.is_empty() {
                    write!(f, "{:.3}", self.0)
                } else {
                    write!(f, "{:.3} {}", self.0, Self::UNIT)
                }
            }
        }
    };
}

clamped_param!(
    /// Additive formant shift in Hz
    FormantShift, min = -500.0, max = 500.0, default = 0.0, unit = "Hz"
);

clamped_param!(
    /// Multiplicative formant frequency scale (vocal tract length)
    FormantScale, min = 0.5, max = 2.0, default = 1.0, unit = "x"
);

clamped_param!(
    /// Aspiration noise relative to voicing
    Breathiness, min = 0.0, max = 1.0, default = 0.0, unit = ""
);

clamped_param!(
    /// Harsh, rasping voice quality
    Roughness, min = 0.0, max = 1.0, default = 0.0, unit = ""
);

clamped_param!(
    /// Hollow resonance. Also drives the pitch-stillness stage, see
    /// `AberrationParams::pitch_stillness`.
    HollowResonance, min = 0.0, max = 1.0, default = 0.0, unit = ""
);

clamped_param!(
    /// Amount of wet body sounds layered onto the voice
    WetSounds, min = 0.0, max = 1.0, default = 0.0, unit = ""
);

clamped_param!(
    /// Glottal incoherence: jitter, shimmer and pulse dropouts
    VocalFoldIrregularity, min = 0.0, max = 1.0, default = 0.0, unit = ""
);

clamped_param!(
    /// Formant bandwidth multiplier
    BandwidthExpansion, min = 0.5, max = 3.0, default = 1.0, unit = "x"
);

clamped_param!(
    /// Subharmonic growl undertone
    GrowlHarmonics, min = 0.0, max = 1.0, default = 0.0, unit = ""
);

clamped_param!(
    /// Unvoiced whisper replacing voicing
    WhisperAmount, min = 0.0, max = 1.0, default = 0.0, unit = ""
);

clamped_param!(
    /// Vocal fold tension
    Tension, min = 0.0, max = 1.0, default = 0.0, unit = ""
);

clamped_param!(
    /// Lung pressure relative to a relaxed speaker
    SubglottalPressure, min = 0.5, max = 2.0, default = 1.0, unit = "x"
);
