//! Mid level-of-detail voice kernel
//!
//! Owns one instance of every DSP kernel and runs them in a fixed order over
//! each block:
//! 1. Formant filtering (later stages see the resonance-shaped signal)
//! 2. Breathiness
//! 3. Roughness
//! 4. Glottal incoherence
//! 5. Subharmonics
//! 6. Pitch stabilization
//! 7. Corporeal noise (additive, always last so body sounds are not colored
//!    by the vocal tract filters)
//!
//! Parameters arrive as a whole `AberrationParams` record per block. They are
//! smoothed at block rate and mapped onto the kernels with plain conditional
//! logic keyed on the derived archetype.

use log::debug;
use serde_json::{json, Map, Value};

use crate::config::{KernelTuning, VoiceConfig, DEFAULT_BLOCK_SIZE, DEFAULT_SMOOTHING_MS};
use crate::dsp::{
    derive_kernel_seed, Breathiness, CorporealNoise, CorporealProfile, FormantBank,
    GlottalIncoherence, ParameterSmoother, PitchStabilizer, Roughness, SeededNoise,
    SubharmonicGenerator, VoiceKernel,
};
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::params::{AberrationParams, Archetype};

// ============================================================================
// Stage Order
// ============================================================================

/// Pipeline stages in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StagePosition {
    Formant = 0,
    Breathiness = 1,
    Roughness = 2,
    Glottal = 3,
    Subharmonic = 4,
    Pitch = 5,
    Corporeal = 6,
}

impl StagePosition {
    /// Every stage, in the order it runs
    pub const ORDER: [StagePosition; 7] = [
        StagePosition::Formant,
        StagePosition::Breathiness,
        StagePosition::Roughness,
        StagePosition::Glottal,
        StagePosition::Subharmonic,
        StagePosition::Pitch,
        StagePosition::Corporeal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StagePosition::Formant => "formant",
            StagePosition::Breathiness => "breathiness",
            StagePosition::Roughness => "roughness",
            StagePosition::Glottal => "glottal",
            StagePosition::Subharmonic => "subharmonic",
            StagePosition::Pitch => "pitch",
            StagePosition::Corporeal => "corporeal",
        }
    }
}

// ============================================================================
// Parameter Smoothing
// ============================================================================

/// One smoother per continuous parameter
#[derive(Debug, Clone)]
struct ParamSmoothers {
    formant_shift: ParameterSmoother,
    formant_scale: ParameterSmoother,
    bandwidth_expansion: ParameterSmoother,
    tension: ParameterSmoother,
    breathiness: ParameterSmoother,
    whisper: ParameterSmoother,
    roughness: ParameterSmoother,
    subglottal_pressure: ParameterSmoother,
    irregularity: ParameterSmoother,
    growl: ParameterSmoother,
    pitch_stillness: ParameterSmoother,
    wet_sounds: ParameterSmoother,
}

impl ParamSmoothers {
    fn new(sample_rate: f32, time_ms: f32) -> Self {
        let human = AberrationParams::create_human();
        let at = |value: f32| ParameterSmoother::new(sample_rate, time_ms, value);
        Self {
            formant_shift: at(human.formant_shift.get()),
            formant_scale: at(human.formant_scale.get()),
            bandwidth_expansion: at(human.bandwidth_expansion.get()),
            tension: at(human.tension.get()),
            breathiness: at(human.breathiness.get()),
            whisper: at(human.whisper_amount.get()),
            roughness: at(human.roughness.get()),
            subglottal_pressure: at(human.subglottal_pressure.get()),
            irregularity: at(human.vocal_fold_irregularity.get()),
            growl: at(human.growl_harmonics.get()),
            pitch_stillness: at(human.pitch_stillness()),
            wet_sounds: at(human.wet_sounds.get()),
        }
    }

    fn all_mut(&mut self) -> [&mut ParameterSmoother; 12] {
        [
            &mut self.formant_shift,
            &mut self.formant_scale,
            &mut self.bandwidth_expansion,
            &mut self.tension,
            &mut self.breathiness,
            &mut self.whisper,
            &mut self.roughness,
            &mut self.subglottal_pressure,
            &mut self.irregularity,
            &mut self.growl,
            &mut self.pitch_stillness,
            &mut self.wet_sounds,
        ]
    }

    fn set_targets(&mut self, params: &AberrationParams) {
        self.formant_shift.set_target(params.formant_shift.get());
        self.formant_scale.set_target(params.formant_scale.get());
        self.bandwidth_expansion
            .set_target(params.bandwidth_expansion.get());
        self.tension.set_target(params.tension.get());
        self.breathiness.set_target(params.breathiness.get());
        self.whisper.set_target(params.whisper_amount.get());
        self.roughness.set_target(params.roughness.get());
        self.subglottal_pressure
            .set_target(params.subglottal_pressure.get());
        self.irregularity
            .set_target(params.vocal_fold_irregularity.get());
        self.growl.set_target(params.growl_harmonics.get());
        self.pitch_stillness.set_target(params.pitch_stillness());
        self.wet_sounds.set_target(params.wet_sounds.get());
    }

    fn advance(&mut self, num_samples: usize) {
        for smoother in self.all_mut() {
            smoother.advance(num_samples);
        }
    }

    fn snap(&mut self) {
        for smoother in self.all_mut() {
            smoother.snap_to_target();
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        for smoother in self.all_mut() {
            smoother.set_sample_rate(sample_rate);
        }
    }
}

// ============================================================================
// Listener
// ============================================================================

/// Where the listener stands relative to the voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Listener {
    /// 0 = far, 1 = touching
    pub proximity: f32,
    /// 0 = dry, 1 = wet
    pub environment: f32,
}

impl Listener {
    pub fn new(proximity: f32, environment: f32) -> Self {
        Self {
            proximity: proximity.clamp(0.0, 1.0),
            environment: environment.clamp(0.0, 1.0),
        }
    }
}

// ============================================================================
// Mid LOD Kernel
// ============================================================================

/// Full per-voice aberration pipeline
///
/// # Example
/// ```
/// use aberrant::params::AberrationParams;
/// use aberrant::voice::MidLodKernel;
///
/// let mut voice = MidLodKernel::new(48000.0, 7);
/// let input = vec![0.0_f32; 128];
/// let mut output = vec![0.0_f32; 128];
/// voice.process(&mut output, &input, &AberrationParams::create_zombie());
/// ```
#[derive(Debug, Clone)]
pub struct MidLodKernel {
    sample_rate: f32,
    block_size: usize,
    seed: u64,
    smoothing_ms: f32,
    tuning: KernelTuning,
    smoothers: ParamSmoothers,
    listener: Option<Listener>,
    primed: bool,
    archetype: Archetype,

    formant: FormantBank,
    breathiness: Breathiness,
    roughness: Roughness,
    glottal: GlottalIncoherence,
    subharmonic: SubharmonicGenerator,
    pitch: PitchStabilizer,
    corporeal: CorporealNoise,
}

impl MidLodKernel {
    /// Create a voice with default tuning and smoothing
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        Self::with_tuning(
            sample_rate,
            seed,
            DEFAULT_SMOOTHING_MS,
            DEFAULT_BLOCK_SIZE,
            KernelTuning::default(),
        )
    }

    /// Create a voice from a loaded configuration
    pub fn from_config(config: &VoiceConfig) -> Self {
        Self::with_tuning(
            config.sample_rate as f32,
            config.seed,
            config.smoothing_ms,
            config.block_size,
            config.tuning,
        )
    }

    /// Create a voice with explicit tuning
    ///
    /// # Arguments
    /// * `sample_rate` - Host sample rate in Hz
    /// * `seed` - Voice seed; each kernel derives an independent stream from it
    /// * `smoothing_ms` - Parameter smoothing time constant
    /// * `block_size` - Chunk size used by [`MidLodKernel::render`]
    /// * `tuning` - Kernel constants
    pub fn with_tuning(
        sample_rate: f32,
        seed: u64,
        smoothing_ms: f32,
        block_size: usize,
        tuning: KernelTuning,
    ) -> Self {
        let sample_rate = sample_rate.max(1.0);
        debug!(
            "Creating voice: {} Hz, seed {}, smoothing {} ms",
            sample_rate, seed, smoothing_ms
        );

        Self {
            sample_rate,
            block_size: block_size.max(1),
            seed,
            smoothing_ms,
            tuning,
            smoothers: ParamSmoothers::new(sample_rate, smoothing_ms),
            listener: None,
            primed: false,
            archetype: Archetype::Human,
            formant: FormantBank::new(sample_rate),
            breathiness: Breathiness::new(sample_rate, derive_kernel_seed(seed, "breathiness")),
            roughness: Roughness::new(sample_rate, derive_kernel_seed(seed, "roughness")),
            glottal: GlottalIncoherence::with_noise(
                sample_rate,
                SeededNoise::new(derive_kernel_seed(seed, "glottal")),
                tuning.glottal,
            ),
            subharmonic: SubharmonicGenerator::new(
                sample_rate,
                derive_kernel_seed(seed, "subharmonic"),
            ),
            pitch: PitchStabilizer::new(sample_rate),
            corporeal: CorporealNoise::with_noise(
                sample_rate,
                SeededNoise::new(derive_kernel_seed(seed, "corporeal")),
                tuning.corporeal,
            ),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn tuning(&self) -> &KernelTuning {
        &self.tuning
    }

    /// Archetype classified from the most recent parameters
    pub fn archetype(&self) -> Archetype {
        self.archetype
    }

    pub fn formant(&self) -> &FormantBank {
        &self.formant
    }

    pub fn breathiness(&self) -> &Breathiness {
        &self.breathiness
    }

    pub fn roughness(&self) -> &Roughness {
        &self.roughness
    }

    pub fn glottal(&self) -> &GlottalIncoherence {
        &self.glottal
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Place the listener; glottal intensity then follows proximity and
    /// environment instead of the flat intensity split
    pub fn set_listener(&mut self, proximity: f32, environment: f32) {
        self.listener = Some(Listener::new(proximity, environment));
    }

    /// Return to the flat intensity split
    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    pub fn listener(&self) -> Option<Listener> {
        self.listener
    }

    pub fn subharmonic(&self) -> &SubharmonicGenerator {
        &self.subharmonic
    }

    pub fn pitch(&self) -> &PitchStabilizer {
        &self.pitch
    }

    pub fn corporeal(&self) -> &CorporealNoise {
        &self.corporeal
    }

    /// Kernel for a pipeline stage
    pub fn stage(&self, stage: StagePosition) -> &dyn VoiceKernel {
        match stage {
            StagePosition::Formant => &self.formant,
            StagePosition::Breathiness => &self.breathiness,
            StagePosition::Roughness => &self.roughness,
            StagePosition::Glottal => &self.glottal,
            StagePosition::Subharmonic => &self.subharmonic,
            StagePosition::Pitch => &self.pitch,
            StagePosition::Corporeal => &self.corporeal,
        }
    }

    fn stage_mut(&mut self, stage: StagePosition) -> &mut dyn VoiceKernel {
        match stage {
            StagePosition::Formant => &mut self.formant,
            StagePosition::Breathiness => &mut self.breathiness,
            StagePosition::Roughness => &mut self.roughness,
            StagePosition::Glottal => &mut self.glottal,
            StagePosition::Subharmonic => &mut self.subharmonic,
            StagePosition::Pitch => &mut self.pitch,
            StagePosition::Corporeal => &mut self.corporeal,
        }
    }

    /// Parameters of every stage, keyed by stage name
    pub fn kernel_params(&self) -> Value {
        let mut map = Map::new();
        for stage in StagePosition::ORDER {
            let kernel = self.stage(stage);
            map.insert(
                stage.as_str().to_string(),
                json!({
                    "active": kernel.is_active(),
                    "params": kernel.get_params(),
                }),
            );
        }
        Value::Object(map)
    }

    // ------------------------------------------------------------------------
    // Parameter Mapping
    // ------------------------------------------------------------------------

    /// Derive every kernel's settings from one parameter record
    ///
    /// Targets are smoothed and advanced by `num_samples`. The first call after
    /// construction or reset jumps straight to the targets.
    pub fn update_modules_from_params(&mut self, params: &AberrationParams, num_samples: usize) {
        self.archetype = params.archetype();
        self.smoothers.set_targets(params);
        if self.primed {
            self.smoothers.advance(num_samples);
        } else {
            self.smoothers.snap();
            self.primed = true;
        }

        let s = &self.smoothers;
        let tension = s.tension.current();

        self.formant.configure(
            s.formant_shift.current(),
            s.formant_scale.current(),
            s.bandwidth_expansion.current(),
            tension,
        );

        self.breathiness.set_amount(s.breathiness.current());
        self.breathiness.set_whisper(s.whisper.current());

        self.roughness.set_amount(s.roughness.current());
        self.roughness.set_pressure(s.subglottal_pressure.current());

        let irregularity = s.irregularity.current();
        match self.listener {
            Some(listener) => self.glottal.set_dynamic_intensity(
                irregularity,
                listener.proximity,
                listener.environment,
            ),
            None => self.glottal.set_intensity(irregularity),
        }

        self.subharmonic.set_growl(s.growl.current());
        let struggle = match self.archetype {
            Archetype::Werewolf => tension,
            _ => 0.0,
        };
        self.subharmonic.set_transformation_struggle(struggle);

        // hollow_resonance doubles as the vampire pitch stillness control
        self.pitch.set_stillness(s.pitch_stillness.current());

        self.corporeal.set_profile(CorporealProfile::for_archetype(
            self.archetype,
            s.wet_sounds.current(),
        ));
    }

    // ------------------------------------------------------------------------
    // Processing
    // ------------------------------------------------------------------------

    /// Process one block from `input` into `output`
    ///
    /// Processes `min(output.len(), input.len())` samples; any remaining
    /// output samples are left untouched. Never allocates, locks or fails.
    pub fn process(&mut self, output: &mut [f32], input: &[f32], params: &AberrationParams) {
        let num_samples = output.len().min(input.len());
        let block = &mut output[..num_samples];
        block.copy_from_slice(&input[..num_samples]);
        self.process_in_place(block, params);
    }

    /// Process one block in place
    pub fn process_in_place(&mut self, samples: &mut [f32], params: &AberrationParams) {
        self.update_modules_from_params(params, samples.len());
        for stage in StagePosition::ORDER {
            self.stage_mut(stage).process_block(samples);
        }
    }

    /// Render a whole buffer offline
    ///
    /// Every channel is processed by its own voice so the output keeps the
    /// input's channel layout. Channel 0 runs on this voice; the others run on
    /// fresh voices seeded from this one. If the buffer's sample rate differs
    /// from the voice, the voice is re-prepared for it first.
    pub fn render(&mut self, input: &AudioBuffer, params: &AberrationParams) -> Result<AudioBuffer> {
        let sample_rate = input.sample_rate() as f32;
        if sample_rate != self.sample_rate {
            debug!(
                "Re-preparing voice for {} Hz (was {} Hz)",
                sample_rate, self.sample_rate
            );
            self.prepare(sample_rate);
        }

        let channels = input.channels();
        let mut rendered = Vec::with_capacity(channels as usize);
        rendered.push(self.render_channel(input.channel_samples(0), params));
        for channel in 1..channels {
            let mut voice = self.channel_voice(channel);
            rendered.push(voice.render_channel(input.channel_samples(channel), params));
        }

        let mut interleaved = Vec::with_capacity(input.samples().len());
        for frame in 0..input.num_frames() {
            interleaved.extend(rendered.iter().map(|channel| channel[frame]));
        }
        AudioBuffer::from_interleaved(&interleaved, channels, input.sample_rate())
    }

    fn render_channel(&mut self, mut samples: Vec<f32>, params: &AberrationParams) -> Vec<f32> {
        for chunk in samples.chunks_mut(self.block_size) {
            self.process_in_place(chunk, params);
        }
        samples
    }

    /// Independent voice for one extra channel of a multi-channel render
    fn channel_voice(&self, channel: u16) -> Self {
        let seed = derive_kernel_seed(self.seed, &format!("channel-{}", channel));
        debug!("Rendering channel {} with seed {}", channel, seed);
        let mut voice = Self::with_tuning(
            self.sample_rate,
            seed,
            self.smoothing_ms,
            self.block_size,
            self.tuning,
        );
        voice.listener = self.listener;
        voice
    }

    /// Prepare every kernel for a new sample rate
    pub fn prepare(&mut self, sample_rate: f32) {
        let sample_rate = sample_rate.max(1.0);
        self.sample_rate = sample_rate;
        self.smoothers.set_sample_rate(sample_rate);
        for stage in StagePosition::ORDER {
            self.stage_mut(stage).prepare(sample_rate);
        }
    }

    /// Reset every kernel between independent utterances
    pub fn reset(&mut self) {
        for stage in StagePosition::ORDER {
            self.stage_mut(stage).reset();
        }
        self.primed = false;
    }
}
