//! Synthesis parameter set with builder-style merging.

use crate::proto::{self, Format, Quality};

/// Default narrative voice manifest.
pub const DEFAULT_VOICE: &str =
    "s3://voice-cloning-zero-shot/d9ff78ba-d016-47f6-b0ef-dd630f59414e/female-cs/manifest.json";

/// Generates a random non-negative seed for a synthesis call.
pub fn random_seed() -> i32 {
    let mut buf = [0u8; 4];
    // A zero seed on the RNG failure path still satisfies `seed >= 0`.
    let _ = getrandom::fill(&mut buf);
    (u32::from_be_bytes(buf) >> 1) as i32
}

/// Synthesis parameters.
///
/// Every field is optional; unset fields fall back to server-side defaults.
/// Parameter sets combine with [`merge`](Self::merge): a field-level
/// last-writer-wins merge, never a wholesale replace.
///
/// The numeric ranges below are contractual for the remote service. The
/// client passes values through unmodified; out-of-range values are
/// rejected server-side.
///
/// # Example
///
/// ```rust
/// use playht::SynthesisParams;
///
/// let base = SynthesisParams {
///     sample_rate: Some(8000),
///     speed: Some(1.0),
///     ..Default::default()
/// };
/// let merged = base.merge(SynthesisParams {
///     speed: Some(1.2),
///     ..Default::default()
/// });
/// assert_eq!(merged.sample_rate, Some(8000));
/// assert_eq!(merged.speed, Some(1.2));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesisParams {
    /// Voice manifest URI.
    pub voice: Option<String>,
    /// Texts to synthesize. [`TtsClient::synthesize`](crate::TtsClient::synthesize)
    /// replaces this field with its argument.
    pub text: Option<Vec<String>>,
    /// Output quality preset.
    pub quality: Option<Quality>,
    /// Output audio format.
    pub format: Option<Format>,
    /// Sample rate in Hz, `8000..=48000`.
    pub sample_rate: Option<i32>,
    /// Playback speed, `0.0 < speed <= 5.0`.
    pub speed: Option<f32>,
    /// Generation seed, `>= 0`.
    pub seed: Option<i32>,
    /// Sampling temperature, `0.0..=2.0`.
    pub temperature: Option<f32>,
    /// Nucleus sampling threshold.
    pub top_p: Option<f32>,
    /// Voice uniqueness guidance, `1.0..=6.0`.
    pub voice_guidance: Option<f32>,
    /// Emotiveness guidance, `1.0..=30.0`.
    pub style_guidance: Option<f32>,
    /// Text adherence guidance.
    pub text_guidance: Option<f32>,
}

impl SynthesisParams {
    /// Baseline parameter set: a fresh random seed, the documented default
    /// hyperparameters, and medium-quality 8 kHz WAV output with the
    /// default narrative voice.
    pub fn defaults() -> Self {
        Self {
            voice: Some(DEFAULT_VOICE.to_string()),
            quality: Some(Quality::Medium),
            format: Some(Format::Wav),
            sample_rate: Some(8000),
            speed: Some(1.0),
            seed: Some(random_seed()),
            temperature: Some(0.6),
            top_p: Some(1.0),
            ..Default::default()
        }
    }

    /// Merges `other` over `self`: fields `other` sets win, fields it
    /// leaves unset inherit from `self`.
    pub fn merge(self, other: SynthesisParams) -> Self {
        Self {
            voice: other.voice.or(self.voice),
            text: other.text.or(self.text),
            quality: other.quality.or(self.quality),
            format: other.format.or(self.format),
            sample_rate: other.sample_rate.or(self.sample_rate),
            speed: other.speed.or(self.speed),
            seed: other.seed.or(self.seed),
            temperature: other.temperature.or(self.temperature),
            top_p: other.top_p.or(self.top_p),
            voice_guidance: other.voice_guidance.or(self.voice_guidance),
            style_guidance: other.style_guidance.or(self.style_guidance),
            text_guidance: other.text_guidance.or(self.text_guidance),
        }
    }

    /// Converts to the wire representation, replacing the text field with
    /// the per-call texts.
    pub(crate) fn into_proto(self, texts: Vec<String>) -> proto::TtsParams {
        proto::TtsParams {
            voice: self.voice,
            text: texts,
            quality: self.quality.map(|q| q as i32),
            format: self.format.map(|f| f as i32),
            sample_rate: self.sample_rate,
            speed: self.speed,
            seed: self.seed,
            temperature: self.temperature,
            top_p: self.top_p,
            voice_guidance: self.voice_guidance,
            style_guidance: self.style_guidance,
            text_guidance: self.text_guidance,
        }
    }
}
