//! Wire types for the `playht.v1.Tts` streaming RPC.
//!
//! Message structs are written by hand against the service's proto
//! definition rather than generated at build time, keeping protoc out of
//! the build:
//!
//! ```protobuf
//! service Tts {
//!     rpc Tts(TtsRequest) returns (stream TtsResponse);
//! }
//! ```

/// Full gRPC method path of the synthesis call.
pub const TTS_METHOD: &str = "/playht.v1.Tts/Tts";

/// Output quality preset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Quality {
    Unspecified = 0,
    Draft = 1,
    Low = 2,
    Medium = 3,
    High = 4,
    Premium = 5,
}

/// Output audio container/encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Format {
    Raw = 0,
    Mp3 = 1,
    Wav = 2,
    Ogg = 3,
    Flac = 4,
    Mulaw = 5,
}

/// Progress marker carried by status messages on the response stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Code {
    Unspecified = 0,
    Generating = 1,
    Complete = 2,
    Error = 3,
}

/// Synthesis parameters, as sent on the wire.
///
/// Unset fields take server-side defaults. Range contracts are documented
/// on [`crate::SynthesisParams`]; the server, not this client, enforces
/// them.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TtsParams {
    #[prost(string, optional, tag = "1")]
    pub voice: Option<String>,
    #[prost(string, repeated, tag = "2")]
    pub text: Vec<String>,
    #[prost(enumeration = "Quality", optional, tag = "3")]
    pub quality: Option<i32>,
    #[prost(enumeration = "Format", optional, tag = "4")]
    pub format: Option<i32>,
    #[prost(int32, optional, tag = "5")]
    pub sample_rate: Option<i32>,
    #[prost(float, optional, tag = "6")]
    pub speed: Option<f32>,
    #[prost(int32, optional, tag = "7")]
    pub seed: Option<i32>,
    #[prost(float, optional, tag = "8")]
    pub temperature: Option<f32>,
    #[prost(float, optional, tag = "9")]
    pub top_p: Option<f32>,
    #[prost(float, optional, tag = "10")]
    pub voice_guidance: Option<f32>,
    #[prost(float, optional, tag = "11")]
    pub style_guidance: Option<f32>,
    #[prost(float, optional, tag = "12")]
    pub text_guidance: Option<f32>,
}

/// One synthesis request: the authorizing lease token plus the merged
/// parameter set.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TtsRequest {
    #[prost(message, optional, tag = "1")]
    pub params: Option<TtsParams>,
    #[prost(bytes = "vec", tag = "2")]
    pub lease: Vec<u8>,
}

/// Status message interleaved with audio data on the response stream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TtsStatus {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(enumeration = "Code", tag = "2")]
    pub code: i32,
    #[prost(string, tag = "3")]
    pub message: String,
}

/// One message of the synthesis response stream: either a status marker or
/// a block of raw audio bytes.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TtsResponse {
    #[prost(oneof = "tts_response::Response", tags = "1, 2")]
    pub response: Option<tts_response::Response>,
}

pub mod tts_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Response {
        #[prost(message, tag = "1")]
        Status(super::TtsStatus),
        #[prost(bytes = "vec", tag = "2")]
        Data(Vec<u8>),
    }
}
