pub mod config;
pub mod disposition;
pub mod episodes;
pub mod error;
pub mod ffprobe;
pub mod filename;
pub mod handbrake;
pub mod media;
pub mod naming;
pub mod orchestrator;
pub mod params;
pub mod scan;

pub use config::ConvertConfig;
pub use disposition::{Disposition, DispositionMode};
pub use error::{EncodeError, ProbeError};
pub use ffprobe::{FfprobeProbe, MetadataProbe};
pub use handbrake::{Encoder, HandBrakeCli};
pub use media::{MediaFile, MediaInfo};
pub use orchestrator::{Orchestrator, PassReport, RunState};
pub use params::{EncodeParams, TranscodeJob};
