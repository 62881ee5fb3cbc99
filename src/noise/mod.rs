//! Noise sampling
//!
//! - `level`: reduces a frequency energy snapshot to a 0-100 reading
//! - `history`: the per-tick record of readings for one session
//! - `sampler`: owns the capture stream and runs the sampling loop

mod history;
mod level;
mod sampler;

pub use history::{NoiseHistoryLog, NoiseRecord};
pub use level::{scale_energies, NoiseLevel, MAX_LEVEL};
pub use sampler::{LevelUpdate, NoiseSampler, SamplerConfig};
