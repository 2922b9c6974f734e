pub mod sampler;
pub mod source;

pub use sampler::spawn_sampler;
pub use source::{SampleSource, SimulatedSource, DEFAULT_SEED};
