pub mod fitness;
pub mod track;

pub use fitness::{FitnessEvaluator, FitnessReport, RunReport, HIT_REWARD};
pub use track::{TrackMap, Tracks};
