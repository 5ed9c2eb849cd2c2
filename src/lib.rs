pub mod config;
pub mod evaluation;
pub mod evolution;
pub mod export;
pub mod interpreter;
pub mod program;
pub mod rng;
pub mod sim;
