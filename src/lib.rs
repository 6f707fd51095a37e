pub mod config;
pub mod constants;
pub mod engine;
pub mod geometry;
pub mod player;
pub mod results;
pub mod rng;
pub mod strategy;
pub mod tournament;
pub mod types;
