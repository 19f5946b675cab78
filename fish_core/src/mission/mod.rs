pub mod bin;
pub mod cost;
pub mod environment;
pub mod manipulator;
pub mod navigator;
pub mod outcome;
pub mod planner;
pub mod types;
pub mod unload;
