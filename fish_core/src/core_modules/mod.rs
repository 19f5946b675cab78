pub mod aggregator;
pub mod detection;
pub mod feedback;
pub mod lifecycle;
pub mod planner;
pub mod projection;
pub mod reasoner;
pub mod rules;
pub mod selection_lock;
