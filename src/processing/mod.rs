pub mod buffer;
pub mod detectors;
pub mod scheduler;
pub mod signal_processor;
