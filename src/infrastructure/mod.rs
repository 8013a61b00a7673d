pub mod encoder;
pub mod orchestrator;
pub mod queue;
pub mod storage;
