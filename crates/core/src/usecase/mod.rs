pub mod controller;
pub mod enhancer;
pub mod job_queue;
pub mod orchestrator;
pub mod strategy;

#[cfg(test)]
pub(crate) mod mocks;
