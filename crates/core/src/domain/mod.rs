pub mod classifier;
pub mod error;
pub mod job;
pub mod session;
pub mod settings;
pub mod types;

#[cfg(test)]
mod serde_tests;
