// Library exports for use in binaries and integration tests
pub mod cli;
pub mod config;
pub mod direction;
pub mod evaluator;
pub mod extract;
pub mod models;
pub mod openai;
pub mod orchestrator;
pub mod prompt;
pub mod report;
pub mod resources;
pub mod teamwork;
