pub mod api;
pub mod assembler;
pub mod config;
pub mod contract;
pub mod document;
pub mod error;
pub mod export;
pub mod generation;
pub mod models;
pub mod orchestrator;
