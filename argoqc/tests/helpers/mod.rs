//! Test helper modules for argoqc integration tests
//!
//! - MemoryRepository: in-memory `RepositoryClient` with inspection helpers
//! - ScriptedAnalyzer: synthetic measurements, failing on chosen images
//! - fixtures: image names, channels and local folders

#![allow(dead_code)]

pub mod fixtures;
pub mod memory_repository;
pub mod scripted_analyzer;

pub use fixtures::{csv_files, image_name, synthetic_analysis, synthetic_channel, LocalFixture};
pub use memory_repository::MemoryRepository;
pub use scripted_analyzer::ScriptedAnalyzer;
