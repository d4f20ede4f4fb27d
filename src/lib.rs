pub mod cli;
pub mod config;
pub mod dictionary;
pub mod domain;
pub mod error;
pub mod eutils;
pub mod extract;
pub mod input;
pub mod output;
pub mod pacing;
pub mod progress;
pub mod runner;
