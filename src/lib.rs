//! # autopost-rs
//!
//! Automated blog publishing for WordPress: web search snippets are turned
//! into an article by a language model, illustrated by an image-generation
//! service and published through the WordPress REST API.

pub mod config;
pub mod content;
pub mod error;
pub mod image;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod search;
pub mod types;
pub mod wordpress;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, RunReport, Stage};
