//! syncmap - type-specialized `sync.Map` generator
//!
//! This library parses the Go `sync.Map` source, retypes its `interface{}`
//! keys and values for a given `map[K]V`, renames its declarations and
//! prints the result as a standalone Go file.

pub mod config;
pub mod emit;
pub mod error;
pub mod pipeline;
pub mod specialize;
pub mod syntax;
pub mod template;

// Re-export commonly used types
pub use config::{ConfigFile, GenConfig, TimingsFormat};
pub use error::GenError;
pub use pipeline::{Timings, generate, run};
pub use template::{Template, TemplateSource};
