//! Configuration types for the extraction server and CLI.

use std::path::PathBuf;

/// Engine setup shared by both modes.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Tesseract data directory; Tesseract's default search path when unset.
    pub tessdata_dir: Option<PathBuf>,
    /// Fail startup when a language pack is missing instead of serving that
    /// language with the default engine.
    pub strict_languages: bool,
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub engines: EngineConfig,
    pub host: String,
    pub port: u16,
}
