//! Configuration module for the corpus index
//! Automatically uses generated constants from TOML configuration

// Include generated constants from build.rs
// This file is generated at compile time from the TOML profile
include!(concat!(env!("OUT_DIR"), "/constants.rs"));

pub mod runtime;

pub use runtime::{
    CachePreferences, CodecPreferences, HighlightPreferences, LoggingPreferences, RuntimeConfig,
    StreamPreferences,
};

/// Build information and configuration metadata
pub mod build_info {
    /// Returns the configuration profile used during build
    pub fn profile() -> &'static str {
        option_env!("CORPUS_BUILD_PROFILE").unwrap_or("development")
    }

    /// Returns the configuration directory used during build
    pub fn config_dir() -> &'static str {
        option_env!("CORPUS_CONFIG_DIR").unwrap_or("config")
    }

    /// Returns configuration source information
    pub fn source_info() -> String {
        format!("Generated from {}/{}.toml", config_dir(), profile())
    }
}

#[cfg(test)]
mod tests {
    use super::compile_time;

    #[test]
    fn test_generated_limits_are_consistent() {
        assert!(compile_time::codec::PAYLOAD_BUFFER_INCREMENT >= 8);
        assert!(compile_time::codec::MAX_OFFSET <= i32::MAX as u32);
        assert!(compile_time::cache::DEFAULT_CAPACITY <= compile_time::cache::MAX_CAPACITY);
        assert!(!compile_time::cache::MANIFEST_FILE_NAME.is_empty());
    }

    #[test]
    fn test_source_info() {
        assert!(super::build_info::source_info().ends_with(".toml"));
    }
}
