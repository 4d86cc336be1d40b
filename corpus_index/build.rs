// build.rs - TOML-driven compile-time limit generation
use std::env;
use std::fs;
use std::path::Path;

#[derive(serde::Deserialize)]
struct CompileTimeConfig {
    codec: CodecLimits,
    stream: StreamLimits,
    highlight: HighlightLimits,
    cache: CacheLimits,
    logging: LoggingLimits,
}

#[derive(serde::Deserialize)]
struct CodecLimits {
    max_term_text_length: usize,
    max_payload_size: usize,
    payload_buffer_increment: usize,
    max_offset: u32,
}

#[derive(serde::Deserialize)]
struct StreamLimits {
    max_terms_per_token: usize,
    max_tokens_per_stream: usize,
    max_literal_size: usize,
}

#[derive(serde::Deserialize)]
struct HighlightLimits {
    max_balance_depth: usize,
    max_class_number: u32,
}

#[derive(serde::Deserialize)]
struct CacheLimits {
    default_capacity: usize,
    max_capacity: usize,
    max_vc_id_length: usize,
    manifest_file_name: String,
}

#[derive(serde::Deserialize)]
struct LoggingLimits {
    max_error_collection: usize,
    log_buffer_size: usize,
    max_log_message_length: usize,
    max_log_events_per_document: usize,
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=CORPUS_BUILD_PROFILE");
    println!("cargo:rerun-if-env-changed=CORPUS_CONFIG_DIR");

    let profile = env::var("CORPUS_BUILD_PROFILE").unwrap_or_else(|_| "development".to_string());
    let config_dir = env::var("CORPUS_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

    // Find workspace root (parent of corpus_index directory)
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let workspace_root = Path::new(&manifest_dir)
        .parent()
        .expect("Could not find workspace root (parent directory)");

    let config_path = workspace_root
        .join(&config_dir)
        .join(format!("{}.toml", profile));

    println!("cargo:rerun-if-changed={}", config_path.display());

    if !config_path.exists() {
        panic!(
            "Configuration file not found: {}\nWorkspace root: {}\nLooking for: {}/{}/{}.toml",
            config_path.display(),
            workspace_root.display(),
            workspace_root.display(),
            config_dir,
            profile
        );
    }

    let config_content = fs::read_to_string(&config_path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", config_path.display(), e));

    let config: CompileTimeConfig = toml::from_str(&config_content)
        .unwrap_or_else(|e| panic!("Invalid TOML in {}: {}", config_path.display(), e));

    validate_constraints(&config, &profile);
    generate_constants(&config, &profile);
}

fn validate_constraints(config: &CompileTimeConfig, profile: &str) {
    const ABSOLUTE_MAX_PAYLOAD: usize = 16 * 1024 * 1024;
    const ABSOLUTE_MAX_CLASS_NUMBER: u32 = 1 << 20;

    // Offsets travel as big-endian i32 pairs
    if config.codec.max_offset > i32::MAX as u32 {
        panic!("CODEC: max_offset must fit a signed 32-bit offset field");
    }

    // Typed payloads append up to 8 bytes at a time
    if config.codec.payload_buffer_increment < 8 {
        panic!("CODEC: payload_buffer_increment must be at least 8 bytes");
    }

    if config.codec.max_payload_size > ABSOLUTE_MAX_PAYLOAD {
        panic!("CODEC: max_payload_size exceeds absolute maximum");
    }

    if config.highlight.max_class_number > ABSOLUTE_MAX_CLASS_NUMBER {
        panic!("HIGHLIGHT: max_class_number exceeds absolute maximum");
    }

    if config.cache.default_capacity == 0 || config.cache.default_capacity > config.cache.max_capacity {
        panic!("CACHE: default_capacity must be within 1..=max_capacity");
    }

    if config.logging.max_log_events_per_document > config.logging.log_buffer_size {
        panic!("LOGGING: max_log_events_per_document exceeds log_buffer_size");
    }

    if profile == "production" && config.stream.max_literal_size > 100 * 1024 * 1024 {
        panic!("PRODUCTION: max_literal_size too high for production");
    }
}

fn generate_constants(config: &CompileTimeConfig, profile: &str) {
    let out_dir = env::var("OUT_DIR").unwrap();
    let output_path = Path::new(&out_dir).join("constants.rs");

    let constants_code = format!(
        r#"
// Generated compile-time constants from TOML configuration
// Profile: {}
// DO NOT EDIT - Generated by build.rs

pub mod compile_time {{
    pub mod codec {{
        pub const MAX_TERM_TEXT_LENGTH: usize = {};
        pub const MAX_PAYLOAD_SIZE: usize = {};
        pub const PAYLOAD_BUFFER_INCREMENT: usize = {};
        pub const MAX_OFFSET: u32 = {};
    }}

    pub mod stream {{
        pub const MAX_TERMS_PER_TOKEN: usize = {};
        pub const MAX_TOKENS_PER_STREAM: usize = {};
        pub const MAX_LITERAL_SIZE: usize = {};
    }}

    pub mod highlight {{
        pub const MAX_BALANCE_DEPTH: usize = {};
        pub const MAX_CLASS_NUMBER: u32 = {};
    }}

    pub mod cache {{
        pub const DEFAULT_CAPACITY: usize = {};
        pub const MAX_CAPACITY: usize = {};
        pub const MAX_VC_ID_LENGTH: usize = {};
        pub const MANIFEST_FILE_NAME: &str = {:?};
    }}

    pub mod logging {{
        pub const MAX_ERROR_COLLECTION: usize = {};
        pub const LOG_BUFFER_SIZE: usize = {};
        pub const MAX_LOG_MESSAGE_LENGTH: usize = {};
        pub const MAX_LOG_EVENTS_PER_DOCUMENT: usize = {};
    }}
}}
"#,
        profile,
        // Codec
        config.codec.max_term_text_length,
        config.codec.max_payload_size,
        config.codec.payload_buffer_increment,
        config.codec.max_offset,
        // Stream
        config.stream.max_terms_per_token,
        config.stream.max_tokens_per_stream,
        config.stream.max_literal_size,
        // Highlight
        config.highlight.max_balance_depth,
        config.highlight.max_class_number,
        // Cache
        config.cache.default_capacity,
        config.cache.max_capacity,
        config.cache.max_vc_id_length,
        config.cache.manifest_file_name,
        // Logging
        config.logging.max_error_collection,
        config.logging.log_buffer_size,
        config.logging.max_log_message_length,
        config.logging.max_log_events_per_document,
    );

    fs::write(output_path, constants_code).unwrap();
}
