/// TOML configuration for the server.
pub mod toml_config;
