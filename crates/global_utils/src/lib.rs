pub mod common_resp;
pub mod common_types;
pub mod config_variant;
pub mod env_parser;
pub mod http_client;
pub mod logger;
