/// Exporter settings and TOML loading
pub mod conf;

pub use conf::{ArcconfConfig, Config, ExpositionConfig, DEFAULT_ARCCONF_PATH, DEFAULT_PREFIX};
