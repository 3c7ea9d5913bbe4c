//! Configuration for the dray gateway: schema types plus file discovery and
//! loading with `${ENV_VAR}` substitution. TOML, YAML and JSON are all
//! accepted; TOML is the documented default.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{clear_config_dir, config_dir, discover_and_load, load_config, set_config_dir},
    schema::{ClusteringSection, DrayConfig, GatewaySection, MaintenanceSection},
};
