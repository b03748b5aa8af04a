//! Configuration module for bellwether
//!
//! This module handles:
//! - Project-level configuration (bellwether.toml / .bellwetherrc.json)
//! - Search policy presets and their tunables
//! - Classifier and data-root defaults

mod bellwether_config;

pub use bellwether_config::{
    load_config, BellwetherConfig, DataConfig, PolicyKind, SearchSettings, EXAMPLE_CONFIG,
};
