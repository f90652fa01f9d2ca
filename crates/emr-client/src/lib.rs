//! EMR API access.
//!
//! - [`client`]: the reqwest-backed [`ApiClient`] and the [`JsonFetcher`] seam
//! - [`config`]: connection settings stored as TOML
//! - [`params`]: ordered query parameters

pub mod client;
pub mod config;
pub mod error;
pub mod params;

pub use client::{ApiClient, JsonFetcher};
pub use config::{API_KEY_ENV, ApiConfig, config_path, load_config, save_config};
pub use error::{ApiError, Result};
pub use params::{ParamValue, QueryParams, parameterize_url};
