//! Library components of the `emr-reports` CLI.

pub mod logging;
pub mod render;
