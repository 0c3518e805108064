//! Configuration types deserialized from `aion.toml`.

use serde::Deserialize;

/// The top-level project configuration parsed from `aion.toml`.
///
/// `aion.toml` is optional (spec §3.3): the CLI's primary contract is a bare
/// `.v` file path, and this config is only consulted when present to supply
/// a default top module name and project metadata for diagnostics.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
}

/// Core project metadata required in every `aion.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project version string.
    pub version: String,
    /// The default top module name, used when `--top` is not given on the
    /// command line.
    #[serde(default)]
    pub top: Option<String>,
}
