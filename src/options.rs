use serde::Deserialize;

/// Options for GPX minification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinifyOptions {
    /// Value of the `creator` attribute on the output root (default: crate name)
    #[serde(default = "default_creator")]
    pub creator: String,

    /// Keep <ele> in the minified output (default: true)
    #[serde(default = "default_true")]
    pub include_elevation: bool,

    /// Pretty-print with this many spaces per level (default: compact)
    #[serde(default)]
    pub indent: Option<usize>,
}

impl Default for MinifyOptions {
    fn default() -> Self {
        Self {
            creator: default_creator(),
            include_elevation: true,
            indent: None,
        }
    }
}

fn default_creator() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_true() -> bool {
    true
}
