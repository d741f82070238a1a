//! Configuration for an h2d run. Loaded by `h2d_translate::cli` from layered sources (built-in
//! defaults, config files, `--config` overrides and command-line flags).

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::path::PathBuf;
use tracing::warn;

/// Source language of the headers being translated.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum Language {
    #[default]
    C,
    #[serde(alias = "objc")]
    ObjectiveC,
}

impl Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::C => write!(f, "C"),
            Language::ObjectiveC => write!(f, "Objective-C"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Entry header to translate.
    pub input: PathBuf,

    /// Path of the D file to write. Defaults to `input` with a `.d` extension.
    pub output: Option<PathBuf>,

    /// Parse the headers as Objective-C.
    #[serde(default)]
    pub objc: bool,

    /// Extra include search directories, searched in order.
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,

    /// Macro definitions passed to the front end (`NAME` or `NAME=VALUE`).
    #[serde(default)]
    pub defines: Vec<String>,

    /// Regular expression selecting which external headers' declarations are qualified.
    pub import_filter: Option<String>,

    /// Prefix prepended to qualified references to external declarations.
    pub import_prefix: Option<String>,

    /// Sub-configuration for each tool, keyed by tool name.
    #[serde(default)]
    pub tools: HashMap<String, Value>,

    // Unknown configuration values.
    #[serde(flatten)]
    pub unknown: HashMap<String, Value>,
}

impl Config {
    pub fn language(&self) -> Language {
        match self.objc {
            true => Language::ObjectiveC,
            false => Language::C,
        }
    }

    /// Returns the output path, falling back to the input path with a `.d` extension.
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(output) => output.clone(),
            None => self.input.with_extension("d"),
        }
    }

    /// Returns the configuration table for the tool `name`, or `Value::Null` if there is none.
    pub fn tool(&self, name: &str) -> &Value {
        self.tools.get(name).unwrap_or(&Value::Null)
    }

    /// Returns a mock config for testing.
    pub fn mock() -> Self {
        Self {
            input: "input.h".into(),
            output: None,
            objc: false,
            include_paths: Vec::new(),
            defines: Vec::new(),
            import_filter: None,
            import_prefix: None,
            tools: HashMap::new(),
            unknown: HashMap::new(),
        }
    }
}

/// Logs a warning for every field in `unknown`.
///
/// This is intended for use by config validation routines. `prefix` should be the path to this
/// entry (e.g. `tools::Config` should call this with a `prefix` of `tools`).
pub fn unknown_field_warning(prefix: &str, unknown: &HashMap<String, Value>) {
    let mut entries: Vec<_> = unknown.keys().collect();
    entries.sort_unstable();
    entries.into_iter().for_each(|name| match prefix {
        "" => warn!("unknown config key {name}"),
        p => warn!("unknown config key {p}.{name}"),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_defaults_to_d_extension() {
        let mut config = Config::mock();
        config.input = "dir/foo.h".into();
        assert_eq!(config.output_path(), PathBuf::from("dir/foo.d"));
        config.output = Some("bar.d".into());
        assert_eq!(config.output_path(), PathBuf::from("bar.d"));
    }

    #[test]
    fn language_follows_objc_flag() {
        let mut config = Config::mock();
        assert_eq!(config.language(), Language::C);
        config.objc = true;
        assert_eq!(config.language(), Language::ObjectiveC);
    }
}
