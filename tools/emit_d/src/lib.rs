//! Translation of the declaration model into a D module.
//!
//! Emission is a fold over the declarations in source order: each one is rendered to a block
//! of D text by [render::Renderer], which also collects the imports the text needs, and
//! [layout::layout] assembles the blocks, the header's comments and the module preamble.

#[cfg(test)]
mod tests;

mod keywords;
mod layout;
mod policy;
mod render;

pub use keywords::{escape, escape_member};
pub use policy::{ImportPolicy, Qualified};

use decl_model::TranslationUnit;
use h2d_core::config::{Language, unknown_field_warning};
use h2d_core::tools::{RunContext, Tool};
use h2d_core::{Id, Representation};
use layout::{Block, Preamble};
use render::Renderer;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct EmitConfig {
    /// Follow each named enum with an `alias` per member, so members can be used unqualified
    /// as in C.
    #[serde(default)]
    pub alias_enum_members: bool,

    /// Package of the generated module. When set, the output starts with
    /// `module <package>.<file stem>;`.
    pub package: Option<String>,

    #[serde(flatten)]
    pub unknown: HashMap<String, Value>,
}

impl EmitConfig {
    pub fn from_value(value: &Value) -> Result<EmitConfig, EmitError> {
        if value.is_null() {
            return Ok(EmitConfig::default());
        }
        let config: EmitConfig = serde_json::from_value(value.clone())?;
        unknown_field_warning("tools.emit_d", &config.unknown);
        Ok(config)
    }
}

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("invalid emit_d config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid import filter: {0}")]
    ImportFilter(#[from] regex::Error),
}

/// Renders `unit` as the text of a D module. `output` is the path the module is written to;
/// its stem names the module when `config.package` is set.
pub fn emit(
    unit: &TranslationUnit,
    config: &EmitConfig,
    output: &Path,
) -> Result<String, EmitError> {
    let policy = ImportPolicy::new(
        unit.import_filter.as_deref(),
        unit.import_prefix.as_deref(),
    )?;
    let mut renderer = Renderer::new(&policy, config.alias_enum_members);
    let blocks: Vec<_> = unit
        .declarations
        .iter()
        .map(|declaration| Block {
            line: declaration.begin_line,
            end_line: declaration.end_line,
            text: renderer.declaration(declaration),
        })
        .collect();
    let imports = renderer.into_imports();
    let module = match (&config.package, output.file_stem()) {
        (Some(package), Some(stem)) => Some(format!(
            "{package}.{}",
            escape(&stem.to_string_lossy().replace(['-', '.'], "_"))
        )),
        _ => None,
    };
    let preamble = Preamble {
        module,
        imports: &imports,
        objc: unit.language == Language::ObjectiveC,
    };
    Ok(layout::layout(&preamble, blocks, &unit.comments))
}

/// The generated D module.
#[derive(Debug)]
pub struct DModule {
    pub path: PathBuf,
    pub text: String,
}

impl Display for DModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl Representation for DModule {
    fn name(&self) -> &'static str {
        "d_module"
    }

    /// Writes the module to `path` atomically: the text goes to a temporary file in the same
    /// directory, which then replaces `path`.
    fn materialize(&self, path: &Path) -> std::io::Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(self.text.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Renders the [TranslationUnit] produced by `build_model` as a [DModule].
pub struct EmitD;

impl Tool for EmitD {
    fn name(&self) -> &'static str {
        "emit_d"
    }

    fn run(
        self: Box<Self>,
        context: RunContext,
        inputs: Vec<Id>,
    ) -> Result<Box<dyn Representation>, Box<dyn std::error::Error>> {
        let unit = context.input::<TranslationUnit>(inputs[0], "TranslationUnit")?;
        let config = EmitConfig::from_value(context.config.tool(self.name()))?;
        let path = context.config.output_path();
        let text = emit(unit, &config, &path)?;
        info!(
            "Emitted {} declarations ({} bytes) for {}",
            unit.declarations.len(),
            text.len(),
            path.display()
        );
        Ok(Box::new(DModule { path, text }))
    }
}

