//! The command-line arguments and configuration system for [crate::transpile] and the `h2d`
//! binary.

use clap::Parser;
use config::FileFormat::Toml;
use directories::ProjectDirs;
use h2d_core::config::{Config, unknown_field_warning};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Command-line arguments for the `h2d` binary.
#[derive(Debug, Parser)]
#[command(name = "h2d", about = "Translates C and Objective-C headers into D modules")]
pub struct Args {
    /// The header to translate.
    // Should always be present unless using --print-config-path
    pub input: Option<PathBuf>,

    /// Path of the D file to write. Defaults to the input with a `.d` extension.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Parse the headers as Objective-C. Also accepted as `-ObjC`.
    #[arg(long)]
    pub objc: bool,

    /// Add a directory to the include search path.
    #[arg(short = 'I', value_name = "PATH")]
    pub include: Vec<PathBuf>,

    /// Define a macro for the front end; format NAME or NAME=VALUE.
    #[arg(short = 'D', value_name = "MACRO")]
    pub define: Vec<String>,

    /// Only qualify references to declarations from headers whose path matches this regex.
    #[arg(long)]
    pub import_filter: Option<String>,

    /// Prefix for references to declarations from other headers, e.g. `mymodule.`.
    #[arg(long)]
    pub import_prefix: Option<String>,

    /// Package of the generated module.
    #[arg(long)]
    pub package: Option<String>,

    /// Set a configuration value; format $NAME=$VALUE.
    #[arg(long, short)]
    pub config: Vec<String>,

    /// Log each stage and declaration.
    #[arg(short, long)]
    pub verbose: bool,

    /// Prints out the location of the config file.
    #[arg(long)]
    pub print_config_path: bool,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to parse config value {0:?}; no '=' found")]
    MalformedOverride(String),

    #[error("no input header given")]
    MissingInput,

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

/// Rewrites clang's spelling of the Objective-C flag into one clap understands.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| match arg == "-ObjC" {
            true => "--objc".into(),
            false => arg,
        })
        .collect()
}

/// Performs parsing and validation of the config; to be called by main() before executing any
/// code that tries to retrieve the config.
///
/// Returns the config, or None if a command line flag that calls for an early exit (such as
/// --print-config-path) was provided.
pub fn initialize(args: &Args) -> Result<Option<Config>, CliError> {
    let dirs = ProjectDirs::from("", "", "h2d");
    if args.print_config_path {
        match &dirs {
            Some(dirs) => println!("Config file location: {:?}", config_file(dirs.config_dir())),
            None => println!("No config file location: no home directory"),
        }
        return Ok(None);
    }
    let config = load_config(args, dirs.as_ref().map(ProjectDirs::config_dir))?;
    unknown_field_warning("", &config.unknown);
    Ok(Some(config))
}

fn load_config(args: &Args, config_dir: Option<&Path>) -> Result<Config, CliError> {
    let mut settings = config::Config::builder().add_source(config::File::from_str(
        include_str!("../default_config.toml"),
        Toml,
    ));
    if let Some(config_dir) = config_dir {
        settings =
            settings.add_source(config::File::from(config_file(config_dir)).required(false));
    }
    settings =
        settings.add_source(config::File::from(PathBuf::from("config.toml")).required(false));
    for config_arg in &args.config {
        let Some((name, value)) = config_arg.split_once('=') else {
            return Err(CliError::MalformedOverride(config_arg.clone()));
        };
        settings = settings.set_override(name, override_value(value))?;
    }

    // We need to set an override so that deserializing the config does not error.
    // However, the config crate does not support providing a Path in an override.
    // We could convert to a string and back, but that can be lossy. Instead, this just sets a
    // blank value and then corrects it after deserialization.
    if args.input.is_some() {
        settings = settings.set_override("input", " ")?;
    }
    if args.objc {
        settings = settings.set_override("objc", true)?;
    }
    if !args.define.is_empty() {
        settings = settings.set_override("defines", args.define.clone())?;
    }
    if let Some(filter) = &args.import_filter {
        settings = settings.set_override("import_filter", filter.as_str())?;
    }
    if let Some(prefix) = &args.import_prefix {
        settings = settings.set_override("import_prefix", prefix.as_str())?;
    }
    if let Some(package) = &args.package {
        settings = settings.set_override("tools.emit_d.package", package.as_str())?;
    }

    let built = settings.build()?;
    if args.input.is_none() && built.get_string("input").is_err() {
        return Err(CliError::MissingInput);
    }
    let mut config: Config = built.try_deserialize()?;
    if let Some(ref input) = args.input {
        config.input = input.clone();
    }
    if args.output.is_some() {
        config.output = args.output.clone();
    }
    if !args.include.is_empty() {
        config.include_paths = args.include.clone();
    }
    Ok(config)
}

/// Types a `--config` value. Tool tables are kept as JSON, so without this `true` would reach
/// them as a string.
fn override_value(value: &str) -> config::Value {
    if let Ok(flag) = value.parse::<bool>() {
        return flag.into();
    }
    if let Ok(number) = value.parse::<i64>() {
        return number.into();
    }
    value.into()
}

/// Returns the config file path, given the config directory.
fn config_file(config_dir: &Path) -> PathBuf {
    [config_dir, "translate.toml".as_ref()].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use h2d_core::config::Language;

    fn parse(args: &[&str]) -> Args {
        Args::parse_from(normalize_args(args.iter().copied()))
    }

    #[test]
    fn flags_in_clang_spelling() {
        let args = parse(&[
            "h2d",
            "foo.h",
            "-ObjC",
            "-Iinclude",
            "-I",
            "vendor",
            "-DDEBUG",
            "-DLEVEL=2",
            "-o",
            "out/foo.d",
        ]);
        assert!(args.objc);
        assert_eq!(args.include, [PathBuf::from("include"), "vendor".into()]);
        assert_eq!(args.define, ["DEBUG", "LEVEL=2"]);
        assert_eq!(args.output, Some("out/foo.d".into()));
    }

    #[cfg(not(miri))]
    #[test]
    fn load_config_test() {
        use h2d_core::test_util::tempdir;
        use std::{fs, io::Write as _};
        let config_dir = tempdir().unwrap();

        let config = load_config(&parse(&["", "a.h"]), Some(config_dir.path())).unwrap();
        assert_eq!(config.input, AsRef::<Path>::as_ref("a.h"));
        assert_eq!(config.language(), Language::C);
        assert_eq!(config.output_path(), PathBuf::from("a.d"));
        assert_eq!(config.tool("c_ast")["clang"], "clang");

        fs::File::create(config_file(config_dir.path()))
            .unwrap()
            .write_all(
                br#"
                    input = "b.h"
                    import_prefix = "deps."
                    [tools.emit_d]
                    package = "bindings"
                "#,
            )
            .unwrap();
        let config = load_config(&parse(&[""]), Some(config_dir.path())).unwrap();
        assert_eq!(config.input, AsRef::<Path>::as_ref("b.h"));
        assert_eq!(config.import_prefix.as_deref(), Some("deps."));
        assert_eq!(config.tool("emit_d")["package"], "bindings");
        // Verify the --config flag overrides the user's config file.
        let config = load_config(
            &parse(&["", "--config", "input=c.h", "-c", "tools.emit_d.alias_enum_members=true"]),
            Some(config_dir.path()),
        )
        .unwrap();
        assert_eq!(config.input, AsRef::<Path>::as_ref("c.h"));
        assert_eq!(config.tool("emit_d")["alias_enum_members"], true);
        // Verify the command line overrides all the configuration options.
        let config = load_config(
            &parse(&[
                "",
                "--config",
                "input=d.h",
                "d2.h",
                "--package",
                "other",
                "--import-prefix",
                "m.",
                "-ObjC",
            ]),
            Some(config_dir.path()),
        )
        .unwrap();
        assert_eq!(config.input, AsRef::<Path>::as_ref("d2.h"));
        assert_eq!(config.tool("emit_d")["package"], "other");
        assert_eq!(config.import_prefix.as_deref(), Some("m."));
        assert_eq!(config.language(), Language::ObjectiveC);
    }

    #[cfg(not(miri))]
    #[test]
    fn config_errors() {
        use h2d_core::test_util::tempdir;
        let config_dir = tempdir().unwrap();
        assert!(matches!(
            load_config(&parse(&["", "a.h", "-c", "objc"]), Some(config_dir.path())),
            Err(CliError::MalformedOverride(_))
        ));
        assert!(matches!(
            load_config(&parse(&[""]), Some(config_dir.path())),
            Err(CliError::MissingInput)
        ));
    }
}
