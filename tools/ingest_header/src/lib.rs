//! Loads the entry header and every header it transitively includes into a [HeaderSet]
//! representation.

mod directives;

pub use directives::{IncludeDirective, scan_includes};
use h2d_core::config::Language;
use h2d_core::tools::{RunContext, Tool};
use h2d_core::{Id, Location, Representation};
use std::collections::{HashSet, VecDeque};
use std::fmt::{self, Display};
use std::fs::read_to_string;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Fatal ingestion errors.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{}: file not found", path.display())]
    FileNotFound { path: PathBuf },

    #[error("{included_from}: included file not found: {target}")]
    IncludeNotFound {
        target: String,
        included_from: Location,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
}

/// One loaded header.
#[derive(Debug)]
pub struct HeaderFile {
    pub path: PathBuf,
    pub text: String,
    pub includes: Vec<IncludeDirective>,
}

/// The entry header plus every header reachable from it through include directives that could
/// be resolved against the include search path. `headers[0]` is the entry header; the rest are
/// in discovery order.
#[derive(Debug)]
pub struct HeaderSet {
    pub headers: Vec<HeaderFile>,
    pub include_paths: Vec<PathBuf>,
    pub defines: Vec<String>,
    pub language: Language,
    /// Angled includes that are left to the front end's system search path.
    pub system_includes: Vec<String>,
}

impl HeaderSet {
    pub fn entry(&self) -> &HeaderFile {
        &self.headers[0]
    }

    /// Returns the loaded header at `path`, if any.
    pub fn get(&self, path: &Path) -> Option<&HeaderFile> {
        self.headers.iter().find(|h| h.path == path)
    }
}

impl Display for HeaderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} header(s) from {}",
            self.headers.len(),
            self.entry().path.display()
        )
    }
}

impl Representation for HeaderSet {
    fn name(&self) -> &'static str {
        "header_set"
    }
}

/// Search configuration for [ingest].
#[derive(Clone, Debug)]
pub struct SearchPath {
    pub include_paths: Vec<PathBuf>,
    pub defines: Vec<String>,
    pub language: Language,
}

/// Loads `entry` and the headers it includes, transitively.
///
/// Each header is loaded once, so include cycles terminate here and are left to the front end
/// to diagnose. A quoted include that cannot be found is fatal unless it sits inside a
/// conditional block. Angled includes that are not under an include path are left to the front
/// end's system headers.
pub fn ingest(entry: &Path, search: SearchPath) -> Result<HeaderSet, IngestError> {
    if !entry.is_file() {
        return Err(IngestError::FileNotFound {
            path: entry.to_path_buf(),
        });
    }

    let mut headers = Vec::new();
    let mut system_includes = Vec::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([entry.to_path_buf()]);
    visited.insert(identity(entry));

    while let Some(path) = queue.pop_front() {
        let text = read_to_string(&path).map_err(|source| IngestError::Read {
            path: path.clone(),
            source,
        })?;
        let includes = scan_includes(&text);
        for include in &includes {
            match resolve(&path, include, &search.include_paths) {
                Some(found) => {
                    if visited.insert(identity(&found)) {
                        debug!("{} includes {}", path.display(), found.display());
                        queue.push_back(found);
                    }
                }
                None if include.angled || include.conditional => {
                    debug!(
                        "Leaving {} (included from {}) to the front end",
                        include.target,
                        path.display()
                    );
                    if !system_includes.contains(&include.target) {
                        system_includes.push(include.target.clone());
                    }
                }
                None => {
                    return Err(IngestError::IncludeNotFound {
                        target: include.target.clone(),
                        included_from: Location::new(path.display().to_string(), include.line, 1),
                    });
                }
            }
        }
        headers.push(HeaderFile {
            path,
            text,
            includes,
        });
    }

    Ok(HeaderSet {
        headers,
        include_paths: search.include_paths,
        defines: search.defines,
        language: search.language,
        system_includes,
    })
}

/// Finds the file an include directive refers to.
fn resolve(from: &Path, include: &IncludeDirective, include_paths: &[PathBuf]) -> Option<PathBuf> {
    let local = (!include.angled)
        .then(|| from.parent().map(|dir| dir.join(&include.target)))
        .flatten();
    local
        .into_iter()
        .chain(include_paths.iter().map(|dir| dir.join(&include.target)))
        .find(|candidate| candidate.is_file())
}

/// Key used to detect that two paths name the same header.
fn identity(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Loads the entry header named by the configuration.
pub struct IngestHeader {
    entry: PathBuf,
    search: SearchPath,
}

impl IngestHeader {
    pub fn new(entry: &Path, search: SearchPath) -> IngestHeader {
        IngestHeader {
            entry: entry.into(),
            search,
        }
    }
}

impl Tool for IngestHeader {
    fn name(&self) -> &'static str {
        "ingest_header"
    }

    fn run(
        self: Box<Self>,
        _context: RunContext,
        _inputs: Vec<Id>,
    ) -> Result<Box<dyn Representation>, Box<dyn std::error::Error>> {
        let headers = ingest(&self.entry, self.search)?;
        info!(
            "Loaded {} headers from {} ({} left to the front end).",
            headers.headers.len(),
            self.entry.display(),
            headers.system_includes.len()
        );
        Ok(Box::new(headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h2d_core::test_util::tempdir;
    use std::fs::{create_dir, write};
    use tempfile::TempDir;

    fn search(include_paths: Vec<PathBuf>) -> SearchPath {
        SearchPath {
            include_paths,
            defines: Vec::new(),
            language: Language::C,
        }
    }

    fn tree(files: &[(&str, &str)]) -> TempDir {
        let dir = tempdir().unwrap();
        for (name, contents) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                let _ = create_dir(parent);
            }
            write(path, contents).unwrap();
        }
        dir
    }

    #[test]
    fn missing_entry_is_file_not_found() {
        let dir = tree(&[]);
        let err = ingest(&dir.path().join("missing.h"), search(Vec::new())).unwrap_err();
        assert!(matches!(err, IngestError::FileNotFound { .. }));
    }

    #[test]
    fn transitive_includes_in_discovery_order() {
        let dir = tree(&[
            ("main.h", "#include \"a.h\"\n#include <inc/b.h>\n"),
            ("a.h", "#include \"c.h\"\nint a;\n"),
            ("c.h", "int c;\n"),
            ("inc/b.h", "int b;\n"),
        ]);
        let set = ingest(
            &dir.path().join("main.h"),
            search(vec![dir.path().to_path_buf()]),
        )
        .unwrap();
        let names: Vec<_> = set
            .headers
            .iter()
            .map(|h| h.path.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            ["main.h", "a.h", "inc/b.h", "c.h"].map(PathBuf::from)
        );
        assert_eq!(set.entry().includes.len(), 2);
    }

    #[test]
    fn include_cycles_terminate() {
        let dir = tree(&[("a.h", "#include \"b.h\"\n"), ("b.h", "#include \"a.h\"\n")]);
        let set = ingest(&dir.path().join("a.h"), search(Vec::new())).unwrap();
        assert_eq!(set.headers.len(), 2);
    }

    #[test]
    fn missing_quoted_include_is_fatal() {
        let dir = tree(&[("main.h", "int x;\n#include \"nope.h\"\n")]);
        let err = ingest(&dir.path().join("main.h"), search(Vec::new())).unwrap_err();
        match err {
            IngestError::IncludeNotFound {
                target,
                included_from,
            } => {
                assert_eq!(target, "nope.h");
                assert_eq!(included_from.line, 2);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn system_and_conditional_includes_are_delegated() {
        let dir = tree(&[(
            "main.h",
            "#include <stdio.h>\n#ifdef _WIN32\n#include \"windows_only.h\"\n#endif\n",
        )]);
        let set = ingest(&dir.path().join("main.h"), search(Vec::new())).unwrap();
        assert_eq!(set.headers.len(), 1);
        assert_eq!(set.system_includes, ["stdio.h", "windows_only.h"]);
    }
}
