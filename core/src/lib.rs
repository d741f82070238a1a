//! Shared infrastructure for h2d: the intermediate representation that tools read from and
//! write to, the [tools::Tool] interface, configuration, and diagnostics.

pub mod config;
pub mod diagnostics;
pub mod test_util;
pub mod tools;

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one representation in the IR. Every tool invocation reserves an `Id` when it is
/// queued; its result is stored under that `Id`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Id(u64);

impl Id {
    /// Returns a new, process-unique `Id`.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Id {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Id(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Upcast helper so that `dyn Representation` values can be downcast to their concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A typed value stored in the IR (loaded headers, a parsed AST, the declaration model, the
/// rendered D module, ...).
pub trait Representation: AsAny + Display + Send + Sync {
    /// Name of this kind of representation, in snake case.
    fn name(&self) -> &'static str;

    /// Writes this representation to `path`. Representations that have no on-disk form keep
    /// the default, which writes nothing.
    fn materialize(&self, _path: &Path) -> std::io::Result<()> {
        Ok(())
    }
}

/// The intermediate representation of one translation run: every representation produced so
/// far, keyed by the `Id` reserved for the tool invocation that produced it.
///
/// Cloning is cheap; tools receive a snapshot of the IR as it was when they were launched.
#[derive(Clone, Default)]
pub struct TranslationIR {
    representations: HashMap<Id, Arc<dyn Representation>>,
}

impl TranslationIR {
    /// Returns true if a representation is stored under `id`.
    pub fn contains_id(&self, id: Id) -> bool {
        self.representations.contains_key(&id)
    }

    /// Returns the representation stored under `id`, if it exists and has type `R`.
    pub fn get<R: Representation>(&self, id: Id) -> Option<&R> {
        self.representations
            .get(&id)
            .and_then(|r| (**r).as_any().downcast_ref())
    }

    /// Iterates over all representations of type `R`.
    pub fn get_by_representation<R: Representation>(&self) -> impl Iterator<Item = (Id, &R)> {
        self.representations
            .iter()
            .filter_map(|(&id, r)| (**r).as_any().downcast_ref().map(|r| (id, r)))
    }

    /// Stores `representation` under `id`, replacing any previous value.
    pub fn insert_representation(&mut self, id: Id, representation: Box<dyn Representation>) {
        self.representations.insert(id, representation.into());
    }

    /// Iterates over every representation in the IR.
    pub fn iter(&self) -> impl Iterator<Item = (Id, &dyn Representation)> {
        self.representations.iter().map(|(&id, r)| (id, &**r))
    }
}

/// A position in a source file. Lines and columns are 1-based, as clang reports them.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Location {
        Location {
            file: file.into(),
            line,
            column,
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
