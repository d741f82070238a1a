use crate::types::{Namespace, Reference, Target};
use std::collections::HashMap;

/// Where a type name was declared.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Symbol {
    Local,
    External { origin: String },
}

/// Every type name the front end saw, keyed by namespace and name.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<(Namespace, String), Symbol>,
}

impl SymbolTable {
    /// Declares a name from the entry header. Shadows an external declaration of the same name.
    pub fn declare_local(&mut self, namespace: Namespace, name: &str) {
        self.symbols
            .insert((namespace, name.to_string()), Symbol::Local);
    }

    /// Declares a name from an included header, unless the name is already known.
    pub fn declare_external(&mut self, namespace: Namespace, name: &str, origin: &str) {
        self.symbols
            .entry((namespace, name.to_string()))
            .or_insert_with(|| Symbol::External {
                origin: origin.to_string(),
            });
    }

    pub fn lookup(&self, namespace: Namespace, name: &str) -> Option<&Symbol> {
        self.symbols.get(&(namespace, name.to_string()))
    }

    /// Binds `reference` to its declaration. Returns false if there is none.
    pub fn resolve(&self, reference: &mut Reference) -> bool {
        reference.target = match self.lookup(reference.namespace, &reference.name) {
            Some(Symbol::Local) => Target::Local,
            Some(Symbol::External { origin }) => Target::External {
                origin: origin.clone(),
            },
            None => Target::Unresolved,
        };
        reference.target != Target::Unresolved
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
