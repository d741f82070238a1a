//! Qualification of references to declarations that live outside the generated module.

use decl_model::{Reference, Target};
use regex::Regex;

/// The import filter and prefix of a run.
#[derive(Debug, Default)]
pub struct ImportPolicy {
    filter: Option<Regex>,
    prefix: Option<String>,
}

/// How a reference is spelled in D.
#[derive(Debug, Eq, PartialEq)]
pub struct Qualified {
    pub name: String,
    /// Module to import for the spelling to resolve.
    pub import: Option<String>,
}

impl ImportPolicy {
    pub fn new(filter: Option<&str>, prefix: Option<&str>) -> Result<ImportPolicy, regex::Error> {
        Ok(ImportPolicy {
            filter: filter.map(Regex::new).transpose()?,
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
        })
    }

    /// Spells `reference`, qualified with the prefix when it names something from another
    /// module.
    ///
    /// External declarations are qualified if there is no filter or the filter matches the
    /// header they come from. Unresolved names are always qualified, since there is no header
    /// to match.
    pub fn qualify(&self, reference: &Reference, name: &str) -> Qualified {
        let qualify = match &reference.target {
            Target::Local => false,
            Target::External { origin } => self
                .filter
                .as_ref()
                .is_none_or(|filter| filter.is_match(origin)),
            Target::Unresolved => true,
        };
        match &self.prefix {
            Some(prefix) if qualify => Qualified {
                name: format!("{prefix}{name}"),
                import: prefix.strip_suffix('.').map(str::to_string),
            },
            _ => Qualified {
                name: name.to_string(),
                import: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decl_model::Namespace;

    fn reference(target: Target) -> Reference {
        Reference {
            namespace: Namespace::Ordinary,
            name: "Bar".into(),
            target,
        }
    }

    fn external(origin: &str) -> Reference {
        reference(Target::External {
            origin: origin.into(),
        })
    }

    #[test]
    fn filter_selects_external_headers() {
        let policy = ImportPolicy::new(Some("mymodule"), Some("mymodule.")).unwrap();
        assert_eq!(
            policy.qualify(&external("include/mymodule/bar.h"), "Bar"),
            Qualified {
                name: "mymodule.Bar".into(),
                import: Some("mymodule".into()),
            }
        );
        assert_eq!(
            policy.qualify(&external("/usr/include/stdio.h"), "Bar").name,
            "Bar"
        );
        assert_eq!(policy.qualify(&reference(Target::Local), "Bar").name, "Bar");
        assert_eq!(
            policy.qualify(&reference(Target::Unresolved), "Bar").name,
            "mymodule.Bar"
        );
    }

    #[test]
    fn without_a_filter_every_external_is_qualified() {
        let policy = ImportPolicy::new(None, Some("deps_")).unwrap();
        assert_eq!(
            policy.qualify(&external("/usr/include/stdio.h"), "FILE"),
            Qualified {
                name: "deps_FILE".into(),
                import: None,
            }
        );
    }

    #[test]
    fn without_a_prefix_nothing_is_qualified() {
        let policy = ImportPolicy::new(Some("mymodule"), None).unwrap();
        assert_eq!(
            policy.qualify(&external("mymodule.h"), "Bar"),
            Qualified {
                name: "Bar".into(),
                import: None,
            }
        );
        assert!(ImportPolicy::new(Some("("), None).is_err());
    }
}
