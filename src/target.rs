/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::collections::BTreeSet;
use std::fmt;

use allocative::Allocative;
use dupe::Dupe;

use crate::flavor::Flavor;

#[derive(Debug, thiserror::Error)]
enum BuildTargetError {
    #[error("Invalid build target `{0}`: expected `//base/path:name[#flavor,...]`")]
    Invalid(String),
}

/// A build target: a base path, a short name, and a set of flavor tags.
///
/// The fully flavored form is the identity key for rule memoization, so
/// `Eq`/`Hash`/`Ord` cover all three fields. Flavors are an unordered set;
/// two targets differing only in the order flavors were attached are the
/// same target.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Allocative)]
pub struct BuildTarget {
    base_path: String,
    short_name: String,
    flavors: BTreeSet<Flavor>,
}

impl BuildTarget {
    pub fn new(base_path: impl Into<String>, short_name: impl Into<String>) -> BuildTarget {
        BuildTarget {
            base_path: base_path.into(),
            short_name: short_name.into(),
            flavors: BTreeSet::new(),
        }
    }

    /// Parse the `//base/path:name[#flavor,...]` rendering produced by
    /// `Display`. The two round-trip deterministically.
    pub fn parse(s: &str) -> anyhow::Result<BuildTarget> {
        let invalid = || BuildTargetError::Invalid(s.to_owned());
        let rest = s.strip_prefix("//").ok_or_else(invalid)?;
        let (base_path, name_part) = rest.split_once(':').ok_or_else(invalid)?;
        let (short_name, flavors_part) = match name_part.split_once('#') {
            Some((name, flavors)) => (name, Some(flavors)),
            None => (name_part, None),
        };
        if short_name.is_empty() || base_path.contains(':') {
            return Err(invalid().into());
        }
        let mut target = BuildTarget::new(base_path, short_name);
        if let Some(flavors) = flavors_part {
            for flavor in flavors.split(',') {
                target.flavors.insert(Flavor::new(flavor)?);
            }
        }
        Ok(target)
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn flavors(&self) -> &BTreeSet<Flavor> {
        &self.flavors
    }

    pub fn is_flavored(&self) -> bool {
        !self.flavors.is_empty()
    }

    /// The flavor suffix as it appears in the rendered target and in output
    /// directory names: sorted, comma separated.
    pub fn flavors_name(&self) -> String {
        let mut out = String::new();
        for flavor in &self.flavors {
            if !out.is_empty() {
                out.push(',');
            }
            out.push_str(flavor.as_str());
        }
        out
    }

    /// This target extended with additional flavors. A deterministic,
    /// order-independent set union: attaching the same flavors in any order
    /// yields an equal target.
    pub fn with_flavors(&self, extra: impl IntoIterator<Item = Flavor>) -> BuildTarget {
        let mut flavors = self.flavors.clone();
        flavors.extend(extra);
        BuildTarget {
            base_path: self.base_path.clone(),
            short_name: self.short_name.clone(),
            flavors,
        }
    }

    pub fn unflavored(&self) -> BuildTarget {
        BuildTarget::new(&*self.base_path, &*self.short_name)
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//{}:{}", self.base_path, self.short_name)?;
        if self.is_flavored() {
            write!(f, "#{}", self.flavors_name())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_trips() {
        for s in [
            "//foo/bar:baz",
            "//foo/bar:baz#shared",
            "//foo/bar:baz#linux-x86_64,shared",
        ] {
            let target = BuildTarget::parse(s).unwrap();
            assert_eq!(s, target.to_string());
            assert_eq!(target, BuildTarget::parse(&target.to_string()).unwrap());
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(BuildTarget::parse("foo/bar:baz").is_err());
        assert!(BuildTarget::parse("//foo/bar").is_err());
        assert!(BuildTarget::parse("//foo/bar:").is_err());
        assert!(BuildTarget::parse("//foo:baz#").is_err());
    }

    #[test]
    fn test_flavor_union_is_order_independent() {
        let base = BuildTarget::new("foo", "bar");
        let shared = Flavor::testing_new("shared");
        let platform = Flavor::testing_new("linux-x86_64");
        let a = base.with_flavors([shared.dupe(), platform.dupe()]);
        let b = base.with_flavors([platform.dupe()]).with_flavors([shared.dupe()]);
        assert_eq!(a, b);
        // Re-attaching an existing flavor is a no-op.
        assert_eq!(a, a.with_flavors([shared]));
    }

    #[test]
    fn test_unflavored_strips_flavors() {
        let target = BuildTarget::parse("//foo:bar#shared").unwrap();
        assert_eq!("//foo:bar", target.unflavored().to_string());
        assert!(!target.unflavored().is_flavored());
    }
}
