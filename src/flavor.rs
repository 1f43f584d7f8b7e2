/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::collections::BTreeMap;
use std::sync::Arc;

use allocative::Allocative;
use derive_more::Display;
use dupe::Dupe;

use crate::target::BuildTarget;

#[derive(Debug, thiserror::Error)]
enum FlavorError {
    #[error("Invalid flavor `{0}`: must be non-empty and contain only ascii [a-zA-Z0-9-_.+]")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
enum FlavorDomainError {
    #[error("{target}: multiple \"{domain}\" flavors: {conflicting}")]
    AmbiguousFlavors {
        target: BuildTarget,
        domain: String,
        conflicting: String,
    },
    #[error("{target}: no \"{domain}\" flavor found; expected one of: {expected}")]
    MissingFlavor {
        target: BuildTarget,
        domain: String,
        expected: String,
    },
}

/// An opaque tag attached to a build target, selecting a variant along some
/// axis (platform, output kind). Flavors have no ordering semantics beyond
/// set membership.
#[derive(Clone, Dupe, Debug, Display, Hash, Eq, PartialEq, Ord, PartialOrd, Allocative)]
#[display(fmt = "{}", _0)]
pub struct Flavor(Arc<str>);

impl Flavor {
    pub fn new(name: &str) -> anyhow::Result<Flavor> {
        if name.is_empty()
            || !name
                .bytes()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, b'-' | b'_' | b'.' | b'+'))
        {
            return Err(FlavorError::Invalid(name.to_owned()).into());
        }
        Ok(Flavor(name.into()))
    }

    /// For flavors known valid at compile time.
    pub(crate) fn unchecked_new(name: &str) -> Flavor {
        Flavor(name.into())
    }

    pub fn testing_new(name: &str) -> Flavor {
        Flavor::new(name).unwrap()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn join_flavors<'a>(flavors: impl IntoIterator<Item = &'a Flavor>) -> String {
    flavors
        .into_iter()
        .map(Flavor::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A named, closed mapping from recognized flavors to typed variant values.
///
/// A target's flavor set intersected with one domain yields zero or one
/// matches; two or more is an error, since a target cannot simultaneously
/// request two variants of the same axis.
#[derive(Clone, Debug, Allocative)]
pub struct FlavorDomain<V> {
    name: String,
    translation: BTreeMap<Flavor, V>,
}

impl<V> FlavorDomain<V> {
    pub fn new(name: impl Into<String>, translation: BTreeMap<Flavor, V>) -> FlavorDomain<V> {
        FlavorDomain {
            name: name.into(),
            translation,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, flavor: &Flavor) -> bool {
        self.translation.contains_key(flavor)
    }

    pub fn flavors(&self) -> impl Iterator<Item = &Flavor> {
        self.translation.keys()
    }

    /// The domain member selected by `target`'s flavors, if any. Selecting
    /// more than one member of the domain is ambiguous and fatal.
    pub fn get_flavor_and_value(
        &self,
        target: &BuildTarget,
    ) -> anyhow::Result<Option<(Flavor, &V)>> {
        let matches: Vec<(&Flavor, &V)> = target
            .flavors()
            .iter()
            .filter_map(|f| self.translation.get_key_value(f))
            .collect();
        match matches.as_slice() {
            [] => Ok(None),
            [(flavor, value)] => Ok(Some(((*flavor).dupe(), *value))),
            _ => Err(FlavorDomainError::AmbiguousFlavors {
                target: target.clone(),
                domain: self.name.clone(),
                conflicting: join_flavors(matches.iter().map(|(f, _)| *f)),
            }
            .into()),
        }
    }

    /// Like `get_flavor_and_value`, but selecting nothing is an error naming
    /// the target and the domain's legal flavor set. Used where no default
    /// can be inferred; an arbitrary member is never picked silently.
    pub fn require_flavor_and_value(
        &self,
        target: &BuildTarget,
    ) -> anyhow::Result<(Flavor, &V)> {
        match self.get_flavor_and_value(target)? {
            Some(pair) => Ok(pair),
            None => Err(FlavorDomainError::MissingFlavor {
                target: target.clone(),
                domain: self.name.clone(),
                expected: join_flavors(self.translation.keys()),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use maplit::btreemap;

    use super::*;

    fn domain() -> FlavorDomain<u32> {
        FlavorDomain::new(
            "C/C++ Platform",
            btreemap! {
                Flavor::testing_new("linux-x86_64") => 1,
                Flavor::testing_new("iphoneos-arm64") => 2,
            },
        )
    }

    #[test]
    fn test_flavor_validation() {
        assert!(Flavor::new("linux-x86_64").is_ok());
        assert!(Flavor::new("").is_err());
        assert!(Flavor::new("no spaces").is_err());
        assert!(Flavor::new("no#hash").is_err());
    }

    #[test]
    fn test_no_match_is_none() {
        let target = BuildTarget::parse("//foo:bar#shared").unwrap();
        assert_eq!(None, domain().get_flavor_and_value(&target).unwrap());
    }

    #[test]
    fn test_single_match() {
        let target = BuildTarget::parse("//foo:bar#linux-x86_64,shared").unwrap();
        let domain = domain();
        let (flavor, value) = domain.get_flavor_and_value(&target).unwrap().unwrap();
        assert_eq!("linux-x86_64", flavor.as_str());
        assert_eq!(&1, value);
    }

    #[test]
    fn test_two_matches_is_ambiguous() {
        let target = BuildTarget::parse("//foo:bar#iphoneos-arm64,linux-x86_64").unwrap();
        let err = domain().get_flavor_and_value(&target).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("//foo:bar"), "{}", msg);
        assert!(msg.contains("C/C++ Platform"), "{}", msg);
        assert!(msg.contains("iphoneos-arm64"), "{}", msg);
        assert!(msg.contains("linux-x86_64"), "{}", msg);
    }

    #[test]
    fn test_require_names_legal_set() {
        let target = BuildTarget::parse("//foo:bar#shared").unwrap();
        let err = domain().require_flavor_and_value(&target).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("//foo:bar#shared"), "{}", msg);
        assert!(msg.contains("iphoneos-arm64"), "{}", msg);
        assert!(msg.contains("linux-x86_64"), "{}", msg);
    }
}
