/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use allocative::Allocative;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use dupe::Dupe;

use crate::flavor::Flavor;
use crate::target::BuildTarget;

#[derive(Debug, thiserror::Error)]
enum BuildRuleError {
    #[error("internal error: rule created for `{requested}` reports target `{actual}`")]
    TargetMismatch {
        requested: BuildTarget,
        actual: BuildTarget,
    },
    #[error("Attempted to register a rule for `{0}` twice")]
    RegisteredRuleTwice(BuildTarget),
}

/// Construction-time parameters for a build rule: the target identity, the
/// declared dependency set, and the project root that all path resolution is
/// relative to. Immutable once constructed.
///
/// The project root is threaded explicitly; nothing in this layer reads an
/// ambient filesystem root.
#[derive(Clone, Debug, Allocative)]
pub struct BuildRuleParams {
    target: BuildTarget,
    deps: BTreeSet<BuildTarget>,
    project_root: PathBuf,
}

impl BuildRuleParams {
    pub fn new(
        target: BuildTarget,
        deps: BTreeSet<BuildTarget>,
        project_root: PathBuf,
    ) -> BuildRuleParams {
        BuildRuleParams {
            target,
            deps,
            project_root,
        }
    }

    pub fn target(&self) -> &BuildTarget {
        &self.target
    }

    pub fn deps(&self) -> &BTreeSet<BuildTarget> {
        &self.deps
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// The same deps and project root, rebased onto a (flavored) target.
    pub fn with_target(&self, target: BuildTarget) -> BuildRuleParams {
        BuildRuleParams {
            target,
            deps: self.deps.clone(),
            project_root: self.project_root.clone(),
        }
    }
}

/// A node in the action graph, uniquely identified by its fully flavored
/// target. Rules are produced once per identity and cached by the resolver;
/// they are never destroyed or rebuilt within one graph-construction session.
pub trait BuildRule: Allocative + fmt::Debug + Send + Sync {
    fn build_target(&self) -> &BuildTarget;

    /// The concrete rule, for kind checks at wiring seams.
    fn as_any(&self) -> &dyn Any;
}

/// A rule type: turns a target declaration into a build rule. Flavored
/// variants of one declaration are materialized through the same entry
/// point, dispatched on the flavors of `params.target()`.
pub trait Description {
    type Arg;

    /// Rule type name, for diagnostics.
    fn rule_type(&self) -> &'static str;

    fn create_build_rule(
        &self,
        params: BuildRuleParams,
        arg: &Self::Arg,
    ) -> anyhow::Result<Arc<dyn BuildRule>>;
}

/// The shared index of materialized rules, accessed concurrently during
/// graph construction.
///
/// `require_build_rule` provides get-or-create with single-flight collapsing:
/// concurrent requests for one flavored-target key result in exactly one
/// materialization, and every caller observes the identical instance.
#[derive(Default)]
pub struct BuildRuleResolver {
    rules: DashMap<BuildTarget, Arc<dyn BuildRule>>,
}

impl BuildRuleResolver {
    pub fn new() -> BuildRuleResolver {
        BuildRuleResolver {
            rules: DashMap::new(),
        }
    }

    pub fn get(&self, target: &BuildTarget) -> Option<Arc<dyn BuildRule>> {
        self.rules.get(target).map(|r| r.dupe())
    }

    /// Register an externally constructed rule, e.g. the generic unflavored
    /// library rules created during initial graph construction. Registering
    /// the same target twice is an error.
    pub fn add(&self, rule: Arc<dyn BuildRule>) -> anyhow::Result<Arc<dyn BuildRule>> {
        match self.rules.entry(rule.build_target().clone()) {
            Entry::Occupied(_) => {
                Err(BuildRuleError::RegisteredRuleTwice(rule.build_target().clone()).into())
            }
            Entry::Vacant(entry) => Ok(entry.insert(rule).dupe()),
        }
    }

    /// The rule for `params.target()` extended with `flavors`, materializing
    /// it via `create` on first request.
    ///
    /// The vacant entry holds its map shard locked until the new rule is
    /// inserted, so `create` runs at most once per flavored target and all
    /// concurrent callers observe the same completed instance. `create` must
    /// not call back into the resolver. A failed `create` inserts nothing.
    pub fn require_build_rule(
        &self,
        params: &BuildRuleParams,
        flavors: impl IntoIterator<Item = Flavor>,
        create: impl FnOnce(BuildRuleParams) -> anyhow::Result<Arc<dyn BuildRule>>,
    ) -> anyhow::Result<Arc<dyn BuildRule>> {
        let flavored = params.target().with_flavors(flavors);
        match self.rules.entry(flavored.clone()) {
            Entry::Occupied(entry) => Ok(entry.get().dupe()),
            Entry::Vacant(entry) => {
                tracing::debug!("materializing build rule for `{}`", flavored);
                let rule = create(params.with_target(flavored.clone()))?;
                if rule.build_target() != &flavored {
                    return Err(BuildRuleError::TargetMismatch {
                        requested: flavored,
                        actual: rule.build_target().clone(),
                    }
                    .into());
                }
                Ok(entry.insert(rule).dupe())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::archive::Archive;
    use crate::paths;

    fn params(target: &str) -> BuildRuleParams {
        BuildRuleParams::new(
            BuildTarget::parse(target).unwrap(),
            BTreeSet::new(),
            PathBuf::from("/repo"),
        )
    }

    fn archive_rule(params: BuildRuleParams) -> anyhow::Result<Arc<dyn BuildRule>> {
        let output = paths::static_library_path(params.target());
        Ok(Arc::new(Archive::new(params.target().clone(), output)))
    }

    #[test]
    fn test_create_runs_once_and_identity_is_shared() {
        let resolver = BuildRuleResolver::new();
        let params = params("//foo:bar");
        let creations = AtomicUsize::new(0);

        let first = resolver
            .require_build_rule(&params, [Flavor::testing_new("static")], |p| {
                creations.fetch_add(1, Ordering::SeqCst);
                archive_rule(p)
            })
            .unwrap();
        let second = resolver
            .require_build_rule(&params, [Flavor::testing_new("static")], |p| {
                creations.fetch_add(1, Ordering::SeqCst);
                archive_rule(p)
            })
            .unwrap();

        assert_eq!(1, creations.load(Ordering::SeqCst));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!("//foo:bar#static", first.build_target().to_string());
        assert_eq!(1, resolver.len());
    }

    #[test]
    fn test_flavor_order_does_not_change_identity() {
        let resolver = BuildRuleResolver::new();
        let params = params("//foo:bar");
        let a = Flavor::testing_new("linux-x86_64");
        let b = Flavor::testing_new("static");

        let first = resolver
            .require_build_rule(&params, [a.dupe(), b.dupe()], archive_rule)
            .unwrap();
        let second = resolver
            .require_build_rule(&params, [b, a], archive_rule)
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(1, resolver.len());
    }

    #[test]
    fn test_mismatched_rule_target_is_an_internal_error() {
        let resolver = BuildRuleResolver::new();
        let params = params("//foo:bar");

        let err = resolver
            .require_build_rule(&params, [Flavor::testing_new("static")], |p| {
                let other = p.target().unflavored();
                let output = paths::static_library_path(&other);
                Ok(Arc::new(Archive::new(other, output)) as Arc<dyn BuildRule>)
            })
            .unwrap_err();
        assert!(err.to_string().contains("internal error"), "{}", err);
        // Nothing retained from the failed creation.
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_failed_create_inserts_nothing() {
        let resolver = BuildRuleResolver::new();
        let params = params("//foo:bar");

        let err = resolver
            .require_build_rule(&params, [Flavor::testing_new("static")], |_| {
                anyhow::bail!("boom")
            })
            .unwrap_err();
        assert_eq!("boom", err.to_string());
        assert!(resolver.is_empty());

        // A later request succeeds and materializes fresh.
        let rule = resolver
            .require_build_rule(&params, [Flavor::testing_new("static")], archive_rule)
            .unwrap();
        assert_eq!("//foo:bar#static", rule.build_target().to_string());
    }

    #[test]
    fn test_add_twice_fails() {
        let resolver = BuildRuleResolver::new();
        let target = BuildTarget::parse("//foo:bar").unwrap();
        let rule: Arc<dyn BuildRule> = Arc::new(Archive::new(
            target.clone(),
            paths::static_library_path(&target),
        ));
        resolver.add(rule.dupe()).unwrap();
        assert!(resolver.add(rule).is_err());
    }
}
