/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;

use allocative::Allocative;

use crate::platform::CxxPlatform;
use crate::rules::BuildRuleResolver;
use crate::target::BuildTarget;

/// The module/resource/native-library tri-map a downstream packaging rule
/// bundles from. This layer populates it; the consumer of the map is out of
/// scope.
#[derive(Clone, Debug, Default, Eq, PartialEq, Allocative)]
pub struct PackageComponents {
    pub modules: BTreeMap<PathBuf, PathBuf>,
    pub resources: BTreeMap<PathBuf, PathBuf>,
    pub native_libraries: BTreeMap<PathBuf, PathBuf>,
}

impl PackageComponents {
    pub fn new(
        modules: BTreeMap<PathBuf, PathBuf>,
        resources: BTreeMap<PathBuf, PathBuf>,
        native_libraries: BTreeMap<PathBuf, PathBuf>,
    ) -> PackageComponents {
        PackageComponents {
            modules,
            resources,
            native_libraries,
        }
    }

    /// Components for a plain native library: no modules or resources, one
    /// shared object entry per soname.
    pub fn native_only(shared_libraries: BTreeMap<String, PathBuf>) -> PackageComponents {
        PackageComponents {
            modules: BTreeMap::new(),
            resources: BTreeMap::new(),
            native_libraries: shared_libraries
                .into_iter()
                .map(|(soname, path)| (PathBuf::from(soname), path))
                .collect(),
        }
    }
}

/// Collects the native libraries discovered by a packaging traversal.
///
/// Provided libraries are recorded separately: their artifacts come from the
/// runtime environment and downstream packaging must not bundle them. This
/// layer preserves the hint without acting on it.
#[derive(Debug, Default)]
pub struct PackageableCollector {
    native_linkables: BTreeSet<BuildTarget>,
    provided_native_linkables: BTreeSet<BuildTarget>,
}

impl PackageableCollector {
    pub fn new() -> PackageableCollector {
        PackageableCollector::default()
    }

    pub fn add_native_linkable(&mut self, target: BuildTarget) {
        self.native_linkables.insert(target);
    }

    pub fn add_provided_native_linkable(&mut self, target: BuildTarget) {
        self.provided_native_linkables.insert(target);
    }

    pub fn native_linkables(&self) -> impl Iterator<Item = &BuildTarget> {
        self.native_linkables.iter()
    }

    pub fn provided_native_linkables(&self) -> impl Iterator<Item = &BuildTarget> {
        self.provided_native_linkables.iter()
    }
}

/// A node discoverable by the downstream packaging traversal.
pub trait NativePackageable {
    /// The dependencies the traversal must visit next.
    fn required_packageables(&self) -> Vec<BuildTarget>;

    fn add_to_collector(&self, collector: &mut PackageableCollector);

    /// The packaging contract entries this library contributes.
    fn package_components(
        &self,
        resolver: &BuildRuleResolver,
        platform: &CxxPlatform,
    ) -> anyhow::Result<PackageComponents>;
}
