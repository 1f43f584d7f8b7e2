/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::any::Any;
use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use allocative::Allocative;

use crate::rules::BuildRule;
use crate::target::BuildTarget;

/// Exposes a library's headers under a stable include root.
///
/// The tree records its links; creating the symlinks on disk is the
/// execution layer's job.
#[derive(Debug, Allocative)]
pub struct SymlinkTree {
    target: BuildTarget,
    root: PathBuf,
    links: BTreeMap<PathBuf, PathBuf>,
    full_links: BTreeMap<PathBuf, PathBuf>,
}

impl SymlinkTree {
    pub fn new(
        target: BuildTarget,
        root: PathBuf,
        links: BTreeMap<PathBuf, PathBuf>,
        full_links: BTreeMap<PathBuf, PathBuf>,
    ) -> SymlinkTree {
        SymlinkTree {
            target,
            root,
            links,
            full_links,
        }
    }

    /// The include root consumers compile against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Symbolic include name -> backing source path.
    pub fn links(&self) -> &BTreeMap<PathBuf, PathBuf> {
        &self.links
    }

    /// Full base-path-qualified include name -> backing source path.
    pub fn full_links(&self) -> &BTreeMap<PathBuf, PathBuf> {
        &self.full_links
    }
}

impl BuildRule for SymlinkTree {
    fn build_target(&self) -> &BuildTarget {
        &self.target
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
