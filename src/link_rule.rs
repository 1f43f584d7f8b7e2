/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::any::Any;
use std::path::Path;
use std::path::PathBuf;

use allocative::Allocative;

use crate::rules::BuildRule;
use crate::target::BuildTarget;

/// A shared-object link node: links `inputs` into `output` under the given
/// soname. The link itself runs in the execution layer; this node carries
/// the deterministic output location and the inputs that must exist first.
#[derive(Debug, Allocative)]
pub struct CxxLink {
    target: BuildTarget,
    output: PathBuf,
    soname: String,
    inputs: Vec<PathBuf>,
}

impl CxxLink {
    pub fn new(
        target: BuildTarget,
        output: PathBuf,
        soname: String,
        inputs: Vec<PathBuf>,
    ) -> CxxLink {
        CxxLink {
            target,
            output,
            soname,
            inputs,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// The runtime-linkable name, independent of the on-disk filename.
    pub fn soname(&self) -> &str {
        &self.soname
    }

    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }
}

impl BuildRule for CxxLink {
    fn build_target(&self) -> &BuildTarget {
        &self.target
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
