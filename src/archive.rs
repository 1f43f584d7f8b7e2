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

/// A static archive node. Owns the deterministic output location; archiving
/// the object files happens in the execution layer.
#[derive(Debug, Allocative)]
pub struct Archive {
    target: BuildTarget,
    output: PathBuf,
}

impl Archive {
    pub fn new(target: BuildTarget, output: PathBuf) -> Archive {
        Archive { target, output }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl BuildRule for Archive {
    fn build_target(&self) -> &BuildTarget {
        &self.target
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
