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
use dupe::Dupe;

use crate::target::BuildTarget;

/// Source languages whose preprocessor flags are tracked separately.
#[derive(
    Copy,
    Clone,
    Dupe,
    Debug,
    derive_more::Display,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Allocative
)]
pub enum CxxSourceType {
    #[display(fmt = "c")]
    C,
    #[display(fmt = "cxx")]
    Cxx,
    #[display(fmt = "objc")]
    ObjC,
    #[display(fmt = "objcxx")]
    ObjCxx,
    #[display(fmt = "assembler")]
    Assembler,
}

/// Header exposure maps: the symbolic include name consumers write in
/// `#include` directives mapped to the backing source path, and the full
/// base-path-qualified name mapped likewise.
#[derive(Clone, Debug, Default, Eq, PartialEq, Allocative)]
pub struct CxxHeaders {
    pub name_to_path: BTreeMap<PathBuf, PathBuf>,
    pub full_name_to_path: BTreeMap<PathBuf, PathBuf>,
}

/// Everything a consumer needs to preprocess against a library: include
/// roots, header maps, exported per-source-type flags, and the set of rules
/// producing the headers (for dependency wiring into the consumer's graph).
#[derive(Clone, Debug, Default, Eq, PartialEq, Allocative)]
pub struct CxxPreprocessorInput {
    pub rules: BTreeSet<BuildTarget>,
    pub preprocessor_flags: BTreeMap<CxxSourceType, Vec<String>>,
    pub headers: CxxHeaders,
    pub include_roots: Vec<PathBuf>,
}
