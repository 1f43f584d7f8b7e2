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
use regex::Regex;

use crate::flavor::Flavor;
use crate::platform::CxxPlatform;
use crate::preprocessor::CxxPreprocessorInput;
use crate::rules::BuildRuleResolver;

#[derive(Debug, thiserror::Error)]
enum PlatformFlagsError {
    #[error("Invalid platform flag pattern `{0}`: {1}")]
    BadPattern(String, regex::Error),
}

/// The link mode requested for a dependency edge.
#[derive(
    Copy, Clone, Dupe, Debug, derive_more::Display, Hash, Eq, PartialEq, Allocative
)]
pub enum LinkableDepType {
    #[display(fmt = "static")]
    Static,
    #[display(fmt = "shared")]
    Shared,
}

/// Ordered linker argument tokens plus the artifact paths that must exist
/// before link time. Token order is semantically significant; the artifact
/// set is exactly the paths textually embedded as trailing tokens.
#[derive(Clone, Debug, Default, Eq, PartialEq, Allocative)]
pub struct NativeLinkableInput {
    pub args: Vec<String>,
    pub artifacts: BTreeSet<PathBuf>,
}

impl NativeLinkableInput {
    pub fn new(args: Vec<String>, artifacts: BTreeSet<PathBuf>) -> NativeLinkableInput {
        NativeLinkableInput { args, artifacts }
    }

    /// Contributes nothing to the link (header-only libraries).
    pub fn empty() -> NativeLinkableInput {
        NativeLinkableInput::default()
    }
}

/// Select flags from an ordered `(pattern, flags)` override list by matching
/// the requesting platform's flavor. The first pattern matching the whole
/// flavor string wins; no match contributes nothing.
pub fn platform_flags(
    platform_flags: &[(String, Vec<String>)],
    platform_flavor: &Flavor,
) -> anyhow::Result<Vec<String>> {
    for (pattern, flags) in platform_flags {
        let re = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|e| PlatformFlagsError::BadPattern(pattern.clone(), e))?;
        if re.is_match(platform_flavor.as_str()) {
            return Ok(flags.clone());
        }
    }
    Ok(Vec::new())
}

/// The capability contract every consumable native library implements,
/// whether built from source or prebuilt. All operations are pure
/// computations over declared flags and already-resolved paths; sub-rules
/// are materialized through the resolver on first use.
pub trait NativeLinkable: Send + Sync {
    /// Header exposure for `platform`: include roots, header maps, exported
    /// per-source-type flags, and the rules producing the headers.
    fn cxx_preprocessor_input(
        &self,
        resolver: &BuildRuleResolver,
        platform: &CxxPlatform,
    ) -> anyhow::Result<CxxPreprocessorInput>;

    /// Ordered linker input for depending on this library in the given link
    /// mode: the library's unconditional linker flags in declared order,
    /// then matched platform override flags, then exactly one trailing
    /// artifact reference.
    fn native_linkable_input(
        &self,
        resolver: &BuildRuleResolver,
        platform: &CxxPlatform,
        dep_type: LinkableDepType,
    ) -> anyhow::Result<NativeLinkableInput>;

    /// The soname -> artifact mapping this library contributes at runtime.
    /// Keys are unique by construction: a library owns one soname per
    /// platform.
    fn shared_libraries(
        &self,
        resolver: &BuildRuleResolver,
        platform: &CxxPlatform,
    ) -> anyhow::Result<BTreeMap<String, PathBuf>>;
}
