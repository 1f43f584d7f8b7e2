/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The native C/C++ library rule layer.
//!
//! Turns a declarative description of a C/C++ library into concrete,
//! on-demand build rules (a header symlink tree, a static archive, a shared
//! object) and exposes those rules through the [`NativeLinkable`] contract,
//! so consumer rules can depend on a library transitively without knowing
//! whether it is built from source or prebuilt.
//!
//! Rule variants are selected by [`Flavor`] tags on build targets and
//! materialized at most once per fully flavored target by the
//! [`BuildRuleResolver`]. No filesystem I/O or subprocess execution happens
//! in this layer; rules are pure computations over declared flags and
//! deterministic output paths, consumed by an execution phase elsewhere.
//!
//! [`Flavor`]: flavor::Flavor
//! [`BuildRuleResolver`]: rules::BuildRuleResolver
//! [`NativeLinkable`]: link::NativeLinkable

pub mod archive;
pub mod flavor;
pub mod library;
pub mod link;
pub mod link_rule;
pub mod packaging;
pub mod paths;
pub mod platform;
pub mod prebuilt;
pub mod preprocessor;
pub mod rules;
pub mod symlink_tree;
pub mod target;
