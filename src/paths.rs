/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Deterministic output path conventions.
//!
//! Every function here is a pure function of the (flavored) target, so paths
//! are reproducible across repeated graph-construction runs for the same
//! inputs. Paths are project relative; nothing here touches the filesystem.

use std::path::PathBuf;

use crate::target::BuildTarget;

const BIN_DIR: &str = "buck-out/bin";
const GEN_DIR: &str = "buck-out/gen";

fn flavored_dir_name(target: &BuildTarget) -> String {
    if target.is_flavored() {
        format!("{}#{}", target.short_name(), target.flavors_name())
    } else {
        target.short_name().to_owned()
    }
}

/// Scratch directory for a rule's intermediate outputs:
/// `buck-out/bin/<base_path>/<short_name>#<flavors>`.
pub fn bin_path(target: &BuildTarget) -> PathBuf {
    PathBuf::from(BIN_DIR)
        .join(target.base_path())
        .join(flavored_dir_name(target))
}

/// Directory for a rule's exposed generated outputs, under `buck-out/gen`.
pub fn gen_path(target: &BuildTarget) -> PathBuf {
    PathBuf::from(GEN_DIR)
        .join(target.base_path())
        .join(flavored_dir_name(target))
}

/// Root of a library's header symlink tree: the stable include root its
/// consumers compile against.
pub fn header_symlink_tree_path(target: &BuildTarget) -> PathBuf {
    gen_path(target)
}

/// `lib<short_name>.a` under the rule's scratch directory.
pub fn static_library_path(target: &BuildTarget) -> PathBuf {
    bin_path(target).join(format!("lib{}.a", target.short_name()))
}

/// The shared object, at its resolved soname, under the rule's scratch
/// directory.
pub fn shared_library_path(target: &BuildTarget, soname: &str) -> PathBuf {
    bin_path(target).join(soname)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_deterministic_and_flavor_qualified() {
        let target = BuildTarget::parse("//foo/bar:baz#linux-x86_64,static").unwrap();
        assert_eq!(
            PathBuf::from("buck-out/bin/foo/bar/baz#linux-x86_64,static/libbaz.a"),
            static_library_path(&target),
        );
        assert_eq!(static_library_path(&target), static_library_path(&target));

        let tree = BuildTarget::parse("//foo/bar:baz#header-symlink-tree,linux-x86_64").unwrap();
        assert_eq!(
            PathBuf::from("buck-out/gen/foo/bar/baz#header-symlink-tree,linux-x86_64"),
            header_symlink_tree_path(&tree),
        );

        let shared = BuildTarget::parse("//foo/bar:baz#linux-x86_64,shared").unwrap();
        assert_eq!(
            PathBuf::from("buck-out/bin/foo/bar/baz#linux-x86_64,shared/libbaz.so"),
            shared_library_path(&shared, "libbaz.so"),
        );
    }
}
