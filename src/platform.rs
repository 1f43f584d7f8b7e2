/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::fmt;
use std::sync::Arc;

use allocative::Allocative;
use dupe::Dupe;

use crate::flavor::Flavor;
use crate::target::BuildTarget;

/// Linker-family specific argument syntax. Whole-archive bracketing differs
/// per family, so the strategy is selected by the platform rather than
/// hardcoded.
pub trait Linker: Allocative + fmt::Debug + Send + Sync {
    /// Wrap a static archive reference so every object in the archive is
    /// pulled into the link, bypassing dead-symbol stripping.
    fn link_whole(&self, archive: &str) -> Vec<String>;
}

/// GNU binutils family: paired start/end bracketing flags.
#[derive(Debug, Allocative)]
pub struct GnuLinker;

impl Linker for GnuLinker {
    fn link_whole(&self, archive: &str) -> Vec<String> {
        vec![
            "--whole-archive".to_owned(),
            archive.to_owned(),
            "--no-whole-archive".to_owned(),
        ]
    }
}

/// Darwin ld64 family: a single per-archive flag.
#[derive(Debug, Allocative)]
pub struct DarwinLinker;

impl Linker for DarwinLinker {
    fn link_whole(&self, archive: &str) -> Vec<String> {
        vec![
            "-Xlinker".to_owned(),
            "-force_load".to_owned(),
            "-Xlinker".to_owned(),
            archive.to_owned(),
        ]
    }
}

/// A concrete toolchain/platform a flavor names: the flavor itself, the
/// platform's shared-library naming convention, and its linker family.
#[derive(Clone, Dupe, Debug, Allocative)]
pub struct CxxPlatform {
    inner: Arc<CxxPlatformData>,
}

#[derive(Debug, Allocative)]
struct CxxPlatformData {
    flavor: Flavor,
    shared_library_extension: String,
    linker: Arc<dyn Linker>,
}

impl CxxPlatform {
    pub fn new(
        flavor: Flavor,
        shared_library_extension: impl Into<String>,
        linker: Arc<dyn Linker>,
    ) -> CxxPlatform {
        CxxPlatform {
            inner: Arc::new(CxxPlatformData {
                flavor,
                shared_library_extension: shared_library_extension.into(),
                linker,
            }),
        }
    }

    pub fn testing_new(flavor: &str) -> CxxPlatform {
        CxxPlatform::new(Flavor::testing_new(flavor), "so", Arc::new(GnuLinker))
    }

    pub fn flavor(&self) -> &Flavor {
        &self.inner.flavor
    }

    pub fn shared_library_extension(&self) -> &str {
        &self.inner.shared_library_extension
    }

    pub fn linker(&self) -> &dyn Linker {
        &*self.inner.linker
    }
}

/// Default soname when a library declares none: `lib<short_name>.<ext>`,
/// adjusted for the platform's naming convention. Pure, so repeated calls
/// for the same target and platform yield the identical string.
pub fn default_soname(target: &BuildTarget, platform: &CxxPlatform) -> String {
    format!(
        "lib{}.{}",
        target.short_name(),
        platform.shared_library_extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gnu_link_whole_brackets_the_archive() {
        assert_eq!(
            vec!["--whole-archive", "lib/libfoo.a", "--no-whole-archive"],
            GnuLinker.link_whole("lib/libfoo.a"),
        );
    }

    #[test]
    fn test_darwin_link_whole_is_per_archive() {
        assert_eq!(
            vec!["-Xlinker", "-force_load", "-Xlinker", "lib/libfoo.a"],
            DarwinLinker.link_whole("lib/libfoo.a"),
        );
    }

    #[test]
    fn test_default_soname_is_stable() {
        let target = BuildTarget::parse("//foo:foo").unwrap();
        let linux = CxxPlatform::testing_new("linux-x86_64");
        assert_eq!("libfoo.so", default_soname(&target, &linux));
        assert_eq!(
            default_soname(&target, &linux),
            default_soname(&target, &linux)
        );

        let mac = CxxPlatform::new(
            Flavor::testing_new("macosx-arm64"),
            "dylib",
            Arc::new(DarwinLinker),
        );
        assert_eq!("libfoo.dylib", default_soname(&target, &mac));
    }
}
