/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The source-built C/C++ library variant.
//!
//! The generic [`CxxLibrary`] rule is a pure façade: it owns no compiled
//! artifacts and defers every query to flavor-qualified sub-rules (header
//! symlink tree, static archive, shared object) materialized lazily through
//! the resolver, at most once each.

use std::any::Any;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use allocative::Allocative;
use dupe::Dupe;
use once_cell::sync::Lazy;

use crate::archive::Archive;
use crate::flavor::Flavor;
use crate::flavor::FlavorDomain;
use crate::link;
use crate::link::LinkableDepType;
use crate::link::NativeLinkable;
use crate::link::NativeLinkableInput;
use crate::link_rule::CxxLink;
use crate::packaging::NativePackageable;
use crate::packaging::PackageComponents;
use crate::packaging::PackageableCollector;
use crate::paths;
use crate::platform;
use crate::platform::CxxPlatform;
use crate::preprocessor::CxxHeaders;
use crate::preprocessor::CxxPreprocessorInput;
use crate::preprocessor::CxxSourceType;
use crate::rules::BuildRule;
use crate::rules::BuildRuleParams;
use crate::rules::BuildRuleResolver;
use crate::rules::Description;
use crate::symlink_tree::SymlinkTree;
use crate::target::BuildTarget;

/// Flavor selecting a library's header symlink tree sub-rule.
pub static HEADER_SYMLINK_TREE_FLAVOR: Lazy<Flavor> =
    Lazy::new(|| Flavor::unchecked_new("header-symlink-tree"));
/// Flavor selecting a library's static archive sub-rule.
pub static STATIC_FLAVOR: Lazy<Flavor> = Lazy::new(|| Flavor::unchecked_new("static"));
/// Flavor selecting a library's shared object sub-rule.
pub static SHARED_FLAVOR: Lazy<Flavor> = Lazy::new(|| Flavor::unchecked_new("shared"));

#[derive(Copy, Clone, Dupe, Debug, Eq, PartialEq, Allocative)]
enum LibraryType {
    Headers,
    Static,
    Shared,
}

static LIBRARY_TYPE: Lazy<FlavorDomain<LibraryType>> = Lazy::new(|| {
    FlavorDomain::new(
        "C/C++ Library Type",
        BTreeMap::from([
            (HEADER_SYMLINK_TREE_FLAVOR.dupe(), LibraryType::Headers),
            (STATIC_FLAVOR.dupe(), LibraryType::Static),
            (SHARED_FLAVOR.dupe(), LibraryType::Shared),
        ]),
    )
});

#[derive(Debug, thiserror::Error)]
enum CxxLibraryError {
    #[error("internal error: rule for `{0}` is not a {1}")]
    WrongRuleKind(BuildTarget, &'static str),
}

fn downcast_rule<'a, T: BuildRule + 'static>(
    rule: &'a Arc<dyn BuildRule>,
    kind: &'static str,
) -> anyhow::Result<&'a T> {
    rule.as_any().downcast_ref::<T>().ok_or_else(|| {
        CxxLibraryError::WrongRuleKind(rule.build_target().clone(), kind).into()
    })
}

/// Declaration of a source-built C/C++ library, immutable once parsed.
#[derive(Clone, Debug, Default, Allocative)]
pub struct CxxLibraryArg {
    /// Symbolic include name -> backing source path, exposed through the
    /// header symlink tree.
    pub exported_headers: BTreeMap<PathBuf, PathBuf>,
    pub exported_preprocessor_flags: BTreeMap<CxxSourceType, Vec<String>>,
    /// Unconditional linker flags, in declared order.
    pub linker_flags: Vec<String>,
    /// Ordered (platform pattern, flags) overrides; first match wins.
    pub platform_linker_flags: Vec<(String, Vec<String>)>,
    pub link_whole: bool,
    pub soname: Option<String>,
}

/// Rule type for source-built C/C++ libraries.
#[derive(Clone, Debug, Allocative)]
pub struct CxxLibraryDescription {
    platforms: FlavorDomain<CxxPlatform>,
}

impl CxxLibraryDescription {
    pub fn new(platforms: FlavorDomain<CxxPlatform>) -> CxxLibraryDescription {
        CxxLibraryDescription { platforms }
    }

    fn create_header_symlink_tree(params: BuildRuleParams, arg: &CxxLibraryArg) -> SymlinkTree {
        let root = paths::header_symlink_tree_path(params.target());
        let links = arg.exported_headers.clone();
        let full_links = links
            .iter()
            .map(|(name, path)| {
                (
                    PathBuf::from(params.target().base_path()).join(name),
                    path.clone(),
                )
            })
            .collect();
        SymlinkTree::new(params.target().clone(), root, links, full_links)
    }

    fn create_static_archive(params: BuildRuleParams) -> Archive {
        let output = paths::static_library_path(params.target());
        Archive::new(params.target().clone(), output)
    }

    fn create_shared_library(
        params: BuildRuleParams,
        arg: &CxxLibraryArg,
        platform: &CxxPlatform,
    ) -> CxxLink {
        let soname = arg
            .soname
            .clone()
            .unwrap_or_else(|| platform::default_soname(params.target(), platform));
        let output = paths::shared_library_path(params.target(), &soname);
        // Object file inputs come from the compilation rules, which live
        // outside this layer.
        CxxLink::new(params.target().clone(), output, soname, Vec::new())
    }
}

impl Description for CxxLibraryDescription {
    type Arg = CxxLibraryArg;

    fn rule_type(&self) -> &'static str {
        "cxx_library"
    }

    /// Dispatch on the output-kind flavor: a selected kind builds that
    /// sub-rule (requiring a platform flavor), no kind builds the generic
    /// façade rule.
    fn create_build_rule(
        &self,
        params: BuildRuleParams,
        arg: &CxxLibraryArg,
    ) -> anyhow::Result<Arc<dyn BuildRule>> {
        let kind = LIBRARY_TYPE.get_flavor_and_value(params.target())?;
        match kind {
            Some((_, kind)) => {
                let kind = *kind;
                let (_, platform) = self.platforms.require_flavor_and_value(params.target())?;
                let platform = platform.dupe();
                Ok(match kind {
                    LibraryType::Headers => {
                        Arc::new(Self::create_header_symlink_tree(params, arg))
                    }
                    LibraryType::Static => Arc::new(Self::create_static_archive(params)),
                    LibraryType::Shared => {
                        Arc::new(Self::create_shared_library(params, arg, &platform))
                    }
                })
            }
            None => {
                // The generic placeholder consumers depend on. Platform
                // flavors must still be unambiguous here.
                self.platforms.get_flavor_and_value(params.target())?;
                Ok(Arc::new(CxxLibrary::new(params, arg.clone())))
            }
        }
    }
}

/// An action-graph representation of a source-built C/C++ library.
///
/// Owns no artifacts itself; its only stateful role is holding the declared
/// fields needed to assemble linker and preprocessor results once a
/// sub-rule's output path is known.
#[derive(Debug, Allocative)]
pub struct CxxLibrary {
    params: BuildRuleParams,
    arg: CxxLibraryArg,
}

impl CxxLibrary {
    pub fn new(params: BuildRuleParams, arg: CxxLibraryArg) -> CxxLibrary {
        CxxLibrary { params, arg }
    }

    fn require_header_symlink_tree(
        &self,
        resolver: &BuildRuleResolver,
        platform: &CxxPlatform,
    ) -> anyhow::Result<Arc<dyn BuildRule>> {
        resolver.require_build_rule(
            &self.params,
            [platform.flavor().dupe(), HEADER_SYMLINK_TREE_FLAVOR.dupe()],
            |p| Ok(Arc::new(CxxLibraryDescription::create_header_symlink_tree(p, &self.arg)) as _),
        )
    }

    fn require_static_archive(
        &self,
        resolver: &BuildRuleResolver,
        platform: &CxxPlatform,
    ) -> anyhow::Result<Arc<dyn BuildRule>> {
        resolver.require_build_rule(
            &self.params,
            [platform.flavor().dupe(), STATIC_FLAVOR.dupe()],
            |p| Ok(Arc::new(CxxLibraryDescription::create_static_archive(p)) as _),
        )
    }

    fn require_shared_library(
        &self,
        resolver: &BuildRuleResolver,
        platform: &CxxPlatform,
    ) -> anyhow::Result<Arc<dyn BuildRule>> {
        resolver.require_build_rule(
            &self.params,
            [platform.flavor().dupe(), SHARED_FLAVOR.dupe()],
            |p| {
                Ok(Arc::new(CxxLibraryDescription::create_shared_library(
                    p, &self.arg, platform,
                )) as _)
            },
        )
    }
}

impl BuildRule for CxxLibrary {
    fn build_target(&self) -> &BuildTarget {
        self.params.target()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl NativeLinkable for CxxLibrary {
    fn cxx_preprocessor_input(
        &self,
        resolver: &BuildRuleResolver,
        platform: &CxxPlatform,
    ) -> anyhow::Result<CxxPreprocessorInput> {
        let rule = self.require_header_symlink_tree(resolver, platform)?;
        let tree: &SymlinkTree = downcast_rule(&rule, "SymlinkTree")?;
        Ok(CxxPreprocessorInput {
            rules: BTreeSet::from([tree.build_target().clone()]),
            preprocessor_flags: self.arg.exported_preprocessor_flags.clone(),
            headers: CxxHeaders {
                name_to_path: tree.links().clone(),
                full_name_to_path: tree.full_links().clone(),
            },
            include_roots: vec![tree.root().to_owned()],
        })
    }

    fn native_linkable_input(
        &self,
        resolver: &BuildRuleResolver,
        platform: &CxxPlatform,
        dep_type: LinkableDepType,
    ) -> anyhow::Result<NativeLinkableInput> {
        let mut args = self.arg.linker_flags.clone();
        args.extend(link::platform_flags(
            &self.arg.platform_linker_flags,
            platform.flavor(),
        )?);
        let mut artifacts = BTreeSet::new();
        match dep_type {
            LinkableDepType::Shared => {
                let rule = self.require_shared_library(resolver, platform)?;
                let shared: &CxxLink = downcast_rule(&rule, "CxxLink")?;
                let path = shared.output().to_owned();
                args.push(path.display().to_string());
                artifacts.insert(path);
            }
            LinkableDepType::Static => {
                let rule = self.require_static_archive(resolver, platform)?;
                let archive: &Archive = downcast_rule(&rule, "Archive")?;
                let path = archive.output().to_owned();
                if self.arg.link_whole {
                    args.extend(platform.linker().link_whole(&path.display().to_string()));
                } else {
                    args.push(path.display().to_string());
                }
                artifacts.insert(path);
            }
        }
        Ok(NativeLinkableInput::new(args, artifacts))
    }

    fn shared_libraries(
        &self,
        resolver: &BuildRuleResolver,
        platform: &CxxPlatform,
    ) -> anyhow::Result<BTreeMap<String, PathBuf>> {
        let rule = self.require_shared_library(resolver, platform)?;
        let shared: &CxxLink = downcast_rule(&rule, "CxxLink")?;
        Ok(BTreeMap::from([(
            shared.soname().to_owned(),
            shared.output().to_owned(),
        )]))
    }
}

impl NativePackageable for CxxLibrary {
    fn required_packageables(&self) -> Vec<BuildTarget> {
        self.params.deps().iter().cloned().collect()
    }

    fn add_to_collector(&self, collector: &mut PackageableCollector) {
        collector.add_native_linkable(self.params.target().clone());
    }

    fn package_components(
        &self,
        resolver: &BuildRuleResolver,
        platform: &CxxPlatform,
    ) -> anyhow::Result<PackageComponents> {
        Ok(PackageComponents::native_only(
            self.shared_libraries(resolver, platform)?,
        ))
    }
}
