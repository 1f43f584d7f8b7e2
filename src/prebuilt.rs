/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The prebuilt C/C++ library variant.
//!
//! Rule construction is a small state machine on the requested flavors:
//! selecting the shared output kind synthesizes one real link action turning
//! the checked-in static archive into a shared object; otherwise the generic
//! placeholder rule is produced, with conventional artifact paths
//! precomputed and include directories resolved against the project root.

use std::any::Any;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use allocative::Allocative;
use dupe::Dupe;
use once_cell::sync::Lazy;

use crate::flavor::FlavorDomain;
use crate::library::SHARED_FLAVOR;
use crate::link;
use crate::link::LinkableDepType;
use crate::link::NativeLinkable;
use crate::link::NativeLinkableInput;
use crate::link_rule::CxxLink;
use crate::packaging::NativePackageable;
use crate::packaging::PackageComponents;
use crate::packaging::PackageableCollector;
use crate::paths;
use crate::platform::CxxPlatform;
use crate::preprocessor::CxxHeaders;
use crate::preprocessor::CxxPreprocessorInput;
use crate::preprocessor::CxxSourceType;
use crate::rules::BuildRule;
use crate::rules::BuildRuleParams;
use crate::rules::BuildRuleResolver;
use crate::rules::Description;
use crate::target::BuildTarget;

#[derive(Copy, Clone, Dupe, Debug, Eq, PartialEq, Allocative)]
enum PrebuiltLibraryType {
    Shared,
}

static LIBRARY_TYPE: Lazy<FlavorDomain<PrebuiltLibraryType>> = Lazy::new(|| {
    FlavorDomain::new(
        "C/C++ Library Type",
        BTreeMap::from([(SHARED_FLAVOR.dupe(), PrebuiltLibraryType::Shared)]),
    )
});

/// Declaration of a prebuilt C/C++ library. Unset fields fall back to the
/// documented conventions; absence is never an error.
#[derive(Clone, Debug, Allocative)]
pub struct PrebuiltCxxLibraryArg {
    /// Include directories relative to the target's base path.
    pub include_dirs: Vec<String>,
    /// Library name, defaulting to the target's short name.
    pub lib_name: Option<String>,
    /// Directory holding the checked-in archives, relative to the base path.
    pub lib_dir: String,
    /// Suppresses all linker-input contribution; header exposure remains.
    pub header_only: bool,
    /// The artifact is supplied by the runtime environment; packaging must
    /// not bundle it. Linker and header behavior are unchanged.
    pub provided: bool,
    pub link_whole: bool,
    pub exported_preprocessor_flags: BTreeMap<CxxSourceType, Vec<String>>,
    /// Unconditional linker flags, in declared order.
    pub linker_flags: Vec<String>,
    /// Ordered (platform pattern, flags) overrides; first match wins.
    pub platform_linker_flags: Vec<(String, Vec<String>)>,
    pub soname: Option<String>,
}

impl Default for PrebuiltCxxLibraryArg {
    fn default() -> PrebuiltCxxLibraryArg {
        PrebuiltCxxLibraryArg {
            include_dirs: vec!["include".to_owned()],
            lib_name: None,
            lib_dir: "lib".to_owned(),
            header_only: false,
            provided: false,
            link_whole: false,
            exported_preprocessor_flags: BTreeMap::new(),
            linker_flags: Vec::new(),
            platform_linker_flags: Vec::new(),
            soname: None,
        }
    }
}

impl PrebuiltCxxLibraryArg {
    fn lib_name<'a>(&'a self, target: &'a BuildTarget) -> &'a str {
        self.lib_name.as_deref().unwrap_or_else(|| target.short_name())
    }

    fn resolved_soname(&self, target: &BuildTarget, platform: &CxxPlatform) -> String {
        self.soname.clone().unwrap_or_else(|| {
            format!(
                "lib{}.{}",
                self.lib_name(target),
                platform.shared_library_extension()
            )
        })
    }

    /// The conventional checked-in archive location:
    /// `<base_path>/<lib_dir>/lib<lib_name>.a`.
    fn static_library_path(&self, target: &BuildTarget) -> PathBuf {
        PathBuf::from(target.base_path())
            .join(&self.lib_dir)
            .join(format!("lib{}.a", self.lib_name(target)))
    }
}

/// Rule type for prebuilt C/C++ libraries.
#[derive(Clone, Debug, Allocative)]
pub struct PrebuiltCxxLibraryDescription {
    platforms: FlavorDomain<CxxPlatform>,
}

impl PrebuiltCxxLibraryDescription {
    pub fn new(platforms: FlavorDomain<CxxPlatform>) -> PrebuiltCxxLibraryDescription {
        PrebuiltCxxLibraryDescription { platforms }
    }

    /// The one real link action in this layer: synthesize a shared object
    /// from the checked-in static archive.
    fn create_shared_library(
        params: BuildRuleParams,
        arg: &PrebuiltCxxLibraryArg,
        platform: &CxxPlatform,
    ) -> CxxLink {
        let target = params.target();
        let soname = arg.resolved_soname(target, platform);
        let static_library = arg.static_library_path(target);
        let output = paths::shared_library_path(target, &soname);
        CxxLink::new(target.clone(), output, soname, vec![static_library])
    }

    /// The generic placeholder. Conventional artifact paths are precomputed
    /// (existence is the execution layer's concern, not checked here) and
    /// declared include directories are resolved to absolute paths.
    fn create_placeholder(
        params: BuildRuleParams,
        arg: &PrebuiltCxxLibraryArg,
    ) -> PrebuiltCxxLibrary {
        let target = params.target().clone();
        let lib_name = arg.lib_name(&target).to_owned();
        let static_library_path = arg.static_library_path(&target);
        let shared_library_path = PathBuf::from(target.base_path())
            .join(&arg.lib_dir)
            .join(format!("lib{}.so", lib_name));
        let include_dirs = arg
            .include_dirs
            .iter()
            .map(|dir| {
                params
                    .project_root()
                    .join(target.base_path())
                    .join(dir)
            })
            .collect();
        PrebuiltCxxLibrary {
            params,
            arg: arg.clone(),
            include_dirs,
            static_library_path,
            shared_library_path,
        }
    }
}

impl Description for PrebuiltCxxLibraryDescription {
    type Arg = PrebuiltCxxLibraryArg;

    fn rule_type(&self) -> &'static str {
        "prebuilt_cxx_library"
    }

    fn create_build_rule(
        &self,
        params: BuildRuleParams,
        arg: &PrebuiltCxxLibraryArg,
    ) -> anyhow::Result<Arc<dyn BuildRule>> {
        let kind = LIBRARY_TYPE.get_flavor_and_value(params.target())?;
        // Ambiguous platform flavors are fatal on either branch.
        let platform = self.platforms.get_flavor_and_value(params.target())?;
        match kind {
            Some((_, PrebuiltLibraryType::Shared)) => {
                let platform = match platform {
                    Some((_, platform)) => platform.dupe(),
                    None => {
                        let (_, platform) =
                            self.platforms.require_flavor_and_value(params.target())?;
                        platform.dupe()
                    }
                };
                Ok(Arc::new(Self::create_shared_library(params, arg, &platform)))
            }
            None => Ok(Arc::new(Self::create_placeholder(params, arg))),
        }
    }
}

/// An action-graph representation of a prebuilt C/C++ library: the generic
/// placeholder dependents consume to reach the real artifacts.
#[derive(Debug, Allocative)]
pub struct PrebuiltCxxLibrary {
    params: BuildRuleParams,
    arg: PrebuiltCxxLibraryArg,
    include_dirs: Vec<PathBuf>,
    static_library_path: PathBuf,
    shared_library_path: PathBuf,
}

impl PrebuiltCxxLibrary {
    pub fn is_provided(&self) -> bool {
        self.arg.provided
    }

    pub fn is_header_only(&self) -> bool {
        self.arg.header_only
    }

    /// Resolved include roots, absolute.
    pub fn include_dirs(&self) -> &[PathBuf] {
        &self.include_dirs
    }

    /// The conventional checked-in archive location.
    pub fn static_library_path(&self) -> &Path {
        &self.static_library_path
    }

    /// The conventional checked-in shared object location. The consumable
    /// shared object is the synthesized sub-rule's output; this path is for
    /// the execution layer.
    pub fn conventional_shared_library_path(&self) -> &Path {
        &self.shared_library_path
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
                Ok(Arc::new(PrebuiltCxxLibraryDescription::create_shared_library(
                    p, &self.arg, platform,
                )) as _)
            },
        )
    }

    fn shared_library_rule<'a>(
        rule: &'a Arc<dyn BuildRule>,
    ) -> anyhow::Result<&'a CxxLink> {
        rule.as_any()
            .downcast_ref::<CxxLink>()
            .ok_or_else(|| PrebuiltCxxLibraryError::WrongRuleKind(rule.build_target().clone()).into())
    }
}

#[derive(Debug, thiserror::Error)]
enum PrebuiltCxxLibraryError {
    #[error("internal error: rule for `{0}` is not a CxxLink")]
    WrongRuleKind(BuildTarget),
}

impl BuildRule for PrebuiltCxxLibrary {
    fn build_target(&self) -> &BuildTarget {
        self.params.target()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl NativeLinkable for PrebuiltCxxLibrary {
    fn cxx_preprocessor_input(
        &self,
        _resolver: &BuildRuleResolver,
        _platform: &CxxPlatform,
    ) -> anyhow::Result<CxxPreprocessorInput> {
        // The headers preexist on disk; no rule produces them.
        Ok(CxxPreprocessorInput {
            rules: BTreeSet::new(),
            preprocessor_flags: self.arg.exported_preprocessor_flags.clone(),
            headers: CxxHeaders::default(),
            include_roots: self.include_dirs.clone(),
        })
    }

    fn native_linkable_input(
        &self,
        resolver: &BuildRuleResolver,
        platform: &CxxPlatform,
        dep_type: LinkableDepType,
    ) -> anyhow::Result<NativeLinkableInput> {
        if self.arg.header_only {
            return Ok(NativeLinkableInput::empty());
        }
        let mut args = self.arg.linker_flags.clone();
        args.extend(link::platform_flags(
            &self.arg.platform_linker_flags,
            platform.flavor(),
        )?);
        let mut artifacts = BTreeSet::new();
        match dep_type {
            LinkableDepType::Shared => {
                let rule = self.require_shared_library(resolver, platform)?;
                let shared = Self::shared_library_rule(&rule)?;
                let path = shared.output().to_owned();
                args.push(path.display().to_string());
                artifacts.insert(path);
            }
            LinkableDepType::Static => {
                let path = self.static_library_path.clone();
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
        let shared = Self::shared_library_rule(&rule)?;
        Ok(BTreeMap::from([(
            shared.soname().to_owned(),
            shared.output().to_owned(),
        )]))
    }
}

impl NativePackageable for PrebuiltCxxLibrary {
    fn required_packageables(&self) -> Vec<BuildTarget> {
        self.params.deps().iter().cloned().collect()
    }

    fn add_to_collector(&self, collector: &mut PackageableCollector) {
        if self.arg.provided {
            collector.add_provided_native_linkable(self.params.target().clone());
        } else {
            collector.add_native_linkable(self.params.target().clone());
        }
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
