/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Concurrency properties of the shared rule index: one materialization per
//! flavored target, one identity observed by every caller.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Barrier;

use cxx_rules::archive::Archive;
use cxx_rules::flavor::Flavor;
use cxx_rules::paths;
use cxx_rules::rules::BuildRule;
use cxx_rules::rules::BuildRuleParams;
use cxx_rules::rules::BuildRuleResolver;
use cxx_rules::target::BuildTarget;
use dupe::Dupe;

fn params(target: &str) -> BuildRuleParams {
    BuildRuleParams::new(
        BuildTarget::parse(target).unwrap(),
        BTreeSet::new(),
        PathBuf::from("/repo"),
    )
}

#[test]
fn test_concurrent_requests_collapse_to_one_materialization() {
    const THREADS: usize = 16;

    let resolver = BuildRuleResolver::new();
    let params = params("//foo:bar");
    let flavors = [
        Flavor::testing_new("linux-x86_64"),
        Flavor::testing_new("static"),
    ];
    let creations = AtomicUsize::new(0);
    let barrier = Barrier::new(THREADS);

    let rules: Vec<Arc<dyn BuildRule>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let resolver = &resolver;
                let params = &params;
                let flavors = &flavors;
                let creations = &creations;
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    resolver
                        .require_build_rule(params, flavors.iter().map(Dupe::dupe), |p| {
                            creations.fetch_add(1, Ordering::SeqCst);
                            let output = paths::static_library_path(p.target());
                            Ok(Arc::new(Archive::new(p.target().clone(), output)) as _)
                        })
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(1, creations.load(Ordering::SeqCst));
    assert_eq!(1, resolver.len());
    for rule in &rules[1..] {
        assert!(Arc::ptr_eq(&rules[0], rule));
    }
    assert_eq!(
        "//foo:bar#linux-x86_64,static",
        rules[0].build_target().to_string()
    );
}

#[test]
fn test_distinct_flavor_combinations_are_distinct_rules() {
    let resolver = BuildRuleResolver::new();
    let params = params("//foo:bar");

    let create = |p: BuildRuleParams| {
        let output = paths::static_library_path(p.target());
        Ok(Arc::new(Archive::new(p.target().clone(), output)) as Arc<dyn BuildRule>)
    };

    let linux = resolver
        .require_build_rule(
            &params,
            [
                Flavor::testing_new("linux-x86_64"),
                Flavor::testing_new("static"),
            ],
            create,
        )
        .unwrap();
    let iphone = resolver
        .require_build_rule(
            &params,
            [
                Flavor::testing_new("iphoneos-arm64"),
                Flavor::testing_new("static"),
            ],
            create,
        )
        .unwrap();

    assert!(!Arc::ptr_eq(&linux, &iphone));
    assert_eq!(2, resolver.len());
}
