//! End-to-end builds of scratch workspaces.

mod common;

use common::{MockAnalyzer, Workspace, offline_tools, tools_with};
use plugpack_core::archive::{read_entries, read_entry};
use plugpack_core::{Error, PackageManifest};
use plugpack_pipeline::stages::{ManifestStage, PackageStage};
use plugpack_pipeline::{BuildOptions, ModuleState, Orchestrator, Stage, TaskOutcome};
use plugpack_registry::Registry;
use std::fs;
use std::sync::Arc;

fn orchestrator(ws: &Workspace) -> Orchestrator {
    let config = ws.config();
    let tools = offline_tools(&config);
    Orchestrator::new(config, tools)
}

fn manifest_of(ws: &Workspace, module: &str) -> PackageManifest {
    let bytes = read_entry(&ws.package(module), "manifest.json").unwrap();
    PackageManifest::from_json(std::str::from_utf8(&bytes).unwrap()).unwrap()
}

#[tokio::test]
async fn test_builds_package_and_registry() {
    let mut ws = Workspace::new();
    ws.plugin("Alpha").plugin("Beta");

    let outcome = orchestrator(&ws).build(&BuildOptions::default()).await.unwrap();
    assert!(outcome.is_success(), "{:?}", outcome.report);
    assert_eq!(outcome.packaged().count(), 2);

    let names: Vec<String> = read_entries(&ws.package("Alpha"))
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, ["manifest.json", "classes.dex"]);

    let manifest = manifest_of(&ws, "Alpha");
    assert_eq!(manifest.entry_class_name.as_deref(), Some("com.example.AlphaPlugin"));
    assert_eq!(manifest.byte_size, None);
    assert_eq!(manifest.description.as_deref(), Some("Alpha provider"));

    let registry = Registry::load(&outcome.registry.unwrap()).unwrap();
    let names: Vec<&str> = registry.entries().iter().map(|e| e.name()).collect();
    assert_eq!(names, ["Alpha", "Beta"]);
    let alpha = registry.get("Alpha").unwrap();
    assert_eq!(alpha.url, "https://example.org/builds/Alpha.cs3");
    assert_eq!(alpha.file_size, fs::metadata(ws.package("Alpha")).unwrap().len());
    assert_eq!(alpha.internal_name, "Alpha");
}

#[tokio::test]
async fn test_packages_are_deterministic() {
    let mut first = Workspace::new();
    first.plugin("Alpha");
    let mut second = Workspace::new();
    second.plugin("Alpha");

    orchestrator(&first).build(&BuildOptions::default()).await.unwrap();
    orchestrator(&second).build(&BuildOptions::default()).await.unwrap();

    assert_eq!(
        fs::read(first.package("Alpha")).unwrap(),
        fs::read(second.package("Alpha")).unwrap()
    );
    assert_eq!(
        fs::read(first.build_dir().join("plugins.json")).unwrap(),
        fs::read(second.build_dir().join("plugins.json")).unwrap()
    );
}

#[tokio::test]
async fn test_rebuild_is_up_to_date() {
    let mut ws = Workspace::new();
    ws.plugin("Alpha").with_jar("Gamma", false, &["com/example/Util"]);

    let first = orchestrator(&ws).build(&BuildOptions::default()).await.unwrap();
    assert!(first.is_success());
    let package = fs::read(ws.package("Gamma")).unwrap();

    let second = orchestrator(&ws).build(&BuildOptions::default()).await.unwrap();
    assert!(second.is_success());
    for label in ["Alpha:compileDex", "Gamma:compilePluginJar", "Gamma:writeManifest"] {
        let task = second.report.task(label).unwrap();
        assert!(matches!(task.outcome, TaskOutcome::UpToDate), "{label}: {:?}", task.outcome);
    }
    assert!(matches!(second.report.task("Gamma:make").unwrap().outcome, TaskOutcome::Succeeded));
    assert!(matches!(second.report.task("makePluginsJson").unwrap().outcome, TaskOutcome::Succeeded));
    assert_eq!(fs::read(ws.package("Gamma")).unwrap(), package);
    assert_eq!(manifest_of(&ws, "Gamma").entry_class_name.as_deref(), Some("com.example.GammaPlugin"));

    let forced = orchestrator(&ws)
        .build(&BuildOptions {
            no_cache: true,
            ..BuildOptions::default()
        })
        .await
        .unwrap();
    assert!(matches!(forced.report.task("Alpha:compileDex").unwrap().outcome, TaskOutcome::Succeeded));
}

#[tokio::test]
async fn test_changed_input_reruns_stage() {
    let mut ws = Workspace::new();
    ws.plugin("Alpha");
    orchestrator(&ws).build(&BuildOptions::default()).await.unwrap();

    ws.write_class("Alpha", "com/example/AlphaHelper", Some(common::OBJECT));
    let outcome = orchestrator(&ws).build(&BuildOptions::default()).await.unwrap();
    assert!(matches!(outcome.report.task("Alpha:compileDex").unwrap().outcome, TaskOutcome::Succeeded));
}

#[tokio::test]
async fn test_failed_module_left_out_of_registry() {
    let mut ws = Workspace::new();
    ws.plugin("Alpha").broken("Broken").plugin("Gamma");

    let outcome = orchestrator(&ws).build(&BuildOptions::default()).await.unwrap();
    assert!(!outcome.is_success());

    let failure = outcome.report.failures().next().unwrap();
    assert_eq!(failure.label, "Broken:compileDex");
    assert!(matches!(
        failure.outcome,
        TaskOutcome::Failed {
            error: Error::EntryPointNotFound { .. }
        }
    ));
    match &outcome.report.task("Broken:make").unwrap().outcome {
        TaskOutcome::Skipped { blocked_by } => assert_eq!(blocked_by, "Broken:writeManifest"),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(!ws.package("Broken").exists());

    let registry = Registry::load(&ws.build_dir().join("plugins.json")).unwrap();
    let names: Vec<&str> = registry.entries().iter().map(|e| e.name()).collect();
    assert_eq!(names, ["Alpha", "Gamma"]);
}

#[tokio::test]
async fn test_module_filter_skips_registry() {
    let mut ws = Workspace::new();
    ws.plugin("Alpha").plugin("Beta");

    let outcome = orchestrator(&ws)
        .build(&BuildOptions {
            modules: vec!["Beta".to_string()],
            no_cache: false,
        })
        .await
        .unwrap();
    assert!(outcome.is_success());
    assert!(outcome.registry.is_none());
    assert!(outcome.report.task("makePluginsJson").is_none());
    assert!(ws.package("Beta").exists());
    assert!(!ws.package("Alpha").exists());
    assert!(!ws.build_dir().join("plugins.json").exists());
}

#[tokio::test]
async fn test_unknown_module_filter_rejected() {
    let mut ws = Workspace::new();
    ws.plugin("Alpha");

    let err = orchestrator(&ws)
        .build(&BuildOptions {
            modules: vec!["Nope".to_string()],
            no_cache: false,
        })
        .await
        .unwrap_err();
    assert!(err.is_config_error());
}

#[tokio::test]
async fn test_jar_size_recorded_in_manifest() {
    let mut ws = Workspace::new();
    ws.with_jar("Gamma", false, &["com/example/Util", "android/widget/Shim"]);

    let outcome = orchestrator(&ws).build(&BuildOptions::default()).await.unwrap();
    assert!(outcome.is_success(), "{:?}", outcome.report);

    let jar = ws.build_dir().join("Gamma").join("Gamma.jar");
    let manifest = manifest_of(&ws, "Gamma");
    assert_eq!(manifest.byte_size, Some(fs::metadata(&jar).unwrap().len()));

    // Platform classes are only stripped from cross-platform jars.
    let names: Vec<String> = read_entries(&jar).unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, ["android/widget/Shim.class", "com/example/Util.class"]);
}

#[tokio::test]
async fn test_cross_platform_module_checked_by_analyzer() {
    let mut ws = Workspace::new();
    ws.with_jar("Portable", true, &["com/example/Util", "android/widget/Shim"]);
    let config = ws.config();

    let mut analyzer = MockAnalyzer::new();
    analyzer
        .expect_print_module_deps()
        .withf(|archive| archive.ends_with("Portable.jar"))
        .times(1)
        .returning(|_| Ok("java.base\n".to_string()));
    let tools = tools_with(&config, analyzer);

    let outcome = Orchestrator::new(config, tools)
        .build(&BuildOptions::default())
        .await
        .unwrap();
    assert!(outcome.is_success(), "{:?}", outcome.report);

    let jar = ws.build_dir().join("Portable").join("Portable.jar");
    let names: Vec<String> = read_entries(&jar).unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, ["com/example/Util.class"]);
    assert!(manifest_of(&ws, "Portable").is_cross_platform);
}

#[tokio::test]
async fn test_compatibility_violation_halts_module() {
    let mut ws = Workspace::new();
    ws.with_jar("Portable", true, &["com/example/Util"]).plugin("Alpha");
    let config = ws.config();

    let mut analyzer = MockAnalyzer::new();
    analyzer
        .expect_print_module_deps()
        .returning(|_| Ok("java.base,android.base\n".to_string()));
    let tools = tools_with(&config, analyzer);

    let outcome = Orchestrator::new(config, tools)
        .build(&BuildOptions::default())
        .await
        .unwrap();

    let check = outcome.report.task("Portable:ensureJarCompatibility").unwrap();
    match &check.outcome {
        TaskOutcome::Failed { error } => {
            assert!(error.is_compatibility_violation());
            assert!(error.remediation().is_some());
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(outcome.report.task("Portable:writeManifest").unwrap().outcome.status(), "skipped");
    assert!(ws.package("Alpha").exists());
    assert!(!ws.package("Portable").exists());
}

#[tokio::test]
async fn test_analyzer_unavailable_only_warns() {
    let mut ws = Workspace::new();
    ws.with_jar("Portable", true, &["com/example/Util"]);
    let config = ws.config();

    let mut analyzer = MockAnalyzer::new();
    analyzer
        .expect_print_module_deps()
        .returning(|_| Err(std::io::Error::new(std::io::ErrorKind::NotFound, "jdeps not found")));
    let tools = tools_with(&config, analyzer);

    let outcome = Orchestrator::new(config, tools)
        .build(&BuildOptions::default())
        .await
        .unwrap();
    assert!(outcome.is_success(), "{:?}", outcome.report);
    assert!(ws.package("Portable").exists());
}

#[tokio::test]
async fn test_compatibility_rechecked_on_rebuild() {
    let mut ws = Workspace::new();
    ws.with_jar("Portable", true, &["com/example/Util"]);

    let mut missing = MockAnalyzer::new();
    missing
        .expect_print_module_deps()
        .times(1)
        .returning(|_| Err(std::io::Error::new(std::io::ErrorKind::NotFound, "jdeps not found")));
    let config = ws.config();
    let first = Orchestrator::new(config.clone(), tools_with(&config, missing))
        .build(&BuildOptions::default())
        .await
        .unwrap();
    assert!(first.is_success(), "{:?}", first.report);

    let mut installed = MockAnalyzer::new();
    installed
        .expect_print_module_deps()
        .times(1)
        .returning(|_| Ok("android.base,java.base\n".to_string()));
    let second = Orchestrator::new(config.clone(), tools_with(&config, installed))
        .build(&BuildOptions::default())
        .await
        .unwrap();

    assert!(!second.is_success());
    assert!(matches!(
        second.report.task("Portable:compilePluginJar").unwrap().outcome,
        TaskOutcome::UpToDate
    ));
    match &second.report.task("Portable:ensureJarCompatibility").unwrap().outcome {
        TaskOutcome::Failed { error } => assert!(error.is_compatibility_violation()),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_resources_merged_into_package() {
    let mut ws = Workspace::new();
    ws.with_resources("Themed");

    let outcome = orchestrator(&ws).build(&BuildOptions::default()).await.unwrap();
    assert!(outcome.is_success(), "{:?}", outcome.report);

    let names: Vec<String> = read_entries(&ws.package("Themed"))
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(
        names,
        ["manifest.json", "classes.dex", "res/layout/main.xml", "resources.arsc"]
    );
    assert!(manifest_of(&ws, "Themed").requires_resources);
}

#[test]
fn test_reading_before_writer_ran_is_unresolved() {
    let mut ws = Workspace::new();
    ws.plugin("Alpha");
    let config = ws.config();
    let module = config.module("Alpha").unwrap().clone();
    let state = Arc::new(ModuleState::new(module, config.layout(&config.modules[0].name)));

    let err = ManifestStage::new(Arc::clone(&state)).execute().unwrap_err();
    assert!(err.is_unresolved_cell());

    state.entry_point.set("com.example.AlphaPlugin".to_string()).unwrap();
    let err = PackageStage::new(Arc::clone(&state)).execute().unwrap_err();
    assert!(err.is_unresolved_cell());
    assert!(!state.is_packaged());
}
