//! Integration tests for the CLI commands against a scratch workspace.

use plugpack_cli::commands;
use plugpack_core::cli::{ExitCode, OutputFormat};
use plugpack_registry::Registry;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Minimal class file: `name extends super_name`.
fn class_file(name: &str, super_name: &str) -> Vec<u8> {
    let mut pool = Vec::new();
    for (i, internal) in [name, super_name].iter().enumerate() {
        pool.push(1);
        pool.extend_from_slice(&u16::try_from(internal.len()).unwrap().to_be_bytes());
        pool.extend_from_slice(internal.as_bytes());
        pool.push(7);
        pool.extend_from_slice(&u16::try_from(2 * i + 1).unwrap().to_be_bytes());
    }

    let mut out = vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 52, 0, 5];
    out.extend_from_slice(&pool);
    out.extend_from_slice(&[0x00, 0x21, 0, 2, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0]);
    out
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new(modules: &[(&str, &str)], deploy: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut toml = format!("{deploy}\n");
        for (module, super_name) in modules {
            let class = dir
                .path()
                .join(module)
                .join("classes/com/example")
                .join(format!("{module}Plugin.class"));
            fs::create_dir_all(class.parent().unwrap()).unwrap();
            fs::write(&class, class_file(&format!("com/example/{module}Plugin"), super_name)).unwrap();
            toml.push_str(&format!(
                "\n[[module]]\nname = \"{module}\"\nclasses_dir = \"{module}/classes\"\n"
            ));
        }
        fs::write(dir.path().join("plugpack.toml"), toml).unwrap();
        Self { dir }
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("plugpack.toml")
    }

    fn build_dir(&self) -> PathBuf {
        self.dir.path().join("build")
    }
}

const BASE: &str = "com/lagradost/cloudstream3/plugins/Plugin";

#[tokio::test]
async fn test_build_then_registry_then_clean() {
    let fx = Fixture::new(&[("Alpha", BASE), ("Beta", BASE)], "");

    let code = commands::build::run(&fx.config(), Vec::new(), false, OutputFormat::Json)
        .await
        .unwrap();
    assert_eq!(code, ExitCode::SUCCESS);
    assert!(fx.build_dir().join("Alpha/Alpha.cs3").is_file());

    fs::remove_file(fx.build_dir().join("plugins.json")).unwrap();
    fs::remove_file(fx.build_dir().join("Beta/Beta.cs3")).unwrap();
    let code = commands::registry::run(&fx.config(), OutputFormat::Text).await.unwrap();
    assert_eq!(code, ExitCode::SUCCESS);
    let registry = Registry::load(&fx.build_dir().join("plugins.json")).unwrap();
    assert_eq!(registry.len(), 1);
    assert!(registry.get("Alpha").is_some());

    let code = commands::clean::run(&fx.config(), OutputFormat::Pretty).await.unwrap();
    assert_eq!(code, ExitCode::SUCCESS);
    assert!(!fx.build_dir().exists());
}

#[tokio::test]
async fn test_failed_stage_reports_build_failed() {
    let fx = Fixture::new(&[("Alpha", BASE), ("Orphan", "java/lang/Object")], "");

    let code = commands::build::run(&fx.config(), Vec::new(), false, OutputFormat::Json)
        .await
        .unwrap();
    assert_eq!(code, ExitCode::BUILD_FAILED);
    assert!(fx.build_dir().join("Alpha/Alpha.cs3").is_file());
    assert!(!fx.build_dir().join("Orphan/Orphan.cs3").exists());
}

#[tokio::test]
async fn test_unknown_module_is_an_error() {
    let fx = Fixture::new(&[("Alpha", BASE)], "");
    let err = commands::build::run(&fx.config(), vec!["Nope".to_string()], false, OutputFormat::Json)
        .await
        .unwrap_err();
    assert_eq!(commands::common::exit_code_for(&err), ExitCode::INVALID_INPUT);
}

#[cfg(unix)]
#[tokio::test]
async fn test_deploy_runs_push_command() {
    let fx = Fixture::new(&[("Alpha", BASE)], "[deploy]\npush = [\"true\", \"{archive}\", \"{entry_class}\"]");

    let err = commands::deploy::run("Alpha", &fx.config(), OutputFormat::Json)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("has not been built"));

    commands::build::run(&fx.config(), Vec::new(), false, OutputFormat::Json)
        .await
        .unwrap();
    let code = commands::deploy::run("Alpha", &fx.config(), OutputFormat::Json)
        .await
        .unwrap();
    assert_eq!(code, ExitCode::SUCCESS);
}

#[tokio::test]
async fn test_check_missing_archive_fails() {
    let fx = Fixture::new(&[("Alpha", BASE)], "");
    let missing = Path::new("/nonexistent/plugin.jar");
    assert!(
        commands::check::run(missing, None, &fx.config(), OutputFormat::Json)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_check_without_analyzer_is_advisory() {
    let fx = Fixture::new(&[("Alpha", BASE)], "");
    let jar = fx.dir.path().join("plugin.jar");
    fs::write(&jar, b"not inspected").unwrap();

    let code = commands::check::run(
        &jar,
        Some("plugpack-no-such-analyzer".to_string()),
        &fx.config(),
        OutputFormat::Json,
    )
    .await
    .unwrap();
    assert_eq!(code, ExitCode::SUCCESS);
}
