//! Scratch workspaces with synthetic class files.

#![allow(dead_code)]

use plugpack_core::archive::{ArchiveEntry, write_archive};
use plugpack_core::{Result, WorkspaceConfig};
use plugpack_pipeline::Toolset;
use plugpack_pipeline::tools::{DependencyAnalyzer, ResourceCompiler, ResourceRequest};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const BASE_PLUGIN: &str = "com/lagradost/cloudstream3/plugins/BasePlugin";
pub const OBJECT: &str = "java/lang/Object";
pub const ACC_PUBLIC_SUPER: u16 = 0x0021;

mockall::mock! {
    pub Analyzer {}

    impl DependencyAnalyzer for Analyzer {
        fn print_module_deps(&self, archive: &Path) -> std::io::Result<String>;
    }
}

/// Encodes a minimal class file.
pub fn class_file(name: &str, super_name: Option<&str>, flags: u16) -> Vec<u8> {
    let mut pool = Vec::new();
    let mut count: u16 = 0;
    let mut add_class = |internal: &str, pool: &mut Vec<u8>| -> u16 {
        pool.push(1);
        pool.extend_from_slice(&u16::try_from(internal.len()).unwrap().to_be_bytes());
        pool.extend_from_slice(internal.as_bytes());
        let utf8_index = count + 1;
        pool.push(7);
        pool.extend_from_slice(&utf8_index.to_be_bytes());
        count += 2;
        count
    };

    let this_index = add_class(name, &mut pool);
    let super_index = super_name.map_or(0, |s| add_class(s, &mut pool));

    let mut out = vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 52];
    out.extend_from_slice(&(count + 1).to_be_bytes());
    out.extend_from_slice(&pool);
    out.extend_from_slice(&flags.to_be_bytes());
    out.extend_from_slice(&this_index.to_be_bytes());
    out.extend_from_slice(&super_index.to_be_bytes());
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
    out
}

/// A temporary plugin workspace.
pub struct Workspace {
    dir: TempDir,
    modules: String,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            modules: String::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root().join("build")
    }

    pub fn package(&self, module: &str) -> PathBuf {
        self.build_dir().join(module).join(format!("{module}.cs3"))
    }

    pub fn write_class(&self, module: &str, name: &str, super_name: Option<&str>) {
        let path = self.root().join(module).join("classes").join(format!("{name}.class"));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, class_file(name, super_name, ACC_PUBLIC_SUPER)).unwrap();
    }

    /// Declares a module whose plugin class extends the base plugin.
    pub fn plugin(&mut self, module: &str) -> &mut Self {
        self.write_class(module, &format!("com/example/{module}Plugin"), Some(BASE_PLUGIN));
        self.write_class(module, &format!("com/example/{module}Api"), Some(OBJECT));
        self.declare(module, "")
    }

    /// Declares a module without any plugin class.
    pub fn broken(&mut self, module: &str) -> &mut Self {
        self.write_class(module, &format!("com/example/{module}Api"), Some(OBJECT));
        self.declare(module, "")
    }

    /// Declares a module that also packages a jar built from `classes`.
    pub fn with_jar(&mut self, module: &str, cross_platform: bool, classes: &[&str]) -> &mut Self {
        self.write_class(module, &format!("com/example/{module}Plugin"), Some(BASE_PLUGIN));
        let entries: Vec<ArchiveEntry> = classes
            .iter()
            .map(|&name| ArchiveEntry::new(format!("{name}.class"), class_file(name, Some(OBJECT), ACC_PUBLIC_SUPER)))
            .collect();
        write_archive(&self.root().join(module).join("full.jar"), &entries).unwrap();
        self.declare(
            module,
            &format!("full_archive = \"{module}/full.jar\"\nis_cross_platform = {cross_platform}\n"),
        )
    }

    /// Declares a module with a resource directory and manifest fragment.
    pub fn with_resources(&mut self, module: &str) -> &mut Self {
        self.write_class(module, &format!("com/example/{module}Plugin"), Some(BASE_PLUGIN));
        let res = self.root().join(module).join("res").join("layout");
        fs::create_dir_all(&res).unwrap();
        fs::write(res.join("main.xml"), "<LinearLayout/>").unwrap();
        fs::write(self.root().join(module).join("AndroidManifest.xml"), "<manifest/>").unwrap();
        self.declare(
            module,
            &format!(
                "requires_resources = true\nresource_dir = \"{module}/res\"\nmanifest_fragment = \"{module}/AndroidManifest.xml\"\n"
            ),
        )
    }

    fn declare(&mut self, module: &str, extra: &str) -> &mut Self {
        self.modules.push_str(&format!(
            "\n[[module]]\nname = \"{module}\"\nclasses_dir = \"{module}/classes\"\ndescription = \"{module} provider\"\n{extra}"
        ));
        self
    }

    pub fn config(&self) -> WorkspaceConfig {
        let toml = format!(
            "[workspace]\ndownload_base_url = \"https://example.org/builds/\"\nmax_parallel = 4\n{}",
            self.modules
        );
        WorkspaceConfig::from_toml_str(&toml, self.root()).unwrap()
    }
}

/// Writes a fixed compiled resource archive, including an entry the
/// packager must drop.
#[derive(Debug, Default)]
pub struct FakeResourceCompiler;

impl ResourceCompiler for FakeResourceCompiler {
    fn compile(&self, request: &ResourceRequest<'_>) -> Result<()> {
        write_archive(
            request.output,
            &[
                ArchiveEntry::new("resources.arsc", vec![1, 2, 3]),
                ArchiveEntry::new("AndroidManifest.xml", b"<compiled/>".to_vec()),
                ArchiveEntry::new("res/layout/main.xml", b"<compiled-layout/>".to_vec()),
            ],
        )
    }
}

/// Tools that never reach outside the process; the analyzer panics if it
/// is called.
pub fn offline_tools(config: &WorkspaceConfig) -> Toolset {
    tools_with(config, MockAnalyzer::new())
}

pub fn tools_with(config: &WorkspaceConfig, analyzer: MockAnalyzer) -> Toolset {
    Toolset::from_config(&config.toolchain)
        .unwrap()
        .with_analyzer(Arc::new(analyzer))
        .with_resource_compiler(Arc::new(FakeResourceCompiler))
}
