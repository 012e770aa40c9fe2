mod support;

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use bbforge_core::backend::BackendRegistry;
use bbforge_core::config::RecipesConfig;
use bbforge_core::error::RecipeError;
use bbforge_core::recipe::{INCLUDE_TEMPLATE, MAIN_TEMPLATE, RecipeSynthesizer};

use support::{FakeBackend, recipe, write};

const MAIN: &str = "{% include \"recipe-include.tmpl\" %}SRC_URI = \"{{ src_uri }}\"\n";
const INCLUDE: &str = "DESCRIPTION = \"{{ description | bitbake }}\"\nDEPENDS += \"{{ depends | join: \" \" }}\"\ninherit {{ inherits | join: \" \" }}\n";

struct Workspace {
    _temp: TempDir,
    layer: PathBuf,
    config: RecipesConfig,
}

impl Workspace {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let layer = support::temp_path(&temp, "meta-kde");
        let templates = support::temp_path(&temp, "templates");
        fs::write(templates.join(MAIN_TEMPLATE), MAIN).unwrap();
        fs::write(templates.join(INCLUDE_TEMPLATE), INCLUDE).unwrap();

        let config = RecipesConfig {
            layers: vec![layer.clone()],
            layer_directory: layer.clone(),
            template_dir: templates,
        };
        Self {
            _temp: temp,
            layer,
            config,
        }
    }

    fn existing(&self, relative: &str) {
        write(&self.layer, relative, "");
    }
}

fn registry() -> BackendRegistry {
    let mut fake = FakeBackend::new("fake")
        .with_recipe(recipe("kcoreaddons", Some("5.115.0"), &[]))
        .with_recipe(recipe("kio", Some("5.115.0"), &["kcoreaddons", "kwindowsystem"]))
        .with_recipe(recipe("kconfig", None, &[]));
    fake.recipes[0].src_uri = Some("https://download.example.org/kcoreaddons-5.115.0.tar.xz".into());

    let mut registry = BackendRegistry::new();
    registry.register(Box::new(fake));
    let mut idle = FakeBackend::new("idle");
    idle.ready = false;
    registry.register(Box::new(idle));
    registry
}

fn files_under(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(dir).unwrap().to_path_buf())
        .collect()
}

#[test]
fn creates_recipe_and_include() {
    let workspace = Workspace::new();
    let registry = registry();
    let mut synthesizer = RecipeSynthesizer::new(&registry, &workspace.config);

    let created = synthesizer.create_recipe("fake", "kcoreaddons").unwrap();

    let dir = workspace.layer.join("recipes-frameworks/kcoreaddons");
    assert_eq!(created.recipe_path, dir.join("kcoreaddons_5.115.0.bb"));
    assert_eq!(created.include_path, dir.join("kcoreaddons.inc"));

    let include = fs::read_to_string(&created.include_path).unwrap();
    assert_eq!(
        include,
        "DESCRIPTION = \"The kcoreaddons framework\"\nDEPENDS += \"\"\ninherit cmake_plasma reuse_license_checksums\n"
    );
    let main = fs::read_to_string(&created.recipe_path).unwrap();
    assert_eq!(
        main,
        format!("{include}SRC_URI = \"https://download.example.org/kcoreaddons-5.115.0.tar.xz\"\n")
    );
}

#[test]
fn created_recipes_satisfy_later_dependencies() {
    let workspace = Workspace::new();
    workspace.existing("recipes-frameworks/kwindowsystem/kwindowsystem_5.115.0.bb");
    let registry = registry();
    let mut synthesizer = RecipeSynthesizer::new(&registry, &workspace.config);

    let err = synthesizer.create_recipe("fake", "kio").unwrap_err();
    assert!(matches!(
        err,
        RecipeError::DependencyMissing { ref identifier, ref dependency }
            if identifier == "kio" && dependency == "kcoreaddons"
    ));

    synthesizer.create_recipe("fake", "kcoreaddons").unwrap();
    let created = synthesizer.create_recipe("fake", "kio").unwrap();
    let include = fs::read_to_string(created.include_path).unwrap();
    assert!(include.contains("DEPENDS += \"kcoreaddons kwindowsystem\""));
}

#[test]
fn refuses_recipe_already_in_a_layer() {
    let workspace = Workspace::new();
    workspace.existing("recipes-support/kcoreaddons/kcoreaddons_5.100.0.bb");
    let registry = registry();
    let mut synthesizer = RecipeSynthesizer::new(&registry, &workspace.config);

    let err = synthesizer.create_recipe("fake", "kcoreaddons").unwrap_err();
    match err {
        RecipeError::AlreadyExists { identifier, location } => {
            assert_eq!(identifier, "kcoreaddons");
            assert!(location.ends_with("recipes-support/kcoreaddons/kcoreaddons_5.100.0.bb"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!workspace.layer.join("recipes-frameworks").exists());
}

#[test]
fn refuses_second_creation_in_same_run() {
    let workspace = Workspace::new();
    let registry = registry();
    let mut synthesizer = RecipeSynthesizer::new(&registry, &workspace.config);

    synthesizer.create_recipe("fake", "kcoreaddons").unwrap();
    assert!(matches!(
        synthesizer.create_recipe("fake", "kcoreaddons"),
        Err(RecipeError::AlreadyExists { .. })
    ));
}

#[test]
fn missing_dependency_writes_nothing() {
    let workspace = Workspace::new();
    workspace.existing("recipes-frameworks/kcoreaddons/kcoreaddons_5.115.0.bb");
    let registry = registry();
    let mut synthesizer = RecipeSynthesizer::new(&registry, &workspace.config);

    let err = synthesizer.create_recipe("fake", "kio").unwrap_err();
    assert!(matches!(
        err,
        RecipeError::DependencyMissing { ref dependency, .. } if dependency == "kwindowsystem"
    ));
    assert_eq!(
        files_under(&workspace.layer),
        vec![PathBuf::from("recipes-frameworks/kcoreaddons/kcoreaddons_5.115.0.bb")]
    );
}

#[test]
fn recipe_without_version_is_rejected() {
    let workspace = Workspace::new();
    let registry = registry();
    let mut synthesizer = RecipeSynthesizer::new(&registry, &workspace.config);

    assert!(matches!(
        synthesizer.create_recipe("fake", "kconfig"),
        Err(RecipeError::MissingVersion(ref id)) if id == "kconfig"
    ));
}

#[test]
fn backend_and_recipe_lookup_errors() {
    let workspace = Workspace::new();
    let registry = registry();
    let mut synthesizer = RecipeSynthesizer::new(&registry, &workspace.config);

    assert!(matches!(
        synthesizer.create_recipe("gnome", "kio"),
        Err(RecipeError::BackendNotFound(ref b)) if b == "gnome"
    ));
    assert!(matches!(
        synthesizer.create_recipe("idle", "kio"),
        Err(RecipeError::BackendNotReady(ref b)) if b == "idle"
    ));
    assert!(matches!(
        synthesizer.create_recipe("fake", "kwin"),
        Err(RecipeError::RecipeNotFound { ref identifier, .. }) if identifier == "kwin"
    ));
}

#[test]
fn failed_include_write_removes_recipe_file() {
    let workspace = Workspace::new();
    // A directory where the include file should go makes the second write fail.
    fs::create_dir_all(workspace.layer.join("recipes-frameworks/kcoreaddons/kcoreaddons.inc")).unwrap();
    let registry = registry();
    let mut synthesizer = RecipeSynthesizer::new(&registry, &workspace.config);

    let err = synthesizer.create_recipe("fake", "kcoreaddons").unwrap_err();
    assert!(matches!(err, RecipeError::Write { ref path, .. } if path.ends_with("kcoreaddons.inc")));
    assert!(
        !workspace
            .layer
            .join("recipes-frameworks/kcoreaddons/kcoreaddons_5.115.0.bb")
            .exists()
    );
}

#[test]
fn layer_directory_override() {
    let workspace = Workspace::new();
    let other = TempDir::new().unwrap();
    let registry = registry();
    let mut synthesizer =
        RecipeSynthesizer::new(&registry, &workspace.config).with_layer_directory(other.path());

    let created = synthesizer.create_recipe("fake", "kcoreaddons").unwrap();
    assert!(created.recipe_path.starts_with(other.path()));
}

#[test]
fn template_errors_surface_before_writing() {
    let workspace = Workspace::new();
    fs::write(workspace.config.template_dir.join(INCLUDE_TEMPLATE), "{{ broken").unwrap();
    let registry = registry();
    let mut synthesizer = RecipeSynthesizer::new(&registry, &workspace.config);

    assert!(matches!(
        synthesizer.create_recipe("fake", "kcoreaddons"),
        Err(RecipeError::TemplateCompile { .. })
    ));
    assert!(files_under(&workspace.layer).is_empty());
}

#[test]
fn kcoreaddons_without_extra_cmake_modules_is_refused() {
    let workspace = Workspace::new();
    let mut registry = BackendRegistry::new();
    registry.register(Box::new(FakeBackend::new("kde-invent").with_recipe(recipe(
        "kcoreaddons",
        Some("5.115.0"),
        &["extra-cmake-modules"],
    ))));
    let mut synthesizer = RecipeSynthesizer::new(&registry, &workspace.config);

    let err = synthesizer.create_recipe("kde-invent", "kcoreaddons").unwrap_err();
    assert!(matches!(
        err,
        RecipeError::DependencyMissing { ref identifier, ref dependency }
            if identifier == "kcoreaddons" && dependency == "extra-cmake-modules"
    ));
    assert!(files_under(&workspace.layer).is_empty());
}
