mod common;

use assetpipe::errors::PipelineError;
use assetpipe::tasks::Pipeline;
use common::{ConfigBuilder, Project};
use serde_json::json;

const CLEAN: &str = r#"
[task.clean]
kind = "clean"
targets = { build = ["build"] }
"#;

fn config_error(err: PipelineError) -> String {
    match err {
        PipelineError::ConfigError(msg) => msg,
        other => panic!("expected a configuration error, got {other:?}"),
    }
}

#[test]
fn missing_manifest_is_reported_with_its_path() {
    common::init_tracing();
    let project = Project::new().file(
        "Assetpipe.toml",
        format!("manifest = \"package.json\"\n{CLEAN}"),
    );

    let msg = config_error(project.config().unwrap_err());
    assert!(msg.contains("package.json"), "{msg}");
}

#[test]
fn malformed_manifest_is_a_config_error() {
    let project = Project::new()
        .file("Assetpipe.toml", format!("manifest = \"package.json\"\n{CLEAN}"))
        .file("package.json", "{ \"name\": ");

    let msg = config_error(project.config().unwrap_err());
    assert!(msg.contains("not valid JSON"), "{msg}");
}

#[test]
fn manifest_must_be_an_object() {
    let project = Project::new()
        .file("Assetpipe.toml", format!("manifest = \"package.json\"\n{CLEAN}"))
        .file("package.json", "[1, 2]");

    assert!(project.config().is_err());
}

#[test]
fn invalid_toml_is_a_parse_error() {
    let project = Project::new().file("Assetpipe.toml", "[task.clean\nkind = ");
    assert!(matches!(project.config(), Err(PipelineError::TomlError(_))));
}

#[test]
fn missing_config_file_names_the_path() {
    let project = Project::new();
    let msg = config_error(project.config().unwrap_err());
    assert!(msg.contains("Assetpipe.toml"), "{msg}");
}

#[test]
fn template_cycle_in_a_target_fails_validation() {
    let err = ConfigBuilder::from_toml(
        r#"
        [vars]
        a = "<%= b %>/x"
        b = "<%= a %>/y"

        [task.clean]
        kind = "clean"
        targets = { build = ["<%= a %>"] }
        "#,
    )
    .try_build()
    .unwrap_err();

    let msg = config_error(err);
    assert!(msg.contains("cyclic"), "{msg}");
    assert!(msg.contains("clean:build"), "{msg}");
}

#[test]
fn unresolved_reference_names_the_missing_path() {
    let err = ConfigBuilder::from_toml(
        r#"
        [task.clean]
        kind = "clean"
        targets = { build = ["<%= pkg.version %>"] }
        "#,
    )
    .pkg(json!({ "name": "demo" }))
    .try_build()
    .unwrap_err();

    let msg = config_error(err);
    assert!(msg.contains("pkg.version"), "{msg}");
}

#[test]
fn var_named_like_a_task_is_rejected() {
    let err = ConfigBuilder::from_toml(&format!("[vars]\nclean = \"x\"\n{CLEAN}"))
        .try_build()
        .unwrap_err();
    assert!(config_error(err).contains("clean"));
}

#[test]
fn queue_named_like_a_task_is_rejected() {
    let err = ConfigBuilder::from_toml(&format!("{CLEAN}\n[queue]\nclean = [\"clean:build\"]\n"))
        .try_build()
        .unwrap_err();
    assert!(config_error(err).contains("both as a task and as a queue"));
}

#[test]
fn queue_alias_cycle_is_rejected() {
    let err = ConfigBuilder::from_toml(&format!(
        "{CLEAN}\n[queue]\ndev = [\"build\"]\nbuild = [\"clean\", \"release\"]\nrelease = [\"dev\"]\n"
    ))
    .try_build()
    .unwrap_err();
    assert!(config_error(err).contains("cycle"));
}

#[test]
fn unknown_queue_entry_is_rejected_at_load() {
    let err = ConfigBuilder::from_toml(&format!("{CLEAN}\n[queue]\nbuild = [\"clean:dist\"]\n"))
        .try_build()
        .unwrap_err();
    let msg = config_error(err);
    assert!(msg.contains("build") && msg.contains("dist"), "{msg}");
}

#[test]
fn unknown_queue_name_is_rejected_at_run() {
    let config = ConfigBuilder::from_toml(CLEAN).build();
    let pipeline = Pipeline::new(config).unwrap();
    assert!(matches!(
        pipeline.resolve_queue("deploy"),
        Err(PipelineError::UnknownQueue(name)) if name == "deploy"
    ));
}

#[test]
fn bad_task_options_are_rejected_before_anything_runs() {
    let config = ConfigBuilder::from_toml(
        r#"
        [task.concat]
        kind = "concat"
        options = { separator = 5 }
        [task.concat.targets.dist]
        src = ["src/*.js"]
        dest = "build/all.js"
        "#,
    )
    .build();

    let msg = config_error(Pipeline::new(config).unwrap_err());
    assert!(msg.contains("concat:dist"), "{msg}");
}
