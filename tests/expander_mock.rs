mod common;

use std::path::PathBuf;
use std::sync::Arc;

use assetpipe::config::ConfigNode;
use assetpipe::errors::ExpandError;
use assetpipe::files::{mappings_from_target, FileExpander, FileMapping, FilePair};
use assetpipe::fs::mock::MockFileSystem;
use assetpipe::types::{EmptyMatchPolicy, ExtDot};

fn project() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("./src/js/app.js", "app");
    fs.add_file("./src/js/util.js", "util");
    fs.add_file("./src/js/vendor/tiny.js", "tiny");
    fs.add_file("./build/assets/css/style.css", "a{}");
    fs.add_file("./build/assets/css/print.css", "b{}");
    fs.add_file("./build/assets/css/style.min.css", "c{}");
    fs
}

fn expander(fs: &MockFileSystem, policy: EmptyMatchPolicy) -> FileExpander {
    FileExpander::new(Arc::new(fs.clone()), ".", policy)
}

fn target(src: &str) -> ConfigNode {
    ConfigNode::from(toml::from_str::<toml::Table>(src).unwrap())
}

fn srcs(pairs: &[FilePair]) -> Vec<PathBuf> {
    pairs.iter().map(|p| p.src.clone()).collect()
}

#[test]
fn compact_and_files_forms_expand_identically() {
    common::init_tracing();
    let fs = project();
    let ex = expander(&fs, EmptyMatchPolicy::Warn);

    let compact = mappings_from_target(&target(
        r#"
        src = ["src/js/*.js"]
        dest = "build/script.js"
        "#,
    ))
    .unwrap();
    let files = mappings_from_target(&target(
        r#"
        files = [{ src = ["src/js/*.js"], dest = "build/script.js" }]
        "#,
    ))
    .unwrap();

    assert_eq!(compact, files);
    assert_eq!(ex.expand_all(&compact).unwrap(), ex.expand_all(&files).unwrap());
}

#[test]
fn single_star_does_not_cross_directories() {
    let fs = project();
    let ex = expander(&fs, EmptyMatchPolicy::Warn);

    let pairs = ex
        .expand(&FileMapping::from_patterns(["src/js/*.js"]))
        .unwrap();
    assert_eq!(
        srcs(&pairs),
        vec![PathBuf::from("./src/js/app.js"), PathBuf::from("./src/js/util.js")]
    );

    let deep = ex
        .expand(&FileMapping::from_patterns(["src/**/*.js"]))
        .unwrap();
    assert_eq!(deep.len(), 3);
}

#[test]
fn negation_removes_earlier_matches_only() {
    let fs = project();
    let ex = expander(&fs, EmptyMatchPolicy::Warn);

    let pairs = ex
        .expand(&FileMapping::from_patterns([
            "src/**/*.js",
            "!src/js/vendor/**",
            "src/js/vendor/tiny.js",
        ]))
        .unwrap();

    // The exclusion applies to what came before it; the later literal is
    // added back after it.
    assert_eq!(
        srcs(&pairs),
        vec![
            PathBuf::from("./src/js/app.js"),
            PathBuf::from("./src/js/util.js"),
            PathBuf::from("./src/js/vendor/tiny.js"),
        ]
    );
}

#[test]
fn expand_maps_each_match_under_dest_with_new_ext() {
    let fs = project();
    let ex = expander(&fs, EmptyMatchPolicy::Warn);

    let mapping = FileMapping::from_patterns(["*.css", "!*.min.css"])
        .with_cwd("build/assets/css")
        .with_dest("build/assets/css")
        .with_ext(".min.css")
        .expanded();

    let pairs = ex.expand(&mapping).unwrap();
    assert_eq!(
        pairs,
        vec![
            FilePair {
                src: PathBuf::from("./build/assets/css/print.css"),
                dest: Some(PathBuf::from("./build/assets/css/print.min.css")),
            },
            FilePair {
                src: PathBuf::from("./build/assets/css/style.css"),
                dest: Some(PathBuf::from("./build/assets/css/style.min.css")),
            },
        ]
    );
}

#[test]
fn ext_dot_last_keeps_inner_dots() {
    let fs = project();
    let ex = expander(&fs, EmptyMatchPolicy::Warn);

    let mut mapping = FileMapping::from_patterns(["style.min.css"])
        .with_cwd("build/assets/css")
        .with_dest("out")
        .with_ext(".gz")
        .expanded();
    mapping.ext_dot = ExtDot::Last;

    let pairs = ex.expand(&mapping).unwrap();
    assert_eq!(pairs[0].dest, Some(PathBuf::from("./out/style.min.gz")));

    mapping.ext_dot = ExtDot::First;
    let pairs = ex.expand(&mapping).unwrap();
    assert_eq!(pairs[0].dest, Some(PathBuf::from("./out/style.gz")));
}

#[test]
fn flatten_drops_directories() {
    let fs = project();
    let ex = expander(&fs, EmptyMatchPolicy::Warn);

    let mapping = FileMapping::from_patterns(["**/*.js"])
        .with_cwd("src")
        .with_dest("build/js")
        .expanded()
        .flattened();

    let dests: Vec<_> = ex
        .expand(&mapping)
        .unwrap()
        .into_iter()
        .filter_map(|p| p.dest)
        .collect();
    assert!(dests.contains(&PathBuf::from("./build/js/tiny.js")));
    assert!(dests.iter().all(|d| d.parent() == Some(PathBuf::from("./build/js").as_path())));
}

#[test]
fn nonull_keeps_missing_literals() {
    let fs = project();
    let ex = expander(&fs, EmptyMatchPolicy::Warn);

    let mut mapping = FileMapping::from_patterns(["src/js/app.js", "src/js/missing.js"])
        .with_dest("build/script.js");
    assert_eq!(ex.expand(&mapping).unwrap().len(), 1);

    mapping.nonull = true;
    let pairs = ex.expand(&mapping).unwrap();
    assert_eq!(
        srcs(&pairs),
        vec![PathBuf::from("./src/js/app.js"), PathBuf::from("./src/js/missing.js")]
    );
}

#[test]
fn empty_match_follows_policy() {
    let fs = project();
    let mapping = FileMapping::from_patterns(["src/**/*.coffee"]);

    assert!(expander(&fs, EmptyMatchPolicy::Warn)
        .expand(&mapping)
        .unwrap()
        .is_empty());
    assert!(expander(&fs, EmptyMatchPolicy::Ignore)
        .expand(&mapping)
        .unwrap()
        .is_empty());
    assert!(matches!(
        expander(&fs, EmptyMatchPolicy::Error).expand(&mapping),
        Err(ExpandError::NoMatches { .. })
    ));
}

#[test]
fn expand_without_dest_is_an_error() {
    let fs = project();
    let ex = expander(&fs, EmptyMatchPolicy::Warn);
    let mapping = FileMapping::from_patterns(["src/js/*.js"]).expanded();
    assert!(matches!(ex.expand(&mapping), Err(ExpandError::MissingDest(_))));
}

#[test]
fn files_produced_later_are_seen_on_next_expansion() {
    let fs = project();
    let ex = expander(&fs, EmptyMatchPolicy::Warn);
    let mapping = FileMapping::from_patterns(["build/assets/js/*.js"]);

    assert!(ex.expand(&mapping).unwrap().is_empty());
    fs.add_file("./build/assets/js/script.js", "x");
    assert_eq!(ex.expand(&mapping).unwrap().len(), 1);
}
