//! CPG generation against a scripted toolchain
//!
//! A fake builder and a fake joern binary stand in for the real toolchain;
//! what matters here is the contract: placeholder substitution, the
//! missing-binary check, and the smoke-test gate.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tpbench_core::config::CpgGeneratorConfig;
use tpbench_discovery::{CpgGenerator, DiscoveryError, JoernCpgGenerator};

fn write_executable(path: &Path, content: &str) {
    std::fs::write(path, content).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// Fake toolchain: a builder that copies nothing but creates the binary,
/// and a joern that prints the given smoke-test answer.
fn toolchain(dir: &Path, builder_body: &str, joern_stdout: &str) -> CpgGeneratorConfig {
    let builder = dir.join("builder.sh");
    write_executable(&builder, &format!("#!/bin/sh\n{}\n", builder_body));

    let install = dir.join("joern-cli");
    std::fs::create_dir_all(&install).unwrap();
    write_executable(
        &install.join("joern"),
        &format!("#!/bin/sh\necho '{}'\n", joern_stdout),
    );

    CpgGeneratorConfig {
        command_template: format!("{} $SRC_DIR $BINARY_OUT", builder.display()),
        installation_dir: install,
    }
}

#[tokio::test]
async fn successful_build_passes_the_smoke_test() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let generator = JoernCpgGenerator::new(toolchain(tmp.path(), "touch \"$2\"", "12345"));
    let cpg = generator
        .generate(src.path(), "app", out.path(), None)
        .await
        .unwrap();

    assert_eq!(cpg, out.path().join("app.cpg.bin"));
    assert!(cpg.is_file());
}

#[tokio::test]
async fn failing_builder_is_a_generation_error() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let generator = JoernCpgGenerator::new(toolchain(tmp.path(), "exit 1", "12345"));
    let err = generator
        .generate(src.path(), "app", out.path(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::CPGGenerationError(_)));
}

#[tokio::test]
async fn builder_without_binary_is_a_generation_error() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    // Exits cleanly but never writes $BINARY_OUT
    let generator = JoernCpgGenerator::new(toolchain(tmp.path(), "true", "12345"));
    let err = generator
        .generate(src.path(), "app", out.path(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::CPGGenerationError(_)));
}

#[tokio::test]
async fn smoke_test_error_invalidates_the_build() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    // The builder succeeds, but loading the CPG reports the error marker
    let generator = JoernCpgGenerator::new(toolchain(
        tmp.path(),
        "touch \"$2\"",
        "Error in CPG generation",
    ));
    let err = generator
        .generate(src.path(), "app", out.path(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::CPGGenerationError(_)));
}
