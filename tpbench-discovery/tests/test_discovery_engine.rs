//! End-to-end tests for pattern-driven and manual discovery

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::{
    finding, seed_measurements, seed_pattern_with_rules, StubCpgGenerator, StubRuleRunner,
};

use tpbench_core::config::Config;
use tpbench_core::domain::value_objects::{Language, ToolDescriptor};
use tpbench_core::infrastructure::CatalogStore;
use tpbench_discovery::{DiscoveryEngine, DiscoveryError};

struct Setup {
    engine: DiscoveryEngine,
    runner: Arc<StubRuleRunner>,
    _tp_lib: tempfile::TempDir,
    src: tempfile::TempDir,
    out: tempfile::TempDir,
    tp_lib_path: PathBuf,
}

fn setup(runner: StubRuleRunner, config: Config, seed: impl Fn(&std::path::Path)) -> Setup {
    let tp_lib = tempfile::tempdir().unwrap();
    seed(tp_lib.path());
    let runner = Arc::new(runner);
    let engine = DiscoveryEngine::with_components(
        CatalogStore::new(tp_lib.path()).unwrap(),
        Arc::new(StubCpgGenerator { fail: false }),
        runner.clone(),
        &config,
    );
    let tp_lib_path = tp_lib.path().to_path_buf();
    Setup {
        engine,
        runner,
        _tp_lib: tp_lib,
        src: tempfile::tempdir().unwrap(),
        out: tempfile::tempdir().unwrap(),
        tp_lib_path,
    }
}

fn tool() -> ToolDescriptor {
    ToolDescriptor::new("T", "1")
}

#[tokio::test]
async fn only_undetected_instances_are_discovered() {
    let runner = StubRuleRunner::new()
        .with_findings("rule_1.sc", vec![finding("app.php", 3, "main")])
        .with_findings("rule_2.sc", vec![finding("app.php", 9, "main")]);
    let s = setup(runner, Config::default(), |tp_lib| {
        seed_pattern_with_rules(
            tp_lib,
            "PHP",
            1,
            "static_variables",
            &[(1, Some("rule_1.sc")), (2, Some("rule_2.sc"))],
        );
        // Tool T detects instance 1 but misses instance 2
        seed_measurements(tp_lib, "PHP", 1, "static_variables", "T", "1", &[(1, true), (2, false)]);
    });

    let summary = s
        .engine
        .discover(s.src.path(), &[1], &Language::new("PHP"), &[tool()], "app", s.out.path(), false)
        .await
        .unwrap();

    let executed = s.runner.executed.lock().unwrap().clone();
    assert_eq!(executed.len(), 1, "only the missed instance's rule runs");
    assert!(executed[0].ends_with("rule_2.sc"));
    assert_eq!(summary.used_measured_patterns_ids, vec![1]);
    assert_eq!(summary.findings, 1);
}

#[tokio::test]
async fn shared_rule_runs_once_and_joins_instance_ids() {
    let runner =
        StubRuleRunner::new().with_findings("shared.sc", vec![finding("app.php", 3, "main")]);
    let s = setup(runner, Config::default(), |tp_lib| {
        seed_pattern_with_rules(
            tp_lib,
            "PHP",
            1,
            "static_variables",
            &[(1, Some("../shared.sc")), (2, Some("../shared.sc"))],
        );
        seed_measurements(tp_lib, "PHP", 1, "static_variables", "T", "1", &[(1, false), (2, false)]);
    });

    let summary = s
        .engine
        .discover(s.src.path(), &[1], &Language::new("PHP"), &[tool()], "app", s.out.path(), false)
        .await
        .unwrap();

    assert_eq!(s.runner.executed.lock().unwrap().len(), 1, "rule deduplicated");
    assert_eq!(summary.findings, 1);

    let csv = std::fs::read_to_string(&summary.csv_path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "filename,lineNumber,methodFullName,patternId,instanceId,patternName,queryFile"
    );
    let row = lines.next().unwrap();
    assert!(row.contains("\"1, 2\""), "instanceId joins both instances: {}", row);
    assert!(row.starts_with("app.php,3,main,1,"));
    assert!(lines.next().is_none(), "exact duplicates removed");
}

#[tokio::test]
async fn unmeasured_patterns_are_gated_unless_ignored() {
    let make_runner =
        || StubRuleRunner::new().with_findings("rule_1.sc", vec![finding("app.php", 3, "main")]);

    let s = setup(make_runner(), Config::default(), |tp_lib| {
        seed_pattern_with_rules(tp_lib, "PHP", 1, "static_variables", &[(1, Some("rule_1.sc"))]);
    });
    let summary = s
        .engine
        .discover(s.src.path(), &[1], &Language::new("PHP"), &[tool()], "app", s.out.path(), false)
        .await
        .unwrap();
    assert_eq!(summary.ignored_not_measured_patterns_ids, vec![1]);
    assert!(s.runner.executed.lock().unwrap().is_empty());

    // ignore=true bypasses the gate
    let s = setup(make_runner(), Config::default(), |tp_lib| {
        seed_pattern_with_rules(tp_lib, "PHP", 1, "static_variables", &[(1, Some("rule_1.sc"))]);
    });
    let summary = s
        .engine
        .discover(s.src.path(), &[1], &Language::new("PHP"), &[tool()], "app", s.out.path(), true)
        .await
        .unwrap();
    assert!(summary.ignored_not_measured_patterns_ids.is_empty());
    assert_eq!(summary.findings, 1);
}

#[tokio::test]
async fn deny_listed_patterns_are_skipped() {
    let mut config = Config::default();
    config.discovery.skip_pattern_ids = vec![1];
    let s = setup(StubRuleRunner::new(), config, |tp_lib| {
        seed_pattern_with_rules(tp_lib, "PHP", 1, "static_variables", &[(1, Some("rule_1.sc"))]);
        seed_measurements(tp_lib, "PHP", 1, "static_variables", "T", "1", &[(1, false)]);
    });

    let summary = s
        .engine
        .discover(s.src.path(), &[1], &Language::new("PHP"), &[tool()], "app", s.out.path(), false)
        .await
        .unwrap();
    assert_eq!(summary.skipped_pattern_ids, vec![1]);
    assert!(s.runner.executed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failing_rule_is_recorded_and_others_continue() {
    let runner = StubRuleRunner::new()
        .failing_on("rule_1.sc")
        .with_findings("rule_2.sc", vec![finding("app.php", 9, "main")]);
    let s = setup(runner, Config::default(), |tp_lib| {
        seed_pattern_with_rules(
            tp_lib,
            "PHP",
            1,
            "static_variables",
            &[(1, Some("rule_1.sc")), (2, Some("rule_2.sc"))],
        );
        seed_measurements(tp_lib, "PHP", 1, "static_variables", "T", "1", &[(1, false), (2, false)]);
    });

    let summary = s
        .engine
        .discover(s.src.path(), &[1], &Language::new("PHP"), &[tool()], "app", s.out.path(), false)
        .await
        .unwrap();

    assert_eq!(summary.findings, 1, "healthy rule still produced its row");
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].instance_ids, vec![1]);
}

#[tokio::test]
async fn cpg_failure_is_fatal() {
    let tp_lib = tempfile::tempdir().unwrap();
    seed_pattern_with_rules(tp_lib.path(), "PHP", 1, "static_variables", &[(1, Some("rule_1.sc"))]);
    let engine = DiscoveryEngine::with_components(
        CatalogStore::new(tp_lib.path()).unwrap(),
        Arc::new(StubCpgGenerator { fail: true }),
        Arc::new(StubRuleRunner::new()),
        &Config::default(),
    );

    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let err = engine
        .discover(src.path(), &[1], &Language::new("PHP"), &[tool()], "app", out.path(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::CPGGenerationError(_)));
}

#[tokio::test]
async fn missing_target_directory_is_fatal() {
    let s = setup(StubRuleRunner::new(), Config::default(), |tp_lib| {
        seed_pattern_with_rules(tp_lib, "PHP", 1, "static_variables", &[(1, Some("rule_1.sc"))]);
    });
    let err = s
        .engine
        .discover(
            &s.tp_lib_path.join("no_such_dir"),
            &[1],
            &Language::new("PHP"),
            &[tool()],
            "app",
            s.out.path(),
            false,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::Catalog(_)));
}

#[tokio::test]
async fn manual_discovery_filters_inputs_and_marks_empty_and_failing_rules() {
    let s = setup(
        StubRuleRunner::new()
            .with_findings("a.sc", vec![finding("app.php", 3, "main")])
            .failing_on("b.sc"),
        Config::default(),
        |_| {},
    );

    // dir with two .sc rules, one .py file, one nonexistent path, one .sc file
    let rules_dir = s.src.path().join("rules");
    std::fs::create_dir_all(&rules_dir).unwrap();
    std::fs::write(rules_dir.join("a.sc"), "").unwrap();
    std::fs::write(rules_dir.join("b.sc"), "").unwrap();
    let py_file = s.src.path().join("script.py");
    std::fs::write(&py_file, "").unwrap();
    let lone_rule = s.src.path().join("c.sc");
    std::fs::write(&lone_rule, "").unwrap();

    let summary = s
        .engine
        .manual_discovery(
            s.src.path(),
            "joern",
            &[
                rules_dir,
                py_file,
                s.src.path().join("does_not_exist.sc"),
                lone_rule,
            ],
            "app",
            s.out.path(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(summary.executed_rules, 3, "only the three .sc inputs run");
    assert_eq!(summary.findings, 1);

    let csv = std::fs::read_to_string(&summary.csv_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "filename,lineNumber,methodFullName,queryName,queryFile,result"
    );
    assert_eq!(lines.len(), 4, "header plus one row per rule");
    assert!(lines.iter().any(|l| l.starts_with("app.php,3,main,a,")));
    assert!(lines.iter().any(|l| l.contains(",NO_RESULT")), "c.sc found nothing");
    assert!(lines.iter().any(|l| l.contains("scripted failure")), "b.sc error row");
}

#[tokio::test]
async fn unsupported_manual_method_is_rejected() {
    let s = setup(StubRuleRunner::new(), Config::default(), |_| {});
    let err = s
        .engine
        .manual_discovery(s.src.path(), "codeql_query", &[], "app", s.out.path(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::DiscoveryMethodNotSupported(_)));
}
