use std::io::Write;

use fish_core::config::EnvironmentConfig;
use fish_core::{FishConfig, FishError};
use pretty_assertions::assert_eq;

#[test]
fn loads_yaml_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
aggregator:
  stable_age: 4
decision:
  rules:
    allowed_classes: [plastic]
mission:
  hq_point: {{ x: 1.0, y: 2.0, z: 0.0 }}
  limits:
    max_target_loss_ignore: 5
dump_points:
  - {{ x: 3.0, y: 4.0, z: 0.0 }}
environment:
  kind: mock
  current: 0.1
  risk: 0.0
  uncertainty: 0.0
"#
    )
    .unwrap();

    let config = FishConfig::load(file.path()).unwrap();
    assert_eq!(config.aggregator.stable_age, 4);
    assert_eq!(config.decision.rules.allowed_classes, vec!["plastic".to_string()]);
    assert_eq!(config.decision.rules.min_conf, 0.4);
    assert_eq!(config.mission.hq_point.y, 2.0);
    assert_eq!(config.mission.limits.max_target_loss_ignore, 5);
    assert_eq!(config.mission.limits.max_operation_retries, 2);
    assert_eq!(config.dump_points.len(), 1);
    assert_eq!(
        config.environment,
        EnvironmentConfig::Mock {
            current: 0.1,
            risk: 0.0,
            uncertainty: 0.0
        }
    );
}

#[test]
fn sample_config_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../configs/fish.yaml");
    let config = FishConfig::load(path).unwrap();
    assert_eq!(config.dump_points.len(), 3);
    assert!(matches!(config.environment, EnvironmentConfig::CurrentField { .. }));
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    match FishConfig::load(&path) {
        Err(FishError::ConfigIo { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected ConfigIo, got {other:?}"),
    }
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "aggregator: [not, a, map]").unwrap();
    assert!(matches!(
        FishConfig::load(file.path()),
        Err(FishError::ConfigParse(_))
    ));
}

#[test]
fn invalid_values_are_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "mission:\n  bin:\n    capacity: 0").unwrap();
    assert!(matches!(
        FishConfig::load(file.path()),
        Err(FishError::InvalidConfig(_))
    ));
}
