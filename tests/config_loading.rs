use std::fs;

use hexsite::{
    config::{ConfigLoader, ModelConfig},
    filter::{self, Operator},
    grid::InfraKind,
};

fn loader_with(files: &[(&str, &str)]) -> (tempfile::TempDir, ConfigLoader) {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in files {
        fs::write(dir.path().join(name), body).unwrap();
    }
    let loader = ConfigLoader::new(dir.path());
    (dir, loader)
}

#[test]
fn written_model_loads_back() {
    let mut config = ModelConfig::builtin().unwrap();
    config.name = "fish-variant".into();
    config.sampling.interval_km = 2.5;
    let yaml = config.to_yaml().unwrap();
    let (_dir, loader) = loader_with(&[("model.yaml", &yaml)]);

    let loaded = loader.load_model("model.yaml").unwrap();
    assert_eq!(loaded.name, "fish-variant");
    assert_eq!(loaded.engine_settings().sample_interval_km, 2.5);
    assert_eq!(loaded.pars.len(), config.pars.len());
    assert_eq!(loaded.infra_kinds().unwrap(), vec![InfraKind::Grid, InfraKind::Road]);
}

#[test]
fn model_errors_name_the_file() {
    let bad = "name: broken\npars:\n  - col: duration\n    val: 10\n    min: 5\n    max: 1\n";
    let (_dir, loader) = loader_with(&[("broken.yaml", bad)]);
    let err = loader.load_model("broken.yaml").unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("broken.yaml"));
    assert!(message.contains("duration"));
}

#[test]
fn missing_file_is_reported() {
    let (_dir, loader) = loader_with(&[]);
    let err = loader.load_model("absent.yaml").unwrap_err();
    assert!(format!("{err:#}").contains("absent.yaml"));
}

#[test]
fn filter_file_compiles_to_map_expression() {
    let body = "- attribute: profit\n  operator: \">\"\n  threshold: 0\n- var: tech\n  op: \"==\"\n  val: cage\n";
    let (_dir, loader) = loader_with(&[("filter.yaml", body)]);
    let spec = loader.load_filter("filter.yaml").unwrap();
    assert_eq!(spec.len(), 2);
    assert_eq!(spec[0].operator, Operator::Gt);

    let expression = filter::build(&spec).unwrap().to_expression();
    assert_eq!(expression[0], "all");
    assert_eq!(expression[1][0], ">");
    assert_eq!(expression[1][1][1], "profit");
    assert_eq!(expression[2][2], "cage");
}

#[test]
fn filter_on_unknown_attribute_is_rejected() {
    let body = "- attribute: altitude\n  operator: \">\"\n  threshold: 3\n";
    let (_dir, loader) = loader_with(&[("filter.yaml", body)]);
    let err = loader.load_filter("filter.yaml").unwrap_err();
    assert!(format!("{err:#}").contains("altitude"));
}

#[test]
fn ordering_operator_on_category_is_rejected() {
    let body = "- attribute: tech\n  operator: \">\"\n  threshold: cage\n";
    let (_dir, loader) = loader_with(&[("filter.yaml", body)]);
    assert!(loader.load_filter("filter.yaml").is_err());
}
