//! Unit tests for `AppError` display format.

use task_reminder::AppError;

#[test]
fn each_variant_has_its_own_prefix() {
    let cases = [
        (AppError::Config("bad".into()), "config: bad"),
        (AppError::Load("missing".into()), "load: missing"),
        (AppError::Connectivity("down".into()), "connectivity: down"),
        (AppError::Schedule("nope".into()), "schedule: nope"),
    ];
    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn load_and_connectivity_are_distinct() {
    let load = AppError::Load("x".into());
    let connectivity = AppError::Connectivity("x".into());
    assert_ne!(load.to_string(), connectivity.to_string());
}

#[test]
fn toml_errors_convert_to_config() {
    let parse_err = toml::from_str::<toml::Value>("= broken").expect_err("invalid toml");
    let err = AppError::from(parse_err);
    assert!(matches!(err, AppError::Config(ref msg) if msg.starts_with("invalid config")));
}

#[test]
fn implements_std_error() {
    fn assert_error<E: std::error::Error>(_: &E) {}
    let err = AppError::Load("test".into());
    assert_error(&err);
    assert!(format!("{err:?}").contains("Load"));
}
