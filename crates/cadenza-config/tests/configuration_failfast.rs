//! Malformed configuration files must fail loudly rather than fall back.

use std::ffi::OsString;
use std::fs;

use rstest::rstest;
use tempfile::TempDir;
use ortho_config::OrthoConfig;

use cadenza_config::Config;

#[rstest]
#[case::broken_toml(r#"port = 6600 hostname = "::""#)]
#[case::wrong_type("port = \"not a number\"")]
#[case::out_of_range("port = 70000")]
fn malformed_config_file_is_rejected(#[case] contents: &str) {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("cadenza.toml");
    fs::write(&path, contents).expect("write malformed config");

    let args = vec![
        OsString::from("cadenzad"),
        OsString::from("--config-path"),
        path.into_os_string(),
    ];

    let result = Config::load_from_iter(args);
    assert!(result.is_err(), "expected failure, got {result:?}");
}
