use super::{apply_env, apply_file, load_settings, resolve_data_dir, Settings};

use std::{collections::HashMap, path::PathBuf};

use client_core::AuthScheme;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
api_base_url = "https://gateway.example.com"
auth_scheme = "bearer"
db = "analytics"
request_timeout_secs = 30
data_dir = "/tmp/cloudlinker-test"
log = "debug"
"#,
    )
    .expect("apply file");

    assert_eq!(settings.api_base_url, "https://gateway.example.com");
    assert_eq!(settings.auth_scheme, AuthScheme::Bearer);
    assert_eq!(settings.default_db.as_deref(), Some("analytics"));
    assert_eq!(settings.request_timeout_secs, Some(30));
    assert_eq!(settings.data_dir, Some(PathBuf::from("/tmp/cloudlinker-test")));
    assert_eq!(settings.log_filter, "debug");
}

#[test]
fn unknown_auth_scheme_in_file_is_an_error() {
    let mut settings = Settings::default();
    assert!(apply_file(&mut settings, r#"auth_scheme = "basic""#).is_err());
}

#[test]
fn prefixed_env_wins_over_plain_env() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env(&[
            ("API_BASE_URL", "http://plain:8000"),
            ("APP__API_BASE_URL", "http://prefixed:8000"),
            ("APP__AUTH_SCHEME", "bearer"),
            ("APP__DB", "  "),
            ("APP__REQUEST_TIMEOUT_SECS", "soon"),
        ]),
    );

    assert_eq!(settings.api_base_url, "http://prefixed:8000");
    assert_eq!(settings.auth_scheme, AuthScheme::Bearer);
    assert_eq!(settings.default_db, None);
    assert_eq!(settings.request_timeout_secs, None);
}

#[test]
fn session_config_carries_timeout() {
    let settings = Settings {
        request_timeout_secs: Some(5),
        ..Settings::default()
    };
    let config = settings.session_config();
    assert_eq!(config.request_timeout, Some(std::time::Duration::from_secs(5)));
    assert_eq!(config.api_base_url, settings.api_base_url);
}

#[test]
fn explicit_config_path_must_exist() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("missing.toml");
    assert!(load_settings(Some(missing.as_path())).is_err());

    let present = dir.path().join("present.toml");
    std::fs::write(&present, r#"log = "trace""#).expect("write");
    let settings = load_settings(Some(present.as_path())).expect("load");
    assert_eq!(settings.log_filter, "trace");
}

#[test]
fn explicit_data_dir_is_used_verbatim() {
    let settings = Settings {
        data_dir: Some(PathBuf::from("/var/lib/cloudlinker")),
        ..Settings::default()
    };
    assert_eq!(
        resolve_data_dir(&settings).expect("data dir"),
        PathBuf::from("/var/lib/cloudlinker")
    );
}
