use super::*;

use std::collections::HashMap;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        prepare_cache_database_url("./data/cache.db").as_deref(),
        Some("sqlite://./data/cache.db")
    );
}

#[test]
fn empty_cache_location_disables_disk_cache() {
    assert_eq!(prepare_cache_database_url("   "), None);
}

#[test]
fn keeps_memory_and_explicit_urls() {
    assert_eq!(
        prepare_cache_database_url("sqlite::memory:").as_deref(),
        Some("sqlite::memory:")
    );
    assert_eq!(
        prepare_cache_database_url("sqlite:///tmp/cache.db").as_deref(),
        Some("sqlite:///tmp/cache.db")
    );
}

#[test]
fn normalizes_windows_paths_with_single_sqlite_colon() {
    assert_eq!(
        prepare_cache_database_url("C:\\Users\\alice\\cache.db").as_deref(),
        Some("sqlite:C:/Users/alice/cache.db")
    );
    assert_eq!(
        prepare_cache_database_url("sqlite://C:/Users/alice/cache.db").as_deref(),
        Some("sqlite:C:/Users/alice/cache.db")
    );
    assert_eq!(
        prepare_cache_database_url("sqlite:C:\\Users\\alice\\cache.db").as_deref(),
        Some("sqlite:C:/Users/alice/cache.db")
    );
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
base_url = "http://localhost:9000/guestbook/"
auth_token = "file-token"
idle_timeout_ms = 250
"#,
    )
    .expect("parse");

    assert_eq!(settings.base_url, "http://localhost:9000/guestbook/");
    assert_eq!(settings.auth_token.as_deref(), Some("file-token"));
    assert_eq!(settings.idle_timeout(), Duration::from_millis(250));
    assert_eq!(settings.log_filter, "info");
}

#[test]
fn malformed_file_is_rejected() {
    let mut settings = Settings::default();
    assert!(apply_file(&mut settings, "request_timeout_secs = \"soon\"").is_err());
    assert_eq!(settings, Settings::default());
}

#[test]
fn app_prefixed_env_wins_over_guestbook_prefix() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_from(&[
            ("GUESTBOOK_BASE_URL", "http://guestbook.local/"),
            ("APP__BASE_URL", "http://app.local/"),
            ("GUESTBOOK_AUTH_TOKEN", "env-token"),
            ("GUESTBOOK_REQUEST_TIMEOUT_SECS", "5"),
            ("APP__IDLE_TIMEOUT_MS", "not-a-number"),
        ]),
    );

    assert_eq!(settings.base_url, "http://app.local/");
    assert_eq!(settings.auth_token.as_deref(), Some("env-token"));
    assert_eq!(settings.request_timeout_secs, 5);
    assert_eq!(settings.idle_timeout_ms, Settings::default().idle_timeout_ms);
}

#[test]
fn context_options_carry_normalized_cache_url() {
    let settings = Settings {
        cache_database_url: "./cache/posts.db".into(),
        request_timeout_secs: 7,
        ..Settings::default()
    };
    let options = settings.context_options();

    assert_eq!(
        options.cache_database_url.as_deref(),
        Some("sqlite://./cache/posts.db")
    );
    assert_eq!(options.request_timeout, Duration::from_secs(7));
    assert_eq!(options.base_url, DEFAULT_BASE_URL);
}
