use super::*;
use serial_test::serial;
use std::env;
use std::net::IpAddr;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

fn clear_pinpoint_env() {
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe {
        env::remove_var("PINPOINT_PORT");
        env::remove_var("PINPOINT_BIND_ADDR");
        env::remove_var("PINPOINT_UPSTREAM_URL");
        env::remove_var("PINPOINT_INVOKE_URL");
        env::remove_var("PINPOINT_TIMEOUT_MS");
        env::remove_var("PINPOINT_UPSTREAM_RETRIES");
        env::remove_var("PINPOINT_CLARIFY_THRESHOLD");
        env::remove_var("PINPOINT_STRICT_EMPTY_THRESHOLD");
        env::remove_var("PINPOINT_MEDIUM_CLARIFY");
        env::remove_var("PINPOINT_MIN_OVERLAP");
        env::remove_var("PINPOINT_RESOLVER_FIRST_SEARCH");
        env::remove_var("PINPOINT_MEMO_CAPACITY");
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.port, 8080);
    assert_eq!(
        config.bind_addr,
        IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1))
    );
    assert_eq!(config.upstream_url, DEFAULT_UPSTREAM_URL);
    assert_eq!(config.invoke_url, DEFAULT_INVOKE_URL);
    assert_eq!(config.timeout_ms, 4_000);
    assert_eq!(config.upstream_retries, 1);
    assert!(config.medium_clarify_enabled);
    assert!(!config.resolver_first_search);
    assert_eq!(config.memo_capacity, 256);
}

#[test]
fn test_socket_addr() {
    let config = Config::default();
    assert_eq!(config.socket_addr(), "127.0.0.1:8080");

    let config = Config {
        port: 3000,
        bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
        ..Default::default()
    };
    assert_eq!(config.socket_addr(), "0.0.0.0:3000");
}

#[test]
#[serial]
fn test_from_env_with_defaults() {
    clear_pinpoint_env();

    let config = Config::from_env().expect("should parse with defaults");

    assert_eq!(config.port, 8080);
    assert_eq!(config.timeout_ms, 4_000);
    assert_eq!(config.clarify_threshold, super::DEFAULT_CLARIFY_THRESHOLD);
}

#[test]
#[serial]
fn test_from_env_custom_port() {
    clear_pinpoint_env();

    with_env_vars(&[("PINPOINT_PORT", "3000")], || {
        let config = Config::from_env().expect("should parse");
        assert_eq!(config.port, 3000);
    });
}

#[test]
#[serial]
fn test_from_env_custom_urls_and_budget() {
    clear_pinpoint_env();

    with_env_vars(
        &[
            ("PINPOINT_UPSTREAM_URL", "https://search.internal/v2"),
            ("PINPOINT_INVOKE_URL", "https://invoke.internal/v2"),
            ("PINPOINT_TIMEOUT_MS", "2500"),
            ("PINPOINT_UPSTREAM_RETRIES", "3"),
        ],
        || {
            let config = Config::from_env().expect("should parse");
            assert_eq!(config.upstream_url, "https://search.internal/v2");
            assert_eq!(config.invoke_url, "https://invoke.internal/v2");
            assert_eq!(config.timeout_ms, 2500);
            assert_eq!(config.request_budget(), std::time::Duration::from_millis(2500));
            assert_eq!(config.upstream_retries, 3);
        },
    );
}

#[test]
#[serial]
fn test_from_env_threshold_overrides() {
    clear_pinpoint_env();

    with_env_vars(
        &[
            ("PINPOINT_CLARIFY_THRESHOLD", "0.5"),
            ("PINPOINT_STRICT_EMPTY_THRESHOLD", "0.9"),
            ("PINPOINT_MEDIUM_CLARIFY", "false"),
            ("PINPOINT_MIN_OVERLAP", "0.25"),
        ],
        || {
            let config = Config::from_env().expect("should parse");
            assert_eq!(config.clarify_threshold, 0.5);
            assert_eq!(config.strict_empty_threshold, 0.9);
            assert!(!config.medium_clarify_enabled);
            assert_eq!(config.min_overlap, 0.25);

            let thresholds = config.ambiguity_thresholds();
            assert_eq!(thresholds.clarify, 0.5);
            assert_eq!(thresholds.strict_empty, 0.9);
            assert!(!thresholds.medium_clarify_enabled);
        },
    );
}

#[test]
#[serial]
fn test_from_env_resolver_first_search_flag() {
    clear_pinpoint_env();

    with_env_vars(&[("PINPOINT_RESOLVER_FIRST_SEARCH", "1")], || {
        let config = Config::from_env().expect("should parse");
        assert!(config.resolver_first_search);
    });
}

#[test]
#[serial]
fn test_invalid_port_zero() {
    clear_pinpoint_env();

    with_env_vars(&[("PINPOINT_PORT", "0")], || {
        let result = Config::from_env();
        assert!(result.is_err());

        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { .. }));
        assert!(err.to_string().contains("invalid port"));
    });
}

#[test]
#[serial]
fn test_invalid_port_not_number() {
    clear_pinpoint_env();

    with_env_vars(&[("PINPOINT_PORT", "not_a_port")], || {
        let result = Config::from_env();
        assert!(result.is_err());

        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::PortParseError { .. }));
        assert!(err.to_string().contains("failed to parse port"));
    });
}

#[test]
#[serial]
fn test_invalid_bind_addr() {
    clear_pinpoint_env();

    with_env_vars(&[("PINPOINT_BIND_ADDR", "not.an.ip.address")], || {
        let result = Config::from_env();
        assert!(result.is_err());

        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));
        assert!(err.to_string().contains("failed to parse bind address"));
    });
}

#[test]
#[serial]
fn test_invalid_timeout_falls_back_to_default() {
    clear_pinpoint_env();

    with_env_vars(&[("PINPOINT_TIMEOUT_MS", "not_a_number")], || {
        let config = Config::from_env().expect("should parse with fallback");
        assert_eq!(config.timeout_ms, 4_000);
    });
}

#[test]
fn test_validate_rejects_non_http_url() {
    let config = Config {
        upstream_url: "ftp://search.internal".to_string(),
        ..Default::default()
    };
    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidUrl { .. }));
}

#[test]
fn test_validate_rejects_zero_timeout() {
    let config = Config {
        timeout_ms: 0,
        ..Default::default()
    };
    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidTimeout { .. }));
}

#[test]
fn test_validate_rejects_out_of_range_threshold() {
    let config = Config {
        min_overlap: 1.5,
        ..Default::default()
    };
    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidThresholds { .. }));
}

#[test]
fn test_validate_rejects_inverted_bands() {
    let config = Config {
        clarify_threshold: 0.9,
        strict_empty_threshold: 0.4,
        ..Default::default()
    };
    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidThresholds { .. }));
    assert!(err.to_string().contains("clarify_threshold"));
}

#[test]
fn test_validate_success_with_defaults() {
    let config = Config::default();
    assert!(config.validate().is_ok());
}
