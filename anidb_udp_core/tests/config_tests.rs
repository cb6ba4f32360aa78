//! Layered configuration loading

use anidb_udp_core::config::{ClientSettings, ConfigError};
use anidb_udp_core::protocol::messages::Request;
use figment::Jail;
use std::path::Path;
use std::time::Duration;

#[test]
fn test_defaults_without_file_or_env() {
    Jail::expect_with(|_jail| {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");

        let settings = ClientSettings::load(Some(&missing)).unwrap();
        assert_eq!(settings.network.host, "api.anidb.net");
        assert_eq!(settings.network.port, 9000);
        assert_eq!(settings.rate_limit.short_delay_ms, 2500);
        assert_eq!(settings.rate_limit.long_delay_ms, 4000);
        assert!(settings.credentials.password.is_empty());
        Ok(())
    });
}

#[test]
fn test_toml_file_overrides_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "anidb.toml",
            r#"
                [network]
                host = "udp.example.net"
                local_port = 45678
                nat = true

                [client]
                name = "myclient"
                version = 7

                [credentials]
                username = "alice"
                password = "hunter2"

                [rate_limit]
                short_delay_ms = 3000
                long_delay_ms = 6000
            "#,
        )?;

        let settings = ClientSettings::load(Some(Path::new("anidb.toml"))).unwrap();
        assert_eq!(settings.network.host, "udp.example.net");
        assert_eq!(settings.network.port, 9000);
        assert_eq!(settings.network.local_port, 45678);
        assert_eq!(settings.client.name, "myclient");
        assert_eq!(settings.credentials.password.expose_secret(), "hunter2");

        let limits = settings.rate_limit.to_config();
        assert_eq!(limits.short_delay, Duration::from_millis(3000));
        assert_eq!(limits.long_delay, Duration::from_millis(6000));
        assert_eq!(limits.short_period, Duration::from_secs(3600));

        let auth = settings.auth_request();
        assert!(auth.nat);
        let params = auth.parameters();
        assert!(params.contains(&("user", "alice".to_string())));
        assert!(params.contains(&("client", "myclient".to_string())));
        assert!(params.contains(&("clientver", "7".to_string())));
        Ok(())
    });
}

#[test]
fn test_environment_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "anidb.toml",
            r#"
                [network]
                port = 9100

                [credentials]
                username = "alice"
                password = "from-file"
            "#,
        )?;
        jail.set_env("ANIDB_NETWORK__PORT", "9200");
        jail.set_env("ANIDB_CREDENTIALS__PASSWORD", "from-env");
        jail.set_env("ANIDB_RATE_LIMIT__RESET_PERIOD_SECS", "600");

        let settings = ClientSettings::load(Some(Path::new("anidb.toml"))).unwrap();
        assert_eq!(settings.network.port, 9200);
        assert_eq!(settings.credentials.username, "alice");
        assert_eq!(settings.credentials.password.expose_secret(), "from-env");
        assert_eq!(settings.rate_limit.reset_period_secs, 600);
        Ok(())
    });
}

#[test]
fn test_load_rejects_delay_below_floor() {
    Jail::expect_with(|jail| {
        jail.set_env("ANIDB_RATE_LIMIT__SHORT_DELAY_MS", "500");

        let err = ClientSettings::load(None).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "rate_limit.short_delay_ms",
                ..
            }
        ));
        Ok(())
    });
}

#[test]
fn test_malformed_value_is_load_error() {
    Jail::expect_with(|jail| {
        jail.set_env("ANIDB_NETWORK__PORT", "not-a-port");

        let err = ClientSettings::load(None).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
        Ok(())
    });
}

#[test]
fn test_password_is_masked_in_debug() {
    Jail::expect_with(|jail| {
        jail.set_env("ANIDB_CREDENTIALS__PASSWORD", "s3cret");

        let settings = ClientSettings::load(None).unwrap();
        assert_eq!(settings.credentials.password.expose_secret(), "s3cret");
        assert!(!format!("{settings:?}").contains("s3cret"));
        Ok(())
    });
}
