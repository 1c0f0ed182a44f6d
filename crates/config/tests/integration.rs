//! Integration tests for config

#[cfg(test)]
mod tests {
    use imgkit_config::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_VARS: [&str; 4] = [
        "IMGKIT_LOG_LEVEL",
        "IMGKIT_ROOT",
        "IMGKIT_LOCK_FILE",
        "IMGKIT_UMASK",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[general]
log_level = "debug"

[paths]
root = "/var/tmp/image-root"
lock_file = "/run/imgkit.lock"

[process]
umask = 0o077

[process.env]
SOURCE_DATE_EPOCH = "0"
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.root_path(), PathBuf::from("/var/tmp/image-root"));
        assert_eq!(config.paths.lock_file, Some(PathBuf::from("/run/imgkit.lock")));
        assert_eq!(config.process.umask, Some(0o077));
        assert_eq!(config.process.env["SOURCE_DATE_EPOCH"], "0");
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[paths]\nroot = \"/mnt\"").unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.process.umask, None);
        assert!(config.process.env.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let err = Config::load_or_default(Some(std::path::Path::new("/nonexistent/imgkit.toml")))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_invalid_toml_is_parse_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[general\nlog_level = ").unwrap();

        let err = Config::load_from_file(temp_file.path()).await.unwrap_err();
        assert!(matches!(
            err,
            imgkit_errors::Error::Config(imgkit_errors::ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.root_path(), PathBuf::from("/"));
        assert_eq!(config.process.umask, None);
        assert!(config.paths.lock_file.is_none());
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("IMGKIT_LOG_LEVEL", "info");
        std::env::set_var("IMGKIT_ROOT", "/srv/root");
        std::env::set_var("IMGKIT_LOCK_FILE", "/run/lock/imgkit");
        std::env::set_var("IMGKIT_UMASK", "027");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.root_path(), PathBuf::from("/srv/root"));
        assert_eq!(
            config.paths.lock_file,
            Some(PathBuf::from("/run/lock/imgkit"))
        );
        assert_eq!(config.process.umask, Some(0o027));

        clear_env();
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("IMGKIT_UMASK", "999");
        let mut config = Config::default();
        assert!(config.merge_env().is_err());

        clear_env();
        std::env::set_var("IMGKIT_LOG_LEVEL", "loud");
        let mut config = Config::default();
        assert!(config.merge_env().is_err());

        clear_env();
    }

    #[test]
    fn test_parse_umask() {
        assert_eq!(parse_umask("umask", "022").unwrap(), 0o022);
        assert_eq!(parse_umask("umask", "0o750").unwrap(), 0o750);
        assert!(parse_umask("umask", "1000").is_err());
        assert!(parse_umask("umask", "08").is_err());
        assert!(parse_umask("umask", "").is_err());
    }
}
