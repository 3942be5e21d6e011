    use super::*;
    use std::path::PathBuf;

    fn paths(issues: &[Issue]) -> Vec<&'static str> {
        issues.iter().map(|i| i.path).collect()
    }

    #[test]
    fn test_defaults_pass_cleanly() {
        let report = ConfigValidator::validate(&Config::default());
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_zero_viewport_and_capacity() {
        let mut config = Config::default();
        config.browser.viewport_height = 0;
        config.logs.capacity = 0;

        let report = ConfigValidator::validate(&config);
        assert!(!report.is_valid());
        assert_eq!(paths(&report.errors), vec!["browser.viewport", "logs.capacity"]);
    }

    #[test]
    fn test_connection_limits() {
        let mut config = Config::default();
        config.daemon.max_connections = 0;
        config.daemon.max_request_bytes = 16;

        let report = ConfigValidator::validate(&config);
        assert_eq!(
            paths(&report.errors),
            vec!["daemon.max_connections", "daemon.max_request_bytes"]
        );
    }

    #[test]
    fn test_timeouts_outside_range() {
        let mut config = Config::default();
        config.browser.action_timeout_ms = 0;
        config.browser.navigation_timeout_ms = MAX_TIMEOUT_MS + 1;

        let report = ConfigValidator::validate(&config);
        assert_eq!(
            paths(&report.errors),
            vec!["browser.action_timeout_ms", "browser.navigation_timeout_ms"]
        );

        config.browser.navigation_timeout_ms = MAX_TIMEOUT_MS;
        config.browser.action_timeout_ms = 1;
        assert!(ConfigValidator::validate(&config).is_valid());
    }

    #[test]
    fn test_cdp_url_scheme() {
        let mut config = Config::default();
        config.browser.cdp_url = Some("ws://127.0.0.1:9222/devtools/browser/x".to_string());
        assert!(ConfigValidator::validate(&config).is_valid());

        config.browser.cdp_url = Some("ftp://127.0.0.1:9222".to_string());
        let report = ConfigValidator::validate(&config);
        assert!(report.errors[0].message.contains("ftp"));

        config.browser.cdp_url = Some("not a url".to_string());
        assert!(!ConfigValidator::validate(&config).is_valid());
    }

    #[test]
    fn test_missing_executable_only_warns() {
        let mut config = Config::default();
        config.browser.executable_path = Some(PathBuf::from("/nonexistent/chrome-for-testing"));

        let report = ConfigValidator::validate(&config);
        assert!(report.is_valid());
        assert_eq!(paths(&report.warnings), vec!["browser.executable_path"]);
    }

    #[test]
    fn test_extensions_warn_only_when_headless() {
        let mut config = Config::default();
        config.browser.extensions = vec![PathBuf::from("/ext/adblock")];
        assert_eq!(
            paths(&ConfigValidator::validate(&config).warnings),
            vec!["browser.extensions"]
        );

        config.browser.headless = false;
        assert!(ConfigValidator::validate(&config).warnings.is_empty());
    }

    #[test]
    fn test_long_shutdown_grace_warns() {
        let mut config = Config::default();
        config.daemon.shutdown_timeout_secs = 300;

        let report = ConfigValidator::validate(&config);
        assert!(report.is_valid());
        assert_eq!(paths(&report.warnings), vec!["daemon.shutdown_timeout_secs"]);
    }

    #[test]
    fn test_issue_display() {
        let issue = Issue {
            path: "logs.capacity",
            message: "must be greater than 0".to_string(),
        };
        assert_eq!(issue.to_string(), "logs.capacity: must be greater than 0");
    }
