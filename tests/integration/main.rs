//! Integration tests for fmtd

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// Command isolated from the user's daemon settings
    fn fmtd(dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("fmtd");
        cmd.current_dir(dir)
            .env("FMTD_DAEMON_CONFIG", dir.join("daemon.toml"))
            .env_remove("FMTD_DEFAULT_CONFIG");
        cmd
    }

    fn project(config: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".formatrc"), config).unwrap();
        temp
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        fmtd(temp.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Warm formatting daemon core"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        fmtd(temp.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("fmtd"));
    }

    #[test]
    fn formats_stdin_with_project_config() {
        let temp = project("tab_width = 4\n");
        fmtd(temp.path())
            .args(["format", "a.js"])
            .write_stdin("function f(){return 1}")
            .assert()
            .success()
            .stdout("function f() {\n    return 1\n}\n");
    }

    #[test]
    fn flags_override_project_config() {
        let temp = project("tab_width = 4\n");
        fmtd(temp.path())
            .args(["format", "a.js", "--tab-width", "2", "--single-quote"])
            .write_stdin("let s = \"x\"")
            .assert()
            .success()
            .stdout("let s = 'x'\n");
    }

    #[test]
    fn formats_json() {
        let temp = TempDir::new().unwrap();
        fmtd(temp.path())
            .args(["format", "package.json"])
            .write_stdin(r#"{"name":"demo","files":["a","b"]}"#)
            .assert()
            .success()
            .stdout("{\n  \"name\": \"demo\",\n  \"files\": [\"a\", \"b\"]\n}\n");
    }

    #[test]
    fn default_config_from_client_env() {
        let temp = TempDir::new().unwrap();
        let fallback = temp.path().join("fallback.toml");
        std::fs::write(&fallback, "use_tabs = true\n").unwrap();

        fmtd(temp.path())
            .env("FMTD_DEFAULT_CONFIG", &fallback)
            .args(["format", "a.js"])
            .write_stdin("f(){g()}")
            .assert()
            .success()
            .stdout("f() {\n\tg()\n}\n");
    }

    #[test]
    fn syntax_error_exits_nonzero() {
        let temp = TempDir::new().unwrap();
        fmtd(temp.path())
            .args(["format", "a.js"])
            .write_stdin("function f() {")
            .assert()
            .failure()
            .stdout("")
            .stderr(predicate::str::contains("Error:").and(predicate::str::contains("unclosed")));
    }

    #[test]
    fn malformed_config_is_reported_with_hint() {
        let temp = project("tab_width = \n");
        fmtd(temp.path())
            .args(["format", "a.js"])
            .write_stdin("a()")
            .assert()
            .failure()
            .stderr(
                predicate::str::contains("Malformed config")
                    .and(predicate::str::contains("--no-config")),
            );
    }

    #[test]
    fn no_config_skips_broken_file() {
        let temp = project("tab_width = \n");
        fmtd(temp.path())
            .args(["format", "a.js", "--no-config"])
            .write_stdin("a()")
            .assert()
            .success()
            .stdout("a()\n");
    }

    #[test]
    fn unsupported_extension() {
        let temp = TempDir::new().unwrap();
        fmtd(temp.path())
            .args(["format", "notes.txt"])
            .write_stdin("hello")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Supported extensions"));
    }

    #[test]
    fn ignored_file_is_echoed() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".formatignore"), "*.min.js\n").unwrap();
        fmtd(temp.path())
            .args(["format", "app.min.js"])
            .write_stdin("f(){g()}")
            .assert()
            .success()
            .stdout("f(){g()}");
    }

    #[test]
    fn flush_cache_acknowledges() {
        let temp = TempDir::new().unwrap();
        fmtd(temp.path())
            .arg("flush-cache")
            .assert()
            .success()
            .stdout("success\n");
    }

    #[test]
    fn debug_info_reports_empty_cache() {
        let temp = TempDir::new().unwrap();
        fmtd(temp.path())
            .arg("debug-info")
            .assert()
            .success()
            .stdout(
                predicate::str::contains("fmtd version:")
                    .and(predicate::str::contains("Cache: miss"))
                    .and(predicate::str::contains("\"resolved configs\" contains 0 items"))
                    .and(predicate::str::contains("\"file options\" contains 0 items")),
            );
    }

    #[test]
    fn debug_info_json() {
        let temp = TempDir::new().unwrap();
        fmtd(temp.path())
            .args(["debug-info", "--output", "json", "a.ts"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"cache_info\"").and(predicate::str::contains("\"cache_hit\": false")));
    }

    #[test]
    fn config_path_honors_override() {
        let temp = TempDir::new().unwrap();
        fmtd(temp.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("daemon.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        fmtd(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]").and(predicate::str::contains("[resolver]")));
    }

    #[test]
    fn config_init_then_refuses_overwrite() {
        let temp = TempDir::new().unwrap();
        fmtd(temp.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(temp.path().join("daemon.toml").exists());

        fmtd(temp.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn invalid_daemon_config_fails() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("daemon.toml"), "[general]\nlog_format = \"xml\"\n").unwrap();

        fmtd(temp.path())
            .args(["flush-cache"])
            .assert()
            .failure()
            .stderr(
                predicate::str::contains("Invalid configuration")
                    .and(predicate::str::contains("fmtd config init --force")),
            );
    }
}
