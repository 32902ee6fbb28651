//! Integration tests for Forge

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// Isolated from the user's config and environment
    fn forge(temp: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("forge");
        cmd.env("FORGE_CONFIG", temp.join("config.toml"))
            .env("FORGE_NON_INTERACTIVE", "1")
            .env_remove("FORGE_DIR")
            .env_remove("FORGE_LOG");
        cmd
    }

    fn install_dir(temp: &TempDir) -> std::path::PathBuf {
        temp.path().join("install")
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        forge(temp.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Cluster installer driven by a cached asset dependency graph",
            ));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        forge(temp.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("forge"));
    }

    #[test]
    fn create_install_config() {
        let temp = TempDir::new().unwrap();
        let dir = install_dir(&temp);

        forge(temp.path())
            .args(["create", "install-config", "--dir"])
            .arg(&dir)
            .assert()
            .success()
            .stdout(predicate::str::contains("install-config.yaml"));

        assert!(dir.join("install-config.yaml").exists());
        assert!(dir.join(".forge_install_state.json").exists());
    }

    #[test]
    fn create_manifests_consumes_install_config() {
        let temp = TempDir::new().unwrap();
        let dir = install_dir(&temp);

        forge(temp.path())
            .args(["create", "install-config", "--dir"])
            .arg(&dir)
            .assert()
            .success();

        forge(temp.path())
            .args(["create", "manifests", "--dir"])
            .arg(&dir)
            .assert()
            .success()
            .stdout(predicate::str::contains("Consumed Install Config"));

        assert!(!dir.join("install-config.yaml").exists());
        assert!(dir.join("manifests/cluster-config.yaml").exists());
        assert!(dir.join("openshift/99_kubeadmin-password-secret.yaml").exists());
    }

    #[test]
    fn invalid_install_config_exits_with_code_3() {
        let temp = TempDir::new().unwrap();
        let dir = install_dir(&temp);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("install-config.yaml"), "metadata: [").unwrap();

        forge(temp.path())
            .args(["create", "manifests", "--dir"])
            .arg(&dir)
            .assert()
            .code(3)
            .stderr(predicate::str::contains(
                "failed to fetch Common Manifests: failed to fetch Install Config",
            ));
    }

    #[test]
    fn unknown_target_fails() {
        let temp = TempDir::new().unwrap();
        forge(temp.path())
            .args(["create", "kubeconfig", "--dir"])
            .arg(install_dir(&temp))
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown target: kubeconfig"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn view_lists_and_prints_files() {
        let temp = TempDir::new().unwrap();
        let dir = install_dir(&temp);

        forge(temp.path())
            .args(["create", "install-config", "--dir"])
            .arg(&dir)
            .assert()
            .success();

        forge(temp.path())
            .args(["view", "--format", "plain", "--dir"])
            .arg(&dir)
            .assert()
            .success()
            .stdout(predicate::str::contains("install-config.yaml"));

        forge(temp.path())
            .args(["view", "install-config.yaml", "--dir"])
            .arg(&dir)
            .assert()
            .success()
            .stdout(predicate::str::contains("baseDomain: example.com"));

        forge(temp.path())
            .args(["view", "bootstrap.ign", "--dir"])
            .arg(&dir)
            .assert()
            .failure()
            .stderr(predicate::str::contains("file not found in state"));
    }

    #[test]
    fn view_empty_directory_as_json() {
        let temp = TempDir::new().unwrap();
        forge(temp.path())
            .args(["view", "--format", "json", "--dir"])
            .arg(install_dir(&temp))
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn graph_prints_dot_without_touching_disk() {
        let temp = TempDir::new().unwrap();
        let dir = install_dir(&temp);

        forge(temp.path())
            .args(["graph", "--dir"])
            .arg(&dir)
            .assert()
            .success()
            .stdout(predicate::str::starts_with("digraph forge {"))
            .stdout(predicate::str::contains("\"Common Manifests\" -> \"Install Config\""));

        assert!(!dir.exists());
    }

    #[test]
    fn destroy_cluster_removes_assets_and_state() {
        let temp = TempDir::new().unwrap();
        let dir = install_dir(&temp);

        forge(temp.path())
            .args(["create", "cluster", "--dir"])
            .arg(&dir)
            .assert()
            .success();
        assert!(dir.join("cluster-state.json").exists());

        // A second create refuses to run over an existing cluster
        forge(temp.path())
            .args(["create", "cluster", "--dir"])
            .arg(&dir)
            .assert()
            .code(4)
            .stderr(predicate::str::contains("There may already be a running cluster"));

        forge(temp.path())
            .args(["destroy", "cluster", "--yes", "--dir"])
            .arg(&dir)
            .assert()
            .success();

        assert!(!dir.join("cluster-state.json").exists());
        assert!(!dir.join("metadata.json").exists());
        assert!(!dir.join(".forge_install_state.json").exists());
    }

    #[test]
    fn destroy_without_yes_refuses_when_non_interactive() {
        let temp = TempDir::new().unwrap();
        let dir = install_dir(&temp);

        forge(temp.path())
            .args(["create", "install-config", "--dir"])
            .arg(&dir)
            .assert()
            .success();

        forge(temp.path())
            .args(["destroy", "cluster", "--dir"])
            .arg(&dir)
            .assert()
            .code(1)
            .stderr(predicate::str::contains("destroy cluster needs confirmation"))
            .stderr(predicate::str::contains("Pass --yes to confirm"));

        assert!(dir.join(".forge_install_state.json").exists());
        assert!(dir.join("install-config.yaml").exists());
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        forge(temp.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_init_then_show() {
        let temp = TempDir::new().unwrap();
        forge(temp.path())
            .args(["config", "init"])
            .assert()
            .success();
        assert!(temp.path().join("config.toml").exists());

        forge(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[install]"));
    }

    #[test]
    fn invalid_config_file_is_reported() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "[install\n").unwrap();

        forge(temp.path())
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn completion_generates_script() {
        let temp = TempDir::new().unwrap();
        forge(temp.path())
            .args(["completion", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("forge"));
    }
}
