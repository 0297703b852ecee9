//! Integration tests for Pydepot

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn pydepot() -> Command {
        let mut cmd = cargo_bin_cmd!("pydepot");
        // Keep the user's real config out of test runs
        cmd.env("PYDEPOT_CONFIG", "/nonexistent/pydepot-test-config.toml");
        cmd
    }

    #[test]
    fn help_displays() {
        pydepot()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Shared Python package cache"));
    }

    #[test]
    fn version_displays() {
        pydepot()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("pydepot"));
    }

    #[test]
    fn config_path() {
        pydepot()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_defaults() {
        pydepot()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("version = \"3.12\""));
    }

    #[test]
    fn config_show_honors_env_override() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");
        std::fs::write(&config_path, "[python]\nversion = \"3.11\"\n").unwrap();

        pydepot()
            .env("PYDEPOT_CONFIG", &config_path)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("version = \"3.11\""));
    }

    #[test]
    fn serve_requires_command() {
        pydepot().arg("serve").assert().failure();
    }

    #[test]
    fn install_missing_lockfile_fails() {
        pydepot()
            .args(["install", "--lockfile", "/nonexistent/depot.lock"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }
}

mod workflow_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn pydepot() -> Command {
        let mut cmd = cargo_bin_cmd!("pydepot");
        cmd.env("PYDEPOT_CONFIG", "/nonexistent/pydepot-test-config.toml");
        cmd
    }

    /// Lockfile pinning a single package to a local archive
    fn local_lockfile(archive: &Path) -> String {
        format!(
            r#"[root]
name = "root"
version = "0"
python = "3.12"

[[package]]
name = "demo"
version = "1.0"

[package.source]
type = "local_file"
path = "{}"
"#,
            archive.display()
        )
    }

    /// Build a tar.gz with one module under lib/
    fn make_archive(dir: &Path) -> std::path::PathBuf {
        let src = dir.join("src");
        std::fs::create_dir_all(src.join("demo")).unwrap();
        std::fs::write(src.join("demo/__init__.py"), "VALUE = 1\n").unwrap();
        let archive = dir.join("demo-1.0.tar.gz");
        pydepot::archive::pack_dir(&src, &archive, "lib").unwrap();
        archive
    }

    #[test]
    fn lock_writes_pinned_requirements() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("requirements.frozen.txt"),
            "requests==2.32.3\nFlask==3.0.0\n",
        )
        .unwrap();
        let out = temp.path().join("depot.lock");

        pydepot()
            .args(["lock", "--project"])
            .arg(temp.path())
            .arg("--output")
            .arg(&out)
            .assert()
            .success();

        let lockfile = std::fs::read_to_string(&out).unwrap();
        assert!(lockfile.contains("[[package]]"));
        assert!(lockfile.contains("name = \"requests\""));
        assert!(lockfile.contains("version = \"2.32.3\""));
        // Names are normalized on the way in
        assert!(lockfile.contains("name = \"flask\""));
        assert!(lockfile.contains("python = \"3.12\""));
    }

    #[test]
    fn lock_streams_to_stdout_without_output() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("requirements.frozen.txt"), "demo==1.0\n").unwrap();

        pydepot()
            .args(["lock", "--project"])
            .arg(temp.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("name = \"demo\""));
    }

    #[test]
    fn lock_rejects_unpinned_requirement() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("requirements.txt"), "requests>=2.0\n").unwrap();

        pydepot()
            .args(["lock", "--project"])
            .arg(temp.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("not pinned"));
    }

    #[test]
    fn lock_honors_python_override() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("requirements.frozen.txt"), "demo==1.0\n").unwrap();

        pydepot()
            .args(["lock", "--python", "3.11", "--project"])
            .arg(temp.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("python = \"3.11\""));
    }

    #[test]
    fn inject_emits_path_snippet() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("demo-1.0.tar.gz");
        let lock = temp.path().join("depot.lock");
        std::fs::write(&lock, local_lockfile(&archive)).unwrap();

        let lib_dir = temp.path().join("cache/cp312/demo/1.0/lib");
        pydepot()
            .args(["inject", "--lockfile"])
            .arg(&lock)
            .arg("--cache-root")
            .arg(temp.path().join("cache"))
            .assert()
            .success()
            .stdout(predicate::str::contains("import sys"))
            .stdout(predicate::str::contains(lib_dir.display().to_string()));
    }

    #[test]
    fn inject_reads_lockfile_from_stdin() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("demo-1.0.tar.gz");

        pydepot()
            .args(["inject", "--cache-root"])
            .arg(temp.path().join("cache"))
            .write_stdin(local_lockfile(&archive))
            .assert()
            .success()
            .stdout(predicate::str::contains("cp312/demo/1.0/lib"));
    }

    #[test]
    fn lock_stream_pipes_into_inject() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("requirements.frozen.txt"), "demo==1.0\n").unwrap();

        // No --output: the lockfile exists only as the stdout stream
        let locked = pydepot()
            .args(["lock", "--project"])
            .arg(temp.path())
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        pydepot()
            .args(["inject", "--cache-root"])
            .arg(temp.path().join("cache"))
            .write_stdin(locked)
            .assert()
            .success()
            .stdout(predicate::str::contains("import sys"))
            .stdout(predicate::str::contains("cp312/demo/1.0/lib"));
    }

    #[test]
    fn install_populates_cache_and_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let archive = make_archive(temp.path());
        let lock = temp.path().join("depot.lock");
        std::fs::write(&lock, local_lockfile(&archive)).unwrap();
        let cache_root = temp.path().join("cache");

        pydepot()
            .args(["install", "--lockfile"])
            .arg(&lock)
            .arg("--cache-root")
            .arg(&cache_root)
            .assert()
            .success()
            .stdout(predicate::str::contains("Installed 1 packages"));

        let entry = cache_root.join("cp312/demo/1.0");
        assert!(entry.join("lib/demo/__init__.py").exists());
        assert!(entry.join("RECORD.json").exists());
        assert!(entry.join("INSTALLER").exists());

        // Second run finds the entry and acquires nothing
        pydepot()
            .args(["install", "--lockfile"])
            .arg(&lock)
            .arg("--cache-root")
            .arg(&cache_root)
            .assert()
            .success()
            .stdout(predicate::str::contains("1 already cached"));
    }

    #[test]
    fn install_then_inject_round_trip() {
        let temp = TempDir::new().unwrap();
        let archive = make_archive(temp.path());
        let lock = temp.path().join("depot.lock");
        std::fs::write(&lock, local_lockfile(&archive)).unwrap();
        let cache_root = temp.path().join("cache");

        pydepot()
            .args(["install", "--lockfile"])
            .arg(&lock)
            .arg("--cache-root")
            .arg(&cache_root)
            .assert()
            .success();

        let snippet_path = temp.path().join("inject.py");
        pydepot()
            .args(["inject", "--lockfile"])
            .arg(&lock)
            .arg("--cache-root")
            .arg(&cache_root)
            .arg("--output")
            .arg(&snippet_path)
            .assert()
            .success();

        let snippet = std::fs::read_to_string(&snippet_path).unwrap();
        // Every path the snippet injects exists after install
        assert!(snippet.starts_with("import sys"));
        let lib_dir = cache_root.join("cp312/demo/1.0/lib");
        assert!(snippet.contains(&lib_dir.display().to_string()));
        assert!(lib_dir.is_dir());
    }
}
