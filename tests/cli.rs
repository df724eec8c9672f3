//! End-to-end tests for the confpatch binary.

use std::path::Path;
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A repository plus an isolated home directory for global config.
struct Fixture {
    repo: TempDir,
    home: TempDir,
}

impl Fixture {
    fn new(files: &[(&str, &str)]) -> Self {
        let repo = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        run_git(repo.path(), &["init", "-q"]);
        run_git(repo.path(), &["config", "user.email", "test@example.com"]);
        run_git(repo.path(), &["config", "user.name", "Test User"]);
        run_git(repo.path(), &["config", "commit.gpgsign", "false"]);
        for (name, content) in files {
            std::fs::write(repo.path().join(name), content).unwrap();
        }
        run_git(repo.path(), &["add", "."]);
        run_git(repo.path(), &["commit", "-q", "-m", "Initial commit"]);
        Self { repo, home }
    }

    fn path(&self) -> &Path {
        self.repo.path()
    }

    fn confpatch(&self) -> Command {
        let mut cmd = Command::cargo_bin("confpatch").unwrap();
        cmd.current_dir(self.path())
            .env("HOME", self.home.path())
            .env_remove("CONFPATCH_CONFIG")
            .env_remove("XDG_CONFIG_HOME")
            .env_remove("RUST_LOG");
        cmd
    }

    fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path().join(rel)).unwrap()
    }

    fn last_subject(&self) -> String {
        let output = StdCommand::new("git")
            .args(["log", "-1", "--format=%s"])
            .current_dir(self.path())
            .output()
            .unwrap();
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }
}

fn run_git(dir: &Path, args: &[&str]) {
    let status = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");
    assert!(status.status.success(), "git {:?} failed", args);
}

#[test]
fn help_mentions_commands() {
    Command::cargo_bin("confpatch")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("patch"))
        .stdout(predicate::str::contains("unpatch"))
        .stdout(predicate::str::contains("new-server"));
}

#[test]
fn patch_uses_environment_and_set_overrides() {
    let fx = Fixture::new(&[("server.properties", "motd={{ MOTD }}\nkey={{ KEY }}\n")]);

    fx.confpatch()
        .env("MOTD", "from env")
        .env("KEY", "env key")
        .args(["patch", "--set", "KEY=flag key"])
        .assert()
        .success()
        .stdout(predicate::str::contains("substituted 1 file(s)"));

    assert_eq!(fx.read("server.properties"), "motd=from env\nkey=flag key\n");
    assert!(fx.last_subject().starts_with("[SUBST] "));
}

#[test]
fn patch_missing_variable_fails_and_names_file() {
    let fx = Fixture::new(&[("server.properties", "motd={{ CONFPATCH_TEST_UNSET }}\n")]);

    fx.confpatch()
        .env_remove("CONFPATCH_TEST_UNSET")
        .arg("patch")
        .assert()
        .failure()
        .stderr(predicate::str::contains("server.properties"));

    assert_eq!(fx.read("server.properties"), "motd={{ CONFPATCH_TEST_UNSET }}\n");
    assert_eq!(fx.last_subject(), "Initial commit");
}

#[test]
fn patch_rejects_subdirectory() {
    let fx = Fixture::new(&[("server.properties", "motd=x\n")]);
    std::fs::create_dir(fx.path().join("plugins")).unwrap();

    fx.confpatch()
        .args(["patch", "plugins"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not the root"));
}

#[test]
fn status_reports_substituted_and_missing() {
    let fx = Fixture::new(&[("server.properties", "motd={{ MOTD }}\n")]);
    let elsewhere = TempDir::new().unwrap();

    fx.confpatch()
        .env("MOTD", "hi")
        .arg("patch")
        .assert()
        .success();

    fx.confpatch()
        .args(["status", "."])
        .arg(elsewhere.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Clean, Substituted"))
        .stdout(predicate::str::contains("no such repo"));
}

#[test]
fn status_json_is_parseable() {
    let fx = Fixture::new(&[("server.properties", "motd=x\n")]);
    std::fs::write(fx.path().join("server.properties"), "motd=y\n").unwrap();

    let output = fx.confpatch().args(["status", "--json"]).output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[0]["repo"], true);
    assert_eq!(value[0]["dirty"], true);
    assert_eq!(value[0]["substituted"], false);
}

#[test]
fn unpatch_with_message_folds_edits() {
    let fx = Fixture::new(&[("server.properties", "motd={{ MOTD }}\n#\n#\nview-distance=8\n")]);

    fx.confpatch().env("MOTD", "hi").arg("patch").assert().success();
    std::fs::write(
        fx.path().join("server.properties"),
        "motd=hi\n#\n#\nview-distance=12\n",
    )
    .unwrap();

    fx.confpatch()
        .args(["unpatch", "--msg", "Raise view distance"])
        .assert()
        .success()
        .stdout(predicate::str::contains("committed edits"));

    assert_eq!(
        fx.read("server.properties"),
        "motd={{ MOTD }}\n#\n#\nview-distance=12\n"
    );
    assert_eq!(fx.last_subject(), "Raise view distance");
}

#[test]
fn unpatch_default_message_uses_prefix() {
    let fx = Fixture::new(&[("server.properties", "motd={{ MOTD }}\n#\n#\nx=1\n")]);
    fx.confpatch().env("MOTD", "hi").arg("patch").assert().success();
    std::fs::write(fx.path().join("server.properties"), "motd=hi\n#\n#\nx=2\n").unwrap();

    fx.confpatch().arg("unpatch").assert().success();
    assert!(fx.last_subject().starts_with("Update live config "));
}

#[test]
fn debug_patch_lists_rendered_files() {
    let fx = Fixture::new(&[("server.properties", "motd={{ MOTD }}\n"), ("notes.txt", "plain\n")]);

    fx.confpatch()
        .env("MOTD", "hi")
        .args(["--debug", "patch"])
        .assert()
        .success()
        .stderr(predicate::str::contains("[debug] rendered"))
        .stderr(predicate::str::contains("server.properties"));
}

#[test]
fn conflicting_unpatch_warns_about_interim_commit() {
    let fx = Fixture::new(&[("server.properties", "motd={{ MOTD }}\n")]);
    fx.confpatch().env("MOTD", "hi").arg("patch").assert().success();
    std::fs::write(fx.path().join("server.properties"), "motd=changed\n").unwrap();

    fx.confpatch()
        .args(["unpatch", "--msg", "edit"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("warning: edits are kept in"))
        .stderr(predicate::str::contains("conflict"));

    assert_eq!(fx.last_subject(), "[CHNG]");
}

#[test]
fn unpatch_without_substitution_fails() {
    let fx = Fixture::new(&[("server.properties", "motd=x\n")]);
    fx.confpatch()
        .arg("unpatch")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a substitution commit"));
}

#[test]
fn new_server_creates_root_branch() {
    let fx = Fixture::new(&[("server.properties", "motd=x\n")]);

    fx.confpatch()
        .args(["new-server", "survival"])
        .assert()
        .success();

    let output = StdCommand::new("git")
        .args(["log", "-1", "--format=%s%n%P", "survival"])
        .current_dir(fx.path())
        .output()
        .unwrap();
    let text = String::from_utf8(output.stdout).unwrap();
    assert_eq!(text.trim(), "Initial commit for survival");
    assert_eq!(fx.last_subject(), "Initial commit");

    fx.confpatch()
        .args(["new-server", "survival"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn config_set_and_get_repo_key() {
    let fx = Fixture::new(&[("server.properties", "motd=x\n")]);

    fx.confpatch()
        .args(["config", "set", "exclude_suffixes", ".local.yml"])
        .assert()
        .success();

    fx.confpatch()
        .args(["config", "get", "exclude_suffixes"])
        .assert()
        .success()
        .stdout(predicate::str::diff(".local.yml\n"));
}

#[test]
fn completion_generates_script() {
    Command::cargo_bin("confpatch")
        .unwrap()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("confpatch"));
}
