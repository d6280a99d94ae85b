// CLI tests driving the built binary against a throwaway config.
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use proverbs::config::{self, ProverbsConfig};
use serde_json::Value;

const SOURCE: &str = "\
tags,proverb
cgo,Cgo is not Go.
error,Errors are values
\"interface|design\",\"The bigger the interface, the weaker the abstraction.\"
";

struct Sandbox {
    dir: tempfile::TempDir,
    config: PathBuf,
}

impl Sandbox {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        let mut cfg = ProverbsConfig::with_defaults();
        cfg.relational.path = Some(root.join("store/proverbs.db"));
        cfg.document.dir = Some(root.join("store/documents"));
        cfg.kv.dir = Some(root.join("store/kv"));
        let config = root.join("proverbs.toml");
        config::write_config(&config, &cfg, false).expect("write config");
        Self { dir, config }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write_source(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path().join(name);
        std::fs::write(&path, contents).expect("write source");
        path
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_proverbs"))
            .arg("--config")
            .arg(&self.config)
            .args(args)
            .current_dir(self.path())
            .env_remove(config::BACKEND_ENV)
            .env_remove("RUST_LOG")
            .output()
            .expect("run proverbs")
    }
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout).lines().map(str::to_string).collect()
}

fn code(output: &Output) -> i32 {
    output.status.code().expect("exit code")
}

#[test]
fn import_and_query_every_backend() {
    let sandbox = Sandbox::new();
    let source = sandbox.write_source("go.csv", SOURCE);
    let source = source.to_str().unwrap();

    for backend in ["relational", "document", "kv"] {
        let import = sandbox.run(&["--backend", backend, "import", source]);
        assert_eq!(code(&import), 0, "{backend}: {}", String::from_utf8_lossy(&import.stderr));
        assert!(String::from_utf8_lossy(&import.stdout).contains("Imported 3 proverbs"));

        let all = sandbox.run(&["--backend", backend, "all"]);
        assert_eq!(code(&all), 0);
        let mut lines = stdout_lines(&all);
        lines.sort();
        assert_eq!(
            lines,
            vec![
                "Cgo is not Go.  [cgo]",
                "Errors are values  [error]",
                "The bigger the interface, the weaker the abstraction.  [design, interface]",
            ],
            "{backend}"
        );

        let contains = sandbox.run(&["--backend", backend, "contains", "CGO"]);
        assert_eq!(stdout_lines(&contains), vec!["Cgo is not Go.  [cgo]"], "{backend}");

        let tagged = sandbox.run(&["tagged", "error", "--backend", backend]);
        assert_eq!(stdout_lines(&tagged), vec!["Errors are values  [error]"], "{backend}");

        let none = sandbox.run(&["--backend", backend, "tagged", "Error"]);
        assert_eq!(code(&none), 0);
        assert!(none.stdout.is_empty(), "{backend}");
    }
}

#[test]
fn malformed_import_exits_three_and_stores_nothing() {
    let sandbox = Sandbox::new();
    let source = sandbox.write_source("bad.csv", "tags,proverb\ncgo,Cgo is not Go.\na||b,Broken.\n");

    let import = sandbox.run(&["import", source.to_str().unwrap()]);
    assert_eq!(code(&import), 3);
    assert!(String::from_utf8_lossy(&import.stderr).contains("line 3"));

    let all = sandbox.run(&["all"]);
    assert_eq!(code(&all), 0);
    assert!(all.stdout.is_empty());
}

#[test]
fn missing_source_file_is_import_failure() {
    let sandbox = Sandbox::new();
    let import = sandbox.run(&["import", "does-not-exist.csv"]);
    assert_eq!(code(&import), 3);
}

#[test]
fn json_output() {
    let sandbox = Sandbox::new();
    let source = sandbox.write_source("go.csv", SOURCE);
    let import = sandbox.run(&["--format", "json", "--backend", "kv", "import", source.to_str().unwrap()]);
    let report: Value = serde_json::from_slice(&import.stdout).expect("json report");
    assert_eq!(report["inserted"], 3);

    let tagged = sandbox.run(&["--format", "json", "--backend", "kv", "tagged", "design"]);
    let found: Value = serde_json::from_slice(&tagged.stdout).expect("json array");
    let found = found.as_array().expect("array");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["tags"], serde_json::json!(["design", "interface"]));
    assert!(found[0]["id"].is_string());

    let stats = sandbox.run(&["--format", "json", "--backend", "kv", "stats"]);
    let stats: Value = serde_json::from_slice(&stats.stdout).expect("json stats");
    assert_eq!(stats["backend"], "kv");
    assert_eq!(stats["proverbs"], 3);
    assert_eq!(stats["distinct_tags"], 4);

    let tags = sandbox.run(&["--format", "json", "--backend", "kv", "tags"]);
    let tags: Value = serde_json::from_slice(&tags.stdout).expect("json tags");
    assert_eq!(tags[0], serde_json::json!({"tag": "cgo", "count": 1}));
}

#[test]
fn configuration_errors_exit_one() {
    let sandbox = Sandbox::new();

    let missing = Command::new(env!("CARGO_BIN_EXE_proverbs"))
        .args(["--config", "nowhere.toml", "all"])
        .current_dir(sandbox.path())
        .output()
        .expect("run proverbs");
    assert_eq!(code(&missing), 1);

    let unknown = sandbox.run(&["--backend", "mongo", "all"]);
    assert_eq!(code(&unknown), 1);

    let usage = sandbox.run(&["contains"]);
    assert_eq!(code(&usage), 1);

    let env = Command::new(env!("CARGO_BIN_EXE_proverbs"))
        .arg("--config")
        .arg(&sandbox.config)
        .arg("all")
        .current_dir(sandbox.path())
        .env(config::BACKEND_ENV, "mongo")
        .output()
        .expect("run proverbs");
    assert_eq!(code(&env), 1);
}

#[test]
fn env_backend_is_overridden_by_flag() {
    let sandbox = Sandbox::new();
    let source = sandbox.write_source("go.csv", SOURCE);
    let import = sandbox.run(&["--backend", "document", "import", source.to_str().unwrap()]);
    assert_eq!(code(&import), 0);

    let via_env = Command::new(env!("CARGO_BIN_EXE_proverbs"))
        .arg("--config")
        .arg(&sandbox.config)
        .arg("all")
        .current_dir(sandbox.path())
        .env(config::BACKEND_ENV, "document")
        .output()
        .expect("run proverbs");
    assert_eq!(stdout_lines(&via_env).len(), 3);

    let flag_wins = Command::new(env!("CARGO_BIN_EXE_proverbs"))
        .arg("--config")
        .arg(&sandbox.config)
        .args(["--backend", "kv", "all"])
        .current_dir(sandbox.path())
        .env(config::BACKEND_ENV, "document")
        .output()
        .expect("run proverbs");
    assert_eq!(code(&flag_wins), 0);
    assert!(flag_wins.stdout.is_empty());
}

#[test]
fn corrupt_database_exits_two() {
    let sandbox = Sandbox::new();
    let db = sandbox.path().join("store/proverbs.db");
    std::fs::create_dir_all(db.parent().unwrap()).unwrap();
    std::fs::write(&db, "this is not a database, just some text long enough to read").unwrap();

    let all = sandbox.run(&["--backend", "relational", "all"]);
    assert_eq!(code(&all), 2);
}

#[test]
fn init_writes_config_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let run = |args: &[&str]| {
        Command::new(env!("CARGO_BIN_EXE_proverbs"))
            .args(args)
            .current_dir(dir.path())
            .output()
            .expect("run proverbs")
    };

    assert_eq!(code(&run(&["init"])), 0);
    let written = config::load_config(Some(&dir.path().join("proverbs.toml"))).unwrap();
    assert_eq!(written, ProverbsConfig::with_defaults());

    assert_eq!(code(&run(&["init"])), 1);
    assert_eq!(code(&run(&["init", "--force"])), 0);
}
