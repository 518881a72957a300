//! End-to-end tests driving the `tuss` binary against a local dictionary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

const DICTIONARY: &str = r#"{
  "_meta": {"version": "2025.01"},
  "exames": [
    {
      "codigo_tuss": "40304361",
      "nome_padrao": "Hemograma completo",
      "categoria": "Laboratório",
      "aliases": ["HMG COMPLETO", "HEMOGRAMA"]
    },
    {
      "codigo_tuss": "40901114",
      "nome_padrao": "Ultrassonografia de abdome total",
      "categoria": "Imagem",
      "aliases": ["USG ABDOME TOTAL", "US ABDOME TOTAL"],
      "nome_comum": "Ultrassom de abdome"
    }
  ]
}"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("dict.json"), DICTIONARY).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_tuss"))
            .arg("--color=never")
            .args(args)
            .env_remove("RUST_LOG")
            .current_dir(self.dir.path())
            .output()
            .unwrap()
    }

    fn run_engine(&self, command: &str, rest: &[&str]) -> Output {
        let mut args = vec![command, "--dict", "dict.json", "--cache", "cache.json"];
        args.extend_from_slice(rest);
        self.run(&args)
    }
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

#[test]
fn normalize_prints_json_and_fills_cache() {
    let ws = Workspace::new();

    let results = stdout_json(&ws.run_engine(
        "normalize",
        &["--json", "hmg completo", "xyz desconhecido 123"],
    ));
    assert_eq!(results[0]["confidence"], "exact");
    assert_eq!(results[0]["codigo_tuss"], "40304361");
    assert_eq!(results[0]["_cache_hit"], false);
    assert_eq!(results[1]["confidence"], "no_match");
    assert_eq!(results[1]["_needs_llm"], true);

    let cache = read_json(&ws.path("cache.json"));
    assert_eq!(cache["metadata"]["total_entries"], 2);

    let again = stdout_json(&ws.run_engine("normalize", &["--json", "HMG COMPLETO"]));
    assert_eq!(again[0]["_cache_hit"], true);
    assert_eq!(again[0]["nome_padrao"], "Hemograma completo");
}

#[test]
fn batch_enriches_records_in_order() {
    let ws = Workspace::new();
    fs::write(
        ws.path("input.json"),
        r#"[{"nome": "US ABDOME TOTAL", "id": 1}, "hemograma", {"nome": ""}]"#,
    )
    .unwrap();

    let output = ws.run_engine("batch", &["input.json", "--output", "out.json"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let records = read_json(&ws.path("out.json"));
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["id"], 1);
    assert_eq!(records[0]["nome_comum"], "Ultrassom de abdome");
    assert_eq!(records[0]["confidence"], "exact");
    assert_eq!(records[1]["codigo_tuss"], "40304361");
    assert_eq!(records[2]["confidence"], "no_match");
    assert_eq!(records[2]["nome_padrao"], "");
}

#[test]
fn resolve_caches_and_queues_contribution() {
    let ws = Workspace::new();

    let output = ws.run_engine(
        "resolve",
        &[
            "EXAME RARO Q",
            "Exame raro Q",
            "--code",
            "99999999",
            "--portal",
            "lab-a",
            "--contrib",
            "contrib/pending.json",
        ],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let pending = read_json(&ws.path("contrib/pending.json"));
    assert_eq!(pending[0]["original_name"], "EXAME RARO Q");
    assert_eq!(pending[0]["portal"], "lab-a");

    let results = stdout_json(&ws.run_engine("normalize", &["--json", "exame raro q"]));
    assert_eq!(results[0]["confidence"], "llm");
    assert_eq!(results[0]["_cache_hit"], true);
    assert_eq!(results[0]["codigo_tuss"], "99999999");
}

fn block_cache_path(ws: &Workspace) {
    let blocked = ws.path("cache.json");
    fs::create_dir_all(&blocked).unwrap();
    fs::write(blocked.join("keep"), "x").unwrap();
}

#[test]
fn batch_reports_cache_save_failure_after_writing_records() {
    let ws = Workspace::new();
    block_cache_path(&ws);
    fs::write(ws.path("input.json"), r#"[{"nome": "HMG COMPLETO"}]"#).unwrap();

    let output = ws.run_engine("batch", &["input.json", "--output", "out.json"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Could not save the mapping cache"), "{stderr}");
    assert!(stderr.contains("choose a different cache path"), "{stderr}");

    let records = read_json(&ws.path("out.json"));
    assert_eq!(records[0]["codigo_tuss"], "40304361");
}

#[test]
fn resolve_writes_contribution_when_cache_save_fails() {
    let ws = Workspace::new();
    block_cache_path(&ws);

    let output = ws.run_engine(
        "resolve",
        &["EXAME RARO Q", "Exame raro Q", "--contrib", "pending.json"],
    );
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Could not save the mapping cache"), "{stderr}");

    let pending = read_json(&ws.path("pending.json"));
    assert_eq!(pending[0]["original_name"], "EXAME RARO Q");
}

#[test]
fn resolve_rejects_empty_names() {
    let ws = Workspace::new();
    let output = ws.run_engine("resolve", &["  ..  ", "Nada"]);
    assert!(!output.status.success());
}

#[test]
fn validate_exit_code_follows_errors() {
    let ws = Workspace::new();
    assert!(ws.run(&["validate", "dict.json"]).status.success());

    fs::write(ws.path("broken.json"), r#"{"_meta": {}, "exames": [{"codigo_tuss": "1"}]}"#)
        .unwrap();
    let output = ws.run(&["validate", "broken.json"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("nome_padrao"));
}

#[test]
fn cache_stats_on_missing_cache_reports_empty() {
    let ws = Workspace::new();
    let output = ws.run(&["cache-stats", "--cache", "absent.json"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Total entries"));
}

#[test]
fn dict_falls_back_when_remote_is_unreachable() {
    let ws = Workspace::new();
    let output = ws.run(&[
        "dict",
        "--remote-url",
        "http://127.0.0.1:1/dict.json",
        "--dict-cache-dir",
        "dict-cache",
        "--fallback",
        "dict.json",
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("fallback"));
    assert!(stdout.contains("2025.01"));
}

#[test]
fn missing_dictionary_fails() {
    let ws = Workspace::new();
    let output = ws.run(&["normalize", "--dict", "nope.json", "--cache", "c.json", "HMG"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}
