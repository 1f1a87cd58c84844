use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn temp_workspace() -> TempDir {
    tempfile::tempdir().expect("create tempdir")
}

#[test]
fn tokenize_mine_detokenize_round_trip() {
    let workspace = temp_workspace();
    let records_path = workspace.path().join("records.jsonl");
    let vectors_path = workspace.path().join("vectors.jsonl");
    let tokens_path = workspace.path().join("tokens.json");
    let report_path = workspace.path().join("report.json");

    // Three records sharing a template (level/service fixed, code varying)
    // and one outlier.  All values are stable so detokenization round-trips.
    let records = "\
{\"level\": \"info\", \"service\": \"auth\", \"code\": 200}\n\
{\"level\": \"info\", \"service\": \"auth\", \"code\": 404}\n\
{\"level\": \"info\", \"service\": \"auth\", \"code\": 500}\n\
{\"alpha\": 1, \"beta\": 2, \"gamma\": 3}\n";
    fs::write(&records_path, records).expect("write records");

    let mut tokenize = Command::cargo_bin("tokmine").expect("binary exists");
    tokenize.current_dir(workspace.path()).args([
        "--quiet",
        "tokenize",
        "records.jsonl",
        "-f",
        "tokens.json",
        "-o",
        "vectors.jsonl",
    ]);
    tokenize.assert().success();
    assert!(tokens_path.exists(), "tokens.json was created");
    assert!(vectors_path.exists(), "vectors.jsonl was created");

    let vector_lines: Vec<String> = fs::read_to_string(&vectors_path)
        .expect("read vectors")
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(vector_lines.len(), 4, "one vector per record");

    let mut mine = Command::cargo_bin("tokmine").expect("binary exists");
    mine.current_dir(workspace.path()).args([
        "--quiet",
        "mine",
        "vectors.jsonl",
        "-d",
        "1",
        "--no-progress",
        "-o",
        "report.json",
    ]);
    mine.assert().success();

    let report: Value = serde_json::from_str(&fs::read_to_string(&report_path).expect("report"))
        .expect("report is valid JSON");
    assert_eq!(report["input_vectors"], 4);
    let rules = report["rules"].as_array().expect("rules array");
    assert_eq!(rules.len(), 1, "the three near-identical records cluster");
    assert_eq!(rules[0]["match_count"], 3);
    let template = rules[0]["template"].as_array().expect("template array");
    assert!(
        template.iter().any(|token| *token == 0),
        "template carries a wildcard position"
    );
    assert_eq!(
        report["leftovers"].as_array().expect("leftovers").len(),
        1,
        "the outlier stays unclustered"
    );

    let mut detokenize = Command::cargo_bin("tokmine").expect("binary exists");
    let detokenize_output = detokenize
        .current_dir(workspace.path())
        .args(["--quiet", "detokenize", "-f", "tokens.json", "vectors.jsonl"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let decoded = String::from_utf8(detokenize_output).expect("UTF-8 output");
    let decoded_records: Vec<Value> = decoded
        .lines()
        .map(|line| serde_json::from_str(line).expect("decoded record is valid JSON"))
        .collect();
    let original_records: Vec<Value> = records
        .lines()
        .map(|line| serde_json::from_str(line).expect("input record is valid JSON"))
        .collect();
    assert_eq!(decoded_records, original_records);

    let mut info = Command::cargo_bin("tokmine").expect("binary exists");
    let info_output = info
        .current_dir(workspace.path())
        .args(["--quiet", "info", "-f", "tokens.json", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let summary: Value = serde_json::from_slice(&info_output).expect("info output is valid JSON");
    assert_eq!(summary["token_base"], 1000);
    // 3 field names + "info" + "auth" + three codes + three outlier names
    // and values land well above eight entries.
    assert!(summary["entries"].as_u64().expect("entries") >= 8);
}

#[test]
fn tokenize_survives_malformed_lines() {
    let workspace = temp_workspace();
    let records_path = workspace.path().join("records.jsonl");
    fs::write(&records_path, "{\"a\": 1}\nnot json\n{\"a\": 2}\n").expect("write records");

    let mut tokenize = Command::cargo_bin("tokmine").expect("binary exists");
    let output = tokenize
        .current_dir(workspace.path())
        .args(["--quiet", "tokenize", "records.jsonl", "-f", "tokens.json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let vectors = String::from_utf8(output).expect("UTF-8 output");
    assert_eq!(vectors.lines().count(), 2, "bad line skipped, rest kept");
}

#[test]
fn detokenize_requires_the_dictionary() {
    let workspace = temp_workspace();
    let vectors_path = workspace.path().join("vectors.jsonl");
    fs::write(&vectors_path, "[1000,1001]\n").expect("write vectors");

    let mut detokenize = Command::cargo_bin("tokmine").expect("binary exists");
    detokenize
        .current_dir(workspace.path())
        .args([
            "--quiet",
            "detokenize",
            "-f",
            "missing.json",
            "vectors.jsonl",
        ])
        .assert()
        .failure();
}
