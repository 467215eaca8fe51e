use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::{tempdir, TempDir};

/// Output of one popquery invocation
struct Run {
    code: i32,
    stdout: String,
    stderr: String,
}

/// Helper function to run popquery against a store file, optionally feeding stdin
fn run_popquery(store: &Path, args: &[&str], stdin: Option<&[u8]>) -> Run {
    let mut child = Command::new(env!("CARGO_BIN_EXE_popquery"))
        .arg("--store")
        .arg(store)
        .args(args)
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn popquery");

    if let Some(mut pipe) = child.stdin.take() {
        if let Some(bytes) = stdin {
            pipe.write_all(bytes).expect("Failed to write to stdin");
        }
    }

    let output = child.wait_with_output().expect("Failed to wait for process");
    Run {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

/// Fresh store directory with the fixture already ingested
fn ingested_store() -> (TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let store = dir.path().join("files.json");
    let run = run_popquery(&store, &["ingest", "test/population.csv"], None);
    assert_eq!(run.code, 0, "ingest failed: {}", run.stderr);
    (dir, store)
}

fn json(run: &Run) -> Value {
    serde_json::from_str(&run.stdout).expect("stdout is not JSON")
}

#[test]
fn test_end_to_end_ingest_report() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("files.json");
    let run = run_popquery(&store, &["ingest", "test/population.csv"], None);
    assert_eq!(run.code, 0, "Failed: {}", run.stderr);

    let report = json(&run);
    assert_eq!(report["status"], "success");
    assert_eq!(report["recordCount"], 6);
    assert_eq!(report["yearCount"], 6);
    assert_eq!(report["excludedCount"], 5);
    assert_eq!(report["unchanged"], false);
}

#[test]
fn test_end_to_end_persisted_snapshot() {
    let (_dir, store) = ingested_store();
    let snapshot: Value = serde_json::from_str(&fs::read_to_string(&store).unwrap()).unwrap();
    let rows = snapshot.as_array().unwrap();
    assert_eq!(rows.len(), 6);

    for row in rows {
        for key in row.as_object().unwrap().keys() {
            assert!(key == "country" || key.bytes().all(|b| b.is_ascii_digit()));
        }
        let country = row["country"].as_str().unwrap().to_lowercase();
        for excluded in ["world", "euro area", "high income", "middle income", "oecd"] {
            assert!(!country.contains(excluded), "{} should be excluded", country);
        }
    }

    let eritrea = rows.iter().find(|r| r["country"] == "Eritrea").unwrap();
    assert_eq!(eritrea["2000"], 2392880.0);
    assert!(eritrea["2003"].is_null());
}

#[test]
fn test_end_to_end_reingest_is_unchanged() {
    let (_dir, store) = ingested_store();
    let before = fs::read_to_string(&store).unwrap();

    let run = run_popquery(&store, &["ingest"], Some(&fs::read("test/population.csv").unwrap()));
    assert_eq!(run.code, 0, "Failed: {}", run.stderr);
    let report = json(&run);
    assert_eq!(report["recordCount"], 6);
    assert_eq!(report["unchanged"], true);
    assert_eq!(fs::read_to_string(&store).unwrap(), before);
}

#[test]
fn test_end_to_end_failed_ingest_keeps_snapshot() {
    let (_dir, store) = ingested_store();
    let before = fs::read_to_string(&store).unwrap();

    let run = run_popquery(&store, &["ingest", "test/no_identifier.csv"], None);
    assert_ne!(run.code, 0);
    assert!(
        run.stderr.contains("identifier column 'Country Name' not found"),
        "unexpected error: {}",
        run.stderr
    );
    assert_eq!(fs::read_to_string(&store).unwrap(), before);
}

#[test]
fn test_end_to_end_bar_query() {
    let (_dir, store) = ingested_store();
    let run = run_popquery(
        &store,
        &["query", "Show me data for China and India from 2001 to 2003", "--chart", "bar"],
        None,
    );
    assert_eq!(run.code, 0, "Failed: {}", run.stderr);

    let response = json(&run);
    assert_eq!(response["filter"]["countries"], serde_json::json!(["china", "india"]));
    assert_eq!(response["filter"]["yearRange"]["start"], 2001);
    assert_eq!(response["dataset"]["observations"].as_array().unwrap().len(), 6);
}

#[test]
fn test_end_to_end_two_word_country_line() {
    let (_dir, store) = ingested_store();
    let run = run_popquery(&store, &["query", "United Kingdom 2005 to 2004", "--chart", "line"], None);
    assert_eq!(run.code, 0, "Failed: {}", run.stderr);

    let observations = json(&run)["dataset"]["observations"].clone();
    let years: Vec<i64> = observations
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["year"].as_i64().unwrap())
        .collect();
    assert_eq!(years, vec![2004, 2005]);
}

#[test]
fn test_end_to_end_pie_ambiguous_is_warning() {
    let (_dir, store) = ingested_store();
    let run = run_popquery(&store, &["query", "China and India 2000 2005", "--chart", "pie"], None);
    assert_eq!(run.code, 2);
    assert!(run.stderr.contains("exactly one country"));
}

#[test]
fn test_end_to_end_pie_single_country() {
    let (_dir, store) = ingested_store();
    let run = run_popquery(&store, &["query", "Chad from 2000 to 2002", "--chart", "pie"], None);
    assert_eq!(run.code, 0, "Failed: {}", run.stderr);
    let response = json(&run);
    assert_eq!(response["dataset"]["title"], "Population Distribution in Chad (2000-2002)");
    assert_eq!(response["dataset"]["observations"].as_array().unwrap().len(), 3);
}

#[test]
fn test_end_to_end_choropleth_latest_year() {
    let (_dir, store) = ingested_store();
    let run = run_popquery(&store, &["query", "from 2001 to 2003", "--chart", "choropleth"], None);
    assert_eq!(run.code, 0, "Failed: {}", run.stderr);
    let dataset = json(&run)["dataset"].clone();
    assert_eq!(dataset["colorYear"], 2003);
    assert_eq!(dataset["observations"].as_array().unwrap().len(), 6);
}

#[test]
fn test_end_to_end_choropleth_no_years() {
    let (_dir, store) = ingested_store();
    let run = run_popquery(&store, &["query", "from 1960 to 1970", "--chart", "choropleth"], None);
    assert_eq!(run.code, 2);
    assert!(run.stderr.contains("no data available"));
}

#[test]
fn test_end_to_end_unknown_country_is_empty_bar() {
    let (_dir, store) = ingested_store();
    let run = run_popquery(&store, &["query", "Atlantis", "--chart", "bar"], None);
    assert_eq!(run.code, 0, "Failed: {}", run.stderr);
    assert!(json(&run)["dataset"]["observations"].as_array().unwrap().is_empty());
    assert!(run.stderr.contains("atlantis"));
}

#[test]
fn test_end_to_end_query_without_ingest() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("files.json");
    let run = run_popquery(&store, &["query", "China"], None);
    assert_eq!(run.code, 2);
    assert!(run.stderr.contains("no dataset"));
}

#[test]
fn test_end_to_end_summary_in_billions() {
    let (_dir, store) = ingested_store();
    let run = run_popquery(&store, &["summary", "China 2000 2000"], None);
    assert_eq!(run.code, 0, "Failed: {}", run.stderr);
    let summary = json(&run);
    let mean = summary[0]["meanPopulationBillions"].as_f64().unwrap();
    assert!((mean - 1.262645).abs() < 1e-9);
}

#[test]
fn test_end_to_end_config_file() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("files.json");
    let config = dir.path().join("config.json");
    fs::write(&config, r#"{"ingest": {"header_skip_rows": 0, "excluded_group_names": []}}"#).unwrap();

    let csv = b"Country Name,1999\nWorld,6e9\nChad,7e6\n";
    let run = run_popquery(&store, &["--config", config.to_str().unwrap(), "ingest"], Some(csv));
    assert_eq!(run.code, 0, "Failed: {}", run.stderr);
    assert_eq!(json(&run)["recordCount"], 2);
}

#[test]
fn test_end_to_end_invalid_chart_kind() {
    let (_dir, store) = ingested_store();
    let run = run_popquery(&store, &["query", "China", "--chart", "scatter"], None);
    assert_ne!(run.code, 0);
    assert!(run.stderr.contains("unknown chart kind"));
}
