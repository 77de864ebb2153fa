use serde_json::Value;
use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};

/// Helper function to run farechart with arguments and optional stdin input
fn run_farechart(args: &[&str], stdin: Option<&str>) -> Result<Value, String> {
    let mut child = Command::new(env!("CARGO_BIN_EXE_farechart"))
        .args(args)
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to spawn process: {}", e))?;

    if let Some(mut handle) = child.stdin.take() {
        if let Some(input) = stdin {
            handle
                .write_all(input.as_bytes())
                .map_err(|e| format!("Failed to write to stdin: {}", e))?;
        }
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("Failed to wait for process: {}", e))?;

    if output.status.success() {
        serde_json::from_slice(&output.stdout).map_err(|e| format!("Output is not JSON: {}", e))
    } else {
        Err(String::from_utf8_lossy(&output.stderr).to_string())
    }
}

fn numbers(value: &Value) -> Vec<Option<f64>> {
    value
        .as_array()
        .expect("expected an array")
        .iter()
        .map(Value::as_f64)
        .collect()
}

fn dataset<'a>(chart: &'a Value, label: &str) -> &'a Value {
    chart["datasets"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["label"] == label)
        .unwrap_or_else(|| panic!("no dataset '{}'", label))
}

#[test]
fn test_days_left_comparison_from_coded_records() {
    let chart = run_farechart(&["--input", "test/records.json", "days-left"], None).unwrap();
    assert_eq!(chart["labels"], serde_json::json!([1, 2, 3]));

    let actual = dataset(&chart, "Actual Price");
    assert_eq!(actual["color"], "red");
    // the n/a price on day 2 is missing, not zero
    assert_eq!(numbers(&actual["data"]), vec![Some(5954.0), None, Some(7000.0)]);

    let rf = dataset(&chart, "Predicted Price - RandomForestRegressor");
    assert_eq!(rf["color"], "blue");
    assert_eq!(numbers(&rf["data"]), vec![Some(5950.0), None, Some(7200.0)]);

    let xgb = dataset(&chart, "Predicted Price - XGBRegressor");
    assert_eq!(numbers(&xgb["data"]), vec![Some(6000.0), Some(6500.0), None]);
}

#[test]
fn test_records_from_stdin() {
    let json = fs::read_to_string("test/records.json").expect("Failed to read test JSON");
    let chart = run_farechart(&["average-price"], Some(&json)).unwrap();
    // day 2 has no actual price at all, so it is not on the axis
    assert_eq!(chart["labels"], serde_json::json!([1, 3]));
    let data = numbers(&chart["datasets"][0]["data"]);
    assert_eq!(data, vec![Some(5954.0), Some(7000.0)]);
}

#[test]
fn test_keyed_input_inherits_model_names() {
    let chart = run_farechart(&["--input", "test/by_model.json", "performance"], None).unwrap();
    let labels: Vec<&str> = chart["datasets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["label"].as_str().unwrap())
        .collect();
    assert_eq!(
        labels,
        vec!["RandomForestRegressor", "XGBRegressor", "ExtraTreesRegressor"]
    );
    assert_eq!(dataset(&chart, "ExtraTreesRegressor")["color"], "orange");
}

#[test]
fn test_city_heatmap_missing_pairs_are_null() {
    let heat = run_farechart(&["--input", "test/records.json", "city-heatmap"], None).unwrap();
    assert_eq!(heat["x"], serde_json::json!(["Chennai", "Mumbai"]));
    assert_eq!(heat["y"], serde_json::json!(["Delhi", "Mumbai"]));
    assert_eq!(numbers(&heat["z"][0]), vec![None, Some(5954.0)]);
    assert_eq!(numbers(&heat["z"][1]), vec![Some(7000.0), None]);
}

#[test]
fn test_raw_keeps_codes() {
    let heat = run_farechart(&["--input", "test/records.json", "--raw", "city-heatmap"], None).unwrap();
    assert_eq!(heat["y"], serde_json::json!(["2", "5"]));
}

#[test]
fn test_mappings_file_replaces_builtin_tables() {
    let pivot = run_farechart(
        &[
            "--input",
            "test/records.json",
            "--mappings",
            "test/mappings.json",
            "pivot",
            "--row",
            "source_city",
            "--col",
            "destination_city",
            "--value",
            "predicted_price",
        ],
        None,
    )
    .unwrap();
    assert_eq!(pivot["y"], serde_json::json!(["BOM", "DEL"]));
    // no destination table, so the numeric codes stay and sort numerically
    assert_eq!(pivot["x"], serde_json::json!([1, 5]));
    assert_eq!(numbers(&pivot["z"][1]), vec![None, Some(17900.0 / 3.0)]);
}

#[test]
fn test_heatmap_for_one_model() {
    let heat = run_farechart(
        &["--input", "test/records.json", "heatmap", "--model", "RandomForestRegressor"],
        None,
    )
    .unwrap();
    assert_eq!(heat["y"], serde_json::json!(["Indigo", "Vistara"]));
    assert_eq!(heat["x"], serde_json::json!([1, 3]));
    assert_eq!(numbers(&heat["z"][0]), vec![Some(5800.0), None]);
}

#[test]
fn test_csv_results_file() {
    let summary = run_farechart(&["--input", "test/results.csv", "summary"], None).unwrap();
    assert_eq!(summary["RandomForestRegressor"]["count"], 3);
    assert_eq!(summary["RandomForestRegressor"]["median"].as_f64(), Some(147.0));
    // second XGB row has neither a reported error nor an actual price
    assert_eq!(summary["XGBRegressor"]["count"], 1);
}

#[test]
fn test_config_file_options_and_colors() {
    let ranking = run_farechart(
        &[
            "--input",
            "test/records.json",
            "--config",
            "test/config.json",
            "top-routes",
            "--model",
            "RandomForestRegressor",
        ],
        None,
    )
    .unwrap();
    assert_eq!(ranking["top"].as_array().unwrap().len(), 1);
    assert_eq!(ranking["top"][0]["key"], "Mumbai-Chennai");
    assert_eq!(ranking["bottom"][0]["key"], "Delhi-Mumbai");
    assert_eq!(ranking["bottom"][0]["value"].as_f64(), Some(5950.0));

    let chart = run_farechart(
        &["--input", "test/records.json", "--config", "test/config.json", "routes"],
        None,
    )
    .unwrap();
    assert_eq!(dataset(&chart, "XGBRegressor")["color"], "teal");
    assert_eq!(dataset(&chart, "RandomForestRegressor")["color"], "navy");
}

#[test]
fn test_sampling_is_seeded() {
    let args = [
        "--input",
        "test/records.json",
        "--seed",
        "11",
        "scatter",
        "--sample",
        "2",
    ];
    let first = run_farechart(&args, None).unwrap();
    let second = run_farechart(&args, None).unwrap();
    assert_eq!(first, second);
    assert_eq!(first["points"].as_array().unwrap().len(), 2);
}

#[test]
fn test_distribution_by_class() {
    let chart = run_farechart(
        &["--input", "test/records.json", "distribution", "--by", "class"],
        None,
    )
    .unwrap();
    assert_eq!(chart["labels"], serde_json::json!(["Business", "Economy"]));
    assert_eq!(chart["summaries"][1]["count"], 3);
}

#[test]
fn test_aggregate_with_template_key() {
    let chart = run_farechart(
        &[
            "--input",
            "test/records.json",
            "aggregate",
            "--key",
            "{source_city}-{destination_city}",
            "--value",
            "Predicted_Price",
            "--series",
            "model_name",
        ],
        None,
    )
    .unwrap();
    assert_eq!(chart["labels"], serde_json::json!(["Delhi-Mumbai", "Mumbai-Chennai"]));
    let xgb = dataset(&chart, "XGBRegressor");
    assert_eq!(numbers(&xgb["data"]), vec![Some(6000.0), Some(6500.0)]);
}

#[test]
fn test_errors_are_reported() {
    let err = run_farechart(
        &["--input", "test/records.json", "aggregate", "--key", "{flight}", "--value", "price"],
        None,
    )
    .unwrap_err();
    assert!(err.contains("Invalid key"), "unexpected error: {}", err);

    let err = run_farechart(
        &["--input", "test/records.json", "pivot", "--row", "airline", "--col", "class", "--value", "airline"],
        None,
    )
    .unwrap_err();
    assert!(err.contains("not a numeric field"), "unexpected error: {}", err);

    let err = run_farechart(&["--input", "test/missing.json", "summary"], None).unwrap_err();
    assert!(err.contains("Failed to open"), "unexpected error: {}", err);

    // an object whose values are not record arrays
    assert!(run_farechart(&["--input", "test/mappings.json", "summary"], None).is_err());
}

#[test]
fn test_empty_input_is_well_formed() {
    let chart = run_farechart(&["days-left"], Some("[]")).unwrap();
    assert_eq!(chart["labels"], serde_json::json!([]));
    assert_eq!(chart["datasets"], serde_json::json!([]));

    let heat = run_farechart(&["city-heatmap"], Some("[]")).unwrap();
    assert_eq!(heat["z"], serde_json::json!([]));
}
