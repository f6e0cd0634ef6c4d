// integration tests for the build command

use crate::common::*;
use serde_json::json;
use std::path::Path;

/// units, springs and a broken constituent in configured order
fn write_project(test_dir: &Path, parallel: bool) {
    write_fixture(test_dir, "styles/units.sld", UNITS_SLD);
    write_fixture(test_dir, "styles/springs.sld", SPRINGS_SLD);
    write_fixture(test_dir, "styles/broken.sld", BROKEN_SLD);
    write_config(
        test_dir,
        &json!({
            "name": "geology",
            "output": "dist/style.json",
            "layers": [
                { "name": "units", "sld": "styles/units.sld", "min_zoom": 5, "max_zoom": 12 },
                { "name": "springs", "sld": "styles/springs.sld", "max_zoom": 16 },
                { "name": "broken", "sld": "styles/broken.sld" }
            ],
            "settings": { "parallel": parallel }
        }),
    );
}

#[test]
fn test_build_merges_constituents_in_order() {
    for parallel in [false, true] {
        let test_dir = create_test_dir("build_merge");
        write_project(&test_dir, parallel);

        let output = run_sldbridge(&test_dir, &["--json", "build"]);
        assert_exit!(output, 0);

        let style = read_json(&test_dir.join("dist/style.json"));
        assert_eq!(style["version"], 8);
        assert_eq!(style["name"], "geology");
        assert_eq!(
            layer_ids(&style),
            vec![
                "units-fill",
                "units-outline",
                "springs-0",
                "broken-fill",
                "broken-outline"
            ]
        );

        let sources = style["sources"].as_object().unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources["geology"]["url"], "pmtiles://geology.pmtiles");
        assert_eq!(sources["geology"]["minzoom"], 5);
        assert_eq!(sources["geology"]["maxzoom"], 16);

        for layer in style["layers"].as_array().unwrap() {
            assert_eq!(layer["source"], "geology");
        }
        assert_eq!(style["layers"][2]["source-layer"], "springs");

        cleanup_test_dir(&test_dir);
    }
}

#[test]
fn test_build_writes_report() {
    let test_dir = create_test_dir("build_report");
    write_project(&test_dir, false);

    let output = run_sldbridge(&test_dir, &["--json", "build"]);
    assert_exit!(output, 0);

    let json = stdout_json(&output);
    assert_eq!(json["result"]["action"], "build");
    assert!(json["result"]["report_path"]
        .as_str()
        .unwrap()
        .ends_with("style.report.json"));

    let report = read_json(&test_dir.join("dist/style.report.json"));
    assert_eq!(report["name"], "geology");
    assert!(report["generated_at"].is_string());
    assert_eq!(report["zoom"], json!({ "min": 5, "max": 16 }));

    let constituents = report["constituents"].as_array().unwrap();
    let tiers: Vec<&str> = constituents
        .iter()
        .map(|c| c["tier"].as_str().unwrap())
        .collect();
    assert_eq!(tiers, vec!["heuristic", "heuristic", "default"]);
    assert_eq!(constituents[0]["rules"], 2);

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_build_output_override() {
    let test_dir = create_test_dir("build_override");
    write_project(&test_dir, false);

    let output = run_sldbridge(&test_dir, &["--quiet", "build", "-o", "custom.json"]);
    assert_exit!(output, 0);
    assert!(output.stdout.is_empty());

    assert!(test_dir.join("custom.json").exists());
    assert!(test_dir.join("custom.report.json").exists());
    assert!(!test_dir.join("dist/style.json").exists());

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_build_keeps_siblings_of_unsupported_document() {
    let test_dir = create_test_dir("build_unsupported");
    write_fixture(&test_dir, "styles/units.sld", UNITS_SLD);
    write_fixture(&test_dir, "styles/outage.sld", "<html>503 Service Unavailable</html>");
    write_config(
        &test_dir,
        &json!({
            "layers": [
                { "name": "units", "sld": "styles/units.sld" },
                { "name": "outage", "sld": "styles/outage.sld" }
            ]
        }),
    );

    let output = run_sldbridge(&test_dir, &["--json", "build"]);
    assert_exit!(output, 0);

    let style = read_json(&test_dir.join("style.json"));
    assert_eq!(
        layer_ids(&style),
        vec!["units-fill", "units-outline", "outage-fill", "outage-outline"]
    );

    let report = read_json(&test_dir.join("style.report.json"));
    let outage = &report["constituents"][1];
    assert_eq!(report["constituents"][0]["tier"], "heuristic");
    assert_eq!(outage["tier"], "default");
    assert_eq!(outage["declined"][0]["tier"], "primary");
    assert!(outage["declined"][0]["reason"]
        .as_str()
        .unwrap()
        .contains("not a style layer descriptor"));

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_build_aborts_when_no_document_is_usable() {
    let test_dir = create_test_dir("build_all_unsupported");
    write_fixture(&test_dir, "styles/notes.txt", "not a style at all");
    write_config(
        &test_dir,
        &json!({
            "layers": [
                { "name": "notes", "sld": "styles/notes.txt" },
                { "name": "missing", "sld": "styles/missing.sld" }
            ]
        }),
    );

    let output = run_sldbridge(&test_dir, &["--json", "build"]);
    assert_exit!(output, 6);
    assert_eq!(stdout_json(&output)["error"]["code"], -32006);

    // nothing written for a failed run
    assert!(!test_dir.join("style.json").exists());

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_build_without_config_is_config_error() {
    let test_dir = create_test_dir("build_no_config");

    let output = run_sldbridge(&test_dir, &["--no-json", "build"]);
    assert_exit!(output, 5);
    assert!(String::from_utf8_lossy(&output.stderr).contains("config file not found"));

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_build_without_layers_is_config_error() {
    let test_dir = create_test_dir("build_no_layers");
    write_config(&test_dir, &json!({ "name": "empty" }));

    let output = run_sldbridge(&test_dir, &["--no-json", "build"]);
    assert_exit!(output, 5);
    assert!(String::from_utf8_lossy(&output.stderr).contains("no layers configured"));

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_build_config_from_env_var() {
    let test_dir = create_test_dir("build_env_config");
    write_project(&test_dir, false);
    let config_path = test_dir.join("sldbridge.json");
    let elsewhere = create_test_dir("build_env_cwd");

    let output = run_sldbridge_with_env(
        &elsewhere,
        &["--quiet", "build"],
        &[("SLDBRIDGE_CONFIG", config_path.to_str().unwrap())],
    );
    assert_exit!(output, 0);

    // relative paths resolve against the config file, not the working directory
    assert!(test_dir.join("dist/style.json").exists());

    cleanup_test_dir(&test_dir);
    cleanup_test_dir(&elsewhere);
}

#[cfg(unix)]
#[test]
fn test_build_with_translator_command() {
    let test_dir = create_test_dir("build_translator");
    write_fixture(&test_dir, "styles/units.sld", UNITS_SLD);
    let translated = write_fixture(
        &test_dir,
        "translated.json",
        &json!({
            "version": 8,
            "layers": [
                { "id": "kg", "type": "fill", "filter": ["==", "unit", "Kg"] },
                { "id": "qal", "type": "fill", "filter": ["==", "unit", "Qal"] }
            ]
        })
        .to_string(),
    );
    write_config(
        &test_dir,
        &json!({
            "name": "geology",
            "layers": [{ "name": "units", "sld": "styles/units.sld" }],
            "translator": {
                "command": "sh",
                "args": ["-c", "test -f \"$0\" && cat \"$1\"", "{input}", translated.to_str().unwrap()],
                "timeout_secs": 30
            }
        }),
    );

    let output = run_sldbridge(&test_dir, &["--json", "build"]);
    assert_exit!(output, 0);

    let report = &stdout_json(&output)["result"]["report"];
    assert_eq!(report["constituents"][0]["tier"], "primary");
    assert_eq!(report["constituents"][0]["labelled"], 2);

    let style = read_json(&test_dir.join("style.json"));
    assert_eq!(layer_ids(&style), vec!["kg", "qal"]);
    assert_eq!(style["layers"][0]["metadata"]["label"], "Granite & Gneiss");
    assert_eq!(style["layers"][1]["metadata"]["label"], "Alluvium");
    assert_eq!(style["layers"][1]["source-layer"], "units");

    cleanup_test_dir(&test_dir);
}

#[cfg(unix)]
#[test]
fn test_build_survives_failing_translator() {
    let test_dir = create_test_dir("build_translator_fails");
    write_fixture(&test_dir, "styles/units.sld", UNITS_SLD);
    write_config(
        &test_dir,
        &json!({
            "layers": [{ "name": "units", "sld": "styles/units.sld" }],
            "translator": { "command": "sh", "args": ["-c", "exit 2"] }
        }),
    );

    let output = run_sldbridge(&test_dir, &["--json", "build"]);
    assert_exit!(output, 0);

    let constituent = &stdout_json(&output)["result"]["report"]["constituents"][0];
    assert_eq!(constituent["tier"], "heuristic");
    assert_eq!(constituent["declined"][0]["tier"], "primary");

    cleanup_test_dir(&test_dir);
}
