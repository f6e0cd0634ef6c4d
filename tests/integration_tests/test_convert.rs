// integration tests for the label, fallback and convert commands

use crate::common::*;
use serde_json::json;

fn translated_units() -> String {
    json!({
        "version": 8,
        "name": "translated",
        "sources": { "tool-source": { "type": "vector", "url": "file://elsewhere" } },
        "layers": [
            { "id": "units-0", "type": "fill", "source": "tool-source",
              "filter": ["==", "unit", "Kg"], "paint": { "fill-color": "#f4a6a6" } },
            { "id": "units-1", "type": "fill", "source": "tool-source",
              "filter": ["==", ["get", "unit"], "Qal"] },
            { "id": "units-2", "type": "fill", "source": "tool-source",
              "filter": ["==", "unit", "Tv"] }
        ]
    })
    .to_string()
}

// ============================================================================
// label tests
// ============================================================================

#[test]
fn test_label_writes_labelled_style() {
    let test_dir = create_test_dir("label_output");
    write_fixture(&test_dir, "units.sld", UNITS_SLD);
    write_fixture(&test_dir, "translated.json", &translated_units());

    let output = run_sldbridge(
        &test_dir,
        &["--json", "label", "units.sld", "translated.json", "-o", "out/labelled.json"],
    );
    assert_exit!(output, 0);

    let json = stdout_json(&output);
    assert_eq!(json["result"]["action"], "label");
    assert_eq!(json["result"]["labelled"], 2);
    assert_eq!(json["result"]["unmatched"], json!(["units-2"]));

    let style = read_json(&test_dir.join("out/labelled.json"));
    assert_eq!(style["layers"][0]["metadata"]["label"], "Granite & Gneiss");
    assert_eq!(style["layers"][1]["metadata"]["label"], "Alluvium");
    assert!(style["layers"][2].get("metadata").is_none());
    // everything else passes through untouched
    assert_eq!(style["layers"][0]["paint"]["fill-color"], "#f4a6a6");
    assert_eq!(style["sources"]["tool-source"]["url"], "file://elsewhere");

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_label_to_stdout() {
    let test_dir = create_test_dir("label_stdout");
    write_fixture(&test_dir, "units.sld", UNITS_SLD);
    write_fixture(&test_dir, "translated.json", &translated_units());

    let output = run_sldbridge(&test_dir, &["label", "units.sld", "translated.json"]);
    assert_exit!(output, 0);

    // the style document itself, not a JSON-RPC envelope
    let style = stdout_json(&output);
    assert_eq!(style["version"], 8);
    assert_eq!(style["layers"][1]["metadata"]["label"], "Alluvium");

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_label_invalid_style_fails() {
    let test_dir = create_test_dir("label_invalid");
    write_fixture(&test_dir, "units.sld", UNITS_SLD);
    write_fixture(&test_dir, "translated.json", "{ not json");

    let output = run_sldbridge(&test_dir, &["--json", "label", "units.sld", "translated.json"]);
    assert_exit!(output, 1);

    let json = stdout_json(&output);
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Invalid style document"));

    cleanup_test_dir(&test_dir);
}

// ============================================================================
// fallback tests
// ============================================================================

#[test]
fn test_fallback_polygon_classification() {
    let test_dir = create_test_dir("fallback_polygon");
    write_fixture(&test_dir, "units.sld", UNITS_SLD);

    let output = run_sldbridge(&test_dir, &["fallback", "units.sld"]);
    assert_exit!(output, 0);

    let style = stdout_json(&output);
    assert_eq!(layer_ids(&style), vec!["units-fill", "units-outline"]);
    assert_eq!(style["sources"]["units"]["url"], "pmtiles://units.pmtiles");
    assert_eq!(
        style["layers"][0]["paint"]["fill-color"],
        json!(["match", ["get", "unit"], "Kg", "#f4a6a6", "Qal", "#fff7bc", "#888888"])
    );
    assert_eq!(style["layers"][0]["paint"]["fill-opacity"], 0.6);

    let legend = style["layers"][0]["metadata"]["legend"].as_array().unwrap();
    assert_eq!(legend.len(), 2);
    assert_eq!(legend[0]["label"], "Granite & Gneiss");

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_fallback_points_skip_legend_only_rules() {
    let test_dir = create_test_dir("fallback_points");
    write_fixture(&test_dir, "springs.sld", SPRINGS_SLD);

    let output = run_sldbridge(
        &test_dir,
        &["--json", "fallback", "springs.sld", "--name", "hot", "-o", "hot.json"],
    );
    assert_exit!(output, 0);

    let json = stdout_json(&output);
    assert_eq!(json["result"]["geometry"], "point");
    assert_eq!(json["result"]["rules"], 2);
    assert_eq!(json["result"]["layers"], 1);

    let style = read_json(&test_dir.join("hot.json"));
    assert_eq!(layer_ids(&style), vec!["hot-0"]);

    let layer = &style["layers"][0];
    assert_eq!(layer["type"], "circle");
    assert_eq!(layer["source-layer"], "hot");
    assert_eq!(layer["filter"], json!(["==", ["get", "kind"], "thermal"]));
    assert_eq!(layer["paint"]["circle-color"], "#d7301f");
    assert_eq!(layer["metadata"]["label"], "Thermal Spring");
    assert_eq!(layer["metadata"]["legend"].as_array().unwrap().len(), 2);

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_fallback_without_renderable_rules_writes_default_style() {
    let test_dir = create_test_dir("fallback_empty");
    write_fixture(&test_dir, "broken.sld", BROKEN_SLD);

    let output = run_sldbridge(
        &test_dir,
        &["--json", "fallback", "broken.sld", "-o", "broken.json"],
    );
    assert_exit!(output, 0);

    let json = stdout_json(&output);
    assert_eq!(json["result"]["default_style"], true);
    assert_eq!(json["result"]["layers"], 2);

    let style = read_json(&test_dir.join("broken.json"));
    assert_eq!(layer_ids(&style), vec!["broken-fill", "broken-outline"]);
    assert_eq!(style["layers"][0]["paint"]["fill-color"], "#088");
    assert_eq!(style["layers"][0]["paint"]["fill-opacity"], 0.6);
    assert_eq!(style["layers"][1]["paint"]["line-color"], "#000000");
    assert_eq!(style["layers"][1]["paint"]["line-width"], 0.5);

    cleanup_test_dir(&test_dir);
}

// ============================================================================
// convert tests
// ============================================================================

#[test]
fn test_convert_with_pretranslated_style() {
    let test_dir = create_test_dir("convert_primary");
    write_fixture(&test_dir, "units.sld", UNITS_SLD);
    write_fixture(&test_dir, "translated.json", &translated_units());

    let output = run_sldbridge(
        &test_dir,
        &["--json", "convert", "units.sld", "--style", "translated.json", "-o", "units.json"],
    );
    assert_exit!(output, 0);

    let json = stdout_json(&output);
    assert_eq!(json["result"]["constituent"]["tier"], "primary");
    assert_eq!(json["result"]["constituent"]["labelled"], 2);

    let style = read_json(&test_dir.join("units.json"));
    assert_eq!(style["name"], "units");
    assert_eq!(style["sources"].as_object().unwrap().len(), 1);
    assert_eq!(style["sources"]["units"]["type"], "vector");
    assert_eq!(style["sources"]["units"]["url"], "pmtiles://units.pmtiles");
    for layer in style["layers"].as_array().unwrap() {
        assert_eq!(layer["source"], "units");
        assert_eq!(layer["source-layer"], "units");
    }
    assert_eq!(style["layers"][0]["metadata"]["label"], "Granite & Gneiss");

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_convert_falls_back_to_heuristic() {
    let test_dir = create_test_dir("convert_heuristic");
    write_fixture(&test_dir, "units.sld", UNITS_SLD);

    let output = run_sldbridge(
        &test_dir,
        &["--json", "convert", "units.sld", "--name", "geo", "-o", "geo.json"],
    );
    assert_exit!(output, 0);

    let json = stdout_json(&output);
    let constituent = &json["result"]["constituent"];
    assert_eq!(constituent["tier"], "heuristic");
    assert_eq!(constituent["declined"][0]["tier"], "primary");

    let style = read_json(&test_dir.join("geo.json"));
    assert_eq!(layer_ids(&style), vec!["geo-fill", "geo-outline"]);

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_convert_malformed_document_gets_default_style() {
    let test_dir = create_test_dir("convert_default");
    write_fixture(&test_dir, "broken.sld", BROKEN_SLD);

    let output = run_sldbridge(&test_dir, &["--json", "convert", "broken.sld", "-o", "b.json"]);
    assert_exit!(output, 0);

    let json = stdout_json(&output);
    assert_eq!(json["result"]["constituent"]["tier"], "default");

    let style = read_json(&test_dir.join("b.json"));
    assert_eq!(layer_ids(&style), vec!["broken-fill", "broken-outline"]);
    assert_eq!(style["layers"][0]["paint"]["fill-color"], "#088");
    assert_eq!(style["layers"][1]["paint"]["line-color"], "#000000");
    assert_eq!(style["layers"][1]["paint"]["line-width"], 0.5);

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_convert_uses_configured_tiles_url() {
    let test_dir = create_test_dir("convert_tiles_url");
    write_fixture(&test_dir, "units.sld", UNITS_SLD);
    write_config(
        &test_dir,
        &json!({ "tiles_url": "https://tiles.example.com/{name}.pmtiles" }),
    );

    let output = run_sldbridge(&test_dir, &["convert", "units.sld"]);
    assert_exit!(output, 0);

    let style = stdout_json(&output);
    assert_eq!(
        style["sources"]["units"]["url"],
        "https://tiles.example.com/units.pmtiles"
    );

    cleanup_test_dir(&test_dir);
}
