// integration tests for the rules command

use crate::common::*;

#[test]
fn test_rules_json_lists_titles_and_conditions() {
    let test_dir = create_test_dir("rules_json");
    write_fixture(&test_dir, "units.sld", UNITS_SLD);

    let output = run_sldbridge(&test_dir, &["--json", "rules", "units.sld"]);
    assert_exit!(output, 0);

    let json = stdout_json(&output);
    assert_eq!(json["jsonrpc"], "2.0");

    let rules = json["result"]["rules"].as_array().unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0]["title"], "Granite & Gneiss");
    assert_eq!(rules[0]["conditions"][0]["property"], "unit");
    assert_eq!(rules[0]["conditions"][0]["operator"], "==");
    assert_eq!(rules[0]["conditions"][0]["value"], "Kg");
    assert_eq!(rules[1]["title"], "Alluvium");

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_rules_text_output() {
    let test_dir = create_test_dir("rules_text");
    write_fixture(&test_dir, "units.sld", UNITS_SLD);

    let output = run_sldbridge(&test_dir, &["--no-json", "rules", "units.sld"]);
    assert_exit!(output, 0);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec!["Granite & Gneiss: unit == Kg", "Alluvium: unit == Qal"]
    );

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_rules_of_malformed_document_is_empty() {
    let test_dir = create_test_dir("rules_malformed");
    write_fixture(&test_dir, "broken.sld", BROKEN_SLD);

    let output = run_sldbridge(&test_dir, &["--json", "rules", "broken.sld"]);
    assert_exit!(output, 0);

    let json = stdout_json(&output);
    assert!(json["result"]["rules"].as_array().unwrap().is_empty());

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_rules_rejects_non_sld_input() {
    let test_dir = create_test_dir("rules_unsupported");
    write_fixture(&test_dir, "notes.txt", "just some field notes");

    let output = run_sldbridge(&test_dir, &["--json", "rules", "notes.txt"]);
    assert_exit!(output, 6);

    let json = stdout_json(&output);
    assert_eq!(json["error"]["code"], -32006);
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("not a style layer descriptor"));

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_rules_missing_file_is_general_error() {
    let test_dir = create_test_dir("rules_missing");

    let output = run_sldbridge(&test_dir, &["--no-json", "rules", "missing.sld"]);
    assert_exit!(output, 1);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: failed to read"), "stderr: {}", stderr);

    cleanup_test_dir(&test_dir);
}

#[test]
fn test_unknown_argument_is_invalid_args() {
    let test_dir = create_test_dir("rules_bad_args");

    let output = run_sldbridge(&test_dir, &["rules", "--no-such-flag"]);
    assert_exit!(output, 4);

    cleanup_test_dir(&test_dir);
}
