//! Round-trip properties over the fixture corpus

use clause_core::FormatConfig;
use clause_core::logical::extract_entries;
use clause_core::syntax::round_trip::{RoundTripValidator, strip_whitespace};
use clause_core::syntax::{parse_str, read_source, render};
use std::path::{Path, PathBuf};

fn fixtures() -> Vec<PathBuf> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    files.sort();
    assert!(!files.is_empty(), "no fixtures in {}", dir.display());
    files
}

fn configs() -> Vec<FormatConfig> {
    vec![
        FormatConfig::default(),
        FormatConfig {
            default_no_double_blank_line: true,
            ..FormatConfig::default()
        },
        FormatConfig {
            default_no_double_blank_line: true,
            object_forces_double_blank_line: true,
            ..FormatConfig::default()
        },
        FormatConfig {
            object_forces_double_blank_line: true,
            ..FormatConfig::default()
        },
        FormatConfig {
            force_single_line_below_item_count: Some(2),
            force_multi_line_above_item_count: Some(3),
            ..FormatConfig::default()
        },
        FormatConfig {
            force_single_line_below_item_count: Some(100),
            ..FormatConfig::default()
        },
        FormatConfig {
            default_yes_double_blank_line: true,
            force_single_line_below_item_count: Some(2),
            ..FormatConfig::default()
        },
        FormatConfig {
            force_multi_line_above_item_count: Some(0),
            single_line_separator: "\t".to_string(),
            ..FormatConfig::default()
        },
    ]
}

#[test]
fn test_default_render_reproduces_fixtures() {
    for path in fixtures() {
        let source = read_source(&path).unwrap();
        let tree = parse_str(&source).unwrap();
        assert_eq!(
            render(&tree, &FormatConfig::default()),
            source,
            "{} did not render back unchanged",
            path.display()
        );
    }
}

#[test]
fn test_round_trip_under_every_config() {
    for path in fixtures() {
        let source = read_source(&path).unwrap();
        for config in configs() {
            let result = RoundTripValidator::with_config(config.clone()).validate_round_trip(&source);
            assert!(
                result.is_valid(),
                "{} with {:?}: {:?}",
                path.display(),
                config,
                result.issues()
            );
        }
    }
}

#[test]
fn test_render_is_idempotent() {
    for path in fixtures() {
        let source = read_source(&path).unwrap();
        for config in configs() {
            let once = render(&parse_str(&source).unwrap(), &config);
            let twice = render(&parse_str(&once).unwrap(), &config);
            assert_eq!(once, twice, "{} with {:?}", path.display(), config);
        }
    }
}

#[test]
fn test_reformatting_keeps_logical_view() {
    for path in fixtures() {
        let source = read_source(&path).unwrap();
        let (expected, _) = extract_entries(&parse_str(&source).unwrap());
        for config in configs() {
            let formatted = render(&parse_str(&source).unwrap(), &config);
            assert_eq!(strip_whitespace(&formatted), strip_whitespace(&source));
            let (actual, _) = extract_entries(&parse_str(&formatted).unwrap());
            assert_eq!(actual, expected, "{} with {:?}", path.display(), config);
        }
    }
}

#[test]
fn test_repeated_keys_in_fixture() {
    let source = read_source(&Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/pop_needs.txt")).unwrap();
    let (entries, ambiguities) = extract_entries(&parse_str(&source).unwrap());
    assert!(ambiguities.is_empty());

    let heating = entries["popneed_heating"].as_mapping().unwrap();
    let occurrences = heating["entry"].occurrences();
    assert_eq!(occurrences.len(), 2);
    assert_eq!(
        occurrences[1].as_mapping().unwrap()["goods"].as_scalar(),
        Some("coal")
    );

    let colors = entries["culture_colors"].as_mapping().unwrap();
    assert_eq!(colors["color"].as_scalar(), Some("rgb { 120 200 40 }"));
    assert_eq!(colors["value"].as_scalar(), Some("@[ cost * 2 ]"));
    assert_eq!(colors["name"].as_unquoted(), Some("Say \\\"hello\\\""));
}
