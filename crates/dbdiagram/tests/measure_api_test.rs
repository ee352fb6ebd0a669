//! Integration tests for the one-shot measurement API
//!
//! These tests verify that a host document can be measured end to end and
//! that the report serializes.

use float_cmp::assert_approx_eq;

use dbdiagram::{
    DbDiagramError, DiagramMeasurer,
    config::{AppConfig, MeasurementConfig, MeasurerKind},
    geometry::BBox,
    measure_document,
};

const HOST: &str = r#"<svg xmlns="http://www.w3.org/2000/svg">
  <style>:root { --dbdg-table-title-font-size: 10px; }</style>
  <defs>
    <symbol id="dbdg-table-icon" width="24" height="24"/>
    <symbol id="dbdg-primary-key-icon" width="16" height="16"/>
    <symbol id="dbdg-foreign-key-icon" width="16" height="16"/>
  </defs>
</svg>"#;

fn approximate() -> AppConfig {
    AppConfig::new(
        Default::default(),
        Default::default(),
        MeasurementConfig::default().with_measurer(MeasurerKind::Approximate),
    )
}

#[test]
fn test_report_lists_every_icon() {
    let report = measure_document(HOST, &approximate()).expect("Failed to measure");
    assert_eq!(report.root(), "svg");

    let icons = report.icons();
    assert_eq!(icons.len(), 4);
    assert_eq!(icons[0].name, "table");
    assert_eq!(icons[0].bbox, Some(BBox::new(0.0, 0.0, 24.0, 24.0)));

    // The unique key icon is missing from the host.
    assert_eq!(icons[3].id, "dbdg-unique-key-icon");
    assert!(icons[3].bbox.is_none());
    assert_eq!(
        icons[3].error.as_deref(),
        Some("Element id: dbdg-unique-key-icon not found")
    );
}

#[test]
fn test_constants_that_need_missing_icons_are_absent() {
    let report = measure_document(HOST, &approximate()).unwrap();
    let constants = report.constants();
    assert_approx_eq!(f32, constants.header_height.unwrap(), 40.0);
    assert!(constants.footer_height.is_some());
    assert!(constants.field_height.is_none());
    assert!(constants.field_icon_width.is_none());
}

#[test]
fn test_samples_follow_defaults() {
    let report = DiagramMeasurer::new(approximate())
        .with_table_names(["users"])
        .with_engines(["MySQL"])
        .measure(HOST)
        .unwrap();

    let headers: Vec<_> = report.headers().iter().map(|s| s.text.as_str()).collect();
    assert_eq!(headers, ["DUMP", "users"]);
    let footers: Vec<_> = report.footers().iter().map(|s| s.text.as_str()).collect();
    assert_eq!(footers, ["Unknown", "MySQL"]);

    // 5 chars * 10px * 0.55 next to the 24px icon, plus 12px padding.
    assert_approx_eq!(f32, report.headers()[1].bbox.width(), 24.0 + 27.5 + 12.0);
}

#[test]
fn test_report_serializes_to_toml() {
    let report = measure_document(HOST, &approximate()).unwrap();
    let toml = toml::to_string_pretty(&report).expect("Failed to serialize");
    assert!(toml.contains("root = \"svg\""));
    assert!(toml.contains("header_height"));
    assert!(toml.contains("dbdg-unique-key-icon not found"));
}

#[test]
fn test_malformed_host() {
    let err = measure_document("<svg><g></svg>", &approximate()).unwrap_err();
    match err {
        DbDiagramError::Document { err, src } => {
            assert!(err.offset().is_some());
            assert_eq!(src, "<svg><g></svg>");
        }
        other => panic!("Expected Document error, got {other:?}"),
    }
}
