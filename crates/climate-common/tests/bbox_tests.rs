//! Tests for BoundingBox parsing and extent checks.

use climate_common::{BoundingBox, ClimateError, Extent};

fn extent(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Extent {
    Extent {
        lat_min,
        lat_max,
        lon_min,
        lon_max,
    }
}

// ============================================================================
// Constructor tests
// ============================================================================

#[test]
fn test_bbox_new() {
    let bbox = BoundingBox::new(41.8, 43.6, 18.4, 20.4).unwrap();
    assert_eq!(bbox.lat_min(), 41.8);
    assert_eq!(bbox.lat_max(), 43.6);
    assert_eq!(bbox.lon_min(), 18.4);
    assert_eq!(bbox.lon_max(), 20.4);
}

#[test]
fn test_bbox_copy() {
    let bbox1 = BoundingBox::new(0.0, 10.0, 0.0, 10.0).unwrap();
    let bbox2 = bbox1;
    assert_eq!(bbox1, bbox2);
}

#[test]
fn test_bbox_degenerate_rejected() {
    let result = BoundingBox::new(5.0, 5.0, 5.0, 6.0);
    assert!(matches!(result, Err(ClimateError::InvalidBbox(_))));
}

// ============================================================================
// from_csv tests
// ============================================================================

#[test]
fn test_parse_csv() {
    let bbox = BoundingBox::from_csv("39.6,42.7,19.2,21.1").unwrap();
    assert_eq!(bbox.lat_min(), 39.6);
    assert_eq!(bbox.lon_max(), 21.1);
}

#[test]
fn test_parse_csv_whitespace() {
    let bbox = BoundingBox::from_csv(" 39.6, 42.7 ,19.2,21.1 ").unwrap();
    assert_eq!(bbox.lat_max(), 42.7);
}

#[test]
fn test_parse_csv_too_few() {
    let result = BoundingBox::from_csv("0,10,100");
    assert!(matches!(result, Err(ClimateError::InvalidBbox(_))));
}

#[test]
fn test_parse_csv_invalid_number() {
    let result = BoundingBox::from_csv("abc,10,0,100");
    assert!(matches!(result, Err(ClimateError::InvalidBbox(_))));
}

#[test]
fn test_parse_csv_inverted() {
    assert!(BoundingBox::from_csv("42.7,39.6,19.2,21.1").is_err());
}

// ============================================================================
// Extent checks
// ============================================================================

#[test]
fn test_strictly_inside_does_not_exceed() {
    let grid = extent(30.0, 50.0, 10.0, 30.0);
    let bbox = BoundingBox::new(35.0, 40.0, 15.0, 20.0).unwrap();
    assert!(!bbox.exceeds(&grid));
}

#[test]
fn test_boundary_equal_does_not_exceed() {
    let grid = extent(30.0, 50.0, 10.0, 30.0);
    let bbox = BoundingBox::new(30.0, 50.0, 10.0, 30.0).unwrap();
    assert!(!bbox.exceeds(&grid));
}

#[test]
fn test_each_edge_outside_exceeds() {
    let grid = extent(30.0, 50.0, 10.0, 30.0);
    let cases = [
        (29.9, 40.0, 15.0, 20.0),
        (35.0, 50.1, 15.0, 20.0),
        (35.0, 40.0, 9.9, 20.0),
        (35.0, 40.0, 15.0, 30.1),
    ];
    for (lat_min, lat_max, lon_min, lon_max) in cases {
        let bbox = BoundingBox::new(lat_min, lat_max, lon_min, lon_max).unwrap();
        assert!(bbox.exceeds(&grid), "{} should exceed {}", bbox, grid);
    }
}

#[test]
fn test_contains_point_edges() {
    let bbox = BoundingBox::new(35.0, 40.0, 15.0, 20.0).unwrap();
    assert!(bbox.contains_point(35.0, 15.0));
    assert!(bbox.contains_point(40.0, 20.0));
    assert!(!bbox.contains_point(40.01, 20.0));
}

#[test]
fn test_bbox_serde_roundtrip() {
    let bbox = BoundingBox::new(35.0, 40.0, 15.0, 20.0).unwrap();
    let json = serde_json::to_string(&bbox).unwrap();
    let back: BoundingBox = serde_json::from_str(&json).unwrap();
    assert_eq!(bbox, back);
}
