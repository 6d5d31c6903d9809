//! Tests for tag combination

use crate::Error;
use crate::app::services::anomaly_filter::{AnomalyTag, CombineMode};

#[test]
fn test_tag_from_flags() {
    assert_eq!(AnomalyTag::from_flags(false, false), AnomalyTag::NotAnomalous);
    assert_eq!(AnomalyTag::from_flags(true, false), AnomalyTag::GlobalOnly);
    assert_eq!(AnomalyTag::from_flags(false, true), AnomalyTag::LocalOnly);
    assert_eq!(AnomalyTag::from_flags(true, true), AnomalyTag::Both);
}

#[test]
fn test_union_removes_any_flag() {
    let mode = CombineMode::Union;
    assert!(!mode.removes(AnomalyTag::NotAnomalous));
    assert!(mode.removes(AnomalyTag::GlobalOnly));
    assert!(mode.removes(AnomalyTag::LocalOnly));
    assert!(mode.removes(AnomalyTag::Both));
}

#[test]
fn test_intersection_removes_only_both() {
    let mode = CombineMode::Intersection;
    assert!(!mode.removes(AnomalyTag::NotAnomalous));
    assert!(!mode.removes(AnomalyTag::GlobalOnly));
    assert!(!mode.removes(AnomalyTag::LocalOnly));
    assert!(mode.removes(AnomalyTag::Both));
}

#[test]
fn test_combine_mode_parsing() {
    assert_eq!("union".parse::<CombineMode>().unwrap(), CombineMode::Union);
    assert_eq!(
        " Intersection ".parse::<CombineMode>().unwrap(),
        CombineMode::Intersection
    );

    let result = "xor".parse::<CombineMode>();
    assert!(matches!(result, Err(Error::Configuration { .. })));
}
