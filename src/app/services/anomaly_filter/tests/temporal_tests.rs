//! Tests for the uptime integrity check

use super::*;
use crate::app::services::anomaly_filter::temporal::{find_restarted_sensors, remove_uptime_resets};

#[test]
fn test_decreasing_uptime_removes_all_sensor_records() {
    let records = vec![
        create_test_record("A", 50.0, 14.0, 10.0, 200.0, Some(100.0), 0),
        create_test_record("B", 50.1, 14.1, 11.0, 210.0, Some(10.0), 0),
        create_test_record("A", 50.0, 14.0, 10.5, 200.0, Some(50.0), 30),
        create_test_record("B", 50.1, 14.1, 11.5, 210.0, Some(20.0), 30),
    ];

    let (kept, outcome) = remove_uptime_resets(records);

    assert_eq!(kept.len(), 2);
    assert!(kept.iter().all(|r| r.sensor_id == "B"));
    assert_eq!(outcome.removed, 2);
    assert_eq!(outcome.restarts, 1);
}

#[test]
fn test_readings_are_ordered_by_time_before_differencing() {
    // Input order suggests a decrease, time order does not
    let records = vec![
        create_test_record("A", 50.0, 14.0, 10.0, 200.0, Some(500.0), 60),
        create_test_record("A", 50.0, 14.0, 10.0, 200.0, Some(100.0), 0),
        create_test_record("A", 50.0, 14.0, 10.0, 200.0, Some(300.0), 30),
    ];
    assert!(find_restarted_sensors(&records).is_empty());

    // Input order suggests an increase, time order shows a reset
    let records = vec![
        create_test_record("C", 50.0, 14.0, 10.0, 200.0, Some(5.0), 60),
        create_test_record("C", 50.0, 14.0, 10.0, 200.0, Some(900.0), 0),
    ];
    let restarted = find_restarted_sensors(&records);
    assert!(restarted.contains("C"));
}

#[test]
fn test_surviving_records_keep_input_order() {
    let records = vec![
        create_test_record("B", 50.1, 14.1, 1.0, 200.0, Some(10.0), 30),
        create_test_record("A", 50.0, 14.0, 2.0, 200.0, Some(9.0), 30),
        create_test_record("B", 50.1, 14.1, 3.0, 200.0, Some(5.0), 0),
        create_test_record("A", 50.0, 14.0, 4.0, 200.0, Some(8.0), 0),
    ];

    let (kept, outcome) = remove_uptime_resets(records);

    let temperatures: Vec<f64> = kept.iter().map(|r| r.temperature).collect();
    assert_eq!(temperatures, vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(outcome, Default::default());
}

#[test]
fn test_constant_uptime_is_not_a_reset() {
    let records = vec![
        create_test_record("A", 50.0, 14.0, 10.0, 200.0, Some(42.0), 0),
        create_test_record("A", 50.0, 14.0, 10.0, 200.0, Some(42.0), 30),
    ];
    assert!(find_restarted_sensors(&records).is_empty());
}
