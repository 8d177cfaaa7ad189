//! Unit tests for account form validation.
//!
//! Run with: cargo test --test validation_test

use water_monitor::routes::account::validation;
use water_monitor::session::Role;

#[test]
fn mac_addresses_are_normalized() {
    for input in [
        "aa:bb:cc:dd:ee:ff",
        "AA-BB-CC-DD-EE-FF",
        "aabbccddeeff",
        "  Aa:bB:cc:DD:ee:FF ",
    ] {
        assert_eq!(
            validation::mac_address(input).unwrap(),
            "AA:BB:CC:DD:EE:FF",
            "input {input:?}"
        );
    }
}

#[test]
fn bad_mac_addresses_are_rejected() {
    for input in [
        "",
        "AA:BB:CC:DD:EE",
        "GG:BB:CC:DD:EE:FF",
        "AA:BB:CCDD:EE:FF",
        "sensor-1",
        "AABB:::::CCDDEEFF",
        "AA:BB-CC:DD:EE:FF",
        "AA:BB:CC:DD:EE:F:",
        "AA::B:CC:DD:EE:FF",
    ] {
        assert!(validation::mac_address(input).is_err(), "input {input:?}");
    }
}

#[test]
fn email_shape() {
    assert_eq!(validation::email(" ana@example.com ").unwrap(), "ana@example.com");
    assert!(validation::email("").is_err());
    assert!(validation::email("ana").is_err());
    assert!(validation::email("@example.com").is_err());
    assert!(validation::email("ana@localhost").is_err());
}

#[test]
fn required_fields() {
    assert_eq!(validation::required("phone", " 555 ").unwrap(), "555");
    assert!(validation::required("phone", "   ").is_err());
}

#[test]
fn roles_are_strict() {
    assert_eq!(validation::role("Admin").unwrap(), Role::Admin);
    assert_eq!(validation::role("operator").unwrap(), Role::Operator);
    assert!(validation::role("superuser").is_err());

    // Profile rows fall back to operator instead
    assert_eq!(Role::from_str("superuser"), Role::Operator);
}
