// Tests for lib.rs: interrupt flag, error display, error classification

use super::*;
use crate::error::ErrorClass;
use serial_test::serial;

// ==================== INTERRUPT HANDLING TESTS ====================

#[test]
#[serial]
fn test_interrupt_initially_not_set() {
    reset_interrupted();
    assert!(
        !is_interrupted(),
        "Interrupt flag should initially be not set"
    );
}

#[test]
#[serial]
fn test_set_interrupt_flag() {
    reset_interrupted();
    set_interrupted();
    assert!(is_interrupted(), "Interrupt flag should be set");
    reset_interrupted();
}

#[test]
#[serial]
fn test_interrupt_flag_persistence() {
    reset_interrupted();
    set_interrupted();
    assert!(is_interrupted());
    assert!(
        is_interrupted(),
        "Flag should remain set on subsequent calls"
    );
    reset_interrupted();
}

#[test]
#[serial]
fn test_reset_interrupt_flag() {
    set_interrupted();
    reset_interrupted();
    assert!(!is_interrupted(), "Flag should be cleared after reset");
}

// ==================== ERROR DISPLAY TESTS ====================

#[test]
fn test_latency_exceeded_message() {
    let err = SectorError::LatencyExceeded {
        sector: 1234,
        latency_ms: 151.456,
        limit_ms: 100,
    };
    assert_eq!(
        err.to_string(),
        "Sector 1234 access time 151.46ms exceeds max latency 100ms"
    );
}

#[test]
fn test_io_failure_keeps_source() {
    use std::error::Error;

    let err = SectorError::IoFailure {
        sector: 9,
        source: std::io::Error::from_raw_os_error(libc::EIO),
    };
    assert!(err.to_string().starts_with("I/O failure at sector 9"));
    assert!(err.source().is_some());
}

#[test]
fn test_share_violation_names_device() {
    let err = SectorError::TransientShareViolation {
        device: "/dev/sdb".to_string(),
    };
    assert!(err.to_string().contains("/dev/sdb"));
}

#[test]
fn test_fatal_variants_display() {
    assert_eq!(
        SectorError::RecoveryLog("disk full".into()).to_string(),
        "Recovery log unavailable: disk full"
    );
    assert_eq!(
        SectorError::InvalidSelection("mode 7".into()).to_string(),
        "Invalid selection: mode 7"
    );
    assert_eq!(
        SectorError::Interrupted.to_string(),
        "Operation interrupted by user"
    );
}

// ==================== CLASSIFICATION ====================

#[test]
fn test_only_startup_and_log_errors_are_fatal() {
    let per_sector = [
        SectorError::TransientShareViolation {
            device: "d".into(),
        },
        SectorError::DeviceOpenFailure {
            device: "d".into(),
            source: std::io::Error::from_raw_os_error(libc::ENOENT),
        },
        SectorError::IoFailure {
            sector: 0,
            source: std::io::Error::from_raw_os_error(libc::EIO),
        },
        SectorError::LatencyExceeded {
            sector: 0,
            latency_ms: 500.0,
            limit_ms: 100,
        },
    ];
    for err in &per_sector {
        assert!(!err.class().is_fatal(), "{} should not be fatal", err);
    }

    let fatal = [
        SectorError::RecoveryLog("x".into()),
        SectorError::InvalidSelection("x".into()),
        SectorError::Config("x".into()),
    ];
    for err in &fatal {
        assert_eq!(err.class(), ErrorClass::Fatal);
    }
}

#[test]
fn test_reexports_are_usable() {
    let settings = Settings::default();
    let policy = RepairPolicy::new(settings.repair_params());
    assert_eq!(policy.patterns(), &Pattern::standard_pair()[..]);
    assert_eq!(SECTOR_SIZE, 512);
}
