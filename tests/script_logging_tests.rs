use spacecat::configure_logging;

// Kept in its own test binary: only one global subscriber can be installed
// per process.
#[test]
fn test_configure_logging_installs_once() {
    assert!(configure_logging(true, true).is_ok());
    assert!(
        configure_logging(false, false).is_err(),
        "a second global subscriber must be rejected"
    );
}
