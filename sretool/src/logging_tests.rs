use super::*;

#[test]
fn test_env_filter_from_verbosity() {
    let filter = env_filter(None, VerbosityLevel::VeryVerbose);
    assert_eq!(filter.to_string(), "debug");
}

#[test]
fn test_env_filter_prefers_rust_log() {
    let filter = env_filter(Some("libsretool=trace"), VerbosityLevel::Normal);
    assert_eq!(filter.to_string(), "libsretool=trace");
}

#[test]
fn test_env_filter_ignores_blank_rust_log() {
    let filter = env_filter(Some("  "), VerbosityLevel::Normal);
    assert_eq!(filter.to_string(), "warn");
}

#[test]
fn test_init_twice_does_not_panic() {
    init(VerbosityLevel::Normal);
    init(VerbosityLevel::Verbose);
}
