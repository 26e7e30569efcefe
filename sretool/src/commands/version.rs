/// Get the version string for sretool and libsretool
pub fn get_version_string() -> String {
    format!(
        "sretool {}\nlibsretool {}",
        env!("CARGO_PKG_VERSION"),
        libsretool::version()
    )
}

/// Print version information to stdout
pub fn print_version() {
    println!("{}", get_version_string());
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
