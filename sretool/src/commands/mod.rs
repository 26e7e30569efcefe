/// Image command handlers and logic
pub mod image;

/// Skopeo command handlers and logic
pub mod skopeo;

/// Version command handlers
pub mod version;
