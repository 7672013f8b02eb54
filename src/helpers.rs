//! Small utilities shared across the crate.

/// Make a title usable as a single path segment by replacing characters
/// that are illegal in file names with underscores.
///
/// Deterministic and idempotent, so repeated sanitization of an already
/// clean segment is a no-op and equal titles always map to equal segments.
pub fn make_valid_path_segment(title: &str) -> String {
    title
        .trim()
        .replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
}
