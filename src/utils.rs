//! Utility functions for path sanitization and log formatting

use std::borrow::Cow;

/// Characters not permitted in filenames on some filesystems (notably
/// Windows); substituted with `_` before a path is used as a local target.
pub const FORBIDDEN_PATH_CHARS: [char; 6] = ['<', '>', '"', '|', '?', '*'];

/// Replace forbidden filesystem characters in a path with `_`.
///
/// Path separators (`/`) are preserved; only the denylisted characters are
/// substituted. Returns a borrowed string when nothing needed changing.
///
/// # Examples
///
/// ```
/// use sftp_dl::utils::sanitize_path;
///
/// assert_eq!(sanitize_path("reports/Q1<final>.csv"), "reports/Q1_final_.csv");
/// assert_eq!(sanitize_path("plain/name.txt"), "plain/name.txt");
/// ```
pub fn sanitize_path(path: &str) -> Cow<'_, str> {
    if path.contains(FORBIDDEN_PATH_CHARS) {
        Cow::Owned(
            path.chars()
                .map(|c| if FORBIDDEN_PATH_CHARS.contains(&c) { '_' } else { c })
                .collect(),
        )
    } else {
        Cow::Borrowed(path)
    }
}

/// Format a byte count as a human-readable string for log lines.
///
/// Uses binary units (KiB/MiB/GiB) with one decimal place, matching the
/// granularity of the progress log messages.
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

    let b = bytes as f64;
    if b >= GIB {
        format!("{:.1} GiB", b / GIB)
    } else if b >= MIB {
        format!("{:.1} MiB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{bytes} B")
    }
}
