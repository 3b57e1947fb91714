use time::OffsetDateTime;

/// Format a byte count as a human-readable string (B, KB, MB, GB)
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * 1024 * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a timestamp as "YYYY-MM-DD HH:MM:SS" (UTC)
pub fn format_timestamp(at: OffsetDateTime) -> String {
    use time::macros::format_description;

    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    at.format(&format)
        .unwrap_or_else(|_| "unknown".to_string())
}
