/// Compute download progress as a percentage.
#[must_use]
pub fn progress_percent(downloaded: u64, total: Option<u64>) -> f32 {
    match total {
        Some(total) if total > 0 => (downloaded as f32 / total as f32) * 100.0,
        _ => 0.0,
    }
}

/// Render names as `"a", "b"` for batch error messages.
#[must_use]
pub fn quote_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("\"{item}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calculates_progress_percent() {
        assert_eq!(progress_percent(0, Some(10)), 0.0);
        assert_eq!(progress_percent(5, Some(10)), 50.0);
        assert_eq!(progress_percent(10, Some(10)), 100.0);
        assert_eq!(progress_percent(5, None), 0.0);
        assert_eq!(progress_percent(5, Some(0)), 0.0);
    }

    #[test]
    fn quotes_lists() {
        assert_eq!(quote_list(&[]), "");
        assert_eq!(quote_list(&["worldedit".into()]), "\"worldedit\"");
        assert_eq!(
            quote_list(&["a".into(), "missing-one".into()]),
            "\"a\", \"missing-one\""
        );
    }
}
