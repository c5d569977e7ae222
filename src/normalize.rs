//! Label and URL canonicalization shared by source normalizers and the resolver.

use tracing::warn;

use crate::types::{CanonicalLabel, LabelText, Url};

/// Canonical label form used for filenames and grouping: lowercase, whitespace
/// runs collapsed to a single underscore, `#` stripped.
pub fn normalize_label<T: AsRef<str>>(label: T) -> CanonicalLabel {
    let mut normalized = String::new();
    let mut seen_space = false;
    for ch in label.as_ref().trim().chars() {
        if ch.is_whitespace() {
            if !seen_space && !normalized.is_empty() {
                normalized.push('_');
                seen_space = true;
            }
        } else if ch != '#' {
            for lower in ch.to_lowercase() {
                normalized.push(lower);
            }
            seen_space = false;
        }
    }
    while normalized.ends_with('_') {
        normalized.pop();
    }
    normalized
}

/// Case/whitespace-insensitive label equality.
pub fn labels_equivalent(a: &LabelText, b: &LabelText) -> bool {
    normalize_label(a) == normalize_label(b)
}

/// Jaro-Winkler similarity over normalized labels, in `[0.0, 1.0]`.
pub fn label_similarity(a: &LabelText, b: &LabelText) -> f64 {
    strsim::jaro_winkler(&normalize_label(a), &normalize_label(b))
}

/// Prepend `https://` to scheme-less www/YouTube URLs.
///
/// Other scheme-less URLs pass through unchanged; the downloader collaborator
/// decides whether it can handle them.
pub fn normalize_url<T: AsRef<str>>(url: T) -> Option<Url> {
    let url = url.as_ref().trim();
    if url.is_empty() {
        return None;
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        return Some(url.to_string());
    }
    if url.starts_with("www.") || url.contains("youtube.com") || url.contains("youtu.be") {
        return Some(format!("https://{url}"));
    }
    warn!(url, "url lacks a scheme and is not recognized as YouTube");
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_label_collapses_and_lowercases() {
        assert_eq!(normalize_label("Deaf  School"), "deaf_school");
        assert_eq!(normalize_label("  book "), "book");
        assert_eq!(normalize_label("c#at\tnap"), "cat_nap");
    }

    #[test]
    fn labels_equivalent_ignores_case_and_whitespace() {
        assert!(labels_equivalent(
            &"Deaf School".to_string(),
            &"deaf   school".to_string()
        ));
        assert!(!labels_equivalent(&"cat".to_string(), &"dog".to_string()));
    }

    #[test]
    fn label_similarity_is_high_for_near_matches() {
        let sim = label_similarity(&"computer".to_string(), &"computers".to_string());
        assert!(sim > 0.9);
        let far = label_similarity(&"cat".to_string(), &"xylophone".to_string());
        assert!(far < 0.6);
    }

    #[test]
    fn normalize_url_adds_scheme_for_known_hosts() {
        assert_eq!(
            normalize_url("www.example.com/v.mp4").as_deref(),
            Some("https://www.example.com/v.mp4")
        );
        assert_eq!(
            normalize_url("youtube.com/watch?v=abc").as_deref(),
            Some("https://youtube.com/watch?v=abc")
        );
        assert_eq!(
            normalize_url("https://host/v.mp4").as_deref(),
            Some("https://host/v.mp4")
        );
        assert_eq!(normalize_url("   "), None);
    }
}
