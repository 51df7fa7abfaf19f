/// Bucket for everything that has no recognizable path segment, plus nested
/// sitemap documents.
pub const CATCH_ALL_CATEGORY: &str = "others";

/// Assign a category to a page URL relative to the site's base URL.
///
/// The first non-empty path segment names the category. A handful of
/// well-known singular segments map onto their plural bucket names, and a
/// `YYYY/MM/DD` date anywhere in the path marks a blog post. Deterministic:
/// the same (url, base) pair always yields the same category.
pub fn categorize(url: &str, base_url: &str) -> String {
    let relative = match url.strip_prefix(base_url) {
        Some(rest) => rest.to_string(),
        // Not under the base URL; fall back to the URL's own path.
        None => url::Url::parse(url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| url.to_string()),
    };
    // Cut off query string and fragment before splitting the path.
    let path = relative
        .split(['?', '#'])
        .next()
        .unwrap_or(relative.as_str());

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if has_date_path(&segments) {
        return "posts".to_string();
    }

    match segments.first() {
        Some(&"event") => "events".to_string(),
        Some(&"resource") => "resources".to_string(),
        Some(&"case-studies") => "caseStudies".to_string(),
        Some(&"partner") => "partners".to_string(),
        Some(segment) => (*segment).to_string(),
        None => CATCH_ALL_CATEGORY.to_string(),
    }
}

/// True when the path contains a YYYY/MM/DD segment triple.
fn has_date_path(segments: &[&str]) -> bool {
    segments.windows(3).any(|w| {
        is_numeric_segment(w[0], 4) && is_numeric_segment(w[1], 2) && is_numeric_segment(w[2], 2)
    })
}

fn is_numeric_segment(segment: &str, len: usize) -> bool {
    segment.len() == len && segment.bytes().all(|b| b.is_ascii_digit())
}
