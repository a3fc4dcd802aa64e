use url::Url;

/// Expands a URL path by resolving `.` and `..` segments lexically
///
/// The expansion never consults the filesystem or the network; it only
/// rewrites the path string:
///
/// - `.` segments and empty segments (from repeated slashes) are dropped
/// - `..` pops the previously kept segment; popping past the start is a
///   no-op rather than an error
/// - whether the input started and ended with `/` is preserved in the
///   result
/// - an empty input, or a path that collapses to nothing, expands to `/`
///
/// Percent-encoded characters and letter case pass through untouched.
///
/// # Arguments
///
/// * `path` - The path component to expand
///
/// # Returns
///
/// The expanded path string
///
/// # Examples
///
/// ```
/// use spinneret::url::expand_path;
///
/// assert_eq!(expand_path("/a/b/../c"), "/a/c");
/// assert_eq!(expand_path("a/./b/"), "a/b/");
/// assert_eq!(expand_path(""), "/");
/// ```
pub fn expand_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let leading_slash = path.starts_with('/');
    let trailing_slash = path.ends_with('/');

    // Walk the segments, keeping a stack of retained ones
    let mut stack: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            // Skip empty segments (from multiple slashes) and current directory markers
            "" | "." => continue,
            // Parent directory - pop the last segment if possible
            ".." => {
                stack.pop();
            }
            // Regular segment
            _ => stack.push(segment),
        }
    }

    // A fully collapsed path is the root, regardless of the input shape
    if stack.is_empty() {
        return "/".to_string();
    }

    let mut expanded = stack.join("/");
    if leading_slash {
        expanded.insert(0, '/');
    }
    if trailing_slash {
        expanded.push('/');
    }

    expanded
}

/// Strips the fragment and optionally the query from a URL in place
///
/// Fragments never reach the server, so two URLs differing only in
/// fragment are the same resource; queries usually do matter, so they
/// are kept unless the caller opts out.
///
/// # Arguments
///
/// * `url` - The URL to sanitize
/// * `strip_fragment` - Remove the `#fragment` component
/// * `strip_query` - Remove the `?query` component
pub fn sanitize(url: &mut Url, strip_fragment: bool, strip_query: bool) {
    if strip_fragment {
        url.set_fragment(None);
    }

    if strip_query {
        url.set_query(None);
    }
}

/// Resolves a raw link against a base URL
///
/// The link text is trimmed, joined against the base, and the resulting
/// path is run through [`expand_path`]. Opaque URLs (such as `mailto:`
/// or `data:`) have no hierarchical path and are returned as joined.
///
/// # Arguments
///
/// * `base` - The URL of the page the link appeared on
/// * `link` - The raw link text
///
/// # Returns
///
/// * `Some(Url)` - The resolved absolute URL
/// * `None` - The link was empty or could not be joined
pub fn to_absolute(base: &Url, link: &str) -> Option<Url> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }

    let mut resolved = base.join(link).ok()?;

    if !resolved.cannot_be_a_base() {
        let expanded = expand_path(resolved.path());
        resolved.set_path(&expanded);
    }

    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_dot_dot_segments() {
        assert_eq!(expand_path("/a/b/../c"), "/a/c");
    }

    #[test]
    fn test_expand_single_dot_segments() {
        assert_eq!(expand_path("/a/./b/./c"), "/a/b/c");
    }

    #[test]
    fn test_expand_mixed_dot_segments() {
        assert_eq!(expand_path("/a/b/c/../../d"), "/a/d");
    }

    #[test]
    fn test_expand_empty_path() {
        assert_eq!(expand_path(""), "/");
    }

    #[test]
    fn test_expand_root() {
        assert_eq!(expand_path("/"), "/");
    }

    #[test]
    fn test_expand_parent_at_root_is_noop() {
        assert_eq!(expand_path("/../a"), "/a");
        assert_eq!(expand_path("/../../b"), "/b");
    }

    #[test]
    fn test_expand_full_collapse_is_root() {
        assert_eq!(expand_path("/a/.."), "/");
        assert_eq!(expand_path("a/.."), "/");
        assert_eq!(expand_path("."), "/");
    }

    #[test]
    fn test_expand_preserves_missing_leading_slash() {
        assert_eq!(expand_path("a/b/../c"), "a/c");
    }

    #[test]
    fn test_expand_preserves_trailing_slash() {
        assert_eq!(expand_path("/a/b/"), "/a/b/");
        assert_eq!(expand_path("a/./b/"), "a/b/");
    }

    #[test]
    fn test_expand_collapses_repeated_slashes() {
        assert_eq!(expand_path("/a//b///c"), "/a/b/c");
    }

    #[test]
    fn test_expand_keeps_percent_encoding() {
        assert_eq!(expand_path("/a%2Fb/c"), "/a%2Fb/c");
    }

    #[test]
    fn test_expand_keeps_case() {
        assert_eq!(expand_path("/Images/../Pages/Index"), "/Pages/Index");
    }

    #[test]
    fn test_sanitize_strips_fragment() {
        let mut url = Url::parse("https://example.com/page?q=1#section").unwrap();
        sanitize(&mut url, true, false);
        assert_eq!(url.as_str(), "https://example.com/page?q=1");
    }

    #[test]
    fn test_sanitize_strips_query_when_asked() {
        let mut url = Url::parse("https://example.com/page?q=1#section").unwrap();
        sanitize(&mut url, true, true);
        assert_eq!(url.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_sanitize_keeps_everything_when_disabled() {
        let mut url = Url::parse("https://example.com/page?q=1#section").unwrap();
        sanitize(&mut url, false, false);
        assert_eq!(url.as_str(), "https://example.com/page?q=1#section");
    }

    #[test]
    fn test_to_absolute_relative_link() {
        let base = Url::parse("https://example.com/a/b.html").unwrap();
        let resolved = to_absolute(&base, "c.html").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/a/c.html");
    }

    #[test]
    fn test_to_absolute_rooted_link() {
        let base = Url::parse("https://example.com/a/b.html").unwrap();
        let resolved = to_absolute(&base, "/c.html").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/c.html");
    }

    #[test]
    fn test_to_absolute_parent_link() {
        let base = Url::parse("https://example.com/a/b/").unwrap();
        let resolved = to_absolute(&base, "../c.html").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/a/c.html");
    }

    #[test]
    fn test_to_absolute_absolute_link() {
        let base = Url::parse("https://example.com/a/").unwrap();
        let resolved = to_absolute(&base, "https://other.example.com/x").unwrap();
        assert_eq!(resolved.as_str(), "https://other.example.com/x");
    }

    #[test]
    fn test_to_absolute_trims_whitespace() {
        let base = Url::parse("https://example.com/").unwrap();
        let resolved = to_absolute(&base, "  page.html\n").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/page.html");
    }

    #[test]
    fn test_to_absolute_empty_link_is_none() {
        let base = Url::parse("https://example.com/").unwrap();
        assert!(to_absolute(&base, "").is_none());
        assert!(to_absolute(&base, "   ").is_none());
    }

    #[test]
    fn test_to_absolute_fragment_link() {
        let base = Url::parse("https://example.com/page").unwrap();
        let resolved = to_absolute(&base, "#section").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/page#section");
    }

    #[test]
    fn test_to_absolute_opaque_link() {
        let base = Url::parse("https://example.com/").unwrap();
        let resolved = to_absolute(&base, "mailto:admin@example.com").unwrap();
        assert_eq!(resolved.scheme(), "mailto");
    }

    #[test]
    fn test_to_absolute_query_link() {
        let base = Url::parse("https://example.com/search").unwrap();
        let resolved = to_absolute(&base, "?q=rust").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/search?q=rust");
    }
}
