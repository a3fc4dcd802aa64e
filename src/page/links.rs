//! Link extraction from fetched pages

use regex::Regex;
use reqwest::header::LOCATION;
use scraper::Selector;

use super::Page;

/// Element/attribute pairs that carry outgoing links in HTML
const LINK_SOURCES: &[(&str, &str)] = &[
    ("a[href]", "href"),
    ("frame[src]", "src"),
    ("iframe[src]", "src"),
    ("link[href]", "href"),
    ("script[src]", "src"),
];

/// Collects the raw outgoing links of a page
///
/// Redirect responses contribute every `Location` header value; when
/// none is present, meta refresh targets stand in. HTML bodies then
/// contribute their element references, selector group by selector
/// group.
pub(super) fn extract_links(page: &Page) -> Vec<String> {
    let mut links = Vec::new();

    if page.is_redirect() {
        let locations: Vec<String> = page
            .headers()
            .get_all(LOCATION)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|location| !location.is_empty())
            .map(str::to_string)
            .collect();

        if locations.is_empty() {
            // Location headers override any meta refresh in the body
            links.extend(meta_refresh_targets(page));
        } else {
            links.extend(locations);
        }
    }

    if let Some(doc) = page.doc() {
        for (selector_text, attr) in LINK_SOURCES {
            let Ok(selector) = Selector::parse(selector_text) else {
                continue;
            };

            for element in doc.select(&selector) {
                if let Some(value) = element.value().attr(attr) {
                    let value = value.trim();
                    if !value.is_empty() {
                        links.push(value.to_string());
                    }
                }
            }
        }
    }

    links
}

/// Extracts `<meta http-equiv="refresh">` targets from an HTML body
fn meta_refresh_targets(page: &Page) -> Vec<String> {
    let mut targets = Vec::new();

    let Some(doc) = page.doc() else {
        return targets;
    };
    let Ok(selector) = Selector::parse("meta[http-equiv][content]") else {
        return targets;
    };
    let Ok(url_pattern) = Regex::new(r"(?i)url\s*=\s*(\S+)\s*$") else {
        return targets;
    };

    for element in doc.select(&selector) {
        let refresh = element
            .value()
            .attr("http-equiv")
            .map(|value| value.eq_ignore_ascii_case("refresh"))
            .unwrap_or(false);
        if !refresh {
            continue;
        }

        let Some(content) = element.value().attr("content") else {
            continue;
        };

        if let Some(captures) = url_pattern.captures(content) {
            if let Some(target) = captures.get(1) {
                let target = target.as_str().trim_matches(|c| c == '\'' || c == '"');
                if !target.is_empty() {
                    targets.push(target.to_string());
                }
            }
        }
    }

    targets
}
