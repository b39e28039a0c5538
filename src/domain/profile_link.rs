use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Profile, page, vanity and group URL shapes. Matched against the start of
/// the absolute href.
const PROFILE_LINK_PATTERNS: [&str; 4] = [
    r"^https?://(www\.)?facebook\.com/[A-Za-z0-9_.-]+/?",
    r"^https?://(www\.)?facebook\.com/pages/[^/]+/\d+",
    r"^https?://(www\.)?facebook\.com/profile\.php\?id=\d+",
    r"^https?://(www\.)?facebook\.com/groups/[A-Za-z0-9_.-]+",
];

static PROFILE_LINKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    PROFILE_LINK_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("valid profile link regex"))
        .collect()
});

pub fn is_profile_link(url: &str) -> bool {
    PROFILE_LINKS.iter().any(|pattern| pattern.is_match(url))
}

/// Collects every `<a href>` in `html` that points at a profile, page or
/// group. Relative hrefs are resolved against `base_url` first. The result
/// holds each absolute URL once, in no particular order.
pub fn harvest_profile_links(html: &str, base_url: Option<&str>) -> Vec<String> {
    let a_tag_selector = Selector::parse("a[href]").expect("valid anchor selector");
    let base = base_url.and_then(|b| Url::parse(b).ok());
    let document = Html::parse_document(html);

    let links: HashSet<String> = document
        .select(&a_tag_selector)
        .filter_map(|tag| tag.value().attr("href"))
        .filter_map(|href| resolve_href(href.trim(), base.as_ref()))
        .filter(|url| is_profile_link(url))
        .collect();

    links.into_iter().collect()
}

fn resolve_href(href: &str, base: Option<&Url>) -> Option<String> {
    if href.is_empty() {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    base?.join(href).ok().map(|url| url.to_string())
}
