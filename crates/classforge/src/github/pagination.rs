//! `Link` header pagination.
//!
//! GitHub advertises further pages as
//! `<https://api.github.com/user/repos?per_page=100&page=2>; rel="next", <...&page=3>; rel="last"`.
//! The cursor handed back to callers is the value of the query parameter
//! that advances the listing (`page` for most endpoints, `since` for
//! `/users`).

/// Links parsed from a `Link` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPagination {
    pub next: Option<String>,
    pub last: Option<String>,
}

impl LinkPagination {
    /// The cursor for the next page, read from `param` of the `next` link.
    #[must_use]
    pub fn next_cursor(&self, param: &str) -> Option<String> {
        self.next.as_deref().and_then(|url| query_param(url, param))
    }
}

/// Parse a GitHub `Link` header.
pub fn parse_link_header(link_header: &str) -> LinkPagination {
    let mut info = LinkPagination::default();

    for part in link_header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                rel = Some(rel_value.trim_matches('"'));
            }
        }

        if let (Some(url), Some(rel)) = (url, rel) {
            match rel {
                "next" => info.next = Some(url.to_string()),
                "last" => info.last = Some(url.to_string()),
                _ => {}
            }
        }
    }

    info
}

/// Value of query parameter `name` in `url`.
fn query_param(url: &str, name: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}
