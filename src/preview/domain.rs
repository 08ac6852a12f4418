use regex::Regex;
use std::sync::LazyLock;

use crate::directory::DomainLabel;

/// Returned when nothing resembling a host can be found
pub const UNKNOWN_DOMAIN: &str = "알 수 없음";

static HOST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://([^/?#\s]+)").expect("valid host regex"));

/// Human-readable name for the site behind `url`.
///
/// The host (without a leading `www.`) is looked up in `labels` by
/// containment; the longest matching key wins so sub-sites beat their parent
/// domain. Unknown hosts are returned as-is. Never fails.
pub fn domain_name(url: &str, labels: &[DomainLabel]) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return UNKNOWN_DOMAIN.to_string();
    }

    let host = match url::Url::parse(trimmed) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.to_lowercase(),
            None => return UNKNOWN_DOMAIN.to_string(),
        },
        Err(e) => {
            tracing::debug!(url = %trimmed, error = %e, "url parse failed, trying regex");
            match HOST_RE.captures(trimmed) {
                Some(cap) => cap[1].to_lowercase(),
                None => return UNKNOWN_DOMAIN.to_string(),
            }
        }
    };

    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

    labels
        .iter()
        .filter(|entry| host.contains(entry.host.as_str()))
        .max_by_key(|entry| entry.host.len())
        .map(|entry| entry.label.clone())
        .unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<DomainLabel> {
        [
            ("naver.com", "네이버"),
            ("ekr.or.kr", "한국농어촌공사"),
            ("rawris.ekr.or.kr", "농촌용수종합정보시스템"),
        ]
        .into_iter()
        .map(|(host, label)| DomainLabel {
            host: host.to_string(),
            label: label.to_string(),
        })
        .collect()
    }

    #[test]
    fn maps_known_host_ignoring_www_and_path() {
        assert_eq!(
            domain_name("https://www.naver.com/search?q=x", &labels()),
            "네이버"
        );
        assert_eq!(domain_name("https://m.naver.com", &labels()), "네이버");
    }

    #[test]
    fn longest_key_wins() {
        assert_eq!(
            domain_name("https://rawris.ekr.or.kr/main.do", &labels()),
            "농촌용수종합정보시스템"
        );
        assert_eq!(
            domain_name("https://www.ekr.or.kr/", &labels()),
            "한국농어촌공사"
        );
    }

    #[test]
    fn unknown_host_is_returned_raw() {
        assert_eq!(
            domain_name("https://www.example.org/a", &labels()),
            "example.org"
        );
    }

    #[test]
    fn unparsable_url_falls_back_to_regex() {
        // The space makes the URL invalid; the regex stops at whitespace.
        assert_eq!(domain_name("http://www.bad host.com/x", &labels()), "bad");
    }

    #[test]
    fn garbage_returns_sentinel() {
        assert_eq!(domain_name("", &labels()), UNKNOWN_DOMAIN);
        assert_eq!(domain_name("not a url", &labels()), UNKNOWN_DOMAIN);
    }
}
