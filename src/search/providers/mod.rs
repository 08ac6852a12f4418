mod google;
mod naver;

pub use google::GoogleSearchProvider;
pub use naver::NaverImageProvider;

use regex::Regex;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Remove inline markup (`<b>` highlights and the like) from a result title
pub(crate) fn strip_tags(text: &str) -> String {
    TAG.replace_all(text, "")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
