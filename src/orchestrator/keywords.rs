use crate::directory::{Directory, PersonRecord};

/// Image search keywords for a query, most specific first.
///
/// Person plans always lead with the organization so results skew towards
/// photos of that person rather than namesakes.
pub fn image_keywords(
    query: &str,
    person: Option<&PersonRecord>,
    directory: &Directory,
    max: usize,
) -> Vec<String> {
    let candidates: Vec<String> = match person {
        Some(p) => vec![
            format!("{} {} {}", p.organization, p.name, p.title),
            format!("{} {}", p.organization, p.name),
            format!("{} {}", p.organization, p.title),
        ],
        None => {
            let topic = query.trim();
            if topic.is_empty() {
                return Vec::new();
            }
            directory
                .image_keyword_suffixes
                .iter()
                .map(|suffix| format!("{topic}{suffix}"))
                .collect()
        }
    };

    let mut keywords: Vec<String> = Vec::new();
    for keyword in candidates {
        if !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }
    keywords.truncate(max);
    keywords
}
