use crate::directory::Directory;
use crate::model::{dedup_by_url, ImageOrigin, ImageRecord};
use crate::preview::domain_name;

/// Which image list goes first when og:images and searched images are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOrder {
    /// Person queries: ranked search results first
    SearchedFirst,
    /// General queries: pictures from the cited pages first
    PreviewFirst,
}

/// Merge, de-duplicate, pad with placeholders up to `min`, and cap at `max`
pub fn assemble_images(
    previews: Vec<ImageRecord>,
    searched: Vec<ImageRecord>,
    order: MergeOrder,
    placeholder: &PlaceholderImages<'_>,
    min: usize,
    max: usize,
) -> Vec<ImageRecord> {
    let (first, second) = match order {
        MergeOrder::SearchedFirst => (searched, previews),
        MergeOrder::PreviewFirst => (previews, searched),
    };
    let merged = first.into_iter().chain(second).collect();
    let mut images = dedup_by_url(merged, |image| image.url.as_str());
    images.truncate(max);

    let missing = min.min(max).saturating_sub(images.len());
    images.extend(placeholder.generate(missing, images.len()));
    images
}

/// Synthesizes stand-in images when searches come back short
pub struct PlaceholderImages<'a> {
    pub template: &'a str,
    pub caption: &'a str,
    pub directory: &'a Directory,
}

impl PlaceholderImages<'_> {
    /// `count` placeholders, numbered after `offset` existing images
    pub fn generate(&self, count: usize, offset: usize) -> Vec<ImageRecord> {
        (1..=count)
            .map(|i| {
                let n = offset + i;
                let text = format!("{} {n}", self.caption);
                let encoded: String = url::form_urlencoded::byte_serialize(text.as_bytes()).collect();
                let url = self.template.replace("{text}", &encoded);
                ImageRecord {
                    domain: domain_name(&url, &self.directory.domains),
                    source: url.clone(),
                    url,
                    title: format!("{} 관련 이미지", self.caption),
                    alt: text,
                    thumbnail: None,
                    width: Some(600),
                    height: Some(400),
                    relevance_score: None,
                    method: ImageOrigin::Placeholder,
                }
            })
            .collect()
    }
}
