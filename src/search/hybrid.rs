use std::sync::Arc;

use crate::model::{dedup_by_url, ImageRecord};
use crate::search::ranking::{relevance_score, RelevanceContext, ScoringWeights};
use crate::search::{ImageSearchProvider, SearchOptions};

/// Queries several image providers in priority order and merges the results.
///
/// Earlier providers win URL collisions. With a relevance context the merged
/// list is scored and stably sorted by score, highest first.
pub struct HybridImageSearch {
    providers: Vec<Arc<dyn ImageSearchProvider>>,
}

impl HybridImageSearch {
    pub fn new(providers: Vec<Arc<dyn ImageSearchProvider>>) -> Self {
        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub async fn search(
        &self,
        keywords: &[String],
        options: &SearchOptions,
        ranking: Option<(&RelevanceContext, &ScoringWeights)>,
    ) -> Vec<ImageRecord> {
        let mut collected = Vec::new();

        for provider in &self.providers {
            for keyword in keywords {
                match provider.search_images(keyword, options).await {
                    Ok(images) => {
                        tracing::debug!(
                            provider = provider.name(),
                            keyword = %keyword,
                            count = images.len(),
                            "image search results"
                        );
                        collected.extend(images);
                    }
                    Err(e) => {
                        tracing::warn!(
                            provider = provider.name(),
                            keyword = %keyword,
                            error = %e,
                            "image search failed"
                        );
                    }
                }
            }
        }

        let mut images = dedup_by_url(collected, |image| image.url.as_str());

        if let Some((context, weights)) = ranking {
            for image in &mut images {
                image.relevance_score = Some(relevance_score(image, context, weights));
            }
            images.sort_by_key(|image| std::cmp::Reverse(image.relevance_score.unwrap_or(0)));
        }

        images
    }
}
