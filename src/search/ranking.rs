use serde::{Deserialize, Serialize};

use crate::directory::PersonRecord;
use crate::model::ImageRecord;

/// Points added to an image for each kind of keyword hit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScoringWeights {
    pub name: u32,
    pub title: u32,
    pub organization: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            name: 100,
            title: 50,
            organization: 30,
        }
    }
}

/// What a person search is looking for
#[derive(Debug, Clone)]
pub struct RelevanceContext {
    pub name: String,
    pub title_keywords: Vec<String>,
    pub organization_keywords: Vec<String>,
}

impl RelevanceContext {
    pub fn for_person(person: &PersonRecord) -> Self {
        let mut title_keywords = person.title_keywords.clone();
        if !title_keywords.contains(&person.title) {
            title_keywords.push(person.title.clone());
        }
        let mut organization_keywords = person.organization_keywords.clone();
        if !organization_keywords.contains(&person.organization) {
            organization_keywords.push(person.organization.clone());
        }
        Self {
            name: person.name.clone(),
            title_keywords,
            organization_keywords,
        }
    }
}

/// Heuristic relevance of `image` for a person search.
///
/// Each category counts at most once: name, any title keyword, any
/// organization keyword. Matching is case-insensitive over title and alt.
pub fn relevance_score(
    image: &ImageRecord,
    context: &RelevanceContext,
    weights: &ScoringWeights,
) -> u32 {
    let haystack = format!("{} {}", image.title, image.alt).to_lowercase();
    let hit = |keyword: &String| {
        let keyword = keyword.trim().to_lowercase();
        !keyword.is_empty() && haystack.contains(&keyword)
    };

    let mut score = 0;
    if hit(&context.name) {
        score += weights.name;
    }
    if context.title_keywords.iter().any(hit) {
        score += weights.title;
    }
    if context.organization_keywords.iter().any(hit) {
        score += weights.organization;
    }
    score
}
