use crate::directory::{Directory, PersonRecord};

/// A query recognized as asking about a person in the directory
#[derive(Debug, Clone, Copy)]
pub struct PersonMatch<'a> {
    pub person: &'a PersonRecord,
    /// The query also carries a question keyword ("누구", "이름", ...)
    pub asks_identity: bool,
}

/// Match `query` against the directory's person records.
///
/// A record applies only when the query contains one of its role keywords
/// and one of its organization keywords. Question keywords never widen the
/// match; they only set `asks_identity`.
pub fn classify_query<'a>(query: &str, directory: &'a Directory) -> Option<PersonMatch<'a>> {
    let query = query.to_lowercase();
    let mentions = |keywords: &[String]| {
        keywords
            .iter()
            .any(|k| !k.trim().is_empty() && query.contains(&k.to_lowercase()))
    };

    let person = directory
        .people
        .iter()
        .find(|p| mentions(&p.role_keywords) && mentions(&p.organization_keywords))?;

    Some(PersonMatch {
        person,
        asks_identity: mentions(&directory.question_keywords),
    })
}
