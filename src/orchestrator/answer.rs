use crate::directory::PersonRecord;
use crate::model::SourceRecord;

pub const ASSISTANT_SYSTEM_PROMPT: &str = "당신은 한국농어촌공사(KRC)의 AI 어시스턴트입니다. \
최신 웹 정보를 검색하여 한국어로 정확하고 도움이 되는 답변을 제공하세요. \
마크다운 포맷을 사용하여 가독성 있게 답변하세요.";

pub const FALLBACK_SYSTEM_PROMPT: &str = "당신은 한국농어촌공사(KRC)의 AI 어시스턴트입니다. \
사용자의 질문에 대해 알고 있는 정보를 바탕으로 한국어로 답변해주세요.";

pub const UNSUPPORTED_NOTE: &str = "Responses API를 사용할 수 없어 기본 GPT로 답변했습니다.";

pub const ALL_CALLS_FAILED: &str = "모든 API 호출이 실패했습니다.";

/// User turn for the web-search call
pub fn search_prompt(query: &str) -> String {
    format!(
        "한국농어촌공사(KRC) AI 어시스턴트로서 \"{query}\"에 대해 최신 웹 정보를 검색하여 \
         한국어로 답변해주세요. 구체적이고 도움이 되는 정보를 제공하고, 마크다운 포맷을 \
         사용하여 가독성 있게 답변해주세요."
    )
}

/// Extra system context when the query is about a known person
pub fn person_context(person: &PersonRecord) -> String {
    format!(
        "다음은 {as_of} 기준으로 확인된 정보입니다. 인물 관련 질문에는 이 정보를 우선 사용하세요: {profile}",
        as_of = person.as_of,
        profile = person.profile,
    )
}

/// Lead sentence for identity questions ("who is ...")
pub fn person_summary(person: &PersonRecord) -> String {
    format!(
        "{org}의 {title}은(는) **{name}**입니다. ({since}년 취임, {as_of} 기준)",
        org = person.organization,
        title = person.title,
        name = person.name,
        since = person.since_year,
        as_of = person.as_of,
    )
}

/// Used when the search ran but no text could be recovered
pub fn search_unprocessed(query: &str) -> String {
    format!(
        "\"{query}\"에 대한 웹 검색을 수행했지만, 현재 결과를 처리하는데 문제가 있습니다. \
         다시 시도해주시거나 다른 키워드로 검색해보세요."
    )
}

/// Used when neither the search nor the chat fallback produced text
pub fn ask_more_specifically(query: &str) -> String {
    format!(
        "\"{query}\"에 대한 정보를 찾고 있습니다. 좀 더 구체적인 질문을 해주시면 \
         더 정확한 답변을 드릴 수 있습니다."
    )
}

/// Answer returned when every upstream call failed
pub fn degraded_answer(query: &str, person: Option<&PersonRecord>, contact: &str) -> String {
    let mut answer = format!(
        "죄송합니다. \"{query}\"에 대한 답변을 생성하는 중 문제가 발생했습니다. \
         잠시 후 다시 시도해주세요."
    );
    if let Some(person) = person {
        answer.push_str("\n\n");
        answer.push_str(&person_summary(person));
    }
    answer.push_str("\n\n");
    answer.push_str(contact);
    answer
}

/// Markdown reference list appended to the answer; empty when there are no sources
pub fn references_section(sources: &[SourceRecord]) -> String {
    if sources.is_empty() {
        return String::new();
    }

    let mut section = String::from("\n\n---\n\n### 📚 참고 자료\n");
    for (i, source) in sources.iter().enumerate() {
        let star = if source.prioritized { "⭐ " } else { "" };
        section.push_str(&format!(
            "\n{n}. {star}[{title}]({url}) - {domain}",
            n = i + 1,
            title = source.title,
            url = source.url,
            domain = source.domain,
        ));
    }
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::Directory;

    fn source(url: &str, prioritized: bool) -> SourceRecord {
        SourceRecord {
            title: "제목".into(),
            url: url.into(),
            snippet: String::new(),
            domain: "도메인".into(),
            prioritized,
        }
    }

    #[test]
    fn references_mark_prioritized_sources() {
        let section = references_section(&[source("https://a", true), source("https://b", false)]);
        assert!(section.contains("1. ⭐ [제목](https://a) - 도메인"));
        assert!(section.contains("2. [제목](https://b) - 도메인"));
        assert_eq!(references_section(&[]), "");
    }

    #[test]
    fn degraded_answer_carries_contact_and_person() {
        let directory = Directory::builtin().unwrap();
        let person = &directory.people[0];
        let answer = degraded_answer("질문", Some(person), &directory.contact);
        assert!(answer.contains(&directory.contact));
        assert!(answer.contains(&person.name));
        assert!(!degraded_answer("질문", None, "연락처").contains(&person.name));
    }
}
