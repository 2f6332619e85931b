//! Query expansion: one free-text query into a few concrete product phrases.

use tracing::{debug, warn};

use crate::{
    llm::LanguageModel,
    prompt::{EXPANSION_SYSTEM, Expansion, expansion_user_prompt, parse_expansion},
};

/// Asks the chat model for product phrases.
///
/// A failed completion falls back to the trimmed query as the only phrase,
/// so a flaky chat model degrades to plain single-phrase search.
pub async fn expand_query(llm: &dyn LanguageModel, query: &str, max_phrases: usize) -> Expansion {
    let query = query.trim();
    if query.is_empty() {
        return Expansion::Phrases(Vec::new());
    }

    let user = expansion_user_prompt(query);
    match llm.complete(EXPANSION_SYSTEM, &user).await {
        Ok(raw) => {
            let out = parse_expansion(&raw, max_phrases);
            debug!(?out, "query expanded");
            out
        }
        Err(e) => {
            warn!(error = %e, "query expansion failed; searching the raw query");
            Expansion::Phrases(vec![query.to_string()])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedModel;

    #[tokio::test]
    async fn phrases_come_back_capped() {
        let llm = ScriptedModel::new("swim trunks|||sunglasses|||sandals", "");
        let got = expand_query(&llm, "beach outfit", 2).await;
        assert_eq!(
            got,
            Expansion::Phrases(vec!["swim trunks".into(), "sunglasses".into()])
        );
        let sent = llm.chat_calls();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, EXPANSION_SYSTEM);
        assert_eq!(sent[0].1, "Query: beach outfit");
    }

    #[tokio::test]
    async fn chat_failure_searches_raw_query() {
        let llm = ScriptedModel::failing();
        let got = expand_query(&llm, "  red scarf ", 5).await;
        assert_eq!(got, Expansion::Phrases(vec!["red scarf".into()]));
    }

    #[tokio::test]
    async fn blank_query_skips_the_model() {
        let llm = ScriptedModel::new("anything", "");
        assert_eq!(
            expand_query(&llm, "   ", 5).await,
            Expansion::Phrases(vec![])
        );
        assert!(llm.chat_calls().is_empty());
    }
}
