//! Prompts and defensive parsers for the delimiter-separated LLM protocol.

use std::collections::HashSet;

/// Separator between phrases / IDs in model output.
pub const DELIMITER: &str = "|||";

/// Expansion output for queries unrelated to fashion.
pub const OFF_DOMAIN_SENTINEL: &str = "not relevant to fashion products";

/// Relevance output when no offered image matches.
pub const NO_RELEVANT_SENTINEL: &str = "no relevant images";

/// System instructions for query expansion.
pub const EXPANSION_SYSTEM: &str = r#"You are a product search assistant for fashion products.
Your task is to convert the user's query to product descriptions which are relevant to the original query,
e.g. if the user query is "I need an outfit to go to the beach this summer", you should return "swimwear|||sandals|||sunglasses".

Output should be delimited by |||
Output should contain at most 5 items.
If the user query is already a product description, return it as is.
If the user query is not relevant to fashion products, return "not relevant to fashion products"."#;

/// User message for query expansion.
pub fn expansion_user_prompt(query: &str) -> String {
    format!("Query: {}", query.trim())
}

/// Instruction text for one relevance batch; images follow in `ids` order.
pub fn relevance_prompt(query: &str, ids: &[&str]) -> String {
    let listed = ids
        .iter()
        .enumerate()
        .map(|(i, id)| format!("{}. {id}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"You are given a user query and a list of fashion product images, each identified by an image ID.

Query:
"{query}"

The images follow in this order, one per ID:
{listed}

Your task:
- Determine which images are relevant to the query.
- If none of the images are relevant, return "{NO_RELEVANT_SENTINEL}".
- Return all relevant image IDs, delimited by {DELIMITER} (e.g. "id1{DELIMITER}id3").
- Only return IDs from the list above. Do not make up IDs."#,
        query = query.trim(),
    )
}

/// Parsed outcome of query expansion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expansion {
    /// Query judged off-domain; retrieval stops here.
    OffDomain,
    /// Usable phrases (possibly none).
    Phrases(Vec<String>),
}

/// Lowercase, trimmed, without surrounding quotes or a trailing period.
fn canonical(s: &str) -> String {
    s.trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim()
        .trim_end_matches('.')
        .trim()
        .to_lowercase()
}

fn is_sentinel(raw: &str, sentinel: &str) -> bool {
    canonical(raw) == sentinel
}

fn split_items(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(DELIMITER)
        .map(|p| {
            p.trim()
                .trim_matches(|c| c == '"' || c == '\'' || c == '`')
                .trim()
                .to_string()
        })
        .filter(|p| !p.is_empty())
}

/// Parses expansion output: sentinel, or up to `max` unique non-empty phrases.
pub fn parse_expansion(raw: &str, max: usize) -> Expansion {
    if is_sentinel(raw, OFF_DOMAIN_SENTINEL) {
        return Expansion::OffDomain;
    }
    let mut seen = HashSet::new();
    let phrases = split_items(raw)
        .filter(|p| seen.insert(p.to_lowercase()))
        .take(max)
        .collect();
    Expansion::Phrases(phrases)
}

/// Parses relevance output, keeping only IDs that were offered.
pub fn parse_relevant_ids(raw: &str, offered: &[&str]) -> Vec<String> {
    if is_sentinel(raw, NO_RELEVANT_SENTINEL) {
        return Vec::new();
    }
    let offered: HashSet<&str> = offered.iter().copied().collect();
    let mut seen = HashSet::new();
    split_items(raw)
        .filter(|id| offered.contains(id.as_str()))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
