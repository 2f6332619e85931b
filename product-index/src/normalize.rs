//! Text and vector normalization.

use std::sync::LazyLock;

use regex::Regex;

/// Emoticons, pictographs, transport, flags, dingbats, misc symbols and geometric shapes.
static EMOJI_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(concat!(
        "[",
        r"\x{1F600}-\x{1F64F}",
        r"\x{1F300}-\x{1F5FF}",
        r"\x{1F680}-\x{1F6FF}",
        r"\x{1F1E0}-\x{1F1FF}",
        r"\x{2700}-\x{27BF}",
        r"\x{1F900}-\x{1F9FF}",
        r"\x{2600}-\x{26FF}",
        r"\x{1FA70}-\x{1FAFF}",
        r"\x{25A0}-\x{25FF}",
        "]+"
    ))
    .ok()
});

/// Replaces emoji runs by a space, collapses whitespace and trims.
pub fn strip_emojis(s: &str) -> String {
    let replaced = match EMOJI_RE.as_ref() {
        Some(re) => re.replace_all(s, " "),
        None => s.into(),
    };
    collapse_whitespace(&replaced)
}

/// Collapses any whitespace run (newlines included) into one space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Euclidean norm.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Divides `v` by its L2 norm in place.
///
/// Returns `false` (leaving `v` untouched) when the norm is zero or not finite.
pub fn l2_normalize(v: &mut [f32]) -> bool {
    let n = l2_norm(v);
    if !n.is_finite() || n <= f32::EPSILON || v.iter().any(|x| !x.is_finite()) {
        return false;
    }
    for x in v.iter_mut() {
        *x /= n;
    }
    true
}

/// Cosine similarity; `0.0` if either side has zero norm.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let na = l2_norm(a);
    let nb = l2_norm(b);
    if na <= f32::EPSILON || nb <= f32::EPSILON {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (na * nb)
}
