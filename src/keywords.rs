//! Keyword extraction from normalized article text.
//!
//! Produces a small ranked set of topical phrases (one or two words) used as
//! WordPress tags and as the SEO focus keyword. Extraction runs over the
//! normalized source text, not the rewritten body, so the keywords reflect
//! the original reporting rather than the model's phrasing.
//!
//! Scoring is plain frequency with bigrams weighted above unigrams; ties are
//! broken by first occurrence so the ranking is deterministic.

use std::collections::HashMap;

use itertools::Itertools;

/// Maximum number of phrases returned; the first one is the focus keyword.
pub const MAX_KEYWORDS: usize = 5;

/// Common Spanish function words excluded from candidate phrases.
const STOPWORDS: &[&str] = &[
    "a", "al", "algo", "ante", "antes", "aquel", "aquella", "aquí", "así", "aunque", "bien",
    "cada", "como", "con", "contra", "cual", "cuando", "de", "del", "desde", "donde", "dos",
    "durante", "e", "el", "ella", "ellas", "ellos", "en", "entre", "era", "eran", "es", "esa",
    "ese", "eso", "esta", "estaba", "este", "esto", "estos", "fue", "fueron", "ha", "haber",
    "había", "han", "hasta", "hay", "la", "las", "le", "les", "lo", "los", "más", "me", "mi",
    "mientras", "muy", "nada", "ni", "no", "nos", "nuestro", "o", "otra", "otro", "para", "pero",
    "poco", "por", "porque", "que", "qué", "se", "según", "ser", "si", "sí", "sido", "sin",
    "sobre", "son", "su", "sus", "también", "tan", "tanto", "te", "tiene", "tienen", "todo",
    "todos", "tras", "tu", "un", "una", "uno", "unos", "y", "ya", "yo",
];

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Lowercased alphabetic tokens, accents included.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphabetic())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Extract up to `top_n` ranked phrases from `text`.
///
/// An empty result is valid; callers treat it as "no tags, empty focus
/// keyword" rather than an error.
pub fn extract(text: &str, top_n: usize) -> Vec<String> {
    let tokens = tokenize(text);

    // phrase -> (score, first occurrence)
    let mut candidates: HashMap<String, (usize, usize)> = HashMap::new();

    for (i, token) in tokens.iter().enumerate() {
        if token.len() < 3 || is_stopword(token) {
            continue;
        }
        let entry = candidates.entry(token.clone()).or_insert((0, i));
        entry.0 += 1;
    }

    for (i, pair) in tokens.windows(2).enumerate() {
        let (a, b) = (&pair[0], &pair[1]);
        if a.len() < 3 || b.len() < 3 || is_stopword(a) || is_stopword(b) {
            continue;
        }
        let entry = candidates.entry(format!("{a} {b}")).or_insert((0, i));
        // A repeated two-word phrase says more about the topic than either
        // word alone.
        entry.0 += 2;
    }

    candidates
        .into_iter()
        .sorted_by(|(_, (score_a, first_a)), (_, (score_b, first_b))| {
            score_b.cmp(score_a).then(first_a.cmp(first_b))
        })
        .map(|(phrase, _)| phrase)
        .take(top_n)
        .collect()
}
