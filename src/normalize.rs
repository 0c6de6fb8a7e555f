//! Text normalization for scraped article bodies.
//!
//! Feed sources wrap the useful prose in promotional boilerplate, share
//! widgets, image captions, and markdown leftovers. This module strips all of
//! that with an ordered, declarative rule list so each rule can be unit-tested
//! on its own. [`normalize`] is a pure function: same input, same output, no
//! side effects.
//!
//! The smaller helpers ([`strip_stray_letters`], [`strip_emphasis`],
//! [`wrap_headings`]) are shared with the rewrite client, which applies the
//! same cleanup to model output.

use once_cell::sync::Lazy;
use regex::Regex;

/// Promotional lines removed verbatim before any pattern matching.
const AD_LINES: &[&str] = &[
    "⚽ Descarga la App de JEINZ MACIAS Canales y Fútbol En Vivo GRATIS",
    "Disfruta partidos, canales y más ¡Totalmente gratis en Android!",
    "📲 Descargar APK",
    "⚽ Disfruta de partidos, canales y más ¡Totalmente gratis en Android!",
];

/// Minimum whitespace-delimited tokens for a paragraph to survive.
const MIN_PARAGRAPH_WORDS: usize = 5;

/// Ordered noise rules applied case-insensitively in a single pass each.
static NOISE_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        // Share widgets, relative timestamps, and caption lines.
        (
            Regex::new(r"(?i)Share Save|\d+ (?:hours|minutes) ago|Image source.*").unwrap(),
            "",
        ),
        // Bare URLs.
        (Regex::new(r"(?i)http\S+|www\.\S+").unwrap(), ""),
        // Bracketed and parenthetical asides.
        (Regex::new(r"\[[^\]]*\]|\([^)]*\)").unwrap(), ""),
        // Quote characters and dash variants.
        (Regex::new(r#"["“”]|--|—|–"#).unwrap(), ""),
        // Markdown emphasis markers.
        (Regex::new(r"\*{1,2}").unwrap(), ""),
    ]
});

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*#+\s*(.+)$").unwrap());
static LEADING_STRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[A-Za-z]\s+").unwrap());
static TRAILING_STRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+[A-Za-z]\s*$").unwrap());
static EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*{1,2}").unwrap());

/// Count whitespace-delimited words; the unit of every quality gate.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Remove a single isolated alphabetic token at either end of the text.
///
/// Upstream truncation tends to leave a lone letter dangling at a boundary.
pub fn strip_stray_letters(text: &str) -> String {
    let text = LEADING_STRAY.replace(text, "");
    let text = TRAILING_STRAY.replace(&text, "");
    text.trim().to_string()
}

/// Drop markdown emphasis markers (`*`, `**`).
pub fn strip_emphasis(text: &str) -> String {
    EMPHASIS.replace_all(text, "").to_string()
}

/// Convert `#`-prefixed lines into `<h2>` heading lines.
pub fn wrap_headings(text: &str) -> String {
    HEADING.replace_all(text, "<h2>${1}</h2>").to_string()
}

/// Normalize raw article text.
///
/// Steps, in order:
/// 1. remove the exact-match ad denylist
/// 2. drop paragraphs with fewer than five words
/// 3. apply the noise rules (timestamps, URLs, brackets, quotes, emphasis)
/// 4. wrap `#` headings in `<h2>` markup
/// 5. trim lines, dropping blanks and `title:` prefixes
/// 6. strip one stray letter from each end of the result
pub fn normalize(text: &str) -> String {
    let mut text = text.to_string();
    for ad in AD_LINES {
        text = text.replace(ad, "");
    }

    let text = text
        .split('\n')
        .filter(|p| word_count(p) >= MIN_PARAGRAPH_WORDS)
        .collect::<Vec<_>>()
        .join("\n");

    let mut text = text;
    for (rule, replacement) in NOISE_RULES.iter() {
        text = rule.replace_all(&text, *replacement).to_string();
    }

    let text = wrap_headings(&text);

    let text = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.to_lowercase().starts_with("title:"))
        .collect::<Vec<_>>()
        .join("\n");

    strip_stray_letters(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ad_lines_removed_verbatim() {
        let text = "📲 Descargar APK\nEl equipo ganó el partido con un gol tardío";
        let out = normalize(text);
        assert!(!out.contains("Descargar"));
        assert!(out.contains("gol tardío"));
    }

    #[test]
    fn test_short_paragraphs_dropped() {
        let text = "Muy corto aquí\nEste párrafo tiene más de cinco palabras completas";
        assert_eq!(
            normalize(text),
            "Este párrafo tiene más de cinco palabras completas"
        );
    }

    #[test]
    fn test_urls_and_brackets_stripped() {
        let text = "El delantero marcó dos goles https://example.com/x [foto] durante el encuentro";
        let out = normalize(text);
        assert!(!out.contains("http"));
        assert!(!out.contains('['));
        assert!(out.contains("marcó dos goles"));
    }

    #[test]
    fn test_relative_time_and_share_markers_stripped() {
        let text = "El club confirmó el fichaje 3 hours ago Share Save tras la rueda de prensa";
        let out = normalize(text);
        assert!(!out.contains("hours ago"));
        assert!(!out.contains("Share Save"));
    }

    #[test]
    fn test_headings_wrapped() {
        let text = "## Resumen completo del partido de anoche";
        assert_eq!(normalize(text), "<h2>Resumen completo del partido de anoche</h2>");
    }

    #[test]
    fn test_title_lines_dropped() {
        let text = "Title: esto no debería aparecer en el cuerpo\nEl equipo celebró la victoria frente a su afición";
        let out = normalize(text);
        assert!(!out.to_lowercase().contains("title:"));
        assert!(out.contains("celebró la victoria"));
    }

    #[test]
    fn test_stray_letters_stripped_at_both_ends() {
        assert_eq!(
            strip_stray_letters("s El equipo ganó el torneo b"),
            "El equipo ganó el torneo"
        );
    }

    #[test]
    fn test_quotes_and_dashes_stripped() {
        let text = "El técnico dijo “estamos listos” — y el vestuario respondió con confianza";
        let out = normalize(text);
        assert!(!out.contains('“'));
        assert!(!out.contains('—'));
    }

    #[test]
    fn test_normalize_is_idempotent_on_normalized_text() {
        let text = "El delantero marcó dos goles https://example.com/x durante el encuentro\n\
                    Este párrafo tiene más de cinco palabras completas\n\
                    📲 Descargar APK";
        let once = normalize(text);
        assert_eq!(normalize(&once), once);
    }
}
