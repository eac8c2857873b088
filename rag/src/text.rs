//! Text helpers shared by the classifier, normalizer and store matcher.
//!
//! Every fuzzy comparison in the crate goes through [`normalize_key`], so
//! "Häagen-Dazs", "haagen dazs" and "HaagenDazs" all compare equal.

/// Replace common Latin diacritics with their ASCII base letter.
pub fn fold_diacritics(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'È' | 'É' | 'Ê' | 'Ë' => 'E',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
            'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            'ñ' => 'n',
            'Ñ' => 'N',
            other => other,
        })
        .collect()
}

/// Lowercase and fold diacritics, keeping spacing and punctuation.
pub fn fold_lower(text: &str) -> String {
    fold_diacritics(&text.to_lowercase())
}

/// Normalized comparison key: folded, lowercased, ASCII alphanumerics only.
pub fn normalize_key(text: &str) -> String {
    fold_lower(text)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Lowercased word tokens (split on anything that is not alphanumeric).
pub fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Capitalize the first letter of every word, where a word starts after any
/// non-alphabetic character ("haagen-dazs" -> "Haagen-Dazs").
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Text up to the first blank line, or the whole text if there is none.
pub fn first_paragraph(text: &str) -> &str {
    let normalized_end = text
        .find("\n\n")
        .into_iter()
        .chain(text.find("\r\n\r\n"))
        .min();
    match normalized_end {
        Some(end) => text[..end].trim(),
        None => text.trim(),
    }
}

/// Whether `name` is safe to splice into a URL path or query identifier:
/// non-empty, ASCII alphanumerics plus `-`, `_` and `.`.
pub fn is_resource_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Approximate token count: one token per four characters.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}
