//! Name normalization used to bucket candidate duplicates.

/// Fold a lower-case character with a known diacritic to its base Latin
/// letter. Other characters pass through unchanged.
fn fold_diacritic(c: char) -> char {
    match c {
        'ą' | 'á' | 'à' | 'â' | 'ä' => 'a',
        'ć' | 'č' | 'ç' => 'c',
        'ę' | 'é' | 'è' | 'ê' | 'ë' | 'ě' => 'e',
        'í' | 'î' | 'ï' => 'i',
        'ł' => 'l',
        'ń' | 'ň' => 'n',
        'ó' | 'ô' | 'ö' => 'o',
        'ś' | 'š' => 's',
        'ú' | 'ü' | 'ů' => 'u',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}

/// Bucket key for a facility name.
///
/// Lower-cases, folds diacritics, drops everything that is not an ASCII
/// letter, digit, or whitespace, then collapses runs of whitespace into a
/// single space and trims.
#[must_use]
pub fn normalize_key(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_diacritic)
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
