/// Sanitizes an uploaded file name for use in a blob object key:
/// trims surrounding whitespace, decomposes the name into Unicode
/// Normalization Form D, and collapses each inner whitespace run into
/// a single `-`.
///
/// ```
/// use kajian_backend::normalization::sanitize_file_name;
/// assert_eq!(sanitize_file_name(" kajian  pagi.mp3 "), "kajian-pagi.mp3");
/// ```
pub fn sanitize_file_name(name: impl AsRef<str>) -> String {
    use unicode_normalization::UnicodeNormalization;

    let normalized: String = name.as_ref().trim().nfd().collect();

    let mut sanitized = String::with_capacity(normalized.len());
    let mut in_whitespace = false;

    for c in normalized.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                sanitized.push('-');
            }
            in_whitespace = true;
        } else {
            sanitized.push(c);
            in_whitespace = false;
        }
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use unicode_normalization::is_nfd;

    use super::sanitize_file_name;

    #[test]
    fn whitespace_runs_collapse_to_single_dashes() {
        assert_eq!(sanitize_file_name("a b   c.mp3"), "a-b-c.mp3");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 10000, ..ProptestConfig::default()
        })]

        #[test]
        fn sanitization_works(name in "(\\S.*\\S|\\S+)", space_before in "\\s*", space_after in "\\s*") {
            let sanitized = sanitize_file_name(format!("{}{}{}", space_before, name, space_after));

            prop_assert!(is_nfd(&sanitized), "{:?} (sanitized form of {:?}) is in NFD", sanitized, name);

            prop_assert!(!sanitized.contains(char::is_whitespace), "{:?} (sanitized form of {:?}) contains no whitespace", sanitized, name);

            prop_assert!(!sanitized.starts_with('-') || name.starts_with('-'), "{:?} (sanitized form of {:?}) does not grow a leading dash", sanitized, name);
        }
    }
}
