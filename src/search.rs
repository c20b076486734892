//! Search normalization for the contact filter.

use deunicode::deunicode;

use crate::contact::Contact;

/// Normalize a string for matching: transliterate (e.g. "Müller" ->
/// "Muller"), lowercase, collapse whitespace.
pub fn normalize(s: &str) -> String {
    deunicode(s)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a query, returning `None` for blank input (no filter).
pub fn normalize_query(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(normalize(trimmed))
    }
}

/// Substring match over the normalized full address.
pub fn matches(contact: &Contact, normalized_query: &str) -> bool {
    normalize(&contact.full_address).contains(normalized_query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::parse_contact;

    #[test]
    fn blank_query_is_no_filter() {
        assert_eq!(normalize_query("   "), None);
        assert_eq!(normalize_query(""), None);
    }

    #[test]
    fn match_is_case_insensitive() {
        let c = parse_contact("Jane Doe\n123 Main St").unwrap();
        assert!(matches(&c, &normalize_query("MAIN").unwrap()));
        assert!(matches(&c, &normalize_query("jane d").unwrap()));
        assert!(!matches(&c, &normalize_query("elm").unwrap()));
    }

    #[test]
    fn match_folds_accents() {
        let c = parse_contact("José García\nCalle 5").unwrap();
        assert!(matches(&c, &normalize_query("garcia").unwrap()));
    }
}
