//! Contact records: parsing from raw text blocks and comparator ordering.

use deunicode::deunicode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sortkey::extract_last_name;

/// One mailing-label recipient.
///
/// `full_address` is the canonical serialization: splitting it on newline
/// and dropping blank lines yields exactly `[name, address_lines...]`. The
/// `id` exists only so the UI can track selection across reorders; it is
/// never persisted and plays no part in equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    #[serde(skip, default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub address_lines: Vec<String>,
    pub full_address: String,
    pub sort_key: String,
}

impl PartialEq for Contact {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.address_lines == other.address_lines
            && self.full_address == other.full_address
            && self.sort_key == other.sort_key
    }
}

impl Contact {
    /// Rebuild the derived fields after the name or address lines changed.
    /// `full_address` is always re-derived; `sort_key` only when
    /// `key_override` is blank.
    pub fn rederive(&mut self, key_override: &str) {
        let mut lines = Vec::with_capacity(1 + self.address_lines.len());
        lines.push(self.name.clone());
        lines.extend(self.address_lines.iter().cloned());
        self.full_address = lines.join("\n");

        let override_trimmed = key_override.trim();
        self.sort_key = if override_trimmed.is_empty() {
            extract_last_name(&self.name).to_uppercase()
        } else {
            override_trimmed.to_uppercase()
        };
    }
}

/// Parse one text block into a contact. Blank or empty blocks yield `None`;
/// callers treat that as "skip", never as an error.
pub fn parse_contact(block: &str) -> Option<Contact> {
    let lines: Vec<&str> = block
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let (&name, rest) = lines.split_first()?;

    Some(Contact {
        id: Uuid::new_v4(),
        name: name.to_string(),
        address_lines: rest.iter().map(|l| (*l).to_string()).collect(),
        full_address: lines.join("\n"),
        sort_key: extract_last_name(name).to_uppercase(),
    })
}

/// Parse a sequence of text blocks, skipping blank blocks. Output order
/// follows input order; callers re-sort with [`sort_contacts`].
pub fn parse_blocks<S: AsRef<str>>(blocks: &[S]) -> Vec<Contact> {
    blocks
        .iter()
        .map(AsRef::as_ref)
        .filter(|b| !b.trim().is_empty())
        .filter_map(parse_contact)
        .collect()
}

/// Collation fold for sort keys: transliterate to ASCII, then uppercase.
/// Keys are stored upper-cased already, so this mostly guards against
/// accented and user-overridden keys.
fn collation_key(sort_key: &str) -> String {
    deunicode(sort_key).to_uppercase()
}

/// Stable sort by sort key. Only the relative positions of records change;
/// ties keep their input order.
pub fn sort_contacts(contacts: &mut [Contact]) {
    contacts.sort_by_cached_key(|c| collation_key(&c.sort_key));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(name: &str, key: &str) -> Contact {
        let mut c = parse_contact(name).unwrap();
        c.sort_key = key.to_string();
        c
    }

    #[test]
    fn parse_empty_yields_none() {
        assert!(parse_contact("").is_none());
        assert!(parse_contact("   \n  \n").is_none());
    }

    #[test]
    fn parse_basic_block() {
        let c = parse_contact("Jane Doe\n123 Main St\nSpringfield IL 62701").unwrap();
        assert_eq!(c.name, "Jane Doe");
        assert_eq!(c.address_lines, vec!["123 Main St", "Springfield IL 62701"]);
        assert_eq!(c.full_address, "Jane Doe\n123 Main St\nSpringfield IL 62701");
        assert_eq!(c.sort_key, "DOE");
    }

    #[test]
    fn parse_trims_and_drops_blank_lines() {
        let c = parse_contact("  Jane Doe  \n\n   \n 123 Main St \n").unwrap();
        assert_eq!(c.name, "Jane Doe");
        assert_eq!(c.address_lines, vec!["123 Main St"]);
        assert_eq!(c.full_address, "Jane Doe\n123 Main St");
    }

    #[test]
    fn full_address_round_trips() {
        let c = parse_contact("Mr. Bob Smith\nPO Box 7\nAda OH 45810").unwrap();
        let again = parse_contact(&c.full_address).unwrap();
        assert_eq!(again.full_address, c.full_address);
        assert_eq!(again, c);
    }

    #[test]
    fn parse_blocks_skips_blanks() {
        let blocks = vec![
            "Jane Doe\n1 Elm St".to_string(),
            "   ".to_string(),
            String::new(),
            "Smith".to_string(),
        ];
        let contacts = parse_blocks(&blocks);
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].name, "Jane Doe");
        assert_eq!(contacts[1].name, "Smith");
    }

    #[test]
    fn sort_orders_by_key() {
        let mut contacts = vec![
            keyed("Zed Zebra", "ZEBRA"),
            keyed("Ann Apple", "APPLE"),
            keyed("Moe Mango", "MANGO"),
        ];
        sort_contacts(&mut contacts);
        let keys: Vec<&str> = contacts.iter().map(|c| c.sort_key.as_str()).collect();
        assert_eq!(keys, vec!["APPLE", "MANGO", "ZEBRA"]);
    }

    #[test]
    fn sort_is_stable_on_equal_keys() {
        let mut contacts = vec![
            keyed("Bob Smith\n1 First St", "SMITH"),
            keyed("Ann Apple", "APPLE"),
            keyed("Pat Smith\n2 Second St", "SMITH"),
        ];
        sort_contacts(&mut contacts);
        assert_eq!(contacts[0].sort_key, "APPLE");
        assert_eq!(contacts[1].address_lines[0], "1 First St");
        assert_eq!(contacts[2].address_lines[0], "2 Second St");
    }

    #[test]
    fn sort_folds_case_defensively() {
        // Keys are upper-cased at construction, but a hand-edited store
        // could smuggle in mixed case; both variants must group together.
        let mut contacts = vec![
            keyed("Z", "ZEBRA"),
            keyed("A1", "APPLE"),
            keyed("A2", "apple"),
        ];
        sort_contacts(&mut contacts);
        assert_eq!(contacts[0].name, "A1");
        assert_eq!(contacts[1].name, "A2");
        assert_eq!(contacts[2].sort_key, "ZEBRA");
    }

    #[test]
    fn sort_does_not_mutate_records() {
        let mut contacts = vec![
            keyed("Zed Zebra\n9 Last Rd", "ZEBRA"),
            keyed("Ann Apple\n1 First St", "APPLE"),
        ];
        let originals = contacts.clone();
        sort_contacts(&mut contacts);
        for original in &originals {
            assert!(contacts.iter().any(|c| c == original));
        }
    }

    #[test]
    fn sort_folds_accents() {
        let mut contacts = vec![keyed("A", "ZÜRCHER"), keyed("B", "ZURICH")];
        sort_contacts(&mut contacts);
        assert_eq!(contacts[0].sort_key, "ZÜRCHER");
    }

    #[test]
    fn rederive_rebuilds_full_address() {
        let mut c = parse_contact("Jane Doe\n1 Elm St").unwrap();
        c.name = "Jane Roe".to_string();
        c.address_lines = vec!["2 Oak Ave".to_string()];
        c.rederive("");
        assert_eq!(c.full_address, "Jane Roe\n2 Oak Ave");
        assert_eq!(c.sort_key, "ROE");
    }

    #[test]
    fn rederive_honors_override() {
        let mut c = parse_contact("The Smiths\n1 Elm St").unwrap();
        c.rederive("wesson");
        assert_eq!(c.sort_key, "WESSON");
        // Blank override re-derives from the name.
        c.rederive("  ");
        assert_eq!(c.sort_key, "SMITHS");
    }

    #[test]
    fn id_survives_clone_not_equality() {
        let a = parse_contact("Jane Doe").unwrap();
        let b = parse_contact("Jane Doe").unwrap();
        assert_eq!(a, b);
        assert_ne!(a.id, b.id);
    }
}
