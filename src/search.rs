use std::collections::HashMap;

use crate::ber;
use crate::result::DecodeError;

use lber::common::TagClass;
use lber::structure::StructureTag;
use lber::structures::{OctetString, Sequence, Set, Tag};
use lber::universal::Types;

/// Application tag of SearchResultEntry.
pub(crate) const SEARCH_RESULT_ENTRY: u64 = 4;

/// Parsed search result entry.
///
/// While LDAP attributes can have a variety of syntaxes, they're all returned in
/// search results as octet strings, without any associated type information. A
/// general-purpose result parser could leave all values in that format, but then
/// retrieving them from user code would be cumbersome and tedious.
///
/// For that reason, the parser tries to convert every value into a `String`. If an
/// attribute can contain unconstrained binary strings, the conversion may fail. In that case,
/// the attribute and all its values will be in the `bin_attrs` hashmap. Since it's
/// possible that a particular set of values for a binary attribute _could_ be
/// converted into UTF-8 `String`s, the presence of such an attribute in the result
/// entry should be checked for both in `attrs` and `bin_attrs`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchEntry {
    /// Entry DN.
    pub dn: String,
    /// Attributes.
    pub attrs: HashMap<String, Vec<String>>,
    /// Binary-valued attributes.
    pub bin_attrs: HashMap<String, Vec<Vec<u8>>>,
}

impl SearchEntry {
    /// Parse a `SearchResultEntry` and convert it into attribute map(s).
    pub fn construct(tag: StructureTag) -> Result<SearchEntry, DecodeError> {
        if !tag.is(TagClass::Application, SEARCH_RESULT_ENTRY) {
            return Err(DecodeError::Expected("search result entry"));
        }
        let mut tags = ber::components(tag, "search result entry")?;
        let dn = ber::string_elem(ber::next(&mut tags, "entry dn")?, "entry dn")?;
        let attrs = ber::sequence(ber::next(&mut tags, "attributes")?, "attributes")?;
        ber::end(tags, "search result entry")?;
        let mut attr_vals = HashMap::new();
        let mut bin_attr_vals = HashMap::new();
        for a_v in attrs {
            let mut part_attr = ber::sequence(a_v, "partial attribute")?;
            let a_type = ber::string_elem(ber::next(&mut part_attr, "attribute type")?, "attribute type")?;
            let values = ber::components(
                ber::universal(ber::next(&mut part_attr, "values")?, Types::Set, "values")?,
                "values",
            )?
            .map(|t| ber::octets_elem(t, "attribute value"))
            .collect::<Result<Vec<_>, _>>()?;
            ber::end(part_attr, "partial attribute")?;
            if values.iter().all(|v| std::str::from_utf8(v).is_ok()) {
                let values = values
                    .into_iter()
                    .filter_map(|v| String::from_utf8(v).ok())
                    .collect();
                attr_vals.insert(a_type, values);
            } else {
                bin_attr_vals.insert(a_type, values);
            }
        }
        Ok(SearchEntry {
            dn,
            attrs: attr_vals,
            bin_attrs: bin_attr_vals,
        })
    }

    /// Encode the entry as a `SearchResultEntry`.
    ///
    /// Attributes are written in name order, text-valued ones first.
    pub fn into_tag(self) -> Tag {
        let mut text: Vec<_> = self.attrs.into_iter().collect();
        text.sort();
        let mut binary: Vec<_> = self.bin_attrs.into_iter().collect();
        binary.sort();
        let partial = text
            .into_iter()
            .map(|(attr, vals)| (attr, vals.into_iter().map(String::into_bytes).collect::<Vec<_>>()))
            .chain(binary)
            .map(|(attr, vals): (String, Vec<Vec<u8>>)| {
                Tag::Sequence(Sequence {
                    inner: vec![
                        Tag::OctetString(OctetString::new(attr)),
                        Tag::Set(Set {
                            inner: vals
                                .into_iter()
                                .map(|v| Tag::OctetString(OctetString::new(v)))
                                .collect(),
                            ..Default::default()
                        }),
                    ],
                    ..Default::default()
                })
            })
            .collect();
        Tag::Sequence(Sequence {
            id: SEARCH_RESULT_ENTRY,
            class: TagClass::Application,
            inner: vec![
                Tag::OctetString(OctetString::new(self.dn)),
                Tag::Sequence(Sequence {
                    inner: partial,
                    ..Default::default()
                }),
            ],
        })
    }
}

/// Parse the referrals from the supplied BER-encoded sequence.
pub fn parse_refs(t: StructureTag) -> Result<Vec<String>, DecodeError> {
    ber::components(t, "referrals")?
        .map(|t| ber::string_elem(t, "referral"))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use lber::structures::ASNTag;
    use lber::write;

    fn entry() -> SearchEntry {
        SearchEntry {
            dn: "cn=x,dc=example".into(),
            attrs: HashMap::from([
                ("cn".to_owned(), vec!["x".to_owned()]),
                ("objectClass".to_owned(), vec!["top".to_owned(), "person".to_owned()]),
            ]),
            bin_attrs: HashMap::from([("jpegPhoto".to_owned(), vec![vec![0xFF, 0xD8]])]),
        }
    }

    #[test]
    fn entry_round_trip() {
        let entry = entry();
        let tag = entry.clone().into_tag().into_structure();
        assert_eq!(SearchEntry::construct(tag).unwrap(), entry);
    }

    #[test]
    fn entry_bytes() {
        let entry = SearchEntry {
            dn: "o=a".into(),
            attrs: HashMap::from([("o".to_owned(), vec!["a".to_owned()])]),
            ..Default::default()
        };
        assert_eq!(
            write::encode(entry.into_tag().into_structure()),
            vec![
                0x64, 0x11, 0x04, 0x03, b'o', b'=', b'a', 0x30, 0x0A, 0x30, 0x08, 0x04, 0x01,
                b'o', 0x31, 0x03, 0x04, 0x01, b'a'
            ]
        );
    }

    #[test]
    fn wrong_tag() {
        let mut tag = entry().into_tag().into_structure();
        tag.id = 5;
        assert_eq!(
            SearchEntry::construct(tag),
            Err(DecodeError::Expected("search result entry"))
        );
    }

    #[test]
    fn values_not_a_set() {
        let tag = lber::parse::parse_tag(&[
            0x64, 0x0E, 0x04, 0x00, 0x30, 0x0A, 0x30, 0x08, 0x04, 0x01, b'o', 0x30, 0x03, 0x04,
            0x01, b'a',
        ])
        .unwrap()
        .1;
        assert_eq!(SearchEntry::construct(tag), Err(DecodeError::Expected("values")));
    }

    #[test]
    fn referrals() {
        let tag = lber::parse::parse_tag(b"\xa3\x0b\x04\x09ldap://h/").unwrap().1;
        assert_eq!(parse_refs(tag).unwrap(), vec!["ldap://h/".to_owned()]);
        let tag = lber::parse::parse_tag(b"\xa3\x03\x02\x01\x01").unwrap().1;
        assert!(parse_refs(tag).is_err());
    }
}
