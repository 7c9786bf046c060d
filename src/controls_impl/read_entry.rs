use super::{ControlParser, MakeCritical, RawControl};
use crate::ber;
use crate::result::DecodeError;
use crate::search::SearchEntry;

use lber::structures::{OctetString, Sequence, Tag};

pub const PRE_READ_OID: &str = "1.3.6.1.1.13.1";
pub const POST_READ_OID: &str = "1.3.6.1.1.13.2";

fn attr_selection(attrs: Vec<String>) -> Vec<u8> {
    ber::encode_value(Tag::Sequence(Sequence {
        inner: attrs
            .into_iter()
            .map(|a| Tag::OctetString(OctetString::new(a)))
            .collect(),
        ..Default::default()
    }))
}

fn parse_selection(val: &[u8]) -> Result<Vec<String>, DecodeError> {
    ber::sequence(ber::parse_value(val, "attribute selection")?, "attribute selection")?
        .map(|t| ber::string_elem(t, "attribute"))
        .collect()
}

fn parse_entry(val: &[u8]) -> Result<SearchEntry, DecodeError> {
    SearchEntry::construct(ber::parse_value(val, "read entry")?)
}

/// Pre-Read request control ([RFC 4527](https://tools.ietf.org/html/rfc4527)).
///
/// Requests the values of the listed attributes as they were before the
/// update. An empty list means all user attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreRead {
    pub attrs: Vec<String>,
}

impl PreRead {
    /// Create a new control instance with the specified list of attribute names/OIDs.
    pub fn new<S: AsRef<str>>(attrs: &[S]) -> PreRead {
        PreRead {
            attrs: attrs.iter().map(|a| a.as_ref().to_owned()).collect(),
        }
    }
}

impl MakeCritical for PreRead {}

impl From<PreRead> for RawControl {
    fn from(pr: PreRead) -> RawControl {
        RawControl {
            ctype: PRE_READ_OID.to_owned(),
            crit: false,
            val: Some(attr_selection(pr.attrs)),
        }
    }
}

impl ControlParser for PreRead {
    fn parse(val: &[u8]) -> Result<PreRead, DecodeError> {
        Ok(PreRead {
            attrs: parse_selection(val)?,
        })
    }
}

/// Post-Read request control ([RFC 4527](https://tools.ietf.org/html/rfc4527)).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostRead {
    pub attrs: Vec<String>,
}

impl PostRead {
    /// Create a new control instance with the specified list of attribute names/OIDs.
    pub fn new<S: AsRef<str>>(attrs: &[S]) -> PostRead {
        PostRead {
            attrs: attrs.iter().map(|a| a.as_ref().to_owned()).collect(),
        }
    }
}

impl MakeCritical for PostRead {}

impl From<PostRead> for RawControl {
    fn from(pr: PostRead) -> RawControl {
        RawControl {
            ctype: POST_READ_OID.to_owned(),
            crit: false,
            val: Some(attr_selection(pr.attrs)),
        }
    }
}

impl ControlParser for PostRead {
    fn parse(val: &[u8]) -> Result<PostRead, DecodeError> {
        Ok(PostRead {
            attrs: parse_selection(val)?,
        })
    }
}

/// Pre-Read response control, holding the entry as it was before the update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreReadResp(pub SearchEntry);

impl From<PreReadResp> for RawControl {
    fn from(resp: PreReadResp) -> RawControl {
        RawControl {
            ctype: PRE_READ_OID.to_owned(),
            crit: false,
            val: Some(ber::encode_value(resp.0.into_tag())),
        }
    }
}

impl ControlParser for PreReadResp {
    fn parse(val: &[u8]) -> Result<PreReadResp, DecodeError> {
        parse_entry(val).map(PreReadResp)
    }
}

/// Post-Read response control, holding the entry as it was after the update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostReadResp(pub SearchEntry);

impl From<PostReadResp> for RawControl {
    fn from(resp: PostReadResp) -> RawControl {
        RawControl {
            ctype: POST_READ_OID.to_owned(),
            crit: false,
            val: Some(ber::encode_value(resp.0.into_tag())),
        }
    }
}

impl ControlParser for PostReadResp {
    fn parse(val: &[u8]) -> Result<PostReadResp, DecodeError> {
        parse_entry(val).map(PostReadResp)
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn request_selection() {
        let rc = RawControl::from(PostRead::new(&["cn", "entryCSN"]));
        assert_eq!(rc.ctype, POST_READ_OID);
        let mut expected = vec![0x30, 0x0E, 0x04, 0x02, b'c', b'n', 0x04, 0x08];
        expected.extend(b"entryCSN");
        assert_eq!(rc.val, Some(expected));
        assert_eq!(rc.parse::<PostRead>().unwrap().attrs, vec!["cn", "entryCSN"]);
        let rc = RawControl::from(PreRead::default());
        assert_eq!(rc.val, Some(vec![0x30, 0x00]));
    }

    #[test]
    fn response_entry() {
        let entry = SearchEntry {
            dn: "uid=jd,ou=people".into(),
            attrs: HashMap::from([("uid".to_owned(), vec!["jd".to_owned()])]),
            bin_attrs: HashMap::new(),
        };
        let rc = RawControl::from(PreReadResp(entry.clone()));
        assert_eq!(rc.ctype, PRE_READ_OID);
        assert_eq!(rc.parse::<PreReadResp>().unwrap().0, entry);
    }

    #[test]
    fn response_not_an_entry() {
        assert_eq!(
            PostReadResp::parse(&[0x30, 0x00]),
            Err(DecodeError::Expected("search result entry"))
        );
        let rc = RawControl {
            ctype: POST_READ_OID.into(),
            crit: false,
            val: None,
        };
        assert!(rc.parse::<PostReadResp>().is_err());
    }
}
