use std::str::FromStr;

use super::{ControlParser, MakeCritical, RawControl};
use crate::ber;
use crate::result::{DecodeError, LdapError};

use lber::common::TagClass;
use lber::structures::{Boolean, Enumerated, OctetString, Sequence, Tag};

pub const SORT_REQUEST_OID: &str = "1.2.840.113556.1.4.473";
pub const SORT_RESPONSE_OID: &str = "1.2.840.113556.1.4.474";

/// Single key of a server side sort request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub attr: String,
    pub ordering_rule: Option<String>,
    pub reverse: bool,
}

impl SortKey {
    fn into_tag(self) -> Tag {
        let mut inner = vec![Tag::OctetString(OctetString::new(self.attr))];
        if let Some(rule) = self.ordering_rule {
            inner.push(Tag::OctetString(OctetString::context(0, rule)));
        }
        if self.reverse {
            inner.push(Tag::Boolean(Boolean {
                id: 1,
                class: TagClass::Context,
                inner: true,
            }));
        }
        Tag::Sequence(Sequence {
            inner,
            ..Default::default()
        })
    }

    fn from_tag(tag: lber::structure::StructureTag) -> Result<SortKey, DecodeError> {
        let mut components = ber::sequence(tag, "sort key")?;
        let attr = ber::string_elem(ber::next(&mut components, "attribute type")?, "attribute type")?;
        let mut next = components.next();
        let mut ordering_rule = None;
        if let Some(t) = next.take_if(|t| t.is(TagClass::Context, 0)) {
            ordering_rule = Some(ber::string(t, "ordering rule")?);
            next = components.next();
        }
        let reverse = match next {
            Some(t) => ber::boolean(ber::context(t, 1, "reverse order")?, "reverse order")?,
            None => false,
        };
        ber::end(components, "sort key")?;
        Ok(SortKey {
            attr,
            ordering_rule,
            reverse,
        })
    }
}

/// Parse a single key of the form `[+|-]attr[:orderingRule]`. A leading
/// minus sign requests reverse order.
impl FromStr for SortKey {
    type Err = LdapError;

    fn from_str(s: &str) -> Result<SortKey, LdapError> {
        let s = s.trim();
        let (reverse, key) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let (attr, ordering_rule) = match key.split_once(':') {
            Some((attr, rule)) => (attr, Some(rule)),
            None => (key, None),
        };
        if attr.is_empty() || ordering_rule.is_some_and(str::is_empty) {
            return Err(LdapError::InvalidDescriptor(format!("sort key: {s}")));
        }
        Ok(SortKey {
            attr: attr.to_owned(),
            ordering_rule: ordering_rule.map(str::to_owned),
            reverse,
        })
    }
}

/// Server Side Sort request control ([RFC 2891](https://tools.ietf.org/html/rfc2891)).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerSideSort {
    keys: Vec<SortKey>,
}

impl ServerSideSort {
    /// Create a request from sort keys, in order of precedence. The list
    /// must not be empty.
    pub fn new(keys: Vec<SortKey>) -> Result<ServerSideSort, LdapError> {
        if keys.is_empty() {
            return Err(LdapError::InvalidControl("sort request without keys".into()));
        }
        Ok(ServerSideSort { keys })
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }
}

impl MakeCritical for ServerSideSort {}

impl From<ServerSideSort> for RawControl {
    fn from(sss: ServerSideSort) -> RawControl {
        RawControl {
            ctype: SORT_REQUEST_OID.to_owned(),
            crit: false,
            val: Some(ber::encode_value(Tag::Sequence(Sequence {
                inner: sss.keys.into_iter().map(SortKey::into_tag).collect(),
                ..Default::default()
            }))),
        }
    }
}

impl ControlParser for ServerSideSort {
    fn parse(val: &[u8]) -> Result<ServerSideSort, DecodeError> {
        let keys = ber::sequence(ber::parse_value(val, "sort key list")?, "sort key list")?
            .map(SortKey::from_tag)
            .collect::<Result<Vec<_>, _>>()?;
        if keys.is_empty() {
            return Err(DecodeError::Expected("sort key"));
        }
        Ok(ServerSideSort { keys })
    }
}

/// Parse a comma-separated list of sort keys.
impl FromStr for ServerSideSort {
    type Err = LdapError;

    fn from_str(s: &str) -> Result<ServerSideSort, LdapError> {
        let keys = s
            .split(',')
            .map(SortKey::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        ServerSideSort::new(keys)
    }
}

/// Server Side Sort response control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerSideSortResp {
    /// Result code of the sort, drawn from the LDAP result codes.
    pub result: u32,
    /// Attribute which caused the sort to fail, if any.
    pub attr: Option<String>,
}

impl From<ServerSideSortResp> for RawControl {
    fn from(resp: ServerSideSortResp) -> RawControl {
        let mut inner = vec![Tag::Enumerated(Enumerated {
            inner: resp.result as i64,
            ..Default::default()
        })];
        if let Some(attr) = resp.attr {
            inner.push(Tag::OctetString(OctetString::context(0, attr)));
        }
        RawControl {
            ctype: SORT_RESPONSE_OID.to_owned(),
            crit: false,
            val: Some(ber::encode_value(Tag::Sequence(Sequence {
                inner,
                ..Default::default()
            }))),
        }
    }
}

impl ControlParser for ServerSideSortResp {
    fn parse(val: &[u8]) -> Result<ServerSideSortResp, DecodeError> {
        let mut components = ber::sequence(ber::parse_value(val, "sort result")?, "sort result")?;
        let result = ber::enumerated_elem(ber::next(&mut components, "sort result")?, "sort result")?;
        let result = u32::try_from(result).map_err(|_| DecodeError::Invalid {
            what: "sort result",
            detail: result.to_string(),
        })?;
        let attr = components
            .next()
            .map(|t| ber::string(ber::context(t, 0, "attribute type")?, "attribute type"))
            .transpose()?;
        ber::end(components, "sort result")?;
        Ok(ServerSideSortResp { result, attr })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_key_bytes() {
        let sss = ServerSideSort::new(vec![SortKey {
            attr: "cn".into(),
            ordering_rule: None,
            reverse: true,
        }])
        .unwrap();
        let rc = RawControl::from(sss);
        assert_eq!(
            rc.val,
            Some(vec![0x30, 0x09, 0x30, 0x07, 0x04, 0x02, b'c', b'n', 0x81, 0x01, 0xFF])
        );
    }

    #[test]
    fn key_list_round_trip() {
        let sss: ServerSideSort = "sn,-givenName:2.5.13.3, +uid".parse().unwrap();
        assert_eq!(
            sss.keys(),
            vec![
                SortKey {
                    attr: "sn".into(),
                    ordering_rule: None,
                    reverse: false
                },
                SortKey {
                    attr: "givenName".into(),
                    ordering_rule: Some("2.5.13.3".into()),
                    reverse: true
                },
                SortKey {
                    attr: "uid".into(),
                    ordering_rule: None,
                    reverse: false
                },
            ]
        );
        let rc = RawControl::from(sss.clone()).with_crit(true);
        assert!(rc.crit);
        assert_eq!(rc.parse::<ServerSideSort>().unwrap(), sss);
    }

    #[test]
    fn bad_descriptors() {
        assert!("".parse::<ServerSideSort>().is_err());
        assert!("cn,".parse::<ServerSideSort>().is_err());
        assert!("-".parse::<ServerSideSort>().is_err());
        assert!("cn:".parse::<ServerSideSort>().is_err());
    }

    #[test]
    fn request_needs_keys() {
        let err = ServerSideSort::new(vec![]).unwrap_err();
        assert!(matches!(err, LdapError::InvalidControl(_)));
        assert_eq!(err.result_code(), crate::result::PARAM_ERROR);
    }

    #[test]
    fn empty_key_list() {
        assert_eq!(
            ServerSideSort::parse(&[0x30, 0x00]),
            Err(DecodeError::Expected("sort key"))
        );
    }

    #[test]
    fn explicit_false_reverse() {
        let val = [0x30, 0x09, 0x30, 0x07, 0x04, 0x02, b'c', b'n', 0x81, 0x01, 0x00];
        let sss = ServerSideSort::parse(&val).unwrap();
        assert!(!sss.keys()[0].reverse);
    }

    #[test]
    fn response() {
        let resp = ServerSideSortResp {
            result: 16,
            attr: Some("mail".into()),
        };
        let rc = RawControl::from(resp.clone());
        assert_eq!(rc.parse::<ServerSideSortResp>().unwrap(), resp);
        let ok = ServerSideSortResp::parse(&[0x30, 0x03, 0x0A, 0x01, 0x00]).unwrap();
        assert_eq!(ok, ServerSideSortResp { result: 0, attr: None });
        // attribute type with a universal tag
        let val = [0x30, 0x06, 0x0A, 0x01, 0x10, 0x04, 0x01, b'x'];
        assert_eq!(
            ServerSideSortResp::parse(&val),
            Err(DecodeError::Expected("attribute type"))
        );
    }
}
