use std::str::FromStr;

use super::{ControlParser, MakeCritical, RawControl};
use crate::ber;
use crate::filter::{Filter, parse_matched_values};
use crate::result::{DecodeError, LdapError};

use lber::structures::{ASNTag, Sequence, Tag};

pub const MATCHED_VALUES_OID: &str = "1.2.826.0.1.3344810.2.3";

/// Matched Values control ([RFC 3876](https://tools.ietf.org/html/rfc3876)).
///
/// Restricts the attribute values returned with search entries to those
/// matching at least one of the filters. Each filter must be a simple item:
/// no `&`, `|` or `!`, and no extensible match over DN attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchedValues {
    pub filters: Vec<Filter>,
}

impl MakeCritical for MatchedValues {}

impl From<MatchedValues> for RawControl {
    fn from(mv: MatchedValues) -> RawControl {
        RawControl {
            ctype: MATCHED_VALUES_OID.to_owned(),
            crit: false,
            val: Some(ber::encode_value(Tag::Sequence(Sequence {
                inner: mv.filters.into_iter().map(Filter::into_tag).collect(),
                ..Default::default()
            }))),
        }
    }
}

fn simple_item(filter: Filter) -> Result<Filter, DecodeError> {
    if filter.is_simple_item() {
        Ok(filter)
    } else {
        Err(DecodeError::Invalid {
            what: "matched values filter",
            detail: filter.to_string(),
        })
    }
}

impl ControlParser for MatchedValues {
    fn parse(val: &[u8]) -> Result<MatchedValues, DecodeError> {
        let filters = ber::sequence(ber::parse_value(val, "matched values")?, "matched values")?
            .map(|t| Filter::from_tag(t).and_then(simple_item))
            .collect::<Result<Vec<_>, _>>()?;
        if filters.is_empty() {
            return Err(DecodeError::Expected("matched values filter"));
        }
        Ok(MatchedValues { filters })
    }
}

/// Parse either a single simple filter, `(cn=a*)`, or a parenthesized list
/// of them, `((cn=a*)(mail=*@example.com))`.
impl FromStr for MatchedValues {
    type Err = LdapError;

    fn from_str(s: &str) -> Result<MatchedValues, LdapError> {
        let filters = match parse_matched_values(s) {
            Ok(list) => ber::components(list.into_structure(), "matched values")
                .and_then(|items| items.map(Filter::from_tag).collect::<Result<Vec<_>, _>>())
                .map_err(|_| LdapError::MatchedValuesFilter(s.to_owned()))?,
            Err(()) => vec![s.parse::<Filter>()?],
        };
        for filter in &filters {
            if !filter.is_simple_item() {
                return Err(LdapError::MatchedValuesFilter(filter.to_string()));
            }
        }
        Ok(MatchedValues { filters })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn list_descriptor() {
        let mv: MatchedValues = "((cn=a*)(mail=*))".parse().unwrap();
        assert_eq!(mv.filters.len(), 2);
        let rc = RawControl::from(mv.clone());
        assert_eq!(rc.parse::<MatchedValues>().unwrap(), mv);
    }

    #[test]
    fn single_filter_descriptor() {
        let mv: MatchedValues = "(sn>=m)".parse().unwrap();
        assert_eq!(mv.filters, vec![Filter::GreaterOrEqual("sn".into(), b"m".to_vec())]);
    }

    #[test]
    fn rejects_complex_filters() {
        assert!(matches!(
            "(!(cn=x))".parse::<MatchedValues>(),
            Err(LdapError::MatchedValuesFilter(_))
        ));
        assert!("(cn:dn:=x)".parse::<MatchedValues>().is_err());
        assert!("(cn=x".parse::<MatchedValues>().is_err());
        // an AND filter on the wire
        let val = b"\x30\x0a\xa0\x08\xa3\x06\x04\x01a\x04\x01v";
        assert!(matches!(
            MatchedValues::parse(val),
            Err(DecodeError::Invalid { .. })
        ));
    }

    #[test]
    fn needs_one_filter() {
        assert_eq!(
            MatchedValues::parse(&[0x30, 0x00]),
            Err(DecodeError::Expected("matched values filter"))
        );
    }
}
