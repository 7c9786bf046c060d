use super::{ControlParser, MakeCritical, RawControl};
use crate::ber;
use crate::filter::Filter;
use crate::result::{DecodeError, Result};

pub const ASSERTION_OID: &str = "1.3.6.1.1.12";

/// Assertion control ([RFC 4528](https://tools.ietf.org/html/rfc4528)).
///
/// The operation is performed only if the target entry matches the filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assertion {
    pub filter: Filter,
}

impl Assertion {
    /// Create a new control instance from the string form of the filter.
    pub fn new(filter: &str) -> Result<Assertion> {
        Ok(Assertion {
            filter: filter.parse()?,
        })
    }
}

impl MakeCritical for Assertion {}

impl From<Assertion> for RawControl {
    fn from(assn: Assertion) -> RawControl {
        RawControl {
            ctype: ASSERTION_OID.to_owned(),
            crit: false,
            val: Some(ber::encode_value(assn.filter.into_tag())),
        }
    }
}

impl ControlParser for Assertion {
    fn parse(val: &[u8]) -> std::result::Result<Assertion, DecodeError> {
        let filter = Filter::from_tag(ber::parse_value(val, "assertion filter")?)?;
        Ok(Assertion { filter })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn filter_value() {
        let rc: RawControl = Assertion::new("(a=v)").unwrap().critical().into();
        assert!(rc.crit);
        assert_eq!(rc.val.as_deref(), Some(&b"\xa3\x06\x04\x01a\x04\x01v"[..]));
        assert_eq!(
            rc.parse::<Assertion>().unwrap().filter,
            Filter::Equality("a".into(), b"v".to_vec())
        );
    }

    #[test]
    fn bad_filter() {
        assert!(Assertion::new("(a=v").is_err());
        assert_eq!(
            Assertion::parse(b"\x04\x01v"),
            Err(DecodeError::Expected("filter"))
        );
        assert_eq!(
            Assertion::parse(b"\xa3\x06\x04\x01a\x04\x01v\x00"),
            Err(DecodeError::TrailingData("assertion filter"))
        );
    }
}
