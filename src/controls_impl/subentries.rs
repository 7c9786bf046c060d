use super::{ControlParser, MakeCritical, RawControl};
use crate::ber;
use crate::result::DecodeError;

use lber::structures::{Boolean, Tag};

pub const SUBENTRIES_OID: &str = "1.3.6.1.4.1.4203.1.10.1";
pub const LDUP_SUBENTRIES_OID: &str = "1.3.6.1.4.1.7628.5.101.1";

/// Subentries control ([RFC 3672](https://tools.ietf.org/html/rfc3672)).
///
/// With `visibility` set, a search returns only subentries; without it,
/// only ordinary entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subentries {
    pub visibility: bool,
}

flag_control!(
    /// Subentries control of
    /// [draft-ietf-ldup-subentry](https://tools.ietf.org/html/draft-ietf-ldup-subentry-08).
    ///
    /// Obsoleted by [`Subentries`](struct.Subentries.html). It has no value, and
    /// its presence makes a search return only subentries.
    LdupSubentries,
    LDUP_SUBENTRIES_OID
);

impl Default for Subentries {
    fn default() -> Self {
        Subentries { visibility: true }
    }
}

impl MakeCritical for Subentries {}

impl From<Subentries> for RawControl {
    fn from(se: Subentries) -> RawControl {
        RawControl {
            ctype: SUBENTRIES_OID.to_owned(),
            crit: false,
            val: Some(ber::encode_value(Tag::Boolean(Boolean {
                inner: se.visibility,
                ..Default::default()
            }))),
        }
    }
}

impl ControlParser for Subentries {
    fn parse(val: &[u8]) -> Result<Subentries, DecodeError> {
        let visibility = ber::boolean_elem(ber::parse_value(val, "visibility")?, "visibility")?;
        Ok(Subentries { visibility })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn visibility() {
        let rc: RawControl = Subentries::default().critical().into();
        assert!(rc.crit);
        assert_eq!(rc.ctype, "1.3.6.1.4.1.4203.1.10.1");
        assert_eq!(rc.val, Some(vec![0x01, 0x01, 0xFF]));
        assert!(rc.parse::<Subentries>().unwrap().visibility);
        assert!(!Subentries::parse(&[0x01, 0x01, 0x00]).unwrap().visibility);
    }

    #[test]
    fn not_a_boolean() {
        assert_eq!(
            Subentries::parse(&[0x02, 0x01, 0x01]),
            Err(DecodeError::Expected("visibility"))
        );
        assert!(Subentries::parse(&[0x01, 0x02, 0x00, 0x00]).is_err());
    }

    #[test]
    fn legacy_subentries() {
        let rc = RawControl::from(LdupSubentries);
        assert_eq!(rc.ctype, "1.3.6.1.4.1.7628.5.101.1");
        assert_eq!(rc.val, None);
        assert_eq!(rc.parse::<LdupSubentries>().unwrap(), LdupSubentries);
        assert!(LdupSubentries::parse(&[0x01, 0x01, 0xFF]).is_err());
    }
}
