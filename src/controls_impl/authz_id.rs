use super::{ControlParser, RawControl};
use crate::result::DecodeError;

pub const AUTHZID_REQUEST_OID: &str = "2.16.840.1.113730.3.4.16";
pub const AUTHZID_RESPONSE_OID: &str = "2.16.840.1.113730.3.4.15";

flag_control!(
    /// Authorization Identity request control
    /// ([RFC 3829](https://tools.ietf.org/html/rfc3829)).
    ///
    /// Sent with a bind request to get the resulting identity back.
    AuthzIdRequest,
    AUTHZID_REQUEST_OID
);

/// Authorization Identity response control.
///
/// The identity is empty for anonymous binds. Unlike most controls, the value
/// isn't BER-encoded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthzIdResp {
    pub authzid: String,
}

impl From<AuthzIdResp> for RawControl {
    fn from(resp: AuthzIdResp) -> RawControl {
        RawControl {
            ctype: AUTHZID_RESPONSE_OID.to_owned(),
            crit: false,
            val: Some(resp.authzid.into_bytes()),
        }
    }
}

impl ControlParser for AuthzIdResp {
    fn parse(val: &[u8]) -> Result<AuthzIdResp, DecodeError> {
        let authzid = String::from_utf8(val.to_vec()).map_err(|_| DecodeError::Utf8("authzid"))?;
        Ok(AuthzIdResp { authzid })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identity_round_trip() {
        let rc = RawControl::from(AuthzIdResp {
            authzid: "dn:uid=jd,ou=people".into(),
        });
        assert_eq!(rc.val.as_deref(), Some(&b"dn:uid=jd,ou=people"[..]));
        assert_eq!(rc.parse::<AuthzIdResp>().unwrap().authzid, "dn:uid=jd,ou=people");
    }

    #[test]
    fn anonymous_identity() {
        assert_eq!(AuthzIdResp::parse(b"").unwrap(), AuthzIdResp::default());
        assert_eq!(AuthzIdResp::parse(&[0xC3]), Err(DecodeError::Utf8("authzid")));
        let rc = RawControl::from(AuthzIdRequest);
        assert_eq!(rc.val, None);
    }
}
