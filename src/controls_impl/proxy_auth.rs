use super::{ControlParser, RawControl};
use crate::ber;
use crate::result::DecodeError;

use lber::structures::{OctetString, Sequence, Tag};
use lber::universal::Types;

pub const PROXY_AUTH_OID: &str = "2.16.840.1.113730.3.4.18";
pub const PROXY_AUTH_V1_OID: &str = "2.16.840.1.113730.3.4.12";

/// Proxy Authorization control ([RFC 4370](https://tools.ietf.org/html/rfc4370)).
///
/// This control is always marked as critical. The authorization identity is
/// empty for the anonymous identity, or starts with `dn:` or `u:`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyAuth {
    pub authzid: String,
}

impl From<ProxyAuth> for RawControl {
    fn from(pa: ProxyAuth) -> RawControl {
        RawControl {
            ctype: PROXY_AUTH_OID.to_owned(),
            crit: true,
            val: Some(pa.authzid.into_bytes()),
        }
    }
}

fn check_authzid(authzid: &str) -> Result<(), DecodeError> {
    if authzid.is_empty() || authzid.starts_with("dn:") || authzid.starts_with("u:") {
        Ok(())
    } else {
        Err(DecodeError::Invalid {
            what: "authzid",
            detail: authzid.to_owned(),
        })
    }
}

impl ControlParser for ProxyAuth {
    fn parse(val: &[u8]) -> Result<ProxyAuth, DecodeError> {
        // Early implementations wrapped the authzId in an OCTET STRING. A bare
        // authzId can never start with that tag.
        let raw = match val.first() {
            Some(&tag) if tag == Types::OctetString as u8 => {
                warn!("proxy authorization value wrapped in an octet string");
                ber::octets_elem(ber::parse_value(val, "authzid")?, "authzid")?
            }
            _ => val.to_vec(),
        };
        let authzid = String::from_utf8(raw).map_err(|_| DecodeError::Utf8("authzid"))?;
        check_authzid(&authzid)?;
        Ok(ProxyAuth { authzid })
    }
}

/// Proxied Authorization control, version 1
/// ([draft-weltman-ldapv3-proxy-04](https://tools.ietf.org/html/draft-weltman-ldapv3-proxy-04)).
///
/// Superseded by [`ProxyAuth`](struct.ProxyAuth.html), but still accepted
/// by some servers. Always critical.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyAuthV1 {
    pub authz_dn: String,
}

impl From<ProxyAuthV1> for RawControl {
    fn from(pa: ProxyAuthV1) -> RawControl {
        RawControl {
            ctype: PROXY_AUTH_V1_OID.to_owned(),
            crit: true,
            val: Some(ber::encode_value(Tag::Sequence(Sequence {
                inner: vec![Tag::OctetString(OctetString::new(pa.authz_dn))],
                ..Default::default()
            }))),
        }
    }
}

impl ControlParser for ProxyAuthV1 {
    fn parse(val: &[u8]) -> Result<ProxyAuthV1, DecodeError> {
        let mut components =
            ber::sequence(ber::parse_value(val, "proxied authorization")?, "proxied authorization")?;
        let authz_dn = ber::string_elem(ber::next(&mut components, "authz dn")?, "authz dn")?;
        ber::end(components, "proxied authorization")?;
        Ok(ProxyAuthV1 { authz_dn })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn v2_is_critical() {
        let rc = RawControl::from(ProxyAuth {
            authzid: "dn:cn=proxy,dc=example,dc=com".into(),
        });
        assert!(rc.crit);
        assert_eq!(rc.val.as_deref(), Some(&b"dn:cn=proxy,dc=example,dc=com"[..]));
        assert_eq!(rc.parse::<ProxyAuth>().unwrap().authzid, "dn:cn=proxy,dc=example,dc=com");
    }

    #[test]
    fn v2_anonymous_and_user() {
        assert_eq!(ProxyAuth::parse(b"").unwrap().authzid, "");
        assert_eq!(ProxyAuth::parse(b"u:bjensen").unwrap().authzid, "u:bjensen");
    }

    #[test]
    fn v2_legacy_wrapping() {
        let val = [0x04, 0x04, b'u', b':', b'j', b'd'];
        assert_eq!(ProxyAuth::parse(&val).unwrap().authzid, "u:jd");
        assert_eq!(ProxyAuth::parse(&[0x04, 0x00]).unwrap().authzid, "");
        assert_eq!(
            ProxyAuth::parse(&[0x04, 0x09, b'u']),
            Err(DecodeError::Ber)
        );
    }

    #[test]
    fn v2_bad_prefix() {
        assert!(matches!(
            ProxyAuth::parse(b"cn=admin"),
            Err(DecodeError::Invalid { what: "authzid", .. })
        ));
        let rc = RawControl {
            ctype: PROXY_AUTH_OID.into(),
            crit: true,
            val: None,
        };
        assert!(rc.parse::<ProxyAuth>().is_err());
    }

    #[test]
    fn v1_round_trip() {
        let pa = ProxyAuthV1 {
            authz_dn: "uid=app,ou=people".into(),
        };
        let rc = RawControl::from(pa.clone());
        assert!(rc.crit);
        assert_eq!(rc.parse::<ProxyAuthV1>().unwrap(), pa);
        assert_eq!(
            ProxyAuthV1::parse(&[0x30, 0x00]),
            Err(DecodeError::Expected("authz dn"))
        );
    }
}
