use super::{ControlParser, MakeCritical, RawControl};
use crate::ber;
use crate::result::{DecodeError, LdapError, Result};

use lber::structures::{OctetString, Sequence, Tag};

pub const GET_EFFECTIVE_RIGHTS_OID: &str = "1.3.6.1.4.1.42.2.27.9.5.2";

/// Get Effective Rights request control.
///
/// Asks the server to return, with each entry, the rights a user has on the
/// entry and on the listed attributes. Without a user, the rights of the bound
/// user are returned; without attributes, only entry-level rights.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GetEffectiveRights {
    /// DN of the user whose rights are evaluated.
    pub authz_dn: Option<String>,
    pub attrs: Vec<String>,
}

impl GetEffectiveRights {
    /// Create a control for an authorization identity, which must be given
    /// in the `dn:` form.
    pub fn new<S: AsRef<str>>(authzid: &str, attrs: &[S]) -> Result<GetEffectiveRights> {
        let authz_dn = authzid
            .strip_prefix("dn:")
            .ok_or_else(|| LdapError::InvalidDescriptor(format!("effective rights authzid: {authzid}")))?;
        Ok(GetEffectiveRights {
            authz_dn: Some(authz_dn.to_owned()),
            attrs: attrs.iter().map(|a| a.as_ref().to_owned()).collect(),
        })
    }
}

impl MakeCritical for GetEffectiveRights {}

impl From<GetEffectiveRights> for RawControl {
    fn from(ger: GetEffectiveRights) -> RawControl {
        let val = if ger.authz_dn.is_none() && ger.attrs.is_empty() {
            None
        } else {
            let authzid = ger.authz_dn.map(|dn| format!("dn:{dn}")).unwrap_or_default();
            Some(ber::encode_value(Tag::Sequence(Sequence {
                inner: vec![
                    Tag::OctetString(OctetString::new(authzid)),
                    Tag::Sequence(Sequence {
                        inner: ger
                            .attrs
                            .into_iter()
                            .map(|a| Tag::OctetString(OctetString::new(a)))
                            .collect(),
                        ..Default::default()
                    }),
                ],
                ..Default::default()
            })))
        };
        RawControl {
            ctype: GET_EFFECTIVE_RIGHTS_OID.to_owned(),
            crit: false,
            val,
        }
    }
}

impl ControlParser for GetEffectiveRights {
    fn parse(val: &[u8]) -> std::result::Result<GetEffectiveRights, DecodeError> {
        let mut components =
            ber::sequence(ber::parse_value(val, "effective rights")?, "effective rights")?;
        let authzid = ber::string_elem(ber::next(&mut components, "authzid")?, "authzid")?;
        let authz_dn = if authzid.is_empty() {
            None
        } else if authzid.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("dn:")) {
            Some(authzid[3..].to_owned())
        } else {
            return Err(DecodeError::Invalid {
                what: "authzid",
                detail: authzid,
            });
        };
        let attrs = match components.next() {
            Some(t) => ber::sequence(t, "attributes")?
                .map(|t| ber::string_elem(t, "attribute"))
                .collect::<std::result::Result<Vec<_>, _>>()?,
            None => vec![],
        };
        ber::end(components, "effective rights")?;
        Ok(GetEffectiveRights { authz_dn, attrs })
    }

    fn parse_absent() -> std::result::Result<GetEffectiveRights, DecodeError> {
        Ok(GetEffectiveRights::default())
    }
}
