use super::{ControlParser, RawControl};
use crate::ber;
use crate::result::DecodeError;

use lber::common::TagClass;
use lber::structure::StructureTag;
use lber::structures::{Enumerated, Integer, Sequence, Tag};

pub const PASSWORD_POLICY_OID: &str = "1.3.6.1.4.1.42.2.27.8.5.1";
pub const PASSWORD_EXPIRED_OID: &str = "2.16.840.1.113730.3.4.4";
pub const PASSWORD_EXPIRING_OID: &str = "2.16.840.1.113730.3.4.5";

flag_control!(
    /// Password Policy request control
    /// ([draft-behera-ldap-password-policy](https://tools.ietf.org/html/draft-behera-ldap-password-policy-11)).
    ///
    /// The request has no value; the server answers with a
    /// [`PasswordPolicyResp`](struct.PasswordPolicyResp.html) under the same OID.
    PasswordPolicy,
    PASSWORD_POLICY_OID
);

/// Warning part of the Password Policy response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasswordPolicyWarning {
    /// Seconds until the password expires.
    TimeBeforeExpiration(i32),
    /// Grace logins left after expiration.
    GraceAuthNsRemaining(i32),
}

/// Error part of the Password Policy response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasswordPolicyError {
    PasswordExpired = 0,
    AccountLocked = 1,
    ChangeAfterReset = 2,
    PasswordModNotAllowed = 3,
    MustSupplyOldPassword = 4,
    InsufficientPasswordQuality = 5,
    PasswordTooShort = 6,
    PasswordTooYoung = 7,
    PasswordInHistory = 8,
}

impl TryFrom<i64> for PasswordPolicyError {
    type Error = DecodeError;

    fn try_from(val: i64) -> Result<PasswordPolicyError, DecodeError> {
        use PasswordPolicyError::*;
        Ok(match val {
            0 => PasswordExpired,
            1 => AccountLocked,
            2 => ChangeAfterReset,
            3 => PasswordModNotAllowed,
            4 => MustSupplyOldPassword,
            5 => InsufficientPasswordQuality,
            6 => PasswordTooShort,
            7 => PasswordTooYoung,
            8 => PasswordInHistory,
            _ => {
                return Err(DecodeError::Invalid {
                    what: "password policy error",
                    detail: val.to_string(),
                });
            }
        })
    }
}

/// Password Policy response control.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PasswordPolicyResp {
    pub warning: Option<PasswordPolicyWarning>,
    pub error: Option<PasswordPolicyError>,
}

impl From<PasswordPolicyResp> for RawControl {
    fn from(resp: PasswordPolicyResp) -> RawControl {
        let mut inner = vec![];
        if let Some(warning) = resp.warning {
            let (id, value) = match warning {
                PasswordPolicyWarning::TimeBeforeExpiration(secs) => (0, secs),
                PasswordPolicyWarning::GraceAuthNsRemaining(count) => (1, count),
            };
            inner.push(Tag::Sequence(Sequence {
                id: 0,
                class: TagClass::Context,
                inner: vec![Tag::Integer(Integer {
                    id,
                    class: TagClass::Context,
                    inner: value as i64,
                })],
            }));
        }
        if let Some(error) = resp.error {
            inner.push(Tag::Enumerated(Enumerated {
                id: 1,
                class: TagClass::Context,
                inner: error as i64,
            }));
        }
        RawControl {
            ctype: PASSWORD_POLICY_OID.to_owned(),
            crit: false,
            val: Some(ber::encode_value(Tag::Sequence(Sequence {
                inner,
                ..Default::default()
            }))),
        }
    }
}

fn parse_warning(tag: StructureTag) -> Result<PasswordPolicyWarning, DecodeError> {
    let mut choice = ber::components(tag, "password policy warning")?;
    let warning = ber::next(&mut choice, "password policy warning")?;
    let make = if warning.is(TagClass::Context, 0) {
        PasswordPolicyWarning::TimeBeforeExpiration
    } else if warning.is(TagClass::Context, 1) {
        PasswordPolicyWarning::GraceAuthNsRemaining
    } else {
        return Err(DecodeError::Expected("password policy warning"));
    };
    let value = ber::int32(warning, "password policy warning")?;
    ber::end(choice, "password policy warning")?;
    Ok(make(value))
}

impl ControlParser for PasswordPolicyResp {
    fn parse(val: &[u8]) -> Result<PasswordPolicyResp, DecodeError> {
        let mut components =
            ber::sequence(ber::parse_value(val, "password policy")?, "password policy")?;
        let mut next = components.next();
        let mut resp = PasswordPolicyResp::default();
        if let Some(t) = next.take_if(|t| t.is(TagClass::Context, 0)) {
            resp.warning = Some(parse_warning(t)?);
            next = components.next();
        }
        if let Some(t) = next {
            let error = ber::context(t, 1, "password policy error")?;
            resp.error = Some(ber::int(error, "password policy error")?.try_into()?);
        }
        ber::end(components, "password policy")?;
        Ok(resp)
    }
}

/// Netscape Password Expired response control.
///
/// Sent with a bind response when the password must be changed before any other
/// operation; the value is always `"0"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PasswordExpired;

impl From<PasswordExpired> for RawControl {
    fn from(_: PasswordExpired) -> RawControl {
        RawControl {
            ctype: PASSWORD_EXPIRED_OID.to_owned(),
            crit: false,
            val: Some(b"0".to_vec()),
        }
    }
}

fn decimal(val: &[u8], what: &'static str) -> Result<i32, DecodeError> {
    std::str::from_utf8(val)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| DecodeError::Invalid {
            what,
            detail: String::from_utf8_lossy(val).into_owned(),
        })
}

impl ControlParser for PasswordExpired {
    fn parse(val: &[u8]) -> Result<PasswordExpired, DecodeError> {
        decimal(val, "password expired").map(|_| PasswordExpired)
    }

    fn parse_absent() -> Result<PasswordExpired, DecodeError> {
        Ok(PasswordExpired)
    }
}

/// Netscape Password Expiring response control.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PasswordExpiring {
    /// Seconds until the password expires.
    pub secs: i32,
}

impl From<PasswordExpiring> for RawControl {
    fn from(pe: PasswordExpiring) -> RawControl {
        RawControl {
            ctype: PASSWORD_EXPIRING_OID.to_owned(),
            crit: false,
            val: Some(pe.secs.to_string().into_bytes()),
        }
    }
}

impl ControlParser for PasswordExpiring {
    fn parse(val: &[u8]) -> Result<PasswordExpiring, DecodeError> {
        decimal(val, "password expiring").map(|secs| PasswordExpiring { secs })
    }
}
