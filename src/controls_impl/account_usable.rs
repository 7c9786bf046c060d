use super::{ControlParser, RawControl};
use crate::ber;
use crate::result::DecodeError;

use lber::common::TagClass;
use lber::structures::{Boolean, Integer, Sequence, Tag};

pub const ACCOUNT_USABLE_OID: &str = "1.3.6.1.4.1.42.2.27.9.5.8";

flag_control!(
    /// Account Usability request control.
    ///
    /// Sent with a search; each returned entry is accompanied by an
    /// [`AccountUsableResp`](enum.AccountUsableResp.html) describing whether
    /// the account can be used to bind.
    AccountUsable,
    ACCOUNT_USABLE_OID
);

/// Reasons for which an account can't be used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccountUnusable {
    pub inactive: bool,
    /// The password was reset and must be changed.
    pub reset: bool,
    pub expired: bool,
    /// Grace logins left with an expired password.
    pub remaining_grace: Option<i32>,
    /// Seconds until a locked account is unlocked.
    pub secs_before_unlock: Option<i32>,
}

/// Account Usability response control.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountUsableResp {
    /// The account is usable; the value is the number of seconds before the
    /// password expires, or -1 if it doesn't.
    Available(i32),
    NotAvailable(AccountUnusable),
}

const INACTIVE: u64 = 0;
const RESET: u64 = 1;
const EXPIRED: u64 = 2;
const REMAINING_GRACE: u64 = 3;
const SECS_BEFORE_UNLOCK: u64 = 4;

fn flag(id: u64) -> Tag {
    Tag::Boolean(Boolean {
        id,
        class: TagClass::Context,
        inner: true,
    })
}

fn int(id: u64, inner: i32) -> Tag {
    Tag::Integer(Integer {
        id,
        class: TagClass::Context,
        inner: inner as i64,
    })
}

impl From<AccountUsableResp> for RawControl {
    fn from(resp: AccountUsableResp) -> RawControl {
        let tag = match resp {
            AccountUsableResp::Available(secs) => int(0, secs),
            AccountUsableResp::NotAvailable(why) => {
                let mut inner = vec![];
                if why.inactive {
                    inner.push(flag(INACTIVE));
                }
                if why.reset {
                    inner.push(flag(RESET));
                }
                if why.expired {
                    inner.push(flag(EXPIRED));
                }
                if let Some(grace) = why.remaining_grace {
                    inner.push(int(REMAINING_GRACE, grace));
                }
                if let Some(secs) = why.secs_before_unlock {
                    inner.push(int(SECS_BEFORE_UNLOCK, secs));
                }
                Tag::Sequence(Sequence {
                    id: 1,
                    class: TagClass::Context,
                    inner,
                })
            }
        };
        RawControl {
            ctype: ACCOUNT_USABLE_OID.to_owned(),
            crit: false,
            val: Some(ber::encode_value(tag)),
        }
    }
}

impl ControlParser for AccountUsableResp {
    fn parse(val: &[u8]) -> Result<AccountUsableResp, DecodeError> {
        let tag = ber::parse_value(val, "account usability")?;
        if tag.is(TagClass::Context, 0) {
            return Ok(AccountUsableResp::Available(ber::int32(tag, "seconds before expiration")?));
        }
        let mut why = AccountUnusable::default();
        let mut last = None;
        for elem in ber::components(ber::context(tag, 1, "account usability")?, "more info")? {
            if elem.class != TagClass::Context || last.is_some_and(|last| elem.id <= last) {
                return Err(DecodeError::Expected("more info"));
            }
            last = Some(elem.id);
            match elem.id {
                INACTIVE => why.inactive = ber::boolean(elem, "inactive")?,
                RESET => why.reset = ber::boolean(elem, "reset")?,
                EXPIRED => why.expired = ber::boolean(elem, "expired")?,
                REMAINING_GRACE => why.remaining_grace = Some(ber::int32(elem, "remaining grace")?),
                SECS_BEFORE_UNLOCK => {
                    why.secs_before_unlock = Some(ber::int32(elem, "seconds before unlock")?)
                }
                _ => return Err(DecodeError::Expected("more info")),
            }
        }
        Ok(AccountUsableResp::NotAvailable(why))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn available() {
        let rc = RawControl::from(AccountUsableResp::Available(3600));
        assert_eq!(rc.val, Some(vec![0x80, 0x02, 0x0E, 0x10]));
        assert_eq!(
            rc.parse::<AccountUsableResp>().unwrap(),
            AccountUsableResp::Available(3600)
        );
    }

    #[test]
    fn not_available() {
        let resp = AccountUsableResp::NotAvailable(AccountUnusable {
            expired: true,
            remaining_grace: Some(2),
            ..Default::default()
        });
        let rc = RawControl::from(resp);
        assert_eq!(
            rc.val,
            Some(vec![0xA1, 0x06, 0x82, 0x01, 0xFF, 0x83, 0x01, 0x02])
        );
        assert_eq!(rc.parse::<AccountUsableResp>().unwrap(), resp);
        let locked = AccountUsableResp::NotAvailable(AccountUnusable {
            inactive: true,
            reset: true,
            secs_before_unlock: Some(300),
            ..Default::default()
        });
        let rc = RawControl::from(locked);
        assert_eq!(rc.parse::<AccountUsableResp>().unwrap(), locked);
    }

    #[test]
    fn malformed() {
        // elements out of order
        assert_eq!(
            AccountUsableResp::parse(&[0xA1, 0x06, 0x83, 0x01, 0x02, 0x82, 0x01, 0xFF]),
            Err(DecodeError::Expected("more info"))
        );
        // unknown choice
        assert_eq!(
            AccountUsableResp::parse(&[0x82, 0x01, 0x00]),
            Err(DecodeError::Expected("account usability"))
        );
        // request control carries no value
        assert!(AccountUsable::parse(&[0x80, 0x00]).is_err());
    }
}
