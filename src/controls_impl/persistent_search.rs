use std::str::FromStr;

use super::{ControlParser, MakeCritical, RawControl, parse_flag};
use crate::ber;
use crate::result::{DecodeError, LdapError};

use bitflags::bitflags;
use lber::structures::{Boolean, Enumerated, Integer, OctetString, Sequence, Tag};
use lber::universal::Types;

pub const PERSISTENT_SEARCH_OID: &str = "2.16.840.1.113730.3.4.3";
pub const ENTRY_CHANGE_NOTIFICATION_OID: &str = "2.16.840.1.113730.3.4.7";

bitflags! {
    /// Set of change types a persistent search is interested in.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ChangeTypes: u8 {
        const ADD = 1;
        const DELETE = 2;
        const MODIFY = 4;
        const MODIFY_DN = 8;
    }
}

/// Persistent Search control
/// ([draft-ietf-ldapext-psearch](https://tools.ietf.org/html/draft-ietf-ldapext-psearch-03)).
///
/// The default value asks for all change types, only changes, and Entry Change
/// Notification controls with every returned entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistentSearch {
    pub change_types: ChangeTypes,
    /// Skip the initial search and only return changed entries.
    pub changes_only: bool,
    /// Attach an Entry Change Notification control to returned entries.
    pub return_ecs: bool,
}

impl Default for PersistentSearch {
    fn default() -> Self {
        PersistentSearch {
            change_types: ChangeTypes::all(),
            changes_only: true,
            return_ecs: true,
        }
    }
}

impl MakeCritical for PersistentSearch {}

impl From<PersistentSearch> for RawControl {
    fn from(ps: PersistentSearch) -> RawControl {
        let val = ber::encode_value(Tag::Sequence(Sequence {
            inner: vec![
                Tag::Integer(Integer {
                    inner: ps.change_types.bits() as i64,
                    ..Default::default()
                }),
                Tag::Boolean(Boolean {
                    inner: ps.changes_only,
                    ..Default::default()
                }),
                Tag::Boolean(Boolean {
                    inner: ps.return_ecs,
                    ..Default::default()
                }),
            ],
            ..Default::default()
        }));
        RawControl {
            ctype: PERSISTENT_SEARCH_OID.to_owned(),
            crit: false,
            val: Some(val),
        }
    }
}

impl ControlParser for PersistentSearch {
    fn parse(val: &[u8]) -> Result<PersistentSearch, DecodeError> {
        let mut components =
            ber::sequence(ber::parse_value(val, "persistent search")?, "persistent search")?;
        let types = ber::integer_elem(ber::next(&mut components, "change types")?, "change types")?;
        let change_types = match u8::try_from(types) {
            Ok(bits @ 1..=15) => ChangeTypes::from_bits_truncate(bits),
            _ => {
                return Err(DecodeError::Invalid {
                    what: "change types",
                    detail: types.to_string(),
                });
            }
        };
        let changes_only =
            ber::boolean_elem(ber::next(&mut components, "changes only")?, "changes only")?;
        let return_ecs = ber::boolean_elem(ber::next(&mut components, "return ECs")?, "return ECs")?;
        ber::end(components, "persistent search")?;
        Ok(PersistentSearch {
            change_types,
            changes_only,
            return_ecs,
        })
    }
}

fn invalid(s: &str) -> LdapError {
    LdapError::InvalidDescriptor(format!("persistent search: {s}"))
}

/// Parse a descriptor of the form `ps[:changetypes[:changesonly[:returnecs]]]`.
///
/// Change types are `add`, `delete` (`del`), `modify` (`mod`), `modifydn`
/// (`moddn`, `modrdn`) and `any` (`all`), separated by commas or spaces.
/// Omitted parts take the default values. Names are matched regardless of case.
impl FromStr for PersistentSearch {
    type Err = LdapError;

    fn from_str(s: &str) -> Result<PersistentSearch, LdapError> {
        let lower = s.trim().to_ascii_lowercase();
        let mut tokens = lower.split(':').filter(|t| !t.is_empty());
        if tokens.next() != Some("ps") {
            return Err(invalid(s));
        }
        let mut ps = PersistentSearch::default();
        if let Some(types) = tokens.next() {
            let mut change_types = ChangeTypes::empty();
            for name in types.split([',', ' ']).filter(|t| !t.is_empty()) {
                change_types |= match name {
                    "add" => ChangeTypes::ADD,
                    "delete" | "del" => ChangeTypes::DELETE,
                    "modify" | "mod" => ChangeTypes::MODIFY,
                    "modifydn" | "moddn" | "modrdn" => ChangeTypes::MODIFY_DN,
                    "any" | "all" => ChangeTypes::all(),
                    _ => return Err(invalid(name)),
                };
            }
            if !change_types.is_empty() {
                ps.change_types = change_types;
            }
        }
        if let Some(changes_only) = tokens.next() {
            ps.changes_only = parse_flag(changes_only).ok_or_else(|| invalid(changes_only))?;
        }
        if let Some(return_ecs) = tokens.next() {
            ps.return_ecs = parse_flag(return_ecs).ok_or_else(|| invalid(return_ecs))?;
        }
        match tokens.next() {
            None => Ok(ps),
            Some(_) => Err(invalid(s)),
        }
    }
}

/// Kind of change reported by an Entry Change Notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeType {
    Add = 1,
    Delete = 2,
    Modify = 4,
    ModifyDn = 8,
}

impl TryFrom<i64> for ChangeType {
    type Error = DecodeError;

    fn try_from(val: i64) -> Result<ChangeType, DecodeError> {
        Ok(match val {
            1 => ChangeType::Add,
            2 => ChangeType::Delete,
            4 => ChangeType::Modify,
            8 => ChangeType::ModifyDn,
            _ => {
                return Err(DecodeError::Invalid {
                    what: "change type",
                    detail: val.to_string(),
                });
            }
        })
    }
}

impl From<ChangeType> for ChangeTypes {
    fn from(ct: ChangeType) -> ChangeTypes {
        ChangeTypes::from_bits_truncate(ct as u8)
    }
}

/// Entry Change Notification response control, returned with entries of a
/// persistent search.
///
/// The previous DN can only accompany a modify DN change, so a notification
/// carrying one is created with [`modify_dn()`](#method.modify_dn).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryChangeNotification {
    change_type: ChangeType,
    previous_dn: Option<String>,
    change_number: Option<i64>,
}

impl EntryChangeNotification {
    pub fn new(change_type: ChangeType, change_number: Option<i64>) -> EntryChangeNotification {
        EntryChangeNotification {
            change_type,
            previous_dn: None,
            change_number,
        }
    }

    /// Notification of a modify DN change, with the DN of the entry before it.
    pub fn modify_dn<S: Into<String>>(
        previous_dn: S,
        change_number: Option<i64>,
    ) -> EntryChangeNotification {
        EntryChangeNotification {
            change_type: ChangeType::ModifyDn,
            previous_dn: Some(previous_dn.into()),
            change_number,
        }
    }

    pub fn change_type(&self) -> ChangeType {
        self.change_type
    }

    pub fn previous_dn(&self) -> Option<&str> {
        self.previous_dn.as_deref()
    }

    pub fn change_number(&self) -> Option<i64> {
        self.change_number
    }
}

impl From<EntryChangeNotification> for RawControl {
    fn from(ecn: EntryChangeNotification) -> RawControl {
        let mut inner = vec![Tag::Enumerated(Enumerated {
            inner: ecn.change_type as i64,
            ..Default::default()
        })];
        if let Some(dn) = ecn.previous_dn {
            inner.push(Tag::OctetString(OctetString::new(dn)));
        }
        if let Some(number) = ecn.change_number {
            inner.push(Tag::Integer(Integer {
                inner: number,
                ..Default::default()
            }));
        }
        RawControl {
            ctype: ENTRY_CHANGE_NOTIFICATION_OID.to_owned(),
            crit: false,
            val: Some(ber::encode_value(Tag::Sequence(Sequence {
                inner,
                ..Default::default()
            }))),
        }
    }
}

impl ControlParser for EntryChangeNotification {
    fn parse(val: &[u8]) -> Result<EntryChangeNotification, DecodeError> {
        let mut components = ber::sequence(
            ber::parse_value(val, "entry change notification")?,
            "entry change notification",
        )?;
        let change_type = ChangeType::try_from(ber::enumerated_elem(
            ber::next(&mut components, "change type")?,
            "change type",
        )?)?;
        let mut next = components.next();
        let mut previous_dn = None;
        if let Some(t) = next.take_if(|t| t.is_universal(Types::OctetString)) {
            if change_type != ChangeType::ModifyDn {
                return Err(DecodeError::Invalid {
                    what: "previous dn",
                    detail: format!("not allowed for {change_type:?}"),
                });
            }
            previous_dn = Some(ber::string(t, "previous dn")?);
            next = components.next();
        }
        let change_number = match next {
            Some(t) => Some(ber::int(
                ber::universal(t, Types::Integer, "change number")?,
                "change number",
            )?),
            None => None,
        };
        ber::end(components, "entry change notification")?;
        Ok(EntryChangeNotification {
            change_type,
            previous_dn,
            change_number,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_request() {
        let rc = RawControl::from(PersistentSearch::default());
        assert_eq!(
            rc.val,
            Some(vec![0x30, 0x09, 0x02, 0x01, 0x0F, 0x01, 0x01, 0xFF, 0x01, 0x01, 0xFF])
        );
        assert_eq!(rc.parse::<PersistentSearch>().unwrap(), PersistentSearch::default());
    }

    #[test]
    fn change_types_out_of_range() {
        for bits in [0x00, 0x10] {
            let val = [0x30, 0x09, 0x02, 0x01, bits, 0x01, 0x01, 0x00, 0x01, 0x01, 0x00];
            assert!(matches!(
                PersistentSearch::parse(&val),
                Err(DecodeError::Invalid { what: "change types", .. })
            ));
        }
    }

    #[test]
    fn missing_flag() {
        let val = [0x30, 0x06, 0x02, 0x01, 0x01, 0x01, 0x01, 0x00];
        assert_eq!(
            PersistentSearch::parse(&val),
            Err(DecodeError::Expected("return ECs"))
        );
    }

    #[test]
    fn descriptors() {
        assert_eq!("ps".parse::<PersistentSearch>().unwrap(), PersistentSearch::default());
        let ps: PersistentSearch = "PS:add,del mod:false:0".parse().unwrap();
        assert_eq!(
            ps,
            PersistentSearch {
                change_types: ChangeTypes::ADD | ChangeTypes::DELETE | ChangeTypes::MODIFY,
                changes_only: false,
                return_ecs: false,
            }
        );
        let ps: PersistentSearch = "ps:modrdn".parse().unwrap();
        assert_eq!(ps.change_types, ChangeTypes::MODIFY_DN);
        assert!(ps.changes_only && ps.return_ecs);
        assert!("ps:rename".parse::<PersistentSearch>().is_err());
        assert!("ps:all:maybe".parse::<PersistentSearch>().is_err());
        assert!("search:all".parse::<PersistentSearch>().is_err());
        assert!("".parse::<PersistentSearch>().is_err());
    }

    #[test]
    fn notification_round_trip() {
        let ecn = EntryChangeNotification::modify_dn("cn=old,dc=example,dc=com", Some(42));
        let rc = RawControl::from(ecn.clone());
        let decoded = rc.parse::<EntryChangeNotification>().unwrap();
        assert_eq!(decoded, ecn);
        assert_eq!(decoded.previous_dn(), Some("cn=old,dc=example,dc=com"));
        let ecn = EntryChangeNotification::new(ChangeType::Add, None);
        let rc = RawControl::from(ecn.clone());
        assert_eq!(rc.val, Some(vec![0x30, 0x03, 0x0A, 0x01, 0x01]));
        assert_eq!(rc.parse::<EntryChangeNotification>().unwrap(), ecn);
    }

    #[test]
    fn notification_without_previous_dn() {
        let ecn = EntryChangeNotification::parse(&[0x30, 0x06, 0x0A, 0x01, 0x04, 0x02, 0x01, 0x07])
            .unwrap();
        assert_eq!(ecn.change_type(), ChangeType::Modify);
        assert_eq!(ecn.change_number(), Some(7));
    }

    #[test]
    fn every_change_type_decodes() {
        for ct in [
            ChangeType::Add,
            ChangeType::Delete,
            ChangeType::Modify,
            ChangeType::ModifyDn,
        ] {
            let ecn = EntryChangeNotification::new(ct, Some(1));
            assert_eq!(ecn.previous_dn(), None);
            let rc = RawControl::from(ecn.clone());
            assert_eq!(rc.parse::<EntryChangeNotification>().unwrap(), ecn);
        }
    }

    #[test]
    fn previous_dn_only_for_modify_dn() {
        let val = [0x30, 0x06, 0x0A, 0x01, 0x01, 0x04, 0x01, 0x78];
        assert!(matches!(
            EntryChangeNotification::parse(&val),
            Err(DecodeError::Invalid { what: "previous dn", .. })
        ));
        let val = [0x30, 0x03, 0x0A, 0x01, 0x03];
        assert!(EntryChangeNotification::parse(&val).is_err());
    }
}
