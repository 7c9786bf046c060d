use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::ber;
use crate::result::{DecodeError, LdapError, Result};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use lber::common::TagClass;
use lber::structure::StructureTag;
use lber::structures::{ASNTag, Boolean, OctetString, Sequence, Tag};
use lber::universal::Types;

/// Recognized control types.
///
/// The variants can't be exhaustively matched, since the list of
/// recognized and internally implemented controls can change from one
/// release to the next. Where the request and the response use the same
/// OID, there is a single variant for both.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlType {
    AccountUsable,
    AdNotification,
    Assertion,
    AuthzIdRequest,
    AuthzIdResponse,
    EntryChangeNotification,
    GetEffectiveRights,
    LdupSubentries,
    ManageDsaIt,
    MatchedValues,
    NoOp,
    PagedResults,
    PasswordExpired,
    PasswordExpiring,
    PasswordPolicy,
    PermissiveModify,
    PersistentSearch,
    PostRead,
    PreRead,
    ProxiedAuthV1,
    ProxiedAuthV2,
    RealAttrsOnly,
    ServerSideSort,
    ServerSideSortResp,
    Subentries,
    SubtreeDelete,
    VirtualAttrsOnly,
    VirtualListView,
    VirtualListViewResp,
}

/// Implement a control which never carries a value.
///
/// Decoding a value for such a control is an error.
macro_rules! flag_control {
    ($(#[$meta:meta])* $name:ident, $oid:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
        pub struct $name;

        impl $crate::controls::MakeCritical for $name {}

        impl From<$name> for $crate::controls::RawControl {
            fn from(_: $name) -> $crate::controls::RawControl {
                $crate::controls::RawControl {
                    ctype: $oid.to_owned(),
                    crit: false,
                    val: None,
                }
            }
        }

        impl $crate::controls::ControlParser for $name {
            fn parse(_val: &[u8]) -> ::std::result::Result<Self, $crate::result::DecodeError> {
                Err($crate::result::DecodeError::UnexpectedValue)
            }

            fn parse_absent() -> ::std::result::Result<Self, $crate::result::DecodeError> {
                Ok($name)
            }
        }
    };
}

mod account_usable;
pub use self::account_usable::{AccountUnusable, AccountUsable, AccountUsableResp};

mod assertion;
pub use self::assertion::Assertion;

mod authz_id;
pub use self::authz_id::{AuthzIdRequest, AuthzIdResp};

mod effective_rights;
pub use self::effective_rights::GetEffectiveRights;

mod flags;
pub use self::flags::{
    AdNotification, ManageDsaIt, NoOp, PermissiveModify, RealAttrsOnly, SubtreeDelete,
    VirtualAttrsOnly,
};

mod matched_values;
pub use self::matched_values::MatchedValues;

mod paged_results;
pub use self::paged_results::PagedResults;

mod password_policy;
pub use self::password_policy::{
    PasswordExpired, PasswordExpiring, PasswordPolicy, PasswordPolicyError, PasswordPolicyResp,
    PasswordPolicyWarning,
};

mod persistent_search;
pub use self::persistent_search::{
    ChangeType, ChangeTypes, EntryChangeNotification, PersistentSearch,
};

mod proxy_auth;
pub use self::proxy_auth::{ProxyAuth, ProxyAuthV1};

mod read_entry;
pub use self::read_entry::{PostRead, PostReadResp, PreRead, PreReadResp};

mod sort;
pub use self::sort::{ServerSideSort, ServerSideSortResp, SortKey};

mod subentries;
pub use self::subentries::{LdupSubentries, Subentries};

mod vlv;
pub use self::vlv::{VirtualListView, VirtualListViewResp, VlvTarget};

/// OIDs of the implemented controls.
pub mod oid {
    pub use super::account_usable::ACCOUNT_USABLE_OID;
    pub use super::assertion::ASSERTION_OID;
    pub use super::authz_id::{AUTHZID_REQUEST_OID, AUTHZID_RESPONSE_OID};
    pub use super::effective_rights::GET_EFFECTIVE_RIGHTS_OID;
    pub use super::flags::{
        AD_NOTIFICATION_OID, MANAGE_DSA_IT_OID, NOOP_OID, PERMISSIVE_MODIFY_OID,
        REAL_ATTRS_ONLY_OID, SUBTREE_DELETE_OID, VIRTUAL_ATTRS_ONLY_OID,
    };
    pub use super::matched_values::MATCHED_VALUES_OID;
    pub use super::paged_results::PAGED_RESULTS_OID;
    pub use super::password_policy::{
        PASSWORD_EXPIRED_OID, PASSWORD_EXPIRING_OID, PASSWORD_POLICY_OID,
    };
    pub use super::persistent_search::{ENTRY_CHANGE_NOTIFICATION_OID, PERSISTENT_SEARCH_OID};
    pub use super::proxy_auth::{PROXY_AUTH_OID, PROXY_AUTH_V1_OID};
    pub use super::read_entry::{POST_READ_OID, PRE_READ_OID};
    pub use super::sort::{SORT_REQUEST_OID, SORT_RESPONSE_OID};
    pub use super::subentries::{LDUP_SUBENTRIES_OID, SUBENTRIES_OID};
    pub use super::vlv::{VLV_REQUEST_OID, VLV_RESPONSE_OID};
}

#[rustfmt::skip]
static CONTROLS: LazyLock<HashMap<&'static str, ControlType>> = LazyLock::new(|| {
    use self::oid::*;
    HashMap::from([
        (ACCOUNT_USABLE_OID, ControlType::AccountUsable),
        (AD_NOTIFICATION_OID, ControlType::AdNotification),
        (ASSERTION_OID, ControlType::Assertion),
        (AUTHZID_REQUEST_OID, ControlType::AuthzIdRequest),
        (AUTHZID_RESPONSE_OID, ControlType::AuthzIdResponse),
        (ENTRY_CHANGE_NOTIFICATION_OID, ControlType::EntryChangeNotification),
        (GET_EFFECTIVE_RIGHTS_OID, ControlType::GetEffectiveRights),
        (LDUP_SUBENTRIES_OID, ControlType::LdupSubentries),
        (MANAGE_DSA_IT_OID, ControlType::ManageDsaIt),
        (MATCHED_VALUES_OID, ControlType::MatchedValues),
        (NOOP_OID, ControlType::NoOp),
        (PAGED_RESULTS_OID, ControlType::PagedResults),
        (PASSWORD_EXPIRED_OID, ControlType::PasswordExpired),
        (PASSWORD_EXPIRING_OID, ControlType::PasswordExpiring),
        (PASSWORD_POLICY_OID, ControlType::PasswordPolicy),
        (PERMISSIVE_MODIFY_OID, ControlType::PermissiveModify),
        (PERSISTENT_SEARCH_OID, ControlType::PersistentSearch),
        (POST_READ_OID, ControlType::PostRead),
        (PRE_READ_OID, ControlType::PreRead),
        (PROXY_AUTH_V1_OID, ControlType::ProxiedAuthV1),
        (PROXY_AUTH_OID, ControlType::ProxiedAuthV2),
        (REAL_ATTRS_ONLY_OID, ControlType::RealAttrsOnly),
        (SORT_REQUEST_OID, ControlType::ServerSideSort),
        (SORT_RESPONSE_OID, ControlType::ServerSideSortResp),
        (SUBENTRIES_OID, ControlType::Subentries),
        (SUBTREE_DELETE_OID, ControlType::SubtreeDelete),
        (VIRTUAL_ATTRS_ONLY_OID, ControlType::VirtualAttrsOnly),
        (VLV_REQUEST_OID, ControlType::VirtualListView),
        (VLV_RESPONSE_OID, ControlType::VirtualListViewResp),
    ])
});

/// Look up the control type implemented for an OID.
pub fn control_type(oid: &str) -> Option<ControlType> {
    CONTROLS.get(oid).copied()
}

/// Conversion trait for single control instances.
///
/// Controls travel in vectors, as dictated by the LDAP specification, but most
/// uses involve a single instance. If a control implements this trait, its
/// single instance may be used wherever a control vector is expected.
pub trait IntoRawControlVec {
    /// Create a control vector.
    fn into(self) -> Vec<RawControl>;
}

/// Trivial implementation for a control vector, returning itself.
impl IntoRawControlVec for Vec<RawControl> {
    fn into(self) -> Vec<RawControl> {
        self
    }
}

/// Blanket implementation for any control. The vector is constructed by the conversion
/// method.
impl<R> IntoRawControlVec for R
where
    RawControl: From<R>,
{
    fn into(self) -> Vec<RawControl> {
        vec![std::convert::Into::into(self)]
    }
}

/// Mark a control as critical.
///
/// All controls are instantiated as non-critical by default, unless dictated
/// otherwise by their specification.
pub trait MakeCritical {
    /// Mark the control instance as critical. This operation consumes the control,
    /// and is irreversible.
    fn critical(self) -> CriticalControl<Self>
    where
        Self: Sized,
    {
        CriticalControl { control: self }
    }
}

/// Wrapper for a control marked as critical.
///
/// The wrapper ensures that the criticality of the control will be set to
/// true when the control is encoded.
#[derive(Clone, Debug)]
pub struct CriticalControl<T> {
    control: T,
}

impl<T> From<CriticalControl<T>> for RawControl
where
    T: Into<RawControl>,
{
    fn from(cc: CriticalControl<T>) -> RawControl {
        let mut rc = cc.control.into();
        rc.crit = true;
        rc
    }
}

/// Conversion trait for control values.
///
/// Both request and response controls implement it, so that a client can parse
/// what a server sends and a server can parse what a client sends.
pub trait ControlParser: Sized {
    /// Convert the raw BER value into a control-specific struct.
    fn parse(val: &[u8]) -> std::result::Result<Self, DecodeError>;

    /// Construct the control when the value is absent.
    ///
    /// Controls for which the value is optional or forbidden override this;
    /// by default, a missing value is an error.
    fn parse_absent() -> std::result::Result<Self, DecodeError> {
        Err(DecodeError::MissingValue)
    }
}

/// Decoded control.
///
/// If the OID is recognized as corresponding to one of controls implemented by this
/// library, the first element will have a value, otherwise it will be `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct Control(pub Option<ControlType>, pub RawControl);

/// Generic control.
///
/// This struct is used both for request and response controls. An implemented
/// control is converted into it with `into()`, and recovered from it with the
/// type-qualified [`parse()`](#method.parse).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawControl {
    /// OID of the control.
    pub ctype: String,
    /// Criticality.
    pub crit: bool,
    /// Raw value of the control, if any.
    pub val: Option<Vec<u8>>,
}

impl RawControl {
    /// Parse the generic control into a control-specific struct.
    ///
    /// Any failure is reported as `LdapError::ControlDecoding`, which carries
    /// the protocolError result code. The OID isn't checked against the target
    /// type, so that a control recognized under a different OID can still be parsed.
    pub fn parse<T: ControlParser>(&self) -> Result<T> {
        match self.val {
            Some(ref val) => T::parse(val),
            None => T::parse_absent(),
        }
        .map_err(|source| LdapError::ControlDecoding {
            oid: self.ctype.clone(),
            source,
        })
    }

    /// Set the criticality, returning the modified control.
    pub fn with_crit(mut self, crit: bool) -> Self {
        self.crit = crit;
        self
    }
}

const CONTROL_ALIASES: &[(&str, &str)] = &[
    ("accountusable", oid::ACCOUNT_USABLE_OID),
    ("accountusability", oid::ACCOUNT_USABLE_OID),
    ("adnotification", oid::AD_NOTIFICATION_OID),
    ("notification", oid::AD_NOTIFICATION_OID),
    ("authzid", oid::AUTHZID_REQUEST_OID),
    ("authorizationidentity", oid::AUTHZID_REQUEST_OID),
    ("effectiverights", oid::GET_EFFECTIVE_RIGHTS_OID),
    ("geteffectiverights", oid::GET_EFFECTIVE_RIGHTS_OID),
    ("ldupsubentries", oid::LDUP_SUBENTRIES_OID),
    ("managedsait", oid::MANAGE_DSA_IT_OID),
    ("noop", oid::NOOP_OID),
    ("no-op", oid::NOOP_OID),
    ("passwordpolicy", oid::PASSWORD_POLICY_OID),
    ("pwpolicy", oid::PASSWORD_POLICY_OID),
    ("permissivemodify", oid::PERMISSIVE_MODIFY_OID),
    ("realattrsonly", oid::REAL_ATTRS_ONLY_OID),
    ("realattributesonly", oid::REAL_ATTRS_ONLY_OID),
    ("subentries", oid::SUBENTRIES_OID),
    ("subtreedelete", oid::SUBTREE_DELETE_OID),
    ("treedelete", oid::SUBTREE_DELETE_OID),
    ("virtualattrsonly", oid::VIRTUAL_ATTRS_ONLY_OID),
    ("virtualattributesonly", oid::VIRTUAL_ATTRS_ONLY_OID),
];

pub(crate) fn parse_flag(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Parse a control descriptor of the form `oid[:criticality[:value|::base64value]]`.
///
/// The OID may be replaced by one of the well-known control names, such as
/// `managedsait` or `pwpolicy`. Criticality accepts `true`/`false`, `yes`/`no`
/// and `1`/`0`, and defaults to false.
impl FromStr for RawControl {
    type Err = LdapError;

    fn from_str(s: &str) -> Result<RawControl> {
        let mut parts = s.splitn(3, ':');
        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(LdapError::InvalidDescriptor(s.to_owned()));
        }
        let lower = name.to_ascii_lowercase();
        let ctype = match CONTROL_ALIASES.iter().find(|(alias, _)| *alias == lower) {
            Some((_, oid)) => (*oid).to_owned(),
            None => name.to_owned(),
        };
        let crit = match parts.next() {
            None => false,
            Some(crit) => {
                parse_flag(crit.trim()).ok_or_else(|| LdapError::InvalidDescriptor(s.to_owned()))?
            }
        };
        let val = match parts.next() {
            None => None,
            Some(encoded) if encoded.starts_with(':') => Some(BASE64.decode(&encoded[1..])?),
            Some(plain) => Some(plain.as_bytes().to_vec()),
        };
        Ok(RawControl { ctype, crit, val })
    }
}

/// Fail if a critical control isn't among the supported OIDs.
///
/// This is the check a server makes before processing an operation; the
/// resulting error carries the unavailableCriticalExtension result code.
/// Non-critical unsupported controls are ignored.
pub fn check_critical(ctrls: &[Control], supported: &[&str]) -> Result<()> {
    match ctrls
        .iter()
        .find(|Control(_, raw)| raw.crit && !supported.contains(&raw.ctype.as_str()))
    {
        Some(Control(_, raw)) => {
            debug!("unsupported critical control {}", raw.ctype);
            Err(LdapError::UnavailableCriticalExtension(raw.ctype.clone()))
        }
        None => Ok(()),
    }
}

/// Encode a control as an element of the `Controls` sequence.
pub fn build_tag(rc: RawControl) -> StructureTag {
    let mut seq = vec![Tag::OctetString(OctetString::new(rc.ctype))];
    if rc.crit {
        seq.push(Tag::Boolean(Boolean {
            inner: true,
            ..Default::default()
        }));
    }
    if let Some(val) = rc.val {
        seq.push(Tag::OctetString(OctetString::new(val)));
    }
    Tag::Sequence(Sequence {
        inner: seq,
        ..Default::default()
    })
    .into_structure()
}

/// Decode the `Controls` sequence of an LDAP message.
///
/// The tag of the enclosing element isn't checked, only that it's constructed.
/// Criticality is taken as sent; a FALSE written explicitly is accepted.
pub fn parse_controls(t: StructureTag) -> std::result::Result<Vec<Control>, DecodeError> {
    let tags = ber::components(t, "controls")?;
    let mut ctrls = Vec::with_capacity(tags.len());
    for ctrl in tags {
        let mut components = ber::sequence(ctrl, "control")?;
        let ctype = ber::next(&mut components, "control type")
            .and_then(|t| ber::string_elem(t, "control type"))?;
        let mut next = components.next();
        let mut crit = false;
        if let Some(t) = next.take_if(|t| t.is_universal(Types::Boolean)) {
            crit = ber::boolean(t, "criticality")?;
            next = components.next();
        }
        let val = match next {
            Some(t) => Some(ber::octets_elem(t, "control value")?),
            None => None,
        };
        ber::end(components, "control")?;
        let known_type = control_type(&ctype);
        if known_type.is_none() {
            debug!("unrecognized control {ctype}");
        }
        ctrls.push(Control(known_type, RawControl { ctype, crit, val }));
    }
    Ok(ctrls)
}

/// Wrap encoded controls in the `[0] Controls` element.
pub(crate) fn controls_tag(ctrls: Vec<RawControl>) -> Tag {
    Tag::StructureTag(StructureTag {
        id: 0,
        class: TagClass::Context,
        payload: lber::structure::PL::C(ctrls.into_iter().map(build_tag).collect()),
    })
}
