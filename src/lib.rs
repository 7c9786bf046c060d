//! Codecs for LDAP controls and the LDAP message envelope.
//!
//! ## Usage
//!
//! In `Cargo.toml`:
//!
//! ```toml
//! [dependencies.ldap-controls]
//! version = "0.1.0"
//! ```
//!
//! ## Summary
//!
//! An LDAP control is an OID, a criticality flag and an optional BER-encoded
//! value, attached to a request or a response. This library converts between
//! typed control structures and that generic form, which is represented by
//! [`RawControl`](controls/struct.RawControl.html). The [`controls`](controls/index.html)
//! module describes the conversions, and lists the implemented controls.
//!
//! Controls travel inside the LDAPMessage envelope. [`LdapCodec`](struct.LdapCodec.html)
//! is a `tokio-util` codec which frames and decodes envelopes, with their controls,
//! from a byte stream, and encodes them in the other direction. Protocol
//! operations are left in their raw ASN.1 form, apart from the pieces some
//! controls need: search [filters](enum.Filter.html), [search entries](struct.SearchEntry.html)
//! and [operation results](result/struct.LdapResult.html).
//!
//! The documentation is written for readers familiar with LDAP concepts and terminology,
//! which it won't attempt to explain.
//!
//! ## Example
//!
//! ```rust
//! use ldap_controls::controls::{PagedResults, RawControl, ServerSideSort};
//! use ldap_controls::result::Result;
//!
//! fn main() -> Result<()> {
//!     let sort: ServerSideSort = "-modifyTimestamp".parse()?;
//!     let ctrls: Vec<RawControl> = vec![
//!         PagedResults { size: 100, cookie: vec![] }.into(),
//!         sort.into(),
//!     ];
//!     let paged = ctrls[0].parse::<PagedResults>()?;
//!     assert_eq!(paged.size, 100);
//!     Ok(())
//! }
//! ```

#[doc(hidden)]
#[macro_use]
pub extern crate log;

/// Type alias for the LDAP message ID.
pub type RequestId = i32;

pub mod asn1 {
    //! ASN.1 structure construction and parsing.
    //!
    //! This section is deliberately under-documented. If you need examples of using
    //! the present interface for, e.g., implementing a new control, consult the source
    //! of the existing controls.
    pub use lber::IResult;
    pub use lber::common::TagClass;
    pub use lber::parse::{parse_tag, parse_uint};
    pub use lber::structure::{PL, StructureTag};
    pub use lber::structures::{
        ASNTag, Boolean, Enumerated, ExplicitTag, Integer, Null, OctetString, Sequence, Set, Tag,
    };
    pub use lber::universal::Types;
    pub use lber::write;
}
mod ber;
pub mod controls {
    //! Control construction and parsing.
    //!
    //! A control can be associated with a request or a response. If an implemented
    //! control has the same form for the request and the response, there will be a
    //! single structure for both. (This is the case for `PagedResults`.) If the
    //! response control is different, its name will consist of the request control
    //! name with the `Resp` suffix.
    //!
    //! A control is encoded by converting its structure into a [`RawControl`](struct.RawControl.html),
    //! the general form of a control, with `into()`. Any control can be marked as critical
    //! by calling [`critical()`](trait.MakeCritical.html#method.critical) on it before the
    //! conversion. A third-party control must implement the conversion from an instance
    //! of itself to `RawControl`.
    //!
    //! `RawControl`, together with an optional instance of [`ControlType`](enum.ControlType.html),
    //! forms the type [`Control`](struct.Control.html), which is what the decoder of a
    //! message produces for each control in it.
    //!
    //! The first element of `Control` will have a value if the decoder recognizes
    //! the control's OID as one that is implemented by the library itself. Since the
    //! list of implemented controls is expected to grow, the `ControlType` enum cannot
    //! be exhaustively matched.
    //!
    //! A recognized control can be decoded by calling [`parse()`](struct.RawControl.html#method.parse)
    //! on the instance of `RawControl` representing it. A third-party control must implement
    //! the [`ControlParser`](trait.ControlParser.html) trait to support this interface.
    //! Decoding never panics; a malformed value produces an error whose
    //! [result code](../result/enum.LdapError.html#method.result_code) is protocolError.
    //!
    //! Controls can also be written as strings of the form `oid[:crit[:value]]`, where
    //! a value following a double colon is base64-encoded, and the OID can be replaced by
    //! a short name like `managedsait` or `pwpolicy`. Several controls have their own
    //! textual forms, parsed with `FromStr`.
    //!
    //! ### Example
    //!
    //! With a decoded message in `msg`, iterating through controls and matching the desired
    //! ones could be done like this:
    //!
    //! ```rust,no_run
    //! # use ldap_controls::controls::{Control, ControlType, PagedResults};
    //! # use ldap_controls::LdapMessage;
    //! # fn f(msg: LdapMessage) {
    //! for ctrl in msg.ctrls {
    //!     match ctrl {
    //!         // matching a control implemented by the library
    //!         Control(Some(ControlType::PagedResults), ref raw) => {
    //!             dbg!(raw.parse::<PagedResults>());
    //!         },
    //!         // matching a control unknown to the library
    //!         Control(None, ref raw) => {
    //!             dbg!(&raw.ctype);
    //!         },
    //!         _ => (),
    //!     }
    //! }
    //! # }
    //! ```
    pub use crate::controls_impl::oid;
    pub use crate::controls_impl::{
        AccountUnusable, AccountUsable, AccountUsableResp, AdNotification, Assertion,
        AuthzIdRequest, AuthzIdResp, GetEffectiveRights, LdupSubentries, ManageDsaIt,
        MatchedValues, NoOp, PagedResults, PermissiveModify, RealAttrsOnly, Subentries,
        SubtreeDelete, VirtualAttrsOnly,
    };
    pub use crate::controls_impl::{
        ChangeType, ChangeTypes, EntryChangeNotification, PersistentSearch,
    };
    pub use crate::controls_impl::{
        Control, ControlParser, ControlType, CriticalControl, IntoRawControlVec, MakeCritical,
        RawControl, check_critical, control_type,
    };
    pub use crate::controls_impl::{
        PasswordExpired, PasswordExpiring, PasswordPolicy, PasswordPolicyError, PasswordPolicyResp,
        PasswordPolicyWarning,
    };
    pub use crate::controls_impl::{PostRead, PostReadResp, PreRead, PreReadResp};
    pub use crate::controls_impl::{ProxyAuth, ProxyAuthV1};
    pub use crate::controls_impl::{ServerSideSort, ServerSideSortResp, SortKey};
    pub use crate::controls_impl::{VirtualListView, VirtualListViewResp, VlvTarget};
}
mod controls_impl;
mod filter;
mod protocol;
pub mod result;
mod search;
mod util;

pub use filter::{Filter, parse as parse_filter, parse_matched_values};
pub use protocol::{
    CodecSettings, DEFAULT_MAX_MESSAGE_SIZE, LdapCodec, LdapMessage, MaybeControls,
};
pub use result::{LdapError, LdapResult};
pub use search::{SearchEntry, parse_refs};
pub use util::ldap_escape;
