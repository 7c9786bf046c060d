//! Error types and the LDAP result structure.
//!
//! Malformed input never panics. Problems found while decoding a single
//! element are described by [`DecodeError`](enum.DecodeError.html); they reach
//! callers wrapped in an [`LdapError`](enum.LdapError.html), which knows the
//! LDAP result code a server should return for it.

use std::error::Error;
use std::fmt;
use std::io;
use std::result::Result as StdResult;

use crate::ber;
use crate::controls::Control;
use crate::search::parse_refs;

use lber::common::TagClass;
use lber::structure::StructureTag;
use lber::structures::{Enumerated, OctetString, Sequence, Tag};
use lber::universal::Types;

use thiserror::Error;

/// Type alias for the standard `Result` with the fixed `LdapError` error part.
pub type Result<T> = std::result::Result<T, LdapError>;

pub const SUCCESS: u32 = 0;
pub const OPERATIONS_ERROR: u32 = 1;
pub const PROTOCOL_ERROR: u32 = 2;
pub const UNAVAILABLE_CRITICAL_EXTENSION: u32 = 12;
pub const OTHER: u32 = 80;
/// Client-side result code for bad parameters (not sent on the wire).
pub const PARAM_ERROR: u32 = 89;

/// Reason why a BER value could not be decoded.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The control requires a value, but has none.
    #[error("control value is missing")]
    MissingValue,

    /// The control must not have a value, but has one.
    #[error("control must not have a value")]
    UnexpectedValue,

    /// The bytes are not a well-formed BER element.
    #[error("malformed BER data")]
    Ber,

    /// Extra bytes follow a complete element.
    #[error("trailing data after {0}")]
    TrailingData(&'static str),

    /// A required element is absent or has the wrong tag or form.
    #[error("expected {0}")]
    Expected(&'static str),

    /// A sequence has more elements than its definition allows.
    #[error("unexpected extra element in {0}")]
    ExtraElement(&'static str),

    /// An element is well-formed but its value is out of range.
    #[error("invalid {what}: {detail}")]
    Invalid { what: &'static str, detail: String },

    /// A string element isn't valid UTF-8.
    #[error("{0} is not valid UTF-8")]
    Utf8(&'static str),
}

/// Error variants recognized by the library.
#[derive(Debug, Error)]
pub enum LdapError {
    /// Encapsulated I/O error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Decoding of a control value failed.
    #[error("cannot decode control {oid}: {source}")]
    ControlDecoding {
        oid: String,
        #[source]
        source: DecodeError,
    },

    /// Decoding of a protocol element other than a control value failed.
    #[error("decoding error: {source}")]
    Decoding {
        #[from]
        source: DecodeError,
    },

    /// A message exceeds the configured size limit.
    #[error("message of {size} bytes exceeds the limit of {limit}")]
    MessageTooLarge { size: usize, limit: usize },

    /// A critical control isn't supported by the receiver.
    #[error("unavailable critical extension: {0}")]
    UnavailableCriticalExtension(String),

    /// Error parsing the string representation of a search filter.
    #[error("filter parse error")]
    FilterParsing,

    /// A filter can't be used in the Matched Values control.
    #[error("invalid matched values filter: {0}")]
    MatchedValuesFilter(String),

    /// Error parsing a control descriptor string.
    #[error("invalid control descriptor: {0}")]
    InvalidDescriptor(String),

    /// A control can't be built from the given values.
    #[error("invalid control: {0}")]
    InvalidControl(String),

    /// Base64 value in a control descriptor couldn't be decoded.
    #[error("base64 decoding error: {source}")]
    Base64 {
        #[from]
        source: base64::DecodeError,
    },

    /// LDAP operation result with an error return code.
    #[error("LDAP operation result: {result}")]
    LdapResult {
        #[from]
        result: LdapResult,
    },
}

impl LdapError {
    /// The LDAP result code corresponding to this error.
    ///
    /// Decoding failures map to protocolError, unsupported critical controls
    /// to unavailableCriticalExtension, and bad caller input to the client-side
    /// paramError.
    pub fn result_code(&self) -> u32 {
        match self {
            LdapError::ControlDecoding { .. }
            | LdapError::Decoding { .. }
            | LdapError::MessageTooLarge { .. } => PROTOCOL_ERROR,
            LdapError::UnavailableCriticalExtension(_) => UNAVAILABLE_CRITICAL_EXTENSION,
            LdapError::FilterParsing
            | LdapError::MatchedValuesFilter(_)
            | LdapError::InvalidDescriptor(_)
            | LdapError::InvalidControl(_)
            | LdapError::Base64 { .. } => PARAM_ERROR,
            LdapError::LdapResult { result } => result.rc,
            LdapError::Io { .. } => OTHER,
        }
    }
}

impl From<LdapError> for io::Error {
    fn from(le: LdapError) -> io::Error {
        match le {
            LdapError::Io { source, .. } => source,
            _ => io::Error::other(le.to_string()),
        }
    }
}

/// Textual name of an LDAP result code.
pub fn rc_description(rc: u32) -> &'static str {
    match rc {
        0 => "success",
        1 => "operationsError",
        2 => "protocolError",
        3 => "timeLimitExceeded",
        4 => "sizeLimitExceeded",
        5 => "compareFalse",
        6 => "compareTrue",
        7 => "authMethodNotSupported",
        8 => "strongerAuthRequired",
        10 => "referral",
        11 => "adminLimitExceeded",
        12 => "unavailableCriticalExtension",
        13 => "confidentialityRequired",
        14 => "saslBindInProgress",
        16 => "noSuchAttribute",
        17 => "undefinedAttributeType",
        18 => "inappropriateMatching",
        19 => "constraintViolation",
        20 => "attributeOrValueExists",
        21 => "invalidAttributeSyntax",
        32 => "noSuchObject",
        33 => "aliasProblem",
        34 => "invalidDNSyntax",
        36 => "aliasDereferencingProblem",
        48 => "inappropriateAuthentication",
        49 => "invalidCredentials",
        50 => "insufficientAccessRights",
        51 => "busy",
        52 => "unavailable",
        53 => "unwillingToPerform",
        54 => "loopDetect",
        60 => "sortControlMissing",
        61 => "offsetRangeError",
        64 => "namingViolation",
        65 => "objectClassViolation",
        66 => "notAllowedOnNonLeaf",
        67 => "notAllowedOnRDN",
        68 => "entryAlreadyExists",
        69 => "objectClassModsProhibited",
        71 => "affectsMultipleDSAs",
        76 => "virtualListViewError",
        80 => "other",
        88 => "abandoned",
        89 => "paramError",
        122 => "assertionFailed",
        _ => "unknown",
    }
}

/// Common components of an LDAP operation result.
///
/// The struct mirrors the components dictated by the standard. Helper methods
/// [`success()`](#method.success) and [`non_error()`](#method.non_error) adapt
/// it to `Result`-based error handling when simple condition checking suffices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LdapResult {
    /// Result code.
    ///
    /// See [Section A.1 of RFC 4511](https://tools.ietf.org/html/rfc4511#appendix-A.1).
    pub rc: u32,
    /// Matched component DN, where applicable.
    pub matched: String,
    /// Additional diagnostic text.
    pub text: String,
    /// Referrals.
    ///
    /// Absence of referrals is represented by an empty vector.
    pub refs: Vec<String>,
    /// Response controls.
    ///
    /// Missing and empty controls are both represented by an empty vector.
    pub ctrls: Vec<Control>,
}

impl Error for LdapResult {}

impl fmt::Display for LdapResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> StdResult<(), fmt::Error> {
        write!(
            f,
            "rc={} ({}), dn: \"{}\", text: \"{}\"",
            self.rc,
            rc_description(self.rc),
            self.matched,
            self.text
        )
    }
}

impl LdapResult {
    /// If the result code is zero, return the instance itself wrapped
    /// in `Ok()`, otherwise wrap the instance in an `LdapError`.
    pub fn success(self) -> Result<Self> {
        if self.rc == SUCCESS {
            Ok(self)
        } else {
            Err(LdapError::from(self))
        }
    }

    /// If the result code is 0 or 10 (referral), return the instance
    /// itself wrapped in `Ok()`, otherwise wrap the instance in an
    /// `LdapError`.
    pub fn non_error(self) -> Result<Self> {
        if self.rc == SUCCESS || self.rc == 10 {
            Ok(self)
        } else {
            Err(LdapError::from(self))
        }
    }

    /// Decode the LDAPResult components of a response operation.
    ///
    /// Components following the referral (such as an extended response name)
    /// are ignored. Controls are carried by the enclosing message and are left
    /// empty.
    pub fn from_tag(t: StructureTag) -> StdResult<LdapResult, DecodeError> {
        let mut tags = ber::components(t, "result sequence")?;
        let rc = ber::next(&mut tags, "result code")
            .and_then(|t| ber::universal(t, Types::Enumerated, "result code"))
            .and_then(|t| ber::int(t, "result code"))?;
        let rc = u32::try_from(rc).map_err(|_| DecodeError::Invalid {
            what: "result code",
            detail: rc.to_string(),
        })?;
        let matched = ber::next(&mut tags, "matched DN").and_then(|t| ber::string(t, "matched DN"))?;
        let text = ber::next(&mut tags, "diagnostic message")
            .and_then(|t| ber::string(t, "diagnostic message"))?;
        let mut refs = Vec::new();
        for comp in tags {
            if comp.is(TagClass::Context, 3) {
                refs.extend(parse_refs(comp)?);
            }
        }
        Ok(LdapResult {
            rc,
            matched,
            text,
            refs,
            ctrls: vec![],
        })
    }

    /// Encode as the response operation with the given application tag number.
    ///
    /// Controls aren't part of the operation and are not encoded.
    pub fn into_tag(self, op: u64) -> Tag {
        let mut inner = vec![
            Tag::Enumerated(Enumerated {
                inner: i64::from(self.rc),
                ..Default::default()
            }),
            Tag::OctetString(OctetString::new(self.matched)),
            Tag::OctetString(OctetString::new(self.text)),
        ];
        if !self.refs.is_empty() {
            inner.push(Tag::Sequence(Sequence {
                class: TagClass::Context,
                id: 3,
                inner: self
                    .refs
                    .into_iter()
                    .map(|r| Tag::OctetString(OctetString::new(r)))
                    .collect(),
            }));
        }
        Tag::Sequence(Sequence {
            class: TagClass::Application,
            id: op,
            inner,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use lber::structures::ASNTag;

    #[test]
    fn result_roundtrip() {
        let res = LdapResult {
            rc: 10,
            matched: "dc=example,dc=com".into(),
            text: "see elsewhere".into(),
            refs: vec!["ldap://other/".into()],
            ctrls: vec![],
        };
        let tag = res.clone().into_tag(5).into_structure();
        assert!(tag.is(TagClass::Application, 5));
        assert_eq!(LdapResult::from_tag(tag).unwrap(), res);
    }

    #[test]
    fn search_done_bytes() {
        let tag = LdapResult::default().into_tag(5).into_structure();
        assert_eq!(
            lber::write::encode(tag),
            vec![0x65, 0x07, 0x0A, 0x01, 0x00, 0x04, 0x00, 0x04, 0x00]
        );
    }

    #[test]
    fn truncated_result() {
        let tag = Tag::Sequence(Sequence {
            class: TagClass::Application,
            id: 5,
            inner: vec![Tag::Enumerated(Enumerated {
                inner: 0,
                ..Default::default()
            })],
        })
        .into_structure();
        assert_eq!(
            LdapResult::from_tag(tag),
            Err(DecodeError::Expected("matched DN"))
        );
    }

    #[test]
    fn error_codes() {
        let err = LdapError::ControlDecoding {
            oid: "1.2.3".into(),
            source: DecodeError::MissingValue,
        };
        assert_eq!(err.result_code(), PROTOCOL_ERROR);
        assert_eq!(
            err.to_string(),
            "cannot decode control 1.2.3: control value is missing"
        );
        let err = LdapError::UnavailableCriticalExtension("1.2.3".into());
        assert_eq!(err.result_code(), UNAVAILABLE_CRITICAL_EXTENSION);
        let err = LdapError::from(LdapResult {
            rc: 53,
            ..Default::default()
        });
        assert_eq!(err.result_code(), 53);
        assert!(err.to_string().contains("unwillingToPerform"));
    }
}
