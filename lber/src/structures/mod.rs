//! Typed builders for the ASN.1 values used by LDAP.
//!
//! Every builder carries its own class and tag number, defaulting to the
//! universal tag of its type, so implicitly tagged LDAP elements are built by
//! overriding `class` and `id`.

use crate::structure::StructureTag;

pub mod boolean;
pub mod explicit;
pub mod integer;
pub mod null;
pub mod octetstring;
pub mod sequence;

pub use self::boolean::Boolean;
pub use self::explicit::ExplicitTag;
pub use self::integer::{Enumerated, Integer};
pub use self::null::Null;
pub use self::octetstring::OctetString;
pub use self::sequence::{Sequence, SequenceOf, Set, SetOf};

/// Conversion of a typed value into its serializable form.
///
/// Only the payload encoding differs between types; class and tag number are
/// carried through unchanged and serialized in one place by the writer.
pub trait ASNTag {
    fn into_structure(self) -> StructureTag;
}

/// Set of basic ASN.1 types used by LDAP.
#[derive(Clone, Debug, PartialEq)]
pub enum Tag {
    Integer(Integer),
    Enumerated(Enumerated),
    Sequence(Sequence),
    /// Set of values; doesn't allow duplicates.
    Set(Set),
    OctetString(OctetString),
    Boolean(Boolean),
    Null(Null),
    /// Explicitly tagged value. LDAP uses implicit tagging, but external structures might not.
    ExplicitTag(ExplicitTag),
    /// Value which is already in serializable form.
    StructureTag(StructureTag),
}

impl ASNTag for Tag {
    fn into_structure(self) -> StructureTag {
        match self {
            Tag::Integer(i) => i.into_structure(),
            Tag::Enumerated(i) => i.into_structure(),
            Tag::Sequence(i) => i.into_structure(),
            Tag::Set(i) => i.into_structure(),
            Tag::OctetString(i) => i.into_structure(),
            Tag::Boolean(i) => i.into_structure(),
            Tag::Null(i) => i.into_structure(),
            Tag::ExplicitTag(i) => i.into_structure(),
            Tag::StructureTag(s) => s,
        }
    }
}

impl ASNTag for StructureTag {
    fn into_structure(self) -> StructureTag {
        self
    }
}
