use super::ASNTag;
use crate::common::TagClass;
use crate::structure::{PL, StructureTag};
use crate::universal::Types;

/// String of bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct OctetString {
    pub id: u64,
    pub class: TagClass,
    pub inner: Vec<u8>,
}

impl OctetString {
    /// Universal OCTET STRING with the given contents.
    pub fn new(inner: impl Into<Vec<u8>>) -> Self {
        OctetString {
            inner: inner.into(),
            ..Default::default()
        }
    }

    /// Context-tagged primitive with the given contents.
    pub fn context(id: u64, inner: impl Into<Vec<u8>>) -> Self {
        OctetString {
            id,
            class: TagClass::Context,
            inner: inner.into(),
        }
    }
}

impl ASNTag for OctetString {
    fn into_structure(self) -> StructureTag {
        StructureTag {
            id: self.id,
            class: self.class,
            payload: PL::P(self.inner),
        }
    }
}

impl Default for OctetString {
    fn default() -> Self {
        OctetString {
            id: Types::OctetString as u64,
            class: TagClass::Universal,
            inner: Vec::new(),
        }
    }
}
