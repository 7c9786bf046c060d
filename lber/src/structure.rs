use crate::common::TagClass;
use crate::universal::Types;

/// ASN.1 structure prepared for serialization.
#[derive(Clone, PartialEq, Debug, Eq)]
pub struct StructureTag {
    pub class: TagClass,
    pub id: u64,
    pub payload: PL,
}

/// Tagged value payload.
#[derive(Clone, PartialEq, Debug, Eq)]
pub enum PL {
    /// Primitive value.
    P(Vec<u8>),
    /// Constructed value.
    C(Vec<StructureTag>),
}

impl StructureTag {
    pub fn match_class(self, class: TagClass) -> Option<Self> {
        if self.class == class { Some(self) } else { None }
    }

    pub fn match_id(self, id: u64) -> Option<Self> {
        if self.id == id { Some(self) } else { None }
    }

    /// Check class and tag number without consuming the tag.
    pub fn is(&self, class: TagClass, id: u64) -> bool {
        self.class == class && self.id == id
    }

    /// Check for a universal tag of the given type.
    pub fn is_universal(&self, ty: Types) -> bool {
        self.is(TagClass::Universal, ty as u64)
    }

    pub fn is_constructed(&self) -> bool {
        matches!(self.payload, PL::C(_))
    }

    pub fn expect_constructed(self) -> Option<Vec<StructureTag>> {
        match self.payload {
            PL::P(_) => None,
            PL::C(i) => Some(i),
        }
    }

    pub fn expect_primitive(self) -> Option<Vec<u8>> {
        match self.payload {
            PL::P(i) => Some(i),
            PL::C(_) => None,
        }
    }

    /// Borrow the contents of a primitive value.
    pub fn as_primitive(&self) -> Option<&[u8]> {
        match self.payload {
            PL::P(ref i) => Some(i),
            PL::C(_) => None,
        }
    }
}
