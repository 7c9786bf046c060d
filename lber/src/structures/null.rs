use super::ASNTag;
use crate::common::TagClass;
use crate::structure::{PL, StructureTag};
use crate::universal::Types;

/// Null value; also used for value-less implicitly tagged elements.
#[derive(Clone, Debug, PartialEq)]
pub struct Null {
    pub id: u64,
    pub class: TagClass,
    pub inner: (),
}

impl ASNTag for Null {
    fn into_structure(self) -> StructureTag {
        StructureTag {
            id: self.id,
            class: self.class,
            payload: PL::P(Vec::new()),
        }
    }
}

impl Default for Null {
    fn default() -> Self {
        Null {
            id: Types::Null as u64,
            class: TagClass::Universal,
            inner: (),
        }
    }
}
