use super::ASNTag;
use crate::common::TagClass;
use crate::structure::{PL, StructureTag};
use crate::universal::Types;

/// Boolean value, encoded as `0xFF` for TRUE and `0x00` for FALSE.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Boolean {
    pub id: u64,
    pub class: TagClass,
    pub inner: bool,
}

impl ASNTag for Boolean {
    fn into_structure(self) -> StructureTag {
        StructureTag {
            id: self.id,
            class: self.class,
            payload: PL::P(vec![if self.inner { 0xFF } else { 0x00 }]),
        }
    }
}

impl Default for Boolean {
    fn default() -> Self {
        Boolean {
            id: Types::Boolean as u64,
            class: TagClass::Universal,
            inner: false,
        }
    }
}
