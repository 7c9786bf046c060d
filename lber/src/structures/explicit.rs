use super::{ASNTag, Tag};
use crate::common::TagClass;
use crate::structure::{PL, StructureTag};

/// Explicitly tagged value.
///
/// There is no sensible default tag for an explicit wrapper, so `Default`
/// isn't implemented.
#[derive(Clone, Debug, PartialEq)]
pub struct ExplicitTag {
    pub id: u64,
    pub class: TagClass,
    pub inner: Box<Tag>,
}

impl ASNTag for ExplicitTag {
    fn into_structure(self) -> StructureTag {
        StructureTag {
            id: self.id,
            class: self.class,
            payload: PL::C(vec![self.inner.into_structure()]),
        }
    }
}
