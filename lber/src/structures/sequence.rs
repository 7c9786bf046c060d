use super::{ASNTag, Tag};
use crate::common::TagClass;
use crate::structure::{PL, StructureTag};
use crate::universal::Types;

fn constructed<T: ASNTag>(id: u64, class: TagClass, inner: Vec<T>) -> StructureTag {
    StructureTag {
        id,
        class,
        payload: PL::C(inner.into_iter().map(ASNTag::into_structure).collect()),
    }
}

/// Sequence of values.
#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    pub id: u64,
    pub class: TagClass,
    pub inner: Vec<Tag>,
}

impl ASNTag for Sequence {
    fn into_structure(self) -> StructureTag {
        constructed(self.id, self.class, self.inner)
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Sequence {
            id: Types::Sequence as u64,
            class: TagClass::Universal,
            inner: Vec::new(),
        }
    }
}

/// Set of values; doesn't allow duplicates.
#[derive(Clone, Debug, PartialEq)]
pub struct Set {
    pub id: u64,
    pub class: TagClass,
    pub inner: Vec<Tag>,
}

impl ASNTag for Set {
    fn into_structure(self) -> StructureTag {
        constructed(self.id, self.class, self.inner)
    }
}

impl Default for Set {
    fn default() -> Self {
        Set {
            id: Types::Set as u64,
            class: TagClass::Universal,
            inner: Vec::new(),
        }
    }
}

/// Homogeneous sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct SequenceOf<T> {
    pub id: u64,
    pub class: TagClass,
    pub inner: Vec<T>,
}

impl<T: ASNTag> ASNTag for SequenceOf<T> {
    fn into_structure(self) -> StructureTag {
        constructed(self.id, self.class, self.inner)
    }
}

impl<T: ASNTag> Default for SequenceOf<T> {
    fn default() -> Self {
        SequenceOf {
            id: Types::Sequence as u64,
            class: TagClass::Universal,
            inner: Vec::new(),
        }
    }
}

/// Homogeneous set.
#[derive(Clone, Debug, PartialEq)]
pub struct SetOf<T> {
    pub id: u64,
    pub class: TagClass,
    pub inner: Vec<T>,
}

impl<T: ASNTag> ASNTag for SetOf<T> {
    fn into_structure(self) -> StructureTag {
        constructed(self.id, self.class, self.inner)
    }
}

impl<T: ASNTag> Default for SetOf<T> {
    fn default() -> Self {
        SetOf {
            id: Types::Set as u64,
            class: TagClass::Universal,
            inner: Vec::new(),
        }
    }
}
