//! Basic Encoding Rules support for LDAP.
//!
//! The crate models BER values as [`StructureTag`](structure/struct.StructureTag.html)
//! trees. Typed builders in [`structures`](structures/index.html) produce those trees,
//! [`write`](write/index.html) serializes them, and [`parse`](parse/index.html) turns
//! raw bytes back into a tree. Only definite-length encodings are supported, which
//! is all that LDAP permits.

pub mod common;
pub mod parse;
pub mod structure;
pub mod structures;
pub mod universal;
pub mod write;

pub use nom::IResult;
