//! Checked accessors for decoding BER element trees.
//!
//! Each accessor takes a short description of the element it expects, which
//! ends up in the `DecodeError` when the element doesn't fit.

use std::vec;

use crate::result::DecodeError;

use lber::common::TagClass;
use lber::parse::{parse_bool, parse_int, parse_tag};
use lber::structure::StructureTag;
use lber::structures::{ASNTag, Tag};
use lber::universal::Types;
use lber::write;

type Result<T> = std::result::Result<T, DecodeError>;

/// Parse a control value holding exactly one BER element.
pub(crate) fn parse_value(val: &[u8], what: &'static str) -> Result<StructureTag> {
    match parse_tag(val) {
        Ok((rest, tag)) if rest.is_empty() => Ok(tag),
        Ok(_) => Err(DecodeError::TrailingData(what)),
        Err(_) => Err(DecodeError::Ber),
    }
}

/// Serialize a single element into a control value.
pub(crate) fn encode_value(tag: Tag) -> Vec<u8> {
    write::encode(tag.into_structure())
}

/// Children of a constructed element, regardless of its tag.
pub(crate) fn components(tag: StructureTag, what: &'static str) -> Result<vec::IntoIter<StructureTag>> {
    tag.expect_constructed()
        .map(Vec::into_iter)
        .ok_or(DecodeError::Expected(what))
}

/// Children of a universal SEQUENCE.
pub(crate) fn sequence(tag: StructureTag, what: &'static str) -> Result<vec::IntoIter<StructureTag>> {
    components(universal(tag, Types::Sequence, what)?, what)
}

/// Next element of a sequence, which must be present.
pub(crate) fn next(it: &mut vec::IntoIter<StructureTag>, what: &'static str) -> Result<StructureTag> {
    it.next().ok_or(DecodeError::Expected(what))
}

/// Fail if the sequence has elements left.
pub(crate) fn end(mut it: vec::IntoIter<StructureTag>, what: &'static str) -> Result<()> {
    match it.next() {
        None => Ok(()),
        Some(_) => Err(DecodeError::ExtraElement(what)),
    }
}

pub(crate) fn universal(tag: StructureTag, ty: Types, what: &'static str) -> Result<StructureTag> {
    if tag.is_universal(ty) {
        Ok(tag)
    } else {
        Err(DecodeError::Expected(what))
    }
}

pub(crate) fn context(tag: StructureTag, id: u64, what: &'static str) -> Result<StructureTag> {
    if tag.is(TagClass::Context, id) {
        Ok(tag)
    } else {
        Err(DecodeError::Expected(what))
    }
}

/// Contents of a primitive element.
pub(crate) fn bytes(tag: StructureTag, what: &'static str) -> Result<Vec<u8>> {
    tag.expect_primitive().ok_or(DecodeError::Expected(what))
}

/// Contents of a primitive element as UTF-8.
pub(crate) fn string(tag: StructureTag, what: &'static str) -> Result<String> {
    String::from_utf8(bytes(tag, what)?).map_err(|_| DecodeError::Utf8(what))
}

/// Signed integer contents; the tag isn't checked.
pub(crate) fn int(tag: StructureTag, what: &'static str) -> Result<i64> {
    let val = tag.as_primitive().ok_or(DecodeError::Expected(what))?;
    parse_int(val)
        .map(|(_, v)| v)
        .map_err(|_| DecodeError::Invalid {
            what,
            detail: format!("{} integer octets", val.len()),
        })
}

/// Signed integer contents which must fit in 32 bits.
pub(crate) fn int32(tag: StructureTag, what: &'static str) -> Result<i32> {
    let val = int(tag, what)?;
    i32::try_from(val).map_err(|_| DecodeError::Invalid {
        what,
        detail: format!("{val} out of range"),
    })
}

/// Boolean contents; the tag isn't checked.
pub(crate) fn boolean(tag: StructureTag, what: &'static str) -> Result<bool> {
    let val = tag.as_primitive().ok_or(DecodeError::Expected(what))?;
    parse_bool(val).map(|(_, v)| v).map_err(|_| DecodeError::Invalid {
        what,
        detail: format!("{} boolean octets", val.len()),
    })
}

/// Universal INTEGER element.
pub(crate) fn integer_elem(tag: StructureTag, what: &'static str) -> Result<i32> {
    int32(universal(tag, Types::Integer, what)?, what)
}

/// Universal ENUMERATED element.
pub(crate) fn enumerated_elem(tag: StructureTag, what: &'static str) -> Result<i64> {
    int(universal(tag, Types::Enumerated, what)?, what)
}

/// Universal BOOLEAN element.
pub(crate) fn boolean_elem(tag: StructureTag, what: &'static str) -> Result<bool> {
    boolean(universal(tag, Types::Boolean, what)?, what)
}

/// Universal OCTET STRING element.
pub(crate) fn octets_elem(tag: StructureTag, what: &'static str) -> Result<Vec<u8>> {
    bytes(universal(tag, Types::OctetString, what)?, what)
}

/// Universal OCTET STRING element holding UTF-8 text.
pub(crate) fn string_elem(tag: StructureTag, what: &'static str) -> Result<String> {
    string(universal(tag, Types::OctetString, what)?, what)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_value_only() {
        assert!(parse_value(&[0x04, 0x01, 0x61], "value").is_ok());
        assert_eq!(
            parse_value(&[0x04, 0x01, 0x61, 0x00], "value"),
            Err(DecodeError::TrailingData("value"))
        );
        assert_eq!(parse_value(&[0x04, 0x05, 0x61], "value"), Err(DecodeError::Ber));
        assert_eq!(parse_value(&[], "value"), Err(DecodeError::Ber));
    }

    #[test]
    fn typed_elements() {
        let tag = parse_value(&[0x02, 0x01, 0xFE], "int").unwrap();
        assert_eq!(integer_elem(tag.clone(), "int"), Ok(-2));
        assert_eq!(boolean_elem(tag, "bool"), Err(DecodeError::Expected("bool")));
        let tag = parse_value(&[0x02, 0x05, 0x01, 0x00, 0x00, 0x00, 0x00], "int").unwrap();
        assert!(matches!(
            integer_elem(tag, "int"),
            Err(DecodeError::Invalid { what: "int", .. })
        ));
    }

    #[test]
    fn sequence_bounds() {
        let tag = parse_value(&[0x30, 0x03, 0x01, 0x01, 0x00], "seq").unwrap();
        let mut it = sequence(tag, "seq").unwrap();
        assert_eq!(boolean_elem(next(&mut it, "flag").unwrap(), "flag"), Ok(false));
        assert_eq!(next(&mut it, "more"), Err(DecodeError::Expected("more")));
        assert!(end(it, "seq").is_ok());
    }
}
