//! BER decoding.
//!
//! Parsers follow the `nom` convention: `Err(nom::Err::Incomplete(_))` means that
//! more input is needed, while `Error` and `Failure` mean that the input is not
//! valid BER. Only definite lengths are accepted.

use std::convert::TryFrom;

use crate::common::{TagClass, TagStructure};
use crate::structure::{PL, StructureTag};

use nom::bits::streaming as bits;
use nom::bytes::streaming::take;
use nom::combinator::map_opt;
use nom::error::{Error, ErrorKind, ParseError};
use nom::number::streaming as number;
use nom::sequence::tuple;
use nom::IResult;

/// Nesting limit for constructed values.
const MAX_DEPTH: usize = 64;

fn class_bits(i: (&[u8], usize)) -> IResult<(&[u8], usize), TagClass> {
    map_opt(bits::take(2usize), TagClass::from_u8)(i)
}

fn pc_bit(i: (&[u8], usize)) -> IResult<(&[u8], usize), TagStructure> {
    map_opt(bits::take(1usize), TagStructure::from_u8)(i)
}

fn tagnr_bits(i: (&[u8], usize)) -> IResult<(&[u8], usize), u64> {
    bits::take(5usize)(i)
}

fn failure<T>(i: &[u8], kind: ErrorKind) -> IResult<&[u8], T> {
    Err(nom::Err::Failure(Error::from_error_kind(i, kind)))
}

fn parse_identifier(i: &[u8]) -> IResult<&[u8], (TagClass, TagStructure, u64)> {
    let (mut i, (class, structure, low)) = nom::bits(tuple((class_bits, pc_bit, tagnr_bits)))(i)?;
    if low != 0x1F {
        return Ok((i, (class, structure, low)));
    }
    // High tag number form: base-128 digits, high bit set on all but the last.
    let mut id = 0u64;
    loop {
        let (j, byte) = number::be_u8(i)?;
        if id >> 57 != 0 {
            return failure(i, ErrorKind::TooLarge);
        }
        i = j;
        id = (id << 7) | u64::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            break;
        }
    }
    Ok((i, (class, structure, id)))
}

fn parse_length(i: &[u8]) -> IResult<&[u8], usize> {
    let (i, len) = number::be_u8(i)?;
    match len {
        0..=0x7F => Ok((i, usize::from(len))),
        0x80 => failure(i, ErrorKind::LengthValue),
        _ => {
            let count = usize::from(len & 0x7F);
            if count > std::mem::size_of::<u64>() {
                return failure(i, ErrorKind::TooLarge);
            }
            let (i, octets) = take(count)(i)?;
            let (_, len) = parse_uint(octets)?;
            match usize::try_from(len) {
                Ok(len) => Ok((i, len)),
                Err(_) => failure(i, ErrorKind::TooLarge),
            }
        }
    }
}

/// Parse the identifier and length octets of a BER element.
///
/// Returns the class, the encoding form, the tag number and the length of the
/// contents. The remaining input starts at the contents. Useful for checking
/// the size of a frame before all of it has arrived.
pub fn parse_header(i: &[u8]) -> IResult<&[u8], (TagClass, TagStructure, u64, usize)> {
    let (i, (class, structure, id)) = parse_identifier(i)?;
    let (i, len) = parse_length(i)?;
    Ok((i, (class, structure, id, len)))
}

/// Extract an unsigned integer value from BER data.
pub fn parse_uint(i: &[u8]) -> IResult<&[u8], u64> {
    Ok((i, i.iter().fold(0, |res, &byte| (res << 8) | u64::from(byte))))
}

/// Extract a signed (two's complement) integer value from BER data.
///
/// The whole input is consumed. Empty contents and values wider than
/// 64 bits are errors.
pub fn parse_int(i: &[u8]) -> IResult<&[u8], i64> {
    if i.is_empty() {
        return Err(nom::Err::Error(Error::from_error_kind(i, ErrorKind::Eof)));
    }
    if i.len() > std::mem::size_of::<i64>() {
        return failure(i, ErrorKind::TooLarge);
    }
    let init: i64 = if i[0] & 0x80 != 0 { -1 } else { 0 };
    let val = i.iter().fold(init, |res, &byte| (res << 8) | i64::from(byte));
    Ok((&i[i.len()..], val))
}

/// Extract a boolean value from BER data.
///
/// The contents must be exactly one octet; any non-zero octet is TRUE.
pub fn parse_bool(i: &[u8]) -> IResult<&[u8], bool> {
    match i {
        [b] => Ok((&i[1..], *b != 0)),
        _ => Err(nom::Err::Error(Error::from_error_kind(i, ErrorKind::LengthValue))),
    }
}

fn parse_tag_nested(i: &[u8], depth: usize) -> IResult<&[u8], StructureTag> {
    if depth > MAX_DEPTH {
        return failure(i, ErrorKind::TooLarge);
    }
    let (i, (class, structure, id, len)) = parse_header(i)?;
    let (i, content) = take(len)(i)?;
    let payload = match structure {
        TagStructure::Primitive => PL::P(content.to_vec()),
        TagStructure::Constructed => {
            let mut rest = content;
            let mut children = Vec::new();
            while !rest.is_empty() {
                // Contents are complete at this point, so running short inside
                // them is a malformed length rather than a partial frame.
                let (j, child) = match parse_tag_nested(rest, depth + 1) {
                    Err(nom::Err::Incomplete(_)) => return failure(rest, ErrorKind::Eof),
                    res => res?,
                };
                rest = j;
                children.push(child);
            }
            PL::C(children)
        }
    };
    Ok((
        i,
        StructureTag {
            class,
            id,
            payload,
        },
    ))
}

/// Parse raw BER data into a serializable structure.
pub fn parse_tag(i: &[u8]) -> IResult<&[u8], StructureTag> {
    parse_tag_nested(i, 0)
}
