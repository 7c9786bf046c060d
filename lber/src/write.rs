//! BER encoding support.
use crate::common::{TagClass, TagStructure};
use crate::structure::{PL, StructureTag};
use bytes::BytesMut;

use std::io;

/// BER-encode a tag structure into the provided buffer.
pub fn encode_into(buf: &mut BytesMut, tag: StructureTag) -> io::Result<()> {
    let mut out = Vec::new();
    encode_inner(&mut out, tag);
    buf.extend_from_slice(&out);
    Ok(())
}

/// BER-encode a tag structure into a new vector.
pub fn encode(tag: StructureTag) -> Vec<u8> {
    let mut out = Vec::new();
    encode_inner(&mut out, tag);
    out
}

fn encode_inner(out: &mut Vec<u8>, tag: StructureTag) {
    match tag.payload {
        PL::P(contents) => {
            write_identifier(out, tag.class, TagStructure::Primitive, tag.id);
            write_length(out, contents.len());
            out.extend_from_slice(&contents);
        }
        PL::C(children) => {
            write_identifier(out, tag.class, TagStructure::Constructed, tag.id);
            let mut contents = Vec::new();
            for child in children {
                encode_inner(&mut contents, child);
            }
            write_length(out, contents.len());
            out.extend_from_slice(&contents);
        }
    }
}

fn write_identifier(out: &mut Vec<u8>, class: TagClass, structure: TagStructure, id: u64) {
    let leading = (class as u8) << 6 | (structure as u8) << 5;
    if id < 0x1F {
        out.push(leading | id as u8);
        return;
    }
    out.push(leading | 0x1F);
    // Base-128, most significant group first, continuation bit on all but the last.
    let groups = (64 - id.leading_zeros()).div_ceil(7);
    for n in (0..groups).rev() {
        let group = ((id >> (7 * n)) & 0x7F) as u8;
        out.push(if n > 0 { group | 0x80 } else { group });
    }
}

fn write_length(out: &mut Vec<u8>, length: usize) {
    if length < 0x80 {
        out.push(length as u8);
        return;
    }
    let repr = length.to_be_bytes();
    let skip = repr.iter().take_while(|&&b| b == 0).count();
    out.push(0x80 | (repr.len() - skip) as u8);
    out.extend_from_slice(&repr[skip..]);
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use crate::common::TagClass::*;
    use crate::structure::{PL, StructureTag};
    use crate::structures::*;

    #[test]
    fn simple_integer() {
        let tag = Tag::Integer(Integer {
            inner: 1616,
            ..Default::default()
        });
        let mut buf = BytesMut::new();
        super::encode_into(&mut buf, tag.into_structure()).unwrap();
        assert_eq!(buf, vec![0x2, 0x2, 0x06, 0x50]);
    }

    #[test]
    fn nested_sequence() {
        let tag = Tag::Sequence(Sequence {
            inner: vec![
                Tag::Integer(Integer {
                    inner: 1,
                    ..Default::default()
                }),
                Tag::Sequence(Sequence {
                    id: 0,
                    class: Application,
                    inner: vec![
                        Tag::Integer(Integer {
                            inner: 3,
                            ..Default::default()
                        }),
                        Tag::OctetString(OctetString {
                            inner: b"cn=root,dc=plabs".to_vec(),
                            ..Default::default()
                        }),
                        Tag::OctetString(OctetString {
                            id: 0,
                            class: Context,
                            inner: b"asdf".to_vec(),
                        }),
                    ],
                }),
            ],
            ..Default::default()
        });
        let expected = vec![
            0x30, 0x20, 0x02, 0x01, 0x01, 0x60, 0x1B, 0x02, 0x01, 0x03, 0x04, 0x10, 0x63, 0x6e,
            0x3d, 0x72, 0x6f, 0x6f, 0x74, 0x2c, 0x64, 0x63, 0x3d, 0x70, 0x6c, 0x61, 0x62, 0x73,
            0x80, 0x04, 0x61, 0x73, 0x64, 0x66,
        ];
        assert_eq!(super::encode(tag.into_structure()), expected);
    }

    #[test]
    fn long_length() {
        let tag = StructureTag {
            class: Universal,
            id: 4,
            payload: PL::P(vec![0; 300]),
        };
        let out = super::encode(tag);
        assert_eq!(&out[..4], &[0x04, 0x82, 0x01, 0x2C]);
        assert_eq!(out.len(), 304);
    }

    #[test]
    fn high_tag_number() {
        let tag = StructureTag {
            class: Context,
            id: 128,
            payload: PL::P(vec![]),
        };
        assert_eq!(super::encode(tag), vec![0x9F, 0x81, 0x00, 0x00]);
    }
}
