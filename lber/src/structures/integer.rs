use super::ASNTag;
use crate::common::TagClass;
use crate::structure::{PL, StructureTag};
use crate::universal::Types;

/// Integer value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Integer {
    pub id: u64,
    pub class: TagClass,
    pub inner: i64,
}

/// Integer with a different tag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Enumerated {
    pub id: u64,
    pub class: TagClass,
    pub inner: i64,
}

/// Minimal two's complement big-endian octets of `val`.
///
/// A leading octet is redundant when it only repeats the sign bit of the
/// octet after it.
fn int_octets(val: i64) -> Vec<u8> {
    let repr = val.to_be_bytes();
    let mut start = 0;
    while start + 1 < repr.len() {
        let (cur, next) = (repr[start], repr[start + 1]);
        if (cur == 0x00 && next & 0x80 == 0) || (cur == 0xFF && next & 0x80 != 0) {
            start += 1;
        } else {
            break;
        }
    }
    repr[start..].to_vec()
}

impl ASNTag for Integer {
    fn into_structure(self) -> StructureTag {
        StructureTag {
            id: self.id,
            class: self.class,
            payload: PL::P(int_octets(self.inner)),
        }
    }
}

impl ASNTag for Enumerated {
    fn into_structure(self) -> StructureTag {
        StructureTag {
            id: self.id,
            class: self.class,
            payload: PL::P(int_octets(self.inner)),
        }
    }
}

impl Default for Integer {
    fn default() -> Integer {
        Integer {
            id: Types::Integer as u64,
            class: TagClass::Universal,
            inner: 0,
        }
    }
}

impl Default for Enumerated {
    fn default() -> Enumerated {
        Enumerated {
            id: Types::Enumerated as u64,
            class: TagClass::Universal,
            inner: 0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::int_octets;
    use crate::parse::parse_int;

    #[test]
    fn no_redundant_octets() {
        assert_eq!(int_octets(0), vec![0]);
        assert_eq!(int_octets(127), vec![127]);
        assert_eq!(int_octets(-128), vec![0x80]);
        assert_eq!(int_octets(-1), vec![0xFF]);
    }

    #[test]
    fn sign_bit_kept_clear_for_positive() {
        assert_eq!(int_octets(128), vec![0, 128]);
        assert_eq!(int_octets(0x8000), vec![0, 0x80, 0]);
    }

    #[test]
    fn negative_needing_extra_octet() {
        assert_eq!(int_octets(-129), vec![0xFF, 0x7F]);
    }

    #[test]
    fn parser_agrees() {
        for v in [0, 1, -1, 255, -256, 65535, i32::MAX as i64, i64::MIN, i64::MAX] {
            assert_eq!(parse_int(&int_octets(v)).unwrap().1, v);
        }
    }
}
