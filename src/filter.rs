//! Search filters.
//!
//! The string form ([RFC 4515](https://tools.ietf.org/html/rfc4515)) is parsed
//! straight into BER by a set of `nom` combinators. [`Filter`](enum.Filter.html)
//! is the decoded value, used where a control carries a filter.

#![allow(clippy::blocks_in_conditions)]
#![allow(clippy::result_unit_err)]

use std::fmt;
use std::str::FromStr;

use crate::ber;
use crate::result::{DecodeError, LdapError};
use crate::util::escape_value;

use lber::common::TagClass;
use lber::structure::StructureTag;
use lber::structures::{ASNTag, Boolean, ExplicitTag, OctetString, Sequence, Tag};

use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::digit1;
use nom::character::{is_alphabetic, is_alphanumeric, is_hex_digit};
use nom::combinator::{map, map_res, opt, recognize, verify};
use nom::multi::{fold_many0, many0, many1};
use nom::number::complete::be_u8;
use nom::sequence::{delimited, preceded};

/// Parse a filter string into its BER form.
pub fn parse(input: impl AsRef<[u8]>) -> Result<Tag, ()> {
    match filtexpr(input.as_ref()) {
        Ok((r, t)) => {
            if r.is_empty() {
                Ok(t)
            } else {
                Err(())
            }
        }
        _ => Err(()),
    }
}

/// Parse a parenthesized list of simple filter items, `((a=b)(c=d))`, into
/// a BER sequence.
pub fn parse_matched_values(input: impl AsRef<[u8]>) -> Result<Tag, ()> {
    match mv_filtexpr(input.as_ref()) {
        Ok((r, t)) => {
            if r.is_empty() {
                Ok(t)
            } else {
                Err(())
            }
        }
        _ => Err(()),
    }
}

const AND_FILT: u64 = 0;
const OR_FILT: u64 = 1;
const NOT_FILT: u64 = 2;

const EQ_MATCH: u64 = 3;
const SUBSTR_MATCH: u64 = 4;
const GTE_MATCH: u64 = 5;
const LTE_MATCH: u64 = 6;
const PRES_MATCH: u64 = 7;
const APPROX_MATCH: u64 = 8;
const EXT_MATCH: u64 = 9;

const SUB_INITIAL: u64 = 0;
const SUB_ANY: u64 = 1;
const SUB_FINAL: u64 = 2;

fn filtexpr(i: &[u8]) -> IResult<&[u8], Tag> {
    alt((filter, item))(i)
}

fn filter(i: &[u8]) -> IResult<&[u8], Tag> {
    delimited(tag(b"("), filtercomp, tag(b")"))(i)
}

fn filtercomp(i: &[u8]) -> IResult<&[u8], Tag> {
    alt((and, or, not, item))(i)
}

fn filterlist(i: &[u8]) -> IResult<&[u8], Vec<Tag>> {
    many0(filter)(i)
}

fn mv_filtexpr(i: &[u8]) -> IResult<&[u8], Tag> {
    delimited(tag(b"("), mv_filterlist, tag(b")"))(i)
}

fn mv_filteritems(i: &[u8]) -> IResult<&[u8], Vec<Tag>> {
    many1(delimited(tag(b"("), item, tag(b")")))(i)
}

fn mv_filterlist(i: &[u8]) -> IResult<&[u8], Tag> {
    map(mv_filteritems, |tagv: Vec<Tag>| -> Tag {
        Tag::Sequence(Sequence {
            inner: tagv,
            ..Default::default()
        })
    })(i)
}

fn and(i: &[u8]) -> IResult<&[u8], Tag> {
    map(preceded(tag(b"&"), filterlist), |tagv: Vec<Tag>| -> Tag {
        Tag::Sequence(Sequence {
            class: TagClass::Context,
            id: AND_FILT,
            inner: tagv,
        })
    })(i)
}

fn or(i: &[u8]) -> IResult<&[u8], Tag> {
    map(preceded(tag(b"|"), filterlist), |tagv: Vec<Tag>| -> Tag {
        Tag::Sequence(Sequence {
            class: TagClass::Context,
            id: OR_FILT,
            inner: tagv,
        })
    })(i)
}

fn not(i: &[u8]) -> IResult<&[u8], Tag> {
    map(preceded(tag(b"!"), filter), |tag: Tag| -> Tag {
        Tag::ExplicitTag(ExplicitTag {
            class: TagClass::Context,
            id: NOT_FILT,
            inner: Box::new(tag),
        })
    })(i)
}

fn item(i: &[u8]) -> IResult<&[u8], Tag> {
    alt((eq, non_eq, extensible))(i)
}

enum Unescaper {
    WantFirst,
    WantSecond(u8),
    Value(u8),
    Error,
}

impl Unescaper {
    fn feed(&self, c: u8) -> Unescaper {
        match *self {
            Unescaper::Error => Unescaper::Error,
            Unescaper::WantFirst => {
                if is_hex_digit(c) {
                    Unescaper::WantSecond(
                        c - if c <= b'9' {
                            b'0'
                        } else {
                            (c & 0x20) + b'A' - 10
                        },
                    )
                } else {
                    Unescaper::Error
                }
            }
            Unescaper::WantSecond(partial) => {
                if is_hex_digit(c) {
                    Unescaper::Value(
                        (partial << 4)
                            + (c - if c <= b'9' {
                                b'0'
                            } else {
                                (c & 0x20) + b'A' - 10
                            }),
                    )
                } else {
                    Unescaper::Error
                }
            }
            Unescaper::Value(_v) => {
                if c != b'\\' {
                    Unescaper::Value(c)
                } else {
                    Unescaper::WantFirst
                }
            }
        }
    }
}

// Any byte in the assertion value may be represented by \NN, where N is a hex digit.
// Some characters must be represented in this way: parentheses, asterisk and backslash
// itself.
fn unescaped(i: &[u8]) -> IResult<&[u8], Vec<u8>> {
    map_res(
        fold_many0(
            verify(be_u8, is_value_char),
            || (Unescaper::Value(0), Vec::new()),
            |(mut u, mut vec): (Unescaper, Vec<_>), c: u8| {
                u = u.feed(c);
                if let Unescaper::Value(c) = u {
                    vec.push(c);
                }
                (u, vec)
            },
        ),
        |(u, vec): (Unescaper, Vec<_>)| -> Result<Vec<u8>, ()> {
            if let Unescaper::Value(_) = u {
                Ok(vec)
            } else {
                Err(())
            }
        },
    )(i)
}

fn is_value_char(&c: &u8) -> bool {
    c != 0 && c != b'(' && c != b')' && c != b'*'
}

fn non_eq(i: &[u8]) -> IResult<&[u8], Tag> {
    let (i, attr) = attributedescription(i)?;
    let (i, filterop) = alt((tag(b">="), tag(b"<="), tag("~=")))(i)?;
    let (i, value) = unescaped(i)?;
    let id = match filterop {
        b">=" => GTE_MATCH,
        b"<=" => LTE_MATCH,
        _ => APPROX_MATCH,
    };
    Ok((i, ava_tag(id, attr.to_vec(), value)))
}

fn ava_tag(id: u64, attr: Vec<u8>, value: Vec<u8>) -> Tag {
    Tag::Sequence(Sequence {
        class: TagClass::Context,
        id,
        inner: vec![
            Tag::OctetString(OctetString::new(attr)),
            Tag::OctetString(OctetString::new(value)),
        ],
    })
}

fn eq(i: &[u8]) -> IResult<&[u8], Tag> {
    let (i, attr) = attributedescription(i)?;
    let (i, _) = tag(b"=")(i)?;
    let (i, initial) = unescaped(i)?;
    let (i, mid_final) = map_res(
        many0(preceded(tag(b"*"), unescaped)),
        |v: Vec<Vec<u8>>| -> Result<Vec<Vec<u8>>, ()> {
            if v.iter().enumerate().fold(false, |acc, (n, ve)| {
                acc || ve.is_empty() && n + 1 != v.len()
            }) {
                Err(())
            } else {
                Ok(v)
            }
        },
    )(i)?;
    let tag = if mid_final.is_empty() {
        // simple equality, no asterisks in assertion value
        ava_tag(EQ_MATCH, attr.to_vec(), initial)
    } else if initial.is_empty() && mid_final.len() == 1 && mid_final[0].is_empty() {
        // presence, single asterisk in assertion value
        Tag::OctetString(OctetString {
            class: TagClass::Context,
            id: PRES_MATCH,
            inner: attr.to_vec(),
        })
    } else {
        // substring match
        let mut inner = vec![];
        if !initial.is_empty() {
            inner.push(Tag::OctetString(OctetString {
                class: TagClass::Context,
                id: SUB_INITIAL,
                inner: initial,
            }));
        }
        let n = mid_final.len();
        for (i, sub_elem) in mid_final.into_iter().enumerate() {
            if sub_elem.is_empty() {
                break;
            }
            inner.push(Tag::OctetString(OctetString {
                class: TagClass::Context,
                id: if i + 1 != n { SUB_ANY } else { SUB_FINAL },
                inner: sub_elem,
            }));
        }
        Tag::Sequence(Sequence {
            class: TagClass::Context,
            id: SUBSTR_MATCH,
            inner: vec![
                Tag::OctetString(OctetString {
                    inner: attr.to_vec(),
                    ..Default::default()
                }),
                Tag::Sequence(Sequence {
                    inner,
                    ..Default::default()
                }),
            ],
        })
    };
    Ok((i, tag))
}

fn extensible(i: &[u8]) -> IResult<&[u8], Tag> {
    alt((attr_dn_mrule, dn_mrule))(i)
}

fn attr_dn_mrule(i: &[u8]) -> IResult<&[u8], Tag> {
    let (i, attr) = attributedescription(i)?;
    let (i, dn) = opt(tag(b":dn"))(i)?;
    let (i, mrule) = opt(preceded(tag(b":"), attributetype))(i)?;
    let (i, _) = tag(b":=")(i)?;
    let (i, value) = unescaped(i)?;
    Ok((i, extensible_tag(mrule, Some(attr), value, dn.is_some())))
}

fn dn_mrule(i: &[u8]) -> IResult<&[u8], Tag> {
    let (i, dn) = opt(tag(b":dn"))(i)?;
    let (i, mrule) = preceded(tag(b":"), attributetype)(i)?;
    let (i, _) = tag(b":=")(i)?;
    let (i, value) = unescaped(i)?;
    Ok((i, extensible_tag(Some(mrule), None, value, dn.is_some())))
}

fn extensible_tag(mrule: Option<&[u8]>, attr: Option<&[u8]>, value: Vec<u8>, dn: bool) -> Tag {
    let mut inner = vec![];
    if let Some(mrule) = mrule {
        inner.push(Tag::OctetString(OctetString {
            class: TagClass::Context,
            id: 1,
            inner: mrule.to_vec(),
        }));
    }
    if let Some(attr) = attr {
        inner.push(Tag::OctetString(OctetString {
            class: TagClass::Context,
            id: 2,
            inner: attr.to_vec(),
        }));
    }
    inner.push(Tag::OctetString(OctetString {
        class: TagClass::Context,
        id: 3,
        inner: value,
    }));
    if dn {
        inner.push(Tag::Boolean(Boolean {
            class: TagClass::Context,
            id: 4,
            inner: dn,
        }));
    }
    Tag::Sequence(Sequence {
        class: TagClass::Context,
        id: EXT_MATCH,
        inner,
    })
}

fn attributedescription(i: &[u8]) -> IResult<&[u8], &[u8]> {
    recognize(|i| -> IResult<&[u8], ()> {
        let (i, _) = attributetype(i)?;
        let (i, _) = many0(preceded(tag(b";"), take_while1(is_alnum_hyphen)))(i)?;
        Ok((i, ()))
    })(i)
}

fn is_alnum_hyphen(c: u8) -> bool {
    is_alphanumeric(c) || c == b'-'
}

fn attributetype(i: &[u8]) -> IResult<&[u8], &[u8]> {
    alt((numericoid, descr))(i)
}

fn numericoid(i: &[u8]) -> IResult<&[u8], &[u8]> {
    recognize(|i| -> IResult<&[u8], ()> {
        let (i, _) = number(i)?;
        let (i, _) = many0(preceded(tag(b"."), number))(i)?;
        Ok((i, ()))
    })(i)
}

// A number may be zero, but must not have superfluous leading zeroes
fn number(i: &[u8]) -> IResult<&[u8], &[u8]> {
    verify(digit1, |d: &[u8]| d.len() == 1 || d[0] != b'0')(i)
}

fn descr(i: &[u8]) -> IResult<&[u8], &[u8]> {
    recognize(|i| -> IResult<&[u8], ()> {
        let (i, _) = verify(be_u8, |c| is_alphabetic(*c))(i)?;
        let (i, _) = take_while(is_alnum_hyphen)(i)?;
        Ok((i, ()))
    })(i)
}

/// Decoded search filter.
///
/// Assertion values are kept as bytes, since the protocol doesn't require
/// them to be UTF-8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Equality(String, Vec<u8>),
    Substrings {
        attr: String,
        initial: Option<Vec<u8>>,
        any: Vec<Vec<u8>>,
        final_: Option<Vec<u8>>,
    },
    GreaterOrEqual(String, Vec<u8>),
    LessOrEqual(String, Vec<u8>),
    Present(String),
    Approx(String, Vec<u8>),
    Extensible {
        rule: Option<String>,
        attr: Option<String>,
        value: Vec<u8>,
        dn_attrs: bool,
    },
}

fn ava(tag: StructureTag) -> Result<(String, Vec<u8>), DecodeError> {
    let mut components = ber::components(tag, "attribute value assertion")?;
    let attr = ber::string_elem(ber::next(&mut components, "attribute")?, "attribute")?;
    let value = ber::octets_elem(ber::next(&mut components, "assertion value")?, "assertion value")?;
    ber::end(components, "attribute value assertion")?;
    Ok((attr, value))
}

fn substrings(tag: StructureTag) -> Result<Filter, DecodeError> {
    let mut components = ber::components(tag, "substring filter")?;
    let attr = ber::string_elem(ber::next(&mut components, "attribute")?, "attribute")?;
    let subs = ber::sequence(ber::next(&mut components, "substrings")?, "substrings")?;
    ber::end(components, "substring filter")?;
    let (mut initial, mut any, mut final_) = (None, vec![], None);
    for (n, sub) in subs.enumerate() {
        if final_.is_some() || sub.class != TagClass::Context {
            return Err(DecodeError::Expected("substring"));
        }
        let id = sub.id;
        let val = ber::bytes(sub, "substring")?;
        match id {
            SUB_INITIAL if n == 0 => initial = Some(val),
            SUB_ANY => any.push(val),
            SUB_FINAL => final_ = Some(val),
            _ => return Err(DecodeError::Expected("substring")),
        }
    }
    if initial.is_none() && any.is_empty() && final_.is_none() {
        return Err(DecodeError::Expected("substring"));
    }
    Ok(Filter::Substrings {
        attr,
        initial,
        any,
        final_,
    })
}

fn extensible_match(tag: StructureTag) -> Result<Filter, DecodeError> {
    let mut components = ber::components(tag, "extensible match")?;
    let mut next = components.next();
    let mut rule = None;
    if let Some(t) = next.take_if(|t| t.is(TagClass::Context, 1)) {
        rule = Some(ber::string(t, "matching rule")?);
        next = components.next();
    }
    let mut attr = None;
    if let Some(t) = next.take_if(|t| t.is(TagClass::Context, 2)) {
        attr = Some(ber::string(t, "attribute")?);
        next = components.next();
    }
    let value = next
        .ok_or(DecodeError::Expected("match value"))
        .and_then(|t| ber::context(t, 3, "match value"))
        .and_then(|t| ber::bytes(t, "match value"))?;
    let dn_attrs = match components.next() {
        Some(t) => ber::boolean(ber::context(t, 4, "dn attributes")?, "dn attributes")?,
        None => false,
    };
    ber::end(components, "extensible match")?;
    if rule.is_none() && attr.is_none() {
        return Err(DecodeError::Invalid {
            what: "extensible match",
            detail: "neither matching rule nor attribute".into(),
        });
    }
    Ok(Filter::Extensible {
        rule,
        attr,
        value,
        dn_attrs,
    })
}

fn filter_list(tag: StructureTag, what: &'static str) -> Result<Vec<Filter>, DecodeError> {
    ber::components(tag, what)?.map(Filter::from_tag).collect()
}

impl Filter {
    /// Decode a filter from its BER form.
    pub fn from_tag(tag: StructureTag) -> Result<Filter, DecodeError> {
        if tag.class != TagClass::Context {
            return Err(DecodeError::Expected("filter"));
        }
        Ok(match tag.id {
            AND_FILT => Filter::And(filter_list(tag, "and")?),
            OR_FILT => Filter::Or(filter_list(tag, "or")?),
            NOT_FILT => {
                let mut components = ber::components(tag, "not")?;
                let inner = Filter::from_tag(ber::next(&mut components, "filter")?)?;
                ber::end(components, "not")?;
                Filter::Not(Box::new(inner))
            }
            EQ_MATCH => {
                let (attr, value) = ava(tag)?;
                Filter::Equality(attr, value)
            }
            SUBSTR_MATCH => substrings(tag)?,
            GTE_MATCH => {
                let (attr, value) = ava(tag)?;
                Filter::GreaterOrEqual(attr, value)
            }
            LTE_MATCH => {
                let (attr, value) = ava(tag)?;
                Filter::LessOrEqual(attr, value)
            }
            PRES_MATCH => Filter::Present(ber::string(tag, "present")?),
            APPROX_MATCH => {
                let (attr, value) = ava(tag)?;
                Filter::Approx(attr, value)
            }
            EXT_MATCH => extensible_match(tag)?,
            _ => return Err(DecodeError::Expected("filter")),
        })
    }

    /// Encode the filter.
    pub fn into_tag(self) -> Tag {
        match self {
            Filter::And(filters) => list_tag(AND_FILT, filters),
            Filter::Or(filters) => list_tag(OR_FILT, filters),
            Filter::Not(filter) => Tag::ExplicitTag(ExplicitTag {
                class: TagClass::Context,
                id: NOT_FILT,
                inner: Box::new(filter.into_tag()),
            }),
            Filter::Equality(attr, value) => ava_tag(EQ_MATCH, attr.into_bytes(), value),
            Filter::Substrings {
                attr,
                initial,
                any,
                final_,
            } => {
                let mut inner = vec![];
                if let Some(initial) = initial {
                    inner.push(Tag::OctetString(OctetString::context(SUB_INITIAL, initial)));
                }
                for sub in any {
                    inner.push(Tag::OctetString(OctetString::context(SUB_ANY, sub)));
                }
                if let Some(final_) = final_ {
                    inner.push(Tag::OctetString(OctetString::context(SUB_FINAL, final_)));
                }
                Tag::Sequence(Sequence {
                    class: TagClass::Context,
                    id: SUBSTR_MATCH,
                    inner: vec![
                        Tag::OctetString(OctetString::new(attr)),
                        Tag::Sequence(Sequence {
                            inner,
                            ..Default::default()
                        }),
                    ],
                })
            }
            Filter::GreaterOrEqual(attr, value) => ava_tag(GTE_MATCH, attr.into_bytes(), value),
            Filter::LessOrEqual(attr, value) => ava_tag(LTE_MATCH, attr.into_bytes(), value),
            Filter::Present(attr) => Tag::OctetString(OctetString::context(PRES_MATCH, attr)),
            Filter::Approx(attr, value) => ava_tag(APPROX_MATCH, attr.into_bytes(), value),
            Filter::Extensible {
                rule,
                attr,
                value,
                dn_attrs,
            } => extensible_tag(
                rule.as_deref().map(str::as_bytes),
                attr.as_deref().map(str::as_bytes),
                value,
                dn_attrs,
            ),
        }
    }

    /// Check whether the filter is usable as a matched values item: no
    /// boolean combinations, and no extensible match over DN attributes.
    pub fn is_simple_item(&self) -> bool {
        match self {
            Filter::And(_) | Filter::Or(_) | Filter::Not(_) => false,
            Filter::Extensible { dn_attrs, .. } => !dn_attrs,
            _ => true,
        }
    }
}

fn list_tag(id: u64, filters: Vec<Filter>) -> Tag {
    Tag::Sequence(Sequence {
        class: TagClass::Context,
        id,
        inner: filters.into_iter().map(Filter::into_tag).collect(),
    })
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(filters) | Filter::Or(filters) => {
                let op = if matches!(self, Filter::And(_)) { '&' } else { '|' };
                write!(f, "({op}")?;
                for filter in filters {
                    write!(f, "{filter}")?;
                }
                write!(f, ")")
            }
            Filter::Not(filter) => write!(f, "(!{filter})"),
            Filter::Equality(attr, value) => write!(f, "({attr}={})", escape_value(value)),
            Filter::Substrings {
                attr,
                initial,
                any,
                final_,
            } => {
                write!(f, "({attr}=")?;
                if let Some(initial) = initial {
                    write!(f, "{}", escape_value(initial))?;
                }
                write!(f, "*")?;
                for sub in any {
                    write!(f, "{}*", escape_value(sub))?;
                }
                if let Some(final_) = final_ {
                    write!(f, "{}", escape_value(final_))?;
                }
                write!(f, ")")
            }
            Filter::GreaterOrEqual(attr, value) => write!(f, "({attr}>={})", escape_value(value)),
            Filter::LessOrEqual(attr, value) => write!(f, "({attr}<={})", escape_value(value)),
            Filter::Present(attr) => write!(f, "({attr}=*)"),
            Filter::Approx(attr, value) => write!(f, "({attr}~={})", escape_value(value)),
            Filter::Extensible {
                rule,
                attr,
                value,
                dn_attrs,
            } => {
                write!(f, "({}", attr.as_deref().unwrap_or_default())?;
                if *dn_attrs {
                    write!(f, ":dn")?;
                }
                if let Some(rule) = rule {
                    write!(f, ":{rule}")?;
                }
                write!(f, ":={})", escape_value(value))
            }
        }
    }
}

impl FromStr for Filter {
    type Err = LdapError;

    fn from_str(s: &str) -> Result<Filter, LdapError> {
        let tag = parse(s).map_err(|_| LdapError::FilterParsing)?;
        Filter::from_tag(tag.into_structure()).map_err(|e| {
            debug!("parsed filter doesn't decode: {e}");
            LdapError::FilterParsing
        })
    }
}
