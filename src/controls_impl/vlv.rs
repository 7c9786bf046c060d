use std::str::FromStr;

use super::{ControlParser, MakeCritical, RawControl};
use crate::ber;
use crate::result::{DecodeError, LdapError};

use lber::common::TagClass;
use lber::structures::{Enumerated, Integer, OctetString, Sequence, Tag};

pub const VLV_REQUEST_OID: &str = "2.16.840.1.113730.3.4.9";
pub const VLV_RESPONSE_OID: &str = "2.16.840.1.113730.3.4.10";

/// Position of the target entry in a virtual list view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VlvTarget {
    /// One-based offset into a list of `content_count` entries. A content
    /// count of zero means the client doesn't know the list size.
    ByOffset { offset: i32, content_count: i32 },
    /// First entry whose sort key is greater than or equal to the value.
    GreaterOrEqual(Vec<u8>),
}

/// Virtual List View request control
/// ([draft-ietf-ldapext-ldapv3-vlv](https://tools.ietf.org/html/draft-ietf-ldapext-ldapv3-vlv-09)).
///
/// The server requires a Server Side Sort control in the same request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VirtualListView {
    pub before_count: i32,
    pub after_count: i32,
    pub target: VlvTarget,
    pub context_id: Option<Vec<u8>>,
}

fn int_tag(inner: i32) -> Tag {
    Tag::Integer(Integer {
        inner: inner as i64,
        ..Default::default()
    })
}

impl MakeCritical for VirtualListView {}

impl From<VirtualListView> for RawControl {
    fn from(vlv: VirtualListView) -> RawControl {
        let target = match vlv.target {
            VlvTarget::ByOffset {
                offset,
                content_count,
            } => Tag::Sequence(Sequence {
                id: 0,
                class: TagClass::Context,
                inner: vec![int_tag(offset), int_tag(content_count)],
            }),
            VlvTarget::GreaterOrEqual(value) => Tag::OctetString(OctetString::context(1, value)),
        };
        let mut inner = vec![int_tag(vlv.before_count), int_tag(vlv.after_count), target];
        if let Some(context_id) = vlv.context_id {
            inner.push(Tag::OctetString(OctetString::new(context_id)));
        }
        RawControl {
            ctype: VLV_REQUEST_OID.to_owned(),
            crit: false,
            val: Some(ber::encode_value(Tag::Sequence(Sequence {
                inner,
                ..Default::default()
            }))),
        }
    }
}

fn context_id(next: Option<lber::structure::StructureTag>) -> Result<Option<Vec<u8>>, DecodeError> {
    next.map(|t| ber::octets_elem(t, "context id")).transpose()
}

impl ControlParser for VirtualListView {
    fn parse(val: &[u8]) -> Result<VirtualListView, DecodeError> {
        let mut components = ber::sequence(ber::parse_value(val, "vlv request")?, "vlv request")?;
        let before_count =
            ber::integer_elem(ber::next(&mut components, "before count")?, "before count")?;
        let after_count =
            ber::integer_elem(ber::next(&mut components, "after count")?, "after count")?;
        let target = ber::next(&mut components, "target")?;
        let target = if target.is(TagClass::Context, 0) {
            let mut by_offset = ber::components(target, "by offset")?;
            let offset = ber::integer_elem(ber::next(&mut by_offset, "offset")?, "offset")?;
            let content_count =
                ber::integer_elem(ber::next(&mut by_offset, "content count")?, "content count")?;
            ber::end(by_offset, "by offset")?;
            VlvTarget::ByOffset {
                offset,
                content_count,
            }
        } else {
            VlvTarget::GreaterOrEqual(ber::bytes(
                ber::context(target, 1, "target")?,
                "assertion value",
            )?)
        };
        let context_id = context_id(components.next())?;
        ber::end(components, "vlv request")?;
        Ok(VirtualListView {
            before_count,
            after_count,
            target,
            context_id,
        })
    }
}

fn invalid(s: &str) -> LdapError {
    LdapError::InvalidDescriptor(format!("virtual list view: {s}"))
}

fn count(s: &str, whole: &str) -> Result<i32, LdapError> {
    s.trim().parse().map_err(|_| invalid(whole))
}

/// Parse a descriptor of the form `before:after:offset:count` or
/// `before:after:value`.
impl FromStr for VirtualListView {
    type Err = LdapError;

    fn from_str(s: &str) -> Result<VirtualListView, LdapError> {
        let parts: Vec<&str> = s.split(':').filter(|t| !t.is_empty()).collect();
        let target = match parts[..] {
            [_, _, value] => VlvTarget::GreaterOrEqual(value.as_bytes().to_vec()),
            [_, _, offset, content_count] => VlvTarget::ByOffset {
                offset: count(offset, s)?,
                content_count: count(content_count, s)?,
            },
            _ => return Err(invalid(s)),
        };
        Ok(VirtualListView {
            before_count: count(parts[0], s)?,
            after_count: count(parts[1], s)?,
            target,
            context_id: None,
        })
    }
}

/// Virtual List View response control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VirtualListViewResp {
    pub target_position: i32,
    pub content_count: i32,
    /// Result code of the VLV processing, drawn from the LDAP result codes.
    pub result: u32,
    pub context_id: Option<Vec<u8>>,
}

impl From<VirtualListViewResp> for RawControl {
    fn from(resp: VirtualListViewResp) -> RawControl {
        let mut inner = vec![
            int_tag(resp.target_position),
            int_tag(resp.content_count),
            Tag::Enumerated(Enumerated {
                inner: resp.result as i64,
                ..Default::default()
            }),
        ];
        if let Some(context_id) = resp.context_id {
            inner.push(Tag::OctetString(OctetString::new(context_id)));
        }
        RawControl {
            ctype: VLV_RESPONSE_OID.to_owned(),
            crit: false,
            val: Some(ber::encode_value(Tag::Sequence(Sequence {
                inner,
                ..Default::default()
            }))),
        }
    }
}

impl ControlParser for VirtualListViewResp {
    fn parse(val: &[u8]) -> Result<VirtualListViewResp, DecodeError> {
        let mut components = ber::sequence(ber::parse_value(val, "vlv response")?, "vlv response")?;
        let target_position = ber::integer_elem(
            ber::next(&mut components, "target position")?,
            "target position",
        )?;
        let content_count =
            ber::integer_elem(ber::next(&mut components, "content count")?, "content count")?;
        let result = ber::enumerated_elem(ber::next(&mut components, "vlv result")?, "vlv result")?;
        let result = u32::try_from(result).map_err(|_| DecodeError::Invalid {
            what: "vlv result",
            detail: result.to_string(),
        })?;
        let context_id = context_id(components.next())?;
        ber::end(components, "vlv response")?;
        Ok(VirtualListViewResp {
            target_position,
            content_count,
            result,
            context_id,
        })
    }
}
