use crate::RequestId;
use crate::ber;
use crate::controls::{Control, RawControl};
use crate::controls_impl::{controls_tag, parse_controls};
use crate::result::{DecodeError, LdapError};

use lber::common::TagClass;
use lber::parse::parse_header;
use lber::structure::StructureTag;
use lber::structures::{ASNTag, Integer, Sequence, Tag};
use lber::write;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

pub type MaybeControls = Option<Vec<RawControl>>;

/// Default limit on the size of a single message, 5 MiB.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 5 * 1024 * 1024;

/// Additional settings for the message codec.
///
/// This struct uses the builder pattern; a default instance is created with
/// `new()`, and modified by chaining setters.
#[derive(Clone, Debug)]
pub struct CodecSettings {
    max_message_size: usize,
    ad_workaround: bool,
}

impl Default for CodecSettings {
    fn default() -> Self {
        CodecSettings {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            ad_workaround: true,
        }
    }
}

impl CodecSettings {
    /// Create an instance of the structure with default settings.
    pub fn new() -> CodecSettings {
        CodecSettings {
            ..Default::default()
        }
    }

    /// Set the largest accepted message, counting the envelope. A bigger
    /// message fails the decoder before it's buffered in full.
    pub fn set_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    /// Tolerate the malformed Notice of Disconnection sent by Active Directory.
    /// The default is `true`.
    pub fn set_ad_workaround(mut self, ad_workaround: bool) -> Self {
        self.ad_workaround = ad_workaround;
        self
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    pub fn ad_workaround(&self) -> bool {
        self.ad_workaround
    }
}

/// Decoded LDAP message.
#[derive(Clone, Debug, PartialEq)]
pub struct LdapMessage {
    pub id: RequestId,
    /// Protocol operation, left as a raw BER structure.
    pub op: StructureTag,
    pub ctrls: Vec<Control>,
}

/// Codec for the `LDAPMessage` envelope.
///
/// Decoding yields [`LdapMessage`](struct.LdapMessage.html) items; encoding
/// takes a message id, an operation and an optional control list.
#[derive(Clone, Debug, Default)]
pub struct LdapCodec {
    settings: CodecSettings,
}

impl LdapCodec {
    pub fn new(settings: CodecSettings) -> LdapCodec {
        LdapCodec { settings }
    }
}

fn decode_message(tag: StructureTag, ad_workaround: bool) -> Result<LdapMessage, DecodeError> {
    let mut tags = ber::sequence(tag, "ldap message")?;
    let id = ber::integer_elem(ber::next(&mut tags, "message id")?, "message id")?;
    if id < 0 {
        return Err(DecodeError::Invalid {
            what: "message id",
            detail: id.to_string(),
        });
    }
    let op = ber::next(&mut tags, "protocol op")?;
    if op.class != TagClass::Application {
        return Err(DecodeError::Expected("protocol op"));
    }
    let mut next = tags.next();
    if ad_workaround {
        // Active Directory puts the responseName of a Notice of Disconnection
        // outside the ExtendedResponse sequence.
        if let Some(name) = next.take_if(|t| t.is(TagClass::Context, 10)) {
            warn!(
                "message {id}: ignoring misplaced response name {:?}",
                name.as_primitive().map(String::from_utf8_lossy)
            );
            next = tags.next();
        }
    }
    let ctrls = match next {
        Some(t) => parse_controls(ber::context(t, 0, "controls")?)?,
        None => vec![],
    };
    ber::end(tags, "ldap message")?;
    Ok(LdapMessage { id, op, ctrls })
}

impl Decoder for LdapCodec {
    type Item = LdapMessage;
    type Error = LdapError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if buf.is_empty() {
            return Ok(None);
        }
        let (header_len, len) = match parse_header(&buf[..]) {
            Ok((contents, (_, _, _, len))) => (buf.len() - contents.len(), len),
            Err(e) if e.is_incomplete() => return Ok(None),
            Err(_) => return Err(DecodeError::Ber.into()),
        };
        let size = header_len.saturating_add(len);
        if size > self.settings.max_message_size {
            return Err(LdapError::MessageTooLarge {
                size,
                limit: self.settings.max_message_size,
            });
        }
        if buf.len() < size {
            buf.reserve(size - buf.len());
            return Ok(None);
        }
        let frame = buf.split_to(size);
        trace!("decoding {size} byte message");
        let msg = decode_message(
            ber::parse_value(&frame, "ldap message")?,
            self.settings.ad_workaround,
        )?;
        for Control(ctype, raw) in &msg.ctrls {
            debug!(
                "message {}: control {} ({:?}), critical: {}",
                msg.id, raw.ctype, ctype, raw.crit
            );
        }
        Ok(Some(msg))
    }
}

impl Encoder<(RequestId, Tag, MaybeControls)> for LdapCodec {
    type Error = LdapError;

    fn encode(
        &mut self,
        msg: (RequestId, Tag, MaybeControls),
        into: &mut BytesMut,
    ) -> Result<(), LdapError> {
        let (id, tag, controls) = msg;
        let outstruct = {
            let mut msg = vec![
                Tag::Integer(Integer {
                    inner: id as i64,
                    ..Default::default()
                }),
                tag,
            ];
            if let Some(controls) = controls {
                msg.push(controls_tag(controls));
            }
            Tag::Sequence(Sequence {
                inner: msg,
                ..Default::default()
            })
            .into_structure()
        };
        let start = into.len();
        write::encode_into(into, outstruct)?;
        trace!("encoded message {id}, {} bytes", into.len() - start);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::controls::{ControlType, ManageDsaIt, PagedResults};
    use lber::structures::{Null, OctetString};

    fn unbind() -> Tag {
        Tag::Null(Null {
            id: 2,
            class: TagClass::Application,
            inner: (),
        })
    }

    #[test]
    fn encode_unbind() {
        let mut buf = BytesMut::new();
        LdapCodec::default().encode((3, unbind(), None), &mut buf).unwrap();
        assert_eq!(&buf[..], &[0x30, 0x05, 0x02, 0x01, 0x03, 0x42, 0x00]);
    }

    #[test]
    fn controls_survive() {
        let mut codec = LdapCodec::default();
        let mut buf = BytesMut::new();
        let ctrls = vec![
            RawControl::from(PagedResults {
                size: 10,
                cookie: vec![],
            }),
            RawControl::from(ManageDsaIt).with_crit(true),
        ];
        codec.encode((7, unbind(), Some(ctrls.clone())), &mut buf).unwrap();
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert!(buf.is_empty());
        assert_eq!(msg.id, 7);
        assert!(msg.op.is(TagClass::Application, 2));
        assert_eq!(
            msg.ctrls,
            vec![
                Control(Some(ControlType::PagedResults), ctrls[0].clone()),
                Control(Some(ControlType::ManageDsaIt), ctrls[1].clone()),
            ]
        );
    }

    #[test]
    fn partial_frames() {
        let mut codec = LdapCodec::default();
        let mut full = BytesMut::new();
        codec.encode((1, unbind(), None), &mut full).unwrap();
        let mut buf = BytesMut::new();
        for &byte in &full[..full.len() - 1] {
            buf.extend_from_slice(&[byte]);
            assert_eq!(codec.decode(&mut buf).unwrap(), None);
        }
        buf.extend_from_slice(&full[full.len() - 1..]);
        assert_eq!(codec.decode(&mut buf).unwrap().map(|m| m.id), Some(1));
    }

    #[test]
    fn too_large() {
        let mut codec = LdapCodec::new(CodecSettings::new().set_max_message_size(16));
        // header announces 1000 bytes of contents
        let mut buf = BytesMut::from(&[0x30, 0x82, 0x03, 0xE8, 0x02][..]);
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, LdapError::MessageTooLarge { size: 1004, limit: 16 }));
        assert_eq!(err.result_code(), crate::result::PROTOCOL_ERROR);
    }

    #[test]
    fn malformed_envelopes() {
        let mut codec = LdapCodec::default();
        // not a sequence
        let mut buf = BytesMut::from(&[0x04, 0x00][..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(LdapError::Decoding {
                source: DecodeError::Expected("ldap message")
            })
        ));
        // negative message id
        let mut buf = BytesMut::from(&[0x30, 0x05, 0x02, 0x01, 0xFF, 0x42, 0x00][..]);
        assert!(codec.decode(&mut buf).is_err());
        // controls with the wrong tag
        let mut buf = BytesMut::from(&[0x30, 0x07, 0x02, 0x01, 0x01, 0x42, 0x00, 0xA1, 0x00][..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(LdapError::Decoding {
                source: DecodeError::Expected("controls")
            })
        ));
        // indefinite length
        let mut buf = BytesMut::from(&[0x30, 0x80, 0x02, 0x01, 0x01, 0x00, 0x00][..]);
        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn ad_notice_of_disconnection() {
        let notice = Tag::Sequence(Sequence {
            id: 24,
            class: TagClass::Application,
            inner: vec![
                Tag::Enumerated(lber::structures::Enumerated {
                    inner: 52,
                    ..Default::default()
                }),
                Tag::OctetString(OctetString::new("")),
                Tag::OctetString(OctetString::new("")),
            ],
        });
        let quirk = Tag::OctetString(OctetString::context(10, "1.3.6.1.4.1.1466.20036"));
        let frame = write::encode(
            Tag::Sequence(Sequence {
                inner: vec![
                    Tag::Integer(Integer {
                        inner: 0,
                        ..Default::default()
                    }),
                    notice,
                    quirk,
                ],
                ..Default::default()
            })
            .into_structure(),
        );
        let mut buf = BytesMut::from(&frame[..]);
        let msg = LdapCodec::default().decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg.id, 0);
        assert!(msg.ctrls.is_empty());
        let mut buf = BytesMut::from(&frame[..]);
        let mut strict = LdapCodec::new(CodecSettings::new().set_ad_workaround(false));
        assert!(strict.decode(&mut buf).is_err());
    }
}
