use std::collections::HashMap;

use bytes::BytesMut;
use futures::StreamExt;
use tokio_util::codec::{Encoder, FramedRead};

use ldap_controls::asn1::TagClass;
use ldap_controls::controls::{
    ChangeType, ControlType, EntryChangeNotification, ManageDsaIt, PagedResults, PostReadResp,
    RawControl, ServerSideSortResp, check_critical, oid,
};
use ldap_controls::result::{PROTOCOL_ERROR, UNAVAILABLE_CRITICAL_EXTENSION};
use ldap_controls::{CodecSettings, LdapCodec, LdapError, LdapResult, SearchEntry};

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn entry() -> SearchEntry {
    SearchEntry {
        dn: "uid=jd,ou=people,dc=example,dc=org".into(),
        attrs: HashMap::from([("cn".to_owned(), vec!["John Doe".to_owned()])]),
        bin_attrs: HashMap::new(),
    }
}

fn search_stream() -> BytesMut {
    let mut codec = LdapCodec::default();
    let mut buf = BytesMut::new();
    let ecn =
        EntryChangeNotification::modify_dn("uid=jdoe,ou=people,dc=example,dc=org", Some(42));
    codec
        .encode((2, entry().into_tag(), Some(vec![RawControl::from(ecn)])), &mut buf)
        .unwrap();
    let done = LdapResult::default();
    let ctrls: Vec<RawControl> = vec![
        PagedResults {
            size: 0,
            cookie: b"next".to_vec(),
        }
        .into(),
        ServerSideSortResp {
            result: 0,
            attr: None,
        }
        .into(),
        PostReadResp(entry()).into(),
    ];
    codec.encode((2, done.into_tag(5), Some(ctrls)), &mut buf).unwrap();
    buf
}

#[tokio::test]
async fn search_with_response_controls() {
    init_log();
    let buf = search_stream();
    let mut frames = FramedRead::new(&buf[..], LdapCodec::default());

    let msg = frames.next().await.unwrap().unwrap();
    assert_eq!(msg.id, 2);
    assert_eq!(SearchEntry::construct(msg.op).unwrap(), entry());
    assert_eq!(msg.ctrls.len(), 1);
    assert_eq!(msg.ctrls[0].0, Some(ControlType::EntryChangeNotification));
    let ecn = msg.ctrls[0].1.parse::<EntryChangeNotification>().unwrap();
    assert_eq!(ecn.change_type(), ChangeType::ModifyDn);
    assert_eq!(ecn.previous_dn(), Some("uid=jdoe,ou=people,dc=example,dc=org"));
    assert_eq!(ecn.change_number(), Some(42));

    let msg = frames.next().await.unwrap().unwrap();
    assert!(msg.op.is(TagClass::Application, 5));
    let res = LdapResult::from_tag(msg.op).unwrap();
    assert_eq!(res.rc, 0);
    let types: Vec<_> = msg.ctrls.iter().map(|c| c.0).collect();
    assert_eq!(
        types,
        vec![
            Some(ControlType::PagedResults),
            Some(ControlType::ServerSideSortResp),
            Some(ControlType::PostRead),
        ]
    );
    let paged = msg.ctrls[0].1.parse::<PagedResults>().unwrap();
    assert_eq!(paged.cookie, b"next");
    let sort = msg.ctrls[1].1.parse::<ServerSideSortResp>().unwrap();
    assert_eq!(sort.result, 0);
    let PostReadResp(post) = msg.ctrls[2].1.parse::<PostReadResp>().unwrap();
    assert_eq!(post.dn, entry().dn);

    assert!(frames.next().await.is_none());
}

#[tokio::test]
async fn truncated_stream() {
    init_log();
    let buf = search_stream();
    let mut frames = FramedRead::new(&buf[..buf.len() - 3], LdapCodec::default());
    assert!(frames.next().await.unwrap().is_ok());
    match frames.next().await {
        Some(Err(LdapError::Io { .. })) => (),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn oversized_message() {
    init_log();
    let buf = search_stream();
    let codec = LdapCodec::new(CodecSettings::new().set_max_message_size(32));
    let mut frames = FramedRead::new(&buf[..], codec);
    let err = frames.next().await.unwrap().unwrap_err();
    assert!(matches!(err, LdapError::MessageTooLarge { limit: 32, .. }));
    assert_eq!(err.result_code(), PROTOCOL_ERROR);
}

#[tokio::test]
async fn unknown_critical_control() {
    init_log();
    let mut codec = LdapCodec::default();
    let mut buf = BytesMut::new();
    let ctrls = vec![
        RawControl::from(ManageDsaIt).with_crit(true),
        RawControl {
            ctype: "1.3.6.1.4.1.99999.1".into(),
            crit: true,
            val: Some(vec![0x04, 0x00]),
        },
    ];
    let del = ldap_controls::asn1::Tag::OctetString(ldap_controls::asn1::OctetString {
        id: 10,
        class: TagClass::Application,
        inner: b"cn=x".to_vec(),
    });
    codec.encode((9, del, Some(ctrls)), &mut buf).unwrap();

    let mut frames = FramedRead::new(&buf[..], LdapCodec::default());
    let msg = frames.next().await.unwrap().unwrap();
    assert_eq!(msg.ctrls[1].0, None);
    assert!(check_critical(&msg.ctrls[..1], &[oid::MANAGE_DSA_IT_OID]).is_ok());
    let err = check_critical(&msg.ctrls, &[oid::MANAGE_DSA_IT_OID]).unwrap_err();
    assert_eq!(err.result_code(), UNAVAILABLE_CRITICAL_EXTENSION);
}
