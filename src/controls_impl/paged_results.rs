use super::{ControlParser, MakeCritical, RawControl};
use crate::ber;
use crate::result::DecodeError;

use lber::structures::{Integer, OctetString, Sequence, Tag};

pub const PAGED_RESULTS_OID: &str = "1.2.840.113556.1.4.319";

/// Paged Results control ([RFC 2696](https://tools.ietf.org/html/rfc2696)).
///
/// This struct can be used both for requests and responses, although `size`
/// means different things in each case: the page size in the request, and
/// the server's estimate of the total result count in the response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PagedResults {
    /// For requests, desired page size. For responses, a server's estimate
    /// of the result set size, if non-zero.
    pub size: i32,
    /// Paging cookie. Empty in the first request and in the last response.
    pub cookie: Vec<u8>,
}

impl MakeCritical for PagedResults {}

impl From<PagedResults> for RawControl {
    fn from(pr: PagedResults) -> RawControl {
        let val = ber::encode_value(Tag::Sequence(Sequence {
            inner: vec![
                Tag::Integer(Integer {
                    inner: pr.size as i64,
                    ..Default::default()
                }),
                Tag::OctetString(OctetString::new(pr.cookie)),
            ],
            ..Default::default()
        }));
        RawControl {
            ctype: PAGED_RESULTS_OID.to_owned(),
            crit: false,
            val: Some(val),
        }
    }
}

impl ControlParser for PagedResults {
    fn parse(val: &[u8]) -> Result<PagedResults, DecodeError> {
        let mut components = ber::sequence(ber::parse_value(val, "paged results")?, "paged results")?;
        let size = ber::integer_elem(ber::next(&mut components, "size")?, "size")?;
        if size < 0 {
            return Err(DecodeError::Invalid {
                what: "size",
                detail: format!("negative value {size}"),
            });
        }
        let cookie = ber::octets_elem(ber::next(&mut components, "cookie")?, "cookie")?;
        ber::end(components, "paged results")?;
        Ok(PagedResults { size, cookie })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn first_page_request() {
        let rc: RawControl = PagedResults {
            size: 100,
            cookie: vec![],
        }
        .critical()
        .into();
        assert!(rc.crit);
        assert_eq!(rc.val, Some(vec![0x30, 0x05, 0x02, 0x01, 0x64, 0x04, 0x00]));
    }

    #[test]
    fn response_round_trip() {
        let pr = PagedResults {
            size: 1234,
            cookie: b"opaque".to_vec(),
        };
        let rc = RawControl::from(pr.clone());
        assert_eq!(rc.parse::<PagedResults>().unwrap(), pr);
    }

    #[test]
    fn malformed() {
        // missing cookie
        assert_eq!(
            PagedResults::parse(&[0x30, 0x03, 0x02, 0x01, 0x05]),
            Err(DecodeError::Expected("cookie"))
        );
        // cookie before size
        assert_eq!(
            PagedResults::parse(&[0x30, 0x05, 0x04, 0x00, 0x02, 0x01, 0x05]),
            Err(DecodeError::Expected("size"))
        );
        assert!(PagedResults::parse(&[0x30, 0x05, 0x02, 0x01, 0xFF, 0x04, 0x00]).is_err());
    }
}
