pub const MANAGE_DSA_IT_OID: &str = "2.16.840.1.113730.3.4.2";
pub const SUBTREE_DELETE_OID: &str = "1.2.840.113556.1.4.805";
pub const NOOP_OID: &str = "1.3.6.1.4.1.4203.1.10.2";
pub const REAL_ATTRS_ONLY_OID: &str = "2.16.840.1.113730.3.4.17";
pub const VIRTUAL_ATTRS_ONLY_OID: &str = "2.16.840.1.113730.3.4.19";
pub const PERMISSIVE_MODIFY_OID: &str = "1.2.840.113556.1.4.1413";
pub const AD_NOTIFICATION_OID: &str = "1.2.840.113556.1.4.528";

flag_control!(
    /// ManageDsaIT control ([RFC 3296](https://tools.ietf.org/html/rfc3296)).
    ///
    /// Referral and other special objects are treated as ordinary entries.
    ManageDsaIt,
    MANAGE_DSA_IT_OID
);

flag_control!(
    /// Subtree Delete control
    /// ([draft-armijo-ldap-treedelete](https://tools.ietf.org/html/draft-armijo-ldap-treedelete-02)).
    SubtreeDelete,
    SUBTREE_DELETE_OID
);

flag_control!(
    /// No-Op control ([draft-zeilenga-ldap-noop](https://tools.ietf.org/html/draft-zeilenga-ldap-noop-01)).
    ///
    /// The update is processed, but not applied.
    NoOp,
    NOOP_OID
);

flag_control!(
    /// Real Attributes Only control.
    RealAttrsOnly,
    REAL_ATTRS_ONLY_OID
);

flag_control!(
    /// Virtual Attributes Only control.
    VirtualAttrsOnly,
    VIRTUAL_ATTRS_ONLY_OID
);

flag_control!(
    /// Permissive Modify control, as defined by Active Directory.
    ///
    /// Adding a value which is already present, or deleting one which isn't,
    /// succeeds instead of failing the modification.
    PermissiveModify,
    PERMISSIVE_MODIFY_OID
);

flag_control!(
    /// Active Directory change notification request control.
    ///
    /// Sent with a persistent search; the server returns entries as they change.
    AdNotification,
    AD_NOTIFICATION_OID
);

#[cfg(test)]
mod test {
    use super::*;
    use crate::controls::{ControlParser, MakeCritical, RawControl};

    #[test]
    fn flags_encode_without_value() {
        let rc: RawControl = SubtreeDelete.critical().into();
        assert_eq!(
            rc,
            RawControl {
                ctype: SUBTREE_DELETE_OID.into(),
                crit: true,
                val: None
            }
        );
        let rc: RawControl = NoOp.into();
        assert!(!rc.crit);
        assert_eq!(rc.parse::<NoOp>().unwrap(), NoOp);
    }

    #[test]
    fn flags_reject_value() {
        assert!(RealAttrsOnly::parse(&[]).is_err());
        assert!(VirtualAttrsOnly::parse(&[0x05, 0x00]).is_err());
        assert_eq!(ManageDsaIt::parse_absent(), Ok(ManageDsaIt));
        assert!(PermissiveModify::parse(&[0x04, 0x00]).is_err());
    }

    #[test]
    fn active_directory_flags() {
        let rc: RawControl = PermissiveModify.into();
        assert_eq!(rc.ctype, "1.2.840.113556.1.4.1413");
        assert_eq!(rc.val, None);
        assert_eq!(rc.parse::<PermissiveModify>().unwrap(), PermissiveModify);
        let rc: RawControl = AdNotification.critical().into();
        assert_eq!(rc.ctype, "1.2.840.113556.1.4.528");
        assert!(rc.crit);
        assert_eq!(rc.parse::<AdNotification>().unwrap(), AdNotification);
    }
}
