use crate::error::{Result, WidgetError};

/// Account tag stored in the first byte of every program account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    Uninitialized = 0,
    StakePool = 1,
    InactiveStakePool = 2,
    StakeAccount = 3,
    /// Bond accounts are inactive until the buyer transferred the funds
    InactiveBondAccount = 4,
    BondAccount = 5,
    CentralState = 6,
    Deleted = 7,
    FrozenStakePool = 8,
    FrozenStakeAccount = 9,
    FrozenBondAccount = 10,
    BondV2Account = 11,
    FrozenBondV2Account = 12,
}

impl Tag {
    pub fn from_byte(byte: u8) -> Option<Self> {
        use Tag::*;
        Some(match byte {
            0 => Uninitialized,
            1 => StakePool,
            2 => InactiveStakePool,
            3 => StakeAccount,
            4 => InactiveBondAccount,
            5 => BondAccount,
            6 => CentralState,
            7 => Deleted,
            8 => FrozenStakePool,
            9 => FrozenStakeAccount,
            10 => FrozenBondAccount,
            11 => BondV2Account,
            12 => FrozenBondV2Account,
            _ => return None,
        })
    }

    /// Check that `byte` is one of the `accepted` tags.
    pub(crate) fn expect(account: &'static str, byte: u8, accepted: &[Tag]) -> Result<Tag> {
        match Tag::from_byte(byte) {
            Some(tag) if accepted.contains(&tag) => Ok(tag),
            _ => Err(WidgetError::UnexpectedTag {
                account,
                found: byte,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tag_round_trips_through_its_byte() {
        for byte in 0u8..=12 {
            let tag = Tag::from_byte(byte).unwrap();
            assert_eq!(tag as u8, byte);
        }
        assert!(Tag::from_byte(13).is_none());
    }

    #[test]
    fn expect_rejects_other_tags() {
        assert!(Tag::expect("stake", 3, &[Tag::StakeAccount]).is_ok());
        let err = Tag::expect("stake", 1, &[Tag::StakeAccount]).unwrap_err();
        assert!(matches!(err, WidgetError::UnexpectedTag { found: 1, .. }));
    }
}
