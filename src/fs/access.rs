use std::{fmt, str::FromStr};

use bitflags::bitflags;

use super::FsError;

bitflags! {
    /// access bits stored in a directory record
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessRights: u8 {
        const READ = 0x04;
        const WRITE = 0x02;
        const EXECUTE = 0x01;
    }
}

impl AccessRights {
    /// rights of every freshly created file and directory
    pub const fn default_new() -> Self {
        AccessRights::READ.union(AccessRights::WRITE)
    }

    /// mask of one rights digit, `1` to `7`
    fn from_digit(digit: char) -> Result<Self, FsError> {
        match digit {
            '1'..='7' => {
                let bits = digit as u8 - b'0';
                Ok(AccessRights::from_bits_truncate(bits))
            }
            other => Err(FsError::InvalidRights(other)),
        }
    }
}

/// digits are OR-ed together, `"4"` is read only and `"42"` read-write
impl FromStr for AccessRights {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(FsError::EmptyRights);
        }
        s.chars().try_fold(AccessRights::empty(), |acc, digit| {
            Ok(acc | AccessRights::from_digit(digit)?)
        })
    }
}

/// `rwx` style, a `-` for every missing bit
impl fmt::Display for AccessRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bit = |flag: AccessRights, c: char| if self.contains(flag) { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            bit(AccessRights::READ, 'r'),
            bit(AccessRights::WRITE, 'w'),
            bit(AccessRights::EXECUTE, 'x')
        )
    }
}
