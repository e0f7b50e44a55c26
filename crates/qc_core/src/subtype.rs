//! Per-value protection bits.

use bitflags::bitflags;

bitflags! {
    /// Protection bits carried alongside every value.
    ///
    /// The copy gateway and the mutating builtins consult these before
    /// acting. Bits keep the numbering of the calculator `protect()` builtin.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Subtype: u16 {
        const NO_ASSIGN_TO = 0x0001;
        const NO_NEW_VALUE = 0x0002;
        const NO_NEW_TYPE = 0x0004;
        const NO_ERROR = 0x0008;
        const NO_COPY_TO = 0x0010;
        const NO_REALLOC = 0x0020;
        const NO_ASSIGN_FROM = 0x0040;
        const NO_COPY_FROM = 0x0080;
        const PROTECT_ALL = 0x00ff;
    }
}

impl Subtype {
    pub fn from_protect_bits(bits: i64) -> Self {
        Subtype::from_bits_truncate((bits & 0xff) as u16)
    }

    pub fn can_grow(self) -> bool {
        !self.contains(Subtype::NO_REALLOC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protect_all_covers_every_bit() {
        assert!(Subtype::PROTECT_ALL.contains(Subtype::NO_COPY_FROM | Subtype::NO_REALLOC));
        assert_eq!(Subtype::from_protect_bits(0x1ff), Subtype::PROTECT_ALL);
    }

    #[test]
    fn realloc_bit_disables_growth() {
        assert!(Subtype::empty().can_grow());
        assert!(!(Subtype::NO_REALLOC | Subtype::NO_ERROR).can_grow());
    }
}
