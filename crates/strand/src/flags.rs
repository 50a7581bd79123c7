//! Flags threaded through attribute access.

use bitflags::bitflags;

bitflags! {
    /// Variant behaviours requested by a caller of
    /// [`Root::get_attribute`](crate::root::Root::get_attribute) or
    /// [`Root::set_attribute`](crate::root::Root::set_attribute).
    ///
    /// Roots pass flags through unmodified; bits a root does not know are
    /// kept and ignored.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttrFlags: u8 {
        /// Do not record a failed lookup in the ledger.
        const NO_LOOKUP = 1 << 0;
        /// Fail with `Missing` instead of creating an attribute on set.
        const NO_CREATE = 1 << 1;

        const _ = !0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_bits_survive() {
        let flags = AttrFlags::from_bits_retain(0b1000_0001);
        assert!(flags.contains(AttrFlags::NO_LOOKUP));
        assert!(!flags.contains(AttrFlags::NO_CREATE));
        assert_eq!(flags.bits(), 0b1000_0001);
    }
}
