use bitflags::bitflags;

bitflags! {
    /// Behaviour bits of a [`Cursor`](crate::Cursor).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GiFlags: u32 {
        /// Register every produced header as a transaction element.
        const TS_ADD = 1 << 0;
        /// Check and order the transaction when the source is exhausted,
        /// then replay the ordered elements.
        const TS_ORDER = 1 << 1;
        /// Copy arguments verbatim instead of glob-expanding them.
        const NO_GLOB = 1 << 2;
        /// Never reinterpret a worklist entry as a manifest.
        const NO_MANIFEST = 1 << 3;
        /// Report steps without materializing headers.
        const NO_HEADER = 1 << 4;
        /// Accumulate erase elements instead of install elements.
        const ERASING = 1 << 5;
    }
}

impl GiFlags {
    /// `TS_ADD | TS_ORDER`, the transaction mode of the command line front end.
    pub const TRANSACTION: Self = Self::TS_ADD.union(Self::TS_ORDER);
}
