/// Identity of an OS thread.
///
/// Obtaining it never allocates on unix, so it is safe to call from inside the
/// allocator. Identities of exited threads may be reused by new threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadId(usize);

impl ThreadId {
    /// The identity of the calling thread.
    #[cfg(unix)]
    #[inline]
    pub fn current() -> Self {
        // Safety: pthread_self is always safe to call and cannot fail.
        let id = unsafe { libc::pthread_self() };
        Self(id as usize)
    }

    /// The identity of the calling thread.
    #[cfg(not(unix))]
    #[inline]
    pub fn current() -> Self {
        std::thread_local! {
            static MARKER: u8 = const { 0 };
        }
        // Each live thread owns a distinct copy of MARKER.
        MARKER.with(|marker| Self(core::ptr::from_ref(marker) as usize))
    }

    pub(crate) const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub(crate) const fn into_raw(self) -> usize {
        self.0
    }
}
