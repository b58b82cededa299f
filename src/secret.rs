//! Fixed-capacity storage for password characters
//!
//! A [`SecretBuffer`] lives on the stack of the acquisition call and is
//! wiped with [`zeroize`], which the optimizer cannot elide, both when
//! [`SecretBuffer::wipe`] is called and when the buffer is dropped.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::MAX_PASSWORD_LEN;

/// Backing slots: one per storable character plus a terminating sentinel.
pub const BUFFER_LEN: usize = MAX_PASSWORD_LEN + 1;

/// One password entry, made of terminal input units (`u8` on POSIX,
/// `u16` on the Windows console).
///
/// Units beyond [`MAX_PASSWORD_LEN`] are counted but not stored, so an
/// over-long entry can be rejected instead of being silently truncated.
pub struct SecretBuffer<U: Copy + Default + Zeroize> {
    data: [U; BUFFER_LEN],
    consumed: usize,
}

impl<U: Copy + Default + Zeroize> SecretBuffer<U> {
    pub fn new() -> Self {
        Self {
            data: [U::default(); BUFFER_LEN],
            consumed: 0,
        }
    }

    /// Records one consumed input unit, storing it only while there is room.
    pub fn push(&mut self, unit: U) {
        if self.consumed < MAX_PASSWORD_LEN {
            self.data[self.consumed] = unit;
        }
        self.consumed = self.consumed.saturating_add(1);
    }

    /// Number of units consumed, including the ones that were not stored.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn is_overlong(&self) -> bool {
        self.consumed > MAX_PASSWORD_LEN
    }

    /// Writes the sentinel right after the stored units.
    pub fn terminate(&mut self) {
        let end = self.len();
        self.data[end] = U::default();
    }

    /// Number of stored units.
    pub fn len(&self) -> usize {
        self.consumed.min(MAX_PASSWORD_LEN)
    }

    pub fn is_empty(&self) -> bool {
        self.consumed == 0
    }

    pub fn as_slice(&self) -> &[U] {
        &self.data[..self.len()]
    }

    /// True when both entries consumed the same input.
    pub fn matches(&self, other: &Self) -> bool
    where
        U: PartialEq,
    {
        self.consumed == other.consumed && self.as_slice() == other.as_slice()
    }

    /// Overwrites every slot with zero and forgets the consumed count.
    pub fn wipe(&mut self) {
        self.data.zeroize();
        self.consumed = 0;
    }

    /// The complete backing storage, stored or not; lets callers confirm a wipe.
    pub fn storage(&self) -> &[U] {
        &self.data
    }
}

impl<U: Copy + Default + Zeroize> Default for SecretBuffer<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: Copy + Default + Zeroize> Drop for SecretBuffer<U> {
    fn drop(&mut self) {
        self.wipe();
    }
}

impl<U: Copy + Default + Zeroize> ZeroizeOnDrop for SecretBuffer<U> {}
