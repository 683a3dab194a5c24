//! Block header layout and the offset arithmetic around it.
//!
//! ```text
//!   ┌────────────────────────────┬──────────────────────────────┐
//!   │ Header                     │ payload (`size` bytes)       │
//!   │ size | next | prev | tag   │                              │
//!   └────────────────────────────┴──────────────────────────────┘
//!                                ▲
//!                                └── pointer handed to the caller
//! ```

use std::{mem, ptr::NonNull};

/// Sentinel stamped on every block this allocator creates or hands out.
pub const BLOCK_TAG: u32 = 0xBADC_AFFE;

/// Bytes taken by the header in front of every payload.
pub const HEADER_SIZE: usize = mem::size_of::<Header>();

/// Alignment of every header, and therefore of every payload.
pub const PAYLOAD_ALIGN: usize = mem::align_of::<Header>();

const _: () = assert!(HEADER_SIZE % PAYLOAD_ALIGN == 0);
const _: () = assert!(PAYLOAD_ALIGN <= crate::align::WORD);

pub(crate) type Link = Option<Block>;

#[repr(C)]
pub(crate) struct Header {
  /// Payload capacity, excluding this header.
  size: usize,
  next: Link,
  prev: Link,
  tag: u32,
}

/// Handle to a header living inside an OS region.
///
/// Copying the handle never copies the block. Accessors are `unsafe`
/// because the handle is only meaningful while the header it points to is
/// mapped and was written by [`Block::init`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(transparent)]
pub(crate) struct Block(NonNull<Header>);

impl Block {
  /// Writes a fresh header at `base` for a block occupying `span` bytes in
  /// total, header included. Links are cleared and the tag is stamped.
  ///
  /// # Safety
  ///
  /// `base` must be `PAYLOAD_ALIGN`-aligned and valid for writes of `span`
  /// bytes, and `span` must exceed `HEADER_SIZE`.
  pub unsafe fn init(
    base: NonNull<u8>,
    span: usize,
  ) -> Block {
    debug_assert!(span > HEADER_SIZE);
    debug_assert_eq!(base.as_ptr() as usize % PAYLOAD_ALIGN, 0);

    let header = base.cast::<Header>();
    unsafe {
      header.write(Header {
        size: span - HEADER_SIZE,
        next: None,
        prev: None,
        tag: BLOCK_TAG,
      });
    }

    Block(header)
  }

  /// Recovers the header sitting immediately before `payload`.
  ///
  /// # Safety
  ///
  /// `payload` must have come from [`Block::payload`]. Nothing here checks
  /// that it did.
  pub unsafe fn from_payload(payload: NonNull<u8>) -> Block {
    Block(unsafe { payload.byte_sub(HEADER_SIZE) }.cast())
  }

  pub fn payload(self) -> NonNull<u8> {
    // The payload starts one header past the header's own address.
    unsafe { self.0.add(1) }.cast()
  }

  pub fn addr(self) -> usize {
    self.0.as_ptr() as usize
  }

  pub unsafe fn size(self) -> usize {
    unsafe { (*self.0.as_ptr()).size }
  }

  pub unsafe fn set_size(
    self,
    size: usize,
  ) {
    unsafe { (*self.0.as_ptr()).size = size }
  }

  pub unsafe fn next(self) -> Link {
    unsafe { (*self.0.as_ptr()).next }
  }

  pub unsafe fn set_next(
    self,
    next: Link,
  ) {
    unsafe { (*self.0.as_ptr()).next = next }
  }

  pub unsafe fn prev(self) -> Link {
    unsafe { (*self.0.as_ptr()).prev }
  }

  pub unsafe fn set_prev(
    self,
    prev: Link,
  ) {
    unsafe { (*self.0.as_ptr()).prev = prev }
  }

  pub unsafe fn tag(self) -> u32 {
    unsafe { (*self.0.as_ptr()).tag }
  }

  pub unsafe fn stamp(self) {
    unsafe { (*self.0.as_ptr()).tag = BLOCK_TAG }
  }

  /// Carves the front of this block down so it serves a request whose
  /// footprint is `real` bytes, and returns the leftover tail as a new
  /// unlinked block.
  ///
  /// The tail header is written at `payload + real`, while this block's
  /// recorded size becomes `real - HEADER_SIZE`. Returns `None`, leaving the
  /// block untouched, when fewer than `HEADER_SIZE + 1` bytes would remain.
  ///
  /// # Safety
  ///
  /// The block must be valid and not linked into any list, and `real` must
  /// be a multiple of `PAYLOAD_ALIGN` no smaller than `HEADER_SIZE`.
  pub unsafe fn trim(
    self,
    real: usize,
  ) -> Option<Block> {
    unsafe {
      let size = self.size();
      let remaining = size.checked_sub(real)?;

      if remaining < HEADER_SIZE + 1 {
        return None;
      }

      let tail = Block::init(self.payload().add(real), remaining);
      debug_assert!(tail.size() > 0);

      self.set_size(real - HEADER_SIZE);
      self.stamp();

      Some(tail)
    }
  }
}
