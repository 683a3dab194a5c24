//! Doubly linked list of unused blocks.
//!
//! ```text
//!   head ──► [blk] ◄──► [blk] ◄──► [blk] ──► None
//! ```
//!
//! Insertion is LIFO at the head; no order by size or address is kept.
//! Only blocks that are currently linked are ever dereferenced through the
//! list, which is what keeps `remove` and iteration safe to call.

use std::marker::PhantomData;

use crate::{
  block::{Block, Link},
  error::{AllocError, AllocResult},
};

pub(crate) struct FreeList {
  head: Link,
  len: usize,
}

impl FreeList {
  pub const fn new() -> Self {
    Self { head: None, len: 0 }
  }

  pub fn head(&self) -> Link {
    self.head
  }

  pub fn len(&self) -> usize {
    self.len
  }

  /// Pushes `block` in front of the current head.
  ///
  /// # Safety
  ///
  /// `block` must be a valid, tagged block that is not already linked.
  pub unsafe fn add(
    &mut self,
    block: Block,
  ) {
    unsafe {
      block.set_prev(None);
      block.set_next(self.head);

      if let Some(head) = self.head {
        head.set_prev(Some(block));
      }
    }

    self.head = Some(block);
    self.len += 1;
  }

  /// Unlinks `block` from wherever it sits in the list.
  ///
  /// O(1) when `block` is the head, otherwise a scan by identity. A block
  /// that is not linked is a broken caller contract and is reported as
  /// [`AllocError::NotInFreeList`].
  pub fn remove(
    &mut self,
    block: Block,
  ) -> AllocResult<()> {
    let head = self.head.ok_or(AllocError::NotInFreeList(block.addr()))?;

    if head == block {
      unsafe {
        self.head = block.next();
        if let Some(next) = self.head {
          next.set_prev(None);
        }
      }
    } else {
      if !self.iter().any(|linked| linked == block) {
        return Err(AllocError::NotInFreeList(block.addr()));
      }

      // Not the head, so `prev` is always set.
      unsafe {
        let prev = block.prev();
        let next = block.next();

        if let Some(prev) = prev {
          prev.set_next(next);
        }
        if let Some(next) = next {
          next.set_prev(prev);
        }
      }
    }

    unsafe {
      block.set_next(None);
      block.set_prev(None);
    }
    self.len -= 1;

    Ok(())
  }

  /// Read-only walk from `start` to the end of the list, handing each
  /// block's position and size to `visit`.
  ///
  /// # Safety
  ///
  /// `start` must be `None` or a block currently linked into a free list.
  pub unsafe fn traverse<F>(
    start: Link,
    mut visit: F,
  ) where
    F: FnMut(usize, usize),
  {
    let mut cursor = start;
    let mut n = 0;

    while let Some(block) = cursor {
      unsafe {
        visit(n, block.size());
        cursor = block.next();
      }
      n += 1;
    }
  }

  pub fn iter(&self) -> Iter<'_> {
    Iter {
      cursor: self.head,
      _list: PhantomData,
    }
  }

  /// Block sizes from head to tail.
  pub fn sizes(&self) -> Vec<usize> {
    let mut sizes = Vec::with_capacity(self.len);
    unsafe { Self::traverse(self.head, |_, size| sizes.push(size)) };
    sizes
  }
}

pub(crate) struct Iter<'a> {
  cursor: Link,
  _list: PhantomData<&'a FreeList>,
}

impl Iterator for Iter<'_> {
  type Item = Block;

  fn next(&mut self) -> Option<Block> {
    let block = self.cursor?;
    self.cursor = unsafe { block.next() };
    Some(block)
  }
}
