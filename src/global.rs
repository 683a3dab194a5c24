use std::{
  alloc::{GlobalAlloc, Layout, System},
  ptr::{self, NonNull},
  sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{allocator::Allocator, block::PAYLOAD_ALIGN, config::Config};

/// [`Allocator`] shaped as a process-wide `#[global_allocator]`.
///
/// ```rust,ignore
/// use flalloc::GlobalFreeList;
///
/// #[global_allocator]
/// static HEAP: GlobalFreeList = GlobalFreeList::new();
/// ```
///
/// Layouts aligned beyond a block header are passed through to
/// [`System`]. Events and live-block tracking are disabled: both would
/// allocate while the lock is held.
pub struct GlobalFreeList {
  heap: Mutex<Allocator>,
}

impl GlobalFreeList {
  pub const fn new() -> Self {
    Self::with_config(Config::new())
  }

  pub const fn with_config(config: Config) -> Self {
    Self {
      heap: Mutex::new(Allocator::with_config(config.quiet().track_live_blocks(false))),
    }
  }

  fn lock(&self) -> MutexGuard<'_, Allocator> {
    self.heap.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Reuse counter of the wrapped allocator.
  pub fn reuse_count(&self) -> u64 {
    self.lock().reuse_count()
  }
}

impl Default for GlobalFreeList {
  fn default() -> Self {
    Self::new()
  }
}

unsafe impl GlobalAlloc for GlobalFreeList {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > PAYLOAD_ALIGN {
      return unsafe { System.alloc(layout) };
    }

    self
      .lock()
      .allocate(layout.size().max(1))
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  unsafe fn dealloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
  ) {
    if layout.align() > PAYLOAD_ALIGN {
      return unsafe { System.dealloc(ptr, layout) };
    }

    unsafe { self.lock().release(ptr) }
  }
}
