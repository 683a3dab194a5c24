use std::{
  collections::HashSet,
  io::{self, Write},
  process,
  ptr::NonNull,
};

use tracing::{debug, error, trace};

use crate::{
  align::align_word,
  block::{BLOCK_TAG, Block, HEADER_SIZE},
  config::Config,
  diagnostics,
  error::{AllocError, AllocResult},
  free_list::FreeList,
  os,
};

/// Snapshot of allocator counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
  /// Requests served from the free list.
  pub reuse_count: u64,
  pub free_blocks: usize,
  /// Sum of recorded payload sizes on the free list.
  pub free_bytes: usize,
  /// Regions mapped from the OS so far.
  pub os_regions: usize,
  pub os_bytes: usize,
}

/// First-fit allocator over a LIFO free list of OS-backed blocks.
///
/// All state lives in the value, so independent allocators never share
/// blocks. It is not synchronized; wrap it in a lock to share it, as
/// [`GlobalFreeList`](crate::GlobalFreeList) does.
pub struct Allocator {
  config: Config,
  free_list: FreeList,
  reuse_count: u64,
  os_regions: usize,
  os_bytes: usize,
  live: Option<HashSet<usize>>,
}

// SAFETY: every block reachable from an `Allocator` sits in a region that
// allocator mapped itself, and blocks are only touched through `&mut self`.
unsafe impl Send for Allocator {}

impl Allocator {
  pub const fn new() -> Self {
    Self::with_config(Config::new())
  }

  pub const fn with_config(config: Config) -> Self {
    Self {
      config,
      free_list: FreeList::new(),
      reuse_count: 0,
      os_regions: 0,
      os_bytes: 0,
      live: None,
    }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Footprint of a block serving `size` bytes, header included, or `None`
  /// for requests that cannot be served at all.
  fn real_size(size: usize) -> Option<usize> {
    if size == 0 {
      return None;
    }

    align_word(size)?.checked_add(HEADER_SIZE)
  }

  /// Returns a pointer to at least `size` writable bytes.
  ///
  /// `Ok(None)` means the request itself was invalid (zero, or too large to
  /// describe); every `Err` is a condition the allocator cannot recover
  /// from.
  pub fn try_allocate(
    &mut self,
    size: usize,
  ) -> AllocResult<Option<NonNull<u8>>> {
    let Some(real) = Self::real_size(size) else {
      return Ok(None);
    };

    let block = match self.first_fit(real) {
      Some(candidate) => self.reuse(candidate, real)?,
      None if real > self.config.chunk_size() => self.map_large(real)?,
      None => self.map_chunk(real)?,
    };

    let payload = block.payload();

    if self.config.tracks_live_blocks() {
      self
        .live
        .get_or_insert_with(HashSet::new)
        .insert(payload.as_ptr() as usize);
    }

    Ok(Some(payload))
  }

  /// Like [`try_allocate`](Self::try_allocate), aborting the process on
  /// any error.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    match self.try_allocate(size) {
      Ok(payload) => payload,
      Err(err) => self.fatal(err),
    }
  }

  fn first_fit(
    &self,
    real: usize,
  ) -> Option<Block> {
    // Recorded sizes exclude the header while `real` includes one; the
    // comparison deliberately mixes the two.
    self
      .free_list
      .iter()
      .find(|block| unsafe { block.size() } >= real)
  }

  fn reuse(
    &mut self,
    block: Block,
    real: usize,
  ) -> AllocResult<Block> {
    self.free_list.remove(block)?;
    self.reuse_count += 1;

    let size = unsafe { block.size() };
    if size != real {
      self.split(block, real);
    }

    unsafe { block.stamp() };

    if self.config.events() {
      trace!(
        block = ?block.payload(),
        size,
        real,
        reuse_count = self.reuse_count,
        "reused free block"
      );
    }

    Ok(block)
  }

  /// Trims `block` to `real` and pushes any usable tail onto the free list.
  fn split(
    &mut self,
    block: Block,
    real: usize,
  ) {
    let Some(tail) = (unsafe { block.trim(real) }) else {
      return;
    };

    unsafe { self.free_list.add(tail) };

    if self.config.events() {
      trace!(
        block = ?block.payload(),
        tail = ?tail.payload(),
        tail_size = unsafe { tail.size() },
        "split block"
      );
    }
  }

  /// Dedicated region for a request larger than a standard chunk. The block
  /// goes straight to the caller.
  fn map_large(
    &mut self,
    real: usize,
  ) -> AllocResult<Block> {
    let region = self.acquire(real)?;
    Ok(unsafe { Block::init(region, real) })
  }

  /// Fresh standard chunk, carved for `real` with the tail kept free.
  fn map_chunk(
    &mut self,
    real: usize,
  ) -> AllocResult<Block> {
    let chunk_size = self.config.chunk_size();
    let region = self.acquire(chunk_size)?;
    let block = unsafe { Block::init(region, chunk_size) };

    self.split(block, real);

    Ok(block)
  }

  fn acquire(
    &mut self,
    size: usize,
  ) -> AllocResult<NonNull<u8>> {
    let region = os::acquire(size)?;

    self.os_regions += 1;
    self.os_bytes += size;

    if self.config.events() {
      debug!(size, region = ?region, regions = self.os_regions, "mapped region from OS");
    }

    Ok(region)
  }

  /// Puts the block behind `ptr` back on the free list. Null is a no-op.
  ///
  /// Adjacent free blocks are never merged.
  ///
  /// # Safety
  ///
  /// `ptr` must be null or a pointer returned by this allocator that has not
  /// been released since. Only the block tag is checked, unless live-block
  /// tracking is enabled in the [`Config`].
  pub unsafe fn try_release(
    &mut self,
    ptr: *mut u8,
  ) -> AllocResult<()> {
    let Some(payload) = NonNull::new(ptr) else {
      return Ok(());
    };

    let address = ptr as usize;

    if self.config.tracks_live_blocks()
      && !self.live.as_ref().is_some_and(|live| live.contains(&address))
    {
      return Err(AllocError::ForeignPointer(address));
    }

    let block = unsafe { Block::from_payload(payload) };
    let found = unsafe { block.tag() };

    if found != BLOCK_TAG {
      return Err(AllocError::CorruptionDetected {
        address: block.addr(),
        found,
      });
    }

    // Only a block that passed the tag check stops being live.
    if let Some(live) = self.live.as_mut() {
      live.remove(&address);
    }

    unsafe { self.free_list.add(block) };

    if self.config.events() {
      trace!(block = ?payload, size = unsafe { block.size() }, "released block");
    }

    Ok(())
  }

  /// Like [`try_release`](Self::try_release), aborting the process on a
  /// corrupted or foreign block.
  ///
  /// # Safety
  ///
  /// Same contract as [`try_release`](Self::try_release).
  pub unsafe fn release(
    &mut self,
    ptr: *mut u8,
  ) {
    if let Err(err) = unsafe { self.try_release(ptr) } {
      self.fatal(err);
    }
  }

  fn fatal(
    &self,
    err: AllocError,
  ) -> ! {
    if self.config.events() {
      error!(error = %err, "allocator state cannot be trusted, aborting");
    }

    process::abort()
  }

  pub fn reuse_count(&self) -> u64 {
    self.reuse_count
  }

  /// Recorded sizes on the free list, head first.
  pub fn free_block_sizes(&self) -> Vec<usize> {
    self.free_list.sizes()
  }

  pub fn stats(&self) -> Stats {
    let sizes = self.free_list.sizes();

    Stats {
      reuse_count: self.reuse_count,
      free_blocks: self.free_list.len(),
      free_bytes: sizes.iter().sum(),
      os_regions: self.os_regions,
      os_bytes: self.os_bytes,
    }
  }

  /// Appends `label` and the current free list to the process debug log
  /// ([`diagnostics::LOG_FILE_NAME`]).
  pub fn report(
    &self,
    label: &str,
  ) -> io::Result<()> {
    diagnostics::process_log().write_report(label, self.free_list.sizes())
  }

  /// Writes the same dump as [`report`](Self::report) to `out`.
  pub fn report_to<W>(
    &self,
    out: &mut W,
    label: &str,
  ) -> io::Result<()>
  where
    W: Write + ?Sized,
  {
    let mut sizes = Vec::with_capacity(self.free_list.len());
    unsafe { FreeList::traverse(self.free_list.head(), |_, size| sizes.push(size)) };

    diagnostics::write_report(out, label, sizes)
  }
}

impl Default for Allocator {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use std::ptr;

  use pretty_assertions::assert_eq;

  use super::*;

  const CHUNK: usize = 4096;

  fn small() -> Allocator {
    Allocator::with_config(Config::new().with_chunk_size(CHUNK).unwrap().quiet())
  }

  #[test]
  fn test_alloc() {
    let mut allocator = small();

    unsafe {
      let first_addr = allocator.allocate(8).unwrap().as_ptr() as *mut u64;

      *first_addr = 3u64;

      assert_eq!(*first_addr, 3);

      let size: usize = 6;

      let second_addr = allocator.allocate(size * 2).unwrap().as_ptr() as *mut u16;

      for i in 0..size {
        *(second_addr.add(i)) = (i + 1) as u16;
      }

      assert_eq!(*first_addr, 3);

      for i in 0..size {
        assert_eq!((i + 1) as u16, *(second_addr.add(i)))
      }

      allocator.release(first_addr as *mut u8);

      // Recorded size 8 never fits a request of 8 + header, so the free
      // tail of the chunk serves it instead.
      let third_addr = allocator.allocate(8).unwrap().as_ptr() as *mut u64;

      assert_ne!(first_addr, third_addr);
      assert!(third_addr > second_addr as *mut u64);
    }
  }

  #[test]
  fn test_real_size() {
    assert_eq!(Allocator::real_size(0), None);
    assert_eq!(Allocator::real_size(1), align_word(1).map(|s| s + HEADER_SIZE));
    assert_eq!(Allocator::real_size(64), Some(64 + HEADER_SIZE));
    assert_eq!(Allocator::real_size(usize::MAX), None);
    assert_eq!(Allocator::real_size(usize::MAX - HEADER_SIZE), None);
  }

  #[test]
  fn test_fresh_chunk_is_carved() {
    let mut allocator = small();

    allocator.allocate(100).unwrap();

    let real = align_word(100).unwrap() + HEADER_SIZE;
    assert_eq!(allocator.free_block_sizes(), vec![CHUNK - HEADER_SIZE - real - HEADER_SIZE]);
    assert_eq!(allocator.stats().os_regions, 1);
    assert_eq!(allocator.reuse_count(), 0);
  }

  #[test]
  fn test_chunk_within_one_header_is_not_split() {
    let mut allocator = small();

    // real == CHUNK, larger than the chunk block's own capacity.
    let size = CHUNK - HEADER_SIZE;
    let payload = allocator.allocate(size).unwrap();

    unsafe { ptr::write_bytes(payload.as_ptr(), 0x7E, size) };

    assert!(allocator.free_block_sizes().is_empty());
    assert_eq!(allocator.stats().os_bytes, CHUNK);

    unsafe { allocator.release(payload.as_ptr()) };
    assert_eq!(allocator.free_block_sizes(), vec![CHUNK - HEADER_SIZE]);
  }

  #[test]
  fn test_large_request_gets_own_region() {
    let mut allocator = small();

    let size = CHUNK;
    let payload = allocator.allocate(size).unwrap();

    assert!(allocator.free_block_sizes().is_empty());
    assert_eq!(
      allocator.stats(),
      Stats {
        reuse_count: 0,
        free_blocks: 0,
        free_bytes: 0,
        os_regions: 1,
        os_bytes: size + HEADER_SIZE,
      }
    );

    unsafe { allocator.release(payload.as_ptr()) };
    assert_eq!(allocator.free_block_sizes(), vec![size]);
  }

  #[test]
  fn test_exact_fit_does_not_split() {
    let mut allocator = small();

    let first = allocator.allocate(256).unwrap();
    unsafe { allocator.release(first.as_ptr()) };
    let before = allocator.free_block_sizes();

    let again = allocator.allocate(256 - HEADER_SIZE).unwrap();

    assert_eq!(again, first);
    assert_eq!(allocator.free_block_sizes(), before[1..].to_vec());
    assert_eq!(allocator.reuse_count(), 1);
  }

  #[test]
  fn test_corrupted_tag_is_reported() {
    let mut allocator = small();
    let payload = allocator.allocate(64).unwrap();
    let free_before = allocator.free_block_sizes();

    unsafe {
      ptr::write_bytes(payload.as_ptr().sub(HEADER_SIZE), 0, HEADER_SIZE);

      assert_eq!(
        allocator.try_release(payload.as_ptr()),
        Err(AllocError::CorruptionDetected {
          address: payload.as_ptr() as usize - HEADER_SIZE,
          found: 0,
        })
      );
    }

    assert_eq!(allocator.free_block_sizes(), free_before);
  }

  #[test]
  fn test_tracking_rejects_foreign_and_double_release() {
    let mut allocator =
      Allocator::with_config(Config::new().with_chunk_size(CHUNK).unwrap().quiet().track_live_blocks(true));

    let mut local = [0u8; 64];
    let foreign = local.as_mut_ptr();

    unsafe {
      assert_eq!(
        allocator.try_release(foreign),
        Err(AllocError::ForeignPointer(foreign as usize))
      );

      let payload = allocator.allocate(32).unwrap().as_ptr();
      assert_eq!(allocator.try_release(payload), Ok(()));
      assert_eq!(
        allocator.try_release(payload),
        Err(AllocError::ForeignPointer(payload as usize))
      );
    }

    assert_eq!(allocator.free_block_sizes().len(), 2);
  }

  #[test]
  fn test_tracking_keeps_corrupted_block_live() {
    let mut allocator =
      Allocator::with_config(Config::new().with_chunk_size(CHUNK).unwrap().quiet().track_live_blocks(true));

    let payload = allocator.allocate(64).unwrap().as_ptr();
    let header = unsafe { payload.sub(HEADER_SIZE) };
    let mut saved = [0u8; HEADER_SIZE];

    unsafe {
      ptr::copy_nonoverlapping(header, saved.as_mut_ptr(), HEADER_SIZE);
      ptr::write_bytes(header, 0, HEADER_SIZE);

      assert_eq!(
        allocator.try_release(payload),
        Err(AllocError::CorruptionDetected {
          address: header as usize,
          found: 0,
        })
      );

      // Once the header is repaired the block is still known as live.
      ptr::copy_nonoverlapping(saved.as_ptr(), header, HEADER_SIZE);
      assert_eq!(allocator.try_release(payload), Ok(()));
    }

    assert_eq!(allocator.free_block_sizes()[0], 64);
  }

  #[test]
  fn test_exhausted_address_space_is_reported() {
    let mut allocator = small();
    let size = usize::MAX / 2;

    assert_eq!(
      allocator.try_allocate(size),
      Err(AllocError::OutOfMemory {
        requested: align_word(size).unwrap() + HEADER_SIZE,
        errno: libc::ENOMEM,
      })
    );
    assert_eq!(allocator.stats().os_regions, 0);
    assert!(allocator.free_block_sizes().is_empty());
  }

  #[test]
  fn test_report_to() {
    let mut allocator = small();
    allocator.allocate(100).unwrap();

    let mut out = Vec::new();
    allocator.report_to(&mut out, "POST ALLOC").unwrap();

    let tail = allocator.free_block_sizes()[0];
    assert_eq!(
      String::from_utf8(out).unwrap(),
      format!("flalloc: [POST ALLOC]\nflalloc: [freeblk no. 0] [size {}]\n", tail)
    );
  }
}
