use thiserror::Error;

/// Allocator operation result
pub type AllocResult<T> = Result<T, AllocError>;

/// Conditions the allocator refuses to continue past.
///
/// Only [`Allocator::try_allocate`](crate::Allocator::try_allocate) and
/// [`Allocator::try_release`](crate::Allocator::try_release) hand these to
/// the caller; the plain `allocate`/`release` pair aborts the process on
/// any of them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
  #[error("OS refused to map {requested} bytes (errno {errno})")]
  OutOfMemory { requested: usize, errno: i32 },

  #[error("Memory corruption detected at 0x{address:x}: tag 0x{found:08x}")]
  CorruptionDetected { address: usize, found: u32 },

  #[error("Block 0x{0:x} is not on the free list")]
  NotInFreeList(usize),

  #[error("Pointer 0x{0:x} is not a live allocation of this allocator")]
  ForeignPointer(usize),

  #[error("Invalid chunk size {size}: must be a word multiple of at least {min} bytes")]
  InvalidChunkSize { size: usize, min: usize },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_messages() {
    let err = AllocError::CorruptionDetected { address: 0x1000, found: 0xDEAD_BEEF };
    assert_eq!(err.to_string(), "Memory corruption detected at 0x1000: tag 0xdeadbeef");

    let err = AllocError::NotInFreeList(0x20);
    assert_eq!(err.to_string(), "Block 0x20 is not on the free list");
  }
}
