use std::{io, ptr, ptr::NonNull};

use crate::error::{AllocError, AllocResult};

/// Maps `size` bytes of anonymous, zero-filled, private read/write memory.
///
/// Regions are never unmapped; they go back to the OS when the process
/// exits.
pub(crate) fn acquire(size: usize) -> AllocResult<NonNull<u8>> {
  let addr = unsafe {
    libc::mmap(
      ptr::null_mut(),
      size,
      libc::PROT_READ | libc::PROT_WRITE,
      libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
      -1,
      0,
    )
  };

  if addr == libc::MAP_FAILED {
    let errno = io::Error::last_os_error().raw_os_error().unwrap_or(0);
    return Err(AllocError::OutOfMemory { requested: size, errno });
  }

  NonNull::new(addr.cast::<u8>()).ok_or(AllocError::OutOfMemory { requested: size, errno: 0 })
}
