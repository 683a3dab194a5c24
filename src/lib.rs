//! # flalloc - A First-Fit Free-List Allocator
//!
//! This crate provides a user-space heap that carves blocks out of large
//! anonymous memory regions obtained from the OS with `mmap(2)`, and keeps
//! released blocks on a doubly linked **free list** for reuse.
//!
//! ## Overview
//!
//! ```text
//!   Free list (LIFO, unordered):
//!
//!   head
//!    │
//!    ▼
//!   ┌──────────────┐      ┌──────────────┐      ┌──────────────┐
//!   │ hdr │ 96 B   │ ◄──► │ hdr │ 4 KiB  │ ◄──► │ hdr │ 3.9 MiB│ ──► None
//!   └──────────────┘      └──────────────┘      └──────────────┘
//!     last released                               tail of a chunk
//! ```
//!
//! - **Allocation** walks the list from the head and takes the first block
//!   whose recorded size is at least `request + header` (the sizes compared
//!   are in different units; the quirk is kept on purpose). An exact match is
//!   handed out as is, a larger block is split and its tail pushed back.
//! - When nothing fits, a standard 4 MiB **chunk** is mapped and split the
//!   same way. A request bigger than a chunk gets a region of its own.
//! - **Release** reads the header just before the pointer, checks its tag
//!   and pushes the block onto the head. Neighbouring free blocks are never
//!   merged and memory is never returned to the OS.
//!
//! ## Crate Structure
//!
//! ```text
//!   flalloc
//!   ├── align        - word rounding of request sizes
//!   ├── block        - block header layout and split arithmetic (internal)
//!   ├── os           - anonymous mmap regions (internal)
//!   ├── free_list    - doubly linked free list (internal)
//!   ├── allocator    - Allocator: allocate / release / stats
//!   ├── diagnostics  - free-list dumps to the debug log
//!   ├── config       - Config: chunk size and runtime switches
//!   ├── error        - AllocError
//!   ├── global       - GlobalFreeList: GlobalAlloc adapter
//!   └── logging      - tracing subscriber setup
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use flalloc::Allocator;
//!
//! let mut allocator = Allocator::new();
//!
//! let ptr = allocator.allocate(64).expect("non-zero request");
//!
//! unsafe {
//!     ptr.as_ptr().write_bytes(0xAB, 64);
//!     allocator.release(ptr.as_ptr());
//! }
//!
//! assert!(allocator.allocate(0).is_none());
//! ```
//!
//! ## Block Layout
//!
//! ```text
//!   Split of a fresh chunk for a request of N bytes (real = N + H):
//!
//!   ┌─────┬──────────────────────────┬─────┬────────────────────────────┐
//!   │  H  │  real bytes              │  H  │  remainder                 │
//!   └─────┴──────────────────────────┴─────┴────────────────────────────┘
//!   ▲     ▲                          ▲
//!   │     └── returned to caller     └── tail block, pushed on free list
//!   └── front block, recorded size N
//! ```
//!
//! ## Errors
//!
//! `allocate(0)` returns `None`. Everything else that can go wrong (a
//! failed mapping, a block whose tag was overwritten, a broken free list) is
//! fatal: `allocate` and `release` abort the process. The `try_` variants
//! return an [`AllocError`] instead and leave the decision to the caller.
//!
//! ## Limitations
//!
//! - **Single-threaded core**: `Allocator` takes `&mut self`;
//!   [`GlobalFreeList`] adds a mutex on top.
//! - **No coalescing**: fragmentation grows over the allocator's lifetime.
//! - **Header alignment only**: payloads are aligned like a `usize`.
//! - **Unix-only**: requires `libc` and `mmap`.

pub mod align;
mod allocator;
mod block;
pub mod config;
pub mod diagnostics;
mod error;
mod free_list;
mod global;
pub mod logging;
mod os;

pub use allocator::{Allocator, Stats};
pub use block::{BLOCK_TAG, HEADER_SIZE, PAYLOAD_ALIGN};
pub use config::{CHUNK_SIZE, Config};
pub use error::{AllocError, AllocResult};
pub use global::GlobalFreeList;
