use std::env;

use tracing::warn;

use crate::{
  align::WORD,
  block::HEADER_SIZE,
  error::{AllocError, AllocResult},
};

/// Size of the standard region requested from the OS when the free list
/// cannot serve a request.
pub const CHUNK_SIZE: usize = 4096 * 1024;

/// Smallest accepted chunk: room for a header, a carved block and a tail.
pub const MIN_CHUNK_SIZE: usize = 4 * HEADER_SIZE;

/// Allocator settings.
///
/// Environment variables read by [`Config::from_env`]:
/// - FLALLOC_CHUNK_SIZE: standard chunk size in bytes
/// - FLALLOC_TRACK_LIVE: keep a side table of live blocks (`1`/`true` or `0`/`false`)
///
/// Malformed values keep the default and emit a `warn!` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  chunk_size: usize,
  events: bool,
  track_live: bool,
}

impl Config {
  pub const fn new() -> Self {
    Self {
      chunk_size: CHUNK_SIZE,
      events: true,
      track_live: false,
    }
  }

  pub fn from_env() -> Self {
    let mut config = Self::new();

    if let Ok(raw) = env::var("FLALLOC_CHUNK_SIZE") {
      match raw.trim().parse::<usize>() {
        Ok(size) => match config.with_chunk_size(size) {
          Ok(updated) => config = updated,
          Err(err) => warn!(value = %raw, "ignoring FLALLOC_CHUNK_SIZE: {}", err),
        },
        Err(_) => warn!(value = %raw, "ignoring FLALLOC_CHUNK_SIZE: not a byte count"),
      }
    }

    if let Ok(raw) = env::var("FLALLOC_TRACK_LIVE") {
      match raw.trim() {
        "1" => config.track_live = true,
        "0" => config.track_live = false,
        flag if flag.eq_ignore_ascii_case("true") => config.track_live = true,
        flag if flag.eq_ignore_ascii_case("false") => config.track_live = false,
        _ => warn!(value = %raw, "ignoring FLALLOC_TRACK_LIVE: expected 1, 0, true or false"),
      }
    }

    config
  }

  /// Replaces the standard chunk size.
  pub fn with_chunk_size(
    self,
    chunk_size: usize,
  ) -> AllocResult<Self> {
    if chunk_size < MIN_CHUNK_SIZE || chunk_size % WORD != 0 {
      return Err(AllocError::InvalidChunkSize {
        size: chunk_size,
        min: MIN_CHUNK_SIZE,
      });
    }

    Ok(Self { chunk_size, ..self })
  }

  /// Disables `tracing` events, for allocators that serve the allocations
  /// a subscriber itself makes.
  pub const fn quiet(self) -> Self {
    Self {
      events: false,
      ..self
    }
  }

  /// Keeps a side table of live payload addresses so that releasing a
  /// pointer the allocator never handed out is reported instead of trusted.
  pub const fn track_live_blocks(
    self,
    track_live: bool,
  ) -> Self {
    Self { track_live, ..self }
  }

  pub const fn chunk_size(&self) -> usize {
    self.chunk_size
  }

  pub const fn events(&self) -> bool {
    self.events
  }

  pub const fn tracks_live_blocks(&self) -> bool {
    self.track_live
  }
}

impl Default for Config {
  fn default() -> Self {
    Self::new()
  }
}
