use std::{env, process};

use flalloc::{Allocator, Config, diagnostics, logging};
use rand::Rng;
use tracing::{error, info};

const BLOCKS_PER_ROUND: usize = 10;
const MAX_REQUEST: usize = 1024 * 1024;

/// Repeatedly allocates ten random sizes, fills them, and releases them,
/// dumping the free list to `flalloc.log` after each half of a round.
///
/// Usage: `cargo run --example stress -- [rounds]` (default 100).
fn main() {
  if let Err(err) = logging::init_tracing() {
    eprintln!("tracing already initialized: {}", err);
  }

  let rounds = match env::args().nth(1).map(|arg| arg.parse::<usize>()) {
    None => 100,
    Some(Ok(rounds)) => rounds,
    Some(Err(err)) => {
      error!("invalid round count: {}", err);
      process::exit(2);
    }
  };

  let config = Config::from_env();
  info!(rounds, chunk_size = config.chunk_size(), "starting stress run");

  let mut allocator = Allocator::with_config(config);
  let mut rng = rand::thread_rng();
  let mut blocks = [std::ptr::null_mut::<u8>(); BLOCKS_PER_ROUND];

  for _ in 0..rounds {
    for slot in blocks.iter_mut() {
      let size = rng.gen_range(0..MAX_REQUEST);

      // A zero-sized request comes back empty; releasing null is a no-op.
      *slot = match allocator.allocate(size) {
        Some(ptr) => {
          unsafe { ptr.as_ptr().write_bytes(b'A', size) };
          ptr.as_ptr()
        }
        None => std::ptr::null_mut(),
      };
    }

    report(&allocator, "POST ALLOC");

    for slot in blocks.iter_mut() {
      unsafe { allocator.release(*slot) };
      *slot = std::ptr::null_mut();
    }

    report(&allocator, "POST DEALLOC");

    let reused = allocator.reuse_count();
    if let Err(err) = diagnostics::process_log().write_line(format_args!("reused blocks [{}]", reused)) {
      error!("cannot write debug log: {}", err);
    }
  }

  let stats = allocator.stats();
  info!(
    reuse_count = stats.reuse_count,
    free_blocks = stats.free_blocks,
    os_regions = stats.os_regions,
    os_bytes = stats.os_bytes,
    "stress run finished"
  );
}

fn report(
  allocator: &Allocator,
  label: &str,
) {
  if let Err(err) = allocator.report(label) {
    error!("cannot write debug log: {}", err);
  }
}
