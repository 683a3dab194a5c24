use std::io::Read;

use flalloc::{Allocator, CHUNK_SIZE, HEADER_SIZE};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap` or
/// `gdb` between steps.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_free_list(
  allocator: &Allocator,
  label: &str,
) {
  let mut out = std::io::stdout().lock();
  if let Err(err) = allocator.report_to(&mut out, label) {
    eprintln!("cannot print free list: {}", err);
  }
}

fn main() {
  let mut allocator = Allocator::new();

  println!("PID = {}, header = {} bytes, chunk = {} bytes", std::process::id(), HEADER_SIZE, CHUNK_SIZE);
  block_until_enter_pressed();

  unsafe {
    // --------------------------------------------------------------------
    // 1) First request maps a chunk and splits it.
    // --------------------------------------------------------------------
    let first = allocator.allocate(256).expect("non-zero request");
    first.as_ptr().cast::<u32>().write(0xDEADBEEF);
    println!("\n[1] allocate(256) = {:?}", first);
    print_free_list(&allocator, "after first allocation");

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) A second request is cut from the chunk's free tail.
    // --------------------------------------------------------------------
    let second = allocator.allocate(12).expect("non-zero request");
    second.as_ptr().write_bytes(0xAB, 12);
    println!("\n[2] allocate(12) = {:?}", second);
    print_free_list(&allocator, "after second allocation");

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) Releasing pushes the block onto the head of the free list.
    // --------------------------------------------------------------------
    allocator.release(first.as_ptr());
    println!("\n[3] release({:?})", first);
    print_free_list(&allocator, "after release");

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) A request of exactly the block's size minus one header reuses it.
    // --------------------------------------------------------------------
    let third = allocator.allocate(256 - HEADER_SIZE).expect("non-zero request");
    println!(
      "\n[4] allocate({}) = {:?}, same block as [1]? {}",
      256 - HEADER_SIZE,
      third,
      third == first
    );
    println!("[4] reuse count = {}", allocator.reuse_count());

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 5) Anything larger than a chunk gets its own mapping.
    // --------------------------------------------------------------------
    let large = allocator.allocate(CHUNK_SIZE + 1).expect("non-zero request");
    println!("\n[5] allocate({}) = {:?}", CHUNK_SIZE + 1, large);
    println!("[5] {:?}", allocator.stats());

    block_until_enter_pressed();

    println!("\n[6] End of walkthrough. Mappings go back to the OS when the process exits.");
  }
}
