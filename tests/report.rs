/*!
 * Process debug log test
 * Kept alone in its binary because it changes the working directory
 */

use std::{env, fs};

use flalloc::{Allocator, Config, diagnostics::LOG_FILE_NAME};

#[test]
fn test_report_appends_to_working_directory_log() {
  let dir = tempfile::tempdir().unwrap();
  env::set_current_dir(dir.path()).unwrap();

  let mut allocator = Allocator::with_config(Config::new().quiet());
  let ptr = allocator.allocate(100).unwrap();
  allocator.report("POST ALLOC").unwrap();

  unsafe { allocator.release(ptr.as_ptr()) };
  allocator.report("POST DEALLOC").unwrap();

  let sizes = allocator.free_block_sizes();
  let log = fs::read_to_string(dir.path().join(LOG_FILE_NAME)).unwrap();

  assert_eq!(
    log,
    format!(
      "flalloc: [POST ALLOC]\n\
       flalloc: [freeblk no. 0] [size {tail}]\n\
       flalloc: [POST DEALLOC]\n\
       flalloc: [freeblk no. 0] [size {freed}]\n\
       flalloc: [freeblk no. 1] [size {tail}]\n",
      freed = sizes[0],
      tail = sizes[1],
    )
  );
}
