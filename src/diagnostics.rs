//! Free-list dumps for debugging.
//!
//! Reports are plain text lines, independent of `tracing`, appended to a
//! log file that is opened on first use and stays open for the rest of the
//! process:
//!
//! ```text
//! flalloc: [POST ALLOC]
//! flalloc: [freeblk no. 0] [size 4186112]
//! flalloc: [freeblk no. 1] [size 1024]
//! ```

use std::{
  fmt,
  fs::{File, OpenOptions},
  io::{self, Write},
  path::{Path, PathBuf},
  sync::{Mutex, MutexGuard, OnceLock, PoisonError},
};

/// File the process-wide log is created as, in the working directory.
pub const LOG_FILE_NAME: &str = "flalloc.log";

const PREFIX: &str = "flalloc";

/// Append-mode log file, opened lazily the first time it is written to and
/// never closed explicitly.
#[derive(Debug)]
pub struct DebugLog {
  path: PathBuf,
  file: Option<File>,
}

impl DebugLog {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      file: None,
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn is_open(&self) -> bool {
    self.file.is_some()
  }

  fn stream(&mut self) -> io::Result<&mut File> {
    let file = match self.file.take() {
      Some(file) => file,
      None => OpenOptions::new().create(true).append(true).open(&self.path)?,
    };

    Ok(self.file.insert(file))
  }

  /// Appends one prefixed line.
  pub fn write_line(
    &mut self,
    args: fmt::Arguments<'_>,
  ) -> io::Result<()> {
    let stream = self.stream()?;
    writeln!(stream, "{}: {}", PREFIX, args)
  }

  /// Appends a labelled dump of `sizes`, head first.
  pub fn write_report<I>(
    &mut self,
    label: &str,
    sizes: I,
  ) -> io::Result<()>
  where
    I: IntoIterator<Item = usize>,
  {
    write_report(self.stream()?, label, sizes)
  }
}

/// The log behind [`Allocator::report`](crate::Allocator::report), at
/// [`LOG_FILE_NAME`] in the working directory.
pub fn process_log() -> MutexGuard<'static, DebugLog> {
  static LOG: OnceLock<Mutex<DebugLog>> = OnceLock::new();

  LOG
    .get_or_init(|| Mutex::new(DebugLog::new(LOG_FILE_NAME)))
    .lock()
    .unwrap_or_else(PoisonError::into_inner)
}

/// Writes the label line followed by one line per free block.
pub fn write_report<W, I>(
  out: &mut W,
  label: &str,
  sizes: I,
) -> io::Result<()>
where
  W: Write + ?Sized,
  I: IntoIterator<Item = usize>,
{
  writeln!(out, "{}: [{}]", PREFIX, label)?;

  for (n, size) in sizes.into_iter().enumerate() {
    writeln!(out, "{}: [freeblk no. {}] [size {}]", PREFIX, n, size)?;
  }

  out.flush()
}
