/// Bounded task name attached to logged events.
///
/// Sized like the kernel's `comm` field: 16 bytes including the terminator,
/// so at most 15 bytes of name are kept. Longer names are truncated on a
/// UTF-8 boundary. The name is stored inline so capturing it on the
/// producer path never allocates.
use core::fmt;

/// Maximum stored name length in bytes.
pub const MAX_TASK_NAME_LEN: usize = 15;

static_assertions::const_assert!(MAX_TASK_NAME_LEN <= u8::MAX as usize);

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TaskName {
    bytes: [u8; MAX_TASK_NAME_LEN],
    len: u8,
}

impl TaskName {
    pub const fn empty() -> Self {
        Self {
            bytes: [0u8; MAX_TASK_NAME_LEN],
            len: 0,
        }
    }

    /// Copy `name`, truncating to `MAX_TASK_NAME_LEN` bytes.
    ///
    /// Field separators and control characters are replaced with `_` so a
    /// name can never split or terminate a log line.
    pub fn new(name: &str) -> Self {
        let mut end = name.len().min(MAX_TASK_NAME_LEN);
        while !name.is_char_boundary(end) {
            end -= 1;
        }

        let mut task = Self::empty();
        for (dst, &src) in task.bytes.iter_mut().zip(&name.as_bytes()[..end]) {
            *dst = if src == b';' || src.is_ascii_control() {
                b'_'
            } else {
                src
            };
        }
        task.len = end as u8;
        task
    }

    pub fn as_str(&self) -> &str {
        // Only ever filled from a `&str` cut on a char boundary, with ASCII
        // substitutions, so this is always valid UTF-8.
        core::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for TaskName {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&str> for TaskName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskName({:?})", self.as_str())
    }
}
