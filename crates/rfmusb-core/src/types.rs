//! Value types shared between the protocol engine and the device layer.

use std::fmt;

/// Capacity and occupancy of the module's buffered I/O staging buffer.
///
/// Reported by the device on every query; never cached by the protocol
/// engine because the radio drains and fills the buffer on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferedIoInfo {
    /// Total size of the staging buffer in bytes.
    pub capacity: usize,
    /// Bytes currently held in the buffer.
    pub count: usize,
}

impl BufferedIoInfo {
    /// Free space in bytes, i.e. the largest write accepted without waiting
    /// for the device to drain.
    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.count)
    }

    /// Whether the buffer currently holds no data.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl fmt::Display for BufferedIoInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} bytes", self.count, self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_is_free_space() {
        let info = BufferedIoInfo {
            capacity: 100,
            count: 90,
        };
        assert_eq!(info.available(), 10);
        assert!(!info.is_empty());
    }

    #[test]
    fn available_never_underflows() {
        let info = BufferedIoInfo {
            capacity: 10,
            count: 12,
        };
        assert_eq!(info.available(), 0);
    }

    #[test]
    fn display_format() {
        let info = BufferedIoInfo {
            capacity: 256,
            count: 0,
        };
        assert_eq!(info.to_string(), "0/256 bytes");
        assert!(info.is_empty());
    }
}
