/// FlashDevice trait: the traced flash chip as the monitor sees it.
///
/// The monitor only needs the device's shape: total size, page (write)
/// size, block (erase) size, and its partition table. A real driver shim and
/// the RAM-backed `MockFlash` both implement this trait.
use core::ops::Range;

use crate::error::InitError;

/// Shape of a flash device and its partitions.
pub trait FlashDevice {
    /// Total size in bytes.
    fn total_size(&self) -> u64;

    /// Page (program unit) size in bytes.
    fn write_size(&self) -> u32;

    /// Block (erase unit) size in bytes.
    fn erase_size(&self) -> u32;

    /// Partition `index`, if the device has one.
    fn partition(&self, index: usize) -> Option<Partition>;
}

/// Byte range of one partition on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub offset: u64,
    pub size: u64,
}

/// Page/block geometry derived from a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashGeometry {
    page_size: u32,
    pages_per_block: u32,
    block_count: u32,
}

impl FlashGeometry {
    pub fn new(page_size: u32, pages_per_block: u32, block_count: u32) -> Result<Self, InitError> {
        if page_size == 0 {
            return Err(InitError::Geometry { reason: "page size is zero" });
        }
        if pages_per_block == 0 {
            return Err(InitError::Geometry { reason: "no pages per block" });
        }
        if block_count == 0 {
            return Err(InitError::Geometry { reason: "device has no blocks" });
        }
        page_size
            .checked_mul(pages_per_block)
            .ok_or(InitError::Geometry { reason: "block size overflows" })?;
        Ok(Self {
            page_size,
            pages_per_block,
            block_count,
        })
    }

    /// Read the geometry of `dev`.
    pub fn from_device(dev: &dyn FlashDevice) -> Result<Self, InitError> {
        let page_size = dev.write_size();
        let erase_size = dev.erase_size();
        if page_size == 0 || erase_size == 0 {
            return Err(InitError::Geometry { reason: "page or erase size is zero" });
        }
        if erase_size % page_size != 0 {
            return Err(InitError::Geometry {
                reason: "erase size is not a multiple of the page size",
            });
        }
        let block_count = u32::try_from(dev.total_size() / u64::from(erase_size))
            .map_err(|_| InitError::Geometry { reason: "too many blocks" })?;

        let geometry = Self::new(page_size, erase_size / page_size, block_count)?;
        tracing::info!(
            page_size,
            pages_per_block = geometry.pages_per_block,
            blocks = block_count,
            total_bytes = dev.total_size(),
            "flash geometry"
        );
        Ok(geometry)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn pages_per_block(&self) -> u32 {
        self.pages_per_block
    }

    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Block size in bytes.
    pub fn block_size(&self) -> u64 {
        u64::from(self.page_size) * u64::from(self.pages_per_block)
    }

    pub fn page_count(&self) -> u64 {
        u64::from(self.block_count) * u64::from(self.pages_per_block)
    }

    pub fn block_of_page(&self, page: u64) -> u64 {
        page / u64::from(self.pages_per_block)
    }

    /// Byte offset of `page` on the device.
    pub fn page_offset(&self, page: u64) -> u64 {
        page.saturating_mul(u64::from(self.page_size))
    }

    /// Byte offset of `block` on the device.
    pub fn block_offset(&self, block: u64) -> u64 {
        block.saturating_mul(self.block_size())
    }
}

/// The single partition being traced, resolved to blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracedPartition {
    pub index: usize,
    pub offset: u64,
    pub size: u64,
    first_block: u32,
    last_block: u32,
}

impl TracedPartition {
    /// Look up partition `index` on `dev`. None if the device has no such
    /// partition.
    pub fn resolve(dev: &dyn FlashDevice, geometry: &FlashGeometry, index: usize) -> Option<Self> {
        let part = dev.partition(index)?;
        let block_size = geometry.block_size();
        let clamp = |block: u64| block.min(u64::from(geometry.block_count())) as u32;
        Some(Self {
            index,
            offset: part.offset,
            size: part.size,
            first_block: clamp(part.offset / block_size),
            // A partially covered last block still belongs to the range.
            last_block: clamp(part.offset.saturating_add(part.size).div_ceil(block_size)),
        })
    }

    /// Whether a device byte offset falls inside the partition.
    pub fn contains_offset(&self, offset: u64) -> bool {
        offset >= self.offset && offset < self.offset.saturating_add(self.size)
    }

    /// Blocks covered by the partition, `[first, last)`.
    pub fn blocks(&self) -> Range<u32> {
        self.first_block..self.last_block
    }
}
