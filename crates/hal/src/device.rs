//! Device handles and the packed enumeration buffer.
//!
//! Enumeration results are returned as a [`DeviceList`]: a single owned byte
//! buffer holding fixed-size header records for every device followed by a
//! trailing region with the (bounded) device names. The list is built once,
//! freed as one unit, and handed out as borrowed [`DeviceInfo`] views so no
//! per-device allocations survive past the list itself.

use bytemuck::{Pod, Zeroable};

use crate::error::HalError;

/// Upper bound, in bytes, for a device name reported by a backend. Longer
/// names are truncated; this bound is the wire contract with native drivers,
/// not a display hint.
pub const MAX_DEVICE_NAME_LENGTH: usize = 100;

/// Opaque device identifier.
///
/// The wrapped integer is backend-defined: a CUDA device ordinal, a wgpu
/// adapter index, and so on. Callers obtain one from enumeration and pass it
/// back to [`Driver::create_device`](crate::Driver::create_device) unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u64);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A concrete accelerator/execution context created by a driver.
///
/// The terminal object of this subsystem: queue and allocator machinery hang
/// off a device but are out of scope here. Implementations hold a reference
/// to the driver that created them, so a device never outlives the symbol
/// table it depends on.
pub trait Device: Send + Sync {
    /// The identifier this device was created from.
    fn device_id(&self) -> DeviceId;

    /// Fixed label for the backend kind (e.g. `"cuda"`), not the enumerated
    /// per-device name.
    fn label(&self) -> &str;
}

/// Borrowed view of one enumerated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo<'a> {
    pub device_id: DeviceId,
    pub name: &'a str,
}

/// Fixed-size header record packed at the front of the list buffer. Name
/// bytes live in the trailing region at `name_offset..name_offset + name_len`.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct PackedEntry {
    device_id: u64,
    name_offset: u32,
    name_len: u32,
}

const ENTRY_SIZE: usize = std::mem::size_of::<PackedEntry>();

/// Enumeration result: device records in native enumeration order.
pub struct DeviceList {
    buf: Vec<u8>,
    count: usize,
}

impl DeviceList {
    /// Starts building a list with room reserved for `capacity` devices.
    ///
    /// The header region and the name region are reserved up front as one
    /// allocation; pushing up to `capacity` entries will not reallocate.
    pub fn builder(capacity: usize) -> Result<DeviceListBuilder, HalError> {
        let header_bytes = capacity
            .checked_mul(ENTRY_SIZE)
            .ok_or(HalError::AllocationFailed)?;
        let name_bytes = capacity
            .checked_mul(MAX_DEVICE_NAME_LENGTH)
            .ok_or(HalError::AllocationFailed)?;
        let total_bytes = header_bytes
            .checked_add(name_bytes)
            .ok_or(HalError::AllocationFailed)?;
        // Header records store 32-bit offsets into the name region.
        u32::try_from(total_bytes).map_err(|_| HalError::AllocationFailed)?;
        let mut buf = vec![0u8; header_bytes];
        buf.reserve_exact(name_bytes);
        Ok(DeviceListBuilder { buf, capacity, count: 0 })
    }

    /// Runs the shared fail-soft enumeration loop.
    ///
    /// `resolve` is called for each index in `0..count`. The first failure
    /// stops enumeration: the records packed so far are returned and a
    /// warning is logged, so one broken device does not hide the healthy
    /// ones that precede it.
    pub fn collect<F>(count: usize, mut resolve: F) -> Result<Self, HalError>
    where
        F: FnMut(usize) -> Result<(DeviceId, String), HalError>,
    {
        let mut builder = Self::builder(count)?;
        for index in 0..count {
            match resolve(index) {
                Ok((device_id, name)) => builder.push(device_id, &name),
                Err(err) => {
                    tracing::warn!(
                        index,
                        error = %err,
                        "device query failed; truncating enumeration"
                    );
                    break;
                }
            }
        }
        Ok(builder.finish())
    }

    /// Number of enumerated devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Record at `index`, in native enumeration order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<DeviceInfo<'_>> {
        if index >= self.count {
            return None;
        }
        let start = index * ENTRY_SIZE;
        let entry: PackedEntry =
            bytemuck::pod_read_unaligned(&self.buf[start..start + ENTRY_SIZE]);
        let name_start = entry.name_offset as usize;
        let name_end = name_start + entry.name_len as usize;
        let name = std::str::from_utf8(&self.buf[name_start..name_end]).ok()?;
        Some(DeviceInfo {
            device_id: DeviceId(entry.device_id),
            name,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = DeviceInfo<'_>> {
        (0..self.count).filter_map(|index| self.get(index))
    }
}

impl std::fmt::Debug for DeviceList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Incremental writer for a [`DeviceList`].
///
/// Entries are packed in push order; names are appended to the trailing
/// region with the buffer length acting as the packing cursor.
pub struct DeviceListBuilder {
    buf: Vec<u8>,
    capacity: usize,
    count: usize,
}

impl DeviceListBuilder {
    /// Appends one device record. Names longer than
    /// [`MAX_DEVICE_NAME_LENGTH`] bytes are truncated on a UTF-8 boundary.
    ///
    /// # Panics
    ///
    /// Panics if pushed past the capacity the builder was created with.
    pub fn push(&mut self, device_id: DeviceId, name: &str) {
        assert!(
            self.count < self.capacity,
            "device list capacity {} exceeded",
            self.capacity
        );
        let name = truncate_name(name);
        let name_offset = self.buf.len();
        self.buf.extend_from_slice(name.as_bytes());

        // Offsets fit in u32: the builder bounds the whole buffer at creation.
        let entry = PackedEntry {
            device_id: device_id.0,
            name_offset: name_offset as u32,
            name_len: name.len() as u32,
        };
        let start = self.count * ENTRY_SIZE;
        self.buf[start..start + ENTRY_SIZE].copy_from_slice(bytemuck::bytes_of(&entry));
        self.count += 1;
    }

    #[must_use]
    pub fn finish(self) -> DeviceList {
        DeviceList {
            buf: self.buf,
            count: self.count,
        }
    }
}

/// Truncates `name` to at most [`MAX_DEVICE_NAME_LENGTH`] bytes, backing off
/// to the nearest character boundary so the result stays valid UTF-8.
fn truncate_name(name: &str) -> &str {
    if name.len() <= MAX_DEVICE_NAME_LENGTH {
        return name;
    }
    let mut end = MAX_DEVICE_NAME_LENGTH;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
