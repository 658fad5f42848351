//! Virtual FAT12/FAT16 filesystem
//!
//! An in-RAM FAT image that is assembled on the fly: the boot sector, the
//! file allocation tables and the root directory are generated per 512 byte
//! sector when the host reads them, and file contents are produced by
//! per-file callbacks. Host writes into the root directory region are
//! diffed against the stored directory and reported as create/delete/change
//! events.
//!
//! The image switches between FAT12 and FAT16 automatically based on the
//! cluster count; FAT32 images are rejected.
//!
//! This is primarily a fixture behind the [mass storage] class: expose the
//! image through a [`Memory`] backend and the host sees a disk whose files
//! are plain callbacks.
//!
//! ``` no_run
//! use cmx_hal::fat::{Config, Handler, VirtualFat};
//!
//! struct Events;
//!
//! impl Handler for Events {
//!     // default no-op hooks
//! }
//!
//! let mut fs: VirtualFat<Events, 16, 4096> = VirtualFat::new(
//!     "CMX DISK",
//!     Config {
//!         total_size: 1024 * 1024,
//!         sectors_per_cluster: 64,
//!         num_fats: 1,
//!         fat_size_limit: u16::MAX,
//!     },
//! );
//!
//! fn read_readme(offset: u32, data: &mut [u8]) {
//!     data[..6].copy_from_slice(b"hello\n");
//! }
//!
//! fs.create_file("README  TXT", 6, Some(read_readme), None);
//! ```
//!
//! [mass storage]: ../usb/msc/index.html
//! [`Memory`]: ../usb/msc/trait.Memory.html

use core::marker::PhantomData;

/// The sector size of the virtual disk
pub const SECTOR_SIZE: usize = 512;

/// FAT file attribute bits
pub mod attributes {
    pub const READ_ONLY: u8 = 0x01;
    pub const HIDDEN: u8 = 0x02;
    pub const SYSTEM: u8 = 0x04;
    pub const VOLUME_ID: u8 = 0x08;
    pub const DIRECTORY: u8 = 0x10;
    pub const ARCHIVE: u8 = 0x20;
    pub const LONG_NAME: u8 = READ_ONLY | HIDDEN | SYSTEM | VOLUME_ID;
}

/// Receives directory events when the host modifies the root directory
///
/// All hooks default to doing nothing.
pub trait Handler {
    /// A new file appeared in the root directory
    fn on_create(_entry: &DirectoryEntry) {}

    /// A file was deleted (name byte 0 became `0xE5`)
    fn on_delete(_entry: &DirectoryEntry) {}

    /// An existing entry changed in some other way
    fn on_change(_old: &DirectoryEntry, _new: &DirectoryEntry) {}
}

/// Callback producing the contents of a virtual file
///
/// `offset` is the sector offset within the file's region; `data` holds a
/// whole number of sectors to fill.
pub type ReadCallback = fn(offset: u32, data: &mut [u8]);

/// Callback receiving host writes into a virtual file
pub type WriteCallback = fn(offset: u32, data: &[u8]);

/// A directory entry in 8.3 format, 32 bytes on disk
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DirectoryEntry {
    /// Short filename, 8.3 format, space padded
    pub name: [u8; 11],

    /// Attribute bits, see [`attributes`]
    pub attributes: u8,

    /// Reserved, must be zero
    pub reserved: u8,

    /// Creation time, tenths of a second component
    pub creation_time_ms: u8,

    /// Creation time, 2 second granularity
    pub creation_time: u16,

    /// Creation date
    pub creation_date: u16,

    /// Last access date
    pub accessed_date: u16,

    /// High word of the first cluster (FAT32 only, zero here)
    pub first_cluster_high: u16,

    /// Last modification time
    pub modification_time: u16,

    /// Last modification date
    pub modification_date: u16,

    /// Low word of the first cluster
    pub first_cluster_low: u16,

    /// File size in bytes
    pub filesize: u32,
}

impl DirectoryEntry {
    pub const fn zeroed() -> Self {
        DirectoryEntry {
            name: [0; 11],
            attributes: 0,
            reserved: 0,
            creation_time_ms: 0,
            creation_time: 0,
            creation_date: 0,
            accessed_date: 0,
            first_cluster_high: 0,
            modification_time: 0,
            modification_date: 0,
            first_cluster_low: 0,
            filesize: 0,
        }
    }

    /// Decode an entry from its 32 disk bytes
    pub fn from_le_bytes(raw: &[u8]) -> Self {
        let mut name = [0; 11];
        name.copy_from_slice(&raw[0..11]);

        DirectoryEntry {
            name,
            attributes: raw[11],
            reserved: raw[12],
            creation_time_ms: raw[13],
            creation_time: u16::from_le_bytes([raw[14], raw[15]]),
            creation_date: u16::from_le_bytes([raw[16], raw[17]]),
            accessed_date: u16::from_le_bytes([raw[18], raw[19]]),
            first_cluster_high: u16::from_le_bytes([raw[20], raw[21]]),
            modification_time: u16::from_le_bytes([raw[22], raw[23]]),
            modification_date: u16::from_le_bytes([raw[24], raw[25]]),
            first_cluster_low: u16::from_le_bytes([raw[26], raw[27]]),
            filesize: u32::from_le_bytes([raw[28], raw[29], raw[30], raw[31]]),
        }
    }

    /// Encode the entry into its 32 disk bytes
    pub fn to_le_bytes(&self) -> [u8; 32] {
        let mut raw = [0; 32];

        raw[0..11].copy_from_slice(&self.name);
        raw[11] = self.attributes;
        raw[12] = self.reserved;
        raw[13] = self.creation_time_ms;
        raw[14..16].copy_from_slice(&self.creation_time.to_le_bytes());
        raw[16..18].copy_from_slice(&self.creation_date.to_le_bytes());
        raw[18..20].copy_from_slice(&self.accessed_date.to_le_bytes());
        raw[20..22].copy_from_slice(&self.first_cluster_high.to_le_bytes());
        raw[22..24].copy_from_slice(&self.modification_time.to_le_bytes());
        raw[24..26].copy_from_slice(&self.modification_date.to_le_bytes());
        raw[26..28].copy_from_slice(&self.first_cluster_low.to_le_bytes());
        raw[28..32].copy_from_slice(&self.filesize.to_le_bytes());

        raw
    }
}

/// How the FAT entries are packed, selected by cluster count
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClusterVariant {
    /// 12 bit entries straddling nibbles, for up to 4084 clusters
    Fat12,

    /// Aligned 16 bit entries, for up to 65524 clusters
    Fat16,

    /// 32 bit entries using the lower 28 bits
    ///
    /// Provided for the entry encoder; whole FAT32 images are rejected.
    Fat32,
}

impl ClusterVariant {
    /// Pick the variant for a cluster count
    pub fn for_cluster_count(clusters: u32) -> Self {
        if clusters <= 4084 {
            ClusterVariant::Fat12
        } else if clusters <= 65524 {
            ClusterVariant::Fat16
        } else {
            ClusterVariant::Fat32
        }
    }

    /// Bits per FAT entry
    pub fn bits(&self) -> u32 {
        match self {
            ClusterVariant::Fat12 => 12,
            ClusterVariant::Fat16 => 16,
            ClusterVariant::Fat32 => 32,
        }
    }

    /// The end-of-chain marker
    pub fn final_cluster(&self) -> u32 {
        match self {
            ClusterVariant::Fat12 => 0xfff,
            ClusterVariant::Fat16 => 0xffff,
            ClusterVariant::Fat32 => 0xffff_ffff,
        }
    }

    /// Store a FAT entry
    pub fn set_cluster(&self, fat: &mut [u8], index: u32, value: u32) {
        match self {
            ClusterVariant::Fat12 => {
                let offset = (index + index / 2) as usize;
                let value = value as u16;

                if index & 0x1 != 0 {
                    fat[offset] = (((value & 0xf) << 4) as u8) | (fat[offset] & 0xf);
                    fat[offset + 1] = ((value >> 4) & 0xff) as u8;
                } else {
                    fat[offset] = (value & 0xff) as u8;
                    fat[offset + 1] = (((value >> 8) & 0xf) as u8) | (fat[offset + 1] & 0xf0);
                }
            }
            ClusterVariant::Fat16 => {
                let offset = (index * 2) as usize;

                fat[offset] = (value & 0xff) as u8;
                fat[offset + 1] = ((value >> 8) & 0xff) as u8;
            }
            ClusterVariant::Fat32 => {
                let offset = (index * 4) as usize;

                fat[offset] = (value & 0xff) as u8;
                fat[offset + 1] = ((value >> 8) & 0xff) as u8;
                fat[offset + 2] = ((value >> 16) & 0xff) as u8;
                // the top nibble of a FAT32 entry is reserved
                fat[offset + 3] = (fat[offset + 3] & 0xf0) | (((value >> 24) & 0x0f) as u8);
            }
        }
    }
}

/// Geometry of the virtual disk
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Total disk size in bytes
    pub total_size: u32,

    /// Sectors per allocation unit; must be a power of two
    pub sectors_per_cluster: u8,

    /// Number of file allocation tables (2 is what the specification
    /// recommends, 1 saves RAM)
    pub num_fats: u8,

    /// Cap on the FAT sectors kept in RAM
    ///
    /// Sectors beyond the cap read as all-free, which lets a small RAM
    /// buffer simulate a much larger disk.
    pub fat_size_limit: u16,
}

struct FileSlot {
    read: Option<ReadCallback>,
    write: Option<WriteCallback>,
    sector_count: u32,
}

impl FileSlot {
    const EMPTY: FileSlot = FileSlot {
        read: None,
        write: None,
        sector_count: 0,
    };
}

/// The virtual FAT image
///
/// `MAX_FILES` bounds the root directory (must be a multiple of 16, so the
/// directory fills whole sectors); `FAT_BYTES` is the RAM set aside for the
/// file allocation tables.
pub struct VirtualFat<H, const MAX_FILES: usize, const FAT_BYTES: usize> {
    _handler: PhantomData<H>,

    sectors_per_cluster: u8,
    num_fats: u8,
    sector_count: u32,

    /// Sectors per FAT, as reported in the boot sector
    fat_size: u16,

    /// Sectors per FAT actually backed by `fat`
    fat_limit: u16,

    cluster_count: u32,
    variant: ClusterVariant,

    /// Next free cluster for file allocation
    cluster_index: u32,

    fat: [u8; FAT_BYTES],

    directory: [DirectoryEntry; MAX_FILES],

    /// Directory entries in use (including the volume label)
    directory_len: usize,

    files: [FileSlot; MAX_FILES],
    file_count: usize,
}

impl<H: Handler, const MAX_FILES: usize, const FAT_BYTES: usize>
    VirtualFat<H, MAX_FILES, FAT_BYTES>
{
    /// Create a formatted image with the given volume label
    ///
    /// The label should follow the 8.3 character rules; longer names are
    /// truncated to 11 bytes.
    pub fn new(drive_name: &str, config: Config) -> Self {
        assert!(MAX_FILES % 16 == 0, "MAX_FILES needs to be a multiple of 16");
        assert!(config.sectors_per_cluster.is_power_of_two());
        assert!(config.num_fats >= 1);

        let sector_count = config.total_size / SECTOR_SIZE as u32;
        let root_directory_sectors = Self::root_directory_sectors() as u32;

        // reserved region is the boot sector only
        let reserved = 1u32;

        // sectors per FAT; slightly conservative, see the FAT specification
        // for the exact calculation
        let per_fat = 256 * config.sectors_per_cluster as u32 + config.num_fats as u32;
        let fat_size =
            (sector_count - (reserved + root_directory_sectors) + (per_fat - 1)) / per_fat;

        let data_sector_count =
            sector_count - (reserved * fat_size) + root_directory_sectors;
        let cluster_count = data_sector_count / config.sectors_per_cluster as u32;

        let variant = ClusterVariant::for_cluster_count(cluster_count);
        assert!(
            variant != ClusterVariant::Fat32,
            "too many clusters for FAT12/FAT16, FAT32 images are not supported"
        );

        let fat_limit = fat_size.min(config.fat_size_limit as u32) as u16;
        assert!(
            (fat_limit as usize * SECTOR_SIZE) * config.num_fats as usize <= FAT_BYTES,
            "FAT_BYTES is too small for the FAT region, raise it or lower fat_size_limit"
        );

        let mut fs = VirtualFat {
            _handler: PhantomData,
            sectors_per_cluster: config.sectors_per_cluster,
            num_fats: config.num_fats,
            sector_count,
            fat_size: fat_size as u16,
            fat_limit,
            cluster_count,
            variant,
            cluster_index: 0,
            fat: [0; FAT_BYTES],
            directory: [DirectoryEntry::zeroed(); MAX_FILES],
            directory_len: 0,
            files: [FileSlot::EMPTY; MAX_FILES],
            file_count: 0,
        };

        // the first reserved entry holds the media type, filled up with 1s;
        // the second is an end-of-chain marker
        fs.variant
            .set_cluster(&mut fs.fat, 0, 0xf8 | (0xfffff << 8));
        let final_cluster = fs.variant.final_cluster();
        fs.variant.set_cluster(&mut fs.fat, 1, final_cluster);
        fs.cluster_index = 2;

        // the volume label occupies the first directory entry
        let mut label = DirectoryEntry::zeroed();
        label.name = *b"           ";
        label.attributes = attributes::VOLUME_ID | attributes::ARCHIVE;
        for (i, byte) in drive_name.bytes().take(11).enumerate() {
            label.name[i] = byte;
        }

        fs.directory[0] = label;
        fs.directory_len = 1;

        fs
    }

    const fn root_directory_sectors() -> usize {
        (MAX_FILES * 32 + (SECTOR_SIZE - 1)) / SECTOR_SIZE
    }

    /// Total size of the image in bytes
    pub fn size(&self) -> u32 {
        self.sector_count * SECTOR_SIZE as u32
    }

    /// Register a virtual file
    ///
    /// `name` must be in 8.3 directory format (11 bytes, space padded, like
    /// `README  TXT`). Clusters are chained in the FAT; reads and writes of
    /// the file's sectors are dispatched to the callbacks. A file without a
    /// write callback is marked read-only.
    ///
    /// Does nothing when the directory or the FAT is full.
    pub fn create_file(
        &mut self,
        name: &str,
        size: u32,
        read: Option<ReadCallback>,
        write: Option<WriteCallback>,
    ) {
        if self.directory_len >= MAX_FILES || self.file_count >= MAX_FILES {
            return;
        }

        let cluster_bytes = self.sectors_per_cluster as u32 * SECTOR_SIZE as u32;
        let clusters = (size + cluster_bytes - 1) / cluster_bytes;

        let mut first_cluster = 0;

        if clusters > 0 {
            let available = (FAT_BYTES as u32 * 8) / self.variant.bits();
            if self.cluster_index + clusters > available {
                return;
            }

            first_cluster = self.cluster_index;

            // chain the clusters, the last one ends the chain
            for i in 0..clusters.saturating_sub(1) {
                let index = self.cluster_index + i;
                self.variant.set_cluster(&mut self.fat, index, index + 1);
            }
            self.variant.set_cluster(
                &mut self.fat,
                self.cluster_index + clusters - 1,
                self.variant.final_cluster(),
            );

            self.cluster_index += clusters;
        }

        let mut entry = DirectoryEntry::zeroed();
        entry.name = *b"           ";
        for (i, byte) in name.bytes().take(11).enumerate() {
            entry.name[i] = byte;
        }
        entry.attributes = if write.is_none() {
            attributes::READ_ONLY
        } else {
            0
        };
        entry.first_cluster_high = ((first_cluster >> 16) & 0xffff) as u16;
        entry.first_cluster_low = (first_cluster & 0xffff) as u16;
        entry.filesize = size;

        self.directory[self.directory_len] = entry;
        self.directory_len += 1;

        self.files[self.file_count] = FileSlot {
            read,
            write,
            sector_count: clusters * self.sectors_per_cluster as u32,
        };
        self.file_count += 1;
    }

    /// Read whole sectors from the image
    ///
    /// `data` must hold a whole number of sectors.
    pub fn read(&mut self, sector: u32, data: &mut [u8]) {
        self.read_write(sector, RW::Read(data));
    }

    /// Write whole sectors into the image
    pub fn write(&mut self, sector: u32, data: &[u8]) {
        self.read_write(sector, RW::Write(data));
    }

    fn read_write(&mut self, mut sector: u32, mut access: RW) {
        let mut remaining = (access.len() / SECTOR_SIZE) as u32;
        let mut data_offset = 0usize;

        while remaining > 0 {
            let (region, region_start, region_len) = match self.region_for(sector) {
                Some(region) => region,
                None => return,
            };

            let offset = sector - region_start;
            let count = remaining.min(region_len - offset);
            let bytes = count as usize * SECTOR_SIZE;

            match &mut access {
                RW::Read(data) => {
                    let chunk = &mut data[data_offset..data_offset + bytes];
                    self.read_region(region, offset, chunk);
                }
                RW::Write(data) => {
                    let chunk = &data[data_offset..data_offset + bytes];
                    self.write_region(region, offset, chunk);
                }
            }

            sector += count;
            remaining -= count;
            data_offset += bytes;
        }
    }

    /// Locate the region a sector belongs to
    ///
    /// Returns the region, its first sector and its sector count.
    fn region_for(&self, sector: u32) -> Option<(Region, u32, u32)> {
        let mut start = 0u32;

        // boot sector
        if sector < 1 {
            return Some((Region::Boot, 0, 1));
        }
        start += 1;

        // the file allocation tables
        for fat in 0..self.num_fats {
            let len = self.fat_size as u32;
            if sector < start + len {
                return Some((Region::Fat(fat), start, len));
            }
            start += len;
        }

        // root directory
        let root_len = Self::root_directory_sectors() as u32;
        if sector < start + root_len {
            return Some((Region::Directory, start, root_len));
        }
        start += root_len;

        // file regions, in creation order
        for index in 0..self.file_count {
            let len = self.files[index].sector_count;
            if sector < start + len {
                return Some((Region::File(index), start, len));
            }
            start += len;
        }

        None
    }

    fn read_region(&mut self, region: Region, offset: u32, data: &mut [u8]) {
        match region {
            Region::Boot => self.read_boot_sector(data),
            Region::Fat(fat) => self.read_fat(fat, offset, data),
            Region::Directory => self.read_directory(offset, data),
            Region::File(index) => {
                if let Some(read) = self.files[index].read {
                    read(offset, data);
                }
            }
        }
    }

    fn write_region(&mut self, region: Region, offset: u32, data: &[u8]) {
        match region {
            Region::Directory => self.write_directory(offset, data),
            Region::File(index) => {
                if let Some(write) = self.files[index].write {
                    write(offset, data);
                }
            }
            // the boot sector and the FATs ignore writes
            _ => {}
        }
    }

    fn read_boot_sector(&self, data: &mut [u8]) {
        let sector = &mut data[..SECTOR_SIZE];
        sector.fill(0);

        // jump instruction and OEM name
        sector[0..3].copy_from_slice(&[0xeb, 0x3c, 0x90]);
        sector[3..11].copy_from_slice(b"MSDOS5.0");

        // DOS 2.0 BPB
        sector[11..13].copy_from_slice(&(SECTOR_SIZE as u16).to_le_bytes());
        sector[13] = self.sectors_per_cluster;
        // one reserved sector
        sector[14..16].copy_from_slice(&1u16.to_le_bytes());
        sector[16] = self.num_fats;
        sector[17..19].copy_from_slice(&(MAX_FILES as u16).to_le_bytes());

        // the 16 bit total only fits small disks
        let (total16, total32) = if self.sector_count > 0xffff {
            (0u16, self.sector_count)
        } else {
            (self.sector_count as u16, 0u32)
        };
        sector[19..21].copy_from_slice(&total16.to_le_bytes());

        // fixed media
        sector[21] = 0xf8;
        sector[22..24].copy_from_slice(&self.fat_size.to_le_bytes());

        // DOS 3.31 BPB
        sector[24..26].copy_from_slice(&1u16.to_le_bytes());
        sector[26..28].copy_from_slice(&1u16.to_le_bytes());
        sector[28..32].copy_from_slice(&0u32.to_le_bytes());
        sector[32..36].copy_from_slice(&total32.to_le_bytes());

        // boot signature, kept for compatibility (i.e. with android)
        sector[510] = 0x55;
        sector[511] = 0xaa;
    }

    fn read_fat(&self, fat: u8, offset: u32, data: &mut [u8]) {
        for (i, sector) in data.chunks_mut(SECTOR_SIZE).enumerate() {
            let fat_offset = offset as usize + i;

            if fat_offset >= self.fat_limit as usize {
                // beyond the RAM-backed part every entry reads as free
                sector.fill(0);
                continue;
            }

            // all FAT copies read from the same backing store
            let _ = fat;
            let start = fat_offset * SECTOR_SIZE;
            sector.copy_from_slice(&self.fat[start..start + SECTOR_SIZE]);
        }
    }

    fn read_directory(&self, offset: u32, data: &mut [u8]) {
        const PER_SECTOR: usize = SECTOR_SIZE / 32;

        for (i, sector) in data.chunks_mut(SECTOR_SIZE).enumerate() {
            sector.fill(0);

            let first_entry = (offset as usize + i) * PER_SECTOR;

            for slot in 0..PER_SECTOR {
                let index = first_entry + slot;
                if index >= self.directory_len {
                    break;
                }

                sector[slot * 32..slot * 32 + 32]
                    .copy_from_slice(&self.directory[index].to_le_bytes());
            }
        }
    }

    fn write_directory(&mut self, offset: u32, data: &[u8]) {
        const PER_SECTOR: usize = SECTOR_SIZE / 32;

        for (i, sector) in data.chunks(SECTOR_SIZE).enumerate() {
            let first_entry = (offset as usize + i) * PER_SECTOR;

            for slot in 0..PER_SECTOR {
                let index = first_entry + slot;
                if index >= MAX_FILES {
                    return;
                }

                // the volume label is not a file
                if index == 0 {
                    continue;
                }

                let new = DirectoryEntry::from_le_bytes(&sector[slot * 32..slot * 32 + 32]);
                let old = self.directory[index];

                if new == old {
                    continue;
                }

                if new.name[0] == 0xe5 {
                    H::on_delete(&old);
                } else if new.name != old.name && is_valid_filename(&new.name) {
                    H::on_create(&new);
                } else {
                    H::on_change(&old, &new);
                }

                self.directory[index] = new;
                if index >= self.directory_len {
                    self.directory_len = index + 1;
                }
            }
        }
    }
}

enum RW<'a> {
    Read(&'a mut [u8]),
    Write(&'a [u8]),
}

impl RW<'_> {
    fn len(&self) -> usize {
        match self {
            RW::Read(data) => data.len(),
            RW::Write(data) => data.len(),
        }
    }
}

#[derive(Clone, Copy)]
enum Region {
    Boot,
    Fat(u8),
    Directory,
    File(usize),
}

/// Whether an 11 byte name follows the 8.3 rules
fn is_valid_filename(name: &[u8; 11]) -> bool {
    // deleted markers and a leading space are not names
    if matches!(name[0], 0xe5 | 0x00 | 0x20) {
        return false;
    }

    name.iter().all(|&c| character_valid(c))
}

/// Whether a character is allowed in an 8.3 filename
fn character_valid(character: u8) -> bool {
    // lower case is not allowed in short names
    if character.is_ascii_lowercase() {
        return false;
    }

    // control characters, except 0x05 (initial KANJI escape)
    if character < 0x20 && character != 0x05 {
        return false;
    }

    const INVALID: [u8; 16] = [
        0x22, 0x2a, 0x2b, 0x2c, 0x2e, 0x2f, 0x3a, 0x3b, 0x3c, 0x3d, 0x3e, 0x3f, 0x5b, 0x5c,
        0x5d, 0x7c,
    ];

    !INVALID.contains(&character)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::vec;

    struct NullHandler;
    impl Handler for NullHandler {}

    fn test_fs<H: Handler>() -> VirtualFat<H, 16, 8192> {
        VirtualFat::new(
            "CMX DISK",
            Config {
                total_size: 1024 * 1024,
                sectors_per_cluster: 64,
                num_fats: 1,
                fat_size_limit: u16::MAX,
            },
        )
    }

    #[test]
    fn boot_sector_layout() {
        let mut fs = test_fs::<NullHandler>();

        let mut sector = [0u8; SECTOR_SIZE];
        fs.read(0, &mut sector);

        // signature at the end of the sector
        assert_eq!(sector[510], 0x55);
        assert_eq!(sector[511], 0xaa);

        // BPB basics
        assert_eq!(u16::from_le_bytes([sector[11], sector[12]]), 512);
        assert_eq!(sector[13], 64);
        assert_eq!(sector[21], 0xf8);

        // 2048 sectors fit the 16 bit field
        assert_eq!(u16::from_le_bytes([sector[19], sector[20]]), 2048);
        assert_eq!(
            u32::from_le_bytes([sector[32], sector[33], sector[34], sector[35]]),
            0
        );
    }

    #[test]
    fn volume_label_is_the_first_directory_entry() {
        let mut fs = test_fs::<NullHandler>();

        // sector 1 is the FAT (one copy), directory follows it
        let dir_start = 1 + fs.fat_size as u32;
        let mut sector = [0u8; SECTOR_SIZE];
        fs.read(dir_start, &mut sector);

        let label = DirectoryEntry::from_le_bytes(&sector[0..32]);
        assert_eq!(&label.name[..8], b"CMX DISK");
        assert_eq!(
            label.attributes,
            attributes::VOLUME_ID | attributes::ARCHIVE
        );
    }

    #[test]
    fn created_file_appears_with_cluster_chain() {
        let mut fs = test_fs::<NullHandler>();

        fn read_data(_offset: u32, data: &mut [u8]) {
            data.fill(0x5a);
        }

        // two clusters worth of data
        fs.create_file("DATA    BIN", 64 * 1024, Some(read_data), None);

        let dir_start = 1 + fs.fat_size as u32;
        let mut sector = [0u8; SECTOR_SIZE];
        fs.read(dir_start, &mut sector);

        let entry = DirectoryEntry::from_le_bytes(&sector[32..64]);
        assert_eq!(&entry.name, b"DATA    BIN");
        assert_eq!(entry.attributes, attributes::READ_ONLY);
        assert_eq!(entry.first_cluster_low, 2);
        assert_eq!(entry.filesize, 64 * 1024);

        // file data is dispatched to the callback
        let file_start = dir_start + 1;
        fs.read(file_start, &mut sector);
        assert!(sector.iter().all(|b| *b == 0x5a));
    }

    #[test]
    fn fat12_entry_packing() {
        let variant = ClusterVariant::Fat12;
        let mut fat = [0u8; 6];

        // even and odd entries straddle a shared byte
        variant.set_cluster(&mut fat, 0, 0x123);
        variant.set_cluster(&mut fat, 1, 0xabc);

        assert_eq!(fat[0], 0x23);
        assert_eq!(fat[1], 0xc1);
        assert_eq!(fat[2], 0xab);
    }

    #[test]
    fn fat16_entry_packing() {
        let variant = ClusterVariant::Fat16;
        let mut fat = [0u8; 8];

        variant.set_cluster(&mut fat, 1, 0xbeef);

        assert_eq!(&fat[2..4], &[0xef, 0xbe]);
    }

    #[test]
    fn fat32_entry_keeps_reserved_nibble() {
        let variant = ClusterVariant::Fat32;
        let mut fat = [0u8; 8];
        fat[3] = 0xf0;

        variant.set_cluster(&mut fat, 0, 0xffff_ffff);

        assert_eq!(&fat[0..4], &[0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn deleting_a_file_fires_exactly_one_on_delete() {
        static DELETES: AtomicUsize = AtomicUsize::new(0);
        static CREATES: AtomicUsize = AtomicUsize::new(0);

        struct CountingHandler;
        impl Handler for CountingHandler {
            fn on_create(_: &DirectoryEntry) {
                CREATES.fetch_add(1, Ordering::SeqCst);
            }
            fn on_delete(_: &DirectoryEntry) {
                DELETES.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut fs = test_fs::<CountingHandler>();
        fs.create_file("GONE    TXT", 16, None, None);

        let dir_start = 1 + fs.fat_size as u32;
        let mut sector = [0u8; SECTOR_SIZE];
        fs.read(dir_start, &mut sector);

        // the host marks the entry deleted
        sector[32] = 0xe5;
        fs.write(dir_start, &sector);

        assert_eq!(DELETES.load(Ordering::SeqCst), 1);
        assert_eq!(CREATES.load(Ordering::SeqCst), 0);

        // writing the same image again changes nothing
        fs.write(dir_start, &sector);
        assert_eq!(DELETES.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn new_entry_in_an_empty_slot_fires_exactly_one_on_create() {
        static CREATES: AtomicUsize = AtomicUsize::new(0);

        struct CreateHandler;
        impl Handler for CreateHandler {
            fn on_create(entry: &DirectoryEntry) {
                assert_eq!(&entry.name, b"NEWFILE TXT");
                CREATES.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut fs = test_fs::<CreateHandler>();

        let dir_start = 1 + fs.fat_size as u32;
        let mut sector = [0u8; SECTOR_SIZE];
        fs.read(dir_start, &mut sector);

        let mut entry = DirectoryEntry::zeroed();
        entry.name = *b"NEWFILE TXT";
        entry.filesize = 42;
        sector[32..64].copy_from_slice(&entry.to_le_bytes());

        fs.write(dir_start, &sector);

        assert_eq!(CREATES.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn size_change_fires_on_change() {
        static CHANGES: AtomicUsize = AtomicUsize::new(0);

        struct ChangeHandler;
        impl Handler for ChangeHandler {
            fn on_change(old: &DirectoryEntry, new: &DirectoryEntry) {
                assert_eq!(old.filesize, 16);
                assert_eq!(new.filesize, 99);
                CHANGES.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut fs = test_fs::<ChangeHandler>();
        fs.create_file("GROWS   TXT", 16, None, Some(|_, _| {}));

        let dir_start = 1 + fs.fat_size as u32;
        let mut sector = [0u8; SECTOR_SIZE];
        fs.read(dir_start, &mut sector);

        let mut entry = DirectoryEntry::from_le_bytes(&sector[32..64]);
        entry.filesize = 99;
        sector[32..64].copy_from_slice(&entry.to_le_bytes());

        fs.write(dir_start, &sector);

        assert_eq!(CHANGES.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn filename_validation() {
        assert!(is_valid_filename(b"README  TXT"));
        assert!(is_valid_filename(b"A          "));
        // deleted, free and leading-space names are invalid
        assert!(!is_valid_filename(&[0xe5; 11]));
        assert!(!is_valid_filename(&[0x00; 11]));
        assert!(!is_valid_filename(b" LEADING SP"));
        // lower case and path separators are not allowed
        assert!(!is_valid_filename(b"readme  txt"));
        assert!(!is_valid_filename(b"BAD/NAME TX"));
    }

    #[test]
    fn multi_sector_reads_cross_regions() {
        let mut fs = test_fs::<NullHandler>();

        // boot sector plus the first FAT sector in one read
        let mut data = vec![0u8; 2 * SECTOR_SIZE];
        fs.read(0, &mut data);

        assert_eq!(data[510], 0x55);
        assert_eq!(data[511], 0xaa);
        // FAT entry 0 holds the media type
        assert_eq!(data[SECTOR_SIZE], 0xf8);
    }
}
