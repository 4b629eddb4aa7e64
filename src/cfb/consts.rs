/// Magic bytes at the start of every compound file
pub const CFB_MAGIC: &[u8; 8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// Size of the fixed header in bytes
pub const HEADER_SIZE: usize = 512;

/// Smallest possible compound file with 512-byte sectors
pub const MINIMAL_FILE_SIZE: usize = 1536;

/// Size of a directory entry in bytes
pub const DIRENTRY_SIZE: usize = 128;

/// Number of DIFAT slots stored directly in the header
pub const HEADER_DIFAT_SLOTS: usize = 109;

// Special sector IDs
/// End of a sector chain
pub const ENDOFCHAIN: u32 = 0xFFFFFFFE;
/// Unallocated sector
pub const FREESECT: u32 = 0xFFFFFFFF;

/// Unallocated directory entry / absent sibling or child link
pub const NOSTREAM: u32 = 0xFFFFFFFF;

// Directory entry object types
/// Element is a storage object
pub const STGTY_STORAGE: u8 = 1;
/// Element is a stream object
pub const STGTY_STREAM: u8 = 2;
/// Element is the root storage
pub const STGTY_ROOT: u8 = 5;
