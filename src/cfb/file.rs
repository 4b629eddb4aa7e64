//! Compound file reader.
//!
//! Parses the CFB header, DIFAT/FAT/MiniFAT and directory, then turns
//! the whole container into a [`ContainerTree`] with every stream's
//! bytes read up front. Input is assumed hostile: sector chains are
//! cycle-guarded and declared sizes are clamped to what the file can
//! actually hold.

use super::consts::*;
use super::tree::{ContainerTree, NodeId};
use crate::common::error::{Error, Result};
use bytes::Bytes;
use std::io::{Read, Seek, SeekFrom};
use zerocopy::{FromBytes, LE, U16, U32, U64};
use zerocopy_derive::FromBytes as DeriveFromBytes;

/// On-disk compound file header (512 bytes).
#[derive(DeriveFromBytes)]
#[repr(C)]
struct RawHeader {
    signature: [u8; 8],
    clsid: [u8; 16],
    minor_version: U16<LE>,
    major_version: U16<LE>,
    byte_order: U16<LE>,
    sector_shift: U16<LE>,
    mini_sector_shift: U16<LE>,
    reserved: [u8; 6],
    num_dir_sectors: U32<LE>,
    num_fat_sectors: U32<LE>,
    first_dir_sector: U32<LE>,
    transaction_signature: U32<LE>,
    mini_stream_cutoff: U32<LE>,
    first_minifat_sector: U32<LE>,
    num_minifat_sectors: U32<LE>,
    first_difat_sector: U32<LE>,
    num_difat_sectors: U32<LE>,
    difat: [U32<LE>; HEADER_DIFAT_SLOTS],
}

/// On-disk directory entry (128 bytes).
#[derive(DeriveFromBytes)]
#[repr(C)]
struct RawDirectoryEntry {
    /// Entry name in UTF-16LE, null-padded
    name: [u8; 64],
    /// Length of the name in bytes, including the null terminator
    name_len: U16<LE>,
    entry_type: u8,
    node_color: u8,
    sid_left: U32<LE>,
    sid_right: U32<LE>,
    sid_child: U32<LE>,
    clsid: [u8; 16],
    state_bits: U32<LE>,
    creation_time: U64<LE>,
    modified_time: U64<LE>,
    start_sector: U32<LE>,
    stream_size: U64<LE>,
}

/// Parsed directory entry.
#[derive(Debug, Clone)]
struct DirEntry {
    name: String,
    entry_type: u8,
    sid_left: u32,
    sid_right: u32,
    sid_child: u32,
    start_sector: u32,
    size: u64,
}

/// Compound file parser over any seekable reader.
#[derive(Debug)]
pub struct CompoundFile<R: Read + Seek> {
    reader: R,
    file_size: u64,
    sector_size: usize,
    mini_sector_size: usize,
    mini_stream_cutoff: u32,
    fat: Vec<u32>,
    minifat: Vec<u32>,
    entries: Vec<Option<DirEntry>>,
    /// Root storage's own stream, backing all MiniFAT streams
    ministream: Option<Vec<u8>>,
}

impl<R: Read + Seek> CompoundFile<R> {
    /// Open and parse the compound file structures.
    ///
    /// Returns [`Error::NotCompoundFile`] when the magic bytes are absent,
    /// which callers use to fall back to the zip probe.
    pub fn open(mut reader: R) -> Result<Self> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        if file_size < MINIMAL_FILE_SIZE as u64 {
            return Err(Error::NotCompoundFile);
        }

        let mut header_bytes = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header_bytes)?;

        let header = RawHeader::read_from_bytes(&header_bytes)
            .map_err(|_| Error::InvalidFormat("failed to parse compound file header".to_string()))?;

        if &header.signature != CFB_MAGIC {
            return Err(Error::NotCompoundFile);
        }
        if header.byte_order.get() != 0xFFFE {
            return Err(Error::InvalidFormat("invalid byte order mark".to_string()));
        }

        let sector_size = 1usize << header.sector_shift.get().min(15);
        let mini_sector_size = 1usize << header.mini_sector_shift.get().min(15);
        let major = header.major_version.get();
        if (major == 3 && sector_size != 512) || (major == 4 && sector_size != 4096) {
            return Err(Error::InvalidFormat(format!(
                "sector size {sector_size} does not match version {major}"
            )));
        }

        let mut cfb = CompoundFile {
            reader,
            file_size,
            sector_size,
            mini_sector_size,
            mini_stream_cutoff: header.mini_stream_cutoff.get(),
            fat: Vec::new(),
            minifat: Vec::new(),
            entries: Vec::new(),
            ministream: None,
        };

        cfb.load_fat(&header)?;
        cfb.load_directory(header.first_dir_sector.get())?;
        if header.num_minifat_sectors.get() > 0 {
            cfb.load_minifat(header.first_minifat_sector.get())?;
        }

        Ok(cfb)
    }

    /// Consume the parser and materialize the container tree, reading
    /// every stream's bytes.
    pub fn into_tree(mut self) -> Result<ContainerTree> {
        let root = self
            .entries
            .first()
            .and_then(|e| e.clone())
            .ok_or_else(|| Error::CorruptedFile("missing root directory entry".to_string()))?;

        let mut tree = ContainerTree::new(root.name.clone());
        let root_id = tree.root();
        let mut visited = vec![false; self.entries.len()];
        self.attach_siblings(&mut tree, root_id, root.sid_child, &mut visited)?;
        Ok(tree)
    }

    /// Walk a red-black sibling tree in order and attach each entry under
    /// its parent. `visited` breaks cycles planted in hostile files.
    ///
    /// The walk runs on an explicit heap stack: a crafted directory with
    /// a long linear sibling chain must not be able to exhaust the call
    /// stack.
    fn attach_siblings(
        &mut self,
        tree: &mut ContainerTree,
        parent: NodeId,
        first_sid: u32,
        visited: &mut [bool],
    ) -> Result<()> {
        // (parent, sid, emit): emit = false descends in order (left,
        // self, right), emit = true attaches the node itself
        let mut work = vec![(parent, first_sid, false)];

        while let Some((parent, sid, emit)) = work.pop() {
            if sid == NOSTREAM || sid as usize >= self.entries.len() {
                continue;
            }

            if emit {
                let Some(entry) = self.entries[sid as usize].clone() else {
                    continue;
                };
                match entry.entry_type {
                    STGTY_STORAGE => {
                        let node = tree.add_storage(parent, entry.name.clone());
                        work.push((node, entry.sid_child, false));
                    }
                    STGTY_STREAM => {
                        let data = self.read_stream_bytes(&entry)?;
                        tree.add_stream(parent, entry.name.clone(), Bytes::from(data));
                    }
                    _ => {}
                }
                continue;
            }

            if std::mem::replace(&mut visited[sid as usize], true) {
                continue;
            }
            let Some(entry) = self.entries[sid as usize].clone() else {
                continue;
            };
            // Pushed in reverse so the left subtree is handled first
            work.push((parent, entry.sid_right, false));
            work.push((parent, sid, true));
            work.push((parent, entry.sid_left, false));
        }

        Ok(())
    }

    fn read_stream_bytes(&mut self, entry: &DirEntry) -> Result<Vec<u8>> {
        // A declared size beyond the file itself is corruption; clamp so a
        // hostile header cannot drive allocation.
        let size = entry.size.min(self.file_size) as usize;
        let mut data = if size < self.mini_stream_cutoff as usize {
            self.read_minifat_chain(entry.start_sector, size)?
        } else {
            self.read_fat_chain(entry.start_sector)?
        };
        data.truncate(size);
        Ok(data)
    }

    fn load_fat(&mut self, header: &RawHeader) -> Result<()> {
        let mut fat_sectors = Vec::new();
        for slot in &header.difat {
            let sector = slot.get();
            if sector == FREESECT || sector == ENDOFCHAIN {
                break;
            }
            fat_sectors.push(sector);
        }

        // Additional DIFAT sectors chain through their last slot
        let mut difat_sector = header.first_difat_sector.get();
        let slots_per_sector = self.sector_size / 4 - 1;
        // The file cannot hold more DIFAT sectors than it has sectors
        let max_difat = (self.file_size / self.sector_size as u64) as u32;
        for _ in 0..header.num_difat_sectors.get().min(max_difat) {
            if difat_sector == ENDOFCHAIN || difat_sector == FREESECT {
                break;
            }
            let sector_data = self.read_sector(difat_sector)?;
            for i in 0..slots_per_sector {
                let sector = u32_at(&sector_data, i * 4);
                if sector == FREESECT || sector == ENDOFCHAIN {
                    break;
                }
                fat_sectors.push(sector);
            }
            difat_sector = u32_at(&sector_data, slots_per_sector * 4);
        }

        let entries_per_sector = self.sector_size / 4;
        self.fat.reserve(fat_sectors.len() * entries_per_sector);
        for &sector_id in &fat_sectors {
            let sector_data = self.read_sector(sector_id)?;
            for i in 0..entries_per_sector {
                self.fat.push(u32_at(&sector_data, i * 4));
            }
        }

        Ok(())
    }

    fn load_minifat(&mut self, first_minifat_sector: u32) -> Result<()> {
        let data = self.read_fat_chain(first_minifat_sector)?;
        self.minifat = data.chunks_exact(4).map(|c| u32_at(c, 0)).collect();
        Ok(())
    }

    fn load_directory(&mut self, first_dir_sector: u32) -> Result<()> {
        let dir_data = self.read_fat_chain(first_dir_sector)?;

        self.entries = dir_data
            .chunks_exact(DIRENTRY_SIZE)
            .map(parse_directory_entry)
            .collect();

        if self.entries.first().and_then(|e| e.as_ref()).is_none() {
            return Err(Error::CorruptedFile("missing root directory entry".to_string()));
        }
        Ok(())
    }

    fn read_sector(&mut self, sector_id: u32) -> Result<Vec<u8>> {
        let position = (sector_id as u64 + 1) * self.sector_size as u64;
        if position + self.sector_size as u64 > self.file_size {
            return Err(Error::CorruptedFile(format!(
                "sector {sector_id} lies past end of file"
            )));
        }
        self.reader.seek(SeekFrom::Start(position))?;
        let mut buffer = vec![0u8; self.sector_size];
        self.reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Follow a FAT chain, collecting whole sectors.
    fn read_fat_chain(&mut self, start_sector: u32) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        let mut sector = start_sector;
        // A valid chain cannot be longer than the FAT itself
        let mut hops = self.fat.len() + 1;

        while sector != ENDOFCHAIN && sector != FREESECT {
            if hops == 0 {
                return Err(Error::CorruptedFile("cyclic FAT chain".to_string()));
            }
            hops -= 1;

            let next = *self.fat.get(sector as usize).ok_or_else(|| {
                Error::CorruptedFile(format!("sector {sector} not present in FAT"))
            })?;
            let sector_data = self.read_sector(sector)?;
            data.extend_from_slice(&sector_data);
            sector = next;
        }

        Ok(data)
    }

    /// Follow a MiniFAT chain within the root storage's ministream.
    fn read_minifat_chain(&mut self, start_sector: u32, size: usize) -> Result<Vec<u8>> {
        if self.ministream.is_none() {
            let root = self.entries[0]
                .clone()
                .ok_or_else(|| Error::CorruptedFile("missing root directory entry".to_string()))?;
            let ministream = self.read_fat_chain(root.start_sector)?;
            self.ministream = Some(ministream);
        }
        let Some(ministream) = self.ministream.as_ref() else {
            return Err(Error::CorruptedFile("ministream unavailable".to_string()));
        };

        let mut data = Vec::with_capacity(size);
        let mut sector = start_sector;
        let mut hops = self.minifat.len() + 1;

        while sector != ENDOFCHAIN && sector != FREESECT {
            if hops == 0 {
                return Err(Error::CorruptedFile("cyclic MiniFAT chain".to_string()));
            }
            hops -= 1;

            let next = *self.minifat.get(sector as usize).ok_or_else(|| {
                Error::CorruptedFile(format!("mini sector {sector} not present in MiniFAT"))
            })?;
            let position = sector as usize * self.mini_sector_size;
            let end = position + self.mini_sector_size;
            if end > ministream.len() {
                return Err(Error::CorruptedFile("mini sector out of bounds".to_string()));
            }
            data.extend_from_slice(&ministream[position..end]);
            sector = next;
        }

        Ok(data)
    }
}

fn parse_directory_entry(raw_bytes: &[u8]) -> Option<DirEntry> {
    let raw = RawDirectoryEntry::read_from_bytes(raw_bytes).ok()?;

    if raw.entry_type != STGTY_STORAGE
        && raw.entry_type != STGTY_STREAM
        && raw.entry_type != STGTY_ROOT
    {
        return None;
    }

    let name_len = (raw.name_len.get() as usize).saturating_sub(2).min(64);
    let name = crate::common::codepage::decode_utf16le(&raw.name[..name_len]);

    Some(DirEntry {
        name,
        entry_type: raw.entry_type,
        sid_left: raw.sid_left.get(),
        sid_right: raw.sid_right.get(),
        sid_child: raw.sid_child.get(),
        start_sector: raw.start_sector.get(),
        size: raw.stream_size.get(),
    })
}

#[inline]
fn u32_at(data: &[u8], offset: usize) -> u32 {
    U32::<LE>::read_from_bytes(&data[offset..offset + 4])
        .map(|v| v.get())
        .unwrap_or(0)
}

/// Check whether a byte buffer starts like a compound file.
pub fn is_compound_file(data: &[u8]) -> bool {
    data.len() >= CFB_MAGIC.len() && &data[..CFB_MAGIC.len()] == CFB_MAGIC
}
