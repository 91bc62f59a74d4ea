//! File handle for FITS files on disk
//!
//! [`FitsFile`] walks the header/data units of a file, reading each header
//! and skipping its data segment by the size the header declares.

use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fitskit_core::{padding_for, std_keys, FitsOptions, KeywordRegistry, DATA_FILL};
use tracing::debug;

use crate::error::{Error, Result};
use crate::header::Header;
use crate::heap::PayloadHeap;
use crate::stream::{read_full, write_fill, RandomAccessFile};

/// A header together with where its data segment starts
#[derive(Debug, Clone)]
pub struct Unit {
    pub header: Header,
    pub data_offset: u64,
}

impl Unit {
    /// Offset of the heap within the data segment
    pub fn heap_offset(&self) -> u64 {
        let width = self.header.get_long("NAXIS1", 0).max(0) as u64;
        let rows = self.header.get_long("NAXIS2", 0).max(0) as u64;
        u64::try_from(self.header.get_long(std_keys::THEAP, -1)).unwrap_or(width * rows)
    }

    /// Heap size in bytes, as declared by PCOUNT
    pub fn heap_size(&self) -> u64 {
        u64::try_from(self.header.get_long(std_keys::PCOUNT, 0)).unwrap_or(0)
    }
}

/// File handle for FITS files
pub struct FitsFile {
    path: PathBuf,
    stream: RandomAccessFile,
    options: FitsOptions,
}

impl FitsFile {
    /// Open an existing file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let stream = RandomAccessFile::open(&path)?;
        Ok(Self::from_parts(path, stream))
    }

    /// Open an existing file for reading and in-place rewrites
    pub fn open_rw<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let stream = RandomAccessFile::open_rw(&path)?;
        Ok(Self::from_parts(path, stream))
    }

    /// Create a new, empty file
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let stream = RandomAccessFile::create(&path)?;
        Ok(Self::from_parts(path, stream))
    }

    fn from_parts(path: PathBuf, stream: RandomAccessFile) -> Self {
        Self {
            path,
            stream,
            options: FitsOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FitsOptions) -> Self {
        self.options = options;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &FitsOptions {
        &self.options
    }

    /// Read every header in the file, skipping the data segments
    pub fn units(&mut self) -> Result<Vec<Unit>> {
        let len = self.stream.len()?;
        self.stream.seek(SeekFrom::Start(0))?;

        let mut units = Vec::new();
        loop {
            let header = match Header::read_anchored_with(
                &mut self.stream,
                KeywordRegistry::global(),
                self.options,
            ) {
                Ok(header) => header,
                Err(e) if e.is_end_of_input() => break,
                Err(e) => return Err(e),
            };

            let data_offset = self.stream.stream_position()?;
            let end = data_offset + header.data_size();
            if end > len {
                return Err(Error::TruncatedFile { offset: len });
            }
            self.stream.seek(SeekFrom::Start(end))?;
            units.push(Unit {
                header,
                data_offset,
            });
        }

        debug!(path = %self.path.display(), units = units.len(), "scanned file");
        Ok(units)
    }

    /// Append a header and its data segment, padding the data with zeros
    pub fn append_unit(&mut self, header: &mut Header, data: &[u8]) -> Result<u64> {
        self.stream.seek(SeekFrom::End(0))?;
        header.write_anchored(&mut self.stream)?;
        let data_offset = self.stream.stream_position()?;
        self.stream.write_all(data)?;
        write_fill(&mut self.stream, DATA_FILL, padding_for(data.len() as u64))?;
        self.stream.flush()?;
        Ok(data_offset)
    }

    /// Data segment of `unit`, without padding
    pub fn read_data(&mut self, unit: &Unit) -> Result<Vec<u8>> {
        let size = unit.header.true_data_size() as usize;
        let mut data = vec![0; size];
        self.stream.seek(SeekFrom::Start(unit.data_offset))?;
        let n = read_full(&mut self.stream, &mut data)?;
        if n < size {
            return Err(Error::TruncatedFile {
                offset: unit.data_offset + n as u64,
            });
        }
        Ok(data)
    }

    /// Load the heap of a table unit
    pub fn read_heap(&mut self, unit: &Unit) -> Result<PayloadHeap> {
        let size = u32::try_from(unit.heap_size()).map_err(|_| Error::HeapOverflow {
            requested: unit.heap_size(),
        })?;
        let mut heap = PayloadHeap::with_size(size);
        self.stream
            .seek(SeekFrom::Start(unit.data_offset + unit.heap_offset()))?;
        heap.read_anchored(&mut self.stream)?;
        Ok(heap)
    }

    /// Write `header` back over its original location
    pub fn rewrite_header(&mut self, header: &mut Header) -> Result<()> {
        header.rewrite(&mut self.stream)
    }

    /// Write `heap` back over its original location
    pub fn rewrite_heap(&mut self, heap: &PayloadHeap) -> Result<()> {
        heap.rewrite(&mut self.stream)
    }
}
