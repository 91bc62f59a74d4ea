//! Random-access media
//!
//! Headers and heaps remember where they were read from when the medium
//! can seek, so they can later be rewritten in place.

use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Where an element was read from or last written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileAnchor {
    /// Byte offset of the element in the medium
    pub offset: u64,
    /// Whether the medium accepts writes
    pub writable: bool,
}

/// A seekable medium that knows whether it can be written
pub trait RandomAccess: Read + Seek {
    fn is_writable(&self) -> bool;

    /// Anchor at the current position
    fn anchor(&mut self) -> io::Result<FileAnchor> {
        Ok(FileAnchor {
            offset: self.stream_position()?,
            writable: self.is_writable(),
        })
    }
}

/// A file opened for random access
#[derive(Debug)]
pub struct RandomAccessFile {
    file: File,
    writable: bool,
}

impl RandomAccessFile {
    /// Open read-only
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self {
            file: File::open(path)?,
            writable: false,
        })
    }

    /// Open for reading and writing
    pub fn open_rw<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file, writable: true })
    }

    /// Create or truncate for reading and writing
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self { file, writable: true })
    }

    pub fn len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Read for RandomAccessFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for RandomAccessFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for RandomAccessFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl RandomAccess for RandomAccessFile {
    fn is_writable(&self) -> bool {
        self.writable
    }
}

impl RandomAccess for Cursor<Vec<u8>> {
    fn is_writable(&self) -> bool {
        true
    }
}

impl RandomAccess for Cursor<&mut Vec<u8>> {
    fn is_writable(&self) -> bool {
        true
    }
}

impl RandomAccess for Cursor<&[u8]> {
    fn is_writable(&self) -> bool {
        false
    }
}

impl<T: RandomAccess + ?Sized> RandomAccess for &mut T {
    fn is_writable(&self) -> bool {
        (**self).is_writable()
    }
}

/// Read until `buf` is full or the stream ends, returning the bytes read
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Skip `n` bytes of a stream, returning how many were actually skipped
pub fn skip_bytes<R: Read + ?Sized>(reader: &mut R, n: u64) -> io::Result<u64> {
    io::copy(&mut Read::take(&mut *reader, n), &mut io::sink())
}

/// Write `n` copies of `fill`
pub fn write_fill<W: Write + ?Sized>(writer: &mut W, fill: u8, n: u64) -> io::Result<()> {
    let block = [fill; fitskit_core::BLOCK_SIZE];
    let mut left = n;
    while left > 0 {
        let chunk = left.min(block.len() as u64) as usize;
        writer.write_all(&block[..chunk])?;
        left -= chunk as u64;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_full_and_skip() {
        let data: Vec<u8> = (0..10).collect();
        let mut cursor = Cursor::new(data.as_slice());
        let mut buf = [0u8; 4];
        assert_eq!(read_full(&mut cursor, &mut buf).unwrap(), 4);
        assert_eq!(skip_bytes(&mut cursor, 3).unwrap(), 3);
        let mut rest = [0u8; 8];
        assert_eq!(read_full(&mut cursor, &mut rest).unwrap(), 3);
        assert_eq!(&rest[..3], &[7, 8, 9]);
        assert_eq!(skip_bytes(&mut cursor, 5).unwrap(), 0);
    }

    #[test]
    fn test_anchor() {
        let mut cursor = Cursor::new(vec![0u8; 100]);
        cursor.set_position(40);
        assert_eq!(cursor.anchor().unwrap(), FileAnchor { offset: 40, writable: true });

        let data = [0u8; 4];
        let mut ro = Cursor::new(&data[..]);
        assert!(!ro.anchor().unwrap().writable);
    }

    #[test]
    fn test_write_fill() {
        let mut out = Vec::new();
        write_fill(&mut out, b' ', 3000).unwrap();
        assert_eq!(out.len(), 3000);
        assert!(out.iter().all(|&b| b == b' '));
    }
}
