//! Heap
//!
//! The heap is the append-only byte arena behind variable-length table
//! columns. Rows refer to payloads by offset; the heap itself has no notion
//! of entries, only of bytes and of the codec used to interpret them.
//!
//! Growth is geometric with a floor of [`MIN_HEAP_CAPACITY`]. Any growth
//! marks the heap as expanded, which permanently rules out rewriting it in
//! place: the region reserved on disk was sized when the heap was first
//! written.

use std::io::{Read, SeekFrom, Write};
use std::marker::PhantomData;
use std::mem::size_of;

use bytemuck::Pod;
use fitskit_core::MIN_HEAP_CAPACITY;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::stream::{read_full, FileAnchor, RandomAccess};

/// Largest heap size addressable by a 32-bit signed descriptor
const MAX_HEAP_SIZE: u64 = i32::MAX as u64;

/// Encodes values into heap bytes and decodes them back
pub trait HeapCodec {
    type Value;
    /// What the decoder needs to know besides the bytes, such as an element count
    type Shape;

    fn byte_length(&self, value: &Self::Value) -> u64;

    /// Append the encoding of `value` to `out`
    fn encode(&self, value: &Self::Value, out: &mut Vec<u8>) -> Result<()>;

    /// Decode one value from the start of `bytes`, returning it with the
    /// number of bytes consumed
    fn decode(&self, bytes: &[u8], shape: &Self::Shape) -> Result<(Self::Value, usize)>;
}

/// Big-endian array of a plain numeric type, shaped by its element count
#[derive(Debug, Clone, Copy)]
pub struct BigEndianArray<T>(PhantomData<T>);

impl<T: Pod> BigEndianArray<T> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: Pod> Default for BigEndianArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Reverse the byte order of every `width`-byte element
fn swap_elements(bytes: &mut [u8], width: usize) {
    if cfg!(target_endian = "little") && width > 1 {
        for element in bytes.chunks_exact_mut(width) {
            element.reverse();
        }
    }
}

impl<T: Pod> HeapCodec for BigEndianArray<T> {
    type Value = Vec<T>;
    type Shape = usize;

    fn byte_length(&self, value: &Vec<T>) -> u64 {
        (value.len() * size_of::<T>()) as u64
    }

    fn encode(&self, value: &Vec<T>, out: &mut Vec<u8>) -> Result<()> {
        let width = size_of::<T>();
        if width == 0 {
            return Ok(());
        }
        let start = out.len();
        out.extend_from_slice(bytemuck::cast_slice(value));
        swap_elements(&mut out[start..], width);
        Ok(())
    }

    fn decode(&self, bytes: &[u8], count: &usize) -> Result<(Vec<T>, usize)> {
        let width = size_of::<T>();
        let mut values = vec![<T as bytemuck::Zeroable>::zeroed(); *count];
        if width == 0 {
            return Ok((values, 0));
        }
        let needed = count.checked_mul(width).ok_or(Error::Decode {
            offset: 0,
            reason: "array length overflows",
        })?;
        if bytes.len() < needed {
            return Err(Error::Decode {
                offset: bytes.len() as u64,
                reason: "array runs past the end of the heap",
            });
        }
        let dst: &mut [u8] = bytemuck::cast_slice_mut(&mut values);
        dst.copy_from_slice(&bytes[..needed]);
        swap_elements(dst, width);
        Ok((values, needed))
    }
}

/// Growable, offset-addressed byte arena
#[derive(Debug, Clone, Default)]
pub struct PayloadHeap {
    /// Backing storage; its length is the capacity
    buffer: Vec<u8>,
    used: u32,
    expanded: bool,
    anchor: Option<FileAnchor>,
}

impl PayloadHeap {
    /// Empty heap
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero-filled heap of `size` used bytes, ready to be read into
    pub fn with_size(size: u32) -> Self {
        Self {
            buffer: vec![0; size as usize],
            used: size,
            ..Self::default()
        }
    }

    pub fn used_size(&self) -> u32 {
        self.used
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// True once any growth has reallocated the buffer
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn anchor(&self) -> Option<FileAnchor> {
        self.anchor
    }

    /// Make room for `additional` more bytes; returns true if the buffer grew
    pub fn ensure_capacity(&mut self, additional: u64) -> Result<bool> {
        let need = u64::from(self.used) + additional;
        if need > MAX_HEAP_SIZE {
            return Err(Error::HeapOverflow { requested: need });
        }
        if need <= self.buffer.len() as u64 {
            return Ok(false);
        }

        let capacity = (need * 2).max(MIN_HEAP_CAPACITY as u64) as usize;
        debug!(
            used = self.used,
            from = self.buffer.len(),
            to = capacity,
            "growing heap"
        );
        self.buffer.resize(capacity, 0);
        self.expanded = true;
        Ok(true)
    }

    /// Append encoded bytes and return the offset they start at
    pub fn append(&mut self, bytes: &[u8]) -> Result<u32> {
        self.ensure_capacity(bytes.len() as u64)?;
        let offset = self.used;
        let start = offset as usize;
        self.buffer[start..start + bytes.len()].copy_from_slice(bytes);
        // ensure_capacity bounded the new size by i32::MAX
        self.used += bytes.len() as u32;
        Ok(offset)
    }

    /// Encode `value` with `codec` and append it
    pub fn append_value<C: HeapCodec>(&mut self, codec: &C, value: &C::Value) -> Result<u32> {
        let length = codec.byte_length(value);
        if u64::from(self.used) + length > MAX_HEAP_SIZE {
            return Err(Error::HeapOverflow {
                requested: u64::from(self.used) + length,
            });
        }
        let mut encoded = Vec::with_capacity(length as usize);
        codec.encode(value, &mut encoded)?;
        self.append(&encoded)
    }

    /// Used bytes from `offset` to the end of the heap
    pub fn bytes_at(&self, offset: u32) -> Result<&[u8]> {
        let used = &self.buffer[..self.used as usize];
        used.get(offset as usize..).ok_or(Error::Decode {
            offset: u64::from(offset),
            reason: "offset past the end of the heap",
        })
    }

    /// Decode the value stored at `offset`
    ///
    /// The whole heap is in memory, so reads may come in any order.
    pub fn read_at<C: HeapCodec>(
        &self,
        offset: u32,
        codec: &C,
        shape: &C::Shape,
    ) -> Result<C::Value> {
        trace!(offset, "heap read");
        let bytes = self.bytes_at(offset)?;
        let (value, _) = codec.decode(bytes, shape).map_err(|e| match e {
            Error::Decode { offset: at, reason } => Error::Decode {
                offset: u64::from(offset) + at,
                reason,
            },
            other => other,
        })?;
        Ok(value)
    }

    /// Fill the used region from `reader`
    pub fn read_from<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<()> {
        let used = self.used as usize;
        if self.buffer.len() < used {
            self.buffer.resize(used, 0);
        }
        let n = read_full(reader, &mut self.buffer[..used])?;
        if n < used {
            return Err(Error::TruncatedFile {
                offset: self.anchor.map_or(0, |a| a.offset) + n as u64,
            });
        }
        Ok(())
    }

    /// Fill the used region and remember where it came from
    pub fn read_anchored<R: RandomAccess + ?Sized>(&mut self, reader: &mut R) -> Result<()> {
        self.anchor = Some(reader.anchor()?);
        self.read_from(reader)
    }

    /// Write the used bytes, without block padding
    pub fn write<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        out.write_all(&self.buffer[..self.used as usize])?;
        Ok(())
    }

    /// True when the heap can be written back over its original location
    pub fn can_rewrite(&self) -> bool {
        self.anchor.is_some_and(|a| a.writable) && !self.expanded
    }

    /// Overwrite the heap at its anchor
    pub fn rewrite<S: RandomAccess + Write + ?Sized>(&self, out: &mut S) -> Result<()> {
        let anchor = match self.anchor {
            Some(anchor) if self.can_rewrite() => anchor,
            _ => return Err(Error::RewriteNotEligible { element: "heap" }),
        };
        out.seek(SeekFrom::Start(anchor.offset))?;
        self.write(out)?;
        out.flush()?;
        debug!(offset = anchor.offset, bytes = self.used, "rewrote heap in place");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::io::Cursor;

    #[test]
    fn test_growth_scenario() {
        let mut heap = PayloadHeap::new();
        assert_eq!(heap.append(&[1u8; 100]).unwrap(), 0);
        assert_eq!(heap.used_size(), 100);

        assert_eq!(heap.append(&[2u8; 20000]).unwrap(), 100);
        assert_eq!(heap.used_size(), 20100);
        assert!(heap.capacity() >= 40200);
        assert!(heap.is_expanded());
    }

    #[test]
    fn test_first_growth_uses_floor() {
        let mut heap = PayloadHeap::new();
        assert!(heap.ensure_capacity(10).unwrap());
        assert_eq!(heap.capacity(), MIN_HEAP_CAPACITY);
        assert!(!heap.ensure_capacity(10).unwrap());
    }

    #[test]
    fn test_overflow_is_rejected() {
        let mut heap = PayloadHeap::new();
        let err = heap.ensure_capacity(MAX_HEAP_SIZE + 1).unwrap_err();
        assert!(matches!(err, Error::HeapOverflow { requested } if requested == MAX_HEAP_SIZE + 1));
        assert!(!heap.is_expanded());
    }

    #[test]
    fn test_typed_round_trip() {
        let mut heap = PayloadHeap::new();
        let ints = BigEndianArray::<i32>::new();
        let doubles = BigEndianArray::<f64>::new();

        let a = heap.append_value(&ints, &vec![1, -2, 300_000]).unwrap();
        let b = heap.append_value(&doubles, &vec![0.5, -1.25]).unwrap();
        assert_eq!(b, 12);
        assert_eq!(&heap.bytes_at(a).unwrap()[..4], &[0, 0, 0, 1]);

        assert_eq!(heap.read_at(a, &ints, &3).unwrap(), vec![1, -2, 300_000]);
        assert_eq!(heap.read_at(b, &doubles, &2).unwrap(), vec![0.5, -1.25]);
        assert_eq!(heap.read_at(a, &ints, &1).unwrap(), vec![1]);
    }

    #[test]
    fn test_short_read_is_decode_error() {
        let mut heap = PayloadHeap::new();
        let offset = heap.append(&[0, 1, 0, 2]).unwrap();
        let err = heap
            .read_at(offset, &BigEndianArray::<i16>::new(), &3)
            .unwrap_err();
        assert!(matches!(err, Error::Decode { offset: 4, .. }));
        assert!(heap.bytes_at(5).is_err());
    }

    #[test]
    fn test_offsets_are_monotonic() {
        let mut rng = StdRng::seed_from_u64(0x4845_4150);
        let mut heap = PayloadHeap::new();
        let mut stored = Vec::new();
        let mut last = None;

        for _ in 0..200 {
            let len = rng.gen_range(1..600);
            let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            let offset = heap.append(&bytes).unwrap();
            if let Some(prev) = last {
                assert!(offset > prev);
            }
            last = Some(offset);
            stored.push((offset, bytes));
        }

        let codec = BigEndianArray::<u8>::new();
        for (offset, bytes) in &stored {
            assert_eq!(&heap.read_at(*offset, &codec, &bytes.len()).unwrap(), bytes);
        }
    }

    #[test]
    fn test_rewrite_blocked_after_growth() {
        let mut file = Cursor::new(vec![9u8; 8 + 64]);
        file.set_position(8);
        let mut heap = PayloadHeap::with_size(64);
        heap.read_anchored(&mut file).unwrap();
        assert!(heap.can_rewrite());

        heap.rewrite(&mut file).unwrap();
        assert_eq!(file.get_ref().len(), 72);

        heap.append(&[1, 2, 3]).unwrap();
        assert!(heap.is_expanded());
        assert!(!heap.can_rewrite());
        assert!(matches!(
            heap.rewrite(&mut file),
            Err(Error::RewriteNotEligible { element: "heap" })
        ));
    }

    #[test]
    fn test_read_only_heap_cannot_rewrite() {
        let bytes = vec![0u8; 32];
        let mut heap = PayloadHeap::with_size(32);
        heap.read_anchored(&mut Cursor::new(bytes.as_slice())).unwrap();
        assert!(!heap.can_rewrite());
    }

    #[test]
    fn test_truncated_read() {
        let mut heap = PayloadHeap::with_size(16);
        let err = heap.read_from(&mut &[0u8; 10][..]).unwrap_err();
        assert!(matches!(err, Error::TruncatedFile { offset: 10 }));
    }

    #[test]
    fn test_write_used_bytes_only() {
        let mut heap = PayloadHeap::new();
        heap.append(b"abc").unwrap();
        let mut out = Vec::new();
        heap.write(&mut out).unwrap();
        assert_eq!(out, b"abc");
    }
}
