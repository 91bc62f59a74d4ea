//! fitskit - FITS headers, heaps and files
//!
//! This crate reads and writes the metadata side of FITS files: headers made
//! of 80-byte cards, the heap behind variable-length table columns, and the
//! walk over header/data units in a file.
//!
//! ## Architecture
//!
//! fitskit follows the same split as its core crate:
//!
//! - **fitskit-core**: card codec, keyed list, field parser and keyword registry (no I/O)
//! - **fitskit**: headers, heaps and files over `std::io` streams
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fitskit::{FitsFile, FitsOptions};
//!
//! fn example() -> fitskit::Result<()> {
//!     let mut file = FitsFile::open_rw("image.fits")?
//!         .with_options(FitsOptions::default().with_long_strings(true));
//!
//!     for mut unit in file.units()? {
//!         let bitpix = unit.header.get_int("BITPIX", 0);
//!         println!("BITPIX = {bitpix}, {} data bytes", unit.header.data_size());
//!
//!         unit.header.add_str("ORIGIN", "fitskit", None)?;
//!         if unit.header.can_rewrite() {
//!             file.rewrite_header(&mut unit.header)?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Long strings**: values split over CONTINUE cards and joined on read
//! - **Duplicate recovery**: repeated keywords keep the later card
//! - **In-place rewrite**: headers and heaps that still fit their blocks
//! - **serde**: options loadable from JSON

pub use fitskit_core::{
    // Cards
    Card, CardValue, FitsOptions, KeyRef, KeywordRegistry,
    // Building blocks
    ByteParser, Cursor, KeyedList,
    // Keywords
    expand_indexed, is_commentary, std_keys, HIERARCH_PREFIX,
    // Layout
    padded_size, padding_for, BLOCK_SIZE, CARD_SIZE,
    // Errors
    FitsError,
};

pub mod error;
pub mod file;
pub mod header;
pub mod heap;
pub mod stream;

#[cfg(feature = "serde")]
pub mod config;

pub use error::{Error, Result};
pub use file::{FitsFile, Unit};
pub use header::Header;
pub use heap::{BigEndianArray, HeapCodec, PayloadHeap};
pub use stream::{FileAnchor, RandomAccess, RandomAccessFile};
