//! fitskit-core - FITS card and field codecs
//!
//! This crate holds the pure, I/O-free pieces of the FITS container format:
//! the 80-column card codec with its quoting, HIERARCH and CONTINUE
//! conventions, the ordered keyed list that backs a header, the keyword
//! registry, and the fixed-width ASCII field parser.

pub mod card;
pub mod constants;
pub mod error;
pub mod keyed_list;
pub mod keyword;
pub mod options;
pub mod parser;

pub use card::{
    check_keyword, continuation_count, continue_fragment, escaped_len, reassemble_long_string,
    split_long_string, Card, CardValue,
};
pub use constants::*;
pub use error::{FitsError, Result};
pub use keyed_list::{Cursor, KeyedList};
pub use keyword::{expand_indexed, is_commentary, std_keys, KeyRef, KeywordRegistry, HIERARCH_PREFIX};
pub use options::FitsOptions;
pub use parser::ByteParser;
