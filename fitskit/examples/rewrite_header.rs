//! Read-modify-rewrite walkthrough
//!
//! Opens a FITS file for update, adds a card to the primary header and writes
//! it back in place when the header still fits its original blocks. Without a
//! path argument a small sample file is created in the temp directory first.
//!
//! ```text
//! cargo run --example rewrite_header -- path/to/file.fits
//! ```

use std::path::{Path, PathBuf};

use fitskit::{FitsFile, Header, Result};

fn write_sample(path: &Path) -> Result<()> {
    let mut header = Header::new();
    header.set_simple(true)?;
    header.set_bitpix(8)?;
    header.set_naxes(0)?;

    let mut file = FitsFile::create(path)?;
    file.append_unit(&mut header, &[])?;
    Ok(())
}

fn main() -> Result<()> {
    let path = match std::env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => {
            let path = std::env::temp_dir().join("fitskit_rewrite_header.fits");
            write_sample(&path)?;
            println!("Created sample file {}", path.display());
            path
        }
    };

    let mut file = FitsFile::open_rw(&path)?;
    let mut units = file.units()?;
    println!("{} unit(s) in {}", units.len(), path.display());

    let Some(primary) = units.first_mut() else {
        println!("No units found");
        return Ok(());
    };
    let header = &mut primary.header;
    println!("Primary header has {} cards", header.number_of_cards());

    header.add_str("ORIGIN", "fitskit", Some("rewritten in place"))?;
    header.insert_history("ORIGIN added by rewrite_header");

    if header.can_rewrite() {
        file.rewrite_header(header)?;
        println!("Header rewritten in place");
    } else {
        println!("Header outgrew its blocks; copy the file to add these cards");
    }

    let units = file.units()?;
    if let Some(primary) = units.first() {
        println!(
            "ORIGIN = {:?}",
            primary.header.get_string("ORIGIN").unwrap_or_default()
        );
    }
    Ok(())
}
