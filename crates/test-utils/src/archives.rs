//! Builders for scene archives used in extraction and pipeline tests.
//!
//! Band payloads are small text blobs naming the band; the raster collaborator
//! is faked in tests, so file contents only need to be recognizable.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tar::{Builder, EntryType, Header};

use crate::fixtures::{archive_name, band_codes_for};

/// Writes a well-formed scene archive `<base>_<product>.tar` into `dir`.
///
/// The archive holds one file per band code plus the pixel QA file, using the
/// band codes shipped for the scene's sensor generation.
pub fn write_scene_archive(dir: &Path, base: &str, product: &str) -> io::Result<PathBuf> {
    let codes = band_codes_for(base);
    let mut names: Vec<String> = codes
        .iter()
        .map(|code| format!("{}_{}{}.tif", base, product, code))
        .collect();
    names.push(format!("{}_PIXELQA.tif", base));

    let path = dir.join(archive_name(base, product));
    let entries: Vec<(String, Vec<u8>)> = names
        .into_iter()
        .map(|name| {
            let payload = format!("band:{}", name).into_bytes();
            (name, payload)
        })
        .collect();
    write_archive(&path, &entries)?;
    Ok(path)
}

/// Writes a scene archive that lacks the listed band codes.
pub fn write_incomplete_scene_archive(
    dir: &Path,
    base: &str,
    product: &str,
    missing: &[&str],
) -> io::Result<PathBuf> {
    let entries: Vec<(String, Vec<u8>)> = band_codes_for(base)
        .iter()
        .filter(|code| !missing.contains(*code))
        .map(|code| format!("{}_{}{}.tif", base, product, code))
        .chain(std::iter::once(format!("{}_PIXELQA.tif", base)))
        .map(|name| (name.clone(), name.into_bytes()))
        .collect();

    let path = dir.join(archive_name(base, product));
    write_archive(&path, &entries)?;
    Ok(path)
}

/// Writes a plain tar archive with validated (relative, `..`-free) entry names.
pub fn write_archive<N: AsRef<str>, D: AsRef<[u8]>>(
    path: &Path,
    entries: &[(N, D)],
) -> io::Result<()> {
    let mut builder = Builder::new(File::create(path)?);
    for (name, data) in entries {
        let data = data.as_ref();
        let mut header = Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(EntryType::Regular);
        builder.append_data(&mut header, name.as_ref(), data)?;
    }
    builder.into_inner()?.sync_all()
}

/// Writes a tar archive whose entry names are copied into the header verbatim.
///
/// The `tar` builder refuses `..` and absolute names, so this writes the raw
/// name bytes to produce archives that attempt path traversal.
pub fn write_raw_archive<N: AsRef<str>, D: AsRef<[u8]>>(
    path: &Path,
    entries: &[(N, D)],
) -> io::Result<()> {
    let mut builder = Builder::new(File::create(path)?);
    for (name, data) in entries {
        let name = name.as_ref().as_bytes();
        let data = data.as_ref();
        if name.len() >= 100 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "raw entry names must be shorter than 100 bytes",
            ));
        }

        let mut header = Header::new_old();
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(EntryType::Regular);
        header.set_cksum();
        builder.append(&header, data)?;
    }
    builder.into_inner()?.sync_all()
}

/// Writes a tar archive holding one symlink entry pointing at `target`.
pub fn write_symlink_archive(path: &Path, link_name: &str, target: &str) -> io::Result<()> {
    let mut builder = Builder::new(File::create(path)?);
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Symlink);
    header.set_size(0);
    header.set_mode(0o777);
    header.set_path(link_name)?;
    header.set_link_name(target)?;
    header.set_cksum();
    builder.append(&header, io::empty())?;
    builder.into_inner()?.sync_all()
}

/// Writes bytes that are not a tar archive at all.
pub fn write_corrupt_archive(dir: &Path, base: &str, product: &str) -> io::Result<PathBuf> {
    let path = dir.join(archive_name(base, product));
    std::fs::write(&path, vec![0xA5u8; 700])?;
    Ok(path)
}
