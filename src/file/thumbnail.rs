//! Thumbnail derivation.

use std::io::Cursor;
use std::path::Path;

use image::imageops::FilterType;

use crate::Result;

/// Path of the `size` thumbnail for the blob at `local_path`.
///
/// `/data/abc.png` with size 100 becomes `/data/abc_100.png`; a path
/// without an extension just gets the `_100` suffix.
pub fn thumbnail_path(local_path: &str, size: u32) -> String {
    let path = Path::new(local_path);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => {
            let name = format!("{}_{size}.{}", stem.to_string_lossy(), ext.to_string_lossy());
            path.with_file_name(name).to_string_lossy().into_owned()
        }
        _ => format!("{local_path}_{size}"),
    }
}

/// Resize an encoded image to `width`, keeping its aspect ratio and format.
///
/// CPU-bound; call from a blocking task.
pub fn resize_to_width(content: &[u8], width: u32) -> Result<Vec<u8>> {
    let format = image::guess_format(content)?;
    let img = image::load_from_memory_with_format(content, format)?;

    let height = ((u64::from(img.height()) * u64::from(width)) / u64::from(img.width().max(1)))
        .clamp(1, u64::from(u32::MAX)) as u32;
    let resized = img.resize_exact(width, height, FilterType::Lanczos3);

    let mut out = Cursor::new(Vec::new());
    resized.write_to(&mut out, format)?;
    Ok(out.into_inner())
}
