//! Uncompressed 24-bit BMP reading and writing.

use log::trace;

use crate::error::Error;
use crate::pixel::{Pixel, PixelGrid};

const FILE_HEADER_LEN: usize = 14;
const INFO_HEADER_LEN: usize = 40;
const HEADER_LEN: usize = FILE_HEADER_LEN + INFO_HEADER_LEN;
const BITS_PER_PIXEL: u16 = 24;

/// Rows are padded to a multiple of 4 bytes.
fn row_len(width: u32) -> usize {
    (width as usize * 3 + 3) & !3
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16, Error> {
    Ok(u16::from_le_bytes(data[offset..offset + 2].try_into()?))
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32, Error> {
    Ok(u32::from_le_bytes(data[offset..offset + 4].try_into()?))
}

/// Parses a BMP file into a top-to-bottom pixel grid.
pub fn decode_bmp(data: &[u8]) -> Result<PixelGrid, Error> {
    if data.len() < HEADER_LEN {
        return Err(Error::InvalidBitmap("file is shorter than its header"));
    }
    if &data[0..2] != b"BM" {
        return Err(Error::InvalidBitmap("missing BM signature"));
    }

    let data_offset = read_u32(data, 10)? as usize;
    let width = read_u32(data, 18)?;
    // Negative heights mark top-down bitmaps
    let height_raw = read_u32(data, 22)? as i32;
    let height = height_raw.unsigned_abs();
    let top_down = height_raw < 0;
    let bits_per_pixel = read_u16(data, 28)?;
    let compression = read_u32(data, 30)?;
    trace!("bitmap: {width}x{height_raw}, {bits_per_pixel} bpp, compression {compression}");

    if bits_per_pixel != BITS_PER_PIXEL || compression != 0 {
        return Err(Error::UnsupportedBitmap {
            bits_per_pixel,
            compression,
        });
    }
    if width > i32::MAX as u32 {
        return Err(Error::InvalidBitmap("width out of range"));
    }
    if width == 0 {
        return PixelGrid::new(0, height, vec![]);
    }

    let row_len = row_len(width);
    let needed = (height as usize)
        .checked_mul(row_len)
        .and_then(|len| len.checked_add(data_offset))
        .ok_or(Error::InvalidBitmap("pixel data size overflows"))?;
    if needed > data.len() {
        return Err(Error::InvalidBitmap("pixel data is truncated"));
    }

    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for row in 0..height {
        let file_row = if top_down { row } else { height - 1 - row };
        let start = data_offset + file_row as usize * row_len;
        pixels.extend(
            data[start..start + width as usize * 3]
                .chunks_exact(3)
                .map(|bgr| Pixel::new(bgr[2], bgr[1], bgr[0])),
        );
    }

    PixelGrid::new(width, height, pixels)
}

/// Pixel data and total file size of a `width`x`height` bitmap, which
/// must both fit the 32-bit header fields.
fn sizes(width: u32, height: u32) -> Result<(u32, u32), Error> {
    let too_large = || Error::ImageTooLarge { width, height };
    let image_size = row_len(width)
        .checked_mul(height as usize)
        .ok_or_else(too_large)?;
    let image_size = u32::try_from(image_size).map_err(|_| too_large())?;
    let file_size = image_size
        .checked_add(HEADER_LEN as u32)
        .ok_or_else(too_large)?;
    Ok((image_size, file_size))
}

/// Writes `grid` as a bottom-up 24-bit BMP.
pub fn encode_bmp(grid: &PixelGrid) -> Result<Vec<u8>, Error> {
    let (image_size, file_size) = sizes(grid.width(), grid.height())?;
    let row_len = row_len(grid.width());

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend_from_slice(&(HEADER_LEN as u32).to_le_bytes());

    bytes.extend_from_slice(&(INFO_HEADER_LEN as u32).to_le_bytes());
    bytes.extend_from_slice(&grid.width().to_le_bytes());
    bytes.extend_from_slice(&grid.height().to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&BITS_PER_PIXEL.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&image_size.to_le_bytes());
    // Resolution and palette fields
    bytes.extend_from_slice(&[0; 16]);

    let padding = row_len - grid.width() as usize * 3;
    for row in grid.rows().rev() {
        for pixel in row {
            bytes.extend_from_slice(&[pixel.b(), pixel.g(), pixel.r()]);
        }
        bytes.extend(std::iter::repeat(0).take(padding));
    }
    Ok(bytes)
}
