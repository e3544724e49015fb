use std::io::{Read, Write};

use log::trace;

use crate::codec;
use crate::error::Error;
use crate::pixel::{PixelGrid, CHANNELS};

pub const MAGIC: [u8; 4] = *b"qoif";
pub const HEADER_LEN: usize = 14;
pub const END: [u8; 8] = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01];

/// Largest width*height accepted from a header.
pub const MAX_PIXELS: u64 = 400_000_000;

/// Colorspace tag stored in the header. It does not affect how pixels are
/// encoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Colorspace {
    /// sRGB with linear alpha
    #[default]
    Srgb = 0,
    /// All channels linear
    Linear = 1,
}

impl TryFrom<u8> for Colorspace {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Colorspace::Srgb),
            1 => Ok(Colorspace::Linear),
            other => Err(Error::UnsupportedColorspace(other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub width: u32,
    pub height: u32,
    pub colorspace: Colorspace,
}

impl Header {
    pub fn new(width: u32, height: u32, colorspace: Colorspace) -> Self {
        Self {
            width,
            height,
            colorspace,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut bytes = [0; HEADER_LEN];
        bytes[0..4].copy_from_slice(&MAGIC);
        bytes[4..8].copy_from_slice(&self.width.to_be_bytes());
        bytes[8..12].copy_from_slice(&self.height.to_be_bytes());
        bytes[12] = CHANNELS;
        bytes[13] = self.colorspace as u8;
        bytes
    }
}

impl TryFrom<&[u8; HEADER_LEN]> for Header {
    type Error = Error;

    fn try_from(bytes: &[u8; HEADER_LEN]) -> Result<Self, Self::Error> {
        if bytes[0..4] != MAGIC {
            let magic = String::from_utf8_lossy(&bytes[0..4]);
            return Err(Error::InvalidMagicBytes(magic.into_owned()));
        }
        let width = u32::from_be_bytes(bytes[4..8].try_into()?);
        let height = u32::from_be_bytes(bytes[8..12].try_into()?);
        let channels = bytes[12];
        let colorspace = Colorspace::try_from(bytes[13])?;
        trace!("header: {width}x{height}, {channels} channels, {colorspace:?}");

        if channels != CHANNELS {
            return Err(Error::UnsupportedChannels(channels));
        }
        if width as u64 * height as u64 > MAX_PIXELS {
            return Err(Error::ImageTooLarge { width, height });
        }

        Ok(Self {
            width,
            height,
            colorspace,
        })
    }
}

/// A decoded QOI file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QoiImage {
    pub grid: PixelGrid,
    pub colorspace: Colorspace,
}

/// Frames the opcode stream of `grid` as a complete QOI file.
pub fn encode_image(grid: &PixelGrid, colorspace: Colorspace) -> Vec<u8> {
    let header = Header::new(grid.width(), grid.height(), colorspace);
    let encoded_data = codec::encode(grid);

    let mut bytes = Vec::with_capacity(HEADER_LEN + encoded_data.len() + END.len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(&encoded_data);
    bytes.extend_from_slice(&END);
    bytes
}

pub fn decode_image(bytes: &[u8]) -> Result<QoiImage, Error> {
    if bytes.len() < HEADER_LEN + END.len() {
        return Err(Error::InvalidHeader);
    }

    let header = Header::try_from(&bytes[0..HEADER_LEN].try_into()?)?;
    let (data, end) = bytes[HEADER_LEN..].split_at(bytes.len() - HEADER_LEN - END.len());
    if end != END {
        return Err(Error::InvalidEnd);
    }

    let pixels = codec::decode(data, header.pixel_count())?;
    Ok(QoiImage {
        grid: PixelGrid::new(header.width, header.height, pixels)?,
        colorspace: header.colorspace,
    })
}

pub fn read_image<R: Read>(mut reader: R) -> Result<QoiImage, Error> {
    let mut bytes = vec![];
    reader.read_to_end(&mut bytes)?;
    decode_image(&bytes)
}

pub fn write_image<W: Write>(
    mut writer: W,
    grid: &PixelGrid,
    colorspace: Colorspace,
) -> Result<(), Error> {
    writer.write_all(&encode_image(grid, colorspace))?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{decode_image, encode_image, read_image, write_image, Colorspace, Header, END};
    use crate::error::Error;
    use crate::pixel::{Pixel, PixelGrid};
    use proptest::prelude::*;

    fn grid() -> PixelGrid {
        let pixels = (0..12u8)
            .map(|i| Pixel::new(i * 20, 255 - i * 3, i % 4))
            .collect();
        PixelGrid::new(4, 3, pixels).unwrap()
    }

    #[test]
    fn test_header_is_big_endian() {
        let bytes = encode_image(&grid(), Colorspace::Linear);
        assert_eq!(
            &bytes[0..14],
            &[b'q', b'o', b'i', b'f', 0, 0, 0, 4, 0, 0, 0, 3, 3, 1]
        );
        assert_eq!(&bytes[bytes.len() - 8..], &END);
    }

    #[test]
    fn test_header_round_trip() {
        let header = Header::new(0x0102_0304, 7, Colorspace::Srgb);
        assert_eq!(Header::try_from(&header.to_bytes()).unwrap(), header);
    }

    #[test_log::test]
    fn test_image_round_trip() {
        let bytes = encode_image(&grid(), Colorspace::Linear);
        let image = decode_image(&bytes).unwrap();
        assert_eq!(image.grid, grid());
        assert_eq!(image.colorspace, Colorspace::Linear);
    }

    #[test]
    fn test_io_round_trip() {
        let mut file = vec![];
        write_image(&mut file, &grid(), Colorspace::Srgb).unwrap();
        let image = read_image(file.as_slice()).unwrap();
        assert_eq!(image.grid, grid());
    }

    #[test]
    fn test_invalid_magic() {
        let mut bytes = encode_image(&grid(), Colorspace::Srgb);
        bytes[0..4].copy_from_slice(b"qoix");
        assert!(matches!(
            decode_image(&bytes),
            Err(Error::InvalidMagicBytes(magic)) if magic == "qoix"
        ));
    }

    #[test]
    fn test_non_utf8_magic() {
        let mut bytes = encode_image(&grid(), Colorspace::Srgb);
        bytes[0..4].copy_from_slice(&[0xff, b'o', b'i', b'f']);
        assert!(matches!(
            decode_image(&bytes),
            Err(Error::InvalidMagicBytes(magic)) if magic == "\u{fffd}oif"
        ));
    }

    #[test]
    fn test_unsupported_channels() {
        let mut bytes = encode_image(&grid(), Colorspace::Srgb);
        bytes[12] = 4;
        assert!(matches!(
            decode_image(&bytes),
            Err(Error::UnsupportedChannels(4))
        ));
    }

    #[test]
    fn test_unsupported_colorspace() {
        let mut bytes = encode_image(&grid(), Colorspace::Srgb);
        bytes[13] = 2;
        assert!(matches!(
            decode_image(&bytes),
            Err(Error::UnsupportedColorspace(2))
        ));
    }

    #[test]
    fn test_too_large() {
        let mut bytes = encode_image(&grid(), Colorspace::Srgb);
        bytes[4..8].copy_from_slice(&100_000u32.to_be_bytes());
        bytes[8..12].copy_from_slice(&100_000u32.to_be_bytes());
        assert!(matches!(
            decode_image(&bytes),
            Err(Error::ImageTooLarge {
                width: 100_000,
                height: 100_000
            })
        ));
    }

    #[test]
    fn test_invalid_end() {
        let mut bytes = encode_image(&grid(), Colorspace::Srgb);
        let last = bytes.len() - 1;
        bytes[last] = 2;
        assert!(matches!(decode_image(&bytes), Err(Error::InvalidEnd)));
    }

    #[test]
    fn test_too_short() {
        assert!(matches!(
            decode_image(b"qoif\0\0"),
            Err(Error::InvalidHeader)
        ));
    }

    #[test]
    fn test_truncated_data() {
        let bytes = encode_image(&grid(), Colorspace::Srgb);
        let mut cut = bytes[..bytes.len() - 9].to_vec();
        cut.extend_from_slice(&END);
        assert!(matches!(
            decode_image(&cut),
            Err(Error::TruncatedStream { .. })
        ));
    }

    proptest! {
        #[test]
        fn test_decode_arbitrary_file(
            width in 0u32..64,
            height in 0u32..64,
            data in prop::collection::vec(any::<u8>(), 0..512),
            end in prop::option::of(Just(END)),
        ) {
            let mut bytes = Header::new(width, height, Colorspace::Srgb).to_bytes().to_vec();
            bytes.extend_from_slice(&data);
            if let Some(end) = end {
                bytes.extend_from_slice(&end);
            }
            if let Ok(image) = decode_image(&bytes) {
                prop_assert_eq!(image.grid.width(), width);
                prop_assert_eq!(image.grid.height(), height);
            }
        }

        #[test]
        fn test_decode_arbitrary_bytes(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            prop_assert!(decode_image(&bytes).is_err());
        }
    }
}
