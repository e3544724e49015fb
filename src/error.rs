use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("The opcode stream ended inside an opcode starting at byte {offset}")]
    TruncatedStream { offset: usize },

    #[error("The index opcode at byte {offset} references empty cache slot {index}")]
    IndexNotPresent { index: u8, offset: usize },

    #[error("{remaining} bytes remain after the last expected pixel")]
    UnexpectedTrailingData { remaining: usize },

    #[error("A run of {run} pixels at byte {offset} exceeds the {remaining} pixels left in the image")]
    RunOverflow {
        run: usize,
        remaining: usize,
        offset: usize,
    },

    #[error("Opcode {opcode:#04x} at byte {offset} is not supported")]
    UnsupportedOpcode { opcode: u8, offset: usize },

    #[error("The QOI decoder does not support decoding the format with magic bytes {0}")]
    InvalidMagicBytes(String),

    #[error("The image header is invalid")]
    InvalidHeader,

    #[error("The image end is invalid")]
    InvalidEnd,

    #[error("Images with {0} channels are not supported")]
    UnsupportedChannels(u8),

    #[error("Unknown colorspace {0}")]
    UnsupportedColorspace(u8),

    #[error("An image of {width}x{height} pixels is too large")]
    ImageTooLarge { width: u32, height: u32 },

    #[error("A {width}x{height} image cannot hold {pixels} pixels")]
    DimensionMismatch {
        width: u32,
        height: u32,
        pixels: usize,
    },

    #[error("The bitmap is invalid: {0}")]
    InvalidBitmap(&'static str),

    #[error("Bitmaps with {bits_per_pixel} bits per pixel and compression {compression} are not supported")]
    UnsupportedBitmap { bits_per_pixel: u16, compression: u32 },

    #[error("Could not read or write image bytes")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SliceParse(#[from] std::array::TryFromSliceError),
}
