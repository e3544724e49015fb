//! Lossless RGB image codec producing [QOI](https://qoiformat.org) streams.
//!
//! [`encode`] and [`decode`] work on the bare opcode stream; [`encode_image`]
//! and [`decode_image`] add the QOI file header and end marker. The [`bmp`]
//! module reads and writes 24-bit bitmaps to feed the codec.

pub mod bmp;
pub mod cache;
pub mod codec;
pub mod container;
pub mod error;
pub mod pixel;

pub use cache::{hash, ColorCache};
pub use codec::{decode, encode, encode_pixels, percent_of_raw, MAX_RUN};
pub use container::{
    decode_image, encode_image, read_image, write_image, Colorspace, Header, QoiImage,
};
pub use error::Error;
pub use pixel::{Delta, Pixel, PixelGrid, CHANNELS};
