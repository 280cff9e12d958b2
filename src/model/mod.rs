//! Data model for the restoration pipeline.
//!
//! These types form the intermediate representation shared between the
//! acquisition stages (extraction or rasterization), the line-removal
//! filter, and the assembler. Images always stay RGB with 8 bits per
//! channel and never change dimensions while moving through the pipeline.

mod image;
mod info;
mod mask;
mod page;

pub use self::image::RasterImage;
pub use info::DocumentInfo;
pub use mask::BinaryMask;
pub use page::Page;
