//! Legacy pixel-format conversion for texture uploads.
//!
//! The legacy API accepts format/type pairs the modern backend has no
//! equivalent for; those are rewritten on the CPU into a supported
//! `wgpu::TextureFormat`. Pass-through cases borrow the caller's data.

use std::borrow::Cow;

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba,
    Bgra,
    Luminance,
    LuminanceAlpha,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelType {
    U8,
    /// Packed 16-bit, red in the top five bits, one alpha bit at the bottom.
    U16_1555,
    /// Packed 32-bit with the first component in the least significant byte.
    U32_8888Rev,
}

/// Upload-ready pixel data.
#[derive(Debug)]
pub struct ConvertedPixels<'a> {
    pub data: Cow<'a, [u8]>,
    pub format: wgpu::TextureFormat,
    pub bytes_per_pixel: u32,
}

#[derive(Debug, Error)]
pub enum PixelError {
    #[error("unsupported pixel format/type combination {format:?}/{ty:?}")]
    Unsupported { format: PixelFormat, ty: PixelType },
}

/// Five-bit channel widened to eight bits with the low bits refilled from the
/// top, so 31 maps to exactly 255.
fn expand5(v: u16) -> u8 {
    ((v << 3) | (v >> 2)) as u8
}

/// Converts `data` into a format the backend can upload directly.
///
/// Luminance maps to `R8Unorm` and luminance-alpha to `Rg8Unorm`; samplers of
/// those textures see the value in the red (and green) channel only.
pub fn convert_pixels(
    format: PixelFormat,
    ty: PixelType,
    data: &[u8],
) -> Result<ConvertedPixels<'_>, PixelError> {
    match (format, ty) {
        (PixelFormat::Rgba, PixelType::U8) => Ok(ConvertedPixels {
            data: Cow::Borrowed(data),
            format: wgpu::TextureFormat::Rgba8Unorm,
            bytes_per_pixel: 4,
        }),
        (PixelFormat::Rgba, PixelType::U32_8888Rev) => {
            // Legacy big-endian assets packed these as [A, B, G, R] in
            // memory, so each pixel's bytes reverse into RGBA order.
            let mut out = Vec::with_capacity(data.len());
            for raw in data.chunks_exact(4) {
                out.extend_from_slice(&[raw[3], raw[2], raw[1], raw[0]]);
            }
            Ok(ConvertedPixels {
                data: Cow::Owned(out),
                format: wgpu::TextureFormat::Rgba8Unorm,
                bytes_per_pixel: 4,
            })
        }
        (PixelFormat::Luminance, PixelType::U8) => Ok(ConvertedPixels {
            data: Cow::Borrowed(data),
            format: wgpu::TextureFormat::R8Unorm,
            bytes_per_pixel: 1,
        }),
        (PixelFormat::LuminanceAlpha, PixelType::U8) => Ok(ConvertedPixels {
            data: Cow::Borrowed(data),
            format: wgpu::TextureFormat::Rg8Unorm,
            bytes_per_pixel: 2,
        }),
        (PixelFormat::Bgra, PixelType::U8) => {
            let mut out = Vec::with_capacity(data.len());
            for px in data.chunks_exact(4) {
                out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
            }
            Ok(ConvertedPixels {
                data: Cow::Owned(out),
                format: wgpu::TextureFormat::Rgba8Unorm,
                bytes_per_pixel: 4,
            })
        }
        (PixelFormat::Bgra, PixelType::U32_8888Rev) => {
            // First-listed component in the least significant byte, so the
            // little-endian byte order is B, G, R, A.
            let mut out = Vec::with_capacity(data.len());
            for raw in data.chunks_exact(4) {
                let px = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
                out.extend_from_slice(&[
                    ((px >> 16) & 0xFF) as u8,
                    ((px >> 8) & 0xFF) as u8,
                    (px & 0xFF) as u8,
                    (px >> 24) as u8,
                ]);
            }
            Ok(ConvertedPixels {
                data: Cow::Owned(out),
                format: wgpu::TextureFormat::Rgba8Unorm,
                bytes_per_pixel: 4,
            })
        }
        (PixelFormat::Rgba, PixelType::U16_1555) => {
            let mut out = Vec::with_capacity(data.len() * 2);
            for raw in data.chunks_exact(2) {
                let px = u16::from_le_bytes([raw[0], raw[1]]);
                out.extend_from_slice(&[
                    expand5((px >> 11) & 0x1F),
                    expand5((px >> 6) & 0x1F),
                    expand5((px >> 1) & 0x1F),
                    if px & 1 != 0 { 255 } else { 0 },
                ]);
            }
            Ok(ConvertedPixels {
                data: Cow::Owned(out),
                format: wgpu::TextureFormat::Rgba8Unorm,
                bytes_per_pixel: 4,
            })
        }
        (format, ty) => Err(PixelError::Unsupported { format, ty }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_u8_borrows() {
        let data = [1u8, 2, 3, 4];
        let out = convert_pixels(PixelFormat::Rgba, PixelType::U8, &data).unwrap();
        assert!(matches!(out.data, Cow::Borrowed(_)));
        assert_eq!(out.format, wgpu::TextureFormat::Rgba8Unorm);
    }

    #[test]
    fn packed_8888_reversed_reverses_bytes() {
        let data = [0x44u8, 0x33, 0x22, 0x11];
        let out = convert_pixels(PixelFormat::Rgba, PixelType::U32_8888Rev, &data).unwrap();
        assert_eq!(&*out.data, &[0x11, 0x22, 0x33, 0x44]);
        assert_eq!(out.format, wgpu::TextureFormat::Rgba8Unorm);
    }

    #[test]
    fn bgra_reorders_to_rgba() {
        let data = [10u8, 20, 30, 40];
        let out = convert_pixels(PixelFormat::Bgra, PixelType::U8, &data).unwrap();
        assert_eq!(&*out.data, &[30, 20, 10, 40]);
    }

    #[test]
    fn packed_1555_expands_exactly() {
        let white = 0xFFFFu16.to_le_bytes();
        let out = convert_pixels(PixelFormat::Rgba, PixelType::U16_1555, &white).unwrap();
        assert_eq!(&*out.data, &[255, 255, 255, 255]);

        let transparent_black = 0x0000u16.to_le_bytes();
        let out =
            convert_pixels(PixelFormat::Rgba, PixelType::U16_1555, &transparent_black).unwrap();
        assert_eq!(&*out.data, &[0, 0, 0, 0]);

        // Red-only: five high bits set, alpha bit clear.
        let red = 0xF800u16.to_le_bytes();
        let out = convert_pixels(PixelFormat::Rgba, PixelType::U16_1555, &red).unwrap();
        assert_eq!(&*out.data, &[255, 0, 0, 0]);
    }

    #[test]
    fn expand5_endpoints() {
        assert_eq!(expand5(0), 0);
        assert_eq!(expand5(31), 255);
        assert_eq!(expand5(16), 0x84);
    }

    #[test]
    fn luminance_maps_to_single_channel() {
        let data = [128u8, 64];
        let out = convert_pixels(PixelFormat::Luminance, PixelType::U8, &data).unwrap();
        assert_eq!(out.format, wgpu::TextureFormat::R8Unorm);
        assert_eq!(out.bytes_per_pixel, 1);
    }

    #[test]
    fn unsupported_combination_errors() {
        assert!(matches!(
            convert_pixels(PixelFormat::Luminance, PixelType::U16_1555, &[]),
            Err(PixelError::Unsupported { .. })
        ));
    }
}
