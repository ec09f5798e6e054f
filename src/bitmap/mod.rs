use image::{ColorType, DynamicImage};

use crate::error::ImageError;

/// Pixel layout of an image buffer handed to the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Lum,
    LumA,
    Rgb,
    Bgr,
    Rgba,
    Argb,
    Bgra,
    Abgr,
}

impl ImageFormat {
    /// Bytes per pixel
    pub fn pixel_size(self) -> usize {
        match self {
            ImageFormat::Lum => 1,
            ImageFormat::LumA => 2,
            ImageFormat::Rgb | ImageFormat::Bgr => 3,
            ImageFormat::Rgba | ImageFormat::Argb | ImageFormat::Bgra | ImageFormat::Abgr => 4,
        }
    }

    /// Map photo-block channel offsets `[r, g, b, a]` to a format.
    ///
    /// A negative alpha offset means "no alpha channel".
    pub fn from_channel_offsets(offsets: [i32; 4]) -> Result<Self, ImageError> {
        let [r, g, b, a] = offsets;
        let format = match (r, g, b, a) {
            (0, 0, 0, a) if a < 0 => ImageFormat::Lum,
            (0, 0, 0, 1) => ImageFormat::LumA,
            (0, 1, 2, a) if a < 0 => ImageFormat::Rgb,
            (2, 1, 0, a) if a < 0 => ImageFormat::Bgr,
            (0, 1, 2, 3) => ImageFormat::Rgba,
            (1, 2, 3, 0) => ImageFormat::Argb,
            (2, 1, 0, 3) => ImageFormat::Bgra,
            (3, 2, 1, 0) => ImageFormat::Abgr,
            _ => return Err(ImageError::UnsupportedLayout(r, g, b, a)),
        };
        Ok(format)
    }

    /// Byte offsets of the red, green, blue and alpha channels within a pixel.
    fn channel_offsets(self) -> (usize, usize, usize, Option<usize>) {
        match self {
            ImageFormat::Lum => (0, 0, 0, None),
            ImageFormat::LumA => (0, 0, 0, Some(1)),
            ImageFormat::Rgb => (0, 1, 2, None),
            ImageFormat::Bgr => (2, 1, 0, None),
            ImageFormat::Rgba => (0, 1, 2, Some(3)),
            ImageFormat::Argb => (1, 2, 3, Some(0)),
            ImageFormat::Bgra => (2, 1, 0, Some(3)),
            ImageFormat::Abgr => (3, 2, 1, Some(0)),
        }
    }
}

/// An owned image, moved into a decode job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    format: ImageFormat,
    row_stride: usize,
    pixel_stride: usize,
    data: Vec<u8>,
}

impl ImageBuffer {
    /// Create an image from explicit layout parameters.
    ///
    /// A `row_stride` or `pixel_stride` of 0 means tightly packed.
    pub fn new(
        width: u32,
        height: u32,
        format: ImageFormat,
        row_stride: usize,
        pixel_stride: usize,
        data: Vec<u8>,
    ) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidSize);
        }

        let pixel_stride = if pixel_stride == 0 {
            format.pixel_size()
        } else {
            pixel_stride
        };
        if pixel_stride < format.pixel_size() {
            return Err(ImageError::Malformed);
        }

        let row_bytes = (width as usize)
            .checked_mul(pixel_stride)
            .ok_or(ImageError::InvalidSize)?;
        let row_stride = if row_stride == 0 { row_bytes } else { row_stride };
        if row_stride < row_bytes {
            return Err(ImageError::Malformed);
        }

        let required = (height as usize - 1)
            .checked_mul(row_stride)
            .and_then(|rows| rows.checked_add(row_bytes))
            .ok_or(ImageError::InvalidSize)?;
        if data.len() < required {
            return Err(ImageError::Malformed);
        }

        Ok(Self {
            width,
            height,
            format,
            row_stride,
            pixel_stride,
            data,
        })
    }

    /// Build an image from the `{width height bpp bytes}` form.
    ///
    /// Only 1 (grey) and 3 (RGB) bytes per pixel are accepted.
    pub fn from_raw(width: i64, height: i64, bpp: i64, data: Vec<u8>) -> Result<Self, ImageError> {
        let format = match bpp {
            1 => ImageFormat::Lum,
            3 => ImageFormat::Rgb,
            _ => return Err(ImageError::UnsupportedDepth),
        };

        if width <= 0 || height <= 0 || width > u32::MAX as i64 || height > u32::MAX as i64 {
            return Err(ImageError::InvalidSize);
        }

        let size = width.checked_mul(height).ok_or(ImageError::InvalidSize)?;
        if (data.len() as u64) < size as u64 {
            return Err(ImageError::Malformed);
        }

        Self::new(width as u32, height as u32, format, 0, 0, data)
    }

    /// Convert a decoded image file into a buffer, keeping grey images grey.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self, ImageError> {
        let (width, height) = (image.width(), image.height());
        let color = image.color();

        let (format, data) = if color.has_color() {
            if color.has_alpha() {
                (ImageFormat::Rgba, image.into_rgba8().into_raw())
            } else {
                (ImageFormat::Rgb, image.into_rgb8().into_raw())
            }
        } else if color.has_alpha() {
            (ImageFormat::LumA, image.into_luma_alpha8().into_raw())
        } else {
            (ImageFormat::Lum, image.into_luma8().into_raw())
        };

        Self::new(width, height, format, 0, 0, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    pub fn pixel_stride(&self) -> usize {
        self.pixel_stride
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Re-pack into a tight buffer in one of the layouts image encoders accept.
    ///
    /// Grey stays grey; colour formats are reordered to RGB(A).
    pub fn to_packed(&self) -> (Vec<u8>, ColorType) {
        let (r, g, b, a) = self.format.channel_offsets();
        let color_type = match self.format {
            ImageFormat::Lum => ColorType::L8,
            ImageFormat::LumA => ColorType::La8,
            ImageFormat::Rgb | ImageFormat::Bgr => ColorType::Rgb8,
            _ => ColorType::Rgba8,
        };

        let channels = color_type.channel_count() as usize;
        let mut packed = Vec::with_capacity(self.width as usize * self.height as usize * channels);

        for y in 0..self.height as usize {
            let row = &self.data[y * self.row_stride..];
            for x in 0..self.width as usize {
                let pixel = &row[x * self.pixel_stride..];
                match color_type {
                    ColorType::L8 => packed.push(pixel[r]),
                    ColorType::La8 => {
                        packed.push(pixel[r]);
                        packed.push(a.map(|a| pixel[a]).unwrap_or(u8::MAX));
                    }
                    ColorType::Rgb8 => packed.extend_from_slice(&[pixel[r], pixel[g], pixel[b]]),
                    _ => packed.extend_from_slice(&[
                        pixel[r],
                        pixel[g],
                        pixel[b],
                        a.map(|a| pixel[a]).unwrap_or(u8::MAX),
                    ]),
                }
            }
        }

        (packed, color_type)
    }
}
