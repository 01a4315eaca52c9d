use std::io::Cursor;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};

use business::domain::errors::StorageError;
use business::domain::product::services::{CompressionOptions, ImageCompressor};
use business::domain::product::value_objects::ImageFile;

/// JPEG qualities tried in order until the encoded image fits the budget.
const JPEG_QUALITY_STEPS: &[u8] = &[85, 75, 65, 55, 45, 35];
/// Smallest longest-side the compressor shrinks to before giving up.
const MIN_DIMENSION: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl Format {
    fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            return Some(Format::WebP);
        }
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Format::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Format::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Format::Gif)
        } else {
            None
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            Format::Jpeg => "image/jpeg",
            Format::Png => "image/png",
            Format::Gif => "image/gif",
            Format::WebP => "image/webp",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Format::Jpeg => "jpg",
            Format::Png => "png",
            Format::Gif => "gif",
            Format::WebP => "webp",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Format::Jpeg => ImageFormat::Jpeg,
            Format::Png => ImageFormat::Png,
            Format::Gif => ImageFormat::Gif,
            Format::WebP => ImageFormat::WebP,
        }
    }
}

/// Shrinks product photos to fit the upload bounds.
///
/// Images already within both bounds are uploaded as they are. Others are
/// scaled down so their longest side fits `max_dimension`, then re-encoded:
/// as PNG when they carry transparency and that fits, otherwise as JPEG with
/// decreasing quality, halving the size again while nothing fits.
pub struct RasterImageCompressor;

#[async_trait]
impl ImageCompressor for RasterImageCompressor {
    async fn compress(
        &self,
        image: ImageFile,
        options: &CompressionOptions,
    ) -> Result<ImageFile, StorageError> {
        if !image.content_type.starts_with("image/") {
            return Err(StorageError::UnsupportedImage);
        }
        let format = Format::sniff(&image.bytes).ok_or(StorageError::UnsupportedImage)?;
        let options = options.clone();

        tokio::task::spawn_blocking(move || shrink(image, format, &options))
            .await
            .map_err(|_| StorageError::UploadFailed)?
    }
}

fn shrink(
    image: ImageFile,
    format: Format,
    options: &CompressionOptions,
) -> Result<ImageFile, StorageError> {
    let (width, height) = ImageReader::with_format(Cursor::new(&image.bytes), format.image_format())
        .into_dimensions()
        .map_err(|_| StorageError::UnsupportedImage)?;
    if width.max(height) <= options.max_dimension && image.size() <= options.max_size_bytes {
        return Ok(ImageFile {
            content_type: format.content_type().to_string(),
            ..image
        });
    }

    let decoded = image::load_from_memory_with_format(&image.bytes, format.image_format())
        .map_err(|_| StorageError::UnsupportedImage)?;

    let mut bound = options.max_dimension.max(1);
    loop {
        let scaled = fit_within(&decoded, bound);
        if let Some((bytes, output)) = encode_within(&scaled, options.max_size_bytes) {
            return Ok(ImageFile {
                file_name: with_extension(&image.file_name, output.extension()),
                content_type: output.content_type().to_string(),
                bytes,
            });
        }
        if bound <= MIN_DIMENSION {
            return Err(StorageError::ImageTooLarge);
        }
        bound = (bound / 2).max(MIN_DIMENSION);
    }
}

fn fit_within(image: &DynamicImage, bound: u32) -> DynamicImage {
    if image.width().max(image.height()) <= bound {
        image.clone()
    } else {
        image.resize(bound, bound, FilterType::Triangle)
    }
}

fn encode_within(image: &DynamicImage, max_size_bytes: usize) -> Option<(Vec<u8>, Format)> {
    if image.color().has_alpha()
        && let Some(bytes) = encode_png(image).filter(|b| b.len() <= max_size_bytes)
    {
        return Some((bytes, Format::Png));
    }

    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    JPEG_QUALITY_STEPS
        .iter()
        .filter_map(|quality| encode_jpeg(&rgb, *quality))
        .find(|bytes| bytes.len() <= max_size_bytes)
        .map(|bytes| (bytes, Format::Jpeg))
}

fn encode_png(image: &DynamicImage) -> Option<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_with_encoder(PngEncoder::new(&mut bytes)).ok()?;
    Some(bytes)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Option<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))
        .ok()?;
    Some(bytes)
}

fn with_extension(file_name: &str, extension: &str) -> String {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    };
    format!("{stem}.{extension}")
}
