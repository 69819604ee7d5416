use anyhow::{Context, Result};
use image::RgbImage;
use image::imageops::FilterType;
use indicatif::ProgressStyle;

/// 解码一张图片为 RGB 像素
///
/// 长边超过 max_size 时等比缩放，嵌入模型的输入远小于原图，
/// 没有必要传输完整尺寸
pub fn decode_rgb(data: &[u8], max_size: u32) -> Result<RgbImage> {
    let image = image::load_from_memory(data).context("无法解码图片")?;
    let (w, h) = (image.width(), image.height());
    let image = if w > max_size || h > max_size {
        image.resize(max_size, max_size, FilterType::Triangle)
    } else {
        image
    };
    Ok(image.to_rgb8())
}

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    )
    .expect("failed to build progress style")
    .progress_chars("=>-")
}

pub fn pb_style_speed() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {pos} ({per_sec}) {msg}",
    )
    .expect("failed to build progress style")
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::ImageFormat;

    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        let mut buf = Vec::new();
        image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn test_decode_rgb() {
        let image = decode_rgb(&png_bytes(8, 4), 1024).unwrap();
        assert_eq!((image.width(), image.height()), (8, 4));
        assert_eq!(image.get_pixel(0, 0), &image::Rgb([10, 20, 30]));
    }

    #[test]
    fn test_decode_rgb_resizes_large_image() {
        let image = decode_rgb(&png_bytes(64, 32), 16).unwrap();
        assert_eq!((image.width(), image.height()), (16, 8));
    }

    #[test]
    fn test_decode_rgb_invalid_bytes() {
        assert!(decode_rgb(b"not an image", 1024).is_err());
    }
}
