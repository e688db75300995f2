use eframe::wgpu::{
    Device, Extent3d, Queue, TexelCopyBufferLayout, Texture, TextureDescriptor, TextureDimension,
    TextureFormat, TextureUsages,
};
use image::{GenericImageView, RgbaImage};

use crate::utils::ShaderError;

/// Fetch an image from an http(s) URL, a `file://` URL or a local path and
/// decode it to RGBA8.
pub fn fetch_image(url: &str) -> Result<RgbaImage, ShaderError> {
    log::info!("[Resources] Loading image from: {}", url);

    let img = if url.starts_with("http://") || url.starts_with("https://") {
        let bytes = reqwest::blocking::get(url)
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.bytes())
            .map_err(|e| {
                ShaderError::resource(format!("Failed to load & decode image from URL: {} ({})", url, e))
            })?;
        image::load_from_memory(&bytes)
    } else {
        image::open(url.strip_prefix("file://").unwrap_or(url))
    }
    .map_err(|e| ShaderError::resource(format!("Failed to load & decode image from URL: {} ({})", url, e)))?;

    let dimensions = img.dimensions();
    log::info!("[Resources] Image loaded: {}x{} pixels", dimensions.0, dimensions.1);
    Ok(img.to_rgba8())
}

/// Upload decoded pixels into a new `rgba8unorm` sampled texture.
pub fn create_image_texture(device: &Device, queue: &Queue, label: &str, rgba: &RgbaImage) -> Texture {
    let (width, height) = rgba.dimensions();
    let texture_size = Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let texture = device.create_texture(&TextureDescriptor {
        label: Some(label),
        size: texture_size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: TextureFormat::Rgba8Unorm,
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST | TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    queue.write_texture(
        texture.as_image_copy(),
        rgba.as_raw(),
        TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        texture_size,
    );

    texture
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_names_url() {
        let err = fetch_image("definitely/not/here.png").unwrap_err();
        match err {
            ShaderError::Resource(msg) => assert!(msg.contains("definitely/not/here.png")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_file_url_loads_local_image() {
        let path = std::env::temp_dir().join(format!("playground_file_url_{}.png", std::process::id()));
        RgbaImage::from_pixel(3, 2, image::Rgba([255, 0, 0, 255])).save(&path).unwrap();

        let url = format!("file://{}", path.display());
        let loaded = fetch_image(&url);
        let _ = std::fs::remove_file(&path);

        let loaded = loaded.unwrap();
        assert_eq!(loaded.dimensions(), (3, 2));
        assert_eq!(loaded.get_pixel(0, 0), &image::Rgba([255, 0, 0, 255]));
    }
}
