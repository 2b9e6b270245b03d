use std::path::Path;

use giftbox_common::AssetId;

use crate::{AssetError, content_id};

/// A decoded image, tightly packed RGBA8 rows from the top.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub id: AssetId,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Texture {
    /// RGBA of the texel at `(x, y)`, if inside the image.
    pub fn texel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        self.rgba.get(i..i + 4).map(|t| [t[0], t[1], t[2], t[3]])
    }
}

/// Decode a PNG or JPEG file synchronously.
pub fn import_texture(path: impl AsRef<Path>) -> Result<Texture, AssetError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let id = content_id(&bytes);
    let image = image::load_from_memory(&bytes)?.to_rgba8();
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(AssetError::Empty(path.display().to_string()));
    }

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("texture")
        .to_string();
    tracing::info!(texture = %name, width, height, "decoded texture");
    Ok(Texture {
        id,
        name,
        width,
        height,
        rgba: image.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[test]
    fn decodes_png() {
        let file = write_png(3, 2, [200, 10, 20, 255]);
        let texture = import_texture(file.path()).unwrap();
        assert_eq!((texture.width, texture.height), (3, 2));
        assert_eq!(texture.rgba.len(), 3 * 2 * 4);
        assert_eq!(texture.texel(2, 1), Some([200, 10, 20, 255]));
        assert_eq!(texture.texel(3, 0), None);
    }

    #[test]
    fn same_pixels_same_id() {
        let a = import_texture(write_png(2, 2, [1, 2, 3, 255]).path()).unwrap();
        let b = import_texture(write_png(2, 2, [1, 2, 3, 255]).path()).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn garbage_is_image_error() {
        let file = write_temp("definitely not a jpeg");
        assert!(matches!(
            import_texture(file.path()),
            Err(AssetError::Image(_))
        ));
    }

    #[test]
    fn missing_texture_is_io_error() {
        assert!(matches!(
            import_texture("/definitely/not/here.jpg"),
            Err(AssetError::Io(_))
        ));
    }
}
