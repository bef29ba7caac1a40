// Helpers for keeping a local archive of downloaded logos, one PNG per domain.
// The archive doubles as the input of `DirectoryImageSource` for offline re-runs.

pub mod image_helper {
    use crate::core_modules::domain::Domain;
    use crate::core_modules::pixel_grid::pixel_grid::PixelGrid;
    use crate::error::Result;
    use image::ImageEncoder;
    use std::path::{Path, PathBuf};

    /// Where the logo of `domain` lives inside `dir`. The file stem is the
    /// percent-encoded domain, so distinct domains never share a file.
    pub fn logo_path(dir: &Path, domain: &Domain) -> PathBuf {
        let file_stem = urlencoding::encode(domain.as_str());
        dir.join(format!("{file_stem}.png"))
    }

    /// Writes the grid as an RGB PNG. Alpha is dropped.
    pub fn save(path: &Path, grid: &PixelGrid) -> Result<()> {
        let rgb = grid.to_rgb();
        let output = std::io::BufWriter::new(std::fs::File::create(path)?);
        let encoder = image::codecs::png::PngEncoder::new(output);

        encoder.write_image(rgb.as_raw(), rgb.width(), rgb.height(), image::ExtendedColorType::Rgb8)?;

        Ok(())
    }

    /// Saves the logo of `domain` into `dir`, creating the directory if needed.
    pub fn archive(dir: &Path, domain: &Domain, grid: &PixelGrid) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = logo_path(dir, domain);
        save(&path, grid)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {

    use super::image_helper::*;
    use crate::core_modules::domain::Domain;
    use crate::core_modules::pixel_grid::pixel_grid::PixelGrid;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("logo_cluster_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn logo_path_is_flat() {
        let dir = std::path::Path::new("logos");
        assert_eq!(logo_path(dir, &Domain::from("example.com")), dir.join("example.com.png"));
        assert_eq!(logo_path(dir, &Domain::from("a/b:c")), dir.join("a%2Fb%3Ac.png"));
    }

    #[test]
    fn distinct_domains_get_distinct_files() {
        let dir = std::path::Path::new("logos");
        let slashed = logo_path(dir, &Domain::from("a/b.com"));
        let underscored = logo_path(dir, &Domain::from("a_b.com"));
        let encoded = logo_path(dir, &Domain::from("a%2Fb.com"));
        assert_ne!(slashed, underscored);
        assert_ne!(slashed, encoded);
        assert_eq!(underscored, dir.join("a_b.com.png"));
    }

    #[test]
    fn archive_round_trips_through_disk() {
        let dir = scratch_dir("archive");
        let width = 40u32;
        let height = 20u32;
        let mut buffer = vec![255u8; (width * height * 4) as usize];
        let mut intensity = 0u8;
        for i in buffer.chunks_mut(4) {
            i[0] = intensity;
            i[1] = intensity;
            i[2] = intensity;
            intensity = intensity.wrapping_add(7);
        }
        let grid = PixelGrid::from_rgba(width, height, buffer).expect("valid buffer");

        let path = archive(&dir, &Domain::from("gradient.io"), &grid).expect("Error Saving File.");
        let loaded = PixelGrid::open(&path).expect("Error Loading File.");

        assert_eq!((loaded.width(), loaded.height()), (width, height));
        assert_eq!(loaded.to_rgb(), grid.to_rgb());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
