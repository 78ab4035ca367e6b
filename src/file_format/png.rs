use std::{fs::File, io::BufReader, path::Path};

use image::{
    ColorType, DynamicImage, ImageBuffer, ImageDecoder, ImageFormat, Luma, codecs::png::PngDecoder,
};
use tracing::{debug, warn};

use super::{FileInfo, HeightmapFileFormat, WeightmapFileFormat};
use crate::{
    datatypes::{FileResolution, Grid, HeightGrid, HeightSample, WeightGrid, WeightSample},
    error::{ImportErr, TerrafieldError},
};

/// 16-bit grayscale PNG heightmaps. Other PNG layouts are converted.
#[derive(Clone, Copy, Debug, Default)]
pub struct PngHeightmapFormat;

/// 8-bit grayscale PNG weightmaps. Other PNG layouts are converted.
#[derive(Clone, Copy, Debug, Default)]
pub struct PngWeightmapFormat;

fn probe(path: &Path) -> Result<(FileResolution, ColorType), TerrafieldError> {
    let decoder = PngDecoder::new(BufReader::new(File::open(path)?))?;
    let (width, height) = decoder.dimensions();
    Ok((FileResolution::new(width, height), decoder.color_type()))
}

fn open_checked(path: &Path, expected: FileResolution) -> Result<DynamicImage, TerrafieldError> {
    let image = image::open(path)?;
    let actual = FileResolution::new(image.width(), image.height());
    if actual != expected {
        return Err(ImportErr::ResolutionMismatch { expected, actual }.into());
    }
    Ok(image)
}

impl HeightmapFileFormat for PngHeightmapFormat {
    fn description(&self) -> &'static str {
        "Heightmap .png files"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".png"]
    }

    fn validate(&self, path: &Path) -> Result<FileInfo, TerrafieldError> {
        let (resolution, color) = probe(path)?;
        let warning = match color {
            ColorType::L16 => None,
            ColorType::L8 => Some("the heightmap is only 8-bit; expect terracing".to_string()),
            other => Some(format!(
                "the heightmap is {other:?} and will be converted to 16-bit grayscale"
            )),
        };
        Ok(FileInfo {
            possible_resolutions: vec![resolution],
            warning,
        })
    }

    fn import(&self, path: &Path, expected: FileResolution) -> Result<HeightGrid, TerrafieldError> {
        let data: Vec<HeightSample> = match open_checked(path, expected)? {
            DynamicImage::ImageLuma16(buffer) => buffer.into_raw(),
            DynamicImage::ImageLuma8(buffer) => {
                warn!(path = %path.display(), "expanding 8-bit heightmap to 16-bit");
                buffer.into_raw().into_iter().map(|v| v as u16 * 257).collect()
            }
            other => {
                warn!(path = %path.display(), color = ?other.color(), "converting heightmap to 16-bit grayscale");
                other.to_luma16().into_raw()
            }
        };
        debug!(resource = "heightmap", path = %path.display(), resolution = %expected);
        Grid::from_vec(expected.rect(), data)
    }

    fn export(
        &self,
        path: &Path,
        data: &[HeightSample],
        resolution: FileResolution,
    ) -> Result<(), TerrafieldError> {
        let buffer: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_raw(resolution.width, resolution.height, data.to_vec())
                .ok_or(TerrafieldError::size_mismatch(resolution.sample_count(), data.len()))?;
        buffer.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

impl WeightmapFileFormat for PngWeightmapFormat {
    fn description(&self) -> &'static str {
        "Layer .png files"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".png"]
    }

    fn validate(&self, path: &Path) -> Result<FileInfo, TerrafieldError> {
        let (resolution, color) = probe(path)?;
        let warning = (color != ColorType::L8).then(|| {
            format!("the layer is {color:?} and will be converted to 8-bit grayscale")
        });
        Ok(FileInfo {
            possible_resolutions: vec![resolution],
            warning,
        })
    }

    fn import(&self, path: &Path, expected: FileResolution) -> Result<WeightGrid, TerrafieldError> {
        let data: Vec<WeightSample> = match open_checked(path, expected)? {
            DynamicImage::ImageLuma8(buffer) => buffer.into_raw(),
            other => {
                warn!(path = %path.display(), color = ?other.color(), "converting layer to 8-bit grayscale");
                other.to_luma8().into_raw()
            }
        };
        debug!(resource = "weightmap", path = %path.display(), resolution = %expected);
        Grid::from_vec(expected.rect(), data)
    }

    fn export(
        &self,
        path: &Path,
        data: &[WeightSample],
        resolution: FileResolution,
    ) -> Result<(), TerrafieldError> {
        let buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
            ImageBuffer::from_raw(resolution.width, resolution.height, data.to_vec())
                .ok_or(TerrafieldError::size_mismatch(resolution.sample_count(), data.len()))?;
        buffer.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixteen_bit_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terrain.png");
        let res = FileResolution::new(5, 3);
        let data: Vec<u16> = (0..15).map(|i| i * 4000 + 3).collect();
        PngHeightmapFormat.export(&path, &data, res).unwrap();

        let info = PngHeightmapFormat.validate(&path).unwrap();
        assert_eq!(info.possible_resolutions, vec![res]);
        assert_eq!(info.warning, None);
        let grid = PngHeightmapFormat.import(&path, res).unwrap();
        assert_eq!(grid.data(), data.as_slice());
    }

    #[test]
    fn eight_bit_heightmap_is_expanded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coarse.png");
        let res = FileResolution::new(2, 2);
        PngWeightmapFormat.export(&path, &[0, 1, 128, 255], res).unwrap();

        let info = PngHeightmapFormat.validate(&path).unwrap();
        assert!(info.warning.is_some());
        let grid = PngHeightmapFormat.import(&path, res).unwrap();
        assert_eq!(grid.data(), &[0, 257, 128 * 257, 65535]);
    }

    #[test]
    fn weightmap_rejects_other_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grass.png");
        PngWeightmapFormat
            .export(&path, &[9; 12], FileResolution::new(4, 3))
            .unwrap();
        let err = PngWeightmapFormat
            .import(&path, FileResolution::new(3, 4))
            .unwrap_err();
        assert!(matches!(
            err,
            TerrafieldError::Import(ImportErr::ResolutionMismatch { .. })
        ));
        let grid = PngWeightmapFormat.import(&path, FileResolution::new(4, 3)).unwrap();
        assert_eq!(grid.width(), 4);
        assert!(grid.data().iter().all(|w| *w == 9));
    }

    #[test]
    fn colour_images_convert_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colour.png");
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([255, 255, 255]));
        img.save(&path).unwrap();

        let info = PngWeightmapFormat.validate(&path).unwrap();
        assert!(info.warning.is_some());
        let grid = PngWeightmapFormat.import(&path, FileResolution::new(2, 2)).unwrap();
        assert_eq!(grid.data(), &[255; 4]);
    }
}
