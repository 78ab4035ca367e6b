use std::{fs, path::Path};

use tracing::debug;

use super::{FileInfo, HeightmapFileFormat, WeightmapFileFormat, calculate_possible_raw_resolutions};
use crate::{
    datatypes::{FileResolution, Grid, HeightGrid, HeightSample, WeightGrid, WeightSample},
    error::{ImportErr, TerrafieldError},
};

/// Headerless little-endian 16-bit heights.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawHeightmapFormat;

/// Headerless 8-bit weights.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawWeightmapFormat;

fn check_len(data_len: usize, resolution: FileResolution) -> Result<(), TerrafieldError> {
    if data_len != resolution.sample_count() {
        return Err(TerrafieldError::size_mismatch(resolution.sample_count(), data_len));
    }
    Ok(())
}

impl HeightmapFileFormat for RawHeightmapFormat {
    fn description(&self) -> &'static str {
        "Heightmap .r16/.raw files"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".r16", ".raw"]
    }

    fn validate(&self, path: &Path) -> Result<FileInfo, TerrafieldError> {
        let size = fs::metadata(path)?.len();
        if size == 0 || size % 2 != 0 {
            return Err(ImportErr::InvalidFileSize(size).into());
        }
        let possible_resolutions = calculate_possible_raw_resolutions(size / 2);
        if possible_resolutions.is_empty() {
            return Err(ImportErr::InvalidFileSize(size).into());
        }
        Ok(FileInfo {
            possible_resolutions,
            warning: None,
        })
    }

    fn import(&self, path: &Path, expected: FileResolution) -> Result<HeightGrid, TerrafieldError> {
        let bytes = fs::read(path)?;
        if bytes.len() != expected.sample_count() * 2 {
            return Err(ImportErr::FileSizeMismatch {
                expected,
                bytes: bytes.len() as u64,
            }
            .into());
        }
        let data = bytes
            .chunks_exact(2)
            .map(|c| HeightSample::from_le_bytes([c[0], c[1]]))
            .collect();
        debug!(resource = "heightmap", path = %path.display(), resolution = %expected);
        Grid::from_vec(expected.rect(), data)
    }

    fn export(
        &self,
        path: &Path,
        data: &[HeightSample],
        resolution: FileResolution,
    ) -> Result<(), TerrafieldError> {
        check_len(data.len(), resolution)?;
        let bytes: Vec<u8> = data.iter().flat_map(|h| h.to_le_bytes()).collect();
        fs::write(path, bytes)?;
        Ok(())
    }
}

impl WeightmapFileFormat for RawWeightmapFormat {
    fn description(&self) -> &'static str {
        "Layer .r8/.raw files"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".r8", ".raw"]
    }

    fn validate(&self, path: &Path) -> Result<FileInfo, TerrafieldError> {
        let size = fs::metadata(path)?.len();
        let possible_resolutions = calculate_possible_raw_resolutions(size);
        if possible_resolutions.is_empty() {
            return Err(ImportErr::InvalidFileSize(size).into());
        }
        Ok(FileInfo {
            possible_resolutions,
            warning: None,
        })
    }

    fn import(&self, path: &Path, expected: FileResolution) -> Result<WeightGrid, TerrafieldError> {
        let bytes = fs::read(path)?;
        if bytes.len() != expected.sample_count() {
            return Err(ImportErr::FileSizeMismatch {
                expected,
                bytes: bytes.len() as u64,
            }
            .into());
        }
        debug!(resource = "weightmap", path = %path.display(), resolution = %expected);
        Grid::from_vec(expected.rect(), bytes)
    }

    fn export(
        &self,
        path: &Path,
        data: &[WeightSample],
        resolution: FileResolution,
    ) -> Result<(), TerrafieldError> {
        check_len(data.len(), resolution)?;
        fs::write(path, data)?;
        Ok(())
    }
}
