//! Heightmap and weightmap files.
//!
//! Each format validates a file (reporting the resolutions it could hold),
//! imports it at a caller-chosen resolution and exports dense samples.

pub mod png;
pub mod raw;

pub use png::*;
pub use raw::*;

use std::path::Path;

use crate::{
    datatypes::{FileResolution, HeightGrid, HeightSample, WeightGrid, WeightSample},
    error::{ImportErr, TerrafieldError},
};

/// Result of inspecting a file before import.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileInfo {
    pub possible_resolutions: Vec<FileResolution>,
    /// Non-fatal problem the user should see, such as a lossy conversion.
    pub warning: Option<String>,
}

impl FileInfo {
    /// Resolution to import at: `hint` if the file can hold it, otherwise
    /// the only candidate, otherwise the first square candidate.
    pub fn pick_resolution(&self, hint: Option<FileResolution>) -> Option<FileResolution> {
        if let Some(hint) = hint {
            return self.possible_resolutions.contains(&hint).then_some(hint);
        }
        match self.possible_resolutions.as_slice() {
            [only] => Some(*only),
            all => all.iter().copied().find(|r| r.width == r.height),
        }
    }
}

pub trait HeightmapFileFormat: Sync {
    fn description(&self) -> &'static str;
    /// Lowercase, with the leading dot.
    fn extensions(&self) -> &'static [&'static str];
    fn validate(&self, path: &Path) -> Result<FileInfo, TerrafieldError>;
    fn import(&self, path: &Path, expected: FileResolution) -> Result<HeightGrid, TerrafieldError>;
    fn export(
        &self,
        path: &Path,
        data: &[HeightSample],
        resolution: FileResolution,
    ) -> Result<(), TerrafieldError>;
}

pub trait WeightmapFileFormat: Sync {
    fn description(&self) -> &'static str;
    fn extensions(&self) -> &'static [&'static str];
    fn validate(&self, path: &Path) -> Result<FileInfo, TerrafieldError>;
    fn import(&self, path: &Path, expected: FileResolution) -> Result<WeightGrid, TerrafieldError>;
    fn export(
        &self,
        path: &Path,
        data: &[WeightSample],
        resolution: FileResolution,
    ) -> Result<(), TerrafieldError>;
}

static HEIGHTMAP_FORMATS: [&dyn HeightmapFileFormat; 2] = [&PngHeightmapFormat, &RawHeightmapFormat];
static WEIGHTMAP_FORMATS: [&dyn WeightmapFileFormat; 2] = [&PngWeightmapFormat, &RawWeightmapFormat];

fn extension_of(path: &Path) -> Result<String, ImportErr> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .ok_or_else(|| ImportErr::UnknownFileType(path.display().to_string()))
}

pub fn heightmap_format_for_path(path: &Path) -> Result<&'static dyn HeightmapFileFormat, ImportErr> {
    let ext = extension_of(path)?;
    HEIGHTMAP_FORMATS
        .iter()
        .copied()
        .find(|f| f.extensions().contains(&ext.as_str()))
        .ok_or(ImportErr::UnknownFileType(ext))
}

pub fn weightmap_format_for_path(path: &Path) -> Result<&'static dyn WeightmapFileFormat, ImportErr> {
    let ext = extension_of(path)?;
    WEIGHTMAP_FORMATS
        .iter()
        .copied()
        .find(|f| f.extensions().contains(&ext.as_str()))
        .ok_or(ImportErr::UnknownFileType(ext))
}

/// Every `width` x `height` split of `samples` with both sides between 8 and
/// 8192, narrow-first, followed by the transposed non-square splits.
pub fn calculate_possible_raw_resolutions(samples: u64) -> Vec<FileResolution> {
    let min_width = 8.max(samples.div_ceil(8192));
    let max_width = (samples as f64).sqrt() as u64;

    let mut resolutions: Vec<FileResolution> = (min_width..=max_width)
        .filter(|w| samples % w == 0)
        .map(|w| FileResolution::new(w as u32, (samples / w) as u32))
        .collect();

    let transposed: Vec<FileResolution> = resolutions
        .iter()
        .rev()
        .filter(|r| r.width != r.height)
        .map(|r| FileResolution::new(r.height, r.width))
        .collect();
    resolutions.extend(transposed);
    resolutions
}

/// Outcome of comparing an import against the current landscape.
#[derive(Clone, Debug, PartialEq)]
pub enum ImportCheck {
    Match,
    /// Importing anyway changes the landscape size; ask first.
    Mismatch {
        current: FileResolution,
        possible: Vec<FileResolution>,
    },
}

pub fn resolution_matches(possible: &[FileResolution], current: FileResolution) -> ImportCheck {
    if possible.contains(&current) {
        ImportCheck::Match
    } else {
        ImportCheck::Mismatch {
            current,
            possible: possible.to_vec(),
        }
    }
}

/// Validates and imports a heightmap, choosing its resolution with
/// [`FileInfo::pick_resolution`].
pub fn load_heightmap(path: &Path, hint: Option<FileResolution>) -> Result<HeightGrid, TerrafieldError> {
    let format = heightmap_format_for_path(path)?;
    let info = format.validate(path)?;
    let resolution = info.pick_resolution(hint).ok_or(ImportErr::UnsupportedFormat(format!(
        "cannot choose a resolution for {} from {:?}",
        path.display(),
        info.possible_resolutions
    )))?;
    format.import(path, resolution)
}

pub fn save_heightmap(path: &Path, grid: &HeightGrid) -> Result<(), TerrafieldError> {
    let format = heightmap_format_for_path(path)?;
    let resolution = FileResolution::new(grid.width() as u32, grid.height() as u32);
    format.export(path, grid.data(), resolution)
}
