//! Text form of a gizmo selection for the system clipboard.
//!
//! ```text
//! GizmoData= Type=1,TextureScaleX=..,SampleSizeX=..,.. X Y ZBits ... LayerInfos= name ... Region= X Y RatioBits HeightBits N (Layer WeightBits)* ...
//! ```
//!
//! Every float is written as its IEEE-754 bit pattern read as an `i32`, so
//! a paste reproduces the copied values exactly.

use std::{collections::BTreeMap, str::SplitWhitespace};

use glam::Vec3;
use tracing::{debug, warn};

use super::{DATA_TEX_SIZE, GizmoData, GizmoDataType, GizmoSelectData};
use crate::{datatypes::IntPoint, error::TerrafieldError};

pub const CLIPBOARD_PREFIX: &str = "GizmoData=";

/// Pastes larger than this should be confirmed by the user first.
pub const MAX_CLIPBOARD_TEXT_LEN: usize = 8 * 1024 * 1024;

pub fn is_gizmo_clipboard_text(text: &str) -> bool {
    text.trim_start().starts_with(CLIPBOARD_PREFIX)
}

pub fn is_large_clipboard_text(text: &str) -> bool {
    text.len() > MAX_CLIPBOARD_TEXT_LEN
}

fn float_bits(value: f32) -> i32 {
    value.to_bits() as i32
}

fn bits_float(bits: i32) -> f32 {
    f32::from_bits(bits as u32)
}

fn malformed(msg: impl Into<String>) -> TerrafieldError {
    TerrafieldError::Clipboard(msg.into())
}

impl GizmoData {
    /// Serializes the gizmo. Nothing is produced for an empty gizmo.
    pub fn to_clipboard_text(&self) -> Result<Option<String>, TerrafieldError> {
        if self.data_type.is_none() {
            return Ok(None);
        }
        if let Some(bad) = self
            .layers
            .iter()
            .find(|l| l.is_empty() || l.chars().any(char::is_whitespace))
        {
            return Err(malformed(format!("layer name {bad:?} cannot be written")));
        }

        let mut text = format!(
            "{CLIPBOARD_PREFIX} Type={},TextureScaleX={},TextureScaleY={},SampleSizeX={},SampleSizeY={},CachedWidth={},CachedHeight={},CachedScaleXY={} ",
            self.data_type.bits(),
            self.texture_scale.x,
            self.texture_scale.y,
            self.sample_size_x,
            self.sample_size_y,
            self.cached_width,
            self.cached_height,
            self.cached_scale_xy,
        );

        for y in 0..self.sample_size_y {
            for x in 0..self.sample_size_x {
                let v = self.sampled_height[x + y * DATA_TEX_SIZE];
                text.push_str(&format!("{} {} {} ", v.x as i32, v.y as i32, float_bits(v.z)));
            }
        }

        text.push_str("LayerInfos= ");
        for layer in &self.layers {
            text.push_str(layer);
            text.push(' ');
        }

        text.push_str("Region= ");
        for (point, data) in &self.selected {
            let weights: Vec<(usize, f32)> = data
                .weights
                .iter()
                .filter_map(|(name, w)| self.layers.iter().position(|l| l == name).map(|i| (i, *w)))
                .collect();
            text.push_str(&format!(
                "{} {} {} {} {} ",
                point.x,
                point.y,
                float_bits(data.ratio),
                float_bits(data.height),
                weights.len()
            ));
            for (layer, weight) in weights {
                text.push_str(&format!("{} {} ", layer, float_bits(weight)));
            }
        }

        debug!(bytes = text.len(), regions = self.selected.len(), "copied gizmo to text");
        Ok(Some(text))
    }

    /// Parses text produced by [`GizmoData::to_clipboard_text`] and rebuilds
    /// the normals.
    pub fn from_clipboard_text(text: &str) -> Result<Self, TerrafieldError> {
        let mut tokens = text.split_whitespace();
        if tokens.next() != Some(CLIPBOARD_PREFIX) {
            return Err(malformed(format!("text does not start with {CLIPBOARD_PREFIX}")));
        }
        if is_large_clipboard_text(text) {
            warn!(bytes = text.len(), "pasting a large gizmo clipboard");
        }

        let mut gizmo = GizmoData::new();
        let header = tokens.next().ok_or_else(|| malformed("missing header"))?;
        let mut read = 0;
        for pair in header.split(',') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let parsed = match key {
                "Type" => parse(value).map(|t| gizmo.data_type = GizmoDataType::from_bits(t)),
                "TextureScaleX" => parse(value).map(|v| gizmo.texture_scale.x = v),
                "TextureScaleY" => parse(value).map(|v| gizmo.texture_scale.y = v),
                "SampleSizeX" => parse(value).map(|v| gizmo.sample_size_x = v),
                "SampleSizeY" => parse(value).map(|v| gizmo.sample_size_y = v),
                "CachedWidth" => parse(value).map(|v| gizmo.cached_width = v),
                "CachedHeight" => parse(value).map(|v| gizmo.cached_height = v),
                "CachedScaleXY" => parse(value).map(|v| gizmo.cached_scale_xy = v),
                _ => continue,
            };
            parsed?;
            read += 1;
        }
        if read == 0 {
            return Err(malformed("header carries no known keys"));
        }
        if gizmo.sample_size_x > DATA_TEX_SIZE || gizmo.sample_size_y > DATA_TEX_SIZE {
            return Err(malformed(format!(
                "sample size {}x{} exceeds {DATA_TEX_SIZE}",
                gizmo.sample_size_x, gizmo.sample_size_y
            )));
        }

        for y in 0..gizmo.sample_size_y {
            for x in 0..gizmo.sample_size_x {
                let vx: i32 = next(&mut tokens)?;
                let vy: i32 = next(&mut tokens)?;
                let vz: i32 = next(&mut tokens)?;
                gizmo.sampled_height[x + y * DATA_TEX_SIZE] =
                    Vec3::new(vx as f32, vy as f32, bits_float(vz));
            }
        }
        gizmo.calc_normal();

        if tokens.next() != Some("LayerInfos=") {
            return Err(malformed("missing LayerInfos= section"));
        }
        loop {
            match tokens.next() {
                Some("Region=") => break,
                Some(layer) => gizmo.layers.push(layer.to_string()),
                None => return Err(malformed("missing Region= section")),
            }
        }

        while let Some(first) = tokens.next() {
            let x = parse_token(first)?;
            let y = next(&mut tokens)?;
            let ratio = bits_float(next(&mut tokens)?);
            let height = bits_float(next(&mut tokens)?);
            let layer_count: usize = next(&mut tokens)?;

            let mut weights = BTreeMap::new();
            for _ in 0..layer_count {
                let layer: usize = next(&mut tokens)?;
                let weight = bits_float(next(&mut tokens)?);
                let name = gizmo
                    .layers
                    .get(layer)
                    .ok_or_else(|| malformed(format!("layer index {layer} out of range")))?;
                weights.insert(name.clone(), weight);
            }
            gizmo.selected.insert(
                IntPoint::new(x, y),
                GizmoSelectData {
                    ratio,
                    height,
                    weights,
                },
            );
        }

        debug!(
            regions = gizmo.selected.len(),
            layers = gizmo.layers.len(),
            "pasted gizmo from text"
        );
        Ok(gizmo)
    }
}

fn parse<T: std::str::FromStr>(value: &str) -> Result<T, TerrafieldError> {
    value
        .parse()
        .map_err(|_| malformed(format!("cannot parse {value:?}")))
}

fn parse_token<T: std::str::FromStr>(token: &str) -> Result<T, TerrafieldError> {
    parse(token)
}

fn next<T: std::str::FromStr>(tokens: &mut SplitWhitespace<'_>) -> Result<T, TerrafieldError> {
    let token = tokens.next().ok_or_else(|| malformed("unexpected end of text"))?;
    parse_token(token)
}
