//! False-color raster rendering.
//!
//! Renders one 2D slice of a gridded variable as an RGBA image on a
//! blue-to-red HSB ramp. Decoding reuses the extraction metadata (fill,
//! missing, valid range, scale, offset); cells without a physical value come
//! out fully transparent.
//!
//! The normalization range is taken from declared finite validity bounds when
//! the variable carries them, which also skips the min/max scan pass.

use image::{Rgba, RgbaImage};
use std::path::Path;
use tracing::debug;

use crate::attrs;
use crate::constants::{
    ATTR_ADD_OFFSET, ATTR_FILL_VALUE, ATTR_MISSING_VALUE, ATTR_SCALE_FACTOR,
    DEFAULT_IMAGE_UPSCALE, HUE_COLDEST,
};
use crate::decode::{CellValue, DecodeRules, FloatRules, IntRules, NumericKind, RawValue};
use crate::error::{Error, Result};
use crate::progress::{CancellationToken, Completion, ProgressSink, ProgressTracker};

/// Raster rendering engine for one (file, variable) pair.
pub struct RasterRenderer {
    /// Edge length of the square pixel block painted per cell.
    pub upscale: u32,
    /// Flip the vertical axis so ascending latitudes paint bottom-up.
    pub invert_latitude: bool,
}

impl Default for RasterRenderer {
    fn default() -> Self {
        Self {
            upscale: DEFAULT_IMAGE_UPSCALE,
            invert_latitude: true,
        }
    }
}

impl RasterRenderer {
    /// Render the first 2D slice (the last two dimensions) of a variable.
    ///
    /// `existing` is reused as the canvas when its dimensions match, so a
    /// caller stepping through slices avoids reallocating per frame; on a
    /// mismatch a fresh image is allocated.
    pub fn render(
        &self,
        source: &Path,
        variable_name: &str,
        existing: Option<RgbaImage>,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Completion<RgbaImage>> {
        let mut tracker = ProgressTracker::new(sink);
        tracker.title(&format!("Rendering {variable_name}"));
        tracker.message(&format!("Opening {}", source.display()));

        let file = netcdf::open(source)?;
        let variable = file
            .variable(variable_name)
            .ok_or_else(|| Error::VariableNotFound {
                path: source.to_path_buf(),
                name: variable_name.to_string(),
            })?;
        let rank = variable.dimensions().len();
        if rank < 2 {
            return Err(Error::extraction_failed(
                source,
                format!("variable {variable_name} has rank {rank}, expected at least 2"),
            ));
        }
        let kind = NumericKind::from_nc_type(&variable.vartype()).ok_or_else(|| {
            Error::extraction_failed(
                source,
                format!("variable {variable_name} has an unsupported data type"),
            )
        })?;

        let height = variable.dimensions()[rank - 2].len();
        let width = variable.dimensions()[rank - 1].len();
        // Four phase steps, one per painted row, and the final wrap-up step.
        tracker.set_total(5 + height as u64);
        tracker.step();
        if cancel.is_cancelled() {
            return Ok(Completion::Cancelled);
        }

        // Decode the slice at index zero of every leading dimension, which in
        // row-major storage is simply the first height*width cells.
        tracker.message("Reading cells");
        let cells = width * height;
        let decoded: Vec<Option<f64>> = if kind.is_integer() {
            let rules = int_rules(&variable);
            let raw = variable.get_values::<i64, _>(..)?;
            raw[..cells]
                .iter()
                .map(|&v| rules.decode(RawValue::Int(v)).map(cell_as_f64))
                .collect()
        } else {
            let rules = float_rules(&variable);
            let raw = variable.get_values::<f64, _>(..)?;
            raw[..cells]
                .iter()
                .map(|&v| rules.decode(RawValue::Float(v)).map(cell_as_f64))
                .collect()
        };
        tracker.step();
        if cancel.is_cancelled() {
            return Ok(Completion::Cancelled);
        }

        // Normalization range: declared bounds when finite, scan otherwise.
        tracker.message("Computing value range");
        let (min, max) = match declared_range(&variable) {
            Some(range) => range,
            None => scanned_range(&decoded),
        };
        debug!("Rendering {} with range [{}, {}]", variable_name, min, max);
        tracker.step();
        if cancel.is_cancelled() {
            return Ok(Completion::Cancelled);
        }

        let image_width = width as u32 * self.upscale;
        let image_height = height as u32 * self.upscale;
        let mut image = match existing {
            Some(image) if image.width() == image_width && image.height() == image_height => image,
            _ => RgbaImage::new(image_width, image_height),
        };
        tracker.step();

        tracker.message("Painting");
        let span = max - min;
        for y in 0..height {
            let target_row = if self.invert_latitude { height - 1 - y } else { y };
            for x in 0..width {
                let pixel = match decoded[y * width + x] {
                    Some(value) if span > 0.0 => {
                        let norm = ((value - min) / span).clamp(0.0, 1.0);
                        let [r, g, b] = hsb_to_rgb(HUE_COLDEST * (1.0 - norm), 1.0, 1.0);
                        Rgba([r, g, b, 255])
                    }
                    Some(_) => {
                        // Degenerate range: every valid cell paints coldest.
                        let [r, g, b] = hsb_to_rgb(HUE_COLDEST, 1.0, 1.0);
                        Rgba([r, g, b, 255])
                    }
                    None => Rgba([0, 0, 0, 0]),
                };
                paint_block(
                    &mut image,
                    x as u32 * self.upscale,
                    target_row as u32 * self.upscale,
                    self.upscale,
                    pixel,
                );
            }
            tracker.step();
            if cancel.is_cancelled() {
                return Ok(Completion::Cancelled);
            }
        }

        tracker.step();
        Ok(Completion::Done(image))
    }
}

fn cell_as_f64(value: CellValue) -> f64 {
    match value {
        CellValue::Int(v) => v as f64,
        CellValue::Float(v) => v,
    }
}

fn int_rules(variable: &netcdf::Variable) -> DecodeRules {
    let (valid_min, valid_max) = attrs::valid_range_i64(variable, i64::MIN, i64::MAX);
    DecodeRules::Int(IntRules {
        fill: attrs::int_attribute(variable, ATTR_FILL_VALUE, i64::MIN),
        missing: attrs::int_attribute(variable, ATTR_MISSING_VALUE, i64::MIN),
        valid_min,
        valid_max,
        scale: attrs::int_attribute(variable, ATTR_SCALE_FACTOR, 1),
        offset: attrs::int_attribute(variable, ATTR_ADD_OFFSET, 0),
    })
}

fn float_rules(variable: &netcdf::Variable) -> DecodeRules {
    let (valid_min, valid_max) =
        attrs::valid_range(variable, f64::NEG_INFINITY, f64::INFINITY);
    DecodeRules::Float(FloatRules {
        fill: attrs::numeric_attribute(variable, ATTR_FILL_VALUE, f64::NAN),
        missing: attrs::numeric_attribute(variable, ATTR_MISSING_VALUE, f64::NAN),
        valid_min,
        valid_max,
        scale: attrs::numeric_attribute(variable, ATTR_SCALE_FACTOR, 1.0),
        offset: attrs::numeric_attribute(variable, ATTR_ADD_OFFSET, 0.0),
    })
}

/// Declared normalization bounds, when the variable carries finite ones.
fn declared_range(variable: &netcdf::Variable) -> Option<(f64, f64)> {
    let (min, max) = attrs::valid_range(variable, f64::NEG_INFINITY, f64::INFINITY);
    (min.is_finite() && max.is_finite() && min < max).then_some((min, max))
}

/// Min/max over the decoded cells; `(0, 0)` when nothing decodes, which paints
/// an entirely transparent or single-color image.
fn scanned_range(decoded: &[Option<f64>]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in decoded.iter().flatten() {
        min = min.min(*value);
        max = max.max(*value);
    }
    if min > max { (0.0, 0.0) } else { (min, max) }
}

fn paint_block(image: &mut RgbaImage, x0: u32, y0: u32, edge: u32, pixel: Rgba<u8>) {
    for dy in 0..edge {
        for dx in 0..edge {
            image.put_pixel(x0 + dx, y0 + dy, pixel);
        }
    }
}

/// HSB (a.k.a. HSV) to RGB, all inputs in `[0, 1]`.
fn hsb_to_rgb(hue: f64, saturation: f64, brightness: f64) -> [u8; 3] {
    let h = ((hue % 1.0) + 1.0) % 1.0 * 6.0;
    let sector = h.floor();
    let f = h - sector;
    let p = brightness * (1.0 - saturation);
    let q = brightness * (1.0 - saturation * f);
    let t = brightness * (1.0 - saturation * (1.0 - f));
    let (r, g, b) = match sector as u32 % 6 {
        0 => (brightness, t, p),
        1 => (q, brightness, p),
        2 => (p, brightness, t),
        3 => (p, q, brightness),
        4 => (t, p, brightness),
        _ => (brightness, p, q),
    };
    [
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    ]
}
