//! PNG rendering of output grids

use super::GridRenderer;
use crate::app::models::OutputGrid;
use crate::{Error, Result};
use plotters::prelude::*;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Colour stops from cold to warm
const PALETTE: [(u8, u8, u8); 5] = [
    (49, 54, 149),
    (116, 173, 209),
    (255, 255, 191),
    (244, 109, 67),
    (165, 0, 38),
];

/// Colour of `value` on the palette stretched over [min, max]
pub fn temperature_color(value: f64, min: f64, max: f64) -> RGBColor {
    let t = if max > min {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    } else {
        0.5
    };

    let position = t * (PALETTE.len() - 1) as f64;
    let lower = (position.floor() as usize).min(PALETTE.len() - 2);
    let fraction = position - lower as f64;
    let (r0, g0, b0) = PALETTE[lower];
    let (r1, g1, b1) = PALETTE[lower + 1];

    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * fraction).round() as u8;
    RGBColor(mix(r0, r1), mix(g0, g1), mix(b0, b1))
}

/// Writes one pixel per grid cell, north up, exterior cells white
#[derive(Debug, Clone)]
pub struct PngGridRenderer {
    image_dir: PathBuf,
}

impl PngGridRenderer {
    pub fn new(image_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: image_dir.into(),
        }
    }
}

impl GridRenderer for PngGridRenderer {
    fn render(&self, grid: &OutputGrid, file_name: &str) -> Result<PathBuf> {
        let (nx, ny) = grid.shape();
        if nx == 0 || ny == 0 {
            return Err(Error::render("Cannot render an empty grid"));
        }
        let (min, max) = grid
            .temperature_range()
            .ok_or_else(|| Error::render("Grid has no finite temperature to render"))?;

        fs::create_dir_all(&self.image_dir).map_err(|e| {
            Error::io(
                format!("Failed to create image directory {}", self.image_dir.display()),
                e,
            )
        })?;
        let path = self.image_dir.join(file_name);

        {
            let root = BitMapBackend::new(&path, (nx as u32, ny as u32)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| Error::render(format!("Failed to clear image: {}", e)))?;

            for ((i, j), value) in grid.temperature.indexed_iter() {
                if !value.is_finite() {
                    continue;
                }
                // Axis 1 grows northwards, pixel rows grow downwards
                let pixel = (i as i32, (ny - 1 - j) as i32);
                root.draw_pixel(pixel, &temperature_color(*value, min, max))
                    .map_err(|e| Error::render(format!("Failed to draw cell: {}", e)))?;
            }

            root.present()
                .map_err(|e| Error::render(format!("Failed to write {}: {}", path.display(), e)))?;
        }

        debug!("Temperature range {:.1}..{:.1} mapped to palette", min, max);
        info!("Map image saved to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use tempfile::TempDir;

    #[test]
    fn test_palette_endpoints() {
        assert_eq!(temperature_color(-5.0, -5.0, 25.0), RGBColor(49, 54, 149));
        assert_eq!(temperature_color(25.0, -5.0, 25.0), RGBColor(165, 0, 38));
        assert_eq!(temperature_color(10.0, -5.0, 25.0), RGBColor(255, 255, 191));
        // Out-of-range values clamp
        assert_eq!(temperature_color(90.0, -5.0, 25.0), RGBColor(165, 0, 38));
        // A flat field uses the middle colour
        assert_eq!(temperature_color(3.0, 3.0, 3.0), RGBColor(255, 255, 191));
    }

    #[test]
    fn test_render_writes_png() {
        let dir = TempDir::new().unwrap();
        let grid = OutputGrid {
            grid_x: Array2::from_shape_fn((3, 3), |(i, _)| i as f64),
            grid_y: Array2::from_shape_fn((3, 3), |(_, j)| j as f64),
            temperature: Array2::from_shape_fn((3, 3), |(i, j)| {
                if i == 1 && j == 1 { 20.0 } else { f64::NAN }
            }),
        };

        let renderer = PngGridRenderer::new(dir.path().join("images"));
        let path = renderer.render(&grid, "2024-07-01_1400.png").unwrap();

        assert!(path.exists());
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_render_rejects_all_missing() {
        let dir = TempDir::new().unwrap();
        let grid = OutputGrid {
            grid_x: Array2::zeros((2, 2)),
            grid_y: Array2::zeros((2, 2)),
            temperature: Array2::from_elem((2, 2), f64::NAN),
        };

        let result = PngGridRenderer::new(dir.path()).render(&grid, "empty.png");
        assert!(matches!(result, Err(Error::Render { .. })));
    }
}
