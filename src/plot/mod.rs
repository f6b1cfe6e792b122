//! Plotting: a minimal drawing surface abstraction and the network and time series plots
//! drawn onto it.
//!
//! Callers supply the surface, so frontends can render the plots with whatever backend they
//! own. [`SvgSurface`] is the built-in backend and can rasterise to PNG.

pub mod colormap;
pub mod network;
pub mod params;
pub mod series;
pub mod svg;

pub use colormap::Colormap;
pub use params::{PlotOptions, PlotParams, PlotValue};
pub use series::{SeriesKind, TimeSeries, TimeUnit};
pub use svg::SvgSurface;

/// RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
  pub r: u8,
  pub g: u8,
  pub b: u8,
}

impl Color {
  pub const BLACK: Color = Color::rgb(0, 0, 0);
  pub const GRAY: Color = Color::rgb(128, 128, 128);
  pub const LIGHT_BLUE: Color = Color::rgb(173, 216, 230);
  pub const RED: Color = Color::rgb(214, 39, 40);

  pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
    Self { r, g, b }
  }

  /// Hex notation, e.g. `#add8e6`
  pub fn hex(&self) -> String {
    format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
  }

  /// Color of the i-th line series (matplotlib's default cycle)
  pub fn cycle(i: usize) -> Color {
    const CYCLE: [Color; 10] = [
      Color::rgb(31, 119, 180),
      Color::rgb(255, 127, 14),
      Color::rgb(44, 160, 44),
      Color::rgb(214, 39, 40),
      Color::rgb(148, 103, 189),
      Color::rgb(140, 86, 75),
      Color::rgb(227, 119, 194),
      Color::rgb(127, 127, 127),
      Color::rgb(188, 189, 34),
      Color::rgb(23, 190, 207),
    ];
    CYCLE[i % CYCLE.len()]
  }
}

/// A surface plots are drawn onto. Coordinates are in data units, sizes in pixels.
pub trait PlotSurface {
  /// Remove everything drawn so far, including title, labels and colorbar
  fn clear(&mut self);
  fn set_title(&mut self, title: &str);
  fn set_axis_labels(&mut self, x_label: &str, y_label: &str);
  /// Draw a line series, labelled in the legend
  fn line(&mut self, xs: &[f64], ys: &[f64], color: Color, label: &str);
  fn segment(&mut self, from: (f64, f64), to: (f64, f64), color: Color, width: f64);
  fn circle(&mut self, center: (f64, f64), radius: f64, color: Color);
  fn text(&mut self, at: (f64, f64), text: &str);
  fn colorbar(&mut self, colormap: Colormap, min: f64, max: f64, label: &str);
  fn set_grid(&mut self, grid: bool);
  fn set_legend(&mut self, legend: bool);
  /// Use the same scale on both axes
  fn set_equal_aspect(&mut self, equal: bool);
  fn set_axes_visible(&mut self, visible: bool);
}

/// Position of 0..1 of a value within a range, 0.5 for an empty range
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
  if max > min {
    ((value - min) / (max - min)).clamp(0.0, 1.0)
  } else {
    0.5
  }
}

/// Minimum and maximum of the finite values
pub fn value_range(values: &[f64]) -> Option<(f64, f64)> {
  values.iter().filter(|v| v.is_finite()).fold(None, |range, &v| match range {
    None => Some((v, v)),
    Some((min, max)) => Some((min.min(v), max.max(v))),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_normalize_empty_range() {
    assert_eq!(normalize(3.0, 3.0, 3.0), 0.5);
    assert_eq!(normalize(5.0, 0.0, 10.0), 0.5);
    assert_eq!(normalize(20.0, 0.0, 10.0), 1.0);
  }

  #[test]
  fn test_value_range_skips_nan() {
    assert_eq!(value_range(&[2.0, f64::NAN, -1.0, 4.0]), Some((-1.0, 4.0)));
    assert_eq!(value_range(&[]), None);
  }

  #[test]
  fn test_color_hex() {
    assert_eq!(Color::LIGHT_BLUE.hex(), "#add8e6");
  }
}
