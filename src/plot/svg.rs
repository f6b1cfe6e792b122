use std::fmt::Write as _;
use std::path::Path;

use tiny_skia::{Pixmap, Transform};
use usvg::Tree;

use crate::error::WrapperError;
use crate::plot::{Color, Colormap, PlotSurface};

const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const COLORBAR_WIDTH: f64 = 90.0;
const TICKS: usize = 5;
const FONT: &str = "sans-serif";

#[derive(Debug, Clone)]
enum Element {
  Line { points: Vec<(f64, f64)>, color: Color, label: String },
  Segment { from: (f64, f64), to: (f64, f64), color: Color, width: f64 },
  Circle { center: (f64, f64), radius: f64, color: Color },
  Text { at: (f64, f64), text: String },
}

#[derive(Debug, Clone)]
struct ColorbarLayout {
  colormap: Colormap,
  min: f64,
  max: f64,
  label: String,
}

/// Maps data coordinates to pixels
struct Frame {
  x0: f64,
  y0: f64,
  scale_x: f64,
  scale_y: f64,
  left: f64,
  bottom: f64,
}

impl Frame {
  fn map(&self, (x, y): (f64, f64)) -> (f64, f64) {
    (self.left + (x - self.x0) * self.scale_x, self.bottom - (y - self.y0) * self.scale_y)
  }
}

/// In-memory plot surface that serializes to SVG, and to PNG through resvg
#[derive(Debug, Clone)]
pub struct SvgSurface {
  width: u32,
  height: u32,
  title: String,
  x_label: String,
  y_label: String,
  elements: Vec<Element>,
  colorbar: Option<ColorbarLayout>,
  grid: bool,
  legend: bool,
  equal_aspect: bool,
  axes_visible: bool,
}

impl Default for SvgSurface {
  fn default() -> Self {
    Self::new(1000, 800)
  }
}

impl SvgSurface {
  pub fn new(width: u32, height: u32) -> Self {
    Self {
      width: width.max(1),
      height: height.max(1),
      title: String::new(),
      x_label: String::new(),
      y_label: String::new(),
      elements: Vec::new(),
      colorbar: None,
      grid: false,
      legend: false,
      equal_aspect: false,
      axes_visible: true,
    }
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  /// Labels of the line series drawn so far
  pub fn series_labels(&self) -> Vec<&str> {
    self.elements.iter().filter_map(|e| match e {
      Element::Line { label, .. } => Some(label.as_str()),
      _ => None,
    }).collect()
  }

  pub fn is_empty(&self) -> bool {
    self.elements.is_empty()
  }

  /// Bounding box of everything drawn, in data coordinates
  fn bounds(&self) -> (f64, f64, f64, f64) {
    let mut points = Vec::new();
    for element in self.elements.iter() {
      match element {
        Element::Line { points: p, .. } => points.extend(p.iter().copied()),
        Element::Segment { from, to, .. } => {
          points.push(*from);
          points.push(*to);
        }
        Element::Circle { center, .. } => points.push(*center),
        Element::Text { at, .. } => points.push(*at),
      }
    }
    let finite: Vec<(f64, f64)> = points.into_iter().filter(|(x, y)| x.is_finite() && y.is_finite()).collect();
    if finite.is_empty() {
      return (0.0, 1.0, 0.0, 1.0);
    }
    let (mut x_min, mut x_max, mut y_min, mut y_max) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
    for (x, y) in finite {
      x_min = x_min.min(x);
      x_max = x_max.max(x);
      y_min = y_min.min(y);
      y_max = y_max.max(y);
    }
    let pad = |min: f64, max: f64| -> (f64, f64) {
      if max - min <= f64::EPSILON * max.abs().max(1.0) {
        (min - 1.0, max + 1.0)
      } else {
        let p = (max - min) * 0.05;
        (min - p, max + p)
      }
    };
    let (x_min, x_max) = pad(x_min, x_max);
    let (y_min, y_max) = pad(y_min, y_max);
    (x_min, x_max, y_min, y_max)
  }

  fn frame(&self) -> Frame {
    let (x_min, x_max, y_min, y_max) = self.bounds();
    let right_margin = MARGIN_RIGHT + if self.colorbar.is_some() { COLORBAR_WIDTH } else { 0.0 };
    let plot_w = (self.width as f64 - MARGIN_LEFT - right_margin).max(1.0);
    let plot_h = (self.height as f64 - MARGIN_TOP - MARGIN_BOTTOM).max(1.0);
    let mut scale_x = plot_w / (x_max - x_min);
    let mut scale_y = plot_h / (y_max - y_min);
    let (mut x0, mut y0) = (x_min, y_min);
    if self.equal_aspect {
      let scale = scale_x.min(scale_y);
      // center the data in the plot area
      x0 -= (plot_w / scale - (x_max - x_min)) / 2.0;
      y0 -= (plot_h / scale - (y_max - y_min)) / 2.0;
      scale_x = scale;
      scale_y = scale;
    }
    Frame { x0, y0, scale_x, scale_y, left: MARGIN_LEFT, bottom: MARGIN_TOP + plot_h }
  }

  /// Render the surface as an SVG document
  pub fn to_svg(&self) -> String {
    let frame = self.frame();
    let right_margin = MARGIN_RIGHT + if self.colorbar.is_some() { COLORBAR_WIDTH } else { 0.0 };
    let plot_right = self.width as f64 - right_margin;

    let mut svg = String::new();
    let _ = writeln!(svg, r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#, self.width, self.height, self.width, self.height);
    let _ = writeln!(svg, r#"<rect x="0" y="0" width="{}" height="{}" fill="white"/>"#, self.width, self.height);

    if self.axes_visible {
      self.write_axes(&mut svg, &frame, plot_right);
    }

    for element in self.elements.iter() {
      match element {
        Element::Line { points, color, .. } => {
          let path: Vec<String> = points.iter()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .map(|p| { let (x, y) = frame.map(*p); format!("{:.2},{:.2}", x, y) })
            .collect();
          if !path.is_empty() {
            let _ = writeln!(svg, r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="1.5"/>"#, path.join(" "), color.hex());
          }
        }
        Element::Segment { from, to, color, width } => {
          let (x1, y1) = frame.map(*from);
          let (x2, y2) = frame.map(*to);
          let _ = writeln!(svg, r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="{}" stroke-opacity="0.6"/>"#, x1, y1, x2, y2, color.hex(), width);
        }
        Element::Circle { center, radius, color } => {
          let (cx, cy) = frame.map(*center);
          let _ = writeln!(svg, r#"<circle cx="{:.2}" cy="{:.2}" r="{}" fill="{}" fill-opacity="0.9"/>"#, cx, cy, radius, color.hex());
        }
        Element::Text { at, text } => {
          let (x, y) = frame.map(*at);
          let _ = writeln!(svg, r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="8" font-weight="bold" text-anchor="middle" dominant-baseline="middle">{}</text>"#, x, y, FONT, escape(text));
        }
      }
    }

    if self.legend {
      self.write_legend(&mut svg, plot_right);
    }
    if let Some(colorbar) = &self.colorbar {
      write_colorbar(&mut svg, colorbar, plot_right, frame.bottom);
    }
    if !self.title.is_empty() {
      let _ = writeln!(svg, r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="16" text-anchor="middle">{}</text>"#, (MARGIN_LEFT + plot_right) / 2.0, MARGIN_TOP / 2.0 + 6.0, FONT, escape(&self.title));
    }
    svg.push_str("</svg>\n");
    svg
  }

  fn write_axes(&self, svg: &mut String, frame: &Frame, plot_right: f64) {
    let (top, bottom, left) = (MARGIN_TOP, frame.bottom, frame.left);
    let _ = writeln!(svg, r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="none" stroke="black"/>"#, left, top, plot_right - left, bottom - top);

    let inverse_x = |px: f64| frame.x0 + (px - left) / frame.scale_x;
    let inverse_y = |py: f64| frame.y0 + (bottom - py) / frame.scale_y;
    for i in 0..=TICKS {
      let f = i as f64 / TICKS as f64;
      let px = left + f * (plot_right - left);
      let py = bottom - f * (bottom - top);
      if self.grid {
        let _ = writeln!(svg, r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="gray" stroke-opacity="0.3"/>"#, px, top, px, bottom);
        let _ = writeln!(svg, r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="gray" stroke-opacity="0.3"/>"#, left, py, plot_right, py);
      }
      let _ = writeln!(svg, r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="10" text-anchor="middle">{}</text>"#, px, bottom + 16.0, FONT, tick_label(inverse_x(px)));
      let _ = writeln!(svg, r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="10" text-anchor="end">{}</text>"#, left - 6.0, py + 3.0, FONT, tick_label(inverse_y(py)));
    }

    if !self.x_label.is_empty() {
      let _ = writeln!(svg, r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="12" text-anchor="middle">{}</text>"#, (left + plot_right) / 2.0, bottom + 40.0, FONT, escape(&self.x_label));
    }
    if !self.y_label.is_empty() {
      let (x, y) = (18.0, (top + bottom) / 2.0);
      let _ = writeln!(svg, r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="12" text-anchor="middle" transform="rotate(-90 {:.2} {:.2})">{}</text>"#, x, y, FONT, x, y, escape(&self.y_label));
    }
  }

  fn write_legend(&self, svg: &mut String, plot_right: f64) {
    let entries: Vec<(&str, Color)> = self.elements.iter().filter_map(|e| match e {
      Element::Line { label, color, .. } if !label.is_empty() => Some((label.as_str(), *color)),
      _ => None,
    }).collect();
    if entries.is_empty() {
      return;
    }
    let width = 20.0 + 7.0 * entries.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0) as f64 + 30.0;
    let x = plot_right - width - 10.0;
    let y = MARGIN_TOP + 10.0;
    let _ = writeln!(svg, r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="white" fill-opacity="0.8" stroke="lightgray"/>"#, x, y, width, 8.0 + 16.0 * entries.len() as f64);
    for (i, (label, color)) in entries.iter().enumerate() {
      let ly = y + 16.0 + 16.0 * i as f64;
      let _ = writeln!(svg, r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="2"/>"#, x + 6.0, ly - 4.0, x + 26.0, ly - 4.0, color.hex());
      let _ = writeln!(svg, r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="10">{}</text>"#, x + 32.0, ly, FONT, escape(label));
    }
  }

  /// Rasterise the SVG rendering into PNG bytes
  pub fn to_png(&self) -> Result<Vec<u8>, WrapperError> {
    let svg = self.to_svg();
    let tree = Tree::from_data(svg.as_bytes(), &usvg::Options::default())
      .map_err(|e| WrapperError::Plot(format!("Failed to parse rendered SVG: {}", e)))?;
    let mut pixmap = Pixmap::new(self.width, self.height)
      .ok_or_else(|| WrapperError::Plot(format!("Invalid image size {}x{}", self.width, self.height)))?;
    resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());
    pixmap.encode_png().map_err(|e| WrapperError::Plot(format!("Failed to encode PNG: {}", e)))
  }

  /// Write the plot to a `.svg` or `.png` file
  pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), WrapperError> {
    let path = path.as_ref();
    let extension = path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase());
    match extension.as_deref() {
      Some("svg") => std::fs::write(path, self.to_svg())?,
      Some("png") => std::fs::write(path, self.to_png()?)?,
      _ => return Err(WrapperError::Plot(format!("Unsupported image format: {}", path.display()))),
    }
    Ok(())
  }
}

impl PlotSurface for SvgSurface {
  fn clear(&mut self) {
    *self = SvgSurface::new(self.width, self.height);
  }

  fn set_title(&mut self, title: &str) {
    self.title = title.to_string();
  }

  fn set_axis_labels(&mut self, x_label: &str, y_label: &str) {
    self.x_label = x_label.to_string();
    self.y_label = y_label.to_string();
  }

  fn line(&mut self, xs: &[f64], ys: &[f64], color: Color, label: &str) {
    let points = xs.iter().copied().zip(ys.iter().copied()).collect();
    self.elements.push(Element::Line { points, color, label: label.to_string() });
  }

  fn segment(&mut self, from: (f64, f64), to: (f64, f64), color: Color, width: f64) {
    self.elements.push(Element::Segment { from, to, color, width });
  }

  fn circle(&mut self, center: (f64, f64), radius: f64, color: Color) {
    self.elements.push(Element::Circle { center, radius, color });
  }

  fn text(&mut self, at: (f64, f64), text: &str) {
    self.elements.push(Element::Text { at, text: text.to_string() });
  }

  fn colorbar(&mut self, colormap: Colormap, min: f64, max: f64, label: &str) {
    self.colorbar = Some(ColorbarLayout { colormap, min, max, label: label.to_string() });
  }

  fn set_grid(&mut self, grid: bool) {
    self.grid = grid;
  }

  fn set_legend(&mut self, legend: bool) {
    self.legend = legend;
  }

  fn set_equal_aspect(&mut self, equal: bool) {
    self.equal_aspect = equal;
  }

  fn set_axes_visible(&mut self, visible: bool) {
    self.axes_visible = visible;
  }
}

fn write_colorbar(svg: &mut String, colorbar: &ColorbarLayout, plot_right: f64, bottom: f64) {
  let x = plot_right + 20.0;
  let (top, width) = (MARGIN_TOP, 16.0);
  let _ = writeln!(svg, r#"<defs><linearGradient id="colorbar" x1="0" y1="1" x2="0" y2="0">"#);
  for i in 0..=10 {
    let t = i as f64 / 10.0;
    let _ = writeln!(svg, r#"<stop offset="{:.1}" stop-color="{}"/>"#, t, colorbar.colormap.color(t).hex());
  }
  let _ = writeln!(svg, "</linearGradient></defs>");
  let _ = writeln!(svg, r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="url(#colorbar)" stroke="black" stroke-width="0.5"/>"#, x, top, width, bottom - top);
  let _ = writeln!(svg, r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="10">{}</text>"#, x + width + 4.0, top + 8.0, FONT, tick_label(colorbar.max));
  let _ = writeln!(svg, r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="10">{}</text>"#, x + width + 4.0, bottom, FONT, tick_label(colorbar.min));
  let (lx, ly) = (x + width + 50.0, (top + bottom) / 2.0);
  let _ = writeln!(svg, r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="12" text-anchor="middle" transform="rotate(-90 {:.2} {:.2})">{}</text>"#, lx, ly, FONT, lx, ly, escape(&colorbar.label));
}

fn tick_label(value: f64) -> String {
  if value.abs() >= 1e4 || (value != 0.0 && value.abs() < 1e-2) {
    format!("{:.2e}", value)
  } else {
    format!("{:.2}", value)
  }
}

fn escape(text: &str) -> String {
  text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_svg_contains_drawn_elements() {
    let mut surface = SvgSurface::new(400, 300);
    surface.set_title("A & B");
    surface.segment((0.0, 0.0), (10.0, 10.0), Color::GRAY, 2.0);
    surface.circle((0.0, 0.0), 6.0, Color::LIGHT_BLUE);
    surface.text((0.0, 0.0), "J1");
    let svg = surface.to_svg();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("A &amp; B"));
    assert!(svg.contains("<circle"));
    assert!(svg.contains("<line"));
    assert!(svg.contains(">J1</text>"));
    assert!(svg.trim_end().ends_with("</svg>"));
  }

  #[test]
  fn test_clear_keeps_size() {
    let mut surface = SvgSurface::new(320, 200);
    surface.line(&[0.0, 1.0], &[1.0, 2.0], Color::cycle(0), "Node 1");
    surface.clear();
    assert!(surface.is_empty());
    assert!(surface.to_svg().contains(r#"width="320""#));
  }

  #[test]
  fn test_png_rendering() {
    let mut surface = SvgSurface::new(120, 90);
    surface.line(&[0.0, 1.0, 2.0], &[1.0, 3.0, 2.0], Color::cycle(1), "series");
    surface.colorbar(Colormap::Viridis, 0.0, 1.0, "Pressure");
    let png = surface.to_png().unwrap();
    assert_eq!(&png[1..4], b"PNG");
  }

  #[test]
  fn test_unsupported_extension() {
    let surface = SvgSurface::default();
    assert!(matches!(surface.save("plot.bmp"), Err(WrapperError::Plot(_))));
  }
}
