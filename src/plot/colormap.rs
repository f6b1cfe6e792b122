use std::str::FromStr;

use crate::plot::Color;

/// Sequential colormaps, sampled at five evenly spaced stops of the matplotlib maps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
  Viridis,
  Plasma,
  Oranges,
  Blues,
}

const VIRIDIS: [Color; 5] = [
  Color::rgb(68, 1, 84),
  Color::rgb(59, 82, 139),
  Color::rgb(33, 145, 140),
  Color::rgb(94, 201, 98),
  Color::rgb(253, 231, 37),
];

const PLASMA: [Color; 5] = [
  Color::rgb(13, 8, 135),
  Color::rgb(126, 3, 168),
  Color::rgb(204, 71, 120),
  Color::rgb(248, 149, 64),
  Color::rgb(240, 249, 33),
];

const ORANGES: [Color; 5] = [
  Color::rgb(255, 245, 235),
  Color::rgb(253, 208, 162),
  Color::rgb(253, 141, 60),
  Color::rgb(217, 72, 1),
  Color::rgb(127, 39, 4),
];

const BLUES: [Color; 5] = [
  Color::rgb(247, 251, 255),
  Color::rgb(198, 219, 239),
  Color::rgb(107, 174, 214),
  Color::rgb(33, 113, 181),
  Color::rgb(8, 48, 107),
];

impl FromStr for Colormap {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "viridis" => Ok(Colormap::Viridis),
      "plasma" => Ok(Colormap::Plasma),
      "oranges" => Ok(Colormap::Oranges),
      "blues" => Ok(Colormap::Blues),
      _ => Err(format!("Unknown colormap {}", s)),
    }
  }
}

impl Colormap {
  fn stops(&self) -> &'static [Color; 5] {
    match self {
      Colormap::Viridis => &VIRIDIS,
      Colormap::Plasma => &PLASMA,
      Colormap::Oranges => &ORANGES,
      Colormap::Blues => &BLUES,
    }
  }

  /// Color at position t (0..1) along the map
  pub fn color(&self, t: f64) -> Color {
    let stops = self.stops();
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (stops.len() - 1) as f64;
    let i = (scaled.floor() as usize).min(stops.len() - 2);
    let f = scaled - i as f64;
    let (a, b) = (stops[i], stops[i + 1]);
    let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * f).round() as u8;
    Color::rgb(lerp(a.r, b.r), lerp(a.g, b.g), lerp(a.b, b.b))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_colormap_ends() {
    assert_eq!(Colormap::Viridis.color(0.0), VIRIDIS[0]);
    assert_eq!(Colormap::Viridis.color(1.0), VIRIDIS[4]);
    assert_eq!(Colormap::Blues.color(2.0), BLUES[4]);
    assert_eq!(Colormap::Oranges.color(f64::NAN), ORANGES[0]);
  }

  #[test]
  fn test_colormap_interpolates() {
    // halfway between the first two stops
    let c = Colormap::Plasma.color(0.125);
    assert_eq!(c, Color::rgb(70, 6, 152));
  }

  #[test]
  fn test_colormap_from_str() {
    assert_eq!("Oranges".parse::<Colormap>(), Ok(Colormap::Oranges));
    assert!("jet".parse::<Colormap>().is_err());
  }
}
