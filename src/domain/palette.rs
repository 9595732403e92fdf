/// Paint palette: an ordered list of colors addressed by `ColorIndex`.
///
/// The palette is fixed for the session. Its length bounds which color
/// indices the editor accepts.

use super::grid::ColorIndex;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Scale every channel by `factor` (0.0..=1.0).
    pub fn darken(self, factor: f32) -> Self {
        let f = factor.clamp(0.0, 1.0);
        let scale = |c: u8| (c as f32 * f).round() as u8;
        Rgb::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

const DEFAULT_COLORS: [Rgb; 10] = [
    Rgb::new(0xff, 0x00, 0x00),
    Rgb::new(0x00, 0x00, 0xff),
    Rgb::new(0x00, 0xbb, 0x00),
    Rgb::new(0xff, 0xaa, 0x00),
    Rgb::new(0xcc, 0x00, 0xff),
    Rgb::new(0x00, 0xbb, 0xff),
    Rgb::new(0xff, 0xff, 0xff),
    Rgb::new(0x88, 0x88, 0x88),
    Rgb::new(0x88, 0x44, 0x00),
    Rgb::new(0xff, 0x44, 0x99),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    /// Build from hex strings. Fails if any entry is invalid, the list is
    /// empty, or it has more entries than a `ColorIndex` can address.
    pub fn from_hex_list(entries: &[String]) -> Option<Self> {
        if entries.is_empty() || entries.len() > u8::MAX as usize + 1 {
            return None;
        }
        let colors = entries.iter()
            .map(|s| Rgb::from_hex(s))
            .collect::<Option<Vec<_>>>()?;
        Some(Palette { colors })
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn contains(&self, index: ColorIndex) -> bool {
        index.as_usize() < self.colors.len()
    }

    pub fn get(&self, index: ColorIndex) -> Option<Rgb> {
        self.colors.get(index.as_usize()).copied()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette { colors: DEFAULT_COLORS.to_vec() }
    }
}
