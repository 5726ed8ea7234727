use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkMode {
    Text,
    Image,
}

/// Opaque RGB fill color; watermark transparency comes from the spec's
/// opacity fields, not from the color itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `"RRGGBB"` or `"#RRGGBB"`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix('#').unwrap_or(s);
        if s.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&s[0..2], 16).ok()?;
        let g = u8::from_str_radix(&s[2..4], 16).ok()?;
        let b = u8::from_str_radix(&s[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Immutable snapshot of the watermark configuration used by one render or
/// export operation. Only the field group matching `mode` is active; the
/// other group is carried along unchanged so switching modes keeps prior
/// settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkSpec {
    pub mode: WatermarkMode,

    pub text: String,
    pub font_family: String,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: Color,
    /// Text fill opacity, 0.0 (invisible) to 1.0 (opaque).
    pub opacity: f32,

    #[serde(default)]
    pub image_path: Option<PathBuf>,
    pub image_opacity: f32,
    /// Multiplier applied to the watermark image's native dimensions.
    pub image_scale: f32,

    pub x: i32,
    pub y: i32,
    /// Degrees; any real value, normalized mod 360 when rendering.
    pub rotation: f64,
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self {
            mode: WatermarkMode::Text,
            text: String::new(),
            font_family: "DejaVuSans".to_string(),
            font_size: 48.0,
            bold: false,
            italic: false,
            color: Color::WHITE,
            opacity: 1.0,
            image_path: None,
            image_opacity: 1.0,
            image_scale: 1.0,
            x: 0,
            y: 0,
            rotation: 0.0,
        }
    }
}

impl WatermarkSpec {
    /// Rotation folded into `[0, 360)`.
    pub fn normalized_rotation(&self) -> f64 {
        self.rotation.rem_euclid(360.0)
    }

    /// Check field ranges; used when restoring specs from disk.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(format!("opacity {} out of range 0.0-1.0", self.opacity));
        }
        if !(0.0..=1.0).contains(&self.image_opacity) {
            return Err(format!(
                "image opacity {} out of range 0.0-1.0",
                self.image_opacity
            ));
        }
        if self.image_scale <= 0.0 {
            return Err(format!("image scale {} must be positive", self.image_scale));
        }
        if self.font_size <= 0.0 {
            return Err(format!("font size {} must be positive", self.font_size));
        }
        Ok(())
    }
}

/// Width and height of the watermark content in the unrotated frame.
/// Clamping and anchor presets work on this box; rotation deliberately does
/// not change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorBox {
    pub width: u32,
    pub height: u32,
}

impl AnchorBox {
    pub const ZERO: Self = Self {
        width: 0,
        height: 0,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Position along one axis of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Start,
    Center,
    End,
}

/// The nine canonical placements, by UI-facing name.
pub const ANCHOR_PRESETS: [(&str, Slot, Slot); 9] = [
    ("top-left", Slot::Start, Slot::Start),
    ("top-center", Slot::Center, Slot::Start),
    ("top-right", Slot::End, Slot::Start),
    ("center-left", Slot::Start, Slot::Center),
    ("center", Slot::Center, Slot::Center),
    ("center-right", Slot::End, Slot::Center),
    ("bottom-left", Slot::Start, Slot::End),
    ("bottom-center", Slot::Center, Slot::End),
    ("bottom-right", Slot::End, Slot::End),
];

/// Look up an anchor preset by name.
pub fn anchor_preset(name: &str) -> Option<(Slot, Slot)> {
    ANCHOR_PRESETS
        .iter()
        .find(|(preset, _, _)| *preset == name)
        .map(|(_, h, v)| (*h, *v))
}

/// One interactive adjustment to a watermark configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecEdit {
    Mode(WatermarkMode),
    Text(String),
    Font {
        family: String,
        size: f32,
        bold: bool,
        italic: bool,
    },
    Color(Color),
    Opacity(f32),
    ImagePath(Option<PathBuf>),
    ImageOpacity(f32),
    ImageScale(f32),
    Rotation(f64),
    MoveTo { x: i32, y: i32 },
    DragBy { dx: i32, dy: i32 },
}

/// Pure state transition for interactive editing: build the next snapshot
/// from the current one plus a single edit. The UI layer applies an edit,
/// clamps the position against the current canvas if the edit moved the
/// watermark, and hands the fresh snapshot to the preview scheduler - the
/// live widget state never aliases a snapshot already being rendered.
pub fn apply_edit(spec: &WatermarkSpec, edit: SpecEdit) -> WatermarkSpec {
    let mut next = spec.clone();
    match edit {
        SpecEdit::Mode(mode) => next.mode = mode,
        SpecEdit::Text(text) => next.text = text,
        SpecEdit::Font {
            family,
            size,
            bold,
            italic,
        } => {
            next.font_family = family;
            next.font_size = size;
            next.bold = bold;
            next.italic = italic;
        }
        SpecEdit::Color(color) => next.color = color,
        SpecEdit::Opacity(opacity) => next.opacity = opacity,
        SpecEdit::ImagePath(path) => next.image_path = path,
        SpecEdit::ImageOpacity(opacity) => next.image_opacity = opacity,
        SpecEdit::ImageScale(scale) => next.image_scale = scale,
        SpecEdit::Rotation(rotation) => next.rotation = rotation,
        SpecEdit::MoveTo { x, y } => {
            next.x = x;
            next.y = y;
        }
        SpecEdit::DragBy { dx, dy } => {
            next.x += dx;
            next.y += dy;
        }
    }
    next
}
