//! Playback: a render recipe (spiral + media + text + zoom), §3.

use serde::{Deserialize, Serialize};

/// Spiral pattern variant, `1..=7` (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SpiralType {
    /// Pattern 1.
    One = 1,
    /// Pattern 2.
    Two = 2,
    /// Pattern 3.
    Three = 3,
    /// Pattern 4.
    Four = 4,
    /// Pattern 5.
    Five = 5,
    /// Pattern 6.
    Six = 6,
    /// Pattern 7.
    Seven = 7,
}

/// RGBA color, `[0, 1]` per channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    /// Red channel.
    pub r: f32,
    /// Green channel.
    pub g: f32,
    /// Blue channel.
    pub b: f32,
    /// Alpha channel.
    pub a: f32,
}

impl Rgba {
    /// Construct from components.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0, 1.0)
    }
}

/// Spiral group of a Playback (§3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpiralConfig {
    /// Pattern variant.
    pub spiral_type: SpiralType,
    /// Rotation speed in revolutions per minute; negative reverses.
    pub rotation_speed_rpm: f32,
    /// Overall spiral opacity, `[0, 1]`.
    pub opacity: f32,
    /// Reverse rotation direction independent of sign convention above.
    pub reverse: bool,
    /// Arm color.
    pub arm_color: Rgba,
    /// Gap (background-of-spiral) color.
    pub gap_color: Rgba,
}

impl Default for SpiralConfig {
    fn default() -> Self {
        Self {
            spiral_type: SpiralType::One,
            rotation_speed_rpm: 0.0,
            opacity: 0.0,
            reverse: false,
            arm_color: Rgba::default(),
            gap_color: Rgba::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

/// Media mode for a Playback (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaMode {
    /// Images only.
    Images,
    /// Videos only.
    Videos,
    /// Both images and videos, interleaved in path order.
    Both,
    /// No media.
    None,
}

/// A path reference in a Playback's media list: either a literal absolute
/// path or a reference into the Session's Media Bank (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaPathRef {
    /// Literal absolute path.
    Path(String),
    /// Reference to a Media Bank entry by label.
    BankLabel {
        /// Media bank label being referenced.
        #[serde(rename = "media_bank")]
        label: String,
    },
}

/// Media group of a Playback (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Which kinds of media this playback cycles through.
    pub mode: MediaMode,
    /// Cycle speed, `1..=100` (§4.6).
    pub cycle_speed: u8,
    /// Ordered media references.
    pub paths: Vec<MediaPathRef>,
    /// Whether to select via the weighted shuffler instead of sequentially.
    pub shuffle: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            mode: MediaMode::None,
            cycle_speed: 50,
            paths: Vec::new(),
            shuffle: false,
        }
    }
}

/// Text overlay mode (§3). Per-mode animation curves are an implementer
/// choice within the documented parameter ranges (§9 open question); the
/// mode enum and cycle-sync semantics are the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextMode {
    /// Text overlay disabled.
    Off,
    /// Static, unanimated text.
    Static,
    /// Hard on/off flash.
    Flash,
    /// Smooth opacity fade.
    Fade,
    /// Breathing opacity pulse.
    Pulse,
    /// Horizontal/vertical scroll.
    Scroll,
    /// Centered text synchronized to the media cycle.
    CenteredSync,
    /// Secondary subtext line.
    Subtext,
}

/// Text group of a Playback (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextConfig {
    /// Whether text rendering is enabled at all.
    pub enabled: bool,
    /// Animation mode.
    pub mode: TextMode,
    /// Pool of strings to cycle through.
    pub library: Vec<String>,
    /// Overlay opacity, `[0, 1]`.
    pub opacity: f32,
    /// When true, text advances on media-cycle boundaries instead of its
    /// own timer.
    pub sync_with_media: bool,
    /// Manual cycle speed, `1..=100`, used when `sync_with_media` is false.
    pub manual_cycle_speed: u8,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: TextMode::Off,
            library: Vec::new(),
            opacity: 1.0,
            sync_with_media: true,
            manual_cycle_speed: 50,
        }
    }
}

/// Background zoom animation pattern (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoomMode {
    /// No zoom animation.
    None,
    /// Zoom progress increases monotonically.
    In,
    /// Zoom progress decreases monotonically.
    Out,
    /// Zoom progress oscillates.
    Pulse,
}

/// Zoom group of a Playback (§3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ZoomConfig {
    /// Animation pattern.
    pub mode: ZoomMode,
    /// Rate at which `zoom_progress` advances per second.
    pub rate: f32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            mode: ZoomMode::None,
            rate: 0.0,
        }
    }
}

/// A render recipe: spiral + media + text + zoom (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playback {
    /// Spiral overlay configuration.
    pub spiral: SpiralConfig,
    /// Background media configuration.
    pub media: MediaConfig,
    /// Text overlay configuration.
    pub text: TextConfig,
    /// Background zoom configuration.
    pub zoom: ZoomConfig,
}

impl Playback {
    /// §3 invariant: at least one of spiral opacity, media mode, or text
    /// must be active, else this playback is a no-op (permitted but warned).
    pub fn is_no_op(&self) -> bool {
        self.spiral.opacity <= 0.0 && self.media.mode == MediaMode::None && !self.text.enabled
    }
}
