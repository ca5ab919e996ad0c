//! Text and paragraph styles, field masks, and style provenance.
//!
//! Field masks mirror the API's comma-separated `fields` grammar
//! (`"bold,italic"`); the same bitset type doubles as the `explicit`
//! provenance set each [`TextStyle`] carries during a mock session.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// An RGB color with components in `0.0..=1.0`, as the API models colors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RgbColor {
    #[serde(default)]
    pub red: f32,
    #[serde(default)]
    pub green: f32,
    #[serde(default)]
    pub blue: f32,
}

impl RgbColor {
    /// Parse a `#RRGGBB` hex string.
    pub fn from_hex(hex: &str) -> Option<RgbColor> {
        let hex = hex.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let parse = |s: &str| u8::from_str_radix(s, 16).ok();
        Some(RgbColor {
            red: f32::from(parse(&hex[0..2])?) / 255.0,
            green: f32::from(parse(&hex[2..4])?) / 255.0,
            blue: f32::from(parse(&hex[4..6])?) / 255.0,
        })
    }

    pub fn to_hex(self) -> String {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02X}{:02X}{:02X}",
            channel(self.red),
            channel(self.green),
            channel(self.blue)
        )
    }
}

impl Hash for RgbColor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.red.to_bits().hash(state);
        self.green.to_bits().hash(state);
        self.blue.to_bits().hash(state);
    }
}

/// A hyperlink target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaselineOffset {
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "SUPERSCRIPT")]
    Superscript,
    #[serde(rename = "SUBSCRIPT")]
    Subscript,
}

/// A field that can appear in an `updateTextStyle` mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleField {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    FontFamily,
    FontSize,
    ForegroundColor,
    BackgroundColor,
    Link,
    BaselineOffset,
}

/// A field that can appear in an `updateParagraphStyle` mask.
///
/// `headingId` is deliberately absent: the server assigns it and it can
/// never be named in a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParagraphField {
    NamedStyleType,
    Alignment,
    Direction,
    LineSpacing,
    SpaceAbove,
    SpaceBelow,
    IndentStart,
    IndentEnd,
    IndentFirstLine,
}

/// A style property namespace that a [`Mask`] can range over.
pub trait MaskField: Copy + Eq + 'static {
    const ALL: &'static [Self];
    fn api_name(self) -> &'static str;
    fn bit(self) -> u16;

    fn from_api_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.api_name() == name)
    }
}

impl MaskField for StyleField {
    const ALL: &'static [StyleField] = &[
        StyleField::Bold,
        StyleField::Italic,
        StyleField::Underline,
        StyleField::Strikethrough,
        StyleField::FontFamily,
        StyleField::FontSize,
        StyleField::ForegroundColor,
        StyleField::BackgroundColor,
        StyleField::Link,
        StyleField::BaselineOffset,
    ];

    fn api_name(self) -> &'static str {
        match self {
            StyleField::Bold => "bold",
            StyleField::Italic => "italic",
            StyleField::Underline => "underline",
            StyleField::Strikethrough => "strikethrough",
            StyleField::FontFamily => "weightedFontFamily",
            StyleField::FontSize => "fontSize",
            StyleField::ForegroundColor => "foregroundColor",
            StyleField::BackgroundColor => "backgroundColor",
            StyleField::Link => "link",
            StyleField::BaselineOffset => "baselineOffset",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl MaskField for ParagraphField {
    const ALL: &'static [ParagraphField] = &[
        ParagraphField::NamedStyleType,
        ParagraphField::Alignment,
        ParagraphField::Direction,
        ParagraphField::LineSpacing,
        ParagraphField::SpaceAbove,
        ParagraphField::SpaceBelow,
        ParagraphField::IndentStart,
        ParagraphField::IndentEnd,
        ParagraphField::IndentFirstLine,
    ];

    fn api_name(self) -> &'static str {
        match self {
            ParagraphField::NamedStyleType => "namedStyleType",
            ParagraphField::Alignment => "alignment",
            ParagraphField::Direction => "direction",
            ParagraphField::LineSpacing => "lineSpacing",
            ParagraphField::SpaceAbove => "spaceAbove",
            ParagraphField::SpaceBelow => "spaceBelow",
            ParagraphField::IndentStart => "indentStart",
            ParagraphField::IndentEnd => "indentEnd",
            ParagraphField::IndentFirstLine => "indentFirstLine",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// A set of style fields, stored as a bitset.
///
/// Serializes as the API's comma-separated mask string. `"*"` parses to
/// the full set.
pub struct Mask<F: MaskField> {
    bits: u16,
    _field: PhantomData<F>,
}

pub type FieldSet = Mask<StyleField>;
pub type ParagraphFieldSet = Mask<ParagraphField>;

impl<F: MaskField> Mask<F> {
    pub const fn empty() -> Self {
        Mask {
            bits: 0,
            _field: PhantomData,
        }
    }

    pub fn all() -> Self {
        let mut mask = Mask::empty();
        for &f in F::ALL {
            mask.insert(f);
        }
        mask
    }

    pub fn of(fields: &[F]) -> Self {
        let mut mask = Mask::empty();
        for &f in fields {
            mask.insert(f);
        }
        mask
    }

    pub fn insert(&mut self, f: F) {
        self.bits |= f.bit();
    }

    pub fn remove(&mut self, f: F) {
        self.bits &= !f.bit();
    }

    pub fn contains(&self, f: F) -> bool {
        self.bits & f.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn union(&self, other: &Self) -> Self {
        Mask {
            bits: self.bits | other.bits,
            _field: PhantomData,
        }
    }

    pub fn union_with(&mut self, other: &Self) {
        self.bits |= other.bits;
    }

    pub fn iter(&self) -> impl Iterator<Item = F> + '_ {
        F::ALL.iter().copied().filter(|f| self.contains(*f))
    }

    /// Render as the API's `fields` mask string, e.g. `"bold,italic"`.
    pub fn to_mask(&self) -> String {
        let names: Vec<&str> = self.iter().map(MaskField::api_name).collect();
        names.join(",")
    }

    /// Parse a `fields` mask string. `"*"` yields the full set.
    pub fn parse_mask(mask: &str) -> Result<Self, String> {
        if mask.trim() == "*" {
            return Ok(Self::all());
        }
        let mut out = Self::empty();
        for part in mask.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match F::from_api_name(part) {
                Some(f) => out.insert(f),
                None => return Err(format!("unknown field {part:?} in mask")),
            }
        }
        Ok(out)
    }
}

impl<F: MaskField> Clone for Mask<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: MaskField> Copy for Mask<F> {}

impl<F: MaskField> Default for Mask<F> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<F: MaskField> PartialEq for Mask<F> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<F: MaskField> Eq for Mask<F> {}

impl<F: MaskField> fmt::Debug for Mask<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mask({})", self.to_mask())
    }
}

impl<F: MaskField> Serialize for Mask<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_mask())
    }
}

impl<'de, F: MaskField> Deserialize<'de> for Mask<F> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Mask::parse_mask(&s).map_err(serde::de::Error::custom)
    }
}

/// Character-level formatting for a run of text.
///
/// Every optional field unset means "inherited"; the mock and the
/// reconciler treat `None` as the segment default. The `explicit` set
/// records which fields were set by an `updateTextStyle` during the
/// current mock session; it never serializes and is ignored by
/// [`TextStyle::same_formatting`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
    #[serde(rename = "fontFamily", skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(rename = "fontSize", skip_serializing_if = "Option::is_none")]
    pub font_size_pt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<RgbColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<RgbColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_offset: Option<BaselineOffset>,
    /// Style provenance for the current mock session. Never serialized.
    #[serde(skip)]
    pub explicit: FieldSet,
}

impl TextStyle {
    pub fn plain() -> TextStyle {
        TextStyle::default()
    }

    fn field_eq(&self, other: &TextStyle, f: StyleField) -> bool {
        match f {
            StyleField::Bold => self.bold == other.bold,
            StyleField::Italic => self.italic == other.italic,
            StyleField::Underline => self.underline == other.underline,
            StyleField::Strikethrough => self.strikethrough == other.strikethrough,
            StyleField::FontFamily => self.font_family == other.font_family,
            StyleField::FontSize => self.font_size_pt == other.font_size_pt,
            StyleField::ForegroundColor => self.foreground_color == other.foreground_color,
            StyleField::BackgroundColor => self.background_color == other.background_color,
            StyleField::Link => self.link == other.link,
            StyleField::BaselineOffset => self.baseline_offset == other.baseline_offset,
        }
    }

    /// The set of fields on which `self` and `other` disagree.
    pub fn diff_fields(&self, other: &TextStyle) -> FieldSet {
        let mut diff = FieldSet::empty();
        for &f in StyleField::ALL {
            if !self.field_eq(other, f) {
                diff.insert(f);
            }
        }
        diff
    }

    /// Formatting equality, ignoring the `explicit` provenance set.
    pub fn same_formatting(&self, other: &TextStyle) -> bool {
        self.diff_fields(other).is_empty()
    }

    /// Copy one field's value from `from` into `self`.
    pub fn copy_field(&mut self, from: &TextStyle, f: StyleField) {
        match f {
            StyleField::Bold => self.bold = from.bold,
            StyleField::Italic => self.italic = from.italic,
            StyleField::Underline => self.underline = from.underline,
            StyleField::Strikethrough => self.strikethrough = from.strikethrough,
            StyleField::FontFamily => self.font_family = from.font_family.clone(),
            StyleField::FontSize => self.font_size_pt = from.font_size_pt,
            StyleField::ForegroundColor => self.foreground_color = from.foreground_color,
            StyleField::BackgroundColor => self.background_color = from.background_color,
            StyleField::Link => self.link = from.link.clone(),
            StyleField::BaselineOffset => self.baseline_offset = from.baseline_offset,
        }
    }

    pub fn clear_field(&mut self, f: StyleField) {
        self.copy_field(&TextStyle::default(), f);
    }

    /// A style containing only the given fields of `self`, everything
    /// else unset. Used to build minimal `updateTextStyle` payloads.
    pub fn restricted_to(&self, fields: FieldSet) -> TextStyle {
        let mut out = TextStyle::default();
        for f in fields.iter() {
            out.copy_field(self, f);
        }
        out
    }

    /// Hash the formatting fields (never `explicit`) into `state`.
    pub fn hash_formatting<H: Hasher>(&self, state: &mut H) {
        self.bold.hash(state);
        self.italic.hash(state);
        self.underline.hash(state);
        self.strikethrough.hash(state);
        self.font_family.hash(state);
        self.font_size_pt.map(f64::to_bits).hash(state);
        self.foreground_color.hash(state);
        self.background_color.hash(state);
        self.link.hash(state);
        self.baseline_offset.hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedStyleType {
    #[serde(rename = "NORMAL_TEXT")]
    NormalText,
    #[serde(rename = "TITLE")]
    Title,
    #[serde(rename = "SUBTITLE")]
    Subtitle,
    #[serde(rename = "HEADING_1")]
    Heading1,
    #[serde(rename = "HEADING_2")]
    Heading2,
    #[serde(rename = "HEADING_3")]
    Heading3,
    #[serde(rename = "HEADING_4")]
    Heading4,
    #[serde(rename = "HEADING_5")]
    Heading5,
    #[serde(rename = "HEADING_6")]
    Heading6,
}

impl NamedStyleType {
    /// True for every named style that carries heading defaults
    /// (everything but NORMAL_TEXT).
    pub fn is_heading(self) -> bool {
        !matches!(self, NamedStyleType::NormalText)
    }

    pub fn heading_level(self) -> Option<u8> {
        match self {
            NamedStyleType::Heading1 => Some(1),
            NamedStyleType::Heading2 => Some(2),
            NamedStyleType::Heading3 => Some(3),
            NamedStyleType::Heading4 => Some(4),
            NamedStyleType::Heading5 => Some(5),
            NamedStyleType::Heading6 => Some(6),
            _ => None,
        }
    }

    pub fn from_heading_level(level: u8) -> Option<NamedStyleType> {
        match level {
            1 => Some(NamedStyleType::Heading1),
            2 => Some(NamedStyleType::Heading2),
            3 => Some(NamedStyleType::Heading3),
            4 => Some(NamedStyleType::Heading4),
            5 => Some(NamedStyleType::Heading5),
            6 => Some(NamedStyleType::Heading6),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alignment {
    #[serde(rename = "START")]
    Start,
    #[serde(rename = "CENTER")]
    Center,
    #[serde(rename = "END")]
    End,
    #[serde(rename = "JUSTIFIED")]
    Justified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentDirection {
    #[serde(rename = "LEFT_TO_RIGHT")]
    LeftToRight,
    #[serde(rename = "RIGHT_TO_LEFT")]
    RightToLeft,
}

/// Paragraph-level formatting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParagraphStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_style_type: Option<NamedStyleType>,
    /// Server-assigned anchor id for headings. Never named in a mask.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<ContentDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_spacing: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_above: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_below: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent_start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent_end: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent_first_line: Option<f64>,
}

impl ParagraphStyle {
    fn field_eq(&self, other: &ParagraphStyle, f: ParagraphField) -> bool {
        match f {
            // An unset named style means NORMAL_TEXT.
            ParagraphField::NamedStyleType => {
                self.named_style_type.unwrap_or(NamedStyleType::NormalText)
                    == other.named_style_type.unwrap_or(NamedStyleType::NormalText)
            }
            ParagraphField::Alignment => self.alignment == other.alignment,
            ParagraphField::Direction => self.direction == other.direction,
            ParagraphField::LineSpacing => self.line_spacing == other.line_spacing,
            ParagraphField::SpaceAbove => self.space_above == other.space_above,
            ParagraphField::SpaceBelow => self.space_below == other.space_below,
            ParagraphField::IndentStart => self.indent_start == other.indent_start,
            ParagraphField::IndentEnd => self.indent_end == other.indent_end,
            ParagraphField::IndentFirstLine => self.indent_first_line == other.indent_first_line,
        }
    }

    /// The set of maskable fields on which `self` and `other` disagree.
    /// `headingId` is not maskable and never participates.
    pub fn diff_fields(&self, other: &ParagraphStyle) -> ParagraphFieldSet {
        let mut diff = ParagraphFieldSet::empty();
        for &f in ParagraphField::ALL {
            if !self.field_eq(other, f) {
                diff.insert(f);
            }
        }
        diff
    }

    pub fn same_formatting(&self, other: &ParagraphStyle) -> bool {
        self.diff_fields(other).is_empty()
    }

    pub fn copy_field(&mut self, from: &ParagraphStyle, f: ParagraphField) {
        match f {
            ParagraphField::NamedStyleType => self.named_style_type = from.named_style_type,
            ParagraphField::Alignment => self.alignment = from.alignment,
            ParagraphField::Direction => self.direction = from.direction,
            ParagraphField::LineSpacing => self.line_spacing = from.line_spacing,
            ParagraphField::SpaceAbove => self.space_above = from.space_above,
            ParagraphField::SpaceBelow => self.space_below = from.space_below,
            ParagraphField::IndentStart => self.indent_start = from.indent_start,
            ParagraphField::IndentEnd => self.indent_end = from.indent_end,
            ParagraphField::IndentFirstLine => self.indent_first_line = from.indent_first_line,
        }
    }

    pub fn restricted_to(&self, fields: ParagraphFieldSet) -> ParagraphStyle {
        let mut out = ParagraphStyle::default();
        for f in fields.iter() {
            out.copy_field(self, f);
        }
        out
    }

    pub fn hash_formatting<H: Hasher>(&self, state: &mut H) {
        self.named_style_type
            .unwrap_or(NamedStyleType::NormalText)
            .hash(state);
        self.alignment.hash(state);
        self.direction.hash(state);
        self.line_spacing.map(f64::to_bits).hash(state);
        self.space_above.map(f64::to_bits).hash(state);
        self.space_below.map(f64::to_bits).hash(state);
        self.indent_start.map(f64::to_bits).hash(state);
        self.indent_end.map(f64::to_bits).hash(state);
        self.indent_first_line.map(f64::to_bits).hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BulletPreset {
    #[serde(rename = "BULLET_DISC_CIRCLE_SQUARE")]
    DiscCircleSquare,
    #[serde(rename = "NUMBERED_DECIMAL_ALPHA_ROMAN")]
    NumberedDecimalAlphaRoman,
}

/// List membership of a paragraph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bullet {
    pub list_id: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub nesting_level: usize,
    /// Glyph family of the owning list. The wire shape keeps this in the
    /// per-tab list table; carrying it here lets the XML layer render
    /// `<li kind>` without modeling that table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<BulletPreset>,
    pub text_style: TextStyle,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}
