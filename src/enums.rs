use std::{fmt, str::FromStr};

use image::Rgb;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}', expected one of: {expected}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

/// Anatomical viewing plane. The enum names which array axis is held fixed:
/// axial fixes z, coronal fixes y and sagittal fixes x.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
}

impl Orientation {
    /// Column order of a screenshot row for 3D inputs.
    pub const ALL: [Orientation; 3] = [
        Orientation::Sagittal,
        Orientation::Coronal,
        Orientation::Axial,
    ];
}

/// Slice order of a DICOM series. Parsed from the same names on the command
/// line and in JSON configs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}

impl FromStr for SortBy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "image-position-patient" | "position" => Ok(SortBy::ImagePositionPatient),
            "table-position" => Ok(SortBy::TablePosition),
            "instance-number" => Ok(SortBy::InstanceNumber),
            "none" => Ok(SortBy::None),
            _ => Err(ParseEnumError {
                kind: "sort order",
                value: s.to_string(),
                expected: "image-position-patient, table-position, instance-number, none",
            }),
        }
    }
}

impl SortBy {
    fn name(&self) -> &'static str {
        match self {
            SortBy::ImagePositionPatient => "image-position-patient",
            SortBy::TablePosition => "table-position",
            SortBy::InstanceNumber => "instance-number",
            SortBy::None => "none",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for SortBy {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SortBy> for String {
    fn from(sort_by: SortBy) -> Self {
        sort_by.name().to_string()
    }
}

/// Label colours used by [`Colormap::Fixed`], one entry per label.
const FIXED_LABEL_COLORS: [[u8; 3]; 16] = [
    [255, 0, 0],
    [0, 205, 0],
    [0, 0, 255],
    [0, 255, 255],
    [255, 0, 255],
    [255, 127, 0],
    [0, 100, 0],
    [138, 43, 226],
    [139, 99, 71],
    [0, 0, 128],
    [139, 139, 0],
    [255, 62, 150],
    [139, 76, 57],
    [0, 134, 139],
    [205, 104, 57],
    [191, 62, 255],
];

/// How mask labels are turned into overlay colours.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Colormap {
    /// Distinct colour per label, cycling through a fixed table.
    #[default]
    Fixed,
    Jet,
    Hot,
    Gray,
}

impl Colormap {
    /// Colour of `label` given the largest label present in the masks.
    /// Label 0 is background and has no colour.
    pub fn color(&self, label: u32, max_label: u32) -> Option<Rgb<u8>> {
        if label == 0 {
            return None;
        }
        let t = label as f32 / max_label.max(label) as f32;
        let [r, g, b] = match self {
            Colormap::Fixed => {
                let [r, g, b] = FIXED_LABEL_COLORS[(label as usize - 1) % FIXED_LABEL_COLORS.len()];
                return Some(Rgb([r, g, b]));
            }
            Colormap::Jet => [
                1.5 - (4.0 * t - 3.0).abs(),
                1.5 - (4.0 * t - 2.0).abs(),
                1.5 - (4.0 * t - 1.0).abs(),
            ],
            Colormap::Hot => [3.0 * t, 3.0 * t - 1.0, 3.0 * t - 2.0],
            Colormap::Gray => [t, t, t],
        };
        Some(Rgb([unit_to_u8(r), unit_to_u8(g), unit_to_u8(b)]))
    }

    fn name(&self) -> &'static str {
        match self {
            Colormap::Fixed => "fixed",
            Colormap::Jet => "jet",
            Colormap::Hot => "hot",
            Colormap::Gray => "gray",
        }
    }
}

#[inline]
fn unit_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Colormap {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" | "labels" => Ok(Colormap::Fixed),
            "jet" => Ok(Colormap::Jet),
            "hot" => Ok(Colormap::Hot),
            "gray" | "grey" => Ok(Colormap::Gray),
            _ => Err(ParseEnumError {
                kind: "colormap",
                value: s.to_string(),
                expected: "fixed, jet, hot, gray",
            }),
        }
    }
}

impl TryFrom<String> for Colormap {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Colormap> for String {
    fn from(colormap: Colormap) -> Self {
        colormap.name().to_string()
    }
}
