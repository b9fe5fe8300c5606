use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::fonts::StandardFont;
use crate::config::load_config_file;
use crate::error::ConfigError;

/// Where and how each recipient field is drawn on the template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateLayout {
    pub template_pdf: PathBuf,
    /// Receives the PDFs and `certificate_ids.log`
    pub output_directory: PathBuf,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    pub fields: BTreeMap<String, FieldStyle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldStyle {
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    #[serde(default)]
    pub font_weight: FontWeight,
    #[serde(default)]
    pub color: [f64; 3],
    #[serde(default)]
    pub alignment: Alignment,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

fn default_font_family() -> String {
    "Helvetica".to_string()
}

impl CertificateLayout {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_config_file(path)
    }
}

impl FieldStyle {
    pub fn font(&self, family: &str) -> StandardFont {
        StandardFont::resolve(family, self.font_weight == FontWeight::Bold)
    }

    /// Fill colour as 0..1 components. Values above 1 are read as 0..255.
    pub fn rgb(&self) -> [f64; 3] {
        if self.color.iter().all(|c| (0.0..=1.0).contains(c)) {
            self.color
        } else {
            self.color.map(|c| (c / 255.0).clamp(0.0, 1.0))
        }
    }

    /// X position where the text run starts once alignment is applied
    pub fn start_x(&self, text: &str, font: StandardFont) -> f64 {
        match self.alignment {
            Alignment::Left => self.x,
            Alignment::Center => self.x - font.string_width(text, self.font_size) / 2.0,
            Alignment::Right => self.x - font.string_width(text, self.font_size),
        }
    }
}
