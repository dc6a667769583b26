use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Engineering discipline the problem belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Mechanical,
    Electrical,
    Civil,
    Chemical,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Mechanical,
        Domain::Electrical,
        Domain::Civil,
        Domain::Chemical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Mechanical => "Mechanical",
            Domain::Electrical => "Electrical",
            Domain::Civil => "Civil",
            Domain::Chemical => "Chemical",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mechanical" | "mech" => Ok(Domain::Mechanical),
            "electrical" | "elec" => Ok(Domain::Electrical),
            "civil" => Ok(Domain::Civil),
            "chemical" | "chem" => Ok(Domain::Chemical),
            other => Err(format!(
                "unknown field '{other}' (expected mechanical, electrical, civil or chemical)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Sw,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Sw => "sw",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Sw => "Swahili",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Language::En => Language::Sw,
            Language::Sw => Language::En,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "sw" | "swahili" | "kiswahili" => Ok(Language::Sw),
            other => Err(format!("unknown language '{other}' (expected en or sw)")),
        }
    }
}

/// Image bytes attached to a problem, sent inline with the solve call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    pub media_type: String,
    #[serde(skip_serializing)]
    pub data: Vec<u8>,
    pub file_name: Option<String>,
}

impl ImageAttachment {
    pub fn new(media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            media_type: media_type.into(),
            data,
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn label(&self) -> String {
        match self.file_name.as_deref() {
            Some(name) => format!("{name} ({}, {} bytes)", self.media_type, self.data.len()),
            None => format!("{} ({} bytes)", self.media_type, self.data.len()),
        }
    }
}

/// One problem submission. Built fresh for every solve call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemRequest {
    pub domain: Domain,
    pub description: String,
    pub image: Option<ImageAttachment>,
    pub language: Language,
}

impl ProblemRequest {
    pub fn new(domain: Domain, description: impl Into<String>) -> Self {
        Self {
            domain,
            description: description.into(),
            image: None,
            language: Language::default(),
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_image(mut self, image: Option<ImageAttachment>) -> Self {
        self.image = image;
        self
    }

    /// Blank descriptions never reach the network.
    pub fn is_submittable(&self) -> bool {
        !self.description.trim().is_empty()
    }
}
