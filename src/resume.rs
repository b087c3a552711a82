//! Structured resume artifact returned by the parsing service.
//!
//! The core never inspects these fields beyond display; the record is stored
//! in the session exactly as received and forwarded as `resume_data`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeData {
    #[serde(default)]
    pub contact_info: BTreeMap<String, String>,
    #[serde(default)]
    pub education: Vec<Value>,
    #[serde(default)]
    pub work_experience: Vec<Value>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub projects: Vec<Value>,
}

impl ResumeData {
    /// Contact name as extracted by the parser, if any.
    pub fn contact_name(&self) -> Option<&str> {
        self.contact_info.get("name").map(String::as_str)
    }
}
