//! Personal-information records captured in the profile stage.
//!
//! [`PersonalInfo`] mirrors the JSON shape the backend job runner expects under
//! `personal_info`. [`PersonalInfo::validate`] performs the required-field
//! checks that gate the `CapturingProfile → Reviewing` transition.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern")
});

// Digits, spaces, dashes, dots, parentheses and a leading plus.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9 ()\-.]+$").expect("valid phone pattern")
});

const MIN_PHONE_DIGITS: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "USA".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    pub degree: String,
    pub field: String,
    pub institution: String,
    pub graduation_year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpa: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkExperience {
    pub company: String,
    pub position: String,
    /// `YYYY-MM`.
    pub start_date: String,
    /// `YYYY-MM`, absent for the current position.
    #[serde(default)]
    pub end_date: Option<String>,
    pub description: String,
}

/// Answers for the voluntary self-identification questions many forms carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiversityInfo {
    #[serde(default = "default_no")]
    pub veteran_status: String,
    #[serde(default = "default_no")]
    pub disability_status: String,
    #[serde(default = "default_undisclosed")]
    pub race_ethnicity: String,
    #[serde(default = "default_undisclosed")]
    pub gender: String,
}

fn default_no() -> String {
    "No".to_string()
}

fn default_undisclosed() -> String {
    "Prefer not to say".to_string()
}

impl Default for DiversityInfo {
    fn default() -> Self {
        Self {
            veteran_status: default_no(),
            disability_status: default_no(),
            race_ethnicity: default_undisclosed(),
            gender: default_undisclosed(),
        }
    }
}

/// Profile data submitted alongside the resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub work_history: Vec<WorkExperience>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub diversity_info: Option<DiversityInfo>,
}

/// A single failed required-field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl PersonalInfo {
    /// Check every required field and collect one error per offending field.
    ///
    /// An empty vector means the profile may advance to review.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        let required = [
            ("first_name", &self.first_name, "First name is required"),
            ("last_name", &self.last_name, "Last name is required"),
            ("address.street", &self.address.street, "Street is required"),
            ("address.city", &self.address.city, "City is required"),
            ("address.state", &self.address.state, "State is required"),
            ("address.zip_code", &self.address.zip_code, "ZIP code is required"),
        ];
        for (field, value, message) in required {
            if value.trim().is_empty() {
                errors.push(FieldError::new(field, message));
            }
        }

        let email = self.email.trim();
        if email.is_empty() {
            errors.push(FieldError::new("email", "Email is required"));
        } else if !EMAIL_RE.is_match(email) {
            errors.push(FieldError::new("email", "Email address is not valid"));
        }

        let phone = self.phone.trim();
        if phone.is_empty() {
            errors.push(FieldError::new("phone", "Phone is required"));
        } else {
            let digits = phone.chars().filter(char::is_ascii_digit).count();
            if !PHONE_RE.is_match(phone) || digits < MIN_PHONE_DIGITS {
                errors.push(FieldError::new("phone", "Phone number is not valid"));
            }
        }

        // Keep the same order as the form.
        errors.sort_by_key(|e| field_rank(e.field));
        errors
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

fn field_rank(field: &str) -> usize {
    const ORDER: &[&str] = &[
        "first_name",
        "last_name",
        "email",
        "phone",
        "address.street",
        "address.city",
        "address.state",
        "address.zip_code",
    ];
    ORDER.iter().position(|f| *f == field).unwrap_or(ORDER.len())
}

#[cfg(test)]
pub(crate) fn sample_profile(first_name: &str) -> PersonalInfo {
    PersonalInfo {
        first_name: first_name.into(),
        last_name: "Lovelace".into(),
        email: "ada@example.com".into(),
        phone: "+1-555-123-4567".into(),
        address: Address {
            street: "12 St James's Square".into(),
            city: "London".into(),
            state: "LDN".into(),
            zip_code: "SW1Y 4JH".into(),
            country: "UK".into(),
        },
        education: Vec::new(),
        work_history: Vec::new(),
        skills: vec!["Python".into(), "SQL".into()],
        diversity_info: None,
    }
}
