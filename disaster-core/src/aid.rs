//! Aid requests submitted and triaged by operators.

use crate::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Request types offered by the submission form.
pub const AID_REQUEST_TYPES: [&str; 6] = ["Medical", "Food", "Water", "Shelter", "Rescue", "Other"];

/// Offered request type matching `raw`, ignoring case and surrounding space.
pub fn canonical_request_type(raw: &str) -> Option<&'static str> {
    let raw = raw.trim();
    AID_REQUEST_TYPES
        .into_iter()
        .find(|known| known.eq_ignore_ascii_case(raw))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AidPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl AidPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            AidPriority::Low => "low",
            AidPriority::Medium => "medium",
            AidPriority::High => "high",
        }
    }
}

impl FromStr for AidPriority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "low" => Ok(AidPriority::Low),
            "medium" => Ok(AidPriority::Medium),
            "high" => Ok(AidPriority::High),
            other => Err(CoreError::InvalidInput {
                message: format!("unknown priority '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AidRequestStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl AidRequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AidRequestStatus::Pending => "pending",
            AidRequestStatus::InProgress => "in-progress",
            AidRequestStatus::Completed => "completed",
        }
    }

    /// Next triage step. Completed requests stay completed.
    pub fn advance(self) -> Self {
        match self {
            AidRequestStatus::Pending => AidRequestStatus::InProgress,
            AidRequestStatus::InProgress | AidRequestStatus::Completed => {
                AidRequestStatus::Completed
            }
        }
    }
}

impl fmt::Display for AidRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AidRequestStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(AidRequestStatus::Pending),
            "in-progress" => Ok(AidRequestStatus::InProgress),
            "completed" => Ok(AidRequestStatus::Completed),
            other => Err(CoreError::InvalidInput {
                message: format!("unknown request status '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AidRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub request_type: String,
    pub location: String,
    pub description: String,
    pub priority: AidPriority,
    pub status: AidRequestStatus,
    pub created_at: DateTime<Utc>,
}

/// Operator input for a new aid request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AidRequestForm {
    pub request_type: String,
    pub location: String,
    pub description: String,
    #[serde(default)]
    pub priority: AidPriority,
}

impl AidRequestForm {
    pub fn new(
        request_type: impl Into<String>,
        location: impl Into<String>,
        description: impl Into<String>,
        priority: AidPriority,
    ) -> Self {
        Self {
            request_type: request_type.into(),
            location: location.into(),
            description: description.into(),
            priority,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        for (field, value) in [
            ("type", &self.request_type),
            ("location", &self.location),
            ("description", &self.description),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::InvalidInput {
                    message: format!("aid request {field} must not be empty"),
                });
            }
        }
        if canonical_request_type(&self.request_type).is_none() {
            return Err(CoreError::InvalidInput {
                message: format!(
                    "unknown aid request type '{}' (expected one of {})",
                    self.request_type.trim(),
                    AID_REQUEST_TYPES.join(", ")
                ),
            });
        }
        Ok(())
    }

    /// Validates the form and turns it into a pending request.
    pub fn into_request(self) -> Result<AidRequest, CoreError> {
        self.validate()?;
        Ok(AidRequest {
            id: Uuid::new_v4().to_string(),
            request_type: canonical_request_type(&self.request_type)
                .unwrap_or("Other")
                .to_string(),
            location: self.location.trim().to_string(),
            description: self.description.trim().to_string(),
            priority: self.priority,
            status: AidRequestStatus::Pending,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_creates_pending_request() {
        let form = AidRequestForm::new(
            "Medical",
            " Yangon, Myanmar ",
            "Need medical supplies for local clinic",
            AidPriority::High,
        );
        let request = form.into_request().unwrap();
        assert_eq!(request.status, AidRequestStatus::Pending);
        assert_eq!(request.location, "Yangon, Myanmar");
        assert_eq!(request.priority, AidPriority::High);
        assert!(!request.id.is_empty());
    }

    #[test]
    fn test_form_rejects_blank_fields() {
        let form = AidRequestForm::new("Food", "Mandalay", "   ", AidPriority::Medium);
        let err = form.into_request().unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput { message } if message.contains("description")));
    }

    #[test]
    fn test_form_normalizes_request_type() {
        let request = AidRequestForm::new(" shelter ", "Sagaing", "Tents", AidPriority::Low)
            .into_request()
            .unwrap();
        assert_eq!(request.request_type, "Shelter");

        let err = AidRequestForm::new("Helicopter", "Sagaing", "Airlift", AidPriority::High)
            .into_request()
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput { message } if message.contains("Helicopter")));
    }

    #[test]
    fn test_status_advance() {
        assert_eq!(AidRequestStatus::Pending.advance(), AidRequestStatus::InProgress);
        assert_eq!(AidRequestStatus::InProgress.advance(), AidRequestStatus::Completed);
        assert_eq!(AidRequestStatus::Completed.advance(), AidRequestStatus::Completed);
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&AidRequestStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        assert_eq!(
            "in-progress".parse::<AidRequestStatus>().unwrap(),
            AidRequestStatus::InProgress
        );
        assert!("done".parse::<AidRequestStatus>().is_err());
        assert_eq!(AidPriority::default(), AidPriority::Medium);
    }
}
