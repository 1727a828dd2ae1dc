//! Input validation for lead forms and account credentials
//!
//! Validators collect every field problem into [`FieldErrors`] instead of
//! stopping at the first one.

use uuid::Uuid;

use crate::error::{FieldErrors, Result};
use crate::models::{CreateAgentRequest, LeadForm, SignupRequest};

const NAME_MAX_LEN: usize = 20;
const AGE_MAX: i64 = 150;
const USERNAME_MAX_LEN: usize = 150;
const PASSWORD_MIN_LEN: usize = 8;
const ORGANISATION_MAX_LEN: usize = 100;

const REQUIRED: &str = "This field is required.";

/// A lead form that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadFields {
    pub first_name: String,
    pub last_name: String,
    pub age: i64,
    pub agent_id: Option<Uuid>,
}

impl LeadForm {
    /// Check the form fields. Agent membership is checked by the caller,
    /// which reports it through [`invalid_agent`].
    pub fn validate(self) -> Result<LeadFields> {
        let mut errors = FieldErrors::new();

        let first_name = clean_name(&self.first_name, "first_name", &mut errors);
        let last_name = clean_name(&self.last_name, "last_name", &mut errors);

        if self.age < 0 {
            errors.add("age", "Ensure this value is greater than or equal to 0.");
        } else if self.age > AGE_MAX {
            errors.add(
                "age",
                format!("Ensure this value is less than or equal to {}.", AGE_MAX),
            );
        }

        errors.into_result()?;

        Ok(LeadFields {
            first_name,
            last_name,
            age: self.age,
            agent_id: self.agent_id,
        })
    }
}

fn clean_name(value: &str, field: &str, errors: &mut FieldErrors) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, REQUIRED);
    } else if trimmed.chars().count() > NAME_MAX_LEN {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                NAME_MAX_LEN,
                trimmed.chars().count()
            ),
        );
    }
    trimmed.to_string()
}

/// Error for an agent id outside the organisation
pub fn invalid_agent() -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.add(
        "agent_id",
        "Select a valid choice. That choice is not one of the available choices.",
    );
    errors
}

fn check_username(username: &str, errors: &mut FieldErrors) {
    if username.is_empty() {
        errors.add("username", REQUIRED);
        return;
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        errors.add(
            "username",
            format!(
                "Ensure this value has at most {} characters.",
                USERNAME_MAX_LEN
            ),
        );
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

fn check_password(field: &str, password: &str, username: &str, errors: &mut FieldErrors) {
    if password.is_empty() {
        errors.add(field, REQUIRED);
        return;
    }
    if password.chars().count() < PASSWORD_MIN_LEN {
        errors.add(
            field,
            format!(
                "This password is too short. It must contain at least {} characters.",
                PASSWORD_MIN_LEN
            ),
        );
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        errors.add(field, "This password is entirely numeric.");
    }
    if !username.is_empty() && password.eq_ignore_ascii_case(username) {
        errors.add(field, "The password is too similar to the username.");
    }
}

impl SignupRequest {
    /// Validate and return the trimmed username and organisation name
    pub fn validate(&self) -> Result<(String, String)> {
        let mut errors = FieldErrors::new();
        let username = self.username.trim();

        check_username(username, &mut errors);
        check_password("password1", &self.password1, username, &mut errors);
        if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        let organisation = self
            .organisation
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(username);
        if organisation.chars().count() > ORGANISATION_MAX_LEN {
            errors.add(
                "organisation",
                format!(
                    "Ensure this value has at most {} characters.",
                    ORGANISATION_MAX_LEN
                ),
            );
        }

        errors.into_result()?;
        Ok((username.to_string(), organisation.to_string()))
    }
}

impl CreateAgentRequest {
    /// Validate and return the trimmed username
    pub fn validate(&self) -> Result<String> {
        let mut errors = FieldErrors::new();
        let username = self.username.trim();

        check_username(username, &mut errors);
        check_password("password", &self.password, username, &mut errors);

        errors.into_result()?;
        Ok(username.to_string())
    }
}
