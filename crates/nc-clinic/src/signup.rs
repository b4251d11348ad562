//! Sign-up form validation and submission
//!
//! Rules run in form order and the first failure is reported. A successful
//! registration signs the new identity in and lands on the dashboard.

use nc_core::{AuthError, Role, Sex, SignUpMetadata, SignUpRequest};
use nc_shell::{Route, Session, SessionManager, ShellError};
use regex::Regex;
use std::sync::LazyLock;

/// Shown when the e-mail already has an account
pub const ALREADY_REGISTERED: &str = "This email is already registered. Please sign in instead.";

/// Shortest accepted name
pub const MIN_NAME_CHARS: usize = 2;
/// Shortest accepted password
pub const MIN_PASSWORD_CHARS: usize = 6;
/// Earliest accepted birth year
pub const MIN_BIRTH_YEAR: i32 = 1900;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+'-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").expect("email regex is valid")
});

/// Sign-up failure, displayed as the message shown to the user
#[derive(Debug, thiserror::Error)]
pub enum SignupError {
    /// A validation rule failed
    #[error("{0}")]
    Invalid(String),

    #[error("This email is already registered. Please sign in instead.")]
    AlreadyRegistered,

    /// Identity backend refused for another reason
    #[error("{0}")]
    Rejected(#[source] ShellError),
}

impl SignupError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

impl From<ShellError> for SignupError {
    fn from(err: ShellError) -> Self {
        match err {
            ShellError::Auth(AuthError::AlreadyRegistered(_)) => Self::AlreadyRegistered,
            other => Self::Rejected(other),
        }
    }
}

/// Raw sign-up form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupForm {
    /// Full name, at least two characters
    pub name: String,
    /// Contact e-mail, also the login
    pub email: String,
    /// At least six characters
    pub password: String,
    /// Must equal `password`
    pub confirm_password: String,
    /// `patient` or `clinician`
    pub role: String,
    /// Patients only
    pub birth_year: Option<i32>,
    /// `M` or `F`; patients only
    pub sex: Option<String>,
}

impl SignupForm {
    /// Validate against `current_year` and build the identity request
    pub fn validate(&self, current_year: i32) -> Result<SignUpRequest, SignupError> {
        if self.name.chars().count() < MIN_NAME_CHARS {
            return Err(SignupError::invalid("Name must be at least 2 characters"));
        }
        if !EMAIL.is_match(&self.email) {
            return Err(SignupError::invalid("Please enter a valid email"));
        }
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(SignupError::invalid("Password must be at least 6 characters"));
        }
        if self.password != self.confirm_password {
            return Err(SignupError::invalid("Passwords don't match"));
        }
        let role = match self.role.as_str() {
            "patient" => Role::Patient,
            "clinician" => Role::Clinician,
            _ => return Err(SignupError::invalid("Role must be patient or clinician")),
        };
        if let Some(year) = self.birth_year {
            if !(MIN_BIRTH_YEAR..=current_year).contains(&year) {
                return Err(SignupError::invalid(format!(
                    "Birth year must be between {MIN_BIRTH_YEAR} and {current_year}"
                )));
            }
        }
        let sex = match self.sex.as_deref() {
            None => None,
            Some(raw) => Some(
                raw.parse::<Sex>()
                    .map_err(|_| SignupError::invalid("Sex must be M or F"))?,
            ),
        };
        if role == Role::Patient && (self.birth_year.is_none() || sex.is_none()) {
            return Err(SignupError::invalid("Birth year and sex are required for patients"));
        }

        // demographics only travel with patient accounts
        let (birth_year, sex) = match role {
            Role::Patient => (self.birth_year, sex),
            _ => (None, None),
        };
        Ok(SignUpRequest {
            email: self.email.clone(),
            password: self.password.clone(),
            metadata: SignUpMetadata {
                name: self.name.clone(),
                role,
                birth_year,
                sex,
            },
        })
    }
}

/// Successful registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupSuccess {
    /// Resolved session of the new account
    pub session: Session,
    /// Where the caller navigates next
    pub redirect: Route,
}

/// Validate, register and resolve the new session
pub async fn submit(
    session: &SessionManager,
    form: &SignupForm,
    current_year: i32,
) -> Result<SignupSuccess, SignupError> {
    let request = form.validate(current_year)?;
    let role = request.metadata.role;
    match session.sign_up(request).await {
        Ok(resolved) => {
            tracing::info!(%role, "sign-up complete");
            Ok(SignupSuccess {
                session: resolved,
                redirect: Route::LANDING,
            })
        }
        Err(err) => {
            tracing::warn!(%err, "sign-up rejected");
            Err(err.into())
        }
    }
}
