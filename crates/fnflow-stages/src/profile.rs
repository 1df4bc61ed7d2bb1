//! User record cleaning: trim, validate, normalize phone, mask email.
//!
//! The transformations are plain functions. [`profile_pipeline`] runs them as
//! named steps; [`process_user`] and [`transform_user`] glue them together
//! with `pipe`/`compose` for callers that do not need a run report.
use fnflow_core::pipeline::Stages;
use fnflow_core::{compose, pipe, step_fn, Pipeline, StepError, StepResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_LOCAL_PART: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*)@(.*)$").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUser {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// A cleaned record with the id dropped and the email masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedUser {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Trims every field. A blank phone becomes `None`.
pub fn clean(user: RawUser) -> RawUser {
    RawUser {
        id: user.id.trim().to_string(),
        name: user.name.trim().to_string(),
        email: user.email.trim().to_string(),
        phone: user
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
    }
}

pub fn validate(user: RawUser) -> StepResult<RawUser> {
    if user.id.is_empty() {
        return Err(StepError::invalid_input("ID is required"));
    }
    if user.name.is_empty() {
        return Err(StepError::invalid_input("Name is required"));
    }
    if user.email.is_empty() {
        return Err(StepError::invalid_input("Email is required"));
    }
    if !user.email.contains('@') {
        return Err(StepError::invalid_input("Email is invalid"));
    }
    Ok(user)
}

/// Keeps only the digits of the phone number.
pub fn format_phone(user: RawUser) -> RawUser {
    let phone = user
        .phone
        .as_deref()
        .map(|p| p.chars().filter(char::is_ascii_digit).collect());
    RawUser { phone, ..user }
}

/// Replaces everything before the `@` with `****` and drops the id.
///
/// An email without `@` is masked whole; [`validate`] rejects those first.
pub fn mask(user: RawUser) -> MaskedUser {
    let email = if EMAIL_LOCAL_PART.is_match(&user.email) {
        EMAIL_LOCAL_PART
            .replace(&user.email, "****@$2")
            .into_owned()
    } else {
        "****".to_string()
    };
    MaskedUser {
        email,
        name: user.name,
        phone: user.phone.unwrap_or_default(),
    }
}

/// Left to right: clean, validate, then format and mask.
pub fn process_user(user: RawUser) -> StepResult<MaskedUser> {
    validate(clean(user)).map(pipe(format_phone, mask))
}

/// Right to left composition of the same chain as [`process_user`].
pub fn transform_user() -> impl Fn(RawUser) -> StepResult<MaskedUser> {
    compose(
        |validated: StepResult<RawUser>| validated.map(compose(mask, format_phone)),
        compose(validate, clean),
    )
}

/// The chain as named pipeline steps, for runs that want a report.
pub fn profile_pipeline() -> Pipeline<RawUser, impl Stages<RawUser, Output = MaskedUser>> {
    Pipeline::start(step_fn("profile.clean", |user: RawUser| Ok(clean(user))))
        .then(step_fn("profile.validate", validate))
        .then(step_fn("profile.format_phone", |user: RawUser| {
            Ok(format_phone(user))
        }))
        .then(step_fn("profile.mask", |user: RawUser| Ok(mask(user))))
}
