//! Input-format validation for request bodies.
//!
//! Every check runs and all failures are reported together as one
//! [`ServiceError::Validation`].

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::errors::{ServiceError, ServiceResult};
use crate::model::{ProfileInput, ProfileLinks};

pub const FIRST_NAME_EMPTY: &str = "Please provide your first name.";
pub const LAST_NAME_EMPTY: &str = "Please provide your last name.";
pub const EMAIL_EMPTY: &str = "Please provide your email address.";
pub const EMAIL_INVALID: &str = "The email address you have provided is not valid.";
pub const PASSWORD_EMPTY: &str = "Please provide a password.";
pub const CONFIRM_PASSWORD_EMPTY: &str = "Please provide a confirmation password.";
pub const PASSWORD_NOT_LONG_ENOUGH: &str = "Your password must be at least 8 characters long.";
pub const PASSWORDS_NOT_MATCHING: &str =
    "The password and confirmation passwords have to be matching.";

pub const PROFILE_PICTURE_INVALID: &str = "The provided profile picture URL is not valid.";
pub const WEBSITE_INVALID: &str = "The provided personal website URL is not valid.";
pub const GITHUB_INVALID: &str = "The provided GitHub URL is not valid.";
pub const LINKEDIN_INVALID: &str = "The provided LinkedIn URL is not valid.";
pub const STACKOVERFLOW_INVALID: &str = "The provided StackOverflow URL is not valid.";
pub const DEV_INVALID: &str = "The provided dev.to URL is not valid.";

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// An account edit. Leaving `password` out (or empty) keeps the current one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditAccountRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

impl EditAccountRequest {
    /// The replacement password, if one was actually submitted
    pub fn new_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

#[derive(Default)]
struct Failures(Vec<String>);

impl Failures {
    fn check(&mut self, ok: bool, message: &str) {
        if !ok {
            self.0.push(message.to_string());
        }
    }

    fn finish(self) -> ServiceResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self.0))
        }
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

fn check_names(failures: &mut Failures, first_name: &str, last_name: &str) {
    failures.check(!first_name.trim().is_empty(), FIRST_NAME_EMPTY);
    failures.check(!last_name.trim().is_empty(), LAST_NAME_EMPTY);
}

fn check_email(failures: &mut Failures, email: &str) {
    if email.trim().is_empty() {
        failures.check(false, EMAIL_EMPTY);
    } else {
        failures.check(is_valid_email(email), EMAIL_INVALID);
    }
}

fn check_new_password(failures: &mut Failures, password: &str, confirm: Option<&str>) {
    failures.check(
        password.chars().count() >= MIN_PASSWORD_LENGTH,
        PASSWORD_NOT_LONG_ENOUGH,
    );
    if let Some(confirm) = confirm.filter(|c| !c.is_empty()) {
        failures.check(password == confirm, PASSWORDS_NOT_MATCHING);
    }
}

impl RegisterRequest {
    pub fn validate(&self) -> ServiceResult<()> {
        let mut failures = Failures::default();

        check_names(&mut failures, &self.first_name, &self.last_name);
        check_email(&mut failures, &self.email);

        if self.password.is_empty() {
            failures.check(false, PASSWORD_EMPTY);
        } else {
            check_new_password(&mut failures, &self.password, Some(&self.confirm_password));
        }
        failures.check(!self.confirm_password.is_empty(), CONFIRM_PASSWORD_EMPTY);

        failures.finish()
    }
}

impl LoginRequest {
    pub fn validate(&self) -> ServiceResult<()> {
        let mut failures = Failures::default();

        check_email(&mut failures, &self.email);
        failures.check(!self.password.is_empty(), PASSWORD_EMPTY);

        failures.finish()
    }
}

impl EditAccountRequest {
    pub fn validate(&self) -> ServiceResult<()> {
        let mut failures = Failures::default();

        check_names(&mut failures, &self.first_name, &self.last_name);
        check_email(&mut failures, &self.email);

        if let Some(password) = self.new_password() {
            check_new_password(&mut failures, password, self.confirm_password.as_deref());
        }

        failures.finish()
    }
}

/// `host` itself or any subdomain of it
fn host_matches(url: &Url, host: &str) -> bool {
    url.host_str().is_some_and(|h| {
        let h = h.trim_start_matches("www.");
        h == host || h.ends_with(&format!(".{}", host))
    })
}

fn parse_web_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Some(url),
        _ => None,
    }
}

fn check_link(failures: &mut Failures, link: &Option<String>, site: Option<&str>, message: &str) {
    let Some(raw) = link else {
        return;
    };

    let valid = match (parse_web_url(raw), site) {
        (Some(url), Some(site)) => host_matches(&url, site),
        (Some(_), None) => true,
        (None, _) => false,
    };
    failures.check(valid, message);
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trims the profile input, drops empty links, then validates every link
pub fn validate_profile_input(input: ProfileInput) -> ServiceResult<ProfileInput> {
    let links = input.links;
    let input = ProfileInput {
        links: ProfileLinks {
            profile_picture: blank_to_none(links.profile_picture),
            website: blank_to_none(links.website),
            github: blank_to_none(links.github),
            linkedin: blank_to_none(links.linkedin),
            dev: blank_to_none(links.dev),
            stackoverflow: blank_to_none(links.stackoverflow),
        },
        biography: input.biography.trim().to_string(),
    };

    let mut failures = Failures::default();
    let links = &input.links;
    check_link(&mut failures, &links.profile_picture, None, PROFILE_PICTURE_INVALID);
    check_link(&mut failures, &links.website, None, WEBSITE_INVALID);
    check_link(&mut failures, &links.github, Some("github.com"), GITHUB_INVALID);
    check_link(&mut failures, &links.linkedin, Some("linkedin.com"), LINKEDIN_INVALID);
    check_link(&mut failures, &links.stackoverflow, Some("stackoverflow.com"), STACKOVERFLOW_INVALID);
    check_link(&mut failures, &links.dev, Some("dev.to"), DEV_INVALID);
    failures.finish()?;

    Ok(input)
}
