//! Request validation. Each field has its own check returning the cleaned
//! value or its error messages; the `validate_*` functions compose them
//! into a typed input or a `FieldErrors` map before anything is persisted.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::NaiveDate;
use regex::Regex;

use pulse_types::api::{CreatePostRequest, ImageUpload, SignupRequest, UpdateProfileRequest};
use pulse_types::models::ReactionAction;

use crate::error::FieldErrors;
use crate::media::{MAX_POST_IMAGE_SIZE, MAX_PROFILE_PICTURE_SIZE, ValidatedImage};

pub type FieldResult<T> = Result<T, Vec<String>>;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const EMAIL_TAKEN: &str = "This email is already registered.";

const MIN_PASSWORD_LEN: usize = 8;
const MAX_FULL_NAME_LEN: usize = 255;
const MAX_DESCRIPTION_LEN: usize = 5000;
const MAX_COMMENT_LEN: usize = 2000;
const MIN_SIGNUP_AGE_YEARS: f64 = 13.0;

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "12345678", "123456789", "1234567890",
    "qwerty123", "qwertyuiop", "iloveyou", "sunshine", "princess", "football",
    "baseball", "welcome1", "abc12345", "letmein1", "trustno1", "superman",
];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("email pattern compiles")
});

fn fail<T>(message: impl Into<String>) -> FieldResult<T> {
    Err(vec![message.into()])
}

pub fn required(value: Option<&str>) -> FieldResult<&str> {
    match value {
        None => fail(REQUIRED),
        Some(v) if v.trim().is_empty() => fail(BLANK),
        Some(v) => Ok(v),
    }
}

/// Trimmed and lower-cased.
pub fn email(value: Option<&str>) -> FieldResult<String> {
    let value = required(value)?.trim();
    if !EMAIL_RE.is_match(value) {
        return fail("Enter a valid email address.");
    }
    Ok(value.to_lowercase())
}

/// Reports every rule the password breaks, not just the first.
pub fn password(value: Option<&str>) -> FieldResult<String> {
    let value = required(value)?;
    let mut problems = Vec::new();

    if value.chars().count() < MIN_PASSWORD_LEN {
        problems.push(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LEN} characters."
        ));
    }
    if value.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }
    if COMMON_PASSWORDS.contains(&value.to_lowercase().as_str()) {
        problems.push("This password is too common.".to_string());
    }

    if problems.is_empty() {
        Ok(value.to_string())
    } else {
        Err(problems)
    }
}

pub fn password_confirm(password: Option<&str>, confirm: Option<&str>) -> FieldResult<()> {
    let confirm = required(confirm)?;
    match password {
        Some(password) if password != confirm => fail("Password fields didn't match."),
        _ => Ok(()),
    }
}

pub fn full_name(value: Option<&str>) -> FieldResult<String> {
    let value = required(value)?.trim();
    if value.chars().count() > MAX_FULL_NAME_LEN {
        return fail(format!(
            "Ensure this field has no more than {MAX_FULL_NAME_LEN} characters."
        ));
    }
    Ok(value.to_string())
}

/// `YYYY-MM-DD`, not in the future. `min_age` applies only at signup.
pub fn date_of_birth(
    value: Option<&str>,
    today: NaiveDate,
    min_age: bool,
) -> FieldResult<NaiveDate> {
    let value = required(value)?.trim();
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| fail("Date has wrong format. Use one of these formats instead: YYYY-MM-DD."))?;

    if date > today {
        return fail("Date of birth cannot be in the future.");
    }

    let age_years = (today - date).num_days() as f64 / 365.25;
    if min_age && age_years < MIN_SIGNUP_AGE_YEARS {
        return fail("You must be at least 13 years old to register.");
    }

    Ok(date)
}

/// Accepts `jpg`, `jpeg` and `png`; the bytes must carry a matching
/// signature. A `data:` URL prefix on the payload is tolerated.
pub fn image(upload: &ImageUpload, max_bytes: usize) -> FieldResult<ValidatedImage> {
    const INVALID: &str = "Upload a valid image. The file you uploaded was either not an image \
                           or a corrupted image.";

    let extension = upload
        .filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let extension = match extension.as_str() {
        "jpg" => "jpg",
        "jpeg" => "jpeg",
        "png" => "png",
        other => {
            return fail(format!(
                "File extension \"{other}\" is not allowed. Allowed extensions are: jpg, jpeg, png."
            ));
        }
    };

    let payload = upload
        .data
        .split_once("base64,")
        .map_or(upload.data.as_str(), |(_, data)| data);
    let bytes = B64.decode(payload.trim()).or_else(|_| fail(INVALID))?;

    if bytes.is_empty() {
        return fail("The submitted file is empty.");
    }
    if bytes.len() > max_bytes {
        return fail(format!(
            "Image file size cannot exceed {}MB.",
            max_bytes / (1024 * 1024)
        ));
    }

    let signature_ok = match extension {
        "png" => bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
        _ => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
    };
    if !signature_ok {
        return fail(INVALID);
    }

    Ok(ValidatedImage { extension, bytes })
}

/// Trimmed, non-empty, bounded.
pub fn description(value: Option<&str>) -> FieldResult<String> {
    let value = required(value)?.trim();
    if value.chars().count() > MAX_DESCRIPTION_LEN {
        return fail("Description cannot exceed 5000 characters.");
    }
    Ok(value.to_string())
}

pub fn comment_body(value: Option<&str>) -> FieldResult<String> {
    let value = required(value)?.trim();
    if value.chars().count() > MAX_COMMENT_LEN {
        return fail(format!(
            "Ensure this field has no more than {MAX_COMMENT_LEN} characters."
        ));
    }
    Ok(value.to_string())
}

/// Only `like` and `dislike` are choices; `none` is reached by toggling.
pub fn action(value: Option<&str>) -> FieldResult<ReactionAction> {
    let value = required(value)?;
    value
        .parse()
        .or_else(|_| fail(format!("\"{value}\" is not a valid choice.")))
}

// -- Composed checks --

#[cfg_attr(test, derive(Debug))]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub profile_picture: Option<ValidatedImage>,
}

pub fn validate_signup(req: &SignupRequest, today: NaiveDate) -> Result<SignupInput, FieldErrors> {
    let mut errors = FieldErrors::new();

    let email = errors.check("email", email(req.email.as_deref()));
    let password = errors.check("password", password(req.password.as_deref()));
    errors.check(
        "password_confirm",
        password_confirm(req.password.as_deref(), req.password_confirm.as_deref()),
    );
    let full_name = errors.check("full_name", full_name(req.full_name.as_deref()));
    let date_of_birth = errors.check(
        "date_of_birth",
        date_of_birth(req.date_of_birth.as_deref(), today, true),
    );
    let profile_picture = match &req.profile_picture {
        Some(upload) => errors
            .check("profile_picture", image(upload, MAX_PROFILE_PICTURE_SIZE))
            .map(Some),
        None => Some(None),
    };

    match (email, password, full_name, date_of_birth, profile_picture) {
        (Some(email), Some(password), Some(full_name), Some(date_of_birth), Some(profile_picture))
            if errors.is_empty() =>
        {
            Ok(SignupInput {
                email,
                password,
                full_name,
                date_of_birth,
                profile_picture,
            })
        }
        _ => Err(errors),
    }
}

#[derive(Default)]
#[cfg_attr(test, derive(Debug))]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub profile_picture: Option<ValidatedImage>,
}

/// Absent fields stay unchanged; present ones must be valid.
pub fn validate_profile_update(
    req: &UpdateProfileRequest,
    today: NaiveDate,
) -> Result<ProfileChanges, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut changes = ProfileChanges::default();

    if req.full_name.is_some() {
        changes.full_name = errors.check("full_name", full_name(req.full_name.as_deref()));
    }
    if req.date_of_birth.is_some() {
        changes.date_of_birth = errors.check(
            "date_of_birth",
            date_of_birth(req.date_of_birth.as_deref(), today, false),
        );
    }
    if let Some(upload) = &req.profile_picture {
        changes.profile_picture =
            errors.check("profile_picture", image(upload, MAX_PROFILE_PICTURE_SIZE));
    }

    if errors.is_empty() { Ok(changes) } else { Err(errors) }
}

pub struct PostInput {
    pub description: String,
    pub image: Option<ValidatedImage>,
}

pub fn validate_post(req: &CreatePostRequest) -> Result<PostInput, FieldErrors> {
    let mut errors = FieldErrors::new();

    let description = errors.check("description", description(req.description.as_deref()));
    let image = match &req.image {
        Some(upload) => errors.check("image", image(upload, MAX_POST_IMAGE_SIZE)).map(Some),
        None => Some(None),
    };

    match (description, image) {
        (Some(description), Some(image)) if errors.is_empty() => {
            Ok(PostInput { description, image })
        }
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn signup() -> SignupRequest {
        SignupRequest {
            email: Some("  Someone@Example.COM ".into()),
            password: Some("correct-horse".into()),
            password_confirm: Some("correct-horse".into()),
            full_name: Some("Some One".into()),
            date_of_birth: Some("1990-05-01".into()),
            profile_picture: None,
        }
    }

    #[test]
    fn valid_signup_is_normalized() {
        let input = validate_signup(&signup(), today()).unwrap();
        assert_eq!(input.email, "someone@example.com");
        assert_eq!(input.date_of_birth, NaiveDate::from_ymd_opt(1990, 5, 1).unwrap());
        assert!(input.profile_picture.is_none());
    }

    #[test]
    fn signup_collects_errors_per_field() {
        let req = SignupRequest {
            email: Some("not-an-email".into()),
            password: Some("1234".into()),
            password_confirm: Some("12345".into()),
            full_name: None,
            date_of_birth: Some("2020-01-01".into()),
            profile_picture: None,
        };

        let errors = validate_signup(&req, today()).unwrap_err();
        assert_eq!(errors.get("email").unwrap(), ["Enter a valid email address."]);
        assert_eq!(errors.get("password").unwrap().len(), 2);
        assert_eq!(errors.get("password_confirm").unwrap(), ["Password fields didn't match."]);
        assert_eq!(errors.get("full_name").unwrap(), [REQUIRED]);
        assert_eq!(
            errors.get("date_of_birth").unwrap(),
            ["You must be at least 13 years old to register."]
        );
    }

    #[test]
    fn mismatched_confirmation_alone_fails() {
        let req = SignupRequest {
            password_confirm: Some("different-horse".into()),
            ..signup()
        };
        let errors = validate_signup(&req, today()).unwrap_err();
        assert!(errors.get("password_confirm").is_some());
        assert!(errors.get("password").is_none());
    }

    #[test]
    fn future_birth_date_rejected_everywhere() {
        assert!(date_of_birth(Some("2030-01-01"), today(), false).is_err());
        assert!(date_of_birth(Some("2030-01-01"), today(), true).is_err());
        assert!(date_of_birth(Some("19-01-1990"), today(), false).is_err());
        // recent dates are fine outside signup
        assert!(date_of_birth(Some("2020-01-01"), today(), false).is_ok());
    }

    #[test]
    fn common_and_numeric_passwords() {
        assert_eq!(password(Some("Password123")).unwrap_err(), ["This password is too common."]);
        assert_eq!(
            password(Some("98765432")).unwrap_err(),
            ["This password is entirely numeric."]
        );
        assert!(password(Some("a decent passphrase")).is_ok());
    }

    #[test]
    fn description_is_trimmed_and_bounded() {
        assert_eq!(description(Some("  hi  ")).unwrap(), "hi");
        assert_eq!(description(Some("   ")).unwrap_err(), [BLANK]);
        assert!(description(Some("x".repeat(5001).as_str())).is_err());
    }

    #[test]
    fn action_choices() {
        assert_eq!(action(Some("like")).unwrap(), ReactionAction::Like);
        assert_eq!(action(Some("none")).unwrap_err(), ["\"none\" is not a valid choice."]);
        assert_eq!(action(None).unwrap_err(), [REQUIRED]);
    }

    #[test]
    fn image_checks() {
        let png = ImageUpload {
            filename: "me.PNG".into(),
            data: B64.encode(PNG),
        };
        let ok = image(&png, MAX_PROFILE_PICTURE_SIZE).unwrap();
        assert_eq!(ok.extension, "png");
        assert_eq!(ok.bytes, PNG);

        let data_url = ImageUpload {
            data: format!("data:image/png;base64,{}", B64.encode(PNG)),
            ..png.clone()
        };
        assert!(image(&data_url, MAX_PROFILE_PICTURE_SIZE).is_ok());

        let gif = ImageUpload {
            filename: "me.gif".into(),
            ..png.clone()
        };
        assert!(image(&gif, MAX_PROFILE_PICTURE_SIZE).is_err());

        let mislabeled = ImageUpload {
            filename: "me.jpg".into(),
            ..png.clone()
        };
        assert!(image(&mislabeled, MAX_PROFILE_PICTURE_SIZE).is_err());

        let too_big = image(&png, 4);
        assert!(too_big.is_err());
    }

    #[test]
    fn profile_update_only_checks_present_fields() {
        let changes = validate_profile_update(&UpdateProfileRequest::default(), today()).unwrap();
        assert!(changes.full_name.is_none() && changes.date_of_birth.is_none());

        let req = UpdateProfileRequest {
            full_name: Some("   ".into()),
            ..Default::default()
        };
        let errors = validate_profile_update(&req, today()).unwrap_err();
        assert_eq!(errors.get("full_name").unwrap(), [BLANK]);
    }
}
