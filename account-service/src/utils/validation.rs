use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use service_core::error::{AppError, FieldErrors};
use std::{collections::HashMap, sync::Arc};
use validator::{Validate, ValidationError};

pub const TAG_REQUIRED: &str = "required";
pub const TAG_EMAIL: &str = "email";
pub const TAG_MIN: &str = "min";
pub const TAG_MAX: &str = "max";
pub const TAG_RT_RW: &str = "rt_rw";
pub const TAG_POSTAL_CODE: &str = "postal_code";

const FALLBACK_TEMPLATE: &str = "{field} is invalid";

/// JSON body extractor whose rejection is an [`AppError::BadRequest`].
///
/// Constraint checks run later, in the service, against the message catalog.
pub struct JsonPayload<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for JsonPayload<T>
where
    T: DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| {
                tracing::debug!(error = %e, "Rejected request body");
                AppError::BadRequest(anyhow::anyhow!("Invalid request body: {}", e.body_text()))
            })?;

        Ok(JsonPayload(value))
    }
}

/// Path parameter extractor with the same JSON rejection as [`JsonPayload`].
pub struct PathParam<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e: PathRejection| {
                tracing::debug!(error = %e, "Rejected path parameter");
                AppError::BadRequest(anyhow::anyhow!("Invalid path parameter: {}", e.body_text()))
            })?;

        Ok(PathParam(value))
    }
}

/// A validatable request whose wire names may differ from its Rust field names.
pub trait ValidatedRequest: Validate {
    fn wire_name(field: &str) -> &str {
        field
    }
}

/// Message templates keyed by constraint tag. `{field}` and `{param}` are
/// substituted when rendering.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    templates: HashMap<&'static str, &'static str>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        let templates = HashMap::from([
            (TAG_REQUIRED, "{field} is required"),
            (TAG_EMAIL, "{field} must be a valid email address"),
            (TAG_MIN, "{field} must be at least {param} characters"),
            (TAG_MAX, "{field} must be at most {param} characters"),
            (TAG_RT_RW, "{field} must be exactly 3 digits"),
            (
                TAG_POSTAL_CODE,
                "{field} must be a 5 digit postal code not starting with 0",
            ),
        ]);
        Self { templates }
    }
}

impl MessageCatalog {
    pub fn render(&self, tag: &str, field: &str, param: Option<&str>) -> String {
        let template = self.templates.get(tag).copied().unwrap_or(FALLBACK_TEMPLATE);
        template
            .replace("{field}", field)
            .replace("{param}", param.unwrap_or_default())
    }
}

/// Runs derive-declared constraints and renders every violation through the
/// catalog.
#[derive(Debug, Clone, Default)]
pub struct RequestValidator {
    catalog: Arc<MessageCatalog>,
}

impl RequestValidator {
    pub fn new(catalog: MessageCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }

    pub fn check<T: ValidatedRequest>(&self, request: &T) -> Result<(), FieldErrors> {
        let Err(errors) = request.validate() else {
            return Ok(());
        };

        let mut fields = FieldErrors::new();
        for (field, field_errors) in errors.field_errors() {
            let Some(first) = field_errors.first() else {
                continue;
            };
            let name = T::wire_name(&field);
            let (tag, param) = classify(first);
            fields.insert(
                name.to_string(),
                self.catalog.render(tag, name, param.as_deref()),
            );
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(fields)
        }
    }
}

/// Map a validator error to a catalog tag and its parameter.
///
/// Length violations become `required` when the value is empty, `min` when it
/// is shorter than the minimum, otherwise `max`. An empty email is `required`.
fn classify(error: &ValidationError) -> (&'static str, Option<String>) {
    let value = error.params.get("value").and_then(Value::as_str);
    let empty = value.is_some_and(str::is_empty);
    let param = |key: &str| error.params.get(key).map(render_param);

    match &*error.code {
        "length" => {
            if empty {
                return (TAG_REQUIRED, None);
            }
            let len = value.map(|v| v.chars().count() as u64).unwrap_or_default();
            let min = error.params.get("min").and_then(Value::as_u64);
            match min {
                Some(min) if len < min => (TAG_MIN, param("min")),
                _ => (TAG_MAX, param("max")),
            }
        }
        "email" if empty => (TAG_REQUIRED, None),
        "email" => (TAG_EMAIL, None),
        TAG_REQUIRED => (TAG_REQUIRED, None),
        TAG_RT_RW => (TAG_RT_RW, None),
        TAG_POSTAL_CODE => (TAG_POSTAL_CODE, None),
        _ => ("", None),
    }
}

fn render_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// RT/RW neighbourhood code: exactly three ASCII digits.
pub fn is_valid_rt_rw(value: &str) -> bool {
    value.len() == 3 && value.bytes().all(|b| b.is_ascii_digit())
}

/// Postal code: five ASCII digits, the first non-zero.
pub fn is_valid_postal_code(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 5 && bytes[0] != b'0' && bytes.iter().all(u8::is_ascii_digit)
}

pub fn validate_rt_rw(value: &str) -> Result<(), ValidationError> {
    check_custom(value, is_valid_rt_rw, TAG_RT_RW)
}

pub fn validate_postal_code(value: &str) -> Result<(), ValidationError> {
    check_custom(value, is_valid_postal_code, TAG_POSTAL_CODE)
}

fn check_custom(
    value: &str,
    predicate: fn(&str) -> bool,
    tag: &'static str,
) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new(TAG_REQUIRED));
    }
    if predicate(value) {
        Ok(())
    } else {
        Err(ValidationError::new(tag))
    }
}
