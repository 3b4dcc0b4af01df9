/// Contact CRUD endpoints
///
/// # Endpoints
///
/// - `GET /api/contacts` - List contacts
/// - `GET /api/contacts/:id` - Get contact
/// - `POST /api/contacts` - Create contact
/// - `PUT /api/contacts/:id` - Update contact
/// - `DELETE /api/contacts/:id` - Delete contact
///
/// Every response uses the envelope from [`crate::response`]. Store failures
/// are mapped per endpoint: list and create return the store message, get
/// and delete hide it, update reports it in `error`. A body that cannot be
/// read as a contact is a 500, the same as any other unhandled failure.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, INTERNAL_ERROR},
    response::Envelope,
};
use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use contacts_shared::models::contact::{
    deserialize_present, Contact, ContactChanges, ContactId, NewContact,
};
use contacts_shared::store::StoreError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::{debug, error, info, warn};
use validator::Validate;

pub const REQUIRED_FIELDS: &str = "Nombre y email son requeridos";
pub const INVALID_ID: &str = "ID de contacto inválido";
pub const DUPLICATE_EMAIL: &str = "Ya existe un contacto con ese email";
pub const NOT_FOUND: &str = "Contacto no encontrado";
pub const UPDATE_FAILED: &str = "No se pudo actualizar";
pub const CREATED: &str = "Contacto creado exitosamente";
pub const UPDATED: &str = "Contacto actualizado exitosamente";
pub const DELETED: &str = "Contacto eliminado exitosamente";

/// Create contact request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateContactRequest {
    #[validate(required, length(min = 1))]
    #[serde(default, deserialize_with = "deserialize_text")]
    pub name: Option<String>,

    #[validate(required, length(min = 1))]
    #[serde(default, deserialize_with = "deserialize_text")]
    pub email: Option<String>,

    /// Optional phone, stored as empty when absent
    #[serde(default, deserialize_with = "deserialize_text")]
    pub phone: Option<String>,
}

impl CreateContactRequest {
    /// Validates required fields and builds the insert payload
    pub fn into_new_contact(self) -> ApiResult<NewContact> {
        self.validate()
            .map_err(|_| ApiError::BadRequest(REQUIRED_FIELDS.to_string()))?;

        Ok(NewContact::new(
            self.name.unwrap_or_default(),
            self.email.unwrap_or_default(),
            self.phone,
        ))
    }
}

/// Update contact request
///
/// Empty `name`/`email` are ignored. `phone` is applied whenever it is
/// present, including an explicit `null`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateContactRequest {
    #[serde(default, deserialize_with = "deserialize_text")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_text")]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "deserialize_present_text")]
    pub phone: Option<Option<String>>,
}

impl UpdateContactRequest {
    /// Builds the change set, dropping fields that must not be written
    pub fn into_changes(self) -> ContactChanges {
        ContactChanges {
            name: self.name.filter(|name| !name.is_empty()),
            email: self.email.filter(|email| !email.is_empty()),
            phone: self.phone,
        }
    }
}

/// Text field as sent by clients: numbers are kept as their JSON text
#[derive(Deserialize)]
#[serde(untagged)]
enum Text {
    String(String),
    Number(serde_json::Number),
}

impl From<Text> for String {
    fn from(text: Text) -> Self {
        match text {
            Text::String(value) => value,
            Text::Number(number) => number.to_string(),
        }
    }
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Text>::deserialize(deserializer)?.map(String::from))
}

fn deserialize_present_text<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_present(deserializer)
        .map(|value: Option<Option<Text>>| value.map(|text| text.map(String::from)))
}

/// Parses a JSON body; an empty body counts as `{}`
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(body).map_err(|e| {
        error!(error = %e, "Unreadable request body");
        ApiError::InternalError(INTERNAL_ERROR.to_string())
    })
}

/// Path ID, `Err` carrying the raw segment when it is not a contact ID
///
/// A segment that is not valid UTF-8 after percent-decoding is rejected by
/// the extractor before reaching here and is treated the same way.
fn contact_id(path: Result<Path<String>, PathRejection>) -> Result<ContactId, String> {
    match path {
        Ok(Path(raw)) => raw.parse().map_err(|_| raw),
        Err(rejection) => Err(rejection.body_text()),
    }
}

/// Store failure surfaced with its message
fn upstream(err: StoreError) -> ApiError {
    warn!(error = %err, "Store call failed");
    ApiError::InternalError(err.to_string())
}

/// List contacts
///
/// # Response
///
/// ```json
/// { "success": true, "data": [ { "id": 1, "name": "...", ... } ], "count": 1 }
/// ```
///
/// # Errors
///
/// - `500 Internal Server Error`: store failure (message from the store)
pub async fn list_contacts(State(state): State<AppState>) -> ApiResult<Json<Envelope<Vec<Contact>>>> {
    let contacts = state.contacts.find_all().await.map_err(upstream)?;
    Ok(Json(Envelope::list(contacts)))
}

/// Get a contact by ID
///
/// # Errors
///
/// - `404 Not Found`: unknown or malformed ID, or the lookup failed
pub async fn get_contact(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Envelope<Contact>>> {
    let id = contact_id(path).map_err(|raw| {
        debug!(id = %raw, "Malformed contact ID");
        ApiError::not_found(NOT_FOUND)
    })?;

    let contact = state.contacts.find_by_id(id).await.map_err(|err| {
        debug!(%id, error = %err, "Contact lookup failed");
        ApiError::not_found(NOT_FOUND)
    })?;

    Ok(Json(Envelope::data(contact)))
}

/// Create a contact
///
/// # Request
///
/// ```json
/// { "name": "Nuevo", "email": "nuevo@test.com", "phone": "555-1234" }
/// ```
///
/// # Response (201)
///
/// ```json
/// { "success": true, "message": "Contacto creado exitosamente", "data": { "id": 2, ... } }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: missing name/email (no store call)
/// - `409 Conflict`: a contact with this email exists (no insert)
/// - `500 Internal Server Error`: store failure (message from the store), or
///   a body that is not a JSON object with text fields (generic message)
pub async fn create_contact(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Envelope<Contact>>)> {
    let request: CreateContactRequest = parse_body(&body)?;
    let new_contact = request.into_new_contact()?;

    // The lookup and the insert are separate store calls; a concurrent create
    // can slip between them unless the table has a unique constraint.
    if let Some(existing) = state
        .contacts
        .find_by_email(&new_contact.email)
        .await
        .map_err(upstream)?
    {
        info!(existing_id = %existing.id, "Rejected duplicate email");
        return Err(ApiError::Conflict(DUPLICATE_EMAIL.to_string()));
    }

    let created = state
        .contacts
        .create(new_contact)
        .await
        .map_err(|err| match err {
            StoreError::Conflict(detail) => {
                info!(detail = %detail, "Store rejected duplicate email");
                ApiError::Conflict(DUPLICATE_EMAIL.to_string())
            }
            other => upstream(other),
        })?;

    let contact = created.into_iter().next().ok_or_else(|| {
        ApiError::InternalError("El almacén no devolvió el contacto creado".to_string())
    })?;

    info!(id = %contact.id, "Contact created");
    Ok((StatusCode::CREATED, Json(Envelope::with_message(CREATED, contact))))
}

/// Update a contact
///
/// Only supplied fields are written. The email is not re-checked for
/// duplicates.
///
/// # Errors
///
/// - `404 Not Found`: unknown or malformed ID, nothing updated, or the store
///   failed (detail in `error`)
/// - `500 Internal Server Error`: unreadable body (generic message)
pub async fn update_contact(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> ApiResult<Json<Envelope<Contact>>> {
    let id = contact_id(path).map_err(|raw| ApiError::NotFound {
        message: NOT_FOUND.to_string(),
        detail: Some(format!("{INVALID_ID}: {raw}")),
    })?;
    let request: UpdateContactRequest = parse_body(&body)?;

    let updated = state
        .contacts
        .update(id, request.into_changes())
        .await
        .map_err(|err| ApiError::NotFound {
            message: NOT_FOUND.to_string(),
            detail: Some(err.to_string()),
        })?;

    match updated.into_iter().next() {
        Some(contact) => {
            info!(%id, "Contact updated");
            Ok(Json(Envelope::with_message(UPDATED, contact)))
        }
        None => Err(ApiError::NotFound {
            message: NOT_FOUND.to_string(),
            detail: Some(UPDATE_FAILED.to_string()),
        }),
    }
}

/// Delete a contact
///
/// Succeeds whether or not the contact existed.
///
/// # Errors
///
/// - `500 Internal Server Error`: malformed ID or store failure (detail only
///   logged)
pub async fn delete_contact(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Envelope<()>>> {
    let id = contact_id(path).map_err(|raw| {
        error!(id = %raw, "Failed to delete contact: malformed ID");
        ApiError::InternalError(INTERNAL_ERROR.to_string())
    })?;

    state.contacts.delete(id).await.map_err(|err| {
        error!(%id, error = %err, "Failed to delete contact");
        ApiError::InternalError(INTERNAL_ERROR.to_string())
    })?;

    info!(%id, "Contact deleted");
    Ok(Json(Envelope::message(DELETED)))
}
