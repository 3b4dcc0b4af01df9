/// Data models for the contacts service
///
/// # Models
///
/// - `contact`: The contact record plus its insert and partial-update payloads
///
/// # Example
///
/// ```
/// use contacts_shared::models::contact::{ContactChanges, NewContact};
///
/// let new_contact = NewContact::new("Ana", "ana@example.com", None);
/// assert_eq!(new_contact.phone, "");
///
/// let changes = ContactChanges {
///     name: Some("Ana María".to_string()),
///     ..Default::default()
/// };
/// assert!(!changes.is_empty());
/// ```

pub mod contact;
