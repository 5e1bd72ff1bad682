use serde::{Deserialize, Deserializer, Serialize};

/// A client as the backend stores it. Every field is kept as a string; the
/// backend may send `null` or omit optional fields, both of which read as "".
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientRecord {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub full_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub passport_number: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub passport_issue_date: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub passport_expiry_date: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub driver_license_number: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub driver_license_expiry: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub notes: String,
}

/// One row of the client listing. A row without an id is shown but cannot
/// be opened.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClientSummary {
    #[serde(default)]
    pub id: Option<i32>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub full_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub passport_number: String,
}

/// Envelope of `GET /api/clients/{id}`.
#[derive(Deserialize, Debug, Clone)]
pub struct ClientResponse {
    pub success: bool,
    #[serde(default)]
    pub client: Option<ClientRecord>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Envelope of `POST /api/clients` and `PUT /api/clients/{id}`.
#[derive(Deserialize, Debug, Clone)]
pub struct SaveResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Envelope of `GET /api/clients`.
#[derive(Deserialize, Debug, Clone)]
pub struct ClientListResponse {
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_empty_list")]
    pub clients: Vec<ClientSummary>,
    #[serde(default)]
    pub message: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_empty_list<'de, D>(deserializer: D) -> Result<Vec<ClientSummary>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ClientSummary>>::deserialize(deserializer)?.unwrap_or_default())
}
