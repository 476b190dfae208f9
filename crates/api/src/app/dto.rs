use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use tourbook_auth::UserProfile;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub password: String,
    pub password_confirm: String,
}

/// `password` is the current password.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub password: String,
    pub new_password: String,
    pub password_confirm: String,
}

// -------------------------
// Response envelopes
// -------------------------

/// `{"status":"success","data":{"data":doc}}`
pub fn document(doc: impl Serialize) -> Value {
    json!({ "status": "success", "data": { "data": doc } })
}

/// `{"status":"success","results":n,"data":{"data":[...]}}`
pub fn list<T: Serialize>(docs: Vec<T>) -> Value {
    json!({ "status": "success", "results": docs.len(), "data": { "data": docs } })
}

/// `{"status":"success","data":{<key>:value}}`
pub fn named(key: &str, value: impl Serialize) -> Value {
    let mut data = serde_json::Map::new();
    data.insert(key.to_string(), json!(value));
    json!({ "status": "success", "data": data })
}

pub fn auth(token: &str, user: &UserProfile) -> Value {
    json!({ "status": "success", "token": token, "data": { "user": user } })
}

pub fn message(text: &str) -> Value {
    json!({ "status": "success", "message": text })
}
