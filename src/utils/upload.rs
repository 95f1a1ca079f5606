// utils/upload.rs
use std::fmt::Display;
use std::str::FromStr;

use axum::extract::Multipart;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::HttpError;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// A file part lifted out of a multipart request, held in memory until the
/// owning transition has passed validation.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FilePayload {
    /// Original extension, preserved so downloads can be renamed back.
    pub fn extension(&self) -> Option<String> {
        let ext = self.file_name.rsplit_once('.')?.1;
        if ext.is_empty() {
            None
        } else {
            Some(ext.to_ascii_lowercase())
        }
    }
}

/// Reads a multipart body into a DTO plus an optional file part. Text
/// fields are collected by name and deserialized as strings; the part
/// named `file` is buffered as the upload.
pub async fn parse_multipart<T: DeserializeOwned>(
    mut multipart: Multipart,
) -> Result<(T, Option<FilePayload>), HttpError> {
    let mut fields: Map<String, Value> = Map::new();
    let mut file: Option<FilePayload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let file_name = field
                .file_name()
                .unwrap_or("upload.bin")
                .to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| HttpError::bad_request(e.to_string()))?;

            if bytes.len() > MAX_UPLOAD_BYTES {
                return Err(HttpError::bad_request("File exceeds the 10MB upload limit"));
            }

            file = Some(FilePayload {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| HttpError::bad_request(e.to_string()))?;
            if !text.is_empty() {
                fields.insert(name, Value::String(text));
            }
        }
    }

    let dto = serde_json::from_value(Value::Object(fields))
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    Ok((dto, file))
}

/// Deserializes a form text field through `FromStr` (amounts, dates,
/// classification enums all arrive as strings in multipart bodies).
pub fn from_form_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let s = String::deserialize(deserializer)?;
    s.parse::<T>().map_err(serde::de::Error::custom)
}

/// Optional variant of [`from_form_str`]; absent fields stay `None`.
pub fn opt_from_form_str<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => s.parse::<T>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased_last_segment() {
        let file = FilePayload {
            file_name: "Thesis.Final.DOCX".to_string(),
            content_type: "application/octet-stream".to_string(),
            bytes: vec![],
        };
        assert_eq!(file.extension(), Some("docx".to_string()));
    }

    #[test]
    fn extension_is_none_without_a_dot() {
        let file = FilePayload {
            file_name: "README".to_string(),
            content_type: "text/plain".to_string(),
            bytes: vec![],
        };
        assert_eq!(file.extension(), None);
    }
}
