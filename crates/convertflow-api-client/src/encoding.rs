//! Request payload builders.
//!
//! The encoding is a contract with each remote handler: multipart tools read
//! the raw file part plus string fields, JSON tools read a base64 string plus
//! typed fields. Nothing here decides which one to use; the tool spec does.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use convertflow_core::constants::FILE_COUNT_FIELD;
use convertflow_core::models::{value_as_form_text, SelectedFile};
use reqwest::multipart::{Form, Part};
use serde_json::{Map, Value};

use crate::error::{ClientError, ClientResult};

fn file_part(file: &SelectedFile) -> ClientResult<Part> {
    Part::bytes(file.data.to_vec())
        .file_name(file.name.clone())
        .mime_str(&file.content_type)
        .map_err(|e| ClientError::Encoding(format!("Invalid content type for {}: {}", file.name, e)))
}

fn with_fields(mut form: Form, fields: &[(String, Value)]) -> Form {
    for (name, value) in fields {
        form = form.text(name.clone(), value_as_form_text(value));
    }
    form
}

/// `multipart/form-data` with the file under `file_field` and one text field per parameter.
pub fn multipart_form(
    file: &SelectedFile,
    file_field: &str,
    fields: &[(String, Value)],
) -> ClientResult<Form> {
    let form = Form::new().part(file_field.to_string(), file_part(file)?);
    Ok(with_fields(form, fields))
}

/// All files as `<file_field>_0..<file_field>_{n-1}` in submission order, plus the count.
pub fn combined_form(
    files: &[SelectedFile],
    file_field: &str,
    fields: &[(String, Value)],
) -> ClientResult<Form> {
    let mut form = Form::new();
    for (index, file) in files.iter().enumerate() {
        form = form.part(format!("{}_{}", file_field, index), file_part(file)?);
    }
    form = form.text(FILE_COUNT_FIELD, files.len().to_string());
    Ok(with_fields(form, fields))
}

/// JSON object with the base64 file (no data-URL prefix) under `file_field`
/// followed by the typed parameter fields.
pub fn json_body(file: &SelectedFile, file_field: &str, fields: &[(String, Value)]) -> Value {
    let mut body = Map::new();
    body.insert(file_field.to_string(), Value::String(STANDARD.encode(&file.data)));
    for (name, value) in fields {
        body.insert(name.clone(), value.clone());
    }
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use uuid::Uuid;

    fn selected(name: &str, data: &'static [u8]) -> SelectedFile {
        SelectedFile {
            id: Uuid::new_v4(),
            name: name.to_string(),
            size: data.len() as u64,
            content_type: "image/avif".to_string(),
            data: Bytes::from_static(data),
            preview: None,
        }
    }

    #[test]
    fn test_json_body_is_plain_base64_with_typed_fields() {
        let file = selected("a.avif", b"hello");
        let body = json_body(
            &file,
            "file",
            &[
                ("width".to_string(), Value::from(800)),
                ("maintainAspectRatio".to_string(), Value::from(true)),
            ],
        );
        assert_eq!(body["file"], "aGVsbG8=");
        assert_eq!(body["width"], 800);
        assert_eq!(body["maintainAspectRatio"], true);
        assert!(!body["file"].as_str().unwrap().starts_with("data:"));
    }

    #[test]
    fn test_invalid_mime_is_encoding_error() {
        let mut file = selected("a.avif", b"x");
        file.content_type = "not a mime".to_string();
        assert!(matches!(
            multipart_form(&file, "file", &[]),
            Err(ClientError::Encoding(_))
        ));
    }
}
