//! Parsing of the backend's JSON answer into a [`CitationResponse`].
//!
//! The canonical shape is `{ quotes: [...], filename?, pdf_url?, metadata?,
//! message? }`. Two older shapes are still accepted: a flat `{ results: [...] }`
//! list and `{ results: { quotes: [...] } }`. Anything else is rejected as a
//! whole; a partially valid list is never returned.

use log::debug;
use serde_json::{Map, Value};
use url::Url;

use crate::{CitationResponse, CitationResult, DocumentMetadata, PdfReference, SubmitError};

/// Parse a response body.
///
/// `api_url` is the endpoint the request was posted to; relative PDF
/// references are resolved against it.
pub fn parse_body(body: &[u8], api_url: &str) -> Result<CitationResponse, SubmitError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| SubmitError::InvalidResponse(format!("body is not JSON ({e})")))?;

    let top = value
        .as_object()
        .ok_or_else(|| SubmitError::InvalidResponse("expected a JSON object".to_string()))?;

    if let Some(message) = error_message(top) {
        return Err(SubmitError::Backend(message));
    }

    let nested = top.get("results").and_then(Value::as_object);
    let field = |name: &str| lookup(top, nested, name);

    let entries = match (top.get("quotes"), top.get("results")) {
        (Some(Value::Array(list)), _) => list,
        (_, Some(Value::Array(list))) => list,
        (_, Some(Value::Object(inner))) => match inner.get("quotes") {
            Some(Value::Array(list)) => list,
            _ => {
                return Err(SubmitError::InvalidResponse(
                    "results.quotes should be an array".to_string(),
                ));
            }
        },
        _ => {
            return Err(SubmitError::InvalidResponse(
                "results should be an array".to_string(),
            ));
        }
    };

    let results = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| parse_entry(i, entry))
        .collect::<Result<Vec<_>, _>>()?;

    let metadata = match field("metadata") {
        Some(v) => Some(
            serde_json::from_value::<DocumentMetadata>(v.clone())
                .map_err(|e| SubmitError::InvalidResponse(format!("metadata: {e}")))?,
        )
        .filter(|m| !m.is_empty()),
        None => None,
    };

    let pdf = field("pdf_url")
        .and_then(Value::as_str)
        .map(|url| resolve_url(api_url, url).map(PdfReference::Remote))
        .transpose()?
        .or_else(|| {
            field("filename")
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .map(|name| PdfReference::Remote(pdf_endpoint(api_url, name)))
        });

    let message = field("message")
        .and_then(Value::as_str)
        .map(str::to_string);

    debug!(
        "parsed {} result(s), metadata: {}, pdf: {:?}",
        results.len(),
        metadata.is_some(),
        pdf
    );

    Ok(CitationResponse {
        results,
        metadata,
        pdf,
        message,
    })
}

/// The backend's `error` field, if it carries one.
///
/// Also used on non-2xx bodies, where the error text is the only thing of
/// interest.
pub fn error_message(top: &Map<String, Value>) -> Option<String> {
    match top.get("error") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

/// Fields may live at the top level or inside a `results` object.
fn lookup<'a>(
    top: &'a Map<String, Value>,
    nested: Option<&'a Map<String, Value>>,
    name: &str,
) -> Option<&'a Value> {
    top.get(name)
        .filter(|v| !v.is_null())
        .or_else(|| nested.and_then(|n| n.get(name)).filter(|v| !v.is_null()))
}

fn parse_entry(index: usize, entry: &Value) -> Result<CitationResult, SubmitError> {
    let result: CitationResult = serde_json::from_value(entry.clone())
        .map_err(|e| SubmitError::InvalidResponse(format!("result {index}: {e}")))?;
    if result.page == 0 {
        return Err(SubmitError::InvalidResponse(format!(
            "result {index}: page numbers start at 1"
        )));
    }
    Ok(result)
}

/// `{api_url}/pdf/{filename}`.
pub fn pdf_endpoint(api_url: &str, filename: &str) -> String {
    format!(
        "{}/pdf/{}",
        api_url.trim_end_matches('/'),
        urlencoding::encode(filename)
    )
}

/// Resolve a possibly relative `pdf_url` against the endpoint. Absolute URLs
/// are returned as sent.
fn resolve_url(api_url: &str, url: &str) -> Result<String, SubmitError> {
    if Url::parse(url).is_ok() {
        return Ok(url.to_string());
    }
    Url::parse(api_url)
        .and_then(|base| base.join(url))
        .map(String::from)
        .map_err(|e| SubmitError::InvalidResponse(format!("pdf_url {url:?}: {e}")))
}
