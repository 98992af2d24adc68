use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use toolwire_types::{CallError, ErrorKind};

/// A fully buffered successful response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub upstream: String,
    /// Attempts made, including the successful one
    pub attempts: u32,
}

impl UpstreamResponse {
    /// Deserialize the body as JSON. A malformed body is an INTERNAL error.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, CallError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            CallError::from_cause(ErrorKind::Internal, self.upstream.as_str(), &e)
                .with_status(self.status.as_u16())
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn response(body: &'static str) -> UpstreamResponse {
        UpstreamResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(body.as_bytes()),
            upstream: "fred".to_string(),
            attempts: 1,
        }
    }

    #[test]
    fn test_json_body() {
        let value: Value = response(r#"{"series":"GDP"}"#).json().unwrap();
        assert_eq!(value["series"], "GDP");
    }

    #[test]
    fn test_malformed_json_is_internal() {
        let err = response("<html>").json::<Value>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.upstream, "fred");
    }

    #[test]
    fn test_text_body() {
        assert_eq!(response("plain").text(), "plain");
    }
}
