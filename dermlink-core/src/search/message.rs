//! Search Stream Messages
//!
//! The vocabulary of the search-result stream. Unlike the image relay this
//! stream is text-only: every frame is a tagged JSON message.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::super::socket::CodecError;

/// Messages sent by the search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchMessage {
    /// One ranked result. The attribute set is backend-defined and passed
    /// through opaquely.
    Result {
        #[serde(flatten)]
        attrs: Map<String, Value>,
    },
    /// Progress counters for the running search.
    Statistics {
        #[serde(default)]
        objs_processed: u64,
        #[serde(default)]
        objs_total: u64,
    },
    /// All index objects have been processed.
    SearchComplete,
    /// The backend reports a failure. Application-level: the stream itself
    /// stays healthy.
    Error { message: String },
}

impl SearchMessage {
    /// Decodes a text frame from the search backend.
    pub fn decode(text: &str) -> Result<Self, CodecError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| CodecError::MalformedJson(e.to_string()))?;
        serde_json::from_value(value).map_err(|e| CodecError::UnrecognizedMessage(e.to_string()))
    }
}

/// Messages sent to the search backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchRequest {
    /// Attaches to a running search by its key (obtained out-of-band from
    /// the HTTP search request).
    Start { search_key: String },
}

impl SearchRequest {
    /// Encodes the request for transmission as a text frame.
    pub fn encode(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(|e| CodecError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_shape() {
        assert_eq!(
            SearchRequest::Start {
                search_key: "K".into()
            }
            .encode()
            .unwrap(),
            r#"{"type":"start","search_key":"K"}"#
        );
    }

    #[test]
    fn test_result_attrs_pass_through() {
        let msg = SearchMessage::decode(
            r#"{"type":"result","_filter.distance_score":{"data":"0.31"},"thumb_url":"/t/9"}"#,
        )
        .unwrap();
        match msg {
            SearchMessage::Result { attrs } => {
                assert!(attrs.contains_key("_filter.distance_score"));
                assert_eq!(attrs["thumb_url"], "/t/9");
            }
            other => panic!("expected result, got {:?}", other),
        }
    }

    #[test]
    fn test_statistics_defaults_missing_counters() {
        let msg = SearchMessage::decode(r#"{"type":"statistics"}"#).unwrap();
        assert_eq!(
            msg,
            SearchMessage::Statistics {
                objs_processed: 0,
                objs_total: 0
            }
        );
    }

    #[test]
    fn test_complete_and_error() {
        assert_eq!(
            SearchMessage::decode(r#"{"type":"search_complete"}"#).unwrap(),
            SearchMessage::SearchComplete
        );
        assert_eq!(
            SearchMessage::decode(r#"{"type":"error","message":"backend down"}"#).unwrap(),
            SearchMessage::Error {
                message: "backend down".into()
            }
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(SearchMessage::decode(r#"{"type":"shutdown"}"#).is_err());
    }
}
