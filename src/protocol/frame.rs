//! Inbound frame parsing.
//!
//! Every gateway frame is a JSON object with an integer `op`, optional
//! integer sequence `s`, optional event name `t`, and an opcode-dependent
//! payload `d`. The payload is kept as raw JSON so dispatch handlers can
//! receive it untouched.
//!
//! # Format
//!
//! ```json
//! { "op": 0, "s": 42, "t": "MESSAGE_CREATE", "d": { ... } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::{Error, Result};

use super::opcode::Opcode;

// ============================================================================
// GatewayFrame
// ============================================================================

/// A single inbound frame, payload left unparsed.
#[derive(Debug, Deserialize)]
pub struct GatewayFrame {
    /// Wire opcode.
    pub op: u8,

    /// Sequence number, present on dispatch frames (and tracked whenever
    /// present, regardless of opcode).
    #[serde(default)]
    pub s: Option<u64>,

    /// Dispatch event name.
    #[serde(default)]
    pub t: Option<String>,

    /// Raw payload text.
    #[serde(default)]
    pub d: Option<Box<RawValue>>,
}

impl GatewayFrame {
    /// Parses a frame from wire text.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the text is not a frame-shaped JSON object.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::protocol(format!("malformed frame: {e}")))
    }

    /// Returns the decoded opcode, or `None` if outside the table.
    #[inline]
    #[must_use]
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_u8(self.op)
    }

    /// Returns the raw payload text, `"null"` when absent.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &str {
        self.d.as_deref().map_or("null", RawValue::get)
    }

    /// Deserializes the payload into a typed value.
    pub fn data_as<'a, T: Deserialize<'a>>(&'a self) -> Result<T> {
        serde_json::from_str(self.data())
            .map_err(|e| Error::protocol(format!("malformed payload: {e}")))
    }
}

// ============================================================================
// Typed Payloads
// ============================================================================

/// Payload of the hello frame (opcode 10).
#[derive(Debug, Clone, Deserialize)]
pub struct HelloData {
    /// Server-dictated heartbeat interval in milliseconds.
    pub heartbeat_interval: u64,
}

/// Subset of the `READY` dispatch payload the engine needs for
/// session resumption.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyData {
    /// Opaque session identifier.
    pub session_id: String,

    /// Endpoint to resume against instead of the base gateway URL.
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dispatch_frame() {
        let frame =
            GatewayFrame::parse(r#"{"op":0,"s":3,"t":"MESSAGE_CREATE","d":{"content":"hi"}}"#)
                .unwrap();
        assert_eq!(frame.opcode(), Some(Opcode::Dispatch));
        assert_eq!(frame.s, Some(3));
        assert_eq!(frame.t.as_deref(), Some("MESSAGE_CREATE"));
        assert_eq!(frame.data(), r#"{"content":"hi"}"#);
    }

    #[test]
    fn test_parse_minimal_frame() {
        let frame = GatewayFrame::parse(r#"{"op":11}"#).unwrap();
        assert_eq!(frame.opcode(), Some(Opcode::HeartbeatAck));
        assert_eq!(frame.s, None);
        assert_eq!(frame.t, None);
        assert_eq!(frame.data(), "null");
    }

    #[test]
    fn test_parse_hello_payload() {
        let frame =
            GatewayFrame::parse(r#"{"op":10,"d":{"heartbeat_interval":45000}}"#).unwrap();
        let hello: HelloData = frame.data_as().unwrap();
        assert_eq!(hello.heartbeat_interval, 45000);
    }

    #[test]
    fn test_parse_ready_payload() {
        let frame = GatewayFrame::parse(
            r#"{"op":0,"t":"READY","s":1,"d":{"v":10,"session_id":"abc","resume_gateway_url":"wss://resume.example.com","user":{"id":"1"}}}"#,
        )
        .unwrap();
        let ready: ReadyData = frame.data_as().unwrap();
        assert_eq!(ready.session_id, "abc");
        assert_eq!(
            ready.resume_gateway_url.as_deref(),
            Some("wss://resume.example.com")
        );
    }

    #[test]
    fn test_unknown_opcode_is_none() {
        let frame = GatewayFrame::parse(r#"{"op":42}"#).unwrap();
        assert_eq!(frame.opcode(), None);
    }

    #[test]
    fn test_malformed_frame_is_protocol_error() {
        let err = GatewayFrame::parse("not json").unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_payload_kept_verbatim() {
        let text = r#"{"op":0,"t":"X","d":{"a": 1,  "b":[true,null]}}"#;
        let frame = GatewayFrame::parse(text).unwrap();
        assert_eq!(frame.data(), r#"{"a": 1,  "b":[true,null]}"#);
    }
}
