//! Outbound frame construction.
//!
//! Builders for every client-to-server payload, returned as wire-ready
//! JSON text. Shapes are bit-exact where the protocol demands it:
//!
//! | Frame | Shape |
//! |-------|-------|
//! | identify | `{op:2, d:{token, intents, properties, [shard]}}` |
//! | resume | `{op:6, d:{token, session_id, seq}}` |
//! | heartbeat | `{op:1, d:<seq or null>}` |
//! | presence | `{op:3, d:{since, activities, status, afk}}` |
//! | members | `{op:8, d:{guild_id, query, limit}}` |

// ============================================================================
// Imports
// ============================================================================

use serde_json::json;

use crate::intents::Intents;
use crate::presence::PresenceUpdate;

use super::opcode::Opcode;

// ============================================================================
// Constants
// ============================================================================

/// Connection properties reported inside identify.
const PROPERTY_OS: &str = std::env::consts::OS;
const PROPERTY_NAME: &str = "shardline";

// ============================================================================
// Builders
// ============================================================================

/// Builds an identify frame for a brand-new session.
///
/// `shard` is `[shard_id, shard_count]` and is omitted for unsharded
/// deployments.
#[must_use]
pub fn identify(token: &str, intents: Intents, shard: Option<[u32; 2]>) -> String {
    let mut d = json!({
        "token": token,
        "intents": intents.bits(),
        "properties": {
            "os": PROPERTY_OS,
            "browser": PROPERTY_NAME,
            "device": PROPERTY_NAME,
        },
    });
    if let Some(shard) = shard {
        d["shard"] = json!(shard);
    }

    json!({ "op": Opcode::Identify.as_u8(), "d": d }).to_string()
}

/// Builds a resume frame continuing a prior session.
#[must_use]
pub fn resume(token: &str, session_id: &str, seq: Option<u64>) -> String {
    json!({
        "op": Opcode::Resume.as_u8(),
        "d": {
            "token": token,
            "session_id": session_id,
            "seq": seq,
        },
    })
    .to_string()
}

/// Builds a heartbeat frame carrying the last seen sequence number.
#[must_use]
pub fn heartbeat(seq: Option<u64>) -> String {
    json!({ "op": Opcode::Heartbeat.as_u8(), "d": seq }).to_string()
}

/// Builds a presence update frame.
#[must_use]
pub fn presence_update(presence: &PresenceUpdate) -> String {
    json!({ "op": Opcode::PresenceUpdate.as_u8(), "d": presence }).to_string()
}

/// Builds a member-list request frame.
///
/// `query` is a username prefix filter; empty matches everyone. `limit`
/// of 0 requests the full list (requires the members intent).
#[must_use]
pub fn request_guild_members(guild_id: u64, query: &str, limit: u32) -> String {
    json!({
        "op": Opcode::RequestGuildMembers.as_u8(),
        "d": {
            "guild_id": guild_id.to_string(),
            "query": query,
            "limit": limit,
        },
    })
    .to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::Value;

    fn parse(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_identify_shape() {
        let frame = parse(&identify("tok", Intents::GUILDS, None));

        assert_eq!(frame["op"], 2);
        assert_eq!(frame["d"]["token"], "tok");
        assert_eq!(frame["d"]["intents"], 1);
        assert_eq!(frame["d"]["properties"]["browser"], "shardline");
        assert!(frame["d"].get("shard").is_none());
    }

    #[test]
    fn test_identify_with_shard() {
        let frame = parse(&identify("tok", Intents::GUILDS, Some([1, 4])));
        assert_eq!(frame["d"]["shard"], serde_json::json!([1, 4]));
    }

    #[test]
    fn test_resume_shape() {
        let frame = parse(&resume("tok", "abc", Some(42)));

        assert_eq!(frame["op"], 6);
        assert_eq!(frame["d"]["session_id"], "abc");
        assert_eq!(frame["d"]["seq"], 42);
    }

    #[test]
    fn test_heartbeat_with_seq() {
        let frame = parse(&heartbeat(Some(7)));
        assert_eq!(frame["op"], 1);
        assert_eq!(frame["d"], 7);
    }

    #[test]
    fn test_heartbeat_without_seq_is_null() {
        let frame = parse(&heartbeat(None));
        assert!(frame["d"].is_null());
    }

    #[test]
    fn test_presence_update_shape() {
        use crate::presence::StatusKind;

        let presence = PresenceUpdate::new(StatusKind::Online);
        let frame = parse(&presence_update(&presence));

        assert_eq!(frame["op"], 3);
        assert_eq!(frame["d"]["status"], "online");
        assert_eq!(frame["d"]["afk"], false);
    }

    #[test]
    fn test_request_guild_members_shape() {
        let frame = parse(&request_guild_members(123, "", 0));

        assert_eq!(frame["op"], 8);
        assert_eq!(frame["d"]["guild_id"], "123");
        assert_eq!(frame["d"]["query"], "");
        assert_eq!(frame["d"]["limit"], 0);
    }
}
