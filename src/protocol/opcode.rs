//! Gateway opcode table.
//!
//! Every frame on the wire carries an integer `op` field identifying its
//! purpose. The table is closed: unknown values are surfaced as `None`
//! and ignored by the engine rather than treated as errors.

// ============================================================================
// Opcode
// ============================================================================

/// Integer opcode tagging every gateway frame.
///
/// Inbound opcodes handled by the engine: [`Dispatch`](Opcode::Dispatch),
/// [`Heartbeat`](Opcode::Heartbeat), [`Reconnect`](Opcode::Reconnect),
/// [`InvalidSession`](Opcode::InvalidSession), [`Hello`](Opcode::Hello),
/// [`HeartbeatAck`](Opcode::HeartbeatAck). The rest are outbound only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Server-pushed event with a `t` event name.
    Dispatch = 0,
    /// Liveness ping; inbound means "send one now, out of cycle".
    Heartbeat = 1,
    /// Initial authentication handshake (outbound).
    Identify = 2,
    /// Presence update (outbound).
    PresenceUpdate = 3,
    /// Continue a prior session from its last sequence (outbound).
    Resume = 6,
    /// Server requests the client reconnect.
    Reconnect = 7,
    /// Member-list request (outbound).
    RequestGuildMembers = 8,
    /// Server invalidated the session; resumption is off the table.
    InvalidSession = 9,
    /// First inbound frame; carries the heartbeat interval.
    Hello = 10,
    /// Acknowledgement of a client heartbeat.
    HeartbeatAck = 11,
}

impl Opcode {
    /// Converts a wire integer into an opcode.
    ///
    /// Returns `None` for values outside the table.
    #[inline]
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::Identify),
            3 => Some(Self::PresenceUpdate),
            6 => Some(Self::Resume),
            7 => Some(Self::Reconnect),
            8 => Some(Self::RequestGuildMembers),
            9 => Some(Self::InvalidSession),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            _ => None,
        }
    }

    /// Returns the wire integer for this opcode.
    #[inline]
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_known_opcodes() {
        for op in [
            Opcode::Dispatch,
            Opcode::Heartbeat,
            Opcode::Identify,
            Opcode::PresenceUpdate,
            Opcode::Resume,
            Opcode::Reconnect,
            Opcode::RequestGuildMembers,
            Opcode::InvalidSession,
            Opcode::Hello,
            Opcode::HeartbeatAck,
        ] {
            assert_eq!(Opcode::from_u8(op.as_u8()), Some(op));
        }
    }

    #[test]
    fn test_unknown_opcodes() {
        assert_eq!(Opcode::from_u8(4), None);
        assert_eq!(Opcode::from_u8(5), None);
        assert_eq!(Opcode::from_u8(12), None);
        assert_eq!(Opcode::from_u8(255), None);
    }

    #[test]
    fn test_wire_values() {
        assert_eq!(Opcode::Dispatch.as_u8(), 0);
        assert_eq!(Opcode::Resume.as_u8(), 6);
        assert_eq!(Opcode::Hello.as_u8(), 10);
        assert_eq!(Opcode::HeartbeatAck.as_u8(), 11);
    }
}
