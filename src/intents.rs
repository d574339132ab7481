//! Gateway intent bitmask.
//!
//! Intents control which dispatch events the server pushes over the
//! connection. The bitmask is sent as an integer inside the identify
//! payload.
//!
//! # Example
//!
//! ```
//! use shardline::Intents;
//!
//! let intents = Intents::GUILDS | Intents::GUILD_MESSAGES;
//! assert!(intents.contains(Intents::GUILDS));
//! ```

// ============================================================================
// Imports
// ============================================================================

use bitflags::bitflags;

// ============================================================================
// Intents
// ============================================================================

bitflags! {
    /// Bitfield flags selecting gateway event categories.
    ///
    /// Some flags are privileged and require explicit enablement on the
    /// platform side; they are excluded from [`Intents::ALL_NON_PRIVILEGED`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u32 {
        /// Guild lifecycle events (e.g. `GUILD_CREATE`).
        const GUILDS = 1 << 0;
        /// Guild member events (privileged).
        const GUILD_MEMBERS = 1 << 1;
        /// Guild moderation events (e.g. `GUILD_BAN_ADD`).
        const GUILD_MODERATION = 1 << 2;
        /// Guild emoji and sticker events.
        const GUILD_EMOJIS_AND_STICKERS = 1 << 3;
        /// Guild integration events.
        const GUILD_INTEGRATIONS = 1 << 4;
        /// Guild webhook events.
        const GUILD_WEBHOOKS = 1 << 5;
        /// Guild invite events.
        const GUILD_INVITES = 1 << 6;
        /// Guild voice state events.
        const GUILD_VOICE_STATES = 1 << 7;
        /// Guild presence events (privileged).
        const GUILD_PRESENCES = 1 << 8;
        /// Guild message events (e.g. `MESSAGE_CREATE`).
        const GUILD_MESSAGES = 1 << 9;
        /// Guild message reaction events.
        const GUILD_MESSAGE_REACTIONS = 1 << 10;
        /// Guild typing events.
        const GUILD_MESSAGE_TYPING = 1 << 11;
        /// Direct message events.
        const DIRECT_MESSAGES = 1 << 12;
        /// Direct message reaction events.
        const DIRECT_MESSAGE_REACTIONS = 1 << 13;
        /// Direct message typing events.
        const DIRECT_MESSAGE_TYPING = 1 << 14;
        /// Message content access (privileged).
        const MESSAGE_CONTENT = 1 << 15;
        /// Guild scheduled event events.
        const GUILD_SCHEDULED_EVENTS = 1 << 16;
        /// Auto-moderation configuration events.
        const AUTO_MODERATION_CONFIGURATION = 1 << 20;
        /// Auto-moderation execution events.
        const AUTO_MODERATION_EXECUTION = 1 << 21;

        /// Every non-privileged intent.
        const ALL_NON_PRIVILEGED = Self::GUILDS.bits()
            | Self::GUILD_MODERATION.bits()
            | Self::GUILD_EMOJIS_AND_STICKERS.bits()
            | Self::GUILD_INTEGRATIONS.bits()
            | Self::GUILD_WEBHOOKS.bits()
            | Self::GUILD_INVITES.bits()
            | Self::GUILD_VOICE_STATES.bits()
            | Self::GUILD_MESSAGES.bits()
            | Self::GUILD_MESSAGE_REACTIONS.bits()
            | Self::GUILD_MESSAGE_TYPING.bits()
            | Self::DIRECT_MESSAGES.bits()
            | Self::DIRECT_MESSAGE_REACTIONS.bits()
            | Self::DIRECT_MESSAGE_TYPING.bits()
            | Self::GUILD_SCHEDULED_EVENTS.bits()
            | Self::AUTO_MODERATION_CONFIGURATION.bits()
            | Self::AUTO_MODERATION_EXECUTION.bits();

        /// Every intent, privileged ones included.
        const ALL = Self::ALL_NON_PRIVILEGED.bits()
            | Self::GUILD_MEMBERS.bits()
            | Self::GUILD_PRESENCES.bits()
            | Self::MESSAGE_CONTENT.bits();
    }
}

impl Default for Intents {
    fn default() -> Self {
        Self::ALL_NON_PRIVILEGED
    }
}

// ============================================================================
// Tests
// ============================================================================
