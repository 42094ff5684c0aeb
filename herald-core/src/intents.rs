//! Gateway intents and the event families that depend on them.

use bitflags::bitflags;

bitflags! {
    /// Categories of gateway events the client subscribes to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u32 {
        const GUILDS = 1 << 0;
        const GUILD_MEMBERS = 1 << 1;
        const GUILD_MODERATION = 1 << 2;
        const GUILD_EMOJIS_AND_STICKERS = 1 << 3;
        const GUILD_INTEGRATIONS = 1 << 4;
        const GUILD_WEBHOOKS = 1 << 5;
        const GUILD_INVITES = 1 << 6;
        const GUILD_VOICE_STATES = 1 << 7;
        const GUILD_PRESENCES = 1 << 8;
        const GUILD_MESSAGES = 1 << 9;
        const GUILD_MESSAGE_REACTIONS = 1 << 10;
        const GUILD_MESSAGE_TYPING = 1 << 11;
        const DIRECT_MESSAGES = 1 << 12;
        const DIRECT_MESSAGE_REACTIONS = 1 << 13;
        const DIRECT_MESSAGE_TYPING = 1 << 14;
        const MESSAGE_CONTENT = 1 << 15;
        const GUILD_SCHEDULED_EVENTS = 1 << 16;
        const AUTO_MODERATION_CONFIGURATION = 1 << 20;
        const AUTO_MODERATION_EXECUTION = 1 << 21;

        /// Intents that must be enabled in the application settings.
        const PRIVILEGED = Self::GUILD_MEMBERS.bits()
            | Self::GUILD_PRESENCES.bits()
            | Self::MESSAGE_CONTENT.bits();

        const MESSAGES = Self::GUILD_MESSAGES.bits() | Self::DIRECT_MESSAGES.bits();
        const REACTIONS = Self::GUILD_MESSAGE_REACTIONS.bits()
            | Self::DIRECT_MESSAGE_REACTIONS.bits();
        const TYPING = Self::GUILD_MESSAGE_TYPING.bits() | Self::DIRECT_MESSAGE_TYPING.bits();
        const AUTO_MOD = Self::AUTO_MODERATION_CONFIGURATION.bits()
            | Self::AUTO_MODERATION_EXECUTION.bits();
    }
}

impl Intents {
    /// Every non-privileged intent.
    pub const DEFAULT: Intents = Intents::all().difference(Intents::PRIVILEGED);
}

impl Default for Intents {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Returns the intents of which at least one must be enabled for the named
/// event to ever be delivered, or `None` if the event is intent-free.
///
/// Raw variants (`raw_message_create`) map the same way as their parsed
/// counterparts.
pub fn required_intents(event: &str) -> Option<Intents> {
    let name = event.strip_prefix("raw_").unwrap_or(event);
    let intents = match name {
        "message_create" | "message_update" | "message_delete" | "message_delete_bulk" => {
            Intents::MESSAGES
        }
        "message_reaction_add" | "message_reaction_remove" | "message_reaction_remove_all"
        | "message_reaction_remove_emoji" => Intents::REACTIONS,
        "typing_start" => Intents::TYPING,
        "member_add" | "member_remove" | "member_update" | "guild_member_add"
        | "guild_member_remove" | "guild_member_update" => Intents::GUILD_MEMBERS,
        "presence_update" => Intents::GUILD_PRESENCES,
        "voice_state_update" => Intents::GUILD_VOICE_STATES,
        "guild_create" | "guild_update" | "guild_delete" | "channel_create" | "channel_update"
        | "channel_delete" | "channel_pins_update" | "thread_create" | "thread_update"
        | "thread_delete" | "role_create" | "role_update" | "role_delete" => Intents::GUILDS,
        "ban_create" | "ban_remove" | "guild_ban_add" | "guild_ban_remove" => {
            Intents::GUILD_MODERATION
        }
        "emoji_update" | "sticker_update" | "guild_emojis_update" | "guild_stickers_update" => {
            Intents::GUILD_EMOJIS_AND_STICKERS
        }
        "integration_create" | "integration_update" | "integration_delete" => {
            Intents::GUILD_INTEGRATIONS
        }
        "webhooks_update" => Intents::GUILD_WEBHOOKS,
        "invite_create" | "invite_delete" => Intents::GUILD_INVITES,
        "guild_scheduled_event_create" | "guild_scheduled_event_update"
        | "guild_scheduled_event_delete" => Intents::GUILD_SCHEDULED_EVENTS,
        "auto_moderation_rule_create" | "auto_moderation_rule_update"
        | "auto_moderation_rule_delete" => Intents::AUTO_MODERATION_CONFIGURATION,
        "auto_moderation_action_execution" => Intents::AUTO_MODERATION_EXECUTION,
        _ => return None,
    };
    Some(intents)
}
