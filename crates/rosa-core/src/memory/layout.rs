//! Memory layout constants for the host's static arrays
//!
//! This module centralizes the fixed capacities and sub-record bounds of the
//! supported host build. Constants are organized by structure type.

/// Sentinel stored in cross-reference fields meaning "no reference"
pub const NO_REFERENCE: i32 = -1;

/// Fixed capacity of each statically allocated array
pub mod capacity {
    pub const CONNECTIONS: usize = 128;
    pub const ACCOUNTS: usize = 32768;
    pub const PLAYERS: usize = 256;
    pub const HUMANS: usize = 256;
    pub const ITEM_TYPES: usize = 46;
    pub const ITEMS: usize = 1024;
    pub const VEHICLES: usize = 512;
    pub const BULLETS: usize = 16384;
    pub const RIGID_BODIES: usize = 8192;
    pub const BONDS: usize = 16384;
    pub const STREETS: usize = 512;
    pub const INTERSECTIONS: usize = 1024;
}

/// Player sub-records
pub mod player {
    pub const NAME_LEN: usize = 32;
    pub const ACTIONS: usize = 64;
    pub const MENU_BUTTONS: usize = 32;

    /// Team assigned to bots created from script
    pub const BOT_TEAM: i32 = 6;
    pub const BOT_NAME: &str = "Bot";
}

/// Human sub-records
pub mod human {
    pub const BONES: usize = 16;
}

/// Item sub-records (computer screens)
pub mod item {
    pub const COMPUTER_LINES: usize = 32;
    pub const COMPUTER_LINE_LEN: usize = 64;
    pub const MEMO_LEN: usize = 1024;
}

pub mod item_type {
    pub const NAME_LEN: usize = 64;
}

pub mod account {
    pub const NAME_LEN: usize = 32;
}

pub mod street {
    pub const NAME_LEN: usize = 32;
    pub const LANES: usize = 16;
}

/// Chat message kinds accepted by the host's message event function
pub mod message {
    pub const ANNOUNCE: i32 = 0;
    pub const HUMAN_SPEECH: i32 = 1;
    pub const ITEM_SPEECH: i32 = 2;
    pub const ADMINS: i32 = 4;
    pub const PRIVATE: i32 = 6;

    /// Speaker id used for messages that have no speaker
    pub const NO_SPEAKER: i32 = -1;
}
