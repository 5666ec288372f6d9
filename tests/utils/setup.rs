#![allow(dead_code)] // Not every test binary uses every builder option

use std::collections::HashMap;
use std::sync::Arc;

use lazysusan::config::BotConfig;
use lazysusan::event::{RoomInfo, RoomMetadata, User};
use lazysusan::plugins::builtin_catalog;
use lazysusan::{Bot, PluginCatalog, RoomEvent};

use super::mocks::MockTransport;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub const BOT_ID: &str = "bot-id";
pub const BOT_NAME: &str = "Susan";
pub const ROOM_ID: &str = "room-123";

pub struct TestSetup {
    pub bot: Bot,
    pub transport: MockTransport,
}

pub struct TestSetupBuilder {
    admins: Vec<String>,
    moderators: Vec<String>,
    listeners: Vec<String>,
    djs: Vec<String>,
    max_djs: usize,
    plugins: Vec<String>,
    catalog: Option<PluginCatalog>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            admins: vec![],
            moderators: vec![],
            listeners: vec![],
            djs: vec![],
            max_djs: 5,
            plugins: vec![],
            catalog: None,
        }
    }

    pub fn with_admins(mut self, admins: Vec<&str>) -> Self {
        self.admins = admins.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_moderators(mut self, moderators: Vec<&str>) -> Self {
        self.moderators = moderators.into_iter().map(|s| s.to_string()).collect();
        self
    }

    /// Users already in the room when the bot joins
    pub fn with_listeners(mut self, listeners: Vec<&str>) -> Self {
        self.listeners = listeners.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_djs(mut self, djs: Vec<&str>, max_djs: usize) -> Self {
        self.djs = djs.into_iter().map(|s| s.to_string()).collect();
        self.max_djs = max_djs;
        self
    }

    /// Plugins listed in the configuration, loaded at startup
    pub fn with_plugins(mut self, plugins: Vec<&str>) -> Self {
        self.plugins = plugins.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_catalog(mut self, catalog: PluginCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// A bot that is identified, sitting in `ROOM_ID`, with no actions recorded yet
    pub fn build(self) -> TestSetup {
        let config = BotConfig::from_map(HashMap::from([
            ("user_id".to_string(), BOT_ID.to_string()),
            ("auth_id".to_string(), "auth".to_string()),
            ("room_id".to_string(), ROOM_ID.to_string()),
            ("admin_ids".to_string(), self.admins.join("\n")),
            ("plugins".to_string(), self.plugins.join("\n")),
        ]))
        .unwrap();

        let transport = MockTransport::new();
        let catalog = self.catalog.unwrap_or_else(builtin_catalog);
        let mut bot = Bot::new(config, Arc::new(transport.clone()), catalog);
        bot.load_startup_plugins();
        bot.connect();

        let mut users: Vec<User> = self.listeners.iter().map(User::new).collect();
        users.push(User::new(BOT_ID));
        bot.handle_event(RoomEvent::RoomChanged {
            success: true,
            errno: None,
            room: Some(RoomInfo {
                room_id: Some(ROOM_ID.to_string()),
                metadata: RoomMetadata {
                    djs: self.djs,
                    max_djs: self.max_djs,
                    moderator_id: self.moderators,
                    current_dj: None,
                },
            }),
            users,
        });
        bot.handle_event(RoomEvent::Ready);
        bot.handle_event(RoomEvent::UserInfo {
            user_id: Some(BOT_ID.to_string()),
            name: BOT_NAME.to_string(),
        });

        transport.clear();
        TestSetup { bot, transport }
    }
}
