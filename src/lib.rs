// Wedding Site - Core Library
// Exposes all modules for use in the CLI, the web server, and tests

pub mod registry;   // Gift registry: status classifier + item filter
pub mod party;      // Wedding party bios
pub mod db;         // SQLite persistence + audit trail
pub mod auth;       // Admin password + session tokens
pub mod config;     // TOML config + env overrides
pub mod weather;    // Event-day forecast
pub mod logging;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use registry::{
    filter_items, status_of, CategoryFilter, ItemEdit, PriceRange, RegistryError, RegistryItem,
    RegistryItemStatus, RegistryQuery,
};
pub use party::{group_by_side, PartyBySide, PartyMember, Side};
pub use db::{
    Event, SeedData,
    open_database, setup_database, load_seed, load_registry_csv, import_seed,
    insert_items, get_all_items, get_item, save_item, delete_item, mutate_item, count_items,
    insert_party_members, get_party_members,
    insert_event, get_events_for_entity,
};
pub use auth::{CookieSource, AdminSession};
pub use config::{AppConfig, load_config};
pub use weather::{DailyForecast, parse_forecast};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
