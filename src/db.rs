use crate::party::{PartyMember, Side};
use crate::registry::{RegistryError, RegistryItem};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

// ============================================================================
// SEED DATA
// ============================================================================

/// Static seed file: `{ "registry": [...], "party": [...] }`
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SeedData {
    #[serde(default)]
    pub registry: Vec<RegistryItem>,

    #[serde(default)]
    pub party: Vec<PartyMember>,
}

/// One row of a registry spreadsheet export
#[derive(Debug, Deserialize)]
struct CsvRegistryRow {
    #[serde(rename = "Name")]
    name: String,

    #[serde(rename = "Description", default)]
    description: String,

    #[serde(rename = "Category")]
    category: String,

    #[serde(rename = "Price")]
    price: f64,

    #[serde(rename = "Image_URL", default)]
    image_url: Option<String>,

    #[serde(rename = "Purchase_URL", default)]
    purchase_url: Option<String>,

    #[serde(rename = "Group_Gift", default)]
    is_group_gift: bool,
}

impl From<CsvRegistryRow> for RegistryItem {
    fn from(row: CsvRegistryRow) -> Self {
        let mut item = RegistryItem::new(&row.name, &row.category, row.price);
        item.description = row.description;
        item.image_url = row.image_url.filter(|u| !u.is_empty());
        item.purchase_url = row.purchase_url.filter(|u| !u.is_empty());
        item.is_group_gift = row.is_group_gift;
        item
    }
}

// ============================================================================
// EVENT LOG
// ============================================================================

/// Audit trail entry: every registry change is an event
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

// ============================================================================
// SETUP
// ============================================================================

/// Open (or create) the database file and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database: {:?}", path))?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery (in-memory databases report "memory")
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!(journal_mode = %mode, "database journal mode");

    // ==========================================================================
    // Registry Items
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS registry_items (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL,
            price REAL NOT NULL,
            image_url TEXT,
            purchase_url TEXT,
            is_group_gift INTEGER NOT NULL DEFAULT 0,
            purchased INTEGER NOT NULL DEFAULT 0,
            amount_contributed REAL NOT NULL DEFAULT 0,
            contributors TEXT NOT NULL DEFAULT '[]',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Wedding Party
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS wedding_party (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            role TEXT NOT NULL,
            side TEXT NOT NULL,
            bio TEXT NOT NULL DEFAULT '',
            image_url TEXT,
            sort_order INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    // ==========================================================================
    // Admin Sessions (only the token hash is stored)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS admin_sessions (
            token_hash TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_registry_category ON registry_items(category)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sessions_expires ON admin_sessions(expires_at)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// IMPORT
// ============================================================================

pub fn load_seed(path: &Path) -> Result<SeedData> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {:?}", path))?;
    let seed: SeedData = serde_json::from_str(&content).context("Failed to parse seed JSON")?;
    Ok(seed)
}

pub fn load_registry_csv(path: &Path) -> Result<Vec<RegistryItem>> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    parse_registry_csv(file)
}

pub fn parse_registry_csv<R: Read>(reader: R) -> Result<Vec<RegistryItem>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut items = Vec::new();

    for (line, result) in rdr.deserialize().enumerate() {
        let row: CsvRegistryRow =
            result.with_context(|| format!("Failed to deserialize registry row {}", line + 1))?;
        let item = RegistryItem::from(row);
        item.validate()
            .with_context(|| format!("Invalid registry row {}", line + 1))?;
        items.push(item);
    }

    Ok(items)
}

/// Insert seed data, skipping ids that already exist. Returns (items, members) inserted.
pub fn import_seed(conn: &Connection, seed: &SeedData) -> Result<(usize, usize)> {
    let items = insert_items(conn, &seed.registry, "seed_importer")?;
    let members = insert_party_members(conn, &seed.party)?;
    Ok((items, members))
}

// ============================================================================
// REGISTRY ITEMS
// ============================================================================

const ITEM_COLUMNS: &str = "id, name, description, category, price, image_url, purchase_url,
     is_group_gift, purchased, amount_contributed, contributors";

fn item_from_row(row: &Row) -> rusqlite::Result<RegistryItem> {
    let contributors_json: String = row.get(10)?;
    let contributors = serde_json::from_str(&contributors_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?;

    Ok(RegistryItem {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        price: row.get(4)?,
        image_url: row.get(5)?,
        purchase_url: row.get(6)?,
        is_group_gift: row.get(7)?,
        purchased: row.get(8)?,
        amount_contributed: row.get(9)?,
        contributors,
    })
}

/// Insert items; existing ids are skipped so imports can be re-run
pub fn insert_items(conn: &Connection, items: &[RegistryItem], actor: &str) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;

    for item in items {
        let contributors_json = serde_json::to_string(&item.contributors)?;

        let result = conn.execute(
            "INSERT INTO registry_items (
                id, name, description, category, price, image_url, purchase_url,
                is_group_gift, purchased, amount_contributed, contributors
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                item.id,
                item.name,
                item.description,
                item.category,
                item.price,
                item.image_url,
                item.purchase_url,
                item.is_group_gift,
                item.purchased,
                item.amount_contributed,
                contributors_json,
            ],
        );

        match result {
            Ok(_) => {
                inserted += 1;
                let event = Event::new(
                    "item_added",
                    "registry_item",
                    &item.id,
                    serde_json::json!({
                        "name": item.name,
                        "category": item.category,
                        "price": item.price,
                    }),
                    actor,
                );
                insert_event(conn, &event)?;
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                duplicates += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(inserted, duplicates, "registry items imported");
    Ok(inserted)
}

/// All items, grouped by category then name
pub fn get_all_items(conn: &Connection) -> Result<Vec<RegistryItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM registry_items ORDER BY category, name",
        ITEM_COLUMNS
    ))?;

    let items = stmt
        .query_map([], item_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(items)
}

pub fn get_item(conn: &Connection, id: &str) -> Result<Option<RegistryItem>> {
    let item = conn
        .query_row(
            &format!("SELECT {} FROM registry_items WHERE id = ?1", ITEM_COLUMNS),
            params![id],
            item_from_row,
        )
        .optional()?;
    Ok(item)
}

/// Insert or overwrite an item and record who did it
pub fn save_item(conn: &Connection, item: &RegistryItem, actor: &str) -> Result<()> {
    let contributors_json = serde_json::to_string(&item.contributors)?;

    conn.execute(
        "INSERT INTO registry_items (
            id, name, description, category, price, image_url, purchase_url,
            is_group_gift, purchased, amount_contributed, contributors
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            category = excluded.category,
            price = excluded.price,
            image_url = excluded.image_url,
            purchase_url = excluded.purchase_url,
            is_group_gift = excluded.is_group_gift,
            purchased = excluded.purchased,
            amount_contributed = excluded.amount_contributed,
            contributors = excluded.contributors",
        params![
            item.id,
            item.name,
            item.description,
            item.category,
            item.price,
            item.image_url,
            item.purchase_url,
            item.is_group_gift,
            item.purchased,
            item.amount_contributed,
            contributors_json,
        ],
    )?;

    let event = Event::new(
        "item_saved",
        "registry_item",
        &item.id,
        serde_json::to_value(item)?,
        actor,
    );
    insert_event(conn, &event)?;

    Ok(())
}

/// Returns false when no item had that id
pub fn delete_item(conn: &Connection, id: &str, actor: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM registry_items WHERE id = ?1", params![id])?;

    if deleted > 0 {
        let event = Event::new(
            "item_deleted",
            "registry_item",
            id,
            serde_json::json!({}),
            actor,
        );
        insert_event(conn, &event)?;
    }

    Ok(deleted > 0)
}

/// Load an item, apply a domain change and persist it in one transaction.
///
/// Domain failures come back as `RegistryError` inside the `anyhow::Error`
/// (use `downcast_ref`); unknown ids are `RegistryError::NotFound`.
pub fn mutate_item<T, F>(
    conn: &mut Connection,
    id: &str,
    event_type: &str,
    actor: &str,
    change: F,
) -> Result<(RegistryItem, T)>
where
    F: FnOnce(&mut RegistryItem) -> Result<T, RegistryError>,
{
    let tx = conn.transaction()?;

    let mut item = get_item(&tx, id)?.ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
    let outcome = change(&mut item)?;

    let contributors_json = serde_json::to_string(&item.contributors)?;
    tx.execute(
        "UPDATE registry_items
         SET purchased = ?2, amount_contributed = ?3, contributors = ?4
         WHERE id = ?1",
        params![item.id, item.purchased, item.amount_contributed, contributors_json],
    )?;

    let event = Event::new(
        event_type,
        "registry_item",
        &item.id,
        serde_json::json!({
            "purchased": item.purchased,
            "amount_contributed": item.amount_contributed,
            "status": item.status().as_str(),
        }),
        actor,
    );
    insert_event(&tx, &event)?;

    tx.commit()?;
    Ok((item, outcome))
}

pub fn count_items(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM registry_items", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// WEDDING PARTY
// ============================================================================

pub fn insert_party_members(conn: &Connection, members: &[PartyMember]) -> Result<usize> {
    let mut inserted = 0;

    for member in members {
        let result = conn.execute(
            "INSERT INTO wedding_party (id, name, role, side, bio, image_url, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                member.id,
                member.name,
                member.role,
                member.side.as_str(),
                member.bio,
                member.image_url,
                member.sort_order,
            ],
        );

        match result {
            Ok(_) => inserted += 1,
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation => {}
            Err(e) => return Err(e.into()),
        }
    }

    info!(inserted, "wedding party imported");
    Ok(inserted)
}

pub fn get_party_members(conn: &Connection) -> Result<Vec<PartyMember>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, role, side, bio, image_url, sort_order
         FROM wedding_party
         ORDER BY sort_order, name",
    )?;

    let members = stmt
        .query_map([], |row| {
            let side_str: String = row.get(3)?;
            let side = Side::parse(&side_str).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    Type::Text,
                    format!("unknown side: {}", side_str).into(),
                )
            })?;

            Ok(PartyMember {
                id: row.get(0)?,
                name: row.get(1)?,
                role: row.get(2)?,
                side,
                bio: row.get(4)?,
                image_url: row.get(5)?,
                sort_order: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(members)
}

// ============================================================================
// ADMIN SESSIONS
// ============================================================================

pub fn insert_session(
    conn: &Connection,
    token_hash: &str,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO admin_sessions (token_hash, created_at, expires_at) VALUES (?1, ?2, ?3)",
        params![token_hash, created_at.timestamp(), expires_at.timestamp()],
    )?;
    Ok(())
}

pub fn get_session_expiry(conn: &Connection, token_hash: &str) -> Result<Option<DateTime<Utc>>> {
    let expires_at: Option<i64> = conn
        .query_row(
            "SELECT expires_at FROM admin_sessions WHERE token_hash = ?1",
            params![token_hash],
            |row| row.get(0),
        )
        .optional()?;

    Ok(expires_at.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)))
}

pub fn delete_session(conn: &Connection, token_hash: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM admin_sessions WHERE token_hash = ?1",
        params![token_hash],
    )?;
    Ok(deleted > 0)
}

pub fn delete_expired_sessions(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM admin_sessions WHERE expires_at <= ?1",
        params![now.timestamp()],
    )?;
    Ok(deleted)
}

// ============================================================================
// EVENTS
// ============================================================================

pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Events for one entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e))
                    })?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
                })?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}
