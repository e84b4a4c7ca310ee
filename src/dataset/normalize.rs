// Row normalization: raw CSV fields to typed match records plus dataset
// metadata. Pure functions, no I/O.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dataset::loader::RawRow;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Coarse hero classification used to restrict award computations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Role {
    Tank,
    Bruiser,
    MeleeAssassin,
    RangedAssassin,
    Mage,
    Healer,
    Support,
    Unknown,
}

impl Role {
    /// Parse a role as it appears in the CSV `Role` column. Tolerates case
    /// differences, stray whitespace, and the historical "assasin" typo.
    pub fn parse(value: &str) -> Option<Role> {
        let normalized = value.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return None;
        }
        match normalized.to_lowercase().as_str() {
            "tank" => Some(Role::Tank),
            "bruiser" => Some(Role::Bruiser),
            "melee assassin" | "melee assasin" => Some(Role::MeleeAssassin),
            "ranged assassin" | "ranged assasin" => Some(Role::RangedAssassin),
            "mage" => Some(Role::Mage),
            "healer" => Some(Role::Healer),
            "support" => Some(Role::Support),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Tank => "Tank",
            Role::Bruiser => "Bruiser",
            Role::MeleeAssassin => "Melee Assassin",
            Role::RangedAssassin => "Ranged Assassin",
            Role::Mage => "Mage",
            Role::Healer => "Healer",
            Role::Support => "Support",
            Role::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// MatchRow
// ---------------------------------------------------------------------------

/// One player's performance in one match. Created once at load time and
/// immutable thereafter; this is also the shape serialized into the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRow {
    // Identifiers
    pub player_name: String,
    pub hero_name: String,
    pub map: String,
    /// Full replay file name; groups all participants of one game.
    pub replay_name: String,

    pub role: Role,

    // Game info
    pub team: String,
    pub game_mode: String,

    // Date handling
    pub date: Option<NaiveDate>,
    /// `YYYY-MM-DD`, empty when the date could not be determined.
    pub date_iso: String,

    pub winner: bool,
    pub game_time_secs: u32,

    // Combat stats
    pub hero_kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub takedowns: u32,

    // Damage / healing stats
    pub hero_damage: u64,
    pub siege_damage: u64,
    pub damage_taken: u64,
    pub healing_shielding: u64,
    pub self_healing: u64,

    // Other stats
    pub experience: u64,
    pub spent_dead_secs: u32,
    pub on_fire_secs: u32,

    /// Free-text per-match award tag (e.g. "AwardMVP").
    pub award: String,

    pub player_level: u32,
    pub hero_level: u32,
}

impl MatchRow {
    /// Combined hero + structure damage.
    pub fn total_damage(&self) -> u64 {
        self.hero_damage + self.siege_damage
    }
}

// ---------------------------------------------------------------------------
// DatasetMeta
// ---------------------------------------------------------------------------

/// Aggregate metadata derived from the full row set. Always recomputed from
/// scratch, never partially updated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatasetMeta {
    pub total_rows: usize,
    pub date_min: Option<NaiveDate>,
    pub date_max: Option<NaiveDate>,
    pub players: Vec<String>,
    pub heroes: Vec<String>,
    pub maps: Vec<String>,
    /// Distinct roles present in the data, excluding `Unknown`.
    pub roles: Vec<Role>,
}

// ---------------------------------------------------------------------------
// Normalization context
// ---------------------------------------------------------------------------

/// Lookup data the normalizer needs: the hero -> role sidecar map and the
/// community's player alias table (lowercased alias -> canonical name).
#[derive(Debug, Clone, Default)]
pub struct NormalizeContext {
    role_map: HashMap<String, Role>,
    aliases: HashMap<String, String>,
}

impl NormalizeContext {
    pub fn new(role_map: HashMap<String, Role>, aliases: HashMap<String, String>) -> Self {
        Self { role_map, aliases }
    }

    /// Map a raw player name to its canonical form: trimmed, with community
    /// aliases resolved case-insensitively.
    pub fn canonical_player(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        match self.aliases.get(&trimmed.to_lowercase()) {
            Some(canonical) => canonical.clone(),
            None => trimmed.to_string(),
        }
    }

    /// Role fallback when the CSV `Role` column is empty or unrecognized.
    pub fn role_for_hero(&self, hero: &str) -> Role {
        self.role_map.get(hero).copied().unwrap_or(Role::Unknown)
    }
}

// ---------------------------------------------------------------------------
// Field parsers
// ---------------------------------------------------------------------------

/// Normalize the Winner column to a boolean. The exports have used several
/// spellings over the years (including Spanish); anything unrecognized
/// counts as a loss.
pub fn normalize_winner(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "yes" | "win" | "won" | "1" | "victory" | "si" | "sí"
    )
}

/// Parse a duration field: plain seconds, `mm:ss`, or `hh:mm:ss`.
/// Unparseable values become zero.
pub fn parse_duration_secs(value: &str) -> u32 {
    let s = value.trim();
    if s.is_empty() {
        return 0;
    }

    if s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse().unwrap_or(0);
    }

    let parts: Vec<u32> = s
        .split(':')
        .map(|p| p.trim().parse::<u32>().unwrap_or(0))
        .collect();

    match parts.as_slice() {
        [h, m, sec] => h * 3600 + m * 60 + sec,
        [m, sec] => m * 60 + sec,
        _ => 0,
    }
}

/// Parse a numeric field, treating empty or unparseable values as zero.
pub fn parse_number(value: &str) -> f64 {
    let s = value.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

fn parse_u32(value: &str) -> u32 {
    parse_number(value).round().max(0.0) as u32
}

fn parse_u64(value: &str) -> u64 {
    parse_number(value).round().max(0.0) as u64
}

/// Parse the common date spellings seen in the Date column:
/// `YYYY-MM-DD`, `YYYY/MM/DD`, `DD/MM/YYYY`, `DD-MM-YYYY`, or an ISO
/// datetime prefix.
pub fn parse_date_flexible(value: &str) -> Option<NaiveDate> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }

    const FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];
    for fmt in FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    s.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Extract the match date from the replay file name.
///
/// New exports: `YYYY-MM-DD HH.MM.SS MapName.StormReplay`.
/// Old exports dropped the year from the name (`-MM-DD HH.MM.SS ...`) and
/// carried it in a separate Year column.
pub fn date_from_replay_name(file_name: &str, year_field: &str) -> Option<NaiveDate> {
    if let Some(prefix) = file_name.get(..10) {
        if let Ok(d) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(d);
        }
    }

    let rest = file_name.strip_prefix('-')?;
    let year: i32 = year_field.trim().parse().ok()?;
    if rest.get(2..3) != Some("-") {
        return None;
    }
    let month: u32 = rest.get(..2)?.parse().ok()?;
    let day: u32 = rest.get(3..5)?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

// ---------------------------------------------------------------------------
// Row normalization
// ---------------------------------------------------------------------------

fn field<'a>(raw: &'a RawRow, key: &str) -> &'a str {
    raw.get(key).map(String::as_str).unwrap_or("")
}

/// Normalize a single raw row. Returns `None` when the mandatory identifying
/// fields (player and hero name) are missing.
pub fn normalize_row(raw: &RawRow, ctx: &NormalizeContext) -> Option<MatchRow> {
    let player_name = ctx.canonical_player(field(raw, "PlayerName"));
    let hero_name = field(raw, "HeroName").trim().to_string();
    if player_name.is_empty() || hero_name.is_empty() {
        return None;
    }

    // Some exports call the replay-name column FileName, older ones Name.
    let file_name = {
        let f = field(raw, "FileName").trim();
        if f.is_empty() {
            field(raw, "Name").trim()
        } else {
            f
        }
    }
    .to_string();

    let date = date_from_replay_name(&file_name, field(raw, "Year"))
        .or_else(|| parse_date_flexible(field(raw, "Date")));
    let date_iso = date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    // The CSV Role column is the source of truth; the sidecar hero map only
    // fills gaps.
    let role = Role::parse(field(raw, "Role")).unwrap_or_else(|| ctx.role_for_hero(&hero_name));

    Some(MatchRow {
        player_name,
        hero_name,
        map: field(raw, "Map").trim().to_string(),
        replay_name: file_name,
        role,
        team: field(raw, "Team").trim().to_string(),
        game_mode: field(raw, "GameMode").trim().to_string(),
        date,
        date_iso,
        winner: normalize_winner(field(raw, "Winner")),
        game_time_secs: parse_duration_secs(field(raw, "GameTime")),
        hero_kills: parse_u32(field(raw, "HeroKills")),
        deaths: parse_u32(field(raw, "Deaths")),
        assists: parse_u32(field(raw, "Assists")),
        takedowns: parse_u32(field(raw, "Takedowns")),
        hero_damage: parse_u64(field(raw, "HeroDamage")),
        siege_damage: parse_u64(field(raw, "TotalSiegeDamage")),
        damage_taken: parse_u64(field(raw, "DamageTaken")),
        healing_shielding: parse_u64(field(raw, "HealingShielding")),
        self_healing: parse_u64(field(raw, "SelfHealing")),
        experience: parse_u64(field(raw, "Experience")),
        spent_dead_secs: parse_duration_secs(field(raw, "SpentDead")),
        on_fire_secs: parse_duration_secs(field(raw, "OnFire")),
        award: field(raw, "Award").trim().to_string(),
        player_level: parse_u32(field(raw, "PlayerLevel")),
        hero_level: parse_u32(field(raw, "HeroLevel")),
    })
}

/// Normalize all raw rows and derive dataset metadata.
pub fn normalize_rows(raw_rows: &[RawRow], ctx: &NormalizeContext) -> (Vec<MatchRow>, DatasetMeta) {
    let mut rows = Vec::with_capacity(raw_rows.len());
    let mut skipped = 0usize;

    for raw in raw_rows {
        match normalize_row(raw, ctx) {
            Some(row) => rows.push(row),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("skipped {skipped} rows missing player or hero name");
    }

    let meta = compute_meta(&rows);
    (rows, meta)
}

/// Derive metadata from a normalized row set in a single pass.
pub fn compute_meta(rows: &[MatchRow]) -> DatasetMeta {
    let mut players = BTreeSet::new();
    let mut heroes = BTreeSet::new();
    let mut maps = BTreeSet::new();
    let mut roles = BTreeSet::new();
    let mut date_min: Option<NaiveDate> = None;
    let mut date_max: Option<NaiveDate> = None;

    for row in rows {
        if !row.player_name.is_empty() {
            players.insert(row.player_name.clone());
        }
        if !row.hero_name.is_empty() {
            heroes.insert(row.hero_name.clone());
        }
        if !row.map.is_empty() {
            maps.insert(row.map.clone());
        }
        if row.role != Role::Unknown {
            roles.insert(row.role);
        }
        if let Some(date) = row.date {
            date_min = Some(date_min.map_or(date, |min| min.min(date)));
            date_max = Some(date_max.map_or(date, |max| max.max(date)));
        }
    }

    DatasetMeta {
        total_rows: rows.len(),
        date_min,
        date_max,
        players: players.into_iter().collect(),
        heroes: heroes.into_iter().collect(),
        maps: maps.into_iter().collect(),
        roles: roles.into_iter().collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
