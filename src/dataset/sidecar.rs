// Optional side files consumed at load time: the hero -> role lookup, the
// community player allow-list, and the hand-maintained awards-tables CSV.
//
// All of these degrade to empty defaults when missing or unreadable; the
// dashboard must come up even with nothing but the match CSV.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use tracing::warn;

use crate::dataset::normalize::Role;

// ---------------------------------------------------------------------------
// Hero -> role lookup
// ---------------------------------------------------------------------------

/// Load the hero -> role JSON map (`{"Muradin": "Tank", ...}`). Entries with
/// an unrecognized role string are dropped with a warning.
pub fn load_role_map(path: &Path) -> HashMap<String, Role> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("could not read role map {}: {e}", path.display());
            return HashMap::new();
        }
    };

    let raw: HashMap<String, String> = match serde_json::from_str(&text) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("could not parse role map {}: {e}", path.display());
            return HashMap::new();
        }
    };

    let mut map = HashMap::with_capacity(raw.len());
    for (hero, role_str) in raw {
        match Role::parse(&role_str) {
            Some(role) => {
                map.insert(hero, role);
            }
            None => warn!("role map entry for '{hero}' has unknown role '{role_str}'"),
        }
    }
    map
}

// ---------------------------------------------------------------------------
// Player allow-list
// ---------------------------------------------------------------------------

/// Load the player allow-list: one name per line, aliases resolved to their
/// canonical form (the same table the normalizer uses, so list entries match
/// normalized rows), duplicates collapsed.
pub fn load_players_list(path: &Path, aliases: &HashMap<String, String>) -> BTreeSet<String> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("could not read players list {}: {e}", path.display());
            return BTreeSet::new();
        }
    };

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|name| {
            aliases
                .get(&name.to_lowercase())
                .cloned()
                .unwrap_or_else(|| name.to_string())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Awards-tables CSV
// ---------------------------------------------------------------------------

/// One named table recognized inside the awards CSV and the columns laid out
/// beneath its header token.
#[derive(Debug, Clone, Copy)]
pub struct AwardTableDef {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub value_column: &'static str,
    pub value_label: &'static str,
    pub is_time: bool,
}

impl AwardTableDef {
    const fn new(
        name: &'static str,
        columns: &'static [&'static str],
        value_column: &'static str,
        value_label: &'static str,
        is_time: bool,
    ) -> Self {
        AwardTableDef {
            name,
            columns,
            value_column,
            value_label,
            is_time,
        }
    }
}

/// The ~20 tables the spreadsheet encodes side by side, keyed by the header
/// token the parser scans for.
pub const AWARD_TABLE_DEFS: &[AwardTableDef] = &[
    AwardTableDef::new(
        "Top Kills",
        &["PlayerName", "HeroName", "HeroKills", "GameTime", "Winner"],
        "HeroKills",
        "Kills",
        false,
    ),
    AwardTableDef::new(
        "Top Hero Damage",
        &["PlayerName", "HeroName", "HeroDamage", "GameTime", "Winner"],
        "HeroDamage",
        "Daño",
        false,
    ),
    AwardTableDef::new(
        "Top Time Death",
        &["PlayerName", "HeroName", "SpentDead", "GameTime", "Winner"],
        "SpentDead",
        "Tiempo Muerto",
        true,
    ),
    AwardTableDef::new(
        "Partida mas Corta",
        &["GameTime", "PlayerName", "HeroName", "Winner"],
        "GameTime",
        "Duración",
        true,
    ),
    AwardTableDef::new(
        "Top Assists",
        &["PlayerName", "HeroName", "Assists", "GameTime", "Winner"],
        "Assists",
        "Asistencias",
        false,
    ),
    AwardTableDef::new(
        "Top Siege Damage",
        &[
            "PlayerName",
            "HeroName",
            "TotalSiegeDamage",
            "GameTime",
            "Winner",
        ],
        "TotalSiegeDamage",
        "Daño Siege",
        false,
    ),
    AwardTableDef::new(
        "Top Time OnFire",
        &["PlayerName", "HeroName", "OnFire", "GameTime", "Winner"],
        "OnFire",
        "En Llamas",
        true,
    ),
    AwardTableDef::new(
        "Partida mas Larga",
        &["GameTime", "PlayerName", "HeroName", "Winner"],
        "GameTime",
        "Duración",
        true,
    ),
    AwardTableDef::new(
        "Top Deaths",
        &["PlayerName", "HeroName", "Deaths", "GameTime", "Winner"],
        "Deaths",
        "Muertes",
        false,
    ),
    AwardTableDef::new(
        "Top Tank Damage",
        &["PlayerName", "HeroName", "DamageTaken", "GameTime", "Winner"],
        "DamageTaken",
        "Daño Recibido",
        false,
    ),
    AwardTableDef::new(
        "Top Capturas Mercenarios",
        &[
            "PlayerName",
            "HeroName",
            "MercCampCaptures",
            "GameTime",
            "Winner",
        ],
        "MercCampCaptures",
        "Capturas",
        false,
    ),
    AwardTableDef::new(
        "Top Kills W/Healer",
        &["PlayerName", "HeroName", "HeroKills", "GameTime", "Winner"],
        "HeroKills",
        "Kills",
        false,
    ),
    AwardTableDef::new(
        "Less Tank Damage",
        &["PlayerName", "HeroName", "DamageTaken", "GameTime", "Winner"],
        "DamageTaken",
        "Daño Recibido",
        false,
    ),
    AwardTableDef::new(
        "Top Globitos",
        &[
            "PlayerName",
            "HeroName",
            "RegenGlobes",
            "GameTime",
            "Winner",
            "GperMin",
        ],
        "RegenGlobes",
        "Globos",
        false,
    ),
    AwardTableDef::new(
        "Top Damage W/Healer",
        &["PlayerName", "HeroName", "HeroDamage", "GameTime", "Winner"],
        "HeroDamage",
        "Daño",
        false,
    ),
    AwardTableDef::new(
        "Top Healing",
        &[
            "PlayerName",
            "HeroName",
            "HealingShielding",
            "GameTime",
            "Winner",
        ],
        "HealingShielding",
        "Curación",
        false,
    ),
    AwardTableDef::new(
        "Less Healing",
        &[
            "PlayerName",
            "HeroName",
            "HealingShielding",
            "GameTime",
            "Winner",
        ],
        "HealingShielding",
        "Curación",
        false,
    ),
    AwardTableDef::new(
        "Top Self Healing",
        &["PlayerName", "HeroName", "SelfHealing", "GameTime", "Winner"],
        "SelfHealing",
        "Auto-curación",
        false,
    ),
    AwardTableDef::new(
        "Top Exp",
        &["PlayerName", "HeroName", "Experience", "GameTime", "Winner"],
        "Experience",
        "Experiencia",
        false,
    ),
    AwardTableDef::new(
        "Top Minion Killer",
        &["PlayerName", "HeroName", "Experience", "GameTime", "Winner"],
        "Experience",
        "Daño a Minions",
        false,
    ),
];

fn def_by_name(name: &str) -> Option<&'static AwardTableDef> {
    AWARD_TABLE_DEFS.iter().find(|d| d.name == name)
}

/// A parsed award table: entries keyed by column name, in sheet order.
#[derive(Debug, Clone, PartialEq)]
pub struct AwardTable {
    pub name: String,
    pub value_column: String,
    pub value_label: String,
    pub is_time: bool,
    pub entries: Vec<HashMap<String, String>>,
}

/// Parse the awards CSV: tables sit side by side in adjacent column blocks,
/// each introduced by a known name token, followed by a column-header row,
/// followed by data rows. A block ends at an empty leading cell or the next
/// table token in the same column.
pub fn parse_award_tables(text: &str) -> HashMap<String, AwardTable> {
    let lines: Vec<Vec<&str>> = text.lines().map(|line| line.split(',').collect()).collect();
    let mut tables = HashMap::new();

    for (row, line) in lines.iter().enumerate() {
        for (col, cell) in line.iter().enumerate() {
            let Some(def) = def_by_name(cell.trim()) else {
                continue;
            };
            // The row immediately below the token holds the column headers.
            if lines.get(row + 1).is_none() {
                continue;
            }

            let mut entries = Vec::new();
            for data_line in lines.iter().skip(row + 2) {
                let first = data_line.get(col).map(|c| c.trim()).unwrap_or("");
                if first.is_empty() || def_by_name(first).is_some() {
                    break;
                }

                let mut entry = HashMap::new();
                let mut has_data = false;
                for (i, column) in def.columns.iter().enumerate() {
                    let value = data_line
                        .get(col + i)
                        .map(|c| c.trim())
                        .unwrap_or("")
                        .to_string();
                    if !value.is_empty()
                        && (*column == "PlayerName"
                            || (*column == "GameTime" && def.name.contains("Partida")))
                    {
                        has_data = true;
                    }
                    entry.insert((*column).to_string(), value);
                }

                if has_data {
                    entries.push(entry);
                }
            }

            if !entries.is_empty() {
                tables.insert(
                    def.name.to_string(),
                    AwardTable {
                        name: def.name.to_string(),
                        value_column: def.value_column.to_string(),
                        value_label: def.value_label.to_string(),
                        is_time: def.is_time,
                        entries,
                    },
                );
            }
        }
    }

    tables
}

/// Load and parse the awards CSV, degrading to no tables when absent.
pub fn load_award_tables(path: &Path) -> HashMap<String, AwardTable> {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_award_tables(&text),
        Err(e) => {
            warn!("could not read awards tables {}: {e}", path.display());
            HashMap::new()
        }
    }
}

/// Format a table cell for display: time values pass through as-is, numeric
/// values get a compact K/M rendering, anything else is shown verbatim.
pub fn format_award_value(value: &str, is_time: bool) -> String {
    if value.is_empty() {
        return "-".to_string();
    }
    if is_time {
        return value.to_string();
    }
    match value.parse::<i64>() {
        Ok(n) => crate::format::format_compact(n as f64),
        Err(_) => value.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
