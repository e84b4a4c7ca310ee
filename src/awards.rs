// Award aggregation: the community's fixed superlative categories, computed
// from the full normalized row set.
//
// Every category uses a strict comparison against the running best, so on an
// exact tie the first candidate in scan order wins. Player groups are
// visited in first-appearance order, which makes the result deterministic
// for a given row order. A category with no qualifying rows yields no entry
// in the result map.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::dataset::normalize::{MatchRow, Role};
use crate::format::{format_duration, format_number};

/// Players below this average hero damage per match are not considered for
/// the "Fake Damage" award.
pub const FAKE_DAMAGE_MIN_AVG_DAMAGE: f64 = 30_000.0;

/// Canonical award names, as the community knows them.
pub mod names {
    pub const PARTIDA_MAS_VIOLENTA: &str = "Partida más violenta";
    pub const ASESINO_EN_SERIE: &str = "Asesino en Serie";
    pub const LLUVIA_DE_DANO: &str = "Lluvia de Daño";
    pub const DANO_CRONICO: &str = "Daño Crónico";
    pub const ANGEL_DE_LA_GUARDA: &str = "Ángel de la Guarda";
    pub const SANADOR_SUPREMO: &str = "Sanador Supremo";
    pub const HEALER_QUE_NO_ES_HEALER: &str = "El healer que no es healer";
    pub const PROTAGONISTA_DEL_RESPAWN: &str = "Protagonista del Respawn";
    pub const ESPONJA_HUMANA: &str = "Esponja Humana";
    pub const TANK_MENOS_TANKEADOR: &str = "Tank menos tankeador";
    pub const FAKE_DAMAGE: &str = "Fake Damage";
    pub const CARRY_DEL_ANO: &str = "Carry del Año";
    pub const VICIOSO_DEL_ANO: &str = "Vicioso del Año";
    pub const HEALER_MAS_VIOLENTO: &str = "Healer más violento";
    pub const HEALER_ASESINO: &str = "Healer asesino";
    pub const AUTOCURACION: &str = "Autocuración";
    pub const ASISTENTE: &str = "Asistente";
    pub const TOP_SE_MURIO_MAS_VECES: &str = "Top se murió más veces";
    pub const TOP_DANO_A_ESTRUCTURAS: &str = "Top daño a estructuras";
    pub const TOP_DANO_TOTAL: &str = "Top daño TOTAL";
}

/// Presentation order of the award categories.
pub const AWARD_ORDER: &[&str] = &[
    names::PARTIDA_MAS_VIOLENTA,
    names::ASESINO_EN_SERIE,
    names::LLUVIA_DE_DANO,
    names::DANO_CRONICO,
    names::ANGEL_DE_LA_GUARDA,
    names::SANADOR_SUPREMO,
    names::HEALER_QUE_NO_ES_HEALER,
    names::PROTAGONISTA_DEL_RESPAWN,
    names::ESPONJA_HUMANA,
    names::TANK_MENOS_TANKEADOR,
    names::FAKE_DAMAGE,
    names::CARRY_DEL_ANO,
    names::VICIOSO_DEL_ANO,
    names::HEALER_MAS_VIOLENTO,
    names::HEALER_ASESINO,
    names::AUTOCURACION,
    names::ASISTENTE,
    names::TOP_SE_MURIO_MAS_VECES,
    names::TOP_DANO_A_ESTRUCTURAS,
    names::TOP_DANO_TOTAL,
];

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// The match behind a match-level or single-game award.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GameRef {
    pub map: String,
    pub date_iso: String,
    pub replay_name: String,
    /// Participants, in row order (match-level awards only).
    pub players: Vec<String>,
}

/// Winner of one award category.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AwardWinner {
    pub player: Option<String>,
    pub hero: Option<String>,
    pub role: Option<Role>,
    pub value: f64,
    pub formatted_value: String,
    /// Match count backing an average- or count-based award.
    pub matches: Option<u32>,
    pub game: Option<GameRef>,
    /// Fake Damage context: average kills+assists per match, rounded.
    pub impact: Option<f64>,
    /// Fake Damage context: average damage / average impact, rounded.
    pub ratio: Option<f64>,
}

// ---------------------------------------------------------------------------
// Aggregation helpers
// ---------------------------------------------------------------------------

struct MatchAccum {
    replay_name: String,
    map: String,
    date_iso: String,
    players: Vec<String>,
    total: f64,
}

/// Group rows by replay name (first-seen order) and return the match with
/// the highest summed metric. Rows without a replay name are skipped.
fn best_match_total(rows: &[MatchRow], metric: impl Fn(&MatchRow) -> f64) -> Option<AwardWinner> {
    let mut matches: Vec<MatchAccum> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        if row.replay_name.is_empty() {
            continue;
        }
        let i = *index.entry(row.replay_name.clone()).or_insert_with(|| {
            matches.push(MatchAccum {
                replay_name: row.replay_name.clone(),
                map: row.map.clone(),
                date_iso: row.date_iso.clone(),
                players: Vec::new(),
                total: 0.0,
            });
            matches.len() - 1
        });
        let entry = &mut matches[i];
        entry.total += metric(row);
        if !entry.players.contains(&row.player_name) {
            entry.players.push(row.player_name.clone());
        }
    }

    let mut best: Option<&MatchAccum> = None;
    let mut best_total = 0.0;
    for m in &matches {
        if m.total > best_total {
            best_total = m.total;
            best = Some(m);
        }
    }

    best.map(|m| AwardWinner {
        value: m.total,
        formatted_value: format_number(m.total),
        game: Some(GameRef {
            map: m.map.clone(),
            date_iso: m.date_iso.clone(),
            replay_name: m.replay_name.clone(),
            players: m.players.clone(),
        }),
        ..AwardWinner::default()
    })
}

/// Single scan for the row with the highest metric among qualifying rows.
/// Only strictly positive values can win.
fn max_row<'a>(
    rows: &'a [MatchRow],
    qualifies: impl Fn(&MatchRow) -> bool,
    metric: impl Fn(&MatchRow) -> f64,
) -> Option<(&'a MatchRow, f64)> {
    let mut best = None;
    let mut best_value = 0.0;
    for row in rows {
        if !qualifies(row) {
            continue;
        }
        let value = metric(row);
        if value > best_value {
            best_value = value;
            best = Some(row);
        }
    }
    best.map(|row| (row, best_value))
}

/// Single scan for the row with the lowest strictly-positive metric among
/// qualifying rows.
fn min_positive_row<'a>(
    rows: &'a [MatchRow],
    qualifies: impl Fn(&MatchRow) -> bool,
    metric: impl Fn(&MatchRow) -> f64,
) -> Option<(&'a MatchRow, f64)> {
    let mut best = None;
    let mut best_value = f64::INFINITY;
    for row in rows {
        if !qualifies(row) {
            continue;
        }
        let value = metric(row);
        if value > 0.0 && value < best_value {
            best_value = value;
            best = Some(row);
        }
    }
    best.map(|row| (row, best_value))
}

fn single_game_winner(row: &MatchRow, value: f64, formatted_value: String) -> AwardWinner {
    AwardWinner {
        player: Some(row.player_name.clone()),
        hero: Some(row.hero_name.clone()),
        role: Some(row.role),
        value,
        formatted_value,
        game: Some(GameRef {
            map: row.map.clone(),
            date_iso: row.date_iso.clone(),
            replay_name: row.replay_name.clone(),
            players: Vec::new(),
        }),
        ..AwardWinner::default()
    }
}

struct PlayerAccum {
    name: String,
    total: f64,
    matches: u32,
}

/// Per-player totals over qualifying rows, in first-appearance order.
fn player_totals(
    rows: &[MatchRow],
    qualifies: impl Fn(&MatchRow) -> bool,
    metric: impl Fn(&MatchRow) -> f64,
) -> Vec<PlayerAccum> {
    let mut players: Vec<PlayerAccum> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        if !qualifies(row) {
            continue;
        }
        let i = *index.entry(row.player_name.clone()).or_insert_with(|| {
            players.push(PlayerAccum {
                name: row.player_name.clone(),
                total: 0.0,
                matches: 0,
            });
            players.len() - 1
        });
        players[i].total += metric(row);
        players[i].matches += 1;
    }

    players
}

/// The player with the highest per-match average of the metric over
/// qualifying rows. Only strictly positive averages can win.
fn best_player_average(
    rows: &[MatchRow],
    qualifies: impl Fn(&MatchRow) -> bool,
    metric: impl Fn(&MatchRow) -> f64,
) -> Option<AwardWinner> {
    let mut best: Option<AwardWinner> = None;
    let mut best_avg = 0.0;

    for accum in player_totals(rows, qualifies, metric) {
        if accum.matches == 0 {
            continue;
        }
        let avg = accum.total / f64::from(accum.matches);
        if avg > best_avg {
            best_avg = avg;
            best = Some(AwardWinner {
                player: Some(accum.name),
                value: avg,
                formatted_value: format_number(avg),
                matches: Some(accum.matches),
                ..AwardWinner::default()
            });
        }
    }

    best
}

// ---------------------------------------------------------------------------
// Category rules
// ---------------------------------------------------------------------------

fn most_violent_match(rows: &[MatchRow]) -> Option<AwardWinner> {
    best_match_total(rows, |r| f64::from(r.hero_kills))
}

fn highest_damage_match(rows: &[MatchRow]) -> Option<AwardWinner> {
    best_match_total(rows, |r| r.total_damage() as f64)
}

fn top_healing_single_game(rows: &[MatchRow]) -> Option<AwardWinner> {
    max_row(rows, |r| r.role == Role::Healer, |r| r.healing_shielding as f64)
        .map(|(row, value)| single_game_winner(row, value, format_number(value)))
}

fn top_offrole_healing(rows: &[MatchRow]) -> Option<AwardWinner> {
    max_row(
        rows,
        |r| r.role != Role::Healer && r.role != Role::Support,
        |r| r.healing_shielding as f64,
    )
    .map(|(row, value)| AwardWinner {
        player: Some(row.player_name.clone()),
        hero: Some(row.hero_name.clone()),
        role: Some(row.role),
        value,
        formatted_value: format_number(value),
        ..AwardWinner::default()
    })
}

fn longest_time_dead(rows: &[MatchRow]) -> Option<AwardWinner> {
    max_row(rows, |_| true, |r| f64::from(r.spent_dead_secs))
        .map(|(row, value)| single_game_winner(row, value, format_duration(value as u32)))
}

fn most_damage_soaked(rows: &[MatchRow]) -> Option<AwardWinner> {
    max_row(rows, |r| r.role == Role::Tank, |r| r.damage_taken as f64)
        .map(|(row, value)| single_game_winner(row, value, format_number(value)))
}

fn least_damage_soaked(rows: &[MatchRow]) -> Option<AwardWinner> {
    min_positive_row(rows, |r| r.role == Role::Tank, |r| r.damage_taken as f64)
        .map(|(row, value)| single_game_winner(row, value, format_number(value)))
}

/// High average damage with low average impact: among players averaging more
/// than `FAKE_DAMAGE_MIN_AVG_DAMAGE` hero damage with a non-zero average of
/// kills + assists, the worst damage-to-impact ratio wins.
fn fake_damage(rows: &[MatchRow]) -> Option<AwardWinner> {
    struct Accum {
        name: String,
        damage: f64,
        kills: f64,
        assists: f64,
        matches: u32,
    }

    let mut players: Vec<Accum> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let i = *index.entry(row.player_name.clone()).or_insert_with(|| {
            players.push(Accum {
                name: row.player_name.clone(),
                damage: 0.0,
                kills: 0.0,
                assists: 0.0,
                matches: 0,
            });
            players.len() - 1
        });
        players[i].damage += row.hero_damage as f64;
        players[i].kills += f64::from(row.hero_kills);
        players[i].assists += f64::from(row.assists);
        players[i].matches += 1;
    }

    let mut best: Option<AwardWinner> = None;
    let mut worst_ratio = 0.0;

    for accum in &players {
        if accum.matches == 0 {
            continue;
        }
        let matches = f64::from(accum.matches);
        let avg_damage = accum.damage / matches;
        let avg_impact = (accum.kills + accum.assists) / matches;
        if avg_damage <= FAKE_DAMAGE_MIN_AVG_DAMAGE || avg_impact <= 0.0 {
            continue;
        }
        let ratio = avg_damage / avg_impact;
        if ratio > worst_ratio {
            worst_ratio = ratio;
            best = Some(AwardWinner {
                player: Some(accum.name.clone()),
                value: avg_damage,
                formatted_value: format_number(avg_damage),
                matches: Some(accum.matches),
                impact: Some(avg_impact.round()),
                ratio: Some(ratio.round()),
                ..AwardWinner::default()
            });
        }
    }

    best
}

fn most_mvps(rows: &[MatchRow]) -> Option<AwardWinner> {
    let mvps = player_totals(
        rows,
        |r| r.award.to_lowercase().contains("mvp"),
        |_| 1.0,
    );

    let mut best: Option<AwardWinner> = None;
    let mut best_count = 0u32;
    for accum in mvps {
        if accum.matches > best_count {
            best_count = accum.matches;
            let plural = if best_count == 1 { "" } else { "s" };
            best = Some(AwardWinner {
                player: Some(accum.name),
                value: f64::from(best_count),
                formatted_value: format!("{best_count} MVP{plural}"),
                ..AwardWinner::default()
            });
        }
    }
    best
}

fn most_matches_played(rows: &[MatchRow]) -> Option<AwardWinner> {
    let counts = player_totals(rows, |_| true, |_| 1.0);

    let mut best: Option<AwardWinner> = None;
    let mut best_count = 0u32;
    for accum in counts {
        if accum.matches > best_count {
            best_count = accum.matches;
            best = Some(AwardWinner {
                player: Some(accum.name),
                value: f64::from(best_count),
                formatted_value: format_number(f64::from(best_count)),
                ..AwardWinner::default()
            });
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn insert_if(
    winners: &mut BTreeMap<String, AwardWinner>,
    name: &str,
    winner: Option<AwardWinner>,
) {
    if let Some(winner) = winner {
        winners.insert(name.to_string(), winner);
    }
}

/// Compute the winner of every award category. Pure function of the row
/// set; recomputed from scratch on every input change.
pub fn calculate_winners(rows: &[MatchRow]) -> BTreeMap<String, AwardWinner> {
    let mut winners = BTreeMap::new();

    let is_healer = |r: &MatchRow| r.role == Role::Healer;

    insert_if(
        &mut winners,
        names::PARTIDA_MAS_VIOLENTA,
        most_violent_match(rows),
    );
    insert_if(
        &mut winners,
        names::ASESINO_EN_SERIE,
        best_player_average(rows, |_| true, |r| f64::from(r.hero_kills)),
    );
    insert_if(&mut winners, names::LLUVIA_DE_DANO, highest_damage_match(rows));
    insert_if(
        &mut winners,
        names::DANO_CRONICO,
        best_player_average(rows, |_| true, |r| r.hero_damage as f64),
    );
    insert_if(
        &mut winners,
        names::ANGEL_DE_LA_GUARDA,
        top_healing_single_game(rows),
    );
    insert_if(
        &mut winners,
        names::SANADOR_SUPREMO,
        best_player_average(rows, is_healer, |r| r.healing_shielding as f64),
    );
    insert_if(
        &mut winners,
        names::HEALER_QUE_NO_ES_HEALER,
        top_offrole_healing(rows),
    );
    insert_if(
        &mut winners,
        names::PROTAGONISTA_DEL_RESPAWN,
        longest_time_dead(rows),
    );
    insert_if(&mut winners, names::ESPONJA_HUMANA, most_damage_soaked(rows));
    insert_if(
        &mut winners,
        names::TANK_MENOS_TANKEADOR,
        least_damage_soaked(rows),
    );
    insert_if(&mut winners, names::FAKE_DAMAGE, fake_damage(rows));
    insert_if(&mut winners, names::CARRY_DEL_ANO, most_mvps(rows));
    insert_if(
        &mut winners,
        names::VICIOSO_DEL_ANO,
        most_matches_played(rows),
    );
    insert_if(
        &mut winners,
        names::HEALER_MAS_VIOLENTO,
        best_player_average(rows, is_healer, |r| r.hero_damage as f64),
    );
    insert_if(
        &mut winners,
        names::HEALER_ASESINO,
        best_player_average(rows, is_healer, |r| f64::from(r.hero_kills)),
    );
    insert_if(
        &mut winners,
        names::AUTOCURACION,
        best_player_average(rows, |_| true, |r| r.self_healing as f64),
    );
    insert_if(
        &mut winners,
        names::ASISTENTE,
        best_player_average(rows, |_| true, |r| f64::from(r.assists)),
    );
    insert_if(
        &mut winners,
        names::TOP_SE_MURIO_MAS_VECES,
        best_player_average(rows, |_| true, |r| f64::from(r.deaths)),
    );
    insert_if(
        &mut winners,
        names::TOP_DANO_A_ESTRUCTURAS,
        best_player_average(rows, |_| true, |r| r.siege_damage as f64),
    );
    insert_if(
        &mut winners,
        names::TOP_DANO_TOTAL,
        best_player_average(rows, |_| true, |r| r.total_damage() as f64),
    );

    winners
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
