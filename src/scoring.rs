//! Healing leaderboard: folds a report's events into ranked player rows.
//!
//! Pure functions only; safe to call concurrently for different reports.

use crate::config::ScoringConfig;
use crate::models::*;

/// Effective healing per healing point
pub const HEALING_POINT_DIVISOR: f64 = 1000.0;
/// Points per high-priority dispel
pub const DISPEL_POINTS: u32 = 10;

/// Events ordered by timestamp, ties kept in file order
pub fn ordered(events: &[CombatEvent]) -> Vec<&CombatEvent> {
    let mut sorted: Vec<&CombatEvent> = events.iter().collect();
    sorted.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.sequence.cmp(&b.sequence)));
    sorted
}

/// Build the ranked report for one event list
pub fn score_report(
    events: &[CombatEvent],
    report_id: &str,
    report_name: &str,
    config: &ScoringConfig,
    include_records: bool,
) -> Report {
    let events = ordered(events);

    let damage_taken = player_damage_taken(&events);
    let per_healer_share = if config.assumed_healer_count == 0 {
        0.0
    } else {
        damage_taken / config.assumed_healer_count as f64
    };

    let mut players: Vec<PlayerAggregate> = source_names(&events)
        .into_iter()
        .map(|name| aggregate_player(&events, name, per_healer_share, config, include_records))
        .filter(|p| p.total_score > 0.0)
        .collect();

    // stable: equal scores keep first-appearance order
    players.sort_by(|a, b| b.score_adjusted.total_cmp(&a.score_adjusted));

    tracing::debug!(
        report = report_id,
        events = events.len(),
        damage_taken,
        players = players.len(),
        "Scored report"
    );

    Report {
        id: report_id.to_string(),
        name: report_name.to_string(),
        players,
    }
}

/// Every heal record in the report, in time order
pub fn heal_records(events: &[CombatEvent]) -> Vec<HealRecord> {
    ordered(events).into_iter().filter_map(heal_record).collect()
}

/// Total final damage of melee/spell hits that landed on players
pub fn player_damage_taken(events: &[&CombatEvent]) -> f64 {
    events
        .iter()
        .filter(|ev| ev.target.is_player())
        .filter_map(|ev| ev.final_damage())
        .sum()
}

/// Distinct source names in order of first appearance
fn source_names<'a>(events: &[&'a CombatEvent]) -> Vec<&'a str> {
    let mut seen = std::collections::HashSet::new();
    events
        .iter()
        .copied()
        .map(|ev| ev.source.name.as_str())
        .filter(|name| seen.insert(*name))
        .collect()
}

fn aggregate_player(
    events: &[&CombatEvent],
    player: &str,
    per_healer_share: f64,
    config: &ScoringConfig,
    include_records: bool,
) -> PlayerAggregate {
    let mut row = PlayerAggregate {
        player: player.to_string(),
        ..PlayerAggregate::default()
    };
    let mut records: Vec<HealRecord> = Vec::new();

    for ev in events {
        match &ev.body {
            EventBody::Heal {
                outcome, periodic, ..
            } if ev.source.name == player => {
                row.raw_healing += outcome.amount;
                if *periodic {
                    row.overheal_from_hots += outcome.overheal;
                } else {
                    row.overheal_from_casts += outcome.overheal;
                }
            }
            EventBody::Absorb(detail) if detail.shield_caster.name == player => {
                row.prevented += detail.amount;
            }
            EventBody::Dispel { removed, .. } if ev.source.name == player => {
                row.total_dispels += 1;
                if config.hi_pri_dispel_ids.contains(&removed.id) {
                    row.total_hi_pri_dispels += 1;
                }
            }
            _ => continue,
        }

        if row.player_id.is_empty() {
            row.player_id = credited_id(ev).to_string();
        }
        if include_records {
            records.extend(heal_record(ev));
        }
    }

    row.overhealing = row.overheal_from_hots + row.overheal_from_casts;
    row.actual_hp_healed = row.raw_healing - row.overhealing + row.prevented;
    row.total_healing_points = row.actual_hp_healed / HEALING_POINT_DIVISOR;
    row.total_dispel_points = row.total_hi_pri_dispels * DISPEL_POINTS;
    row.total_score = row.total_healing_points + row.total_dispel_points as f64;
    row.score_adjusted = adjusted_score(row.actual_hp_healed, per_healer_share);

    if include_records {
        row.healing_records = Some(records);
    }
    row
}

/// Effective healing as a percentage of the per-healer damage share, 0..=100.
/// No damage (or no healers) means there is nothing to compare against: 0.
pub fn adjusted_score(actual_hp_healed: f64, per_healer_share: f64) -> f64 {
    if !(per_healer_share.is_finite() && per_healer_share > 0.0) {
        return 0.0;
    }
    let potential = actual_hp_healed / per_healer_share;
    if !potential.is_finite() {
        return 0.0;
    }
    potential.clamp(0.0, 1.0) * 100.0
}

/// Unit credited for an event: the shield caster for absorbs, the source otherwise
fn credited_id(ev: &CombatEvent) -> &str {
    match &ev.body {
        EventBody::Absorb(detail) => &detail.shield_caster.id,
        _ => &ev.source.id,
    }
}

/// Normalize a heal, absorb or dispel into a record; None for other kinds
pub fn heal_record(ev: &CombatEvent) -> Option<HealRecord> {
    let record = |player: &Unit, spell: &SpellRef, kind: HealKind| HealRecord {
        timestamp: ev.timestamp,
        player_id: player.id.clone(),
        player_name: player.name.clone(),
        target_id: ev.target.id.clone(),
        target_name: ev.target.name.clone(),
        spell_id: spell.id,
        spell_name: spell.name.clone(),
        amount_healed_or_prevented: 0.0,
        amount_overhealed: 0.0,
        critical: false,
        kind,
        spell_removed_id: None,
        spell_removed_name: None,
    };

    match &ev.body {
        EventBody::Heal {
            spell,
            outcome,
            periodic,
            ..
        } => {
            let kind = if *periodic {
                HealKind::OverTime
            } else {
                HealKind::Direct
            };
            Some(HealRecord {
                amount_healed_or_prevented: outcome.amount,
                amount_overhealed: outcome.overheal,
                critical: outcome.critical,
                ..record(&ev.source, spell, kind)
            })
        }
        EventBody::Absorb(detail) => Some(HealRecord {
            amount_healed_or_prevented: detail.amount,
            ..record(&detail.shield_caster, &detail.shield_spell, HealKind::Prevention)
        }),
        EventBody::Dispel { spell, removed } => Some(HealRecord {
            spell_removed_id: Some(removed.id),
            spell_removed_name: Some(removed.name.clone()),
            ..record(&ev.source, spell, HealKind::Dispel)
        }),
        _ => None,
    }
}
