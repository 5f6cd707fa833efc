use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// GUID prefix for player-controlled units
pub const PLAYER_PREFIX: &str = "Player";

/// One side (source or target) of a combat event
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub name: String,
    pub flags: String,
    pub raid_flags: String,
}

impl Unit {
    pub fn is_player(&self) -> bool {
        self.id.starts_with(PLAYER_PREFIX)
    }
}

/// Spell id + display name pair
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpellRef {
    pub id: i32,
    pub name: String,
}

/// A decoded combat log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatEvent {
    pub event_id: String,
    pub report_id: String,
    /// 1-based line number in the source file, used to break timestamp ties
    pub sequence: u64,
    pub timestamp: NaiveDateTime,
    pub event_name: String,
    pub source: Unit,
    pub target: Unit,
    pub body: EventBody,
}

impl CombatEvent {
    /// Final damage for melee/spell damage events, None for everything else
    pub fn final_damage(&self) -> Option<f64> {
        match &self.body {
            EventBody::MeleeDamage { outcome, .. } | EventBody::SpellDamage { outcome, .. } => {
                Some(outcome.final_damage)
            }
            _ => None,
        }
    }
}

/// Kind-specific payload of a combat event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EventBody {
    /// SWING_DAMAGE_LANDED
    MeleeDamage {
        snapshot: CombatSnapshot,
        outcome: DamageOutcome,
    },
    /// RANGE_DAMAGE or SPELL_DAMAGE
    SpellDamage {
        spell: SpellRef,
        snapshot: CombatSnapshot,
        outcome: DamageOutcome,
    },
    /// SPELL_ABSORBED (only the non-player shield layout is kept)
    Absorb(AbsorbDetail),
    /// SPELL_HEAL or SPELL_PERIODIC_HEAL
    Heal {
        spell: SpellRef,
        snapshot: CombatSnapshot,
        outcome: HealOutcome,
        periodic: bool,
    },
    /// SPELL_DISPEL
    Dispel { spell: SpellRef, removed: SpellRef },
    /// SPELL_AURA_APPLIED
    AuraApplied { spell: SpellRef },
}

/// Unit state captured by advanced combat logging at the moment of the event
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CombatSnapshot {
    pub info_guid: String,
    pub owner_guid: String,
    pub current_hp: f64,
    pub max_hp: f64,
    pub attack_power: f64,
    pub spell_power: f64,
    pub armor: f64,
    pub power_type: PowerType,
    pub current_power: f64,
    pub max_power: f64,
    pub power_cost: f64,
    pub x: f64,
    pub y: f64,
    pub map_id: i32,
    pub facing: f64,
    pub level: i32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DamageOutcome {
    pub final_damage: f64,
    pub raw_damage: f64,
    pub overkill: f64,
    pub school: i32,
    pub resisted: f64,
    pub blocked: f64,
    pub absorbed: f64,
    pub critical: bool,
    pub glancing: bool,
    pub crushing: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HealOutcome {
    pub amount: f64,
    pub overheal: f64,
    pub absorbed: f64,
    pub critical: bool,
}

/// Damage prevented by a shield cast by `shield_caster`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AbsorbDetail {
    /// None when the absorbed hit came from an entity GUID rather than a spell id
    pub absorbed_spell_id: Option<i32>,
    pub absorbed_spell_name: String,
    pub shield_caster: Unit,
    pub shield_spell: SpellRef,
    pub amount: f64,
}

/// Power resource of the unit in a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerType {
    #[default]
    Mana,
    Rage,
    Focus,
    Energy,
    ComboPoints,
    Runes,
    SoulShards,
    Other(i32),
}

impl From<i32> for PowerType {
    fn from(value: i32) -> Self {
        match value {
            0 => PowerType::Mana,
            1 => PowerType::Rage,
            2 => PowerType::Focus,
            3 => PowerType::Energy,
            4 => PowerType::ComboPoints,
            5 => PowerType::Runes,
            7 => PowerType::SoulShards,
            other => PowerType::Other(other),
        }
    }
}

/// Identity of an uploaded report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportShell {
    pub report_id: String,
    pub report_name: String,
    pub file_name: String,
    pub owner_id: String,
    pub event_count: usize,
}

/// Everything the parser hands over to storage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedLog {
    pub shell: ReportShell,
    pub events: Vec<CombatEvent>,
    pub notes: Vec<ParseNote>,
    pub stats: ParseStats,
}

/// Non-fatal observation made while parsing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseNote {
    pub line: u64,
    pub message: String,
}

/// Line counters for one parse pass
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParseStats {
    pub lines_read: u64,
    pub blank_lines: u64,
    pub unrecognized_lines: u64,
    /// Caster-first absorbs (player shields, swing absorbs): validated, not emitted
    pub dropped_short_absorbs: u64,
    pub redirected_heals: u64,
    /// event name -> emitted events
    pub event_counts: std::collections::BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealKind {
    Direct,
    OverTime,
    Prevention,
    Dispel,
}

/// Normalized healing contribution derived from one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealRecord {
    pub timestamp: NaiveDateTime,
    pub player_id: String,
    pub player_name: String,
    pub target_id: String,
    pub target_name: String,
    pub spell_id: i32,
    pub spell_name: String,
    pub amount_healed_or_prevented: f64,
    pub amount_overhealed: f64,
    pub critical: bool,
    pub kind: HealKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spell_removed_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spell_removed_name: Option<String>,
}

/// Per-player rollup for one report
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerAggregate {
    pub player: String,
    pub player_id: String,
    pub total_score: f64,
    /// Effective healing as a percentage of the per-healer damage share, 0..=100
    pub score_adjusted: f64,
    pub raw_healing: f64,
    pub actual_hp_healed: f64,
    pub overhealing: f64,
    pub overheal_from_hots: f64,
    pub overheal_from_casts: f64,
    pub prevented: f64,
    pub total_healing_points: f64,
    pub total_dispels: u32,
    pub total_hi_pri_dispels: u32,
    pub total_dispel_points: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healing_records: Option<Vec<HealRecord>>,
}

/// Ranked healing leaderboard for one report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub name: String,
    pub players: Vec<PlayerAggregate>,
}
