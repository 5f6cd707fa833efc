//! Combat log line builders shared by the integration tests.
#![allow(dead_code)]

use healparser::config::{ParserConfig, ScoringConfig};
use healparser::models::ParsedLog;
use healparser::parser::{LogParser, ReportMeta};

/// Sixteen-field advanced snapshot block
pub const SNAPSHOT: &str =
    "Player-1,0000000000000000,9000,10000,100,1200,800,0,4000,5000,0,-100.5,220.25,1445,3.14,60";

pub const HI_PRI_DEBUFF: i32 = 19713;

fn player(name: &str) -> String {
    format!("Player-{name},\"{name}\",0x511,0x0")
}

fn creature(name: &str) -> String {
    format!("Creature-0-4379-0-1-1234-0000,\"{name}\",0xa48,0x0")
}

pub fn heal(time: &str, src: &str, tgt: &str, spell_id: i32, amount: u32, overheal: u32) -> String {
    format!(
        "4/2 {time}  SPELL_HEAL,{},{},{spell_id},\"Flash Heal\",0x2,{SNAPSHOT},{amount},{amount},{overheal},0,nil",
        player(src),
        player(tgt)
    )
}

pub fn periodic_heal(time: &str, src: &str, tgt: &str, amount: u32, overheal: u32) -> String {
    format!(
        "4/2 {time}  SPELL_PERIODIC_HEAL,{},{},25222,\"Renew\",0x2,{SNAPSHOT},{amount},{amount},{overheal},0,nil",
        player(src),
        player(tgt)
    )
}

pub fn dispel(time: &str, src: &str, tgt: &str, removed_id: i32) -> String {
    format!(
        "4/2 {time}  SPELL_DISPEL,{},{},988,\"Dispel Magic\",0x2,{removed_id},\"Shadow Curse\",0x20,DEBUFF",
        player(src),
        player(tgt)
    )
}

pub fn aura(time: &str, src: &str, tgt: &str, spell_id: i32) -> String {
    format!(
        "4/2 {time}  SPELL_AURA_APPLIED,{},{},{spell_id},\"Prayer of Mending\",0x2,BUFF",
        player(src),
        player(tgt)
    )
}

/// Boss swing landing on a player
pub fn boss_swing(time: &str, tgt: &str, amount: u32) -> String {
    format!(
        "4/2 {time}  SWING_DAMAGE_LANDED,{},{},{SNAPSHOT},{amount},{amount},-1,1,0,0,0,nil,nil,nil",
        creature("Prince Malchezaar"),
        player(tgt)
    )
}

/// Boss spell landing on a creature target (never counted as raid damage)
pub fn boss_spell_on_creature(time: &str, amount: u32) -> String {
    format!(
        "4/2 {time}  SPELL_DAMAGE,{},{},30854,\"Shadow Nova\",0x20,{SNAPSHOT},{amount},{amount},-1,32,0,0,0,1,nil,nil",
        creature("Prince Malchezaar"),
        creature("Infernal")
    )
}

/// Shield-layout absorb with a unit GUID in the absorbed-spell slot; caster at 12/13
pub fn creature_absorb(time: &str, caster: &str, tgt: &str, amount: u32) -> String {
    format!(
        "4/2 {time}  SPELL_ABSORBED,{},{},Creature-0-4379-0-1-1234-0000,\"Prince Malchezaar\",0x1,{},10901,\"Power Word: Shield\",0x2,{amount}",
        creature("Prince Malchezaar"),
        player(tgt),
        player(caster)
    )
}

/// Caster-first absorb in the short player layout, which duplicates another line
pub fn player_absorb(time: &str, caster: &str, tgt: &str, amount: u32) -> String {
    format!(
        "4/2 {time}  SPELL_ABSORBED,{},{},{},10901,\"Power Word: Shield\",0x2,{amount}",
        creature("Prince Malchezaar"),
        player(tgt),
        player(caster)
    )
}

pub fn meta(id: &str) -> ReportMeta {
    ReportMeta {
        report_id: id.to_string(),
        report_name: "Karazhan".to_string(),
        file_name: "WoWCombatLog.txt".to_string(),
        owner_id: "SYSTEM".to_string(),
    }
}

pub fn parse(lines: &[String]) -> ParsedLog {
    LogParser::new(&ParserConfig::default())
        .with_year(2021)
        .parse(&lines.join("\n"), meta("r1"))
        .expect("log should parse")
}

pub fn scoring() -> ScoringConfig {
    ScoringConfig {
        hi_pri_dispel_ids: [HI_PRI_DEBUFF].into_iter().collect(),
        assumed_healer_count: 2,
    }
}
