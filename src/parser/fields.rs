//! Positional field schema and per-kind extractors.
//!
//! Every layout is declared once below as named fields with absolute
//! indices into the comma-split line. Index 0 is the `timestamp  EVENT`
//! chunk, so the 8-field base block starts at 1.

use crate::error::ParseErrorKind;
use crate::models::*;

use super::classify::EventKind;

/// Literal the client writes for an absent value
pub const NIL: &str = "nil";

/// A named position in a split line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub index: usize,
}

impl Field {
    pub const fn new(name: &'static str, index: usize) -> Self {
        Field { name, index }
    }
}

// ── Base block ───────────────────────────────────────────────────────────────

pub const SOURCE_ID: Field = Field::new("source_id", 1);
pub const SOURCE_NAME: Field = Field::new("source_name", 2);
pub const SOURCE_FLAGS: Field = Field::new("source_flags", 3);
pub const SOURCE_RAID_FLAGS: Field = Field::new("source_raid_flags", 4);
pub const TARGET_ID: Field = Field::new("target_id", 5);
pub const TARGET_NAME: Field = Field::new("target_name", 6);
pub const TARGET_FLAGS: Field = Field::new("target_flags", 7);
pub const TARGET_RAID_FLAGS: Field = Field::new("target_raid_flags", 8);

/// First field after the base block
pub const POST_BASE: usize = 9;

// ── Shared segments ──────────────────────────────────────────────────────────

pub const SNAPSHOT_LEN: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct SnapshotFields {
    pub info_guid: Field,
    pub owner_guid: Field,
    pub current_hp: Field,
    pub max_hp: Field,
    pub attack_power: Field,
    pub spell_power: Field,
    pub armor: Field,
    pub power_type: Field,
    pub current_power: Field,
    pub max_power: Field,
    pub power_cost: Field,
    pub x: Field,
    pub y: Field,
    pub map_id: Field,
    pub facing: Field,
    pub level: Field,
}

pub const fn snapshot_at(start: usize) -> SnapshotFields {
    SnapshotFields {
        info_guid: Field::new("info_guid", start),
        owner_guid: Field::new("owner_guid", start + 1),
        current_hp: Field::new("current_hp", start + 2),
        max_hp: Field::new("max_hp", start + 3),
        attack_power: Field::new("attack_power", start + 4),
        spell_power: Field::new("spell_power", start + 5),
        armor: Field::new("armor", start + 6),
        power_type: Field::new("power_type", start + 7),
        current_power: Field::new("current_power", start + 8),
        max_power: Field::new("max_power", start + 9),
        power_cost: Field::new("power_cost", start + 10),
        x: Field::new("x", start + 11),
        y: Field::new("y", start + 12),
        map_id: Field::new("map_id", start + 13),
        facing: Field::new("facing", start + 14),
        level: Field::new("level", start + 15),
    }
}

pub const DAMAGE_LEN: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct DamageFields {
    pub final_damage: Field,
    pub raw_damage: Field,
    pub overkill: Field,
    pub school: Field,
    pub resisted: Field,
    pub blocked: Field,
    pub absorbed: Field,
    pub critical: Field,
    pub glancing: Field,
    pub crushing: Field,
}

pub const fn damage_at(start: usize) -> DamageFields {
    DamageFields {
        final_damage: Field::new("final_damage", start),
        raw_damage: Field::new("raw_damage", start + 1),
        overkill: Field::new("overkill", start + 2),
        school: Field::new("school", start + 3),
        resisted: Field::new("resisted", start + 4),
        blocked: Field::new("blocked", start + 5),
        absorbed: Field::new("absorbed", start + 6),
        critical: Field::new("critical", start + 7),
        glancing: Field::new("glancing", start + 8),
        crushing: Field::new("crushing", start + 9),
    }
}

/// Heal suffix: amount, base amount, overheal, absorbed, critical.
/// Only amount..=overheal are required.
#[derive(Debug, Clone, Copy)]
pub struct HealFields {
    pub amount: Field,
    pub overheal: Field,
    pub absorbed: Field,
    pub critical: Field,
}

pub const fn heal_at(start: usize) -> HealFields {
    HealFields {
        amount: Field::new("heal_amount", start),
        overheal: Field::new("overheal", start + 2),
        absorbed: Field::new("heal_absorbed", start + 3),
        critical: Field::new("heal_critical", start + 4),
    }
}

// ── Per-kind layouts ─────────────────────────────────────────────────────────

pub struct MeleeLayout {
    pub snapshot: SnapshotFields,
    pub outcome: DamageFields,
}

pub const MELEE: MeleeLayout = MeleeLayout {
    snapshot: snapshot_at(POST_BASE),
    outcome: damage_at(POST_BASE + SNAPSHOT_LEN),
};

pub struct SpellDamageLayout {
    pub spell_id: Field,
    pub spell_name: Field,
    pub snapshot: SnapshotFields,
    pub outcome: DamageFields,
}

/// School at index 11 is skipped; the outcome block repeats it.
pub const SPELL_DAMAGE: SpellDamageLayout = SpellDamageLayout {
    spell_id: Field::new("spell_id", 9),
    spell_name: Field::new("spell_name", 10),
    snapshot: snapshot_at(12),
    outcome: damage_at(12 + SNAPSHOT_LEN),
};

pub struct HealLayout {
    pub spell_id: Field,
    pub spell_name: Field,
    pub snapshot: SnapshotFields,
    pub outcome: HealFields,
}

pub const HEAL: HealLayout = HealLayout {
    spell_id: Field::new("spell_id", 9),
    spell_name: Field::new("spell_name", 10),
    snapshot: snapshot_at(12),
    outcome: heal_at(12 + SNAPSHOT_LEN),
};

pub struct DispelLayout {
    pub spell_id: Field,
    pub spell_name: Field,
    pub removed_id: Field,
    pub removed_name: Field,
}

pub const DISPEL: DispelLayout = DispelLayout {
    spell_id: Field::new("spell_id", 9),
    spell_name: Field::new("spell_name", 10),
    removed_id: Field::new("removed_spell_id", 12),
    removed_name: Field::new("removed_spell_name", 13),
};

pub struct AuraLayout {
    pub spell_id: Field,
    pub spell_name: Field,
}

pub const AURA: AuraLayout = AuraLayout {
    spell_id: Field::new("spell_id", 9),
    spell_name: Field::new("spell_name", 10),
};

/// Shield cast by a player: the amount duplicates another line, so the
/// record is validated and then dropped.
pub struct PlayerAbsorbLayout {
    pub caster_id: Field,
    pub caster_name: Field,
    pub shield_id: Field,
    pub shield_name: Field,
    pub amount: Field,
}

pub const ABSORB_PLAYER: PlayerAbsorbLayout = PlayerAbsorbLayout {
    caster_id: Field::new("shield_caster_id", 9),
    caster_name: Field::new("shield_caster_name", 10),
    shield_id: Field::new("shield_spell_id", 13),
    shield_name: Field::new("shield_spell_name", 14),
    amount: Field::new("absorbed_amount", 16),
};

pub struct ShieldAbsorbLayout {
    pub absorbed_id: Field,
    pub absorbed_name: Field,
    pub caster_id: Field,
    pub caster_name: Field,
    pub caster_flags: Field,
    pub caster_raid_flags: Field,
    pub shield_id: Field,
    pub shield_name: Field,
    pub amount: Field,
}

pub const ABSORB_SHIELD: ShieldAbsorbLayout = ShieldAbsorbLayout {
    absorbed_id: Field::new("absorbed_spell_id", 9),
    absorbed_name: Field::new("absorbed_spell_name", 10),
    caster_id: Field::new("shield_caster_id", 12),
    caster_name: Field::new("shield_caster_name", 13),
    caster_flags: Field::new("shield_caster_flags", 14),
    caster_raid_flags: Field::new("shield_caster_raid_flags", 15),
    shield_id: Field::new("shield_spell_id", 16),
    shield_name: Field::new("shield_spell_name", 17),
    amount: Field::new("absorbed_amount", 19),
};

// ── Row access ───────────────────────────────────────────────────────────────

/// A split line with typed, schema-addressed accessors
pub struct Row<'a> {
    event: &'static str,
    fields: Vec<&'a str>,
}

impl<'a> Row<'a> {
    pub fn new(event: &'static str, line: &'a str) -> Self {
        Row {
            event,
            fields: parse_csv_fields(line),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fail unless `last` (the final required field of a layout) exists
    pub fn require(&self, last: Field) -> Result<(), ParseErrorKind> {
        self.raw(last).map(|_| ())
    }

    pub fn raw(&self, field: Field) -> Result<&'a str, ParseErrorKind> {
        self.fields
            .get(field.index)
            .map(|s| s.trim())
            .ok_or_else(|| ParseErrorKind::FieldOutOfRange {
                event: self.event,
                field: field.name,
                index: field.index,
                len: self.fields.len(),
            })
    }

    pub fn text(&self, field: Field) -> Result<String, ParseErrorKind> {
        self.raw(field).map(str::to_string)
    }

    /// Display name with quotes stripped
    pub fn name(&self, field: Field) -> Result<String, ParseErrorKind> {
        self.raw(field).map(unquote)
    }

    pub fn int(&self, field: Field) -> Result<i32, ParseErrorKind> {
        let raw = self.raw(field)?;
        parse_hex_or_dec(raw).ok_or_else(|| self.invalid(field, raw))
    }

    pub fn float(&self, field: Field) -> Result<f64, ParseErrorKind> {
        let raw = self.raw(field)?;
        raw.parse::<f64>().map_err(|_| self.invalid(field, raw))
    }

    /// `nil` means false, anything else true
    pub fn flag(&self, field: Field) -> Result<bool, ParseErrorKind> {
        self.raw(field).map(|s| s != NIL)
    }

    fn invalid(&self, field: Field, raw: &str) -> ParseErrorKind {
        ParseErrorKind::InvalidNumber {
            event: self.event,
            field: field.name,
            value: raw.to_string(),
        }
    }
}

// ── Extractors ───────────────────────────────────────────────────────────────

/// Source, target and body of one classified line
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub source: Unit,
    pub target: Unit,
    pub body: EventBody,
}

/// Decode a classified line. `Ok(None)` means the line is valid but
/// deliberately produces no event (player-cast absorbs).
pub fn extract(kind: EventKind, row: &Row) -> Result<Option<Extracted>, ParseErrorKind> {
    row.require(TARGET_RAID_FLAGS)?;

    let body = match kind {
        EventKind::SwingDamageLanded => Some(melee(row)?),
        EventKind::RangeDamage | EventKind::SpellDamage => Some(spell_damage(row)?),
        EventKind::SpellHeal => Some(heal(row, false)?),
        EventKind::SpellPeriodicHeal => Some(heal(row, true)?),
        EventKind::SpellDispel => Some(dispel(row)?),
        EventKind::SpellAuraApplied => Some(aura(row)?),
        EventKind::SpellAbsorbed => absorb(row)?,
    };

    match body {
        Some(body) => Ok(Some(Extracted {
            source: unit(row, [SOURCE_ID, SOURCE_NAME, SOURCE_FLAGS, SOURCE_RAID_FLAGS])?,
            target: unit(row, [TARGET_ID, TARGET_NAME, TARGET_FLAGS, TARGET_RAID_FLAGS])?,
            body,
        })),
        None => Ok(None),
    }
}

fn unit(row: &Row, [id, name, flags, raid_flags]: [Field; 4]) -> Result<Unit, ParseErrorKind> {
    Ok(Unit {
        id: row.text(id)?,
        name: row.name(name)?,
        flags: row.text(flags)?,
        raid_flags: row.text(raid_flags)?,
    })
}

fn spell(row: &Row, id: Field, name: Field) -> Result<SpellRef, ParseErrorKind> {
    Ok(SpellRef {
        id: row.int(id)?,
        name: row.name(name)?,
    })
}

fn snapshot(row: &Row, s: &SnapshotFields) -> Result<CombatSnapshot, ParseErrorKind> {
    Ok(CombatSnapshot {
        info_guid: row.text(s.info_guid)?,
        owner_guid: row.text(s.owner_guid)?,
        current_hp: row.float(s.current_hp)?,
        max_hp: row.float(s.max_hp)?,
        attack_power: row.float(s.attack_power)?,
        spell_power: row.float(s.spell_power)?,
        armor: row.float(s.armor)?,
        power_type: PowerType::from(row.int(s.power_type)?),
        current_power: row.float(s.current_power)?,
        max_power: row.float(s.max_power)?,
        power_cost: row.float(s.power_cost)?,
        x: row.float(s.x)?,
        y: row.float(s.y)?,
        map_id: row.int(s.map_id)?,
        facing: row.float(s.facing)?,
        level: row.int(s.level)?,
    })
}

fn damage(row: &Row, d: &DamageFields) -> Result<DamageOutcome, ParseErrorKind> {
    Ok(DamageOutcome {
        final_damage: row.float(d.final_damage)?,
        raw_damage: row.float(d.raw_damage)?,
        overkill: row.float(d.overkill)?,
        school: row.int(d.school)?,
        resisted: row.float(d.resisted)?,
        blocked: row.float(d.blocked)?,
        absorbed: row.float(d.absorbed)?,
        critical: row.flag(d.critical)?,
        glancing: row.flag(d.glancing)?,
        crushing: row.flag(d.crushing)?,
    })
}

fn melee(row: &Row) -> Result<EventBody, ParseErrorKind> {
    row.require(MELEE.outcome.crushing)?;
    Ok(EventBody::MeleeDamage {
        snapshot: snapshot(row, &MELEE.snapshot)?,
        outcome: damage(row, &MELEE.outcome)?,
    })
}

fn spell_damage(row: &Row) -> Result<EventBody, ParseErrorKind> {
    let l = &SPELL_DAMAGE;
    row.require(l.outcome.crushing)?;
    Ok(EventBody::SpellDamage {
        spell: spell(row, l.spell_id, l.spell_name)?,
        snapshot: snapshot(row, &l.snapshot)?,
        outcome: damage(row, &l.outcome)?,
    })
}

fn heal(row: &Row, periodic: bool) -> Result<EventBody, ParseErrorKind> {
    let l = &HEAL;
    row.require(l.outcome.overheal)?;

    // Older clients stop after overheal; absorbed/critical are optional
    let absorbed = if row.len() > l.outcome.absorbed.index {
        row.float(l.outcome.absorbed)?
    } else {
        0.0
    };
    let critical = row.len() > l.outcome.critical.index && row.flag(l.outcome.critical)?;

    Ok(EventBody::Heal {
        spell: spell(row, l.spell_id, l.spell_name)?,
        snapshot: snapshot(row, &l.snapshot)?,
        outcome: HealOutcome {
            amount: row.float(l.outcome.amount)?,
            overheal: row.float(l.outcome.overheal)?,
            absorbed,
            critical,
        },
        periodic,
    })
}

fn dispel(row: &Row) -> Result<EventBody, ParseErrorKind> {
    let l = &DISPEL;
    row.require(l.removed_name)?;
    Ok(EventBody::Dispel {
        spell: spell(row, l.spell_id, l.spell_name)?,
        removed: spell(row, l.removed_id, l.removed_name)?,
    })
}

fn aura(row: &Row) -> Result<EventBody, ParseErrorKind> {
    row.require(AURA.spell_name)?;
    Ok(EventBody::AuraApplied {
        spell: spell(row, AURA.spell_id, AURA.spell_name)?,
    })
}

fn absorb(row: &Row) -> Result<Option<EventBody>, ParseErrorKind> {
    let first = row.raw(Field::new("absorb_layout", POST_BASE))?;

    if first.starts_with(PLAYER_PREFIX) {
        caster_first_absorb(row)?;
        return Ok(None);
    }

    let l = &ABSORB_SHIELD;

    // Swing absorbs have no absorbed-spell block: a unit GUID leads and the
    // line is too short for the shield layout. Same positions as the player form.
    if is_entity_guid(first) && row.len() <= l.amount.index {
        caster_first_absorb(row)?;
        return Ok(None);
    }

    row.require(l.amount)?;

    // Non-numeric id slot: nothing to record as the absorbed spell id
    let raw_id = row.raw(l.absorbed_id)?;
    let absorbed_spell_id = if is_entity_guid(raw_id) {
        None
    } else {
        Some(row.int(l.absorbed_id)?)
    };

    Ok(Some(EventBody::Absorb(AbsorbDetail {
        absorbed_spell_id,
        absorbed_spell_name: row.name(l.absorbed_name)?,
        shield_caster: unit(row, [l.caster_id, l.caster_name, l.caster_flags, l.caster_raid_flags])?,
        shield_spell: spell(row, l.shield_id, l.shield_name)?,
        amount: row.float(l.amount)?,
    })))
}

/// Validate an absorb whose shield caster comes first; such lines are dropped
fn caster_first_absorb(row: &Row) -> Result<(), ParseErrorKind> {
    let l = &ABSORB_PLAYER;
    row.require(l.amount)?;
    row.text(l.caster_id)?;
    row.name(l.caster_name)?;
    row.int(l.shield_id)?;
    row.name(l.shield_name)?;
    row.float(l.amount)?;
    Ok(())
}

/// `Kind-...` style unit identifier (Creature-0-..., Pet-0-..., Vehicle-0-...)
fn is_entity_guid(s: &str) -> bool {
    s.split_once('-')
        .is_some_and(|(kind, _)| !kind.is_empty() && kind.chars().all(|c| c.is_ascii_alphabetic()))
}

// ── Tokenizing ───────────────────────────────────────────────────────────────

/// Split a line on commas, keeping quoted names (which may contain commas)
/// and bracketed lists intact. Leading spaces of a field are skipped, and a
/// trailing comma does not produce an empty last field: `"a,"` is `["a"]`.
pub fn parse_csv_fields(input: &str) -> Vec<&str> {
    let bytes = input.as_bytes();
    let mut fields = Vec::new();
    let mut pos = 0;

    loop {
        while bytes.get(pos) == Some(&b' ') {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        let end = if bytes[pos] == b'"' {
            quoted_end(bytes, pos)
        } else {
            bare_end(bytes, pos)
        };
        fields.push(&input[pos..end]);

        pos = end;
        if bytes.get(pos) == Some(&b',') {
            pos += 1;
        }
    }

    fields
}

/// Just past the closing quote, or end of input when unterminated
fn quoted_end(bytes: &[u8], start: usize) -> usize {
    match bytes[start + 1..].iter().position(|&b| b == b'"') {
        Some(off) => start + off + 2,
        None => bytes.len(),
    }
}

/// First comma outside brackets
fn bare_end(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        match b {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth -= 1,
            b',' if depth <= 0 => return i,
            _ => {}
        }
    }
    bytes.len()
}

/// Remove quotes from a string
pub fn unquote(s: &str) -> String {
    s.trim().trim_matches('"').to_string()
}

/// Parse a hex (0xNN) or decimal integer
fn parse_hex_or_dec(s: &str) -> Option<i32> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok().and_then(|v| i32::try_from(v).ok())
    } else {
        s.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_offsets() {
        assert_eq!(MELEE.snapshot.info_guid.index, 9);
        assert_eq!(MELEE.outcome.final_damage.index, 25);
        assert_eq!(MELEE.outcome.critical.index, 32);
        assert_eq!(MELEE.outcome.crushing.index, 34);
        assert_eq!(SPELL_DAMAGE.snapshot.info_guid.index, 12);
        assert_eq!(SPELL_DAMAGE.outcome.final_damage.index, 28);
        assert_eq!(SPELL_DAMAGE.outcome.crushing.index, 37);
        assert_eq!(HEAL.outcome.amount.index, 28);
        assert_eq!(HEAL.outcome.overheal.index, 30);
        assert_eq!(HEAL.snapshot.level.index, 27);
        assert_eq!(ABSORB_SHIELD.amount.index, 19);
        assert_eq!(ABSORB_PLAYER.amount.index, 16);
    }

    #[test]
    fn test_csv_fields_keep_quoted_commas() {
        let fields = parse_csv_fields(r#"SPELL_HEAL,Player-1,"Smith, Jr",0x511,0x0"#);
        assert_eq!(fields, vec!["SPELL_HEAL", "Player-1", "\"Smith, Jr\"", "0x511", "0x0"]);
        assert_eq!(unquote(fields[2]), "Smith, Jr");
    }

    #[test]
    fn test_csv_fields_keep_empty_fields() {
        let fields = parse_csv_fields("a,,b");
        assert_eq!(fields, vec!["a", "", "b"]);
    }

    #[test]
    fn test_csv_fields_trailing_comma_and_brackets() {
        assert_eq!(parse_csv_fields("a,"), vec!["a"]);
        assert_eq!(parse_csv_fields("x,[1,2],(3,4), y"), vec!["x", "[1,2]", "(3,4)", "y"]);
        assert_eq!(parse_csv_fields("a,\"open"), vec!["a", "\"open"]);
    }

    #[test]
    fn test_hex_and_decimal_ints() {
        assert_eq!(parse_hex_or_dec("0x2"), Some(2));
        assert_eq!(parse_hex_or_dec("0X10"), Some(16));
        assert_eq!(parse_hex_or_dec("33110"), Some(33110));
        assert_eq!(parse_hex_or_dec("-1"), Some(-1));
        assert_eq!(parse_hex_or_dec("nil"), None);
    }

    #[test]
    fn test_flag_sentinel() {
        let row = Row::new("TEST", "x,nil,1,yes");
        assert!(!row.flag(Field::new("a", 1)).unwrap());
        assert!(row.flag(Field::new("b", 2)).unwrap());
        assert!(row.flag(Field::new("c", 3)).unwrap());
    }

    #[test]
    fn test_missing_field_names_field() {
        let row = Row::new("SPELL_HEAL", "a,b,c");
        let err = row.float(HEAL.outcome.overheal).unwrap_err();
        assert_eq!(
            err,
            ParseErrorKind::FieldOutOfRange {
                event: "SPELL_HEAL",
                field: "overheal",
                index: 30,
                len: 3,
            }
        );
    }

    #[test]
    fn test_bad_number_is_reported() {
        let row = Row::new("SPELL_DISPEL", "a,abc");
        let err = row.int(Field::new("spell_id", 1)).unwrap_err();
        assert!(matches!(err, ParseErrorKind::InvalidNumber { field: "spell_id", .. }));
    }

    #[test]
    fn test_entity_guid_detection() {
        assert!(is_entity_guid("Creature-0-4379-0-1-1234-0000"));
        assert!(is_entity_guid("Pet-0-1-2"));
        assert!(!is_entity_guid("17"));
        assert!(!is_entity_guid("-1"));
    }
}
