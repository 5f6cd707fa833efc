/// Event kinds the parser decodes; everything else in the log is skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SwingDamageLanded,
    RangeDamage,
    SpellDamage,
    SpellHeal,
    SpellPeriodicHeal,
    SpellDispel,
    SpellAuraApplied,
    SpellAbsorbed,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::SwingDamageLanded,
        EventKind::RangeDamage,
        EventKind::SpellDamage,
        EventKind::SpellHeal,
        EventKind::SpellPeriodicHeal,
        EventKind::SpellDispel,
        EventKind::SpellAuraApplied,
        EventKind::SpellAbsorbed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::SwingDamageLanded => "SWING_DAMAGE_LANDED",
            EventKind::RangeDamage => "RANGE_DAMAGE",
            EventKind::SpellDamage => "SPELL_DAMAGE",
            EventKind::SpellHeal => "SPELL_HEAL",
            EventKind::SpellPeriodicHeal => "SPELL_PERIODIC_HEAL",
            EventKind::SpellDispel => "SPELL_DISPEL",
            EventKind::SpellAuraApplied => "SPELL_AURA_APPLIED",
            EventKind::SpellAbsorbed => "SPELL_ABSORBED",
        }
    }

    /// Match an already upper-cased event token
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == token)
    }
}

/// Event name of a line: 4th single-space token (the log puts two spaces
/// between the time and the event), up to its first comma, upper-cased
pub fn event_token(line: &str) -> Option<String> {
    let token = line.split(' ').nth(3)?;
    let name = token.split(',').next().unwrap_or(token);
    Some(name.to_ascii_uppercase())
}

/// Kind of a non-blank line, or None when it is not an event we listen for
pub fn classify(line: &str) -> Option<EventKind> {
    event_token(line).and_then(|token| EventKind::from_token(&token))
}
