use crate::models::Unit;

/// Pending redirect: `caster` applied the redirect aura to `recipient`
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationEntry {
    pub caster_name: String,
    pub caster_id: String,
    pub recipient_name: String,
}

/// Redirect bookkeeping for one parse pass.
///
/// Some heals are logged as cast by whoever carried the buff that triggered
/// them. Each aura application remembers caster -> recipient; the next heal
/// logged against that recipient consumes the entry and is credited back to
/// the caster. At most one entry per caster is live, and entries are kept in
/// insertion order so a recipient carrying buffs from several casters always
/// resolves to the oldest one.
#[derive(Debug, Default)]
pub struct CorrelationState {
    entries: Vec<CorrelationEntry>,
}

impl CorrelationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a redirect aura application, replacing any pending entry
    /// for the same caster
    pub fn record_aura(&mut self, caster: &Unit, recipient_name: &str) {
        self.entries.retain(|e| e.caster_name != caster.name);
        self.entries.push(CorrelationEntry {
            caster_name: caster.name.clone(),
            caster_id: caster.id.clone(),
            recipient_name: recipient_name.to_string(),
        });
    }

    /// Take the entry whose recipient matches the heal's logged source
    pub fn resolve(&mut self, logged_source_name: &str) -> Option<CorrelationEntry> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.recipient_name == logged_source_name)?;
        Some(self.entries.remove(pos))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: &str, name: &str) -> Unit {
        Unit {
            id: id.to_string(),
            name: name.to_string(),
            ..Unit::default()
        }
    }

    #[test]
    fn test_resolve_is_single_use() {
        let mut state = CorrelationState::new();
        state.record_aura(&unit("Player-1", "Alice"), "Bob");

        let entry = state.resolve("Bob").unwrap();
        assert_eq!(entry.caster_name, "Alice");
        assert_eq!(entry.caster_id, "Player-1");
        assert!(state.resolve("Bob").is_none());
        assert!(state.is_empty());
    }

    #[test]
    fn test_new_aura_overwrites_same_caster() {
        let mut state = CorrelationState::new();
        state.record_aura(&unit("Player-1", "Alice"), "Bob");
        state.record_aura(&unit("Player-1", "Alice"), "Carol");

        assert_eq!(state.len(), 1);
        assert!(state.resolve("Bob").is_none());
        assert_eq!(state.resolve("Carol").unwrap().caster_name, "Alice");
    }

    #[test]
    fn test_oldest_caster_wins_for_shared_recipient() {
        let mut state = CorrelationState::new();
        state.record_aura(&unit("Player-1", "Alice"), "Bob");
        state.record_aura(&unit("Player-2", "Dave"), "Bob");

        assert_eq!(state.resolve("Bob").unwrap().caster_name, "Alice");
        assert_eq!(state.resolve("Bob").unwrap().caster_name, "Dave");
    }

    #[test]
    fn test_miss_leaves_state_untouched() {
        let mut state = CorrelationState::new();
        state.record_aura(&unit("Player-1", "Alice"), "Bob");
        assert!(state.resolve("Eve").is_none());
        assert_eq!(state.len(), 1);
    }
}
