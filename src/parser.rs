//! Combat log parser: classifies each line, decodes the kinds we listen
//! for and resolves redirected heals, producing the event list of one report.

pub mod classify;
pub mod correlation;
pub mod fields;
pub mod timestamp;

use chrono::Datelike;
use uuid::Uuid;

use crate::config::ParserConfig;
use crate::error::ParseError;
use crate::models::*;

use self::classify::{classify, EventKind};
use self::correlation::CorrelationState;
use self::fields::Row;

/// Identity assigned to an upload before parsing
#[derive(Debug, Clone, PartialEq)]
pub struct ReportMeta {
    pub report_id: String,
    pub report_name: String,
    pub file_name: String,
    pub owner_id: String,
}

impl ReportMeta {
    /// New upload with a freshly generated report id
    pub fn new(report_name: &str, file_name: &str, owner_id: &str) -> Self {
        ReportMeta {
            report_id: Uuid::new_v4().to_string(),
            report_name: report_name.to_string(),
            file_name: file_name.to_string(),
            owner_id: owner_id.to_string(),
        }
    }
}

/// Parses exactly one file. The correlation state lives inside the parser,
/// and `parse` consumes it, so state can never leak into another file.
pub struct LogParser {
    redirect_aura_spell_id: i32,
    redirect_heal_spell_id: i32,
    year: i32,
    correlation: CorrelationState,
    notes: Vec<ParseNote>,
    stats: ParseStats,
}

impl LogParser {
    pub fn new(config: &ParserConfig) -> Self {
        LogParser {
            redirect_aura_spell_id: config.redirect_aura_spell_id,
            redirect_heal_spell_id: config.redirect_heal_spell_id,
            year: config.year.unwrap_or_else(|| chrono::Utc::now().year()),
            correlation: CorrelationState::new(),
            notes: Vec::new(),
            stats: ParseStats::default(),
        }
    }

    /// Override the year appended to the log's `month/day` stamps
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }

    /// Fold every line of `text`, in file order, into an event list.
    ///
    /// Fails on the first malformed classified line; blank and unrecognized
    /// lines are skipped silently.
    pub fn parse(mut self, text: &str, meta: ReportMeta) -> Result<ParsedLog, ParseError> {
        let mut events: Vec<CombatEvent> = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            let line_no = idx as u64 + 1;
            self.stats.lines_read += 1;

            if line.trim().is_empty() {
                self.stats.blank_lines += 1;
                continue;
            }

            let kind = match classify(line) {
                Some(k) => k,
                None => {
                    self.stats.unrecognized_lines += 1;
                    continue;
                }
            };

            match self.parse_line(kind, line, line_no, &meta.report_id) {
                Ok(Some(event)) => {
                    *self
                        .stats
                        .event_counts
                        .entry(event.event_name.clone())
                        .or_insert(0) += 1;
                    events.push(event);
                }
                Ok(None) => {
                    self.stats.dropped_short_absorbs += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        report = %meta.report_id,
                        line = line_no,
                        error = %e.kind,
                        "Aborting parse"
                    );
                    return Err(e);
                }
            }
        }

        tracing::debug!(
            report = %meta.report_id,
            lines = self.stats.lines_read,
            events = events.len(),
            unrecognized = self.stats.unrecognized_lines,
            redirected = self.stats.redirected_heals,
            pending_redirects = self.correlation.len(),
            "Parsed combat log"
        );

        Ok(ParsedLog {
            shell: ReportShell {
                report_id: meta.report_id,
                report_name: meta.report_name,
                file_name: meta.file_name,
                owner_id: meta.owner_id,
                event_count: events.len(),
            },
            events,
            notes: self.notes,
            stats: self.stats,
        })
    }

    fn parse_line(
        &mut self,
        kind: EventKind,
        line: &str,
        line_no: u64,
        report_id: &str,
    ) -> Result<Option<CombatEvent>, ParseError> {
        let timestamp = timestamp::resolve(line, self.year).map_err(|k| k.at(line_no))?;
        let row = Row::new(kind.as_str(), line);

        let extracted = match fields::extract(kind, &row).map_err(|k| k.at(line_no))? {
            Some(x) => x,
            None => return Ok(None),
        };

        let mut event = CombatEvent {
            event_id: format!("{}-{:07}", report_id, line_no),
            report_id: report_id.to_string(),
            sequence: line_no,
            timestamp,
            event_name: kind.as_str().to_string(),
            source: extracted.source,
            target: extracted.target,
            body: extracted.body,
        };

        self.correlate(&mut event, line_no);
        Ok(Some(event))
    }

    /// Track redirect auras and credit redirected heals to the aura's caster
    fn correlate(&mut self, event: &mut CombatEvent, line_no: u64) {
        match &event.body {
            EventBody::AuraApplied { spell } if spell.id == self.redirect_aura_spell_id => {
                self.correlation.record_aura(&event.source, &event.target.name);
            }
            EventBody::Heal { spell, .. } if spell.id == self.redirect_heal_spell_id => {
                match self.correlation.resolve(&event.source.name) {
                    Some(entry) => {
                        event.source.name = entry.caster_name;
                        event.source.id = entry.caster_id;
                        self.stats.redirected_heals += 1;
                    }
                    None => {
                        let message = format!(
                            "no pending redirect aura for '{}'; heal left as logged",
                            event.source.name
                        );
                        tracing::info!(line = line_no, "{}", message);
                        self.notes.push(ParseNote {
                            line: line_no,
                            message,
                        });
                    }
                }
            }
            _ => {}
        }
    }
}
