mod common;

use common::*;
use healparser::models::{EventBody, HealKind};
use healparser::scoring::{heal_records, score_report};

#[test]
fn two_line_log_scores_heal_and_dispel() {
    let parsed = parse(&[
        heal("21:00:01.000", "Alice", "Bob", 2061, 500, 50),
        dispel("21:00:02.000", "Alice", "Bob", HI_PRI_DEBUFF),
    ]);
    let report = score_report(&parsed.events, "r1", "Karazhan", &scoring(), false);

    assert_eq!(report.players.len(), 1);
    let alice = &report.players[0];
    assert_eq!(alice.player, "Alice");
    assert_eq!(alice.player_id, "Player-Alice");
    assert_eq!(alice.raw_healing, 500.0);
    assert_eq!(alice.overhealing, 50.0);
    assert_eq!(alice.actual_hp_healed, 450.0);
    assert_eq!(alice.total_dispels, 1);
    assert_eq!(alice.total_hi_pri_dispels, 1);
    assert_eq!(alice.total_dispel_points, 10);
    assert!((alice.total_score - 10.45).abs() < 1e-9);
    // no damage was taken, so there is no share to compare against
    assert_eq!(alice.score_adjusted, 0.0);
}

#[test]
fn parsing_and_scoring_are_deterministic() {
    let lines = vec![
        boss_swing("21:00:00.000", "Bob", 4000),
        heal("21:00:01.000", "Alice", "Bob", 2061, 1500, 100),
        periodic_heal("21:00:02.000", "Carol", "Bob", 300, 0),
        creature_absorb("21:00:03.000", "Carol", "Bob", 450),
    ];
    let a = parse(&lines);
    let b = parse(&lines);
    assert_eq!(a, b);

    let ra = score_report(&a.events, "r1", "Karazhan", &scoring(), true);
    let rb = score_report(&b.events, "r1", "Karazhan", &scoring(), true);
    assert_eq!(ra, rb);
}

#[test]
fn equal_scores_keep_first_appearance_order() {
    let parsed = parse(&[
        boss_swing("21:00:00.000", "Tank", 1000),
        heal("21:00:01.000", "Bob", "Tank", 2061, 900, 0),
        heal("21:00:02.000", "Alice", "Tank", 2061, 700, 0),
    ]);
    let report = score_report(&parsed.events, "r1", "Karazhan", &scoring(), false);

    // both exceed the 500 share and cap at 100
    let names: Vec<&str> = report.players.iter().map(|p| p.player.as_str()).collect();
    assert_eq!(names, vec!["Bob", "Alice"]);
    assert!(report.players.iter().all(|p| p.score_adjusted == 100.0));
}

#[test]
fn aggregates_satisfy_sum_and_bound_invariants() {
    let parsed = parse(&[
        boss_swing("21:00:00.000", "Tank", 6000),
        boss_spell_on_creature("21:00:00.500", 9999),
        heal("21:00:01.000", "Alice", "Tank", 2061, 1234, 200),
        periodic_heal("21:00:01.500", "Alice", "Tank", 321, 21),
        creature_absorb("21:00:02.000", "Carol", "Tank", 777),
        heal("21:00:02.500", "Carol", "Tank", 2061, 5000, 4000),
        dispel("21:00:03.000", "Carol", "Tank", HI_PRI_DEBUFF),
        dispel("21:00:03.500", "Carol", "Tank", 1),
    ]);
    let report = score_report(&parsed.events, "r1", "Karazhan", &scoring(), false);
    assert!(!report.players.is_empty());

    for p in &report.players {
        let expected = p.raw_healing - p.overhealing + p.prevented;
        assert!((p.actual_hp_healed - expected).abs() < 1e-9, "{}", p.player);
        assert!((p.overhealing - (p.overheal_from_hots + p.overheal_from_casts)).abs() < 1e-9);
        let total = p.actual_hp_healed / 1000.0 + p.total_dispel_points as f64;
        assert!((p.total_score - total).abs() < 1e-9, "{}", p.player);
        assert!((0.0..=100.0).contains(&p.score_adjusted), "{}", p.player);
        assert!(p.total_score > 0.0);
    }

    let carol = report.players.iter().find(|p| p.player == "Carol").unwrap();
    assert_eq!(carol.prevented, 777.0);
    assert_eq!(carol.total_dispels, 2);
    assert_eq!(carol.total_hi_pri_dispels, 1);
}

#[test]
fn damage_share_uses_only_hits_on_players() {
    let parsed = parse(&[
        boss_swing("21:00:00.000", "Tank", 4000),
        boss_spell_on_creature("21:00:00.500", 9999),
        heal("21:00:01.000", "Alice", "Tank", 2061, 1000, 0),
    ]);
    let report = score_report(&parsed.events, "r1", "Karazhan", &scoring(), false);
    assert_eq!(report.players[0].player, "Alice");
    assert_eq!(report.players[0].score_adjusted, 50.0);
}

#[test]
fn non_positive_players_are_excluded() {
    let parsed = parse(&[
        boss_swing("21:00:00.000", "Tank", 1000),
        heal("21:00:01.000", "Alice", "Tank", 2061, 100, 100),
        heal("21:00:02.000", "Bob", "Tank", 2061, 300, 0),
    ]);
    let report = score_report(&parsed.events, "r1", "Karazhan", &scoring(), false);
    let names: Vec<&str> = report.players.iter().map(|p| p.player.as_str()).collect();
    assert_eq!(names, vec!["Bob"]);
}

#[test]
fn redirected_heal_is_credited_to_aura_caster() {
    let parsed = parse(&[
        aura("21:00:00.000", "Alice", "Bob", 41635),
        heal("21:00:01.000", "Bob", "Carol", 33110, 800, 0),
    ]);
    assert_eq!(parsed.stats.redirected_heals, 1);

    let report = score_report(&parsed.events, "r1", "Karazhan", &scoring(), false);
    assert_eq!(report.players.len(), 1);
    assert_eq!(report.players[0].player, "Alice");
    assert_eq!(report.players[0].raw_healing, 800.0);
}

#[test]
fn player_layout_absorb_produces_no_record() {
    let parsed = parse(&[player_absorb("21:00:00.000", "Alice", "Bob", 450)]);
    assert!(parsed.events.is_empty());
    assert_eq!(parsed.stats.dropped_short_absorbs, 1);
    assert!(heal_records(&parsed.events).is_empty());
}

#[test]
fn creature_layout_absorb_produces_prevention_record() {
    let parsed = parse(&[creature_absorb("21:00:00.000", "Alice", "Bob", 450)]);
    assert_eq!(parsed.events.len(), 1);
    match &parsed.events[0].body {
        EventBody::Absorb(detail) => {
            assert_eq!(detail.absorbed_spell_id, None);
            assert_eq!(detail.shield_caster.name, "Alice");
            assert_eq!(detail.shield_spell.id, 10901);
        }
        other => panic!("expected absorb, got {:?}", other),
    }

    let records = heal_records(&parsed.events);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, HealKind::Prevention);
    assert_eq!(records[0].player_name, "Alice");
    assert_eq!(records[0].target_name, "Bob");
    assert_eq!(records[0].amount_healed_or_prevented, 450.0);
}

#[test]
fn unknown_event_kind_is_ignored() {
    let parsed = parse(&[
        "4/2 21:00:00.000  UNIT_DIED,0000000000000000,nil,0x80000000,0x80000000,Player-Bob,\"Bob\",0x511,0x0"
            .to_string(),
    ]);
    assert!(parsed.events.is_empty());
    assert!(parsed.notes.is_empty());
    assert_eq!(parsed.stats.unrecognized_lines, 1);
}

#[test]
fn heal_records_follow_time_order() {
    let parsed = parse(&[
        heal("21:00:05.000", "Alice", "Bob", 2061, 100, 0),
        heal("21:00:01.000", "Carol", "Bob", 2061, 100, 0),
        dispel("21:00:03.000", "Alice", "Bob", HI_PRI_DEBUFF),
    ]);
    let records = heal_records(&parsed.events);
    let kinds: Vec<(String, HealKind)> = records
        .iter()
        .map(|r| (r.player_name.clone(), r.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("Carol".to_string(), HealKind::Direct),
            ("Alice".to_string(), HealKind::Dispel),
            ("Alice".to_string(), HealKind::Direct),
        ]
    );
    assert_eq!(records[1].spell_removed_id, Some(HI_PRI_DEBUFF));
}
