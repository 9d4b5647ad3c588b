use proptest::prelude::*;

use courtside_core::config::ClassifierSettings;
use courtside_core::types::{RouteKind, SignalFamily};
use courtside_route::{classify, Classifier, PatternTable};

const ENTITIES: &[&str] = &["LeBron James", "Stephen Curry", "Nikola Jokic", "Jayson Tatum", "the Celtics", "the Lakers", "Luka Doncic"];
const METRICS: &[&str] = &["scoring average", "rebounds per game", "assists", "three-point percentage", "points", "free throw percentage"];
const LEADS: &[&str] = &["What is", "Show", "Give me", "List"];
const CONJUNCTION_TAILS: &[&str] = &["and why is he so good", "and explain how that happened", "and why does it matter", "and explain the trend"];

#[test]
fn most_points_is_statistical() {
    let d = classify("Who scored the most points this season?");
    assert_eq!(d.kind, RouteKind::Statistical);
    assert!(d.has_family(SignalFamily::Metric));
    assert!(d.has_family(SignalFamily::Ranking));
    assert_eq!(d.contextual_score, 0.0);
}

#[test]
fn fan_opinion_is_contextual() {
    let d = classify("What do fans think about the Lakers?");
    assert_eq!(d.kind, RouteKind::Contextual);
    assert!(d.has_family(SignalFamily::Entity));
    assert!(d.has_family(SignalFamily::Opinion));
    assert!(!d.linked);
}

#[test]
fn average_and_why_is_hybrid() {
    let d = classify("What is Nikola Jokic's scoring average and why is he elite?");
    assert_eq!(d.kind, RouteKind::Hybrid);
    assert!(d.linked);
    assert!(d.statistical_score >= 1.0);
    assert!(d.contextual_score >= 1.0);
}

#[test]
fn both_signals_without_conjunction_resolve_statistical() {
    let d = classify("Is Curry's three-point percentage underrated?");
    assert!(d.has_family(SignalFamily::Metric));
    assert!(d.has_family(SignalFamily::Opinion));
    assert!(!d.linked);
    assert_eq!(d.kind, RouteKind::Statistical);
}

#[test]
fn no_signals_is_unknown() {
    let d = classify("Tell me something interesting");
    assert_eq!(d.kind, RouteKind::Unknown);
    assert!(d.signals.is_empty());
}

#[test]
fn entity_alone_is_not_statistical() {
    assert_eq!(classify("Lakers").kind, RouteKind::Unknown);
    assert_eq!(classify("Who led the Celtics in assists").kind, RouteKind::Statistical);
    assert_eq!(classify("Which of the Celtics ranked highest").kind, RouteKind::Statistical);
}

#[test]
fn trace_reports_labels() {
    let d = classify("How many rebounds did Domantas Sabonis grab?");
    let terms: Vec<&str> = d.signals.iter().map(|s| s.term.as_str()).collect();
    assert!(terms.contains(&"Domantas Sabonis"));
    assert!(terms.contains(&"rebounds?"));
    assert!(terms.contains(&"how many"));
}

#[test]
fn configured_vocabulary_extends_routing() {
    let base = classify("What is Scoot Henderson's usage rate and why is it rising?");
    assert_eq!(base.kind, RouteKind::Contextual, "no entity or metric known yet");
    let extra = ClassifierSettings {
        extra_entities: vec!["Scoot Henderson".into()],
        extra_metrics: vec!["usage rate".into()],
        ..Default::default()
    };
    let classifier = Classifier::new(std::sync::Arc::new(PatternTable::build(&extra).expect("table")));
    assert_eq!(classifier.classify("What is Scoot Henderson's usage rate and why is it rising?").kind, RouteKind::Hybrid);
}

proptest! {
    #[test]
    fn entity_with_conjunction_is_hybrid(
        e in prop::sample::select(ENTITIES),
        m in prop::sample::select(METRICS),
        tail in prop::sample::select(CONJUNCTION_TAILS),
    ) {
        let q = format!("What is {e}'s {m} {tail}?");
        prop_assert_eq!(classify(&q).kind, RouteKind::Hybrid, "query: {}", q);
    }

    #[test]
    fn named_entity_alone_with_conjunction_is_hybrid(
        e in prop::sample::select(ENTITIES),
        tail in prop::sample::select(CONJUNCTION_TAILS),
    ) {
        let q = format!("Tell me about {e} {tail}");
        prop_assert_eq!(classify(&q).kind, RouteKind::Hybrid, "query: {}", q);
    }

    #[test]
    fn entity_metric_without_opinion_is_statistical(
        e in prop::sample::select(ENTITIES),
        m in prop::sample::select(METRICS),
        lead in prop::sample::select(LEADS),
    ) {
        let q = format!("{lead} {e}'s {m} this season");
        prop_assert_eq!(classify(&q).kind, RouteKind::Statistical, "query: {}", q);
    }

    #[test]
    fn classify_is_deterministic(q in "[a-zA-Z' ?]{0,60}") {
        prop_assert_eq!(classify(&q), classify(&q));
    }
}
