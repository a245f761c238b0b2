use super::*;

fn delta(participant: &str, text: &str) -> EventKind {
    EventKind::MessageDelta(MessageDelta {
        participant_id: participant.to_string(),
        text: text.to_string(),
    })
}

#[test]
fn test_event_wire_shape() {
    let event = Event {
        id: "evt-1".to_string(),
        channel_id: "proj-1".to_string(),
        timestamp: 1_700_000_000_000,
        kind: delta("ceo", "Hel"),
    };
    let value = serde_json::to_value(&event).unwrap();

    assert_eq!(value["id"], "evt-1");
    assert_eq!(value["type"], "message_delta");
    assert_eq!(value["channelId"], "proj-1");
    assert_eq!(value["timestamp"], 1_700_000_000_000_i64);
    assert_eq!(value["data"]["participantId"], "ceo");
    assert_eq!(value["data"]["text"], "Hel");
}

#[test]
fn test_project_id_alias() {
    let json = r#"{"id":"e","projectId":"p-9","timestamp":5,"type":"round_start","data":{"round":2}}"#;
    let event: Event = serde_json::from_str(json).unwrap();
    assert_eq!(event.channel_id, "p-9");
    assert_eq!(event.kind, EventKind::RoundStart(RoundStart { round: 2 }));
}

#[test]
fn test_unknown_type_is_rejected() {
    let json = r#"{"id":"e","channelId":"p","timestamp":5,"type":"telepathy","data":{}}"#;
    assert!(serde_json::from_str::<Event>(json).is_err());
}

#[test]
fn test_optional_fields_omitted() {
    let kind = EventKind::TextDelta(TextDelta {
        file: "src/main.rs".to_string(),
        content: "fn main() {}".to_string(),
        diff: None,
        agent: None,
    });
    let json = serde_json::to_string(&kind).unwrap();
    assert!(json.contains("\"type\":\"text_delta\""));
    assert!(!json.contains("diff"));
    assert!(!json.contains("agent"));
}

#[test]
fn test_progress_round_trip_with_unicode() {
    let event = Event::new(
        "proj-ü",
        EventKind::Progress(ProgressUpdate {
            phase: "déploiement".to_string(),
            percent: 42,
            message: "構築中 🚀".to_string(),
            sub_tasks: vec![SubTask {
                name: "migrate".to_string(),
                status: SubTaskStatus::InProgress,
            }],
        }),
    );
    let json = serde_json::to_string(&event).unwrap();
    let back: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
}

#[test]
fn test_new_event_ids_are_unique() {
    let a = Event::new("c", delta("a", "x"));
    let b = Event::new("c", delta("a", "x"));
    assert_ne!(a.id, b.id);
    assert!(a.timestamp > 0);
}

#[test]
fn test_kind_names_match_wire_tags() {
    let kinds = vec![
        delta("a", "x"),
        EventKind::Message(ChatMessage::system("hi")),
        EventKind::Complete(Completion::default()),
        EventKind::SummaryComplete(Summary::text("done")),
        EventKind::ConsensusUpdate(ConsensusUpdate { level: 70 }),
    ];
    for kind in kinds {
        let value = serde_json::to_value(&kind).unwrap();
        assert_eq!(value["type"], kind.name());
    }
}

#[test]
fn test_terminal_kinds() {
    assert!(EventKind::Complete(Completion::default()).is_terminal());
    assert!(EventKind::SummaryComplete(Summary::text("s")).is_terminal());
    assert!(!delta("a", "b").is_terminal());
}

#[test]
fn test_fractional_percentages_are_rounded_and_clamped() {
    let json = r#"{"id":"e","channelId":"p","timestamp":5,"type":"progress",
        "data":{"phase":"build","percent":42.5,"message":"compiling"}}"#;
    let event: Event = serde_json::from_str(json).unwrap();
    match event.kind {
        EventKind::Progress(p) => assert_eq!(p.percent, 43),
        other => panic!("expected Progress, got: {:?}", other),
    }

    let consensus: ConsensusUpdate = serde_json::from_str(r#"{"level":250}"#).unwrap();
    assert_eq!(consensus.level, 100);

    let status: ParticipantStatusUpdate = serde_json::from_str(
        r#"{"participantId":"a","name":"A","status":"working","progress":-4.2}"#,
    )
    .unwrap();
    assert_eq!(status.progress, Some(0));

    let decision: DecisionClassification = serde_json::from_str(
        r#"{"id":"d","title":"t","category":"c","confidence":0.49}"#,
    )
    .unwrap();
    assert_eq!(decision.confidence, Some(0));

    let summary: Summary = serde_json::from_str(r#"{"text":"ok","consensusLevel":87.6}"#).unwrap();
    assert_eq!(summary.consensus_level, Some(88));

    let summary: Summary = serde_json::from_str(r#"{"text":"ok"}"#).unwrap();
    assert_eq!(summary.consensus_level, None);
}

#[test]
fn test_non_numeric_percentage_is_rejected() {
    assert!(serde_json::from_str::<ConsensusUpdate>(r#"{"level":"high"}"#).is_err());
}
