//! Integration tests for Conclave
//!
//! These tests run the server half and the viewer half against each other:
//! - conclave-core: registry, transport framing, state reconstruction
//! - conclave-stream: chunked decoding and the reconnecting consumer

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use conclave_core::{
    encode_frame, BrokerConfig, ChannelInit, ChannelRegistry, ChatMessage, DiscussionState,
    Event, EventKind, EventStream, MessageComplete, MessageDelta, Participant,
    ParticipantSpeaking, Reconstructor, Reduce, Summary, TransportConfig,
};
use conclave_stream::{
    ByteSource, ByteStream, ConnectionStatus, ConsumerConfig, ConsumerEvent, EventDecoder,
    StreamConsumer,
};
use futures::StreamExt;

// ============================================================================
// Helpers
// ============================================================================

fn participant(id: &str, name: &str) -> Participant {
    Participant {
        id: id.to_string(),
        name: name.to_string(),
        role: None,
    }
}

/// Deliberation scenario: init, one speaker streams "Hel" + "lo", then the
/// authoritative text "Hello!" arrives.
fn scenario() -> Vec<EventKind> {
    vec![
        EventKind::ChannelInit(ChannelInit {
            round: 1,
            max_rounds: 2,
            participants: vec![participant("A", "Alice"), participant("B", "Bob")],
        }),
        EventKind::ParticipantSpeaking(ParticipantSpeaking {
            participant_id: "A".to_string(),
        }),
        EventKind::MessageDelta(MessageDelta {
            participant_id: "A".to_string(),
            text: "Hel".to_string(),
        }),
        EventKind::MessageDelta(MessageDelta {
            participant_id: "A".to_string(),
            text: "lo".to_string(),
        }),
        EventKind::MessageComplete(MessageComplete {
            participant_id: "A".to_string(),
            content: "Hello!".to_string(),
        }),
    ]
}

fn assert_hello(state: &DiscussionState) {
    let message = state.message(1, "A").expect("message for (1, A)");
    assert_eq!(message.content, "Hello!");
    assert!(!message.is_streaming);
}

/// In-process source: serves a registry's event streams as bytes, the way
/// the HTTP route does.
struct RegistrySource {
    registry: Arc<ChannelRegistry>,
    transport: TransportConfig,
}

#[async_trait]
impl ByteSource for RegistrySource {
    async fn connect(&self, channel_id: &str) -> conclave_stream::Result<ByteStream> {
        let stream = EventStream::open(&self.registry, channel_id, &self.transport)
            .map_err(|e| conclave_stream::Error::Transport(e.to_string()))?;
        Ok(stream
            .encoded()
            .map(|frame| {
                frame
                    .map(Bytes::from)
                    .map_err(|e| conclave_stream::Error::Transport(e.to_string()))
            })
            .boxed())
    }
}

// ============================================================================
// Framing
// ============================================================================

#[test]
fn test_frame_split_at_every_byte_offset() {
    let event = Event::new(
        "board-1",
        EventKind::Message(ChatMessage {
            role: "ceo".to_string(),
            content: "합의에 도달했습니다 🎉 ünïcödé ✓".to_string(),
        }),
    );
    let wire = encode_frame(&event).unwrap().into_bytes();

    for split in 0..=wire.len() {
        let mut decoder = EventDecoder::new();
        let mut events = decoder.feed(&wire[..split]);
        events.extend(decoder.feed(&wire[split..]));
        events.extend(decoder.finish());

        assert_eq!(events, vec![event.clone()], "split at byte {split}");
        assert_eq!(decoder.dropped(), 0);
    }
}

#[test]
fn test_stream_fed_one_byte_at_a_time() {
    let events: Vec<Event> = scenario()
        .into_iter()
        .map(|kind| Event::new("board-1", kind))
        .collect();
    let wire: String = events
        .iter()
        .map(|e| encode_frame(e).unwrap())
        .collect::<Vec<_>>()
        .join(": keep-alive\n\n");

    let mut decoder = EventDecoder::new();
    let mut decoded = Vec::new();
    for byte in wire.as_bytes() {
        decoded.extend(decoder.feed(std::slice::from_ref(byte)));
    }
    decoded.extend(decoder.finish());

    assert_eq!(decoded, events);
    assert_hello(&DiscussionState::fold(&decoded));
}

// ============================================================================
// Broker → transport → decoder → reconstructor
// ============================================================================

#[tokio::test]
async fn test_late_joiner_rebuilds_state_from_replay() {
    let registry = ChannelRegistry::new(BrokerConfig::default());
    for kind in scenario() {
        registry.publish_kind("board-1", kind);
    }

    let stream = EventStream::open(&registry, "board-1", &TransportConfig::default()).unwrap();
    let mut frames = stream.encoded().boxed();

    let mut decoder = EventDecoder::new();
    let mut reconstructor = Reconstructor::<DiscussionState>::new();
    // Connect notice plus five replayed events
    for _ in 0..6 {
        let frame = frames.next().await.unwrap().unwrap();
        for event in decoder.feed(frame.as_bytes()) {
            reconstructor.apply(&event);
        }
    }

    assert_hello(reconstructor.state());
}

#[tokio::test]
async fn test_consumer_follows_live_channel() {
    let registry = ChannelRegistry::new(BrokerConfig::default());
    let source = RegistrySource {
        registry: registry.clone(),
        transport: TransportConfig::default(),
    };
    let consumer = StreamConsumer::new(Arc::new(source), ConsumerConfig::default());
    let mut handle = consumer.start("board-1");

    assert_eq!(
        handle.next().await,
        Some(ConsumerEvent::Status(ConnectionStatus::Connecting))
    );
    assert_eq!(
        handle.next().await,
        Some(ConsumerEvent::Status(ConnectionStatus::Connected))
    );
    // Connect notice
    assert!(matches!(handle.next().await, Some(ConsumerEvent::Event(_))));

    for kind in scenario() {
        registry.publish_kind("board-1", kind);
    }
    registry.publish_kind(
        "board-1",
        EventKind::SummaryComplete(Summary::text("Say hello first")),
    );

    let mut reconstructor = Reconstructor::<DiscussionState>::new();
    loop {
        match handle.next().await {
            Some(ConsumerEvent::Event(event)) => {
                reconstructor.apply(&event);
                if event.kind.is_terminal() {
                    break;
                }
            }
            Some(ConsumerEvent::Status(status)) => panic!("unexpected status: {:?}", status),
            None => panic!("consumer ended early"),
        }
    }

    let state = reconstructor.state();
    assert_hello(state);
    assert_eq!(state.summary.as_ref().unwrap().text, "Say hello first");

    handle.stop().await;
    assert_eq!(registry.subscriber_count("board-1"), 0);
}

#[tokio::test]
async fn test_replay_after_reconnect_is_not_applied_twice() {
    let registry = ChannelRegistry::new(BrokerConfig::default());
    let events: Vec<Event> = scenario()
        .into_iter()
        .map(|kind| registry.publish_kind("board-1", kind))
        .collect();

    let mut reconstructor = Reconstructor::<DiscussionState>::new();
    // First connection saw the first four events, then dropped
    for event in &events[..4] {
        reconstructor.apply(event);
    }
    // The new connection replays the whole backlog
    for event in registry.history("board-1") {
        reconstructor.apply(&event);
    }

    assert_hello(reconstructor.state());
    assert_eq!(reconstructor.state().messages.len(), 1);
    assert_eq!(reconstructor.state(), &DiscussionState::fold(&events));
}
