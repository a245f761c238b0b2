//! `conclave watch` - follow a channel and print what changes

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use conclave_core::{
    Applied, DiscussionState, Event, EventKind, ProgressState, Reconstructor, Reduce,
};
use conclave_stream::{
    ConnectionStatus, ConsumerConfig, ConsumerEvent, ConsumerHandle, HttpSource, StreamConsumer,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::server::{load_config, wait_for_shutdown_signal};

/// Which view to reconstruct
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WatchMode {
    /// Multi-participant deliberation
    Discussion,
    /// Delivery pipeline progress
    Progress,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Channel (project or session) id
    pub channel: String,
    /// Server base URL (defaults to consumer.base_url)
    #[arg(long)]
    pub url: Option<String>,
    /// View to reconstruct
    #[arg(long, value_enum, default_value_t = WatchMode::Discussion)]
    pub mode: WatchMode,
    /// Keep watching after the terminal event
    #[arg(long)]
    pub follow: bool,
}

/// Run the watcher until the channel completes or Ctrl+C
pub async fn run(args: WatchArgs) -> Result<()> {
    let mut config = match load_config() {
        Ok(config) => config.consumer,
        Err(e) => {
            warn!(error = %e, "Configuration unavailable, using consumer defaults");
            ConsumerConfig::default()
        }
    };
    if let Some(url) = args.url {
        config.base_url = url;
    }
    config.validate()?;

    let source = HttpSource::new(&config.base_url).context("Failed to create HTTP client")?;
    let consumer = StreamConsumer::new(Arc::new(source), config);
    let mut handle = consumer.start(args.channel.clone());

    match args.mode {
        WatchMode::Discussion => {
            follow(&mut handle, render_discussion, args.follow).await;
        }
        WatchMode::Progress => {
            follow(&mut handle, render_progress, args.follow).await;
        }
    }

    handle.stop().await;
    Ok(())
}

async fn follow<S: Reduce>(handle: &mut ConsumerHandle, render: fn(&Event, &S), keep_going: bool) {
    let mut reconstructor = Reconstructor::<S>::new().on_error(|report| {
        let level = if report.recoverable { "warning" } else { "error" };
        eprintln!("! {level} [{}]: {}", report.code, report.message);
    });

    let shutdown = wait_for_shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let item = tokio::select! {
            _ = &mut shutdown => break,
            item = handle.next() => item,
        };

        match item {
            None => break,
            Some(ConsumerEvent::Status(status)) => print_status(&status),
            Some(ConsumerEvent::Event(event)) => {
                if reconstructor.apply(&event) == Applied::Ignored {
                    debug!(event_id = %event.id, kind = event.kind_name(), "Nothing to show");
                } else {
                    render(&event, reconstructor.state());
                }
                if event.kind.is_terminal() && !keep_going {
                    break;
                }
            }
        }
    }
}

fn print_status(status: &ConnectionStatus) {
    match status {
        ConnectionStatus::Connecting => eprintln!("~ connecting"),
        ConnectionStatus::Connected => eprintln!("~ connected"),
        ConnectionStatus::Disconnected { error: Some(error) } => eprintln!("~ disconnected: {error}"),
        ConnectionStatus::Disconnected { error: None } => eprintln!("~ disconnected"),
        ConnectionStatus::Reconnecting { attempt } => eprintln!("~ reconnecting (attempt {attempt})"),
        ConnectionStatus::Stopped => eprintln!("~ stopped"),
    }
}

fn participant_name<'a>(state: &'a DiscussionState, id: &'a str) -> &'a str {
    state
        .participants
        .iter()
        .find(|p| p.id == id)
        .map(|p| p.name.as_str())
        .unwrap_or(id)
}

fn render_discussion(event: &Event, state: &DiscussionState) {
    match &event.kind {
        EventKind::ChannelInit(init) => {
            let names: Vec<&str> = init.participants.iter().map(|p| p.name.as_str()).collect();
            println!("Round {}/{} with {}", state.round, state.max_rounds, names.join(", "));
        }
        EventKind::RoundStart(_) => println!("--- Round {} ---", state.round),
        EventKind::MessageComplete(complete) => {
            if let Some(message) = state.message(state.round, &complete.participant_id) {
                println!(
                    "{}: {}",
                    participant_name(state, &complete.participant_id),
                    message.content
                );
            }
        }
        EventKind::ConsensusUpdate(_) => println!("Consensus: {}%", state.consensus_level),
        EventKind::InsightsUpdate(_) => {
            let insights: Vec<&str> = state.key_insights.iter().map(String::as_str).collect();
            println!("Insights: {}", insights.join("; "));
        }
        EventKind::DecisionClassified(decision) => {
            println!("Decision [{}]: {}", decision.category, decision.title);
        }
        EventKind::SummaryComplete(_) | EventKind::Complete(_) => {
            if let Some(summary) = &state.summary {
                println!("Summary: {}", summary.text);
                if let Some(recommendation) = &summary.recommendation {
                    println!("Recommendation: {recommendation}");
                }
            }
        }
        // Speaking and deltas are shown once the message completes; errors go
        // through the reconstructor callback
        EventKind::ParticipantSpeaking(_)
        | EventKind::MessageDelta(_)
        | EventKind::Error(_)
        | EventKind::Progress(_)
        | EventKind::ParticipantStatus(_)
        | EventKind::TextDelta(_)
        | EventKind::ContentReplace(_)
        | EventKind::Message(_) => {}
    }
}

fn render_progress(event: &Event, state: &ProgressState) {
    match &event.kind {
        EventKind::Progress(_) => {
            println!("[{:>3}%] {}: {}", state.percent, state.phase, state.message);
        }
        EventKind::ParticipantStatus(status) => match &status.task {
            Some(task) => println!("{} is {:?} on {}", status.name, status.status, task),
            None => println!("{} is {:?}", status.name, status.status),
        },
        EventKind::TextDelta(change) => {
            let size = state.files.get(&change.file).map_or(0, |f| f.content.len());
            println!("  {} ({} bytes)", change.file, size);
        }
        EventKind::ContentReplace(change) => {
            println!("  {} rewritten ({} bytes)", change.file, change.content.len());
        }
        EventKind::Message(message) => println!("{}: {}", message.role, message.content),
        EventKind::Complete(_) => match &state.summary {
            Some(summary) => println!("Completed: {summary}"),
            None => println!("Completed"),
        },
        EventKind::Error(_)
        | EventKind::ChannelInit(_)
        | EventKind::RoundStart(_)
        | EventKind::ParticipantSpeaking(_)
        | EventKind::MessageDelta(_)
        | EventKind::MessageComplete(_)
        | EventKind::ConsensusUpdate(_)
        | EventKind::InsightsUpdate(_)
        | EventKind::DecisionClassified(_)
        | EventKind::SummaryComplete(_) => {}
    }
}
