//! CLI command implementations.
//!
//! Each command wires a wrist publisher and a phone receiver over a paired
//! mock channel, drives the wrist, and reports what the phone mirrored.

pub mod manual;
pub mod sensor;

use anyhow::Result;
use stride_sync_client::{
    ActivityState, Channel, MockChannel, PhoneScene, PublisherConfig, SensorFeed, StateReceiver,
    StateSync, WristStatus,
};

/// Outcome of a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// One line per simulation step.
    pub lines: Vec<String>,
    /// Messages accepted by the channel.
    pub sent: usize,
    /// JSON of every accepted message, in send order.
    pub wire: Vec<String>,
    /// Final wrist state.
    pub wrist: ActivityState,
    /// Final phone state.
    pub phone: ActivityState,
}

impl Report {
    /// Print the report to stdout.
    pub fn print(&self) {
        for line in &self.lines {
            println!("{}", line);
        }
        println!();
        println!("Messages sent: {}", self.sent);
        println!(
            "Wrist state:   {}",
            if self.wrist.is_running { "running" } else { "standing" }
        );
        println!("Phone state:   {}", describe_phone(&self.phone));
    }
}

/// Wrist and phone joined by a paired mock channel.
struct Rig<S: SensorFeed> {
    publisher: StateSync<MockChannel, S>,
    receiver: StateReceiver<MockChannel>,
    wrist: MockChannel,
}

impl<S: SensorFeed> Rig<S> {
    async fn new(config: PublisherConfig, sensor: S, reachable: bool) -> Self {
        let (wrist, phone) = MockChannel::pair();
        wrist.set_reachable(reachable);

        let mut receiver = StateReceiver::new(phone);
        let mut publisher = StateSync::new(config, wrist.clone(), sensor);
        receiver.start().await;
        publisher.start().await;

        tracing::debug!(
            "Simulator ready: wrist {:?}, phone reachable {}",
            wrist.activation_state(),
            reachable
        );
        Self {
            publisher,
            receiver,
            wrist,
        }
    }

    /// Number of messages the channel has accepted so far.
    fn sent_count(&self) -> usize {
        self.wrist.sent_messages().len()
    }

    /// JSON of the messages accepted since the first `from` sends.
    fn wire_since(&self, from: usize) -> Result<Vec<String>> {
        let mut wire = Vec::new();
        for message in self.wrist.sent_decoded().iter().skip(from) {
            wire.push(message.to_json()?);
        }
        Ok(wire)
    }

    /// Describe the current step, followed by the messages it sent.
    fn step_lines(&self, step: &str, sent_before: usize) -> Result<Vec<String>> {
        let mut lines = vec![self.describe(step)];
        for json in self.wire_since(sent_before)? {
            lines.push(format!("    -> {}", json));
        }
        Ok(lines)
    }

    /// Let both sides apply everything queued so far.
    async fn settle(&mut self) {
        self.publisher.process_pending().await;
        self.receiver.process_pending().await;
    }

    fn describe(&self, step: &str) -> String {
        let wrist = WristStatus::for_snapshot(&self.publisher.state(), self.publisher.revision());
        format!(
            "{:<12} {:<18} | phone {}",
            step,
            wrist.to_string(),
            describe_phone(&self.receiver.state())
        )
    }

    fn report(&self, lines: Vec<String>) -> Result<Report> {
        Ok(Report {
            lines,
            sent: self.sent_count(),
            wire: self.wire_since(0)?,
            wrist: self.publisher.state(),
            phone: self.receiver.state(),
        })
    }
}

fn describe_phone(state: &ActivityState) -> String {
    let scene = PhoneScene::for_state(state);
    match state.displayed_heart_rate() {
        Some(bpm) => format!("{} ({:.0} bpm)", scene.asset(), bpm),
        None => scene.asset().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_description_shows_rate_only_while_running() {
        assert_eq!(
            describe_phone(&ActivityState::running(121.4)),
            "Run.dae (121 bpm)"
        );
        assert_eq!(describe_phone(&ActivityState::standing()), "Stand.dae");
    }
}
