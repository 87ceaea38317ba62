//! Drive the wrist with start/stop button presses.

use anyhow::Result;
use clap::ValueEnum;
use stride_sync_client::{MockSensorFeed, NoSensor, PublisherMode, SensorFeed};

use super::{Report, Rig};
use crate::config::Config;

/// A button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Step {
    /// Start button.
    Start,
    /// Stop button.
    Stop,
}

/// Run the manual command.
pub async fn run(config: &Config, script: &[Step]) -> Result<Report> {
    let publisher = config.publisher_config();
    let reachable = config.channel.reachable;

    if config.publisher.mode == PublisherMode::Legacy {
        press(Rig::new(publisher, NoSensor, reachable).await, script).await
    } else {
        press(Rig::new(publisher, MockSensorFeed::new(), reachable).await, script).await
    }
}

async fn press<S: SensorFeed>(mut rig: Rig<S>, script: &[Step]) -> Result<Report> {
    let mut lines = Vec::with_capacity(script.len());
    for step in script {
        let sent_before = rig.sent_count();
        match step {
            Step::Start => rig.publisher.start_running().await,
            Step::Stop => rig.publisher.stop_running().await,
        }
        rig.settle().await;
        lines.extend(rig.step_lines(&format!("{:?}", step).to_lowercase(), sent_before)?);
    }
    rig.report(lines)
}
