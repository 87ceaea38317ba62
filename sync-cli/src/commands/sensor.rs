//! Drive the wrist from simulated heart-rate samples.

use anyhow::{bail, Result};
use stride_sync_client::{MockSensorFeed, PublisherMode};

use super::{Report, Rig};
use crate::config::Config;

/// Run the sensor command.
///
/// Feeds `samples` one at a time. From index `unreachable_from` onwards the
/// phone is unreachable.
pub async fn run(config: &Config, samples: &[f64], unreachable_from: Option<usize>) -> Result<Report> {
    if config.publisher.mode == PublisherMode::Legacy {
        bail!("The sensor command needs a sensor-driven mode; legacy has no sensor");
    }

    let mut rig = Rig::new(
        config.publisher_config(),
        MockSensorFeed::new(),
        config.channel.reachable,
    )
    .await;

    let mut lines = Vec::with_capacity(samples.len());
    for (index, &bpm) in samples.iter().enumerate() {
        if unreachable_from.is_some_and(|from| index == from) {
            tracing::info!("Phone goes out of range at sample {}", index);
            rig.wrist.set_reachable(false);
        }
        let sent_before = rig.sent_count();
        rig.publisher.sensor().emit_heart_rate(bpm);
        rig.settle().await;
        lines.extend(rig.step_lines(&format!("{:.0} bpm", bpm), sent_before)?);
    }

    rig.report(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stride_sync_client::ActivityState;

    const RAMP: [f64; 5] = [70.0, 85.0, 105.0, 120.0, 95.0];

    #[tokio::test]
    async fn threshold_ramp_sends_three_messages() {
        let report = run(&Config::default(), &RAMP, None).await.unwrap();

        assert_eq!(report.sent, 3);
        assert_eq!(report.phone, ActivityState::standing());
        assert_eq!(
            report.wire,
            vec![
                r#"{"action":"running","heartRate":105.0}"#,
                r#"{"action":"running","heartRate":120.0}"#,
                r#"{"action":"standing","heartRate":0.0}"#,
            ]
        );
        assert!(report.lines[0].contains("IDLE"));
        assert!(report.lines[2].contains("RUNNING"));
        assert_eq!(
            report.lines[3],
            r#"    -> {"action":"running","heartRate":105.0}"#
        );
    }

    #[tokio::test]
    async fn unreachable_phone_keeps_last_delivered_state() {
        let report = run(&Config::default(), &RAMP, Some(3)).await.unwrap();

        assert_eq!(report.sent, 1);
        assert_eq!(report.phone, ActivityState::running(105.0));
        assert_eq!(report.wrist, ActivityState::standing());
    }

    #[tokio::test]
    async fn unreachable_from_start_sends_nothing() {
        let mut config = Config::default();
        config.channel.reachable = false;

        let report = run(&config, &RAMP, None).await.unwrap();

        assert_eq!(report.sent, 0);
        assert_eq!(report.phone, ActivityState::standing());
    }

    #[tokio::test]
    async fn custom_threshold_is_honoured() {
        let mut config = Config::default();
        config.publisher.running_threshold_bpm = 80.0;

        let report = run(&config, &RAMP, None).await.unwrap();

        assert_eq!(report.phone, ActivityState::running(95.0));
    }

    #[tokio::test]
    async fn legacy_mode_is_rejected() {
        let mut config = Config::default();
        config.publisher.mode = PublisherMode::Legacy;

        assert!(run(&config, &RAMP, None).await.is_err());
    }
}
