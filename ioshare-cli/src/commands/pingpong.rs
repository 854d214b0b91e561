// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `ioshare pingpong` command - Cross-process round-trip benchmark.
//!
//! Two channels in opposite directions, `<base>_a2b` and `<base>_b2a`. The
//! leader produces on `a2b` and waits for the echo on `b2a`; the follower
//! echoes every item back. Start the two roles in separate processes, in
//! either order.

use std::time::{Duration, Instant};

use clap::ValueEnum;
use serde::Serialize;

use ioshare_core::channel::codec::FRAME_HEADER_SIZE;
use ioshare_core::{Capacity, Channel, ChannelMode, FrameCodec, Ownership};

use super::target::{resolve_or, Target};

/// Side of the exchange this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    /// Sends pings and measures round trips. Owns both channels.
    Leader,
    /// Echoes every ping back.
    Follower,
}

/// Round-trip latency summary.
#[derive(Debug, Clone, Serialize)]
pub struct LatencyReport {
    pub rounds: usize,
    pub payload_bytes: usize,
    pub min_ns: u64,
    pub max_ns: u64,
    pub mean_ns: f64,
    pub median_ns: u64,
    pub p95_ns: u64,
    pub p99_ns: u64,
    pub elapsed_ms: f64,
    pub round_trips_per_sec: f64,
    /// Payload bytes moved in both directions per second, in MiB.
    pub throughput_mib_per_sec: f64,
}

impl LatencyReport {
    /// Summarize round-trip samples in nanoseconds.
    pub fn from_samples(mut samples: Vec<u64>, payload_bytes: usize, elapsed: Duration) -> Self {
        samples.sort_unstable();
        let rounds = samples.len();
        let percentile = |p: f64| -> u64 {
            if rounds == 0 {
                return 0;
            }
            let index = ((rounds as f64 * p) as usize).min(rounds - 1);
            samples[index]
        };

        let secs = elapsed.as_secs_f64();
        let (round_trips_per_sec, throughput_mib_per_sec) = if secs > 0.0 {
            let bytes = (2 * payload_bytes * rounds) as f64;
            (rounds as f64 / secs, bytes / secs / (1024.0 * 1024.0))
        } else {
            (0.0, 0.0)
        };

        Self {
            rounds,
            payload_bytes,
            min_ns: samples.first().copied().unwrap_or(0),
            max_ns: samples.last().copied().unwrap_or(0),
            mean_ns: if rounds == 0 {
                0.0
            } else {
                samples.iter().sum::<u64>() as f64 / rounds as f64
            },
            median_ns: percentile(0.5),
            p95_ns: percentile(0.95),
            p99_ns: percentile(0.99),
            elapsed_ms: secs * 1000.0,
            round_trips_per_sec,
            throughput_mib_per_sec,
        }
    }

    fn print(&self) {
        println!("Round trips:   {}", self.rounds);
        println!("Payload:       {} bytes", self.payload_bytes);
        println!("Elapsed:       {:.2} ms", self.elapsed_ms);
        println!();
        println!("Latency (us):");
        println!("  min:    {:>10.2}", self.min_ns as f64 / 1000.0);
        println!("  mean:   {:>10.2}", self.mean_ns / 1000.0);
        println!("  median: {:>10.2}", self.median_ns as f64 / 1000.0);
        println!("  p95:    {:>10.2}", self.p95_ns as f64 / 1000.0);
        println!("  p99:    {:>10.2}", self.p99_ns as f64 / 1000.0);
        println!("  max:    {:>10.2}", self.max_ns as f64 / 1000.0);
        println!();
        println!("Rate:          {:.0} round trips/s", self.round_trips_per_sec);
        println!("Throughput:    {:.2} MiB/s", self.throughput_mib_per_sec);
    }
}

pub fn execute(
    config_path: &str,
    base: &str,
    role: Role,
    rounds: usize,
    payload_bytes: usize,
    size: Option<Capacity>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let fallback = Capacity::new(payload_bytes + FRAME_HEADER_SIZE)?;
    let a2b = resolve_or(config_path, &format!("{}_a2b", base), size, Some(fallback))?;
    let b2a = resolve_or(config_path, &format!("{}_b2a", base), size, Some(fallback))?;

    let ownership = match role {
        Role::Leader => Ownership::Owner,
        Role::Follower => Ownership::Attached,
    };
    let (send, recv) = match role {
        Role::Leader => (&a2b, &b2a),
        Role::Follower => (&b2a, &a2b),
    };

    let mut outbound = open(send, ChannelMode::Producer, ownership)?;
    let mut inbound = open(recv, ChannelMode::Consumer, ownership)?;

    tracing::info!(
        base = %base,
        role = ?role,
        rounds = rounds,
        payload_bytes = payload_bytes,
        "Starting ping-pong"
    );

    match role {
        Role::Leader => {
            let report = lead(&mut outbound, &mut inbound, rounds, payload_bytes)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                report.print();
            }
        }
        Role::Follower => {
            follow(&mut outbound, &mut inbound, rounds)?;
            tracing::info!(rounds = rounds, "Echoed every round");
        }
    }

    Ok(())
}

fn open(
    target: &Target,
    mode: ChannelMode,
    ownership: Ownership,
) -> ioshare_core::ShareResult<Channel<FrameCodec>> {
    Channel::with_codec(&target.name, target.capacity, mode, ownership, FrameCodec)
}

fn lead(
    outbound: &mut Channel,
    inbound: &mut Channel,
    rounds: usize,
    payload_bytes: usize,
) -> Result<LatencyReport, Box<dyn std::error::Error>> {
    let payload = vec![0x5Au8; payload_bytes];
    let mut samples = Vec::with_capacity(rounds);

    let started = Instant::now();
    for round in 0..rounds {
        let sent = Instant::now();
        outbound.produce(&payload)?;
        let echo = inbound.consume()?;
        samples.push(sent.elapsed().as_nanos() as u64);

        if echo.len() != payload.len() {
            return Err(format!(
                "round {}: echo has {} bytes, sent {}",
                round,
                echo.len(),
                payload.len()
            )
            .into());
        }
    }

    Ok(LatencyReport::from_samples(
        samples,
        payload_bytes,
        started.elapsed(),
    ))
}

fn follow(
    outbound: &mut Channel,
    inbound: &mut Channel,
    rounds: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    for _ in 0..rounds {
        let item = inbound.consume()?;
        outbound.produce(&item)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_statistics() {
        let samples: Vec<u64> = (1..=100).rev().map(|n| n * 1000).collect();
        let report = LatencyReport::from_samples(samples, 64, Duration::from_secs(1));
        assert_eq!(report.rounds, 100);
        assert_eq!(report.min_ns, 1000);
        assert_eq!(report.max_ns, 100_000);
        assert_eq!(report.median_ns, 51_000);
        assert_eq!(report.p99_ns, 100_000);
        assert!((report.mean_ns - 50_500.0).abs() < f64::EPSILON);
        assert!((report.round_trips_per_sec - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_report() {
        let report = LatencyReport::from_samples(Vec::new(), 64, Duration::ZERO);
        assert_eq!(report.rounds, 0);
        assert_eq!(report.p99_ns, 0);
        assert_eq!(report.round_trips_per_sec, 0.0);
    }

    #[test]
    fn test_duplex_in_one_process() {
        let base = format!("/ioshare-cli-pp-{}", std::process::id());
        let capacity = Capacity::new(256).unwrap();
        let channel = |suffix: &str, mode, ownership| {
            Channel::create_or_attach(&format!("{}{}", base, suffix), capacity, mode, ownership)
                .unwrap()
        };

        let mut leader_out = channel("_a2b", ChannelMode::Producer, Ownership::Owner);
        let mut leader_in = channel("_b2a", ChannelMode::Consumer, Ownership::Owner);
        let mut follower_in = channel("_a2b", ChannelMode::Consumer, Ownership::Attached);
        let mut follower_out = channel("_b2a", ChannelMode::Producer, Ownership::Attached);

        let follower = std::thread::spawn(move || follow(&mut follower_out, &mut follower_in, 5).is_ok());
        let report = lead(&mut leader_out, &mut leader_in, 5, 32).unwrap();

        assert!(follower.join().unwrap());
        assert_eq!(report.rounds, 5);
        assert_eq!(report.payload_bytes, 32);
    }
}
