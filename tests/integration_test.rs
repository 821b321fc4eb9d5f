use std::process::Command;
use std::time::Duration;

use dvbdd::format::tests::{CollectingSink, SyntheticSource};
use dvbdd::format::ts::{PidSet, TsPacket, TS_PACKET_SIZE};
use dvbdd::format::{PacketWriter, UdpPacketReader, UdpPacketWriter};
use dvbdd::pipeline::{CaptureSummary, CapturePipeline, StopReason};
use dvbdd::sink::SinkSpec;
use pretty_assertions::assert_eq;
use tokio::net::UdpSocket;
use tokio::time::timeout;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_finite_source_runs_to_end_of_stream() {
    let mut pipeline = CapturePipeline::new(SyntheticSource::finite(256, 10), CollectingSink::new(), 0u64);
    let summary = pipeline.run().await.unwrap();
    assert_eq!(
        summary,
        CaptureSummary {
            packets: 10,
            stop: StopReason::EndOfStream,
        }
    );

    let (source, sink) = pipeline.into_parts();
    assert_eq!(source.produced, 10);
    assert_eq!(sink.packets.len(), 10);
    assert!(sink.packets.iter().all(|p| p.pid() == 256));
}

#[tokio::test]
async fn test_count_limits_endless_source() {
    let mut pipeline = CapturePipeline::new(SyntheticSource::endless(0x100), CollectingSink::new(), 5u64);
    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.stop, StopReason::CountReached);
    assert_eq!(summary.packets, 5);

    let (source, sink) = pipeline.into_parts();
    assert_eq!(source.produced, 5);
    assert_eq!(sink.packets.len(), 5);
    assert!(sink.finished);
}

#[test]
fn test_missing_pids_prints_usage() {
    let output = Command::new(env!("CARGO_BIN_EXE_dvbdd"))
        .args(["-src", "udp", "-laddr", "127.0.0.1:0"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "stderr: {}", stderr);
    assert!(stderr.contains("PID"), "stderr: {}", stderr);
}

#[test]
fn test_out_of_range_pid_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_dvbdd"))
        .args(["-src", "udp", "-laddr", "127.0.0.1:0", "0", "8193"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("8193"), "stderr: {}", stderr);
}

/// Sender -> filtering UDP source -> pipeline -> UDP sink -> receiver.
#[test]
fn test_udp_loopback_forwarding() {
    tokio_test::block_on(async {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port().to_string();
        let sink = UdpPacketWriter::connect("", &port).await.unwrap();

        let source = UdpPacketReader::listen("127.0.0.1:0", PidSet::parse(["17", "0x100"]).unwrap())
            .await
            .unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.connect(source.local_addr().unwrap()).await.unwrap();

        // seven packets on the wire, four of them on wanted PIDs
        let pids = [17u16, 18, 0x100, 0, 17, 8191, 0x100];
        let datagram: Vec<u8> = pids
            .iter()
            .flat_map(|&pid| TsPacket::with_pid(pid).as_bytes().to_vec())
            .collect();
        sender.send(&datagram).await.unwrap();

        let mut pipeline = CapturePipeline::new(source, sink, 4u64);
        let summary = timeout(TEST_TIMEOUT, pipeline.run()).await.unwrap().unwrap();
        assert_eq!(summary.stop, StopReason::CountReached);

        let mut received = Vec::new();
        let mut buf = [0u8; 2048];
        for _ in 0..4 {
            let n = timeout(TEST_TIMEOUT, receiver.recv(&mut buf)).await.unwrap().unwrap();
            assert_eq!(n, TS_PACKET_SIZE);
            received.push(TsPacket::from_slice(&buf[..n]).unwrap().pid());
        }
        assert_eq!(received, vec![17, 0x100, 17, 0x100]);
    });
}

#[tokio::test]
async fn test_file_sink_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.ts");

    let sink = SinkSpec::parse(path.to_str().unwrap()).open().await.unwrap();
    let mut pipeline = CapturePipeline::new(SyntheticSource::finite(0x1fff, 20), sink, 0u64);
    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.packets, 20);

    let data = std::fs::read(&path).unwrap();
    assert_eq!(data.len(), 20 * TS_PACKET_SIZE);
    for (i, chunk) in data.chunks(TS_PACKET_SIZE).enumerate() {
        let pkt = TsPacket::from_slice(chunk).unwrap();
        assert_eq!(pkt.pid(), 0x1fff);
        assert_eq!(pkt.continuity_counter() as usize, i % 16);
    }

    // a second run truncates the previous capture
    let mut sink = SinkSpec::parse(path.to_str().unwrap()).open().await.unwrap();
    sink.finish().await.unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
}
