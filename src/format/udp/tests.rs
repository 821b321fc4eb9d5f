use super::*;
use pretty_assertions::assert_eq;

fn datagram(pids: &[u16]) -> Vec<u8> {
    pids.iter()
        .flat_map(|&pid| TsPacket::with_pid(pid).as_bytes().to_vec())
        .collect()
}

async fn loopback_pair(pids: &[&str]) -> (UdpPacketReader, UdpSocket) {
    let reader = UdpPacketReader::listen("127.0.0.1:0", PidSet::parse(pids).unwrap())
        .await
        .unwrap();
    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender.connect(reader.local_addr().unwrap()).await.unwrap();
    (reader, sender)
}

#[test]
fn test_mcast_addr_parse() {
    let addr = McastAddr::parse("239.1.2.3:5000@eth0").unwrap();
    assert_eq!(addr.group, Ipv4Addr::new(239, 1, 2, 3));
    assert_eq!(addr.port, 5000);
    assert_eq!(addr.interface, McastInterface::Name("eth0".into()));

    let addr = McastAddr::parse("239.1.2.3:5000@192.168.1.10").unwrap();
    assert_eq!(addr.interface, McastInterface::Addr(Ipv4Addr::new(192, 168, 1, 10)));

    let addr = McastAddr::parse("239.1.2.3:5000").unwrap();
    assert_eq!(addr.interface, McastInterface::Any);
    assert_eq!(McastAddr::parse("239.1.2.3:5000@").unwrap().interface, McastInterface::Any);
}

#[test]
fn test_mcast_addr_rejects() {
    assert!(McastAddr::parse("0.0.0.0:1234").is_err());
    assert!(McastAddr::parse("239.1.2.3").is_err());
    assert!(McastAddr::parse("239.1.2.3:port@eth0").is_err());
    assert!(McastAddr::parse("group:1234@eth0").is_err());
}

#[test]
fn test_rtp_payload_offset() {
    let ts = datagram(&[1, 2, 3]);
    assert_eq!(rtp_payload_offset(&ts), None);

    let mut rtp = vec![0x80, 0x21, 0x00, 0x01, 0, 0, 0, 0, 0x12, 0x34, 0x56, 0x78];
    rtp.extend_from_slice(&ts);
    assert_eq!(rtp_payload_offset(&rtp), Some(RTP_HEADER_SIZE));

    // one CSRC plus a one-word extension
    let mut rtp = vec![0x91, 0x21, 0x00, 0x01, 0, 0, 0, 0, 0x12, 0x34, 0x56, 0x78];
    rtp.extend_from_slice(&[0, 0, 0, 1]);
    rtp.extend_from_slice(&[0xbe, 0xde, 0x00, 0x01, 0, 0, 0, 0]);
    rtp.extend_from_slice(&ts);
    assert_eq!(rtp_payload_offset(&rtp), Some(24));

    assert_eq!(rtp_payload_offset(&[0x80; 100]), None);
}

#[tokio::test]
async fn test_reader_filters_pids() {
    let (mut reader, sender) = loopback_pair(&["17", "256"]).await;
    sender.send(&datagram(&[0, 17, 100, 256, 17])).await.unwrap();

    let mut pkt = TsPacket::new();
    let mut seen = Vec::new();
    for _ in 0..3 {
        assert_eq!(reader.read_packet(&mut pkt).await.unwrap(), ReadStatus::Packet);
        seen.push(pkt.pid());
    }
    assert_eq!(seen, vec![17, 256, 17]);
}

#[tokio::test]
async fn test_reader_whole_stream_and_rtp() {
    let (mut reader, sender) = loopback_pair(&["8192"]).await;
    let mut rtp = vec![0x80, 0x21, 0x00, 0x01, 0, 0, 0, 0, 0x12, 0x34, 0x56, 0x78];
    rtp.extend_from_slice(&datagram(&[0, 0x1fff]));
    sender.send(&rtp).await.unwrap();

    let mut pkt = TsPacket::new();
    reader.read_packet(&mut pkt).await.unwrap();
    assert_eq!(pkt.pid(), 0);
    reader.read_packet(&mut pkt).await.unwrap();
    assert_eq!(pkt.pid(), 0x1fff);
}

#[tokio::test]
async fn test_reader_lost_sync() {
    let (mut reader, sender) = loopback_pair(&["8192"]).await;
    sender.send(&[0u8; TS_PACKET_SIZE]).await.unwrap();

    let mut pkt = TsPacket::new();
    assert!(matches!(
        reader.read_packet(&mut pkt).await,
        Err(CaptureError::Sync(0))
    ));
}

#[tokio::test]
async fn test_reader_partial_datagram() {
    let (mut reader, sender) = loopback_pair(&["8192"]).await;
    sender.send(&datagram(&[1])[..100]).await.unwrap();

    let mut pkt = TsPacket::new();
    assert!(matches!(
        reader.read_packet(&mut pkt).await,
        Err(CaptureError::TruncatedPacket(100))
    ));
}

#[tokio::test]
async fn test_writer_one_datagram_per_packet() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = receiver.local_addr().unwrap().port().to_string();
    let mut writer = UdpPacketWriter::connect("127.0.0.1", &port).await.unwrap();

    writer.write_packet(&TsPacket::with_pid(33)).await.unwrap();
    writer.write_packet(&TsPacket::with_pid(34)).await.unwrap();

    let mut buf = [0u8; 2048];
    for pid in [33, 34] {
        let n = receiver.recv(&mut buf).await.unwrap();
        assert_eq!(n, TS_PACKET_SIZE);
        assert_eq!(TsPacket::from_slice(&buf[..n]).unwrap().pid(), pid);
    }
}

#[tokio::test]
async fn test_writer_empty_host_is_local() {
    let writer = UdpPacketWriter::connect("", "5004").await.unwrap();
    assert_eq!(writer.target(), "127.0.0.1:5004".parse::<SocketAddr>().unwrap());
    assert!(UdpPacketWriter::connect("", "http").await.is_err());
}
