use super::*;
use crate::error::CaptureError;

#[test]
fn test_packet_header_fields() {
    let mut pkt = TsPacket::with_pid(0x1abc);
    assert!(pkt.sync_ok());
    assert_eq!(pkt.pid(), 0x1abc);

    pkt.set_continuity_counter(0x1f);
    assert_eq!(pkt.continuity_counter(), 0x0f);
    // PID bits survive the counter update
    assert_eq!(pkt.pid(), 0x1abc);

    pkt.set_pid(PID_NULL);
    assert_eq!(pkt.pid(), 0x1fff);
}

#[test]
fn test_packet_from_slice() {
    let mut data = vec![0u8; TS_PACKET_SIZE];
    data[0] = SYNC_BYTE;
    data[1] = 0x41; // PUSI + PID high bits
    data[2] = 0x00;
    let pkt = TsPacket::from_slice(&data).unwrap();
    assert_eq!(pkt.pid(), 0x100);

    assert!(matches!(
        TsPacket::from_slice(&data[..TS_PACKET_SIZE - 1]),
        Err(CaptureError::TruncatedPacket(187))
    ));
}

#[test]
fn test_sync_check() {
    let pkt = TsPacket::new();
    assert!(!pkt.sync_ok());
    assert!(matches!(pkt.check_sync(), Err(CaptureError::Sync(0))));
    assert!(TsPacket::with_pid(PID_PAT).check_sync().is_ok());
}
