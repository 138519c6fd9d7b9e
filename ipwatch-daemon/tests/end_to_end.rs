//! End-to-end scenario: frames in, history rows and events out

use ipwatch_core::{IpVersion, MacAddr, PacketTime};
use ipwatch_daemon::detector::{observe, MappingEvent};
use ipwatch_db::{HistoryStore, OpenMode, ReportFilter, VendorDirectory, VendorEntry};
use ipwatch_packet::decode_frame;

const MAC_A: [u8; 6] = [0xaa, 0xbb, 0xcc, 0x00, 0x11, 0x22];
const MAC_B: [u8; 6] = [0xdd, 0xee, 0xff, 0x00, 0x11, 0x22];

/// Build an Ethernet ARP reply claiming `sender_ip` for `source`
fn arp_reply(source: [u8; 6], sender_ip: [u8; 4]) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&[0xff; 6]); // destination
    frame.extend_from_slice(&source);
    frame.extend_from_slice(&[0x08, 0x06]); // ARP
    frame.extend_from_slice(&[0x00, 0x01, 0x08, 0x00, 6, 4, 0x00, 0x02]);
    frame.extend_from_slice(&source); // sender hw
    frame.extend_from_slice(&sender_ip);
    frame.extend_from_slice(&[0x00; 6]); // target hw
    frame.extend_from_slice(&[192, 0, 2, 1]); // target ip
    frame
}

fn process(
    store: &HistoryStore,
    frame: &[u8],
    sec: i64,
) -> Result<Option<MappingEvent>, String> {
    let captured_at = PacketTime::new(sec, 0);
    let obs = decode_frame(frame, captured_at, store).map_err(|e| e.to_string())?;
    observe(store, &obs).map_err(|e| e.to_string())
}

#[test]
fn test_mapping_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let lib_dir = dir.path();

    let mut vendor = VendorDirectory::open(lib_dir, OpenMode::ReadWrite).unwrap();
    vendor
        .rebuild(&[
            VendorEntry::from_assignment("AABBCC", "Acme").unwrap(),
            VendorEntry::from_assignment("DDEEFF", "Delta").unwrap(),
        ])
        .unwrap();

    let store = HistoryStore::open(lib_dir, "test0", OpenMode::ReadWrite).unwrap();
    store.attach_vendor(lib_dir).unwrap();

    // First sighting: new record, New event
    let event = process(&store, &arp_reply(MAC_A, [192, 0, 2, 10]), 1000).unwrap();
    match event {
        Some(MappingEvent::New { ref ip_addr, new_hw, .. }) => {
            assert_eq!(ip_addr, "192.0.2.10");
            assert_eq!(new_hw, MacAddr(MAC_A));
        }
        other => panic!("expected New event, got {:?}", other),
    }

    // Same pair shortly after: below the refresh threshold, no event,
    // no new row, no touch
    let event = process(&store, &arp_reply(MAC_A, [192, 0, 2, 10]), 2000).unwrap();
    assert!(event.is_none());
    let current = store
        .current_for(IpVersion::V4, "192.0.2.10", 2000)
        .unwrap()
        .unwrap();
    assert_eq!(current.age_minutes, (2000 - 1000) / 60);

    // Same pair after nine hours: one touch, still no new row
    let later = 1000 + 9 * 3600;
    let event = process(&store, &arp_reply(MAC_A, [192, 0, 2, 10]), later).unwrap();
    assert!(event.is_none());
    let current = store
        .current_for(IpVersion::V4, "192.0.2.10", later)
        .unwrap()
        .unwrap();
    assert_eq!(current.age_minutes, 0);
    let rows = store
        .report(
            &ReportFilter {
                all: true,
                ..Default::default()
            },
            later,
        )
        .unwrap();
    assert_eq!(rows.len(), 1);

    // A different hardware address takes over the IP: new row, Changed
    // event carrying the old address
    let event = process(&store, &arp_reply(MAC_B, [192, 0, 2, 10]), 40000).unwrap();
    match event {
        Some(MappingEvent::Changed {
            ref ip_addr,
            new_hw,
            old_hw,
            ..
        }) => {
            assert_eq!(ip_addr, "192.0.2.10");
            assert_eq!(new_hw, MacAddr(MAC_B));
            assert_eq!(old_hw, MacAddr(MAC_A));
        }
        other => panic!("expected Changed event, got {:?}", other),
    }

    let rows = store
        .report(
            &ReportFilter {
                all: true,
                ..Default::default()
            },
            40000,
        )
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].organization, "Acme");
    assert_eq!(rows[1].organization, "Delta");

    // The current view shows only the takeover
    let current_rows = store.report(&ReportFilter::default(), 40000).unwrap();
    assert_eq!(current_rows.len(), 1);
    assert_eq!(current_rows[0].hw_addr, "dd:ee:ff:00:11:22");
}

#[test]
fn test_truncated_frame_leaves_store_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let lib_dir = dir.path();

    let mut vendor = VendorDirectory::open(lib_dir, OpenMode::ReadWrite).unwrap();
    vendor.rebuild(&[]).unwrap();

    let store = HistoryStore::open(lib_dir, "test0", OpenMode::ReadWrite).unwrap();
    store.attach_vendor(lib_dir).unwrap();

    let full = arp_reply(MAC_A, [192, 0, 2, 10]);
    let truncated = &full[..20];
    assert!(process(&store, truncated, 1000).is_err());

    let rows = store
        .report(
            &ReportFilter {
                all: true,
                ..Default::default()
            },
            1000,
        )
        .unwrap();
    assert!(rows.is_empty());
}

#[test]
fn test_retention_sweep_forgets_idle_addresses() {
    let dir = tempfile::tempdir().unwrap();
    let lib_dir = dir.path();

    let mut vendor = VendorDirectory::open(lib_dir, OpenMode::ReadWrite).unwrap();
    vendor.rebuild(&[]).unwrap();

    let store = HistoryStore::open(lib_dir, "test0", OpenMode::ReadWrite).unwrap();
    store.attach_vendor(lib_dir).unwrap();

    process(&store, &arp_reply(MAC_A, [192, 0, 2, 10]), 1000).unwrap();
    process(&store, &arp_reply(MAC_B, [192, 0, 2, 20]), 500_000).unwrap();

    // Sweep with a cutoff past the first record's last-seen time
    store.delete_older_than(250_000).unwrap();

    assert!(store
        .current_for(IpVersion::V4, "192.0.2.10", 500_000)
        .unwrap()
        .is_none());
    assert!(store
        .current_for(IpVersion::V4, "192.0.2.20", 500_000)
        .unwrap()
        .is_some());
}
