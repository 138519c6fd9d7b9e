//! Change detection
//!
//! Decides whether an observation is a new mapping, a refresh of an
//! unchanged one, or a change of hardware address. Stable mappings cost at
//! most one write per refresh interval; genuine changes are recorded
//! immediately.

use ipwatch_core::{config, IpVersion, MacAddr, Observation, Result};
use ipwatch_db::HistoryStore;

/// A mapping event worth notifying about
///
/// Unchanged observations produce no event, whether or not they refresh the
/// record's last-seen time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingEvent {
    /// First sighting of this IP address
    New {
        ip_version: IpVersion,
        ip_addr: String,
        new_hw: MacAddr,
    },
    /// The IP address moved to a different hardware address
    Changed {
        ip_version: IpVersion,
        ip_addr: String,
        new_hw: MacAddr,
        old_hw: MacAddr,
    },
}

impl MappingEvent {
    /// The affected IP address
    pub fn ip_addr(&self) -> &str {
        match self {
            MappingEvent::New { ip_addr, .. } | MappingEvent::Changed { ip_addr, .. } => ip_addr,
        }
    }

    /// The newly observed hardware address
    pub fn new_hw(&self) -> MacAddr {
        match self {
            MappingEvent::New { new_hw, .. } | MappingEvent::Changed { new_hw, .. } => *new_hw,
        }
    }

    /// The previous hardware address, if there was one
    pub fn old_hw(&self) -> Option<MacAddr> {
        match self {
            MappingEvent::New { .. } => None,
            MappingEvent::Changed { old_hw, .. } => Some(*old_hw),
        }
    }
}

/// Apply an observation to the history store
///
/// Ages are evaluated against the observation timestamp, so replayed or
/// delayed traffic behaves the same as live capture.
pub fn observe(store: &HistoryStore, obs: &Observation) -> Result<Option<MappingEvent>> {
    let current = store.current_for(obs.ip_version, &obs.ip_addr, obs.captured_at.sec)?;

    let current = match current {
        None => {
            store.insert(obs)?;
            return Ok(Some(MappingEvent::New {
                ip_version: obs.ip_version,
                ip_addr: obs.ip_addr.clone(),
                new_hw: obs.hw_addr,
            }));
        }
        Some(current) => current,
    };

    if current.hw_addr == obs.hw_addr {
        // Unchanged; refresh the last-seen time once the record is stale
        if current.age_minutes >= config::REFRESH_THRESHOLD_MINUTES {
            store.touch(current.rowid, obs.captured_at.sec)?;
        }
        return Ok(None);
    }

    store.insert(obs)?;
    Ok(Some(MappingEvent::Changed {
        ip_version: obs.ip_version,
        ip_addr: obs.ip_addr.clone(),
        new_hw: obs.hw_addr,
        old_hw: current.hw_addr,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipwatch_core::PacketTime;

    fn obs(ip_addr: &str, hw: &str, sec: i64) -> Observation {
        Observation {
            ip_version: IpVersion::V4,
            ip_addr: ip_addr.to_string(),
            hw_addr: hw.parse().unwrap(),
            captured_at: PacketTime::new(sec, 0),
        }
    }

    #[test]
    fn test_first_sighting_is_new() {
        let store = HistoryStore::in_memory().unwrap();
        let event = observe(&store, &obs("192.0.2.10", "aa:bb:cc:00:11:22", 1000)).unwrap();
        assert_eq!(
            event,
            Some(MappingEvent::New {
                ip_version: IpVersion::V4,
                ip_addr: "192.0.2.10".to_string(),
                new_hw: "aa:bb:cc:00:11:22".parse().unwrap(),
            })
        );
        assert_eq!(event.unwrap().old_hw(), None);
    }

    #[test]
    fn test_fresh_repeat_is_a_noop() {
        let store = HistoryStore::in_memory().unwrap();
        observe(&store, &obs("192.0.2.10", "aa:bb:cc:00:11:22", 1000)).unwrap();
        let event = observe(&store, &obs("192.0.2.10", "aa:bb:cc:00:11:22", 2000)).unwrap();
        assert_eq!(event, None);

        // No touch either: the last-seen time is still the insert time
        let current = store
            .current_for(IpVersion::V4, "192.0.2.10", 2000)
            .unwrap()
            .unwrap();
        assert_eq!(current.age_minutes, (2000 - 1000) / 60);
    }

    #[test]
    fn test_stale_repeat_touches() {
        let store = HistoryStore::in_memory().unwrap();
        observe(&store, &obs("192.0.2.10", "aa:bb:cc:00:11:22", 1000)).unwrap();

        let later = 1000 + 9 * 3600;
        let event = observe(&store, &obs("192.0.2.10", "aa:bb:cc:00:11:22", later)).unwrap();
        assert_eq!(event, None);

        // One touch, no new row
        let current = store
            .current_for(IpVersion::V4, "192.0.2.10", later)
            .unwrap()
            .unwrap();
        assert_eq!(current.age_minutes, 0);
    }

    #[test]
    fn test_changed_hw_fires_event() {
        let store = HistoryStore::in_memory().unwrap();
        observe(&store, &obs("192.0.2.10", "aa:bb:cc:00:11:22", 1000)).unwrap();
        let event = observe(&store, &obs("192.0.2.10", "dd:ee:ff:00:11:22", 40000)).unwrap();
        assert_eq!(
            event,
            Some(MappingEvent::Changed {
                ip_version: IpVersion::V4,
                ip_addr: "192.0.2.10".to_string(),
                new_hw: "dd:ee:ff:00:11:22".parse().unwrap(),
                old_hw: "aa:bb:cc:00:11:22".parse().unwrap(),
            })
        );

        // The new address is now current
        let current = store
            .current_for(IpVersion::V4, "192.0.2.10", 40000)
            .unwrap()
            .unwrap();
        assert_eq!(current.hw_addr.to_string(), "dd:ee:ff:00:11:22");
    }

    #[test]
    fn test_versions_do_not_collide() {
        let store = HistoryStore::in_memory().unwrap();
        observe(&store, &obs("192.0.2.10", "aa:bb:cc:00:11:22", 1000)).unwrap();

        let v6 = Observation {
            ip_version: IpVersion::V6,
            ip_addr: "192.0.2.10".to_string(),
            hw_addr: "aa:bb:cc:00:11:22".parse().unwrap(),
            captured_at: PacketTime::new(1000, 0),
        };
        let event = observe(&store, &v6).unwrap();
        assert!(matches!(event, Some(MappingEvent::New { .. })));
    }
}
