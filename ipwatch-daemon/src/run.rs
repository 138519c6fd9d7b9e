//! The capture loop
//!
//! Single-threaded and cooperative: one frame is pulled and processed to
//! completion before the next. The bounded poll timeout keeps the shutdown
//! flag responsive, and frame timestamps drive the retention sweep so
//! replayed traffic ages the store consistently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use ipwatch_capture::{capture_filter, CaptureConfig, CaptureSession};
use ipwatch_core::{config, Result, WatchConfig};
use ipwatch_db::{HistoryStore, OpenMode};
use ipwatch_packet::decode_frame;

use crate::detector;
use crate::notify::NotificationDispatcher;

/// Run the capture loop until shutdown
///
/// Fatal errors (capture open, store open, vendor attach) surface before
/// the first frame; after that only capture failures end the loop. Store
/// write failures and malformed frames are logged and skipped.
pub fn run(watch: &WatchConfig, shutdown: Arc<AtomicBool>) -> Result<()> {
    let filter = capture_filter(watch.user_filter.as_deref())?;

    let mut session = CaptureSession::open(
        &watch.ifname,
        &CaptureConfig {
            snaplen: watch.snaplen,
            promiscuous: watch.promiscuous,
            ..Default::default()
        },
    )?;
    session.set_filter(&filter)?;

    let store = HistoryStore::open(&watch.lib_dir, &watch.ifname, OpenMode::ReadWrite)?;
    store.attach_vendor(&watch.lib_dir)?;

    let dispatcher = NotificationDispatcher::new(watch)?;
    spawn_signal_watcher(&dispatcher, Arc::clone(&shutdown));

    info!("watching {}", watch.ifname);

    // Zero so the first frame triggers an initial sweep
    let mut next_maintenance: i64 = 0;

    while !shutdown.load(Ordering::Relaxed) {
        let frame = match session.next_frame()? {
            Some(frame) => frame,
            None => continue,
        };

        match decode_frame(&frame.data, frame.captured_at, &store) {
            Ok(obs) => match detector::observe(&store, &obs) {
                Ok(Some(event)) => dispatcher.dispatch(&store, &event, frame.captured_at),
                Ok(None) => {}
                Err(e) => warn!("{}", e),
            },
            Err(e) => warn!("{}", e),
        }

        // Time for store maintenance?
        if frame.captured_at.sec >= next_maintenance {
            let cutoff = frame.captured_at.sec - watch.retention_secs();
            match store.delete_older_than(cutoff) {
                Ok(deleted) => debug!("retention sweep removed {} records", deleted),
                Err(e) => warn!("{}", e),
            }
            store.maintenance();
            next_maintenance = frame.captured_at.sec + config::MAINTENANCE_INTERVAL;
        }
    }

    info!("capture loop stopped");
    Ok(())
}

/// Set the shutdown flag on SIGINT or SIGTERM
///
/// The watcher lives on the dispatcher's runtime; the capture loop observes
/// the flag at the top of each pull.
fn spawn_signal_watcher(dispatcher: &NotificationDispatcher, shutdown: Arc<AtomicBool>) {
    dispatcher.runtime_handle().spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                let _ = ctrl_c.await;
            }
        }
        info!("exiting on signal");
        shutdown.store(true, Ordering::Relaxed);
    });
}
