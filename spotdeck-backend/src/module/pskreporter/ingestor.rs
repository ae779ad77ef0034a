//! PSKReporter streaming ingestor
//!
//! One actor task owns the report sets. Transport events, the aging sweep
//! and consumer commands all go through its loop, and every change is
//! published as an owned [`PskView`] on a watch channel.

use std::sync::Arc;
use std::time::Duration;

use spotdeck_common::{CallsignGeography, ConnectionStatus, FilterConfig, PskView, apply_filter};
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::message::decode_message;
use super::store::ReportStore;
use super::transport::{SessionInfo, TelemetryTransport, TransportEvent};
use crate::config::{PLACEHOLDER_CALLSIGN, PskReporterConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::utils::{Clock, system_clock};

#[derive(Debug, Clone)]
pub struct IngestorSettings {
    pub enabled: bool,
    pub callsign: String,
    pub topic_prefix: String,
    pub window_minutes: u64,
    pub capacity: usize,
    pub sweep_interval: Duration,
}

impl IngestorSettings {
    pub fn from_config(config: &PskReporterConfig) -> Self {
        Self {
            enabled: config.enable,
            callsign: config.callsign.clone(),
            topic_prefix: config.topic_prefix.clone(),
            window_minutes: config.window_minutes,
            capacity: config.max_reports,
            sweep_interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
        }
    }
}

/// Trim and uppercase a callsign. Empty and placeholder calls are rejected.
pub fn normalize_operator(callsign: &str) -> PipelineResult<String> {
    let call = callsign.trim().to_ascii_uppercase();
    if call.is_empty() {
        return Err(PipelineError::Configuration("no operator callsign configured".to_string()));
    }
    if call == PLACEHOLDER_CALLSIGN {
        return Err(PipelineError::Configuration(format!(
            "operator callsign is the placeholder {}",
            PLACEHOLDER_CALLSIGN
        )));
    }
    Ok(call)
}

enum Command {
    Configure { callsign: String, enabled: bool },
    SetWindow(u64),
    SetFilter(FilterConfig),
    Refresh,
    Shutdown(oneshot::Sender<()>),
}

/// Handle to the ingestor actor. Cheap to share behind an `Arc`.
pub struct PskReporterIngestor {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<PskView>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PskReporterIngestor {
    pub fn spawn(
        settings: IngestorSettings,
        transport: Arc<dyn TelemetryTransport>,
        geography: Arc<dyn CallsignGeography>,
        filter: FilterConfig,
    ) -> Self {
        Self::spawn_with_clock(settings, transport, geography, filter, system_clock)
    }

    pub fn spawn_with_clock(
        settings: IngestorSettings,
        transport: Arc<dyn TelemetryTransport>,
        geography: Arc<dyn CallsignGeography>,
        filter: FilterConfig,
        clock: Clock,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (view_tx, view_rx) = watch::channel(PskView::disabled());

        let mut actor = Actor {
            transport,
            geography,
            topic_prefix: settings.topic_prefix.clone(),
            store: ReportStore::new(settings.window_minutes, settings.capacity),
            filter,
            operator: None,
            session: None,
            status: ConnectionStatus::Disabled,
            loading: false,
            error: None,
            last_update: None,
            view: view_tx,
            clock,
        };
        actor.begin(resolve_operator(&settings.callsign, settings.enabled));
        actor.publish();

        let task = tokio::spawn(actor.run(command_rx, settings.sweep_interval));

        Self {
            commands: command_tx,
            view: view_rx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Latest published view
    pub fn snapshot(&self) -> PskView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PskView> {
        self.view.clone()
    }

    /// Switch operator or enablement. Anything that changes the effective
    /// operator tears the session down and starts over with empty sets.
    pub async fn configure(&self, callsign: &str, enabled: bool) -> PipelineResult<()> {
        self.send(Command::Configure {
            callsign: callsign.to_string(),
            enabled,
        })
        .await
    }

    pub async fn set_window(&self, window_minutes: u64) -> PipelineResult<()> {
        self.send(Command::SetWindow(window_minutes)).await
    }

    pub async fn set_filter(&self, filter: FilterConfig) -> PipelineResult<()> {
        self.send(Command::SetFilter(filter)).await
    }

    /// Force a reconnect, keeping the report sets.
    pub async fn refresh(&self) -> PipelineResult<()> {
        self.send(Command::Refresh).await
    }

    /// Close the session and stop the actor. Idempotent.
    pub async fn shutdown(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
        if let Some(task) = self.task.lock().await.take() {
            let _ = task.await;
        }
    }

    async fn send(&self, command: Command) -> PipelineResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PipelineError::Configuration("telemetry ingestor is shut down".to_string()))
    }
}

fn resolve_operator(callsign: &str, enabled: bool) -> Option<String> {
    if !enabled {
        tracing::info!("PSKReporter ingestion disabled");
        return None;
    }
    match normalize_operator(callsign) {
        Ok(call) => Some(call),
        Err(e) => {
            tracing::info!("PSKReporter ingestion disabled: {}", e);
            None
        }
    }
}

struct Session {
    operator: String,
    events: mpsc::Receiver<TransportEvent>,
    task: JoinHandle<()>,
}

struct Actor {
    transport: Arc<dyn TelemetryTransport>,
    geography: Arc<dyn CallsignGeography>,
    topic_prefix: String,
    store: ReportStore,
    filter: FilterConfig,
    operator: Option<String>,
    session: Option<Session>,
    status: ConnectionStatus,
    loading: bool,
    error: Option<String>,
    last_update: Option<chrono::DateTime<chrono::Utc>>,
    view: watch::Sender<PskView>,
    clock: Clock,
}

/// Next event from the live session; pending forever without one.
/// `None` means the transport task went away.
async fn next_event(session: &mut Option<Session>) -> Option<TransportEvent> {
    match session {
        Some(session) => session.events.recv().await,
        None => std::future::pending().await,
    }
}

impl Actor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>, sweep_interval: Duration) {
        let mut sweep = tokio::time::interval_at(tokio::time::Instant::now() + sweep_interval, sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown(ack)) => {
                        self.teardown().await;
                        let _ = ack.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.teardown().await;
                        break;
                    }
                },
                event = next_event(&mut self.session) => self.handle_event(event),
                _ = sweep.tick() => self.sweep(),
            }
        }
        tracing::info!("PSKReporter ingestor stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Configure { callsign, enabled } => {
                let operator = resolve_operator(&callsign, enabled);
                if operator == self.operator {
                    return;
                }
                self.teardown().await;
                self.begin(operator);
            }
            Command::SetWindow(minutes) => {
                let dropped = self.store.set_window(minutes, self.now_ms());
                tracing::info!("PSKReporter window set to {} min ({} reports dropped)", minutes, dropped);
            }
            Command::SetFilter(filter) => self.filter = filter,
            Command::Refresh => {
                let Some(operator) = self.operator.clone() else {
                    return;
                };
                tracing::info!("Manual PSKReporter reconnect for {}", operator);
                self.teardown().await;
                self.error = None;
                self.status = ConnectionStatus::Reconnecting;
                self.start_session(&operator);
            }
            Command::Shutdown(_) => {}
        }
        self.publish();
    }

    /// Reset to `operator` with empty sets, connecting if there is one.
    fn begin(&mut self, operator: Option<String>) {
        self.store.clear();
        self.error = None;
        self.last_update = None;
        self.operator = operator.clone();

        match operator {
            Some(call) => {
                self.status = ConnectionStatus::Connecting;
                self.loading = true;
                self.start_session(&call);
            }
            None => {
                self.status = ConnectionStatus::Disabled;
                self.loading = false;
            }
        }
    }

    fn start_session(&mut self, operator: &str) {
        let info = SessionInfo::new(operator, &self.topic_prefix);
        let (events_tx, events_rx) = mpsc::channel(256);
        let transport = self.transport.clone();
        let task = tokio::spawn(async move { transport.run(info, events_tx).await });

        self.session = Some(Session {
            operator: operator.to_string(),
            events: events_rx,
            task,
        });
    }

    /// Closing the receiver first means nothing from the old session can
    /// reach the sets, even if the task ignores the abort for a while.
    async fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.events.close();
            session.task.abort();
            let _ = session.task.await;
            tracing::debug!("PSKReporter session for {} torn down", session.operator);
        }
    }

    fn handle_event(&mut self, event: Option<TransportEvent>) {
        match event {
            Some(TransportEvent::Connected) => {
                self.status = ConnectionStatus::Connected;
                self.loading = false;
                self.error = None;
            }
            Some(TransportEvent::Message { topic, payload }) => {
                let Some(operator) = self.operator.clone() else {
                    return;
                };
                let msg = match decode_message(&payload) {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::debug!("Dropping message on {}: {}", topic, e);
                        return;
                    }
                };
                let now = (self.clock)();
                if !self.store.ingest(&msg, &operator, now.timestamp_millis()).any() {
                    return;
                }
                self.last_update = Some(now);
            }
            Some(TransportEvent::Offline(reason)) => {
                tracing::warn!("PSKReporter offline: {}", reason);
                self.status = ConnectionStatus::Offline;
                self.loading = false;
                self.error = Some(reason);
            }
            Some(TransportEvent::Reconnecting) => {
                self.status = ConnectionStatus::Reconnecting;
            }
            None => {
                // transport gave up on its own; the next sweep starts a new session
                tracing::warn!("PSKReporter session ended unexpectedly");
                self.session = None;
                self.status = ConnectionStatus::Offline;
                self.loading = false;
                self.error = Some("telemetry session ended".to_string());
            }
        }
        self.publish();
    }

    fn sweep(&mut self) {
        let dropped = self.store.sweep(self.now_ms());
        if dropped > 0 {
            tracing::debug!("PSKReporter sweep dropped {} reports", dropped);
        }

        if self.session.is_none() {
            if let Some(operator) = self.operator.clone() {
                self.status = ConnectionStatus::Reconnecting;
                self.start_session(&operator);
            }
        }
        self.publish();
    }

    fn now_ms(&self) -> i64 {
        (self.clock)().timestamp_millis()
    }

    fn publish(&self) {
        let geography = self.geography.as_ref();
        let heard_by_others = apply_filter(self.store.heard_by_others(), &self.filter, geography);
        let heard_by_me = apply_filter(self.store.heard_by_me(), &self.filter, geography);

        self.view.send_replace(PskView {
            operator: self.operator.clone(),
            heard_by_others_count: heard_by_others.len(),
            heard_by_me_count: heard_by_me.len(),
            heard_by_others,
            heard_by_me,
            loading: self.loading,
            error: self.error.clone(),
            status: self.status,
            last_update: self.last_update,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use spotdeck_common::{Band, NoGeography};
    use std::sync::atomic::{AtomicI64, Ordering};

    const NOW_MS: i64 = 1_700_000_060_000;

    fn fixed_clock() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(NOW_MS).unwrap()
    }

    /// Records sessions and hands their event senders to the test
    #[derive(Default)]
    struct MockTransport {
        sessions: std::sync::Mutex<Vec<(SessionInfo, mpsc::Sender<TransportEvent>)>>,
    }

    impl MockTransport {
        fn count(&self) -> usize {
            self.sessions.lock().unwrap().len()
        }

        fn latest(&self) -> (SessionInfo, mpsc::Sender<TransportEvent>) {
            self.sessions.lock().unwrap().last().cloned().unwrap()
        }

        async fn wait_for_sessions(&self, n: usize) {
            tokio::time::timeout(Duration::from_secs(2), async {
                while self.count() < n {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .unwrap();
        }
    }

    #[async_trait]
    impl TelemetryTransport for MockTransport {
        async fn run(&self, session: SessionInfo, events: mpsc::Sender<TransportEvent>) {
            self.sessions.lock().unwrap().push((session, events.clone()));
            events.closed().await;
        }
    }

    fn settings(callsign: &str) -> IngestorSettings {
        IngestorSettings {
            enabled: true,
            callsign: callsign.to_string(),
            topic_prefix: "pskr/filter/v2".to_string(),
            window_minutes: 15,
            capacity: 100,
            sweep_interval: Duration::from_secs(3600),
        }
    }

    fn spawn(transport: Arc<MockTransport>, settings: IngestorSettings, clock: Clock) -> PskReporterIngestor {
        PskReporterIngestor::spawn_with_clock(settings, transport, Arc::new(NoGeography), FilterConfig::default(), clock)
    }

    fn payload(sender: &str, receiver: &str, freq: u64, t: i64) -> TransportEvent {
        TransportEvent::Message {
            topic: format!("pskr/filter/v2/14/FT8/{}/{}", sender, receiver),
            payload: format!(
                r#"{{"sa":"{}","sl":"FN42aa","ra":"{}","rl":"FN31pr","f":{},"md":"FT8","rp":-5,"t":{}}}"#,
                sender, receiver, freq, t
            )
            .into_bytes(),
        }
    }

    async fn wait_view(ingestor: &PskReporterIngestor, predicate: impl FnMut(&PskView) -> bool) -> PskView {
        let mut rx = ingestor.subscribe();
        let view = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
            .await
            .unwrap()
            .unwrap()
            .clone();
        view
    }

    #[test]
    fn test_normalize_operator() {
        assert_eq!(normalize_operator(" k1abc ").unwrap(), "K1ABC");
        assert!(matches!(normalize_operator(""), Err(PipelineError::Configuration(_))));
        assert!(matches!(normalize_operator("n0call"), Err(PipelineError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_placeholder_and_disabled_never_connect() {
        let transport = Arc::new(MockTransport::default());
        let ingestor = spawn(transport.clone(), settings(PLACEHOLDER_CALLSIGN), fixed_clock);
        assert_eq!(ingestor.snapshot().status, ConnectionStatus::Disabled);
        assert_eq!(ingestor.snapshot().operator, None);

        let mut disabled = settings("K1ABC");
        disabled.enabled = false;
        let other = spawn(transport.clone(), disabled, fixed_clock);
        assert_eq!(other.snapshot().status, ConnectionStatus::Disabled);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(transport.count(), 0);
        ingestor.shutdown().await;
        other.shutdown().await;
    }

    #[tokio::test]
    async fn test_messages_are_classified_and_published() {
        let transport = Arc::new(MockTransport::default());
        let ingestor = spawn(transport.clone(), settings("k1abc"), fixed_clock);
        assert_eq!(ingestor.snapshot().status, ConnectionStatus::Connecting);
        assert!(ingestor.snapshot().loading);

        transport.wait_for_sessions(1).await;
        let (session, events) = transport.latest();
        assert_eq!(session.operator, "K1ABC");
        assert_eq!(session.topics.len(), 2);

        events.send(TransportEvent::Connected).await.unwrap();
        events.send(payload("K1ABC", "W1AW", 14_074_000, 1_700_000_000)).await.unwrap();
        events.send(payload("JA1ABC", "K1ABC", 7_074_000, 1_700_000_010)).await.unwrap();
        events
            .send(TransportEvent::Message {
                topic: "pskr/filter/v2/garbage".to_string(),
                payload: b"{not json".to_vec(),
            })
            .await
            .unwrap();

        let view = wait_view(&ingestor, |v| v.heard_by_others_count == 1 && v.heard_by_me_count == 1).await;
        assert_eq!(view.status, ConnectionStatus::Connected);
        assert!(!view.loading);
        assert_eq!(view.operator.as_deref(), Some("K1ABC"));
        assert_eq!(view.heard_by_others[0].counterparty_call, "W1AW");
        assert_eq!(view.heard_by_others[0].snr, Some(-5));
        assert_eq!(view.heard_by_me[0].counterparty_call, "JA1ABC");
        assert_eq!(view.last_update, Some(fixed_clock()));

        ingestor.shutdown().await;
    }

    #[tokio::test]
    async fn test_disconnect_keeps_reports() {
        let transport = Arc::new(MockTransport::default());
        let ingestor = spawn(transport.clone(), settings("K1ABC"), fixed_clock);
        transport.wait_for_sessions(1).await;
        let (_, events) = transport.latest();

        events.send(TransportEvent::Connected).await.unwrap();
        events.send(payload("K1ABC", "W1AW", 14_074_000, 1_700_000_000)).await.unwrap();
        events.send(payload("K1ABC", "DL1XYZ", 14_074_000, 1_700_000_000)).await.unwrap();
        wait_view(&ingestor, |v| v.heard_by_others_count == 2).await;

        events.send(TransportEvent::Offline("connection reset".to_string())).await.unwrap();
        let view = wait_view(&ingestor, |v| v.status == ConnectionStatus::Offline).await;
        assert_eq!(view.heard_by_others_count, 2);
        assert_eq!(view.error.as_deref(), Some("connection reset"));

        events.send(TransportEvent::Reconnecting).await.unwrap();
        let view = wait_view(&ingestor, |v| v.status == ConnectionStatus::Reconnecting).await;
        assert_eq!(view.heard_by_others_count, 2);

        events.send(TransportEvent::Connected).await.unwrap();
        let view = wait_view(&ingestor, |v| v.status == ConnectionStatus::Connected).await;
        assert_eq!(view.error, None);
        assert_eq!(view.heard_by_others_count, 2);

        ingestor.shutdown().await;
    }

    #[tokio::test]
    async fn test_refresh_reconnects_and_keeps_data() {
        let transport = Arc::new(MockTransport::default());
        let ingestor = spawn(transport.clone(), settings("K1ABC"), fixed_clock);
        transport.wait_for_sessions(1).await;
        let (_, first) = transport.latest();

        first.send(payload("K1ABC", "W1AW", 14_074_000, 1_700_000_000)).await.unwrap();
        first.send(TransportEvent::Offline("timeout".to_string())).await.unwrap();
        wait_view(&ingestor, |v| v.status == ConnectionStatus::Offline).await;

        ingestor.refresh().await.unwrap();
        let view = wait_view(&ingestor, |v| v.status == ConnectionStatus::Reconnecting).await;
        assert_eq!(view.error, None);
        assert_eq!(view.heard_by_others_count, 1);

        transport.wait_for_sessions(2).await;
        assert!(first.is_closed());

        ingestor.shutdown().await;
    }

    #[tokio::test]
    async fn test_operator_change_restarts_with_empty_sets() {
        let transport = Arc::new(MockTransport::default());
        let ingestor = spawn(transport.clone(), settings("K1ABC"), fixed_clock);
        transport.wait_for_sessions(1).await;
        let (_, old) = transport.latest();
        old.send(payload("K1ABC", "W1AW", 14_074_000, 1_700_000_000)).await.unwrap();
        wait_view(&ingestor, |v| v.heard_by_others_count == 1).await;

        // same effective operator is a no-op
        ingestor.configure(" k1abc", true).await.unwrap();
        ingestor.configure("W1AW", true).await.unwrap();
        let view = wait_view(&ingestor, |v| v.operator.as_deref() == Some("W1AW")).await;
        assert_eq!(view.heard_by_others_count, 0);
        assert_eq!(view.status, ConnectionStatus::Connecting);

        transport.wait_for_sessions(2).await;
        assert_eq!(transport.count(), 2);
        assert!(old.is_closed());
        assert_eq!(transport.latest().0.operator, "W1AW");

        ingestor.configure("W1AW", false).await.unwrap();
        let view = wait_view(&ingestor, |v| v.status == ConnectionStatus::Disabled).await;
        assert_eq!(view.operator, None);

        ingestor.shutdown().await;
        assert!(ingestor.refresh().await.is_err());
    }

    #[tokio::test]
    async fn test_window_change_sweeps_now() {
        let transport = Arc::new(MockTransport::default());
        let ingestor = spawn(transport.clone(), settings("K1ABC"), fixed_clock);
        transport.wait_for_sessions(1).await;
        let (_, events) = transport.latest();

        events.send(payload("K1ABC", "W1AW", 14_074_000, 1_700_000_060 - 5 * 60)).await.unwrap();
        events.send(payload("K1ABC", "DL1XYZ", 14_074_000, 1_700_000_060)).await.unwrap();
        wait_view(&ingestor, |v| v.heard_by_others_count == 2).await;

        ingestor.set_window(2).await.unwrap();
        let view = wait_view(&ingestor, |v| v.heard_by_others_count == 1).await;
        assert_eq!(view.heard_by_others[0].counterparty_call, "DL1XYZ");

        ingestor.shutdown().await;
    }

    #[tokio::test]
    async fn test_filter_applies_to_both_sets() {
        let transport = Arc::new(MockTransport::default());
        let ingestor = spawn(transport.clone(), settings("K1ABC"), fixed_clock);
        transport.wait_for_sessions(1).await;
        let (_, events) = transport.latest();

        events.send(payload("K1ABC", "W1AW", 14_074_000, 1_700_000_000)).await.unwrap();
        events.send(payload("JA1ABC", "K1ABC", 7_074_000, 1_700_000_000)).await.unwrap();
        wait_view(&ingestor, |v| v.heard_by_others_count == 1 && v.heard_by_me_count == 1).await;

        ingestor
            .set_filter(FilterConfig {
                bands: vec![Band::M20],
                ..Default::default()
            })
            .await
            .unwrap();
        let view = wait_view(&ingestor, |v| v.heard_by_me_count == 0).await;
        assert_eq!(view.heard_by_others_count, 1);

        ingestor.shutdown().await;
    }

    static SWEEP_CLOCK_MS: AtomicI64 = AtomicI64::new(NOW_MS);

    fn sweep_clock() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(SWEEP_CLOCK_MS.load(Ordering::SeqCst)).unwrap()
    }

    #[tokio::test]
    async fn test_periodic_sweep_runs_without_messages() {
        let transport = Arc::new(MockTransport::default());
        let mut settings = settings("K1ABC");
        settings.sweep_interval = Duration::from_millis(20);
        let ingestor = spawn(transport.clone(), settings, sweep_clock);
        transport.wait_for_sessions(1).await;
        let (_, events) = transport.latest();

        events.send(payload("K1ABC", "W1AW", 14_074_000, 1_700_000_000)).await.unwrap();
        wait_view(&ingestor, |v| v.heard_by_others_count == 1).await;

        SWEEP_CLOCK_MS.store(NOW_MS + 5 * 60_000, Ordering::SeqCst);
        let view = wait_view(&ingestor, |v| v.heard_by_others.first().map(|r| r.age_minutes) == Some(6)).await;
        assert_eq!(view.heard_by_others_count, 1);

        SWEEP_CLOCK_MS.store(NOW_MS + 20 * 60_000, Ordering::SeqCst);
        let view = wait_view(&ingestor, |v| v.heard_by_others_count == 0).await;
        assert_eq!(view.status, ConnectionStatus::Connecting);

        ingestor.shutdown().await;
    }

    #[tokio::test]
    async fn test_ended_session_restarts_on_sweep() {
        /// Transport that returns straight away
        struct FlakyTransport(std::sync::atomic::AtomicUsize);

        #[async_trait]
        impl TelemetryTransport for FlakyTransport {
            async fn run(&self, _session: SessionInfo, _events: mpsc::Sender<TransportEvent>) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let transport = Arc::new(FlakyTransport(std::sync::atomic::AtomicUsize::new(0)));
        let mut settings = settings("K1ABC");
        settings.sweep_interval = Duration::from_millis(20);
        let ingestor = PskReporterIngestor::spawn_with_clock(
            settings,
            transport.clone(),
            Arc::new(NoGeography),
            FilterConfig::default(),
            fixed_clock,
        );

        let view = wait_view(&ingestor, |v| v.status == ConnectionStatus::Offline).await;
        assert!(view.error.is_some());

        tokio::time::timeout(Duration::from_secs(2), async {
            while transport.0.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        ingestor.shutdown().await;
    }
}
