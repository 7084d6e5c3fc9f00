//! Integration tests for the transmission engine
//!
//! These tests drive the engine through its queue against the virtual
//! transmitter and verify:
//! - Reply rendering for the documented request/response exchanges
//! - LIST, SEND_ONCE, SEND_START and SEND_STOP semantics
//! - Repeat preemption and FIFO processing
//! - Teardown on shutdown, queue closure, hardware failure and panics
//! - Engine lifecycle reference counting and request timeouts

use std::sync::Arc;
use std::time::Duration;

use lyrc_catalog::{Catalog, Remote, TimingSpec};
use lyrc_engine::{
    run_engine, Command, CommandSender, EngineConfig, EngineHandle, EngineLifecycle,
    EngineMessage, HardwareError, Reply,
};
use lyrc_protocol::{Request, Response, ResponseBody};
use lyrc_sim::{SimProbe, VirtualConfig, VirtualConnector};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    pub const WAIT: Duration = Duration::from_secs(5);

    pub fn nec_timing() -> TimingSpec {
        TimingSpec {
            bits: 16,
            header: vec![9000, 4500],
            one: vec![560, 1690],
            zero: vec![560, 560],
            trailer: vec![560],
            gap_us: 40000,
            ..TimingSpec::default()
        }
    }

    /// TV with POWER = 0xA25D plus a second remote
    pub fn tv_catalog() -> Catalog {
        [
            Remote::new("TV", nec_timing())
                .with_key("POWER", vec![0xA2, 0x5D])
                .with_key("VOL_UP", vec![0x10, 0xEF])
                .with_key("VOL_DOWN", vec![0x90, 0x6F]),
            Remote::new("AMP", nec_timing()).with_key("MUTE", vec![0x01, 0xFE]),
        ]
        .into_iter()
        .collect()
    }

    pub fn fast_config() -> EngineConfig {
        EngineConfig {
            busy_poll_ms: 1,
            ..EngineConfig::default()
        }
    }

    pub struct Harness {
        pub queue: CommandSender,
        pub probe: SimProbe,
        pub task: JoinHandle<Result<(), HardwareError>>,
    }

    impl Harness {
        pub fn start(catalog: Catalog, virtual_config: VirtualConfig) -> Self {
            let connector = VirtualConnector::new(virtual_config);
            let probe = connector.probe();
            let (queue, rx) = mpsc::unbounded_channel();
            let task = tokio::spawn(run_engine(
                Arc::new(catalog),
                Arc::new(connector),
                fast_config(),
                rx,
            ));
            Self { queue, probe, task }
        }

        pub fn tv() -> Self {
            Self::start(
                tv_catalog(),
                VirtualConfig {
                    transmit_time_ms: 1,
                    ..Default::default()
                },
            )
        }

        pub async fn send(&self, line: &str) -> Response {
            let request = Request::parse(line).unwrap();
            EngineHandle::new(self.queue.clone(), WAIT)
                .submit(&request)
                .await
        }

        pub async fn shutdown(self) -> Result<(), HardwareError> {
            self.queue.send(EngineMessage::Shutdown).unwrap();
            self.task.await.unwrap()
        }
    }

    pub fn error_message(response: &Response) -> &str {
        match response.body() {
            ResponseBody::Error(message) => message.as_str(),
            other => panic!("expected error, got {:?}", other),
        }
    }

    pub fn data(response: &Response) -> Vec<String> {
        match response.body() {
            ResponseBody::Data(lines) => lines.clone(),
            other => panic!("expected data, got {:?}", other),
        }
    }

    /// Poll `condition` until it holds or the wait expires
    pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + WAIT;
        while tokio::time::Instant::now() < deadline {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        condition()
    }
}

// ============================================================================
// Request / Response Exchanges
// ============================================================================

mod exchange_tests {
    use super::helpers::*;
    use super::*;

    #[tokio::test]
    async fn test_tv_power_end_to_end() {
        let harness = Harness::tv();

        let ok = harness.send("SEND_ONCE TV POWER").await;
        assert_eq!(ok.render(), "BEGIN\nSEND_ONCE TV POWER\nSUCCESS\nEND\n\n");

        let unknown_key = harness.send("SEND_ONCE TV UNKNOWN").await;
        assert_eq!(
            unknown_key.render(),
            "BEGIN\nSEND_ONCE TV UNKNOWN\nERROR\nDATA\n1\nUnknown key_code\nEND\n\n"
        );

        let stop = harness.send("SEND_STOP").await;
        assert_eq!(
            stop.render(),
            "BEGIN\nSEND_STOP\nERROR\nDATA\n1\nNo key was scheduled for repeat\nEND\n\n"
        );

        let transmissions = harness.probe.transmissions();
        assert_eq!(transmissions.len(), 1);
        // header(2) + 16 bits x 2 waves + trailer(1), no gap
        assert_eq!(transmissions[0].waves.len(), 35);

        harness.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_checks_remote_before_key() {
        let harness = Harness::tv();

        let response = harness.send("SEND_ONCE VCR UNKNOWN").await;
        assert_eq!(error_message(&response), "Unknown remote");
        let response = harness.send("SEND_START VCR PLAY").await;
        assert_eq!(error_message(&response), "Unknown remote");
        assert_eq!(harness.probe.transmission_count(), 0);

        harness.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_list() {
        let harness = Harness::tv();

        assert_eq!(data(&harness.send("LIST").await), vec!["AMP", "TV"]);
        assert_eq!(
            data(&harness.send("LIST TV").await),
            vec!["POWER", "VOL_UP", "VOL_DOWN"]
        );
        assert_eq!(
            harness.send("LIST TV POWER").await.render(),
            "BEGIN\nLIST TV POWER\nSUCCESS\nDATA\n1\nPOWER 0xA25D\nEND\n\n"
        );
        assert_eq!(error_message(&harness.send("LIST VCR").await), "unknown remote");
        assert_eq!(error_message(&harness.send("LIST VCR POWER").await), "unknown remote");
        assert_eq!(error_message(&harness.send("LIST TV NOPE").await), "unknown key_code");

        // Listing never touches the transmitter
        assert_eq!(harness.probe.transmission_count(), 0);
        harness.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_list_after_send_returns_code() {
        let harness = Harness::tv();

        assert!(!harness.send("SEND_ONCE TV POWER").await.is_error());
        assert_eq!(data(&harness.send("LIST TV POWER").await), vec!["POWER 0xA25D"]);

        harness.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unsupported_directives() {
        let harness = Harness::tv();

        let response = harness.send("VERSION").await;
        assert_eq!(error_message(&response), "Directive 'VERSION' not supported");

        // Directives are case-sensitive and matched exactly
        let response = harness.send("send_stop").await;
        assert_eq!(error_message(&response), "Directive 'send_stop' not supported");
        let response = harness.send("SEND_STOPPED").await;
        assert_eq!(error_message(&response), "Directive 'SEND_STOPPED' not supported");

        harness.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let harness = Harness::start(Catalog::new(), VirtualConfig::default());

        assert!(data(&harness.send("LIST").await).is_empty());
        assert_eq!(
            error_message(&harness.send("SEND_ONCE TV POWER").await),
            "Unknown remote"
        );

        harness.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_uncompilable_remote_only_fails_its_own_sends() {
        let mut catalog = tv_catalog();
        catalog.insert(Remote::new("BROKEN", TimingSpec::default()).with_key("ON", vec![0x01]));
        let harness = Harness::start(catalog, VirtualConfig::default());

        assert!(harness.send("SEND_ONCE BROKEN ON").await.is_error());
        assert!(!harness.send("SEND_ONCE TV POWER").await.is_error());
        assert_eq!(data(&harness.send("LIST").await), vec!["AMP", "BROKEN", "TV"]);

        harness.shutdown().await.unwrap();
    }
}

// ============================================================================
// Repeat State Machine
// ============================================================================

mod repeat_tests {
    use super::helpers::*;
    use super::*;

    #[tokio::test]
    async fn test_repeat_until_stop() {
        let harness = Harness::tv();

        assert!(!harness.send("SEND_START TV POWER").await.is_error());
        assert!(harness.probe.wait_for_transmissions(5, WAIT).await);

        // Every repeat ends with the gap
        let first = &harness.probe.transmissions()[0];
        assert_eq!(first.waves.len(), 36);

        assert!(!harness.send("SEND_STOP").await.is_error());
        let stopped_at = harness.probe.transmission_count();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(harness.probe.transmission_count(), stopped_at);

        // Only the first stop succeeds
        let again = harness.send("SEND_STOP").await;
        assert_eq!(error_message(&again), "No key was scheduled for repeat");

        harness.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_once_preempts_repeat() {
        let harness = Harness::tv();

        assert!(!harness.send("SEND_START TV POWER").await.is_error());
        assert!(harness.probe.wait_for_transmissions(3, WAIT).await);

        assert!(!harness.send("SEND_ONCE TV VOL_UP").await.is_error());
        let after = harness.probe.transmission_count();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(harness.probe.transmission_count(), after);

        let last = harness.probe.transmissions().pop().unwrap();
        assert_eq!(last.waves.len(), 35);
        assert!(harness.send("SEND_STOP").await.is_error());

        harness.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_start_replaces_repeat() {
        let harness = Harness::tv();

        assert!(!harness.send("SEND_START TV VOL_UP").await.is_error());
        assert!(!harness.send("SEND_START TV VOL_DOWN").await.is_error());
        let switched_at = harness.probe.transmission_count();
        assert!(harness.probe.wait_for_transmissions(switched_at + 3, WAIT).await);

        let transmissions = harness.probe.transmissions();
        let vol_down = &transmissions[switched_at - 1].waves;
        assert!(transmissions[switched_at..].iter().all(|t| &t.waves == vol_down));

        assert!(!harness.send("SEND_STOP").await.is_error());
        harness.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_list_does_not_interrupt_repeat() {
        let harness = Harness::tv();

        assert!(!harness.send("SEND_START TV POWER").await.is_error());
        assert_eq!(data(&harness.send("LIST").await), vec!["AMP", "TV"]);
        let listed_at = harness.probe.transmission_count();
        assert!(harness.probe.wait_for_transmissions(listed_at + 2, WAIT).await);

        assert!(!harness.send("SEND_STOP").await.is_error());
        harness.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_send_keeps_repeat() {
        let harness = Harness::tv();

        assert!(!harness.send("SEND_START TV POWER").await.is_error());
        let response = harness.send("SEND_ONCE TV NOPE").await;
        assert_eq!(error_message(&response), "Unknown key_code");
        assert!(!harness.send("SEND_STOP").await.is_error());

        harness.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failed_repeat_falls_back_to_idle() {
        let harness = Harness::tv();

        assert!(!harness.send("SEND_START TV POWER").await.is_error());
        harness.probe.fail_next_transmission(HardwareError::Rejected {
            command: 93,
            status: -1,
        });
        assert!(eventually(|| !harness.probe.has_pending_failure()).await);

        let stopped_at = harness.probe.transmission_count();
        let response = harness.send("SEND_STOP").await;
        assert_eq!(error_message(&response), "No key was scheduled for repeat");
        assert_eq!(harness.probe.transmission_count(), stopped_at);

        harness.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_queued_commands_run_in_order() {
        let harness = Harness::tv();

        let mut slots = Vec::new();
        for key in ["VOL_UP", "POWER", "VOL_DOWN", "POWER"] {
            let (command, slot) = Command::new(lyrc_protocol::Directive::SendOnce, "TV", key);
            harness.queue.send(EngineMessage::Command(command)).unwrap();
            slots.push(slot);
        }
        for slot in slots {
            assert_eq!(slot.await.unwrap(), Reply::Success);
        }

        let waves: Vec<_> = harness.probe.transmissions().into_iter().map(|t| t.waves).collect();
        assert_eq!(waves.len(), 4);
        assert_eq!(waves[1], waves[3]);
        assert_ne!(waves[0], waves[1]);
        assert_ne!(waves[0], waves[2]);

        harness.shutdown().await.unwrap();
    }
}

// ============================================================================
// Teardown
// ============================================================================

mod teardown_tests {
    use super::helpers::*;
    use super::*;
    use async_trait::async_trait;
    use lyrc_engine::{Connector, Pulse, Transmitter, WaveId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_shutdown_releases_everything() {
        let harness = Harness::tv();
        assert!(!harness.send("SEND_START TV POWER").await.is_error());
        assert!(harness.probe.live_wave_count() > 0);

        let probe = harness.probe.clone();
        harness.shutdown().await.unwrap();

        assert_eq!(probe.live_wave_count(), 0);
        assert_eq!(probe.release_count(), 1);
        assert_eq!(probe.clear_count(), 1);
    }

    #[tokio::test]
    async fn test_closed_queue_runs_teardown() {
        let Harness { queue, probe, task } = Harness::tv();
        drop(queue);

        task.await.unwrap().unwrap();
        assert_eq!(probe.live_wave_count(), 0);
        assert_eq!(probe.release_count(), 1);
    }

    #[tokio::test]
    async fn test_fatal_error_stops_engine_once() {
        let harness = Harness::tv();
        harness
            .probe
            .fail_next_transmission(HardwareError::Unavailable("pigpiod went away".into()));

        let response = harness.send("SEND_ONCE TV POWER").await;
        assert!(error_message(&response).starts_with("transmission failed"));

        let Harness { queue, probe, task } = harness;
        assert!(matches!(task.await.unwrap(), Err(HardwareError::Unavailable(_))));
        assert_eq!(probe.release_count(), 1);
        assert_eq!(probe.live_wave_count(), 0);

        // Later requests resolve instead of hanging
        let late = EngineHandle::new(queue, WAIT)
            .submit(&Request::parse("SEND_ONCE TV POWER").unwrap())
            .await;
        assert_eq!(error_message(&late), "transmitter unavailable");
    }

    #[tokio::test]
    async fn test_disconnect_during_repeat() {
        let harness = Harness::tv();
        assert!(!harness.send("SEND_START TV POWER").await.is_error());
        harness.probe.disconnect();

        let Harness { probe, task, .. } = harness;
        assert!(task.await.unwrap().is_err());
        assert_eq!(probe.release_count(), 1);
    }

    #[tokio::test]
    async fn test_non_fatal_error_keeps_engine() {
        let harness = Harness::tv();
        harness.probe.fail_next_transmission(HardwareError::Rejected {
            command: 93,
            status: -1,
        });

        let failed = harness.send("SEND_ONCE TV POWER").await;
        assert!(error_message(&failed).starts_with("transmission failed"));
        assert!(!harness.send("SEND_ONCE TV POWER").await.is_error());

        harness.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_failure_drops_queued_commands() {
        let connector = VirtualConnector::new(VirtualConfig {
            fail_connect: true,
            ..Default::default()
        });
        let (queue, rx) = mpsc::unbounded_channel();
        let (command, slot) = Command::new(lyrc_protocol::Directive::List, "", "");
        queue.send(EngineMessage::Command(command)).unwrap();

        let result = run_engine(Arc::new(tv_catalog()), Arc::new(connector), fast_config(), rx).await;
        assert!(result.is_err());
        assert!(slot.await.is_err());
    }

    #[tokio::test]
    async fn test_gpio_beyond_wave_mask_is_refused() {
        let connector = VirtualConnector::new(VirtualConfig::default());
        let probe = connector.probe();
        let (queue, rx) = mpsc::unbounded_channel();
        let (command, slot) = Command::new(lyrc_protocol::Directive::SendOnce, "TV", "POWER");
        queue.send(EngineMessage::Command(command)).unwrap();

        let config = EngineConfig {
            gpio_pin: 40,
            ..fast_config()
        };
        let result = run_engine(Arc::new(tv_catalog()), Arc::new(connector), config, rx).await;
        assert!(matches!(result, Err(HardwareError::InvalidWaveform(_))));
        assert!(slot.await.is_err());
        assert_eq!(probe.connect_count(), 0);
        assert_eq!(probe.transmission_count(), 0);
    }

    /// Transmitter that panics while playing a chain
    struct PanickingTransmitter {
        released: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transmitter for PanickingTransmitter {
        async fn clear_waves(&mut self) -> Result<(), HardwareError> {
            Ok(())
        }

        async fn create_wave(&mut self, _pulses: &[Pulse]) -> Result<WaveId, HardwareError> {
            Ok(WaveId(0))
        }

        async fn delete_wave(&mut self, _wave: WaveId) -> Result<(), HardwareError> {
            Ok(())
        }

        async fn send_chain(&mut self, _waves: &[WaveId]) -> Result<(), HardwareError> {
            panic!("chain playback exploded");
        }

        async fn is_busy(&mut self) -> Result<bool, HardwareError> {
            Ok(false)
        }

        async fn release(&mut self) -> Result<(), HardwareError> {
            self.released.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct PanickingConnector {
        released: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Connector for PanickingConnector {
        async fn connect(&self, _gpio_pin: u32) -> Result<Box<dyn Transmitter>, HardwareError> {
            Ok(Box::new(PanickingTransmitter {
                released: self.released.clone(),
            }))
        }
    }

    #[tokio::test]
    async fn test_panic_still_runs_teardown() {
        let released = Arc::new(AtomicUsize::new(0));
        let connector = PanickingConnector {
            released: released.clone(),
        };
        let (queue, rx) = mpsc::unbounded_channel();
        let (command, slot) = Command::new(lyrc_protocol::Directive::SendOnce, "TV", "POWER");
        queue.send(EngineMessage::Command(command)).unwrap();

        let result = run_engine(Arc::new(tv_catalog()), Arc::new(connector), fast_config(), rx).await;
        assert!(result.is_err());
        assert!(slot.await.is_err());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}

// ============================================================================
// Lifecycle and Dispatch
// ============================================================================

mod lifecycle_tests {
    use super::helpers::*;
    use super::*;

    fn lifecycle(virtual_config: VirtualConfig) -> (EngineLifecycle, SimProbe) {
        let connector = VirtualConnector::new(virtual_config);
        let probe = connector.probe();
        let catalog = Arc::new(tv_catalog());
        let lifecycle = EngineLifecycle::new(
            Arc::new(connector),
            fast_config(),
            Arc::new(move || catalog.clone()),
        );
        (lifecycle, probe)
    }

    #[tokio::test]
    async fn test_first_client_starts_last_client_stops() {
        let (lifecycle, probe) = lifecycle(VirtualConfig::default());

        let first = lifecycle.acquire().await;
        let second = lifecycle.acquire().await;
        assert_eq!(lifecycle.client_count().await, 2);

        let request = Request::parse("SEND_ONCE TV POWER").unwrap();
        assert!(!first.submit(&request).await.is_error());
        assert!(!second.submit(&request).await.is_error());
        assert_eq!(probe.connect_count(), 1);

        lifecycle.release().await;
        assert!(lifecycle.is_running().await);
        assert_eq!(probe.release_count(), 0);

        lifecycle.release().await;
        assert!(eventually(|| probe.release_count() == 1).await);
        assert_eq!(probe.live_wave_count(), 0);

        // The next client gets a fresh engine with freshly compiled waves
        let third = lifecycle.acquire().await;
        assert!(!third.submit(&request).await.is_error());
        assert_eq!(probe.connect_count(), 2);
        assert_eq!(probe.clear_count(), 2);

        lifecycle.shutdown().await;
        assert_eq!(probe.release_count(), 2);
        assert_eq!(lifecycle.client_count().await, 0);
    }

    #[tokio::test]
    async fn test_release_without_clients_is_harmless() {
        let (lifecycle, probe) = lifecycle(VirtualConfig::default());
        lifecycle.release().await;
        assert_eq!(lifecycle.client_count().await, 0);
        assert_eq!(probe.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_dead_engine_is_restarted() {
        let (lifecycle, probe) = lifecycle(VirtualConfig::default());

        let handle = lifecycle.acquire().await;
        probe.fail_next_transmission(HardwareError::Unavailable("gone".into()));
        let request = Request::parse("SEND_ONCE TV POWER").unwrap();
        assert!(handle.submit(&request).await.is_error());
        assert!(eventually(|| probe.release_count() == 1).await);
        tokio::time::timeout(WAIT, async {
            while lifecycle.is_running().await {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap();

        // A stale handle resolves instead of hanging
        let stale = handle.submit(&request).await;
        assert_eq!(error_message(&stale), "transmitter unavailable");

        let fresh = lifecycle.acquire().await;
        assert!(!fresh.submit(&request).await.is_error());
        assert_eq!(probe.connect_count(), 2);

        lifecycle.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_catalog_does_not_block_clients() {
        let connector = VirtualConnector::new(VirtualConfig::default());
        let probe = connector.probe();
        let lifecycle = EngineLifecycle::new(
            Arc::new(connector),
            fast_config(),
            Arc::new(|| {
                std::thread::sleep(Duration::from_millis(300));
                Arc::new(tv_catalog())
            }),
        );

        let started = std::time::Instant::now();
        let first = lifecycle.acquire().await;
        let _second = lifecycle.acquire().await;
        assert_eq!(lifecycle.client_count().await, 2);
        assert!(started.elapsed() < Duration::from_millis(200));

        // Requests wait for the catalog instead of failing
        let request = Request::parse("SEND_ONCE TV POWER").unwrap();
        assert!(!first.submit(&request).await.is_error());
        assert_eq!(probe.transmission_count(), 1);

        lifecycle.shutdown().await;
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let (queue, rx) = mpsc::unbounded_channel();
        let connector = VirtualConnector::new(VirtualConfig {
            transmit_time_ms: 200,
            ..Default::default()
        });
        let probe = connector.probe();
        let task = tokio::spawn(run_engine(
            Arc::new(tv_catalog()),
            Arc::new(connector),
            fast_config(),
            rx,
        ));

        let handle = EngineHandle::new(queue.clone(), Duration::from_millis(20));
        let response = handle
            .submit(&Request::parse("SEND_ONCE TV POWER").unwrap())
            .await;
        assert_eq!(error_message(&response), "timed out waiting for transmitter");

        // The timed-out command still runs
        assert!(probe.wait_for_transmissions(1, WAIT).await);

        queue.send(EngineMessage::Shutdown).unwrap();
        task.await.unwrap().unwrap();
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod proptest_tests {
    use super::helpers::*;
    use super::*;
    use lyrc_engine::{ChainBuilder, CompiledRemote, CompiledSymbol, Symbol, WaveId, WaveformTable};
    use proptest::prelude::*;

    fn compiled(start: u32, len: usize) -> CompiledSymbol {
        CompiledSymbol::from((start..start + len as u32).map(WaveId).collect::<Vec<_>>())
    }

    proptest! {
        #[test]
        fn chain_length_matches_code(
            code in prop::collection::vec(any::<u8>(), 1..8),
            header_len in 0usize..4,
            one_len in 1usize..4,
            zero_len in 1usize..4,
            trailer_len in 0usize..3,
            repeat in any::<bool>(),
        ) {
            let catalog: Catalog = [Remote::new("R", nec_timing()).with_key("K", code.clone())]
                .into_iter()
                .collect();
            let mut table = WaveformTable::new();
            table.insert("R", CompiledRemote {
                header: compiled(0, header_len),
                one: compiled(10, one_len),
                zero: compiled(20, zero_len),
                trailer: compiled(30, trailer_len),
                gap: WaveId(40),
            });

            let chain = ChainBuilder::new(&catalog, &table).build("R", "K", repeat).unwrap();

            let gap = usize::from(repeat);
            prop_assert_eq!(chain.symbols().len(), 2 + 8 * code.len() + gap);

            let ones: usize = code.iter().map(|b| b.count_ones() as usize).sum();
            let zeros = 8 * code.len() - ones;
            prop_assert_eq!(
                chain.waves().len(),
                header_len + trailer_len + ones * one_len + zeros * zero_len + gap
            );
            prop_assert_eq!(chain.has_gap(), repeat);
            prop_assert_eq!(chain.symbols().first(), Some(&Symbol::Header));
        }

        #[test]
        fn single_wave_bits_give_header_trailer_plus_bits(
            code in prop::collection::vec(any::<u8>(), 1..8),
        ) {
            let catalog: Catalog = [Remote::new("R", nec_timing()).with_key("K", code.clone())]
                .into_iter()
                .collect();
            let mut table = WaveformTable::new();
            table.insert("R", CompiledRemote {
                header: compiled(0, 2),
                one: compiled(10, 1),
                zero: compiled(20, 1),
                trailer: compiled(30, 1),
                gap: WaveId(40),
            });

            let chain = ChainBuilder::new(&catalog, &table).build("R", "K", false).unwrap();
            prop_assert_eq!(chain.waves().len(), 2 + 1 + 8 * code.len());
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn list_returns_exactly_cataloged_names(
            names in prop::collection::btree_set("[A-Z][A-Z0-9_]{0,7}", 0..6),
        ) {
            let catalog: Catalog = names
                .iter()
                .map(|n| Remote::new(n.as_str(), nec_timing()).with_key("POWER", vec![0xA2, 0x5D]))
                .collect();

            let runtime = tokio::runtime::Runtime::new().unwrap();
            let listed = runtime.block_on(async {
                let harness = Harness::start(catalog, VirtualConfig::default());
                let listed = data(&harness.send("LIST").await);
                let unknown = harness.send("LIST lowercase_remote").await;
                assert_eq!(error_message(&unknown), "unknown remote");
                harness.shutdown().await.unwrap();
                listed
            });

            let expected: Vec<String> = names.into_iter().collect();
            prop_assert_eq!(listed, expected);
        }
    }
}
