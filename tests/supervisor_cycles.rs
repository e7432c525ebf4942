//! Presence cycle tests for the supervisor.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use driver_supervisor::config::ActivationPolicy;
use driver_supervisor::lifecycle::ShutdownSignal;
use driver_supervisor::{ExitStatus, Supervisor, Termination};
use tokio::sync::mpsc;

mod common;

use common::{wait_until, FakeDevice, FakeLibrary, FakeState, QuitWaitingLoop, RecordingLoop};

const STEP: Duration = Duration::from_secs(2);

#[tokio::test]
async fn stop_while_idle_exits_gracefully() {
    let device = FakeDevice::new();
    let (library, fake) = FakeLibrary::new();
    let (event_loop, stats) = RecordingLoop::new();
    let (signal_tx, signal_rx) = mpsc::channel(2);

    let supervisor = Supervisor::new(common::test_config(&device), library);
    let run = tokio::spawn(supervisor.run(event_loop, signal_rx));

    // device absent: the supervisor sits in presence-wait
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!run.is_finished());
    assert_eq!(FakeState::count(&fake.added), 0);

    let started = Instant::now();
    signal_tx.send(ShutdownSignal::Terminate).await.unwrap();
    let termination = tokio::time::timeout(STEP, run).await.unwrap().unwrap().unwrap();

    assert_eq!(termination, Termination::Completed);
    assert_eq!(termination.status(), ExitStatus::Graceful);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(FakeState::count(&fake.added), 0);
    assert_eq!(stats.started.load(Ordering::SeqCst), 0);
    assert!(fake.stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn replug_cycles_start_one_session_each() {
    let device = FakeDevice::new();
    let (library, fake) = FakeLibrary::new();
    let (event_loop, stats) = RecordingLoop::new();
    let (signal_tx, signal_rx) = mpsc::channel(2);

    let supervisor = Supervisor::new(common::test_config(&device), library);
    let run = tokio::spawn(supervisor.run(event_loop, signal_rx));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(FakeState::count(&fake.added), 0);

    for cycle in 1..=3 {
        device.plug();
        assert!(
            wait_until(STEP, || stats.started.load(Ordering::SeqCst) == cycle).await,
            "cycle {} should start a session",
            cycle
        );
        assert_eq!(FakeState::count(&fake.added), cycle);

        device.unplug();
        assert!(
            wait_until(STEP, || stats.finished.load(Ordering::SeqCst) == cycle).await,
            "cycle {} should end its session",
            cycle
        );
        assert_eq!(FakeState::count(&fake.removed), cycle);

        // removal returns to presence-wait, not to exit
        assert!(!run.is_finished());
    }

    signal_tx.send(ShutdownSignal::Interrupt).await.unwrap();
    let termination = tokio::time::timeout(STEP, run).await.unwrap().unwrap().unwrap();

    assert_eq!(termination, Termination::Completed);
    assert_eq!(FakeState::count(&fake.added), 3);
    assert_eq!(FakeState::count(&fake.removed), 3);
    assert!(!fake.overlapped.load(Ordering::SeqCst));
    assert!(fake.stopped.load(Ordering::SeqCst));

    // every delivered notification is released, consumed or not
    assert!(
        wait_until(STEP, || {
            FakeState::count(&fake.released) == FakeState::count(&fake.delivered)
        })
        .await
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn replug_cycles_do_not_leak_tasks() {
    let device = FakeDevice::new();
    let (library, fake) = FakeLibrary::new();
    let (event_loop, stats) = RecordingLoop::new();
    let (signal_tx, signal_rx) = mpsc::channel(2);

    let supervisor = Supervisor::new(common::test_config(&device), library);
    let run = tokio::spawn(supervisor.run(event_loop, signal_rx));

    tokio::time::sleep(Duration::from_millis(50)).await;
    let idle = common::alive_tasks();

    for cycle in 1..=10 {
        device.plug();
        assert!(wait_until(STEP, || stats.started.load(Ordering::SeqCst) == cycle).await);
        device.unplug();
        assert!(wait_until(STEP, || stats.finished.load(Ordering::SeqCst) == cycle).await);

        // watcher, stop forwarder and abort timers die with the session
        assert!(
            wait_until(STEP, || common::alive_tasks() <= idle).await,
            "cycle {} left {} tasks alive, {} when idle",
            cycle,
            common::alive_tasks(),
            idle
        );
    }

    signal_tx.send(ShutdownSignal::Interrupt).await.unwrap();
    let termination = tokio::time::timeout(STEP, run).await.unwrap().unwrap().unwrap();
    assert_eq!(termination, Termination::Completed);
    assert_eq!(FakeState::count(&fake.removed), 10);
}

#[tokio::test]
async fn event_loop_waiting_on_quit_signal_returns_after_removal() {
    let device = FakeDevice::new();
    device.plug();
    let (library, fake) = FakeLibrary::new();
    let (event_loop, stats) = QuitWaitingLoop::new();
    let (signal_tx, signal_rx) = mpsc::channel(2);

    let supervisor = Supervisor::new(common::test_config(&device), library);
    let run = tokio::spawn(supervisor.run(event_loop, signal_rx));

    assert!(wait_until(STEP, || stats.started.load(Ordering::SeqCst) == 1).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(stats.finished.load(Ordering::SeqCst), 0);

    device.unplug();
    assert!(wait_until(STEP, || stats.finished.load(Ordering::SeqCst) == 1).await);
    assert_eq!(FakeState::count(&fake.removed), 1);

    // the loop returned, so the next cycle can start
    device.plug();
    assert!(wait_until(STEP, || stats.started.load(Ordering::SeqCst) == 2).await);

    signal_tx.send(ShutdownSignal::Terminate).await.unwrap();
    let termination = tokio::time::timeout(STEP, run).await.unwrap().unwrap().unwrap();
    assert_eq!(termination, Termination::Completed);
    assert_eq!(FakeState::count(&fake.removed), 2);
    assert_eq!(stats.finished.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn stop_during_session_removes_driver_then_exits() {
    let device = FakeDevice::new();
    device.plug();
    let (library, fake) = FakeLibrary::new();
    let (event_loop, stats) = RecordingLoop::new();
    let (signal_tx, signal_rx) = mpsc::channel(2);

    let supervisor = Supervisor::new(common::test_config(&device), library);
    let run = tokio::spawn(supervisor.run(event_loop, signal_rx));

    assert!(wait_until(STEP, || stats.started.load(Ordering::SeqCst) == 1).await);

    signal_tx.send(ShutdownSignal::Terminate).await.unwrap();
    let termination = tokio::time::timeout(STEP, run).await.unwrap().unwrap().unwrap();

    assert_eq!(termination, Termination::Completed);
    assert_eq!(FakeState::count(&fake.removed), 1);
    assert_eq!(stats.finished.load(Ordering::SeqCst), 1);
    assert!(fake.stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn concurrent_quit_sources_tear_down_once() {
    let device = FakeDevice::new();
    device.plug();
    let (library, fake) = FakeLibrary::new();
    let (event_loop, stats) = RecordingLoop::new();
    let (signal_tx, signal_rx) = mpsc::channel(2);

    let supervisor = Supervisor::new(common::test_config(&device), library);
    let run = tokio::spawn(supervisor.run(event_loop, signal_rx));

    assert!(wait_until(STEP, || stats.started.load(Ordering::SeqCst) == 1).await);

    device.unplug();
    signal_tx.send(ShutdownSignal::Terminate).await.unwrap();
    let termination = tokio::time::timeout(STEP, run).await.unwrap().unwrap().unwrap();

    assert_eq!(termination, Termination::Completed);
    assert_eq!(FakeState::count(&fake.removed), 1);
    assert_eq!(stats.started.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_activation_skip_cycle_waits_for_unplug() {
    let device = FakeDevice::new();
    let (library, fake) = FakeLibrary::new();
    fake.set_activation(common::Behaviour::Fail);
    let (event_loop, stats) = RecordingLoop::new();
    let (signal_tx, signal_rx) = mpsc::channel(2);

    let mut config = common::test_config(&device);
    config.driver.on_activation_failure = ActivationPolicy::SkipCycle;
    let supervisor = Supervisor::new(config, library);
    let run = tokio::spawn(supervisor.run(event_loop, signal_rx));

    device.plug();
    assert!(wait_until(STEP, || FakeState::count(&fake.added) == 1).await);

    // still present: no retry and no event loop
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(FakeState::count(&fake.added), 1);
    assert_eq!(stats.started.load(Ordering::SeqCst), 0);

    device.unplug();
    tokio::time::sleep(Duration::from_millis(150)).await;
    fake.set_activation(common::Behaviour::Succeed);
    device.plug();
    assert!(wait_until(STEP, || stats.started.load(Ordering::SeqCst) == 1).await);
    assert_eq!(FakeState::count(&fake.added), 2);

    signal_tx.send(ShutdownSignal::Terminate).await.unwrap();
    let termination = tokio::time::timeout(STEP, run).await.unwrap().unwrap().unwrap();
    assert_eq!(termination, Termination::Completed);
    assert_eq!(FakeState::count(&fake.removed), 1);
}

#[tokio::test]
async fn failed_activation_proceed_runs_event_loop() {
    let device = FakeDevice::new();
    device.plug();
    let (library, fake) = FakeLibrary::new();
    fake.set_activation(common::Behaviour::Fail);
    let (event_loop, stats) = RecordingLoop::new();
    let (signal_tx, signal_rx) = mpsc::channel(2);

    let supervisor = Supervisor::new(common::test_config(&device), library);
    let run = tokio::spawn(supervisor.run(event_loop, signal_rx));

    assert!(wait_until(STEP, || stats.started.load(Ordering::SeqCst) == 1).await);

    device.unplug();
    assert!(wait_until(STEP, || FakeState::count(&fake.removed) == 1).await);

    signal_tx.send(ShutdownSignal::Terminate).await.unwrap();
    let termination = tokio::time::timeout(STEP, run).await.unwrap().unwrap().unwrap();
    assert_eq!(termination, Termination::Completed);
}
