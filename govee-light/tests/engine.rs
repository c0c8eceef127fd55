//! End-to-end engine tests against the in-memory GATT backend

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use govee_light::{
    DeviceState, DeviceVariant, GoveeLight, LightConfig, LightError, Rgb, StateObserver, TurnOn,
};
use govee_transport::mock::MockConnector;
use govee_transport::{
    decode, encode, ColorMode, LogicalPacket, PacketCmd, PacketHead, RetryPolicy, TransportError,
};

const ADDRESS: &str = "A4:C1:38:5E:00:01";

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
    }
}

fn light(mock: &MockConnector, variant: DeviceVariant) -> GoveeLight {
    GoveeLight::new(
        Arc::new(mock.clone()),
        LightConfig::new(ADDRESS).variant(variant).retry(fast_retry(2)),
    )
}

fn frame(head: PacketHead, cmd: PacketCmd, payload: &[u8]) -> Vec<u8> {
    encode(&LogicalPacket::new(head, cmd, payload.to_vec()))
        .unwrap()
        .to_vec()
}

fn response(cmd: PacketCmd, payload: &[u8]) -> Vec<u8> {
    frame(PacketHead::Request, cmd, payload)
}

fn command(cmd: PacketCmd, payload: &[u8]) -> Vec<u8> {
    frame(PacketHead::Command, cmd, payload)
}

async fn next_state(rx: &mut tokio::sync::broadcast::Receiver<DeviceState>) -> DeviceState {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("no state update")
        .unwrap()
}

#[tokio::test]
async fn legacy_color_flushes_nine_frames_in_order() {
    let mock = MockConnector::new();
    let light = light(&mock, DeviceVariant::Legacy);

    assert_eq!(light.set_color(Rgb::new(255, 0, 0)), 9);
    assert_eq!(light.pending(), 9);

    assert_eq!(light.flush().await.unwrap(), 9);
    assert_eq!(light.pending(), 0);

    let single = command(PacketCmd::Color, &[0x02, 255, 0, 0]);
    let legacy = command(PacketCmd::Color, &[0x0D, 255, 0, 0]);
    let request = response(PacketCmd::Color, &[]);
    let mut expected = Vec::new();
    for f in [single, legacy, request] {
        expected.extend(std::iter::repeat(f).take(3));
    }
    assert_eq!(mock.writes(), expected);

    let modes: Vec<_> = mock
        .writes()
        .iter()
        .map(|bytes| decode(bytes).unwrap().color_mode())
        .collect();
    assert_eq!(modes[0], Some(ColorMode::Single));
    assert_eq!(modes[3], Some(ColorMode::Legacy));
    assert_eq!(modes[6], None);
}

#[tokio::test]
async fn segmented_color_uses_segment_packet() {
    let mock = MockConnector::new();
    let light = light(&mock, DeviceVariant::Segmented);

    assert_eq!(light.set_color(Rgb::new(10, 20, 30)), 6);
    light.flush().await.unwrap();

    let writes = mock.writes();
    assert_eq!(
        writes[0],
        command(
            PacketCmd::Color,
            &[0x15, 0x01, 10, 20, 30, 0, 0, 0, 0, 0, 0xFF, 0xFF]
        )
    );
    assert_eq!(writes[3], response(PacketCmd::Segment, &[0x01]));
    assert_eq!(
        decode(&writes[0]).unwrap().color_mode(),
        Some(ColorMode::Segments)
    );
}

#[tokio::test]
async fn segmented_brightness_round_trip() {
    let mock = MockConnector::new();
    let light = light(&mock, DeviceVariant::Segmented);
    let mut updates = light.subscribe();

    light.set_brightness(255);
    light.flush().await.unwrap();
    assert_eq!(mock.writes()[0], command(PacketCmd::Brightness, &[100]));
    assert_eq!(mock.writes()[3], response(PacketCmd::Brightness, &[]));

    assert!(mock.notify(response(PacketCmd::Brightness, &[100])));
    let state = next_state(&mut updates).await;
    assert_eq!(state.brightness, Some(255));
    assert_eq!(light.brightness(), Some(255));
}

#[tokio::test]
async fn legacy_brightness_is_reported_unscaled() {
    let mock = MockConnector::new();
    let light = light(&mock, DeviceVariant::Legacy);

    light.dispatch(&response(PacketCmd::Brightness, &[128]));
    assert_eq!(light.brightness(), Some(128));
}

#[tokio::test]
async fn set_power_is_idempotent_against_reported_state() {
    let mock = MockConnector::new();
    let light = light(&mock, DeviceVariant::Legacy);

    light.dispatch(&response(PacketCmd::Power, &[0x01]));
    assert_eq!(light.power(), Some(true));

    assert_eq!(light.set_power(true), 0);
    assert_eq!(light.pending(), 0);
    assert_eq!(light.set_power(false), 6);
}

#[tokio::test]
async fn setters_before_any_report_always_queue() {
    let mock = MockConnector::new();
    let light = light(&mock, DeviceVariant::Legacy);

    // nothing reported yet, so the cache can't short-circuit
    assert_eq!(light.set_power(true), 6);
    assert_eq!(light.set_power(true), 6);
    assert_eq!(light.pending(), 12);
}

#[tokio::test]
async fn color_responses_update_cache() {
    let mock = MockConnector::new();
    let segmented = light(&mock, DeviceVariant::Segmented);
    segmented.dispatch(&response(PacketCmd::Segment, &[0x01, 0x15, 10, 20, 30]));
    assert_eq!(segmented.color(), Some(Rgb::new(10, 20, 30)));
    assert_eq!(segmented.set_color(Rgb::new(10, 20, 30)), 0);

    let legacy = light(&mock, DeviceVariant::Legacy);
    legacy.dispatch(&response(PacketCmd::Color, &[0x02, 10, 20, 30]));
    assert_eq!(legacy.color(), Some(Rgb::new(10, 20, 30)));
}

#[tokio::test]
async fn effects() {
    let mock = MockConnector::new();
    let light = light(&mock, DeviceVariant::Legacy);

    assert_eq!(light.set_effect("Disco"), 0);
    assert_eq!(light.pending(), 0);
    assert_eq!(light.effect(), None);

    assert_eq!(light.set_effect("Rainbow"), 3);
    assert_eq!(light.effect().as_deref(), Some("Rainbow"));
    assert_eq!(light.set_effect("Rainbow"), 0);

    light.flush().await.unwrap();
    assert_eq!(mock.writes()[0], command(PacketCmd::Color, &[0x04, 10]));

    light.set_color(Rgb::BLUE);
    assert_eq!(light.effect(), None);
}

#[tokio::test]
async fn empty_flush_does_not_connect() {
    let mock = MockConnector::new();
    let light = light(&mock, DeviceVariant::Legacy);

    assert_eq!(light.flush().await.unwrap(), 0);
    assert_eq!(mock.connect_attempts(), 0);
    assert!(!light.is_connected());
}

#[tokio::test]
async fn connection_failure_preserves_buffer() {
    let mock = MockConnector::new();
    mock.fail_next_connects(2);
    let light = light(&mock, DeviceVariant::Legacy);

    light.set_power(true);
    let err = light.flush().await.unwrap_err();
    assert!(matches!(
        err,
        LightError::Transport(TransportError::ConnectFailed { attempts: 2, .. })
    ));
    assert_eq!(light.pending(), 6);
    assert!(mock.writes().is_empty());

    assert_eq!(light.flush().await.unwrap(), 6);
    assert_eq!(light.pending(), 0);
}

#[tokio::test]
async fn mid_flush_write_failure_keeps_everything_queued() {
    let mock = MockConnector::new();
    mock.fail_write_at(4);
    let light = light(&mock, DeviceVariant::Legacy);

    light.set_color(Rgb::RED);
    match light.flush().await {
        Err(LightError::PartialFlush { sent, total, .. }) => {
            assert_eq!(sent, 4);
            assert_eq!(total, 9);
        }
        other => panic!("expected partial flush, got {other:?}"),
    }
    assert_eq!(light.pending(), 9);
    assert!(!light.is_connected());

    // retry reconnects and resends the whole buffer
    assert_eq!(light.flush().await.unwrap(), 9);
    assert_eq!(mock.connect_attempts(), 2);
    assert_eq!(mock.writes().len(), 4 + 9);
    assert_eq!(light.pending(), 0);
}

#[tokio::test]
async fn observer_sees_every_response() {
    let mock = MockConnector::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let observer: Arc<dyn StateObserver> = {
        let calls = Arc::clone(&calls);
        Arc::new(move |_: &DeviceState| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    };
    let light = light(&mock, DeviceVariant::Legacy).with_observer(observer);

    light.dispatch(&response(PacketCmd::Power, &[0x01]));
    light.dispatch(&response(PacketCmd::Power, &[0x01]));
    // untracked command still counts as a response
    light.dispatch(&response(PacketCmd::Other(0x42), &[0x01]));
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // COMMAND echoes and corrupt frames don't reach the observer
    light.dispatch(&command(PacketCmd::Power, &[0x00]));
    let mut corrupt = response(PacketCmd::Power, &[0x00]);
    corrupt[19] ^= 0x01;
    light.dispatch(&corrupt);
    light.dispatch(&[0xAA, 0x01]);

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(light.power(), Some(true));
}

#[tokio::test]
async fn refresh_polls_the_light() {
    let mock = MockConnector::new();
    mock.respond_with(|written| match (written[0], written[1]) {
        (0xAA, 0x01) => Some(response(PacketCmd::Power, &[0x01])),
        (0xAA, 0x04) => Some(response(PacketCmd::Brightness, &[64])),
        (0xAA, 0x05) => Some(response(PacketCmd::Color, &[0x02, 1, 2, 3])),
        _ => None,
    });
    let light = light(&mock, DeviceVariant::Legacy);
    let mut updates = light.subscribe();

    light.refresh().await.unwrap();
    assert_eq!(mock.writes().len(), 9);

    let mut state = next_state(&mut updates).await;
    while state.color.is_none() || state.brightness.is_none() || state.power.is_none() {
        state = next_state(&mut updates).await;
    }
    assert_eq!(state.power, Some(true));
    assert_eq!(state.brightness, Some(64));
    assert_eq!(state.color, Some(Rgb::new(1, 2, 3)));
    assert_eq!(light.state(), state);
}

#[tokio::test]
async fn turn_on_maps_host_brightness_and_flushes() {
    let mock = MockConnector::new();
    let light = light(&mock, DeviceVariant::Legacy);

    let sent = light
        .turn_on(TurnOn {
            brightness: Some(1),
            color: None,
            effect: Some("Sunset".into()),
        })
        .await
        .unwrap();
    // power + request, brightness + request, effect
    assert_eq!(sent, 15);

    let writes = mock.writes();
    assert_eq!(writes[0], command(PacketCmd::Power, &[0x01]));
    assert_eq!(writes[6], command(PacketCmd::Brightness, &[0]));
    assert_eq!(writes[12], command(PacketCmd::Color, &[0x04, 1]));

    assert_eq!(light.turn_off().await.unwrap(), 6);
    assert_eq!(mock.writes()[15], command(PacketCmd::Power, &[0x00]));
}

#[tokio::test]
async fn teardown_discards_queue_and_session() {
    let mock = MockConnector::new();
    let light = light(&mock, DeviceVariant::Legacy);

    light.set_power(true);
    light.flush().await.unwrap();
    assert!(light.is_connected());

    light.set_power(false);
    light.teardown().await;
    assert_eq!(light.pending(), 0);
    assert!(!light.is_connected());
    assert!(!mock.is_connected());

    // not terminal: the next flush reconnects
    light.set_brightness(10);
    light.flush().await.unwrap();
    assert_eq!(mock.connect_attempts(), 2);
}
