mod support;

use chart_lifecycle::core::ChartId;
use chart_lifecycle::error::ChartError;
use chart_lifecycle::library::{ChartConfig, RedrawMode};
use chart_lifecycle::lifecycle::ChartHost;

use support::{FakeCanvas, HEIGHT, LibraryCall, RecordingBackend, series};

fn host() -> (ChartHost<RecordingBackend>, RecordingBackend) {
    let backend = RecordingBackend::default();
    (ChartHost::new(backend.clone()), backend)
}

#[test]
fn create_registers_a_live_record() {
    let (host, backend) = host();
    let id = ChartId::new("funding");

    let view = host
        .create(&id, &FakeCanvas::laid_out(500, HEIGHT), &ChartConfig::default())
        .expect("create");

    assert!(view.initialized && !view.destroyed);
    assert!(view.raw.is_empty());
    assert!(host.is_live(&id));
    assert_eq!(host.live_count(), 1);
    assert_eq!(
        backend.calls(),
        vec![LibraryCall::Construct {
            width: 500,
            height: HEIGHT
        }]
    );
}

#[test]
fn create_rejects_duplicates_and_tombstones() {
    let (host, backend) = host();
    let id = ChartId::new("oi");
    let canvas = FakeCanvas::laid_out(500, HEIGHT);
    host.create(&id, &canvas, &ChartConfig::default())
        .expect("create");

    let duplicate = host
        .create(&id, &canvas, &ChartConfig::default())
        .expect_err("duplicate");
    assert!(matches!(duplicate, ChartError::DuplicateChart { .. }));

    assert!(host.destroy(&id).expect("destroy"));
    let revived = host
        .create(&id, &canvas, &ChartConfig::default())
        .expect_err("tombstone");
    assert!(matches!(revived, ChartError::ChartDestroyed { .. }));
    assert_eq!(backend.constructs(), 1);
}

#[test]
fn create_needs_a_canvas_with_area() {
    let (host, backend) = host();
    let detached = FakeCanvas::default();
    let flat = FakeCanvas::laid_out(400, 0);

    for canvas in [detached, flat] {
        let err = host
            .create(&ChartId::new("basis"), &canvas, &ChartConfig::default())
            .expect_err("no area");
        assert!(matches!(err, ChartError::CanvasUnavailable { .. }));
    }
    assert_eq!(backend.constructs(), 0);
    assert!(host.get(&ChartId::new("basis")).is_none());
}

#[test]
fn destroy_is_idempotent_and_clears_data() {
    let (host, backend) = host();
    let id = ChartId::new("lsr");
    host.create(&id, &FakeCanvas::laid_out(500, HEIGHT), &ChartConfig::default())
        .expect("create");
    host.apply_dataset(&id, series(&[1.0, 2.0])).expect("apply");

    assert!(host.destroy(&id).expect("first destroy"));
    assert!(!host.destroy(&id).expect("second destroy"));
    assert!(!host.destroy(&ChartId::new("never-created")).expect("unknown id"));

    let tombstone = host.get(&id).expect("tombstone");
    assert!(tombstone.destroyed);
    assert!(tombstone.raw.is_empty());
    assert_eq!(backend.destroys(), 1);
    assert_eq!(host.live_count(), 0);
}

#[test]
fn calls_on_destroyed_or_unknown_charts_never_reach_the_library() {
    let (host, backend) = host();
    let id = ChartId::new("volume");
    host.create(&id, &FakeCanvas::laid_out(500, HEIGHT), &ChartConfig::default())
        .expect("create");
    host.destroy(&id).expect("destroy");
    let calls = backend.calls();

    assert!(matches!(
        host.apply_dataset(&id, series(&[1.0])),
        Err(ChartError::ChartDestroyed { .. })
    ));
    assert!(matches!(host.redraw(&id), Err(ChartError::ChartDestroyed { .. })));
    assert!(matches!(
        host.apply_dataset(&ChartId::new("ghost"), series(&[1.0])),
        Err(ChartError::UnknownChart { .. })
    ));
    assert_eq!(backend.calls(), calls);
}

#[test]
fn redraw_uses_the_configured_mode() {
    let (host, backend) = host();
    let id = ChartId::new("animated");
    let config = ChartConfig::default().with_update_mode(RedrawMode::Animated);
    host.create(&id, &FakeCanvas::laid_out(500, HEIGHT), &config)
        .expect("create");

    host.redraw(&id).expect("redraw");
    host.redraw_with(&id, RedrawMode::Immediate).expect("redraw");

    let calls = backend.calls();
    assert_eq!(calls[1], LibraryCall::Redraw(RedrawMode::Animated));
    assert_eq!(calls[2], LibraryCall::Redraw(RedrawMode::Immediate));
}

#[test]
fn apply_dataset_canonicalizes_before_binding() {
    let (host, backend) = host();
    let id = ChartId::new("funding");
    host.create(&id, &FakeCanvas::laid_out(500, HEIGHT), &ChartConfig::default())
        .expect("create");
    let mut unordered = series(&[1.0, 2.0, 3.0]);
    unordered.reverse();
    unordered.push(unordered[0].clone());

    let bound = host.apply_dataset(&id, unordered).expect("apply");

    assert_eq!(bound, 3);
    assert_eq!(backend.calls()[1], LibraryCall::SetData { lens: vec![3] });
    let raw = host.get(&id).expect("record").raw;
    assert!(raw.windows(2).all(|pair| pair[0].timestamp < pair[1].timestamp));
}
