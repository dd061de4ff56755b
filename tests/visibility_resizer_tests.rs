mod support;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use chart_lifecycle::core::{CanvasBox, ChartId};
use chart_lifecycle::error::{ChartError, ChartResult};
use chart_lifecycle::lifecycle::{ResizeOptions, ResizeSink, VisibilityResizer};
use chart_lifecycle::runtime::TokioRuntime;
use tokio::task::LocalSet;
use tokio::time::sleep;

use support::FakeCanvas;

type Dispatched = Rc<RefCell<Vec<(ChartId, CanvasBox)>>>;

fn resizer() -> (VisibilityResizer, Dispatched) {
    let dispatched: Dispatched = Rc::default();
    let sink: ResizeSink = {
        let dispatched = Rc::clone(&dispatched);
        Rc::new(move |id: &ChartId, size: CanvasBox| -> ChartResult<()> {
            dispatched.borrow_mut().push((id.clone(), size));
            Ok(())
        })
    };
    (
        VisibilityResizer::new(Rc::new(TokioRuntime), ResizeOptions::default(), sink),
        dispatched,
    )
}

#[test]
fn hidden_container_never_reaches_the_chart() {
    let (resizer, dispatched) = resizer();
    let canvas = FakeCanvas::laid_out(400, 200);
    let id = ChartId::new("funding");
    resizer.attach(&id, Rc::new(canvas.clone())).expect("attach");

    canvas.resize_to(CanvasBox::hidden(480, 200));
    canvas.resize_to(CanvasBox::new(0, 0));
    assert!(dispatched.borrow().is_empty());
    assert_eq!(resizer.stats().hidden_skipped, 2);

    canvas.resize_to(CanvasBox::new(480, 200));
    assert_eq!(
        dispatched.borrow().as_slice(),
        &[(id, CanvasBox::new(480, 200))]
    );
}

#[test]
fn visible_change_resizes_exactly_once() {
    let (resizer, dispatched) = resizer();
    let canvas = FakeCanvas::laid_out(400, 200);
    resizer
        .attach(&ChartId::new("oi"), Rc::new(canvas.clone()))
        .expect("attach");

    canvas.resize_to(CanvasBox::new(520, 200));
    canvas.fire();
    canvas.fire();

    assert_eq!(dispatched.borrow().len(), 1);
}

#[test]
fn hidden_to_visible_toggle_resizes_on_the_visible_edge_only() {
    let (resizer, dispatched) = resizer();
    let canvas = FakeCanvas::laid_out(400, 200);
    resizer
        .attach(&ChartId::new("lsr"), Rc::new(canvas.clone()))
        .expect("attach");

    canvas.resize_to(CanvasBox::hidden(400, 200));
    assert_eq!(dispatched.borrow().len(), 0);

    // Same size as before hiding: still one resize, the tab may have
    // reflowed while hidden.
    canvas.resize_to(CanvasBox::new(400, 200));
    assert_eq!(dispatched.borrow().len(), 1);

    canvas.resize_to(CanvasBox::hidden(400, 200));
    assert_eq!(dispatched.borrow().len(), 1);
}

#[test]
fn detach_releases_once_and_is_idempotent() {
    let (resizer, dispatched) = resizer();
    let canvas = FakeCanvas::laid_out(400, 200);
    let id = ChartId::new("basis");
    resizer.attach(&id, Rc::new(canvas.clone())).expect("attach");
    assert_eq!(resizer.active_observers(), 1);

    assert!(resizer.detach(&id));
    assert!(!resizer.detach(&id));

    assert_eq!(canvas.releases(), 1);
    assert_eq!(canvas.active_subscriptions(), 0);
    assert_eq!(resizer.active_observers(), 0);

    // A callback the host queued before detach lands afterwards.
    canvas.set_box(CanvasBox::new(900, 300));
    for observer in canvas.every_observer() {
        observer(CanvasBox::new(900, 300));
    }
    assert!(dispatched.borrow().is_empty());
}

#[test]
fn attaching_twice_is_rejected() {
    let (resizer, _) = resizer();
    let canvas = FakeCanvas::laid_out(400, 200);
    let id = ChartId::new("volume");
    resizer.attach(&id, Rc::new(canvas.clone())).expect("attach");

    let err = resizer
        .attach(&id, Rc::new(canvas.clone()))
        .expect_err("second attach");
    assert!(matches!(err, ChartError::DuplicateChart { .. }));
    assert_eq!(canvas.active_subscriptions(), 1);
}

#[test]
fn unobservable_container_fails_attach() {
    let (resizer, _) = resizer();
    let canvas = FakeCanvas::laid_out(400, 200);
    canvas.refuse_observers();

    let err = resizer
        .attach(&ChartId::new("oi"), Rc::new(canvas))
        .expect_err("attach");
    assert!(matches!(err, ChartError::ObserverUnavailable(_)));
    assert_eq!(resizer.active_observers(), 0);
}

#[test]
fn dropping_the_resizer_releases_every_observer() {
    let (resizer, _) = resizer();
    let first = FakeCanvas::laid_out(400, 200);
    let second = FakeCanvas::laid_out(400, 200);
    resizer
        .attach(&ChartId::new("a"), Rc::new(first.clone()))
        .expect("attach a");
    resizer
        .attach(&ChartId::new("b"), Rc::new(second.clone()))
        .expect("attach b");

    drop(resizer);

    assert_eq!(first.active_subscriptions(), 0);
    assert_eq!(second.active_subscriptions(), 0);
}

#[tokio::test(start_paused = true)]
async fn window_resize_burst_is_debounced_into_one_pass() {
    LocalSet::new()
        .run_until(async {
            let (resizer, dispatched) = resizer();
            let canvas = FakeCanvas::laid_out(400, 200);
            resizer
                .attach(&ChartId::new("oi"), Rc::new(canvas.clone()))
                .expect("attach");

            for width in [410, 420, 430, 440, 450] {
                canvas.set_box(CanvasBox::new(width, 200));
                resizer.notify_window_resize();
                sleep(Duration::from_millis(50)).await;
            }
            assert!(dispatched.borrow().is_empty());

            sleep(Duration::from_millis(250)).await;
            assert_eq!(
                dispatched.borrow().iter().map(|(_, size)| *size).collect::<Vec<_>>(),
                vec![CanvasBox::new(450, 200)]
            );
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn window_pass_skips_hidden_charts() {
    LocalSet::new()
        .run_until(async {
            let (resizer, dispatched) = resizer();
            let visible = FakeCanvas::laid_out(400, 200);
            let hidden = FakeCanvas::laid_out(400, 200);
            hidden.set_box(CanvasBox::hidden(400, 200));
            resizer
                .attach(&ChartId::new("visible"), Rc::new(visible))
                .expect("attach visible");
            resizer
                .attach(&ChartId::new("hidden"), Rc::new(hidden))
                .expect("attach hidden");

            resizer.notify_window_resize();
            sleep(Duration::from_millis(300)).await;

            let dispatched = dispatched.borrow();
            assert_eq!(dispatched.len(), 1);
            assert_eq!(dispatched[0].0.as_str(), "visible");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn layout_transition_schedules_one_resize_after_its_duration() {
    LocalSet::new()
        .run_until(async {
            let (resizer, dispatched) = resizer();
            let canvas = FakeCanvas::laid_out(400, 200);
            resizer
                .attach(&ChartId::new("funding"), Rc::new(canvas.clone()))
                .expect("attach");

            canvas.set_box(CanvasBox::new(640, 200));
            resizer.notify_layout_transition(None);
            sleep(Duration::from_millis(100)).await;
            // A second toggle replaces the pending pass.
            resizer.notify_layout_transition(None);

            sleep(Duration::from_millis(299)).await;
            assert!(dispatched.borrow().is_empty());

            sleep(Duration::from_millis(2)).await;
            assert_eq!(dispatched.borrow().len(), 1);

            sleep(Duration::from_secs(1)).await;
            assert_eq!(dispatched.borrow().len(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn custom_transition_duration_is_honoured() {
    LocalSet::new()
        .run_until(async {
            let (resizer, dispatched) = resizer();
            let canvas = FakeCanvas::laid_out(400, 200);
            resizer
                .attach(&ChartId::new("funding"), Rc::new(canvas.clone()))
                .expect("attach");

            resizer.notify_layout_transition(Some(Duration::from_millis(50)));
            sleep(Duration::from_millis(60)).await;
            assert_eq!(dispatched.borrow().len(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn visibility_change_only_touches_changed_charts() {
    LocalSet::new()
        .run_until(async {
            let (resizer, dispatched) = resizer();
            let unchanged = FakeCanvas::laid_out(400, 200);
            let revealed = FakeCanvas::laid_out(400, 200);
            revealed.set_box(CanvasBox::hidden(400, 200));
            resizer
                .attach(&ChartId::new("unchanged"), Rc::new(unchanged))
                .expect("attach unchanged");
            resizer
                .attach(&ChartId::new("revealed"), Rc::new(revealed.clone()))
                .expect("attach revealed");

            revealed.set_box(CanvasBox::new(720, 240));
            resizer.notify_visibility_change();
            sleep(Duration::from_millis(1)).await;

            let dispatched = dispatched.borrow();
            assert_eq!(dispatched.len(), 1);
            assert_eq!(dispatched[0].0.as_str(), "revealed");
            assert_eq!(dispatched[0].1, CanvasBox::new(720, 240));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn pending_passes_die_with_the_resizer() {
    LocalSet::new()
        .run_until(async {
            let (resizer, dispatched) = resizer();
            let canvas = FakeCanvas::laid_out(400, 200);
            resizer
                .attach(&ChartId::new("oi"), Rc::new(canvas))
                .expect("attach");

            resizer.notify_window_resize();
            resizer.notify_layout_transition(None);
            drop(resizer);

            sleep(Duration::from_secs(1)).await;
            assert!(dispatched.borrow().is_empty());
        })
        .await;
}
