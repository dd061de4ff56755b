#[cfg(feature = "gtk4-adapter")]
fn main() {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use chart_lifecycle::core::{ChartId, SeriesPoint};
    use chart_lifecycle::feed::{ProviderError, SeriesFeed, SeriesProvider, SeriesQuery};
    use chart_lifecycle::lifecycle::{LifecycleConfig, UpdatePolicy};
    use chart_lifecycle::platform_gtk::{GlibRuntime, GtkCanvas, gtk_chart_backend};
    use chart_lifecycle::render::Color;
    use chart_lifecycle::{ChartLifecycleController, telemetry};
    use futures::future::LocalBoxFuture;
    use gtk4 as gtk;
    use gtk4::glib;
    use gtk4::prelude::*;

    /// Synthetic upstream: a slow oscillating series whose phase depends on
    /// the query, so filter changes are visible.
    struct WaveProvider;

    impl SeriesProvider for WaveProvider {
        fn fetch<'a>(
            &'a self,
            query: &'a SeriesQuery,
        ) -> LocalBoxFuture<'a, Result<Vec<SeriesPoint>, ProviderError>> {
            Box::pin(async move {
                glib::timeout_future(Duration::from_millis(150)).await;
                let now_ms = glib::real_time() / 1_000;
                let phase = query.symbol.len() as f64 + query.interval.len() as f64;
                Ok((0..240_i64)
                    .map(|i| {
                        let t = now_ms - (240 - i) * 60_000;
                        SeriesPoint::new(t, ((t / 60_000) as f64 * 0.05 + phase).sin() * 0.0004)
                    })
                    .collect())
            })
        }
    }

    let _ = telemetry::init_default_tracing();

    let app = gtk::Application::builder()
        .application_id("rs.chart.lifecycle.demos.dashboard")
        .build();

    app.connect_activate(|app| {
        let config =
            LifecycleConfig::default().with_update_policy(UpdatePolicy::CoalesceLatest);
        let controller = match ChartLifecycleController::new(
            gtk_chart_backend(Color::rgb(1.0, 1.0, 1.0)),
            Rc::new(GlibRuntime),
            config,
        ) {
            Ok(controller) => Rc::new(controller),
            Err(err) => {
                eprintln!("failed to build controller: {err}");
                return;
            }
        };

        let stack = gtk::Stack::new();
        let switcher = gtk::StackSwitcher::new();
        switcher.set_stack(Some(&stack));

        let sidebar = gtk::Revealer::builder()
            .transition_type(gtk::RevealerTransitionType::SlideRight)
            .transition_duration(300)
            .reveal_child(true)
            .child(&gtk::Label::new(Some("filters")))
            .build();
        let toggle = gtk::Button::with_label("Toggle sidebar");

        let body = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        body.append(&sidebar);
        body.append(&stack);
        stack.set_hexpand(true);
        stack.set_vexpand(true);

        let layout = gtk::Box::new(gtk::Orientation::Vertical, 6);
        layout.append(&switcher);
        layout.append(&toggle);
        layout.append(&body);

        let window = gtk::ApplicationWindow::builder()
            .application(app)
            .title("chart-lifecycle | dashboard panels")
            .default_width(1200)
            .default_height(720)
            .build();
        window.set_child(Some(&layout));

        let feeds = Rc::new(RefCell::new(Vec::new()));
        for (name, symbol) in [("funding", "BTCUSDT"), ("open-interest", "ETHUSDT")] {
            let area = gtk::DrawingArea::new();
            area.set_hexpand(true);
            area.set_vexpand(true);
            stack.add_titled(&area, Some(name), name);

            let controller = Rc::clone(&controller);
            let feeds = Rc::clone(&feeds);
            let canvas = Rc::new(GtkCanvas::new(area));
            let id = ChartId::new(name);
            glib::MainContext::default().spawn_local(async move {
                if let Err(err) = controller.mount_with_id(id.clone(), canvas).await {
                    eprintln!("{id}: mount failed: {err}");
                    return;
                }
                let query = SeriesQuery::new(symbol, "binance", "1h", "7d");
                let feed = SeriesFeed::new(Rc::clone(&controller), id, WaveProvider, query);
                feed.start(Duration::from_secs(3));
                feeds.borrow_mut().push(feed);
            });
        }

        stack.connect_visible_child_notify({
            let controller = Rc::clone(&controller);
            move |_| controller.notify_visibility_change()
        });
        toggle.connect_clicked({
            let controller = Rc::clone(&controller);
            let sidebar = sidebar.clone();
            move |_| {
                sidebar.set_reveal_child(!sidebar.reveals_child());
                controller.notify_layout_transition(Some(Duration::from_millis(
                    u64::from(sidebar.transition_duration()),
                )));
            }
        });
        window.connect_default_width_notify({
            let controller = Rc::clone(&controller);
            move |_| controller.notify_window_resize()
        });

        window.connect_close_request(move |_| {
            feeds.borrow_mut().clear();
            glib::Propagation::Proceed
        });
        window.present();
    });

    let _ = app.run();
}

#[cfg(not(feature = "gtk4-adapter"))]
fn main() {
    println!("run with: cargo run --features desktop --example gtk_dashboard_panels");
}
