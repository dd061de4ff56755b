use chart_lifecycle::core::{SeriesDomain, SeriesPoint, Viewport, canonicalize_series, project_line_segments};
use proptest::prelude::*;

fn value_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        8 => -10_000.0f64..10_000.0,
        1 => Just(f64::NAN),
        1 => Just(f64::INFINITY),
        1 => Just(f64::NEG_INFINITY),
    ]
}

fn point_strategy() -> impl Strategy<Value = SeriesPoint> {
    (0_i64..50, value_strategy()).prop_map(|(minute, value)| SeriesPoint::new(minute * 60_000, value))
}

fn canonicalize_contract(mut points: Vec<SeriesPoint>) -> Vec<SeriesPoint> {
    points.retain(|point| point.value.is_finite());
    points.sort_by_key(|point| point.timestamp);

    let mut deduped: Vec<SeriesPoint> = Vec::with_capacity(points.len());
    for point in points {
        if let Some(last) = deduped.last_mut() {
            if last.timestamp == point.timestamp {
                *last = point;
                continue;
            }
        }
        deduped.push(point);
    }
    deduped
}

proptest! {
    #[test]
    fn canonicalization_matches_contract(points in prop::collection::vec(point_strategy(), 0..200)) {
        let expected = canonicalize_contract(points.clone());
        let canonical = canonicalize_series(points);

        prop_assert_eq!(canonical.len(), expected.len());
        for (actual, expected) in canonical.iter().zip(&expected) {
            prop_assert_eq!(actual.timestamp, expected.timestamp);
            prop_assert_eq!(actual.value.to_bits(), expected.value.to_bits());
        }
    }

    #[test]
    fn canonicalization_is_idempotent(points in prop::collection::vec(point_strategy(), 0..200)) {
        let once = canonicalize_series(points);
        let twice = canonicalize_series(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn canonical_timestamps_are_strictly_increasing(points in prop::collection::vec(point_strategy(), 0..200)) {
        let canonical = canonicalize_series(points);
        prop_assert!(canonical.windows(2).all(|pair| pair[0].timestamp < pair[1].timestamp));
    }

    #[test]
    fn projected_segments_stay_inside_the_viewport(
        values in prop::collection::vec(-1_000.0f64..1_000.0, 2..100),
        width in 1_u32..2_000,
        height in 1_u32..1_000,
    ) {
        let samples: Vec<(i64, f64)> = values
            .iter()
            .enumerate()
            .map(|(index, &value)| (index as i64 * 1_000, value))
            .collect();
        let domain = SeriesDomain::fit(&samples)
            .expect("fit")
            .expect("non-empty");
        let segments = project_line_segments(&samples, domain, Viewport::new(width, height))
            .expect("project");

        prop_assert_eq!(segments.len(), samples.len() - 1);
        let (w, h) = (f64::from(width) + 1e-6, f64::from(height) + 1e-6);
        for segment in segments {
            prop_assert!((-1e-6..=w).contains(&segment.x1) && (-1e-6..=w).contains(&segment.x2));
            prop_assert!((-1e-6..=h).contains(&segment.y1) && (-1e-6..=h).contains(&segment.y2));
        }
    }
}
