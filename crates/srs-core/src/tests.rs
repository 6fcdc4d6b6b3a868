//! Unit tests for srs-core primitives.

#[cfg(test)]
mod ids {
    use crate::{NodeId, PortNumber};

    #[test]
    fn index_roundtrip() {
        let id = NodeId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(NodeId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn ordering() {
        assert!(NodeId(0) < NodeId(1));
        assert!(PortNumber(100) > PortNumber(99));
    }
}

#[cfg(test)]
mod prefixes {
    use crate::route::{is_prefix, is_real_prefix};
    use crate::PortNumber;

    fn route(ports: &[u32]) -> Vec<PortNumber> {
        ports.iter().copied().map(PortNumber).collect()
    }

    #[test]
    fn empty_is_prefix_of_everything() {
        assert!(is_prefix(&route(&[]), &route(&[])));
        assert!(is_prefix(&route(&[]), &route(&[1, 2])));
        assert!(!is_real_prefix(&route(&[]), &route(&[])));
        assert!(is_real_prefix(&route(&[]), &route(&[1])));
    }

    #[test]
    fn proper_vs_improper() {
        assert!(is_prefix(&route(&[1, 2]), &route(&[1, 2])));
        assert!(!is_real_prefix(&route(&[1, 2]), &route(&[1, 2])));
        assert!(is_real_prefix(&route(&[1, 2]), &route(&[1, 2, 3])));
        assert!(!is_prefix(&route(&[1, 3]), &route(&[1, 2, 3])));
        assert!(!is_prefix(&route(&[1, 2, 3]), &route(&[1, 2])));
    }

    #[test]
    fn mutual_prefix_implies_equal() {
        let cases = [route(&[]), route(&[1]), route(&[1, 2]), route(&[2, 1])];
        for a in &cases {
            for b in &cases {
                if is_prefix(a, b) && is_prefix(b, a) {
                    assert_eq!(a, b);
                }
            }
        }
    }
}

#[cfg(test)]
mod rng {
    use crate::SimRng;

    #[test]
    fn same_seed_same_stream() {
        let mut a = SimRng::new(7);
        let mut b = SimRng::new(7);
        for _ in 0..32 {
            assert_eq!(a.random_f64(), b.random_f64());
        }
    }

    #[test]
    fn children_are_independent() {
        let mut root_a = SimRng::new(7);
        let mut root_b = SimRng::new(7);
        let mut child_a = root_a.child(1);
        let mut child_b = root_b.child(1);
        // Same derivation path → same stream.
        assert_eq!(child_a.random_f64(), child_b.random_f64());
        // Different offsets → different stream.
        let mut other = SimRng::new(7).child(2);
        let draws_a: Vec<f64> = (0..8).map(|_| child_a.random_f64()).collect();
        let draws_o: Vec<f64> = (0..8).map(|_| other.random_f64()).collect();
        assert_ne!(draws_a, draws_o);
    }

    #[test]
    fn pick_index_in_bounds() {
        let mut rng = SimRng::new(3);
        for _ in 0..100 {
            assert!(rng.pick_index(5) < 5);
        }
    }

    #[test]
    fn gen_bool_extremes() {
        let mut rng = SimRng::new(3);
        assert!(rng.gen_bool(1.0));
        assert!(!rng.gen_bool(0.0));
        // Out-of-range probabilities are clamped rather than panicking.
        assert!(rng.gen_bool(2.0));
        assert!(!rng.gen_bool(-1.0));
    }
}

#[cfg(test)]
mod instrument {
    use std::rc::Rc;

    use crate::{MeasurementReader, Tracker};

    #[test]
    fn counters_are_shared_by_name() {
        let tracker = Tracker::new();
        let a = tracker.counter("hits");
        let b = tracker.counter("hits");
        a.add(2.0);
        b.add(3.0);
        assert_eq!(tracker.counter("hits").value(), 5.0);
    }

    #[test]
    fn timer_guard_accumulates_on_drop() {
        let tracker = Tracker::new();
        let timer = tracker.timer("elapsed");
        {
            let _guard = timer.start();
        }
        assert!(tracker.counter("elapsed").value() >= 0.0);
    }

    #[test]
    fn session_snapshot_is_stable() {
        let tracker = Rc::new(Tracker::new());
        let reader = MeasurementReader::new(Rc::clone(&tracker));
        tracker.counter("n").add(4.0);
        let session = reader.session();
        tracker.counter("n").add(10.0);
        // Mutations after the snapshot do not leak into the session.
        assert_eq!(session.get("n"), 4.0);
    }

    #[test]
    fn rate_is_delta_over_delta() {
        let tracker = Rc::new(Tracker::new());
        let reader = MeasurementReader::new(Rc::clone(&tracker));
        tracker.counter("sum").add(10.0);
        tracker.counter("count").add(2.0);
        let first = reader.session();
        assert_eq!(first.rate("sum", "count"), 5.0);

        tracker.counter("sum").add(3.0);
        tracker.counter("count").add(1.0);
        let second = reader.session();
        // Only the interval since the first session counts.
        assert_eq!(second.rate("sum", "count"), 3.0);
    }

    #[test]
    fn rate_of_empty_interval_is_zero() {
        let tracker = Rc::new(Tracker::new());
        let reader = MeasurementReader::new(Rc::clone(&tracker));
        let _ = reader.session();
        let session = reader.session();
        assert_eq!(session.rate("sum", "count"), 0.0);
    }
}
