//! End-to-end tests: operator chains across schedulers, subjects and the
//! future bridge.

use float_cmp::approx_eq;
use parking_lot::Mutex;
use rxrt::{prelude::*, testing::*};
use std::{
  sync::{mpsc, Arc},
  thread,
};

fn collector<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl FnMut(T) + Send + 'static) {
  let seen = Arc::new(Mutex::new(vec![]));
  let sink = seen.clone();
  (seen, move |v| sink.lock().push(v))
}

#[rxrt_macro::test]
fn basic_chain() {
  let (seen, push) = collector();
  from_iter(1..=10).map(|x| x * 2).filter(|x| *x > 10).take(3).subscribe(push);
  assert_eq!(*seen.lock(), vec![12, 14, 16]);
}

#[rxrt_macro::test]
fn scan_then_skip() {
  let (seen, push) = collector();
  from_iter(1..=5).scan(0, |acc, v| acc + v).skip(2).subscribe(push);
  assert_eq!(*seen.lock(), vec![6, 10, 15]);
}

#[rxrt_macro::test]
fn average_of_floats() {
  let (seen, push) = collector();
  from_iter([1.0, 2.0, 4.0])
    .reduce((0.0, 0usize), |(sum, n), v: f64| (sum + v, n + 1))
    .map(|(sum, n)| sum / n as f64)
    .subscribe(push);
  let avg = seen.lock()[0];
  assert!(approx_eq!(f64, avg, 7.0 / 3.0, ulps = 2));
}

#[rxrt_macro::test]
fn subject_broadcasts_to_every_pipeline() {
  let subject = Subject::new();
  let (tens, push_tens) = collector();
  let (raw, push_raw) = collector();
  subject.clone().map(|x: i32| x * 10).filter(|x| *x > 10).subscribe(push_tens);
  subject.clone().subscribe(push_raw);
  subject.next(1);
  subject.next(2);
  subject.complete();
  subject.next(3);
  assert_eq!(*tens.lock(), vec![20]);
  assert_eq!(*raw.lock(), vec![1, 2]);
}

#[rxrt_macro::test]
fn replay_serves_late_subscribers() {
  let published = of([1, 2, 3]).replay(Some(2), None);
  published.connect();
  let (seen, push) = collector();
  published.subscribe(push);
  assert_eq!(*seen.lock(), vec![2, 3]);
}

#[rxrt_macro::test]
fn grouped_word_counts() {
  let (seen, push) = collector();
  from_iter(["apple", "avocado", "banana", "blueberry", "cherry"])
    .group_by(|w| w.chars().next())
    .flat_map(|g| {
      let key = *g.key();
      g.count().map(move |n| (key, n))
    })
    .subscribe(push);
  assert_eq!(*seen.lock(), vec![(Some('a'), 2), (Some('b'), 2), (Some('c'), 1)]);
}

#[rxrt_macro::test]
fn retry_then_fall_back() {
  let (seen, push) = collector();
  throw::<i32>("down").retry_n(2).catch_with(of([9])).subscribe(push);
  assert_eq!(*seen.lock(), vec![9]);
}

#[rxrt_macro::test]
fn delayed_values_until_a_stop_signal() {
  let scheduler = TestScheduler::new();
  let xs = scheduler.create_hot_observable(vec![on_next(210, 1), on_next(230, 2), on_next(260, 3), on_completed(400)]);
  let stop = scheduler.create_hot_observable(vec![on_next(300, ())]);
  let results = scheduler.start_with_create(move || {
    xs.map(|v| v * 10).delay(Duration::from_millis(50)).take_until(stop)
  });
  assert_eq!(results.messages(), vec![on_next(260, 10), on_next(280, 20), on_completed(300)]);
}

#[rxrt_macro::test]
fn observe_on_moves_delivery_to_another_thread() {
  let (tx, rx) = mpsc::channel();
  let caller = thread::current().id();
  of([1, 2, 3])
    .observe_on(Arc::new(NewThreadScheduler::new()))
    .subscribe(move |v| {
      let _ = tx.send((v, thread::current().id()));
    });
  let got: Vec<_> = (0..3).map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap()).collect();
  assert_eq!(got.iter().map(|(v, _)| *v).collect::<Vec<_>>(), vec![1, 2, 3]);
  assert!(got.iter().all(|(_, id)| *id != caller));
}

#[rxrt_macro::test]
fn merge_sources_subscribed_on_other_threads() {
  let (tx, rx) = mpsc::channel();
  let sources = (0..3)
    .map(|_| from_iter(0..100).subscribe_on(Arc::new(NewThreadScheduler::new())).box_it())
    .collect();
  merge(sources).count().subscribe(move |n| {
    let _ = tx.send(n);
  });
  assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(300));
}

#[rxrt_macro::test]
fn share_connects_once_for_all_subscribers() {
  let scheduler = TestScheduler::new();
  let xs = scheduler.create_hot_observable(vec![on_next(210, 1), on_next(220, 2), on_completed(230)]);
  let shared = xs.clone().share();
  let first = scheduler.create_observer::<i32>();
  let second = scheduler.create_observer::<i32>();
  let (a, b) = (first.clone(), second.clone());
  let s = shared.clone();
  scheduler.schedule_at(200, move |_| {
    s.clone().subscribe_observer(a);
    s.subscribe_observer(b);
  });
  scheduler.start();
  assert_eq!(first.messages(), vec![on_next(210, 1), on_next(220, 2), on_completed(230)]);
  assert_eq!(second.messages(), first.messages());
  assert_eq!(xs.subscriptions(), vec![subscribe(200, 230)]);
}

#[rxrt_macro::test]
fn merge_with_never_keeps_the_finite_items() {
  let (seen, push) = collector();
  let done = Arc::new(Mutex::new(false));
  let d = done.clone();
  merge(vec![of([1, 2, 3]).box_it(), never().box_it()]).subscribe_all(push, |_| {}, move || *d.lock() = true);
  assert_eq!(*seen.lock(), vec![1, 2, 3]);
  assert!(!*done.lock());
}

#[rxrt_macro::test]
fn concat_appends_the_lists() {
  let cases: Vec<(Vec<i32>, Vec<i32>)> =
    vec![(vec![], vec![]), (vec![1], vec![]), (vec![], vec![2, 3]), (vec![1, 2], vec![3, 4, 5])];
  for (a, b) in cases {
    let (seen, push) = collector();
    concat(vec![from_iter(a.clone()).box_it(), from_iter(b.clone()).box_it()]).to_list().subscribe(push);
    let expected: Vec<i32> = a.into_iter().chain(b).collect();
    assert_eq!(*seen.lock(), vec![expected]);
  }
}

#[rxrt_macro::test]
fn flattened_buffers_restore_the_source() {
  let source: Vec<i32> = (1..=7).collect();
  for n in 1..=8 {
    let (seen, push) = collector();
    from_iter(source.clone()).buffer_with_count(n, None).flat_map(from_iter).subscribe(push);
    assert_eq!(*seen.lock(), source, "buffers of {n}");
  }
}

#[rxrt_macro::test]
fn repeat_multiplies_the_count() {
  for n in [0, 1, 2, 5, 17] {
    let (seen, push) = collector();
    of([1, 2, 3]).repeat_n(n).count().subscribe(push);
    assert_eq!(*seen.lock(), vec![3 * n], "repeated {n} times");
  }
}

#[rxrt_macro::test(local)]
async fn future_resolves_after_a_timer() {
  let fired = timer(Duration::from_millis(10)).map(|_| "fired").to_future().await;
  assert_eq!(fired, Ok("fired"));
}

#[cfg(feature = "tokio-scheduler")]
#[rxrt_macro::test(shared)]
async fn interval_on_tokio() {
  let ticks = interval(Duration::from_millis(5))
    .with_scheduler(Arc::new(TokioScheduler::current()))
    .take(3)
    .to_list()
    .to_future()
    .await;
  assert_eq!(ticks, Ok(vec![0, 1, 2]));
}
