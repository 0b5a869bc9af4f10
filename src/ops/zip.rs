use crate::{
  error::RxError,
  observable::{BoxObservable, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  scheduler::SchedulerRef,
  subscription::{CompositeDisposable, Subscription},
  Value,
};
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};

/// Pair up the n-th values of every source. Completes as soon as one source
/// has completed and has nothing left to pair.
pub fn zip<T: Value>(sources: Vec<BoxObservable<T>>) -> ZipOp<T> { ZipOp { sources } }

#[derive(Clone)]
pub struct ZipOp<T> {
  pub(crate) sources: Vec<BoxObservable<T>>,
}

struct Queues<T> {
  queues: Vec<VecDeque<T>>,
  completed: Vec<bool>,
}

impl<T> Queues<T> {
  /// `Ok(Some(row))` when every queue had a value, `Err(())` when the stream
  /// can no longer produce a row.
  fn push(&mut self, i: usize, value: T) -> Result<Option<Vec<T>>, ()> {
    self.queues[i].push_back(value);
    if self.queues.iter().all(|q| !q.is_empty()) {
      Ok(Some(self.queues.iter_mut().filter_map(VecDeque::pop_front).collect()))
    } else if self.completed.iter().enumerate().all(|(j, c)| j == i || *c) {
      Err(())
    } else {
      Ok(None)
    }
  }
}

impl<T: Value> Observable for ZipOp<T> {
  type Item = Vec<T>;

  fn actual_subscribe(&self, observer: BoxObserver<Vec<T>>, scheduler: Option<SchedulerRef>) -> Subscription {
    let mut observer = SharedObserver::from_box(observer);
    let n = self.sources.len();
    if n == 0 {
      observer.complete();
      return Subscription::empty();
    }
    let queues = Arc::new(Mutex::new(Queues { queues: (0..n).map(|_| VecDeque::new()).collect(), completed: vec![false; n] }));
    let group = CompositeDisposable::new();
    for (index, source) in self.sources.iter().enumerate() {
      let lane = LaneObserver { index, queues: queues.clone(), observer: observer.clone() };
      group.add(source.actual_subscribe(Box::new(lane), scheduler.clone()));
    }
    Subscription::new(group)
  }
}

struct LaneObserver<T> {
  index: usize,
  queues: Arc<Mutex<Queues<T>>>,
  observer: SharedObserver<Vec<T>>,
}

impl<T: Value> Observer<T> for LaneObserver<T> {
  fn next(&mut self, value: T) {
    let step = self.queues.lock().push(self.index, value);
    match step {
      Ok(Some(row)) => self.observer.next(row),
      Ok(None) => {}
      Err(()) => self.observer.complete(),
    }
  }

  fn error(&mut self, err: RxError) { self.observer.error(err) }

  fn complete(&mut self) {
    let drained = {
      let mut q = self.queues.lock();
      q.completed[self.index] = true;
      q.queues[self.index].is_empty()
    };
    if drained {
      self.observer.complete();
    }
  }

  fn is_finished(&self) -> bool { self.observer.is_finished() }
}
