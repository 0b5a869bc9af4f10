use crate::{
  error::RxError,
  observable::{BoxObservable, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  scheduler::SchedulerRef,
  subscription::{CompositeDisposable, Disposable, SingleAssignmentDisposable, Subscription},
  Value,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Mirror whichever source notifies first and drop the others. With no
/// sources the result never notifies.
pub fn amb<T: Value>(sources: Vec<BoxObservable<T>>) -> AmbOp<T> { AmbOp { sources } }

#[derive(Clone)]
pub struct AmbOp<T> {
  pub(crate) sources: Vec<BoxObservable<T>>,
}

struct Race<T> {
  winner: Mutex<Option<usize>>,
  slots: Vec<SingleAssignmentDisposable>,
  observer: SharedObserver<T>,
}

impl<T> Race<T> {
  /// Whether source `i` is, or just became, the winner.
  fn claim(&self, i: usize) -> bool {
    {
      let mut winner = self.winner.lock();
      if let Some(w) = *winner {
        return w == i;
      }
      *winner = Some(i);
    }
    tracing::trace!(winner = i, "amb race decided");
    self.slots.iter().enumerate().filter(|(j, _)| *j != i).for_each(|(_, s)| s.dispose());
    true
  }
}

impl<T: Value> Observable for AmbOp<T> {
  type Item = T;

  fn actual_subscribe(&self, observer: BoxObserver<T>, scheduler: Option<SchedulerRef>) -> Subscription {
    let race = Arc::new(Race {
      winner: Mutex::new(None),
      slots: self.sources.iter().map(|_| SingleAssignmentDisposable::new()).collect(),
      observer: SharedObserver::from_box(observer),
    });
    for (index, source) in self.sources.iter().enumerate() {
      let contender = Contender { index, race: race.clone() };
      let _ = race.slots[index].set(source.actual_subscribe(Box::new(contender), scheduler.clone()));
    }
    Subscription::new(CompositeDisposable::from_iter(race.slots.iter().map(|s| Subscription::new(s.clone()))))
  }
}

struct Contender<T> {
  index: usize,
  race: Arc<Race<T>>,
}

impl<T: Send + 'static> Observer<T> for Contender<T> {
  fn next(&mut self, value: T) {
    if self.race.claim(self.index) {
      self.race.observer.clone().next(value);
    }
  }

  fn error(&mut self, err: RxError) {
    if self.race.claim(self.index) {
      self.race.observer.clone().error(err);
    }
  }

  fn complete(&mut self) {
    if self.race.claim(self.index) {
      self.race.observer.clone().complete();
    }
  }

  fn is_finished(&self) -> bool { self.race.observer.is_finished() }
}
