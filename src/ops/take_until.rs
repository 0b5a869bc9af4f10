use crate::{
  error::RxError,
  observable::{subscribe_detached, Observable},
  observer::{BoxObserver, Observer, SharedObserver},
  scheduler::SchedulerRef,
  subscription::{CompositeDisposable, Disposable, Subscription},
};

/// Mirror the source until `notifier` emits its first value.
#[derive(Clone)]
pub struct TakeUntilOp<S, N> {
  pub(crate) source: S,
  pub(crate) notifier: N,
}

impl<S: Observable, N: Observable> Observable for TakeUntilOp<S, N> {
  type Item = S::Item;

  fn actual_subscribe(&self, observer: BoxObserver<S::Item>, scheduler: Option<SchedulerRef>) -> Subscription {
    let observer = SharedObserver::from_box(observer);
    let group = CompositeDisposable::new();
    let stop = NotifierObserver { observer: observer.clone(), group: group.clone() };
    group.add(subscribe_detached(&self.notifier, Box::new(stop), scheduler.clone()));
    if !observer.is_closed() {
      group.add(self.source.actual_subscribe(Box::new(observer), scheduler));
    }
    Subscription::new(group)
  }
}

struct NotifierObserver<T> {
  observer: SharedObserver<T>,
  group: CompositeDisposable,
}

impl<T: Send + 'static, U> Observer<U> for NotifierObserver<T> {
  fn next(&mut self, _: U) {
    self.observer.complete();
    self.group.dispose();
  }

  fn error(&mut self, err: RxError) { self.observer.error(err) }

  fn complete(&mut self) {}
}
