use chrono::{DateTime, Utc};

/// Source of "now" for scheduling decisions.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[cfg(test)]
#[derive(Clone)]
pub struct ManualClock(std::rc::Rc<std::cell::Cell<DateTime<Utc>>>);

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(std::rc::Rc::new(std::cell::Cell::new(start)))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.0.set(now);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.0.set(self.0.get() + by);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.0.get()
    }
}
