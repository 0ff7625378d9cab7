//! Greeting compositions: single chains and left-associative joins.

use std::time::Duration;

use tributary_core::{FutureHandle, Stopwatch, TaskError, TaskScheduler, TimingReport};

use crate::services::HelloWorldService;

pub struct HelloComposer {
    scheduler: TaskScheduler,
    service: HelloWorldService,
    /// Delay of the extra " Hi ..." / " Bye!" fragments.
    extra_latency: Duration,
}

impl HelloComposer {
    pub fn new(scheduler: TaskScheduler, service: HelloWorldService, extra_latency: Duration) -> Self {
        Self {
            scheduler,
            service,
            extra_latency,
        }
    }

    /// "hello world" upper-cased.
    pub fn hello_world(&self) -> FutureHandle<String> {
        let hws = self.service.clone();
        self.scheduler
            .submit(move || hws.hello_world())
            .map(|s| s.to_uppercase())
    }

    /// "test - 4"
    pub fn test_length(&self) -> FutureHandle<String> {
        let hws = self.service.clone();
        self.scheduler
            .submit(move || hws.test_length("test"))
            .map(|s| {
                let len = s.len();
                format!("{s} - {len}")
            })
    }

    pub fn two_calls(&self) -> Result<(String, TimingReport), TaskError> {
        self.joined("two_calls", &[])
    }

    pub fn three_calls(&self) -> Result<(String, TimingReport), TaskError> {
        self.joined("three_calls", &[" Hi Tributary!"])
    }

    pub fn four_calls(&self) -> Result<(String, TimingReport), TaskError> {
        self.joined("four_calls", &[" Hi Tributary!", " Bye!"])
    }

    /// hello ⋈ world ⋈ extra[0] ⋈ extra[1] ..., then upper-cased.
    fn joined(&self, label: &str, extras: &[&'static str]) -> Result<(String, TimingReport), TaskError> {
        let watch = Stopwatch::start(label);

        let hws = self.service.clone();
        let hello = self.scheduler.submit(move || hws.hello());
        let hws = self.service.clone();
        let world = self.scheduler.submit(move || hws.world());

        let mut joined = hello.combine(&world, |h, w| h + &w);
        for &extra in extras {
            let latency = self.extra_latency;
            let fragment = self.scheduler.submit(move || {
                std::thread::sleep(latency);
                extra.to_string()
            });
            joined = joined.combine(&fragment, |previous, current| previous + &current);
        }

        let greeting = joined.map(|s| s.to_uppercase()).get()?;
        Ok((greeting, watch.stop()))
    }
}
