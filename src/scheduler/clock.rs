use chrono::{Local, NaiveDateTime, Timelike};

/// 本地挂钟时间来源
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// 系统本地时间, 精确到秒
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        let now = Local::now().naive_local();
        now.with_nanosecond(0).unwrap_or(now)
    }
}
