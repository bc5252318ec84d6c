use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::capture::CaptureSource;
use crate::config::ScheduleConfig;
use crate::delivery::Delivery;
use crate::event::CapturedImage;
use crate::scheduler::clock::Clock;
use crate::timelapse::{Accumulator, TimelapseEncoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    /// 日切或退出时正在合成、投递
    Draining,
    Stopped,
}

/// 白天窗口, 两端都不包含: `start_hour < hour < end_hour`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaylightWindow {
    start_hour: u32,
    end_hour: u32,
}

impl DaylightWindow {
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    pub fn contains(&self, hour: u32) -> bool {
        self.start_hour < hour && hour < self.end_hour
    }
}

/// 拍摄/累积/日切调度循环
///
/// 单任务运行: 每个 tick 内拍照、合成、投递依次完成, 唯一的挂起点是 tick 之间的等待。
/// 累积的图像在日切时合成并投递一次, 退出时再无条件投递一次。
pub struct Scheduler<S, D, C> {
    source: S,
    delivery: D,
    clock: C,
    encoder: TimelapseEncoder,
    interval: TimeDelta,
    daylight: DaylightWindow,
    tick_period: Duration,
    accumulator: Accumulator,
    last_capture: NaiveDateTime,
    last_date: NaiveDate,
    state: SchedulerState,
}

impl<S, D, C> Scheduler<S, D, C>
where
    S: CaptureSource,
    D: Delivery,
    C: Clock,
{
    pub fn new(
        source: S,
        delivery: D,
        clock: C,
        schedule: &ScheduleConfig,
        encoder: TimelapseEncoder,
    ) -> Self {
        let now = clock.now();
        let interval = i64::try_from(schedule.interval_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);

        Self {
            source,
            delivery,
            clock,
            encoder,
            interval,
            daylight: DaylightWindow::new(
                schedule.daylight_start_hour,
                schedule.daylight_end_hour,
            ),
            tick_period: Duration::from_millis(schedule.tick_millis),
            accumulator: Accumulator::new(),
            last_capture: now,
            last_date: now.date(),
            state: SchedulerState::Running,
        }
    }

    /// 运行直到 `cancel` 被触发, 然后执行一次退出投递
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(
            "Scheduler started: source={}, interval={}s, frame={}ms",
            self.source.name(),
            self.interval.num_seconds(),
            self.encoder.frame_duration_ms()
        );

        loop {
            if cancel.is_cancelled() {
                info!("Scheduler received cancellation signal");
                break;
            }

            let now = self.clock.now();
            self.tick(now).await;

            tokio::select! {
                _ = sleep(self.tick_period) => {}
                _ = cancel.cancelled() => {
                    info!("Scheduler cancelled during tick wait");
                    break;
                }
            }
        }

        let now = self.clock.now();
        self.shutdown(now).await;
    }

    /// 处理一个 tick: 先按间隔和白天窗口决定是否拍照, 再检查日切
    pub async fn tick(&mut self, now: NaiveDateTime) {
        if self.state != SchedulerState::Running {
            return;
        }

        if self.should_capture(now) {
            self.capture(now).await;
        }

        let today = now.date();
        if today != self.last_date {
            info!("Day rolled over from {} to {}", self.last_date, today);
            self.state = SchedulerState::Draining;
            self.drain(now).await;
            self.last_date = today;
            self.state = SchedulerState::Running;
        }
    }

    /// 退出投递; 重复调用不会再次投递
    pub async fn shutdown(&mut self, now: NaiveDateTime) {
        if self.state == SchedulerState::Stopped {
            debug!("Scheduler already stopped");
            return;
        }

        self.state = SchedulerState::Draining;
        self.drain(now).await;
        self.state = SchedulerState::Stopped;
        info!("Scheduler stopped");
    }

    fn should_capture(&mut self, now: NaiveDateTime) -> bool {
        let elapsed = now - self.last_capture;
        if elapsed < TimeDelta::zero() {
            warn!(
                "Clock went backwards by {}s, resetting capture baseline",
                -elapsed.num_seconds()
            );
            self.last_capture = now;
            return false;
        }

        elapsed >= self.interval && self.daylight.contains(now.hour())
    }

    // 失败时不更新 last_capture, 下一个 tick 立即重试
    async fn capture(&mut self, now: NaiveDateTime) {
        match self.source.capture().await {
            Ok(data) => {
                self.accumulator.append(CapturedImage::new(now, data));
                self.last_capture = now;
                info!(
                    "Captured image at {} ({} today)",
                    now.format("%H:%M:%S"),
                    self.accumulator.len()
                );
            }
            Err(e) => {
                warn!("Capture from {} failed: {}", self.source.name(), e);
            }
        }
    }

    // 无论合成或投递是否成功, 结束后都清空累积器
    async fn drain(&mut self, now: NaiveDateTime) {
        if self.accumulator.is_empty() {
            info!("No images captured, no timelapse created");
            return;
        }

        let count = self.accumulator.len();
        let images = self.accumulator.snapshot().to_vec();
        let encoder = self.encoder.clone();

        match tokio::task::spawn_blocking(move || encoder.encode(&images, now)).await {
            Ok(Ok(artifact)) => {
                info!(
                    "Created {} from {} images ({} bytes)",
                    artifact.filename,
                    count,
                    artifact.data.len()
                );
                match self.delivery.deliver(&artifact).await {
                    Ok(()) => info!("Delivered {}", artifact.filename),
                    Err(e) => error!("Failed to deliver timelapse of {} images: {}", count, e),
                }
            }
            Ok(Err(e)) => error!("Failed to encode timelapse of {} images: {}", count, e),
            Err(e) => error!("Encoding task for {} images failed: {}", count, e),
        }

        self.accumulator.clear();
    }
}
