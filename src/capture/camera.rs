use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::capture::source::{CaptureError, CaptureSource};
use crate::capture::test_pattern::TestPattern;
use crate::config::CameraConfig;

/// 运行时选定的图像来源
pub enum Camera {
    Command(CommandCamera),
    TestPattern(TestPattern),
}

impl Camera {
    pub fn from_config(config: &CameraConfig, test_source: bool) -> Self {
        if test_source {
            Camera::TestPattern(TestPattern::new())
        } else {
            Camera::Command(CommandCamera::new(
                &config.command,
                Duration::from_secs(config.timeout_secs),
            ))
        }
    }
}

impl CaptureSource for Camera {
    async fn capture(&mut self) -> Result<Vec<u8>, CaptureError> {
        match self {
            Camera::Command(camera) => camera.capture().await,
            Camera::TestPattern(pattern) => pattern.capture().await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Camera::Command(camera) => camera.name(),
            Camera::TestPattern(pattern) => pattern.name(),
        }
    }
}

/// 通过外部命令拍照 (fswebcam, rpicam-still 等)
///
/// 每次拍摄启动一个子进程: 打开设备、读取一帧、退出。
/// 超时或被取消时子进程会被杀掉, 设备不会被长期占用。
pub struct CommandCamera {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandCamera {
    /// `command` 的第一个元素是程序名, 其余为参数
    pub fn new(command: &[String], timeout: Duration) -> Self {
        let (program, args) = match command.split_first() {
            Some((program, args)) => (program.clone(), args.to_vec()),
            None => (String::new(), Vec::new()),
        };

        Self {
            program,
            args,
            timeout,
        }
    }
}

impl CaptureSource for CommandCamera {
    async fn capture(&mut self) -> Result<Vec<u8>, CaptureError> {
        debug!("Running {} {:?}", self.program, self.args);

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // 超时后 future 被丢弃, kill_on_drop 负责结束子进程
        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CaptureError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(CaptureError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if output.stdout.is_empty() {
            return Err(CaptureError::EmptyFrame);
        }

        // 只检查文件头不够: 截断的 JPEG 要到合成时才会失败, 会连累当天所有帧
        image::load_from_memory(&output.stdout).map_err(CaptureError::NotAnImage)?;

        debug!("Captured {} bytes from {}", output.stdout.len(), self.program);
        Ok(output.stdout)
    }

    fn name(&self) -> &str {
        &self.program
    }
}
