//! 受监督进程的重启策略。
//!
//! 默认策略为 [`RestartPolicy::Never`]：每次启动器运行时每个进程只启动一次。

use std::time::Duration;

/// 重启之间的指数退避。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// 每次重试的倍数（默认 2.0）
    pub multiplier: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(300),
            multiplier: 2.0,
        }
    }
}

impl Backoff {
    /// 计算第 `attempt` 次（从 1 开始）重试的延迟。
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let delay_secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !delay_secs.is_finite() || delay_secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay_secs)
    }
}

/// 命令行中的重启策略选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum RestartMode {
    #[default]
    Never,
    OnFailure,
}

/// 受监督进程的重启决策。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum RestartPolicy {
    #[default]
    Never,
    /// 非零退出后重启，最多 `max_restarts` 次
    OnFailure { max_restarts: u32, backoff: Backoff },
}

impl RestartPolicy {
    /// 判断进程退出后是否应该重启。
    ///
    /// `restarts` 为已经执行过的重启次数。
    #[must_use]
    pub fn should_restart(&self, exit_code: i32, restarts: u32) -> bool {
        match self {
            Self::Never => false,
            Self::OnFailure { max_restarts, .. } => exit_code != 0 && restarts < *max_restarts,
        }
    }

    /// 第 `restart` 次重启前的等待时间
    #[must_use]
    pub fn delay_for_restart(&self, restart: u32) -> Duration {
        match self {
            Self::Never => Duration::ZERO,
            Self::OnFailure { backoff, .. } => backoff.delay_for_attempt(restart),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_restarts() {
        let policy = RestartPolicy::Never;
        assert!(!policy.should_restart(1, 0));
        assert!(!policy.should_restart(0, 0));
    }

    #[test]
    fn test_on_failure_limit() {
        let policy = RestartPolicy::OnFailure {
            max_restarts: 2,
            backoff: Backoff::default(),
        };
        assert!(policy.should_restart(1, 0));
        assert!(policy.should_restart(137, 1));
        assert!(!policy.should_restart(1, 2));
        // 正常退出不会重启
        assert!(!policy.should_restart(0, 0));
    }

    #[test]
    fn test_exponential_backoff() {
        let backoff = Backoff {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        };
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(backoff.delay_for_attempt(5), Duration::from_secs(10));
        assert_eq!(backoff.delay_for_attempt(u32::MAX), Duration::from_secs(10));
    }
}
