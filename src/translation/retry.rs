//! 重试策略
//!
//! 对临时错误（限流、过载、5xx）做指数退避重试，其他错误立即返回。

use std::thread;
use std::time::Duration;

use crate::translation::error::{TranslationError, TranslationResult};

/// 默认最大尝试次数
pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;
/// 默认最小退避时间
pub const DEFAULT_BACKOFF_MIN: Duration = Duration::from_secs(1);
/// 默认最大退避时间
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(20);

/// 指数退避重试策略
///
/// 第 `n` 次失败后的等待时间为 `backoff_min * 2^(n-1)`，上限为 `backoff_max`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大尝试次数（包含第一次调用）
    pub max_attempts: u32,
    /// 首次退避时间
    pub backoff_min: Duration,
    /// 退避时间上限
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_min: DEFAULT_BACKOFF_MIN,
            backoff_max: DEFAULT_BACKOFF_MAX,
        }
    }
}

impl RetryPolicy {
    /// 不等待的重试策略，主要用于测试
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff_min: Duration::ZERO,
            backoff_max: Duration::ZERO,
        }
    }

    /// 第 `attempt` 次（从1开始）失败后的等待时间
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.backoff_min
            .checked_mul(factor)
            .unwrap_or(self.backoff_max)
            .min(self.backoff_max)
    }

    /// 执行操作，对临时错误按策略重试
    ///
    /// 闭包参数为当前尝试序号（从1开始）。
    pub fn run<T, F>(&self, mut operation: F) -> TranslationResult<T>
    where
        F: FnMut(u32) -> TranslationResult<T>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation(attempt) {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!("第 {} 次尝试成功", attempt);
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    tracing::error!("临时错误重试次数耗尽 ({}/{}): {}", attempt, max_attempts, e);
                    return Err(TranslationError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        "临时错误 {}/{}，{:.1}秒后重试: {}",
                        attempt,
                        max_attempts,
                        delay.as_secs_f32(),
                        e
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_and_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(5), Duration::from_secs(16));
        assert_eq!(policy.delay_for(6), Duration::from_secs(20));
        assert_eq!(policy.delay_for(40), Duration::from_secs(20));
    }

    #[test]
    fn transient_failures_use_every_attempt() {
        let policy = RetryPolicy::immediate(6);
        let mut calls = 0;
        let result: TranslationResult<()> = policy.run(|_| {
            calls += 1;
            Err(TranslationError::from_status(503, "overloaded"))
        });

        assert_eq!(calls, 6);
        match result {
            Err(TranslationError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 6),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn permanent_failure_is_attempted_once() {
        let policy = RetryPolicy::immediate(6);
        let mut calls = 0;
        let result: TranslationResult<()> = policy.run(|_| {
            calls += 1;
            Err(TranslationError::from_status(401, "invalid api key"))
        });

        assert_eq!(calls, 1);
        assert!(matches!(
            result,
            Err(TranslationError::ServiceError { status: 401, .. })
        ));
    }

    #[test]
    fn recovers_after_transient_error() {
        let policy = RetryPolicy::immediate(3);
        let result = policy.run(|attempt| {
            if attempt < 3 {
                Err(TranslationError::from_status(429, "rate limited"))
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn zero_ceiling_still_calls_once() {
        let policy = RetryPolicy::immediate(0);
        let mut calls = 0;
        let _ = policy.run(|_| -> TranslationResult<()> {
            calls += 1;
            Err(TranslationError::from_status(500, ""))
        });
        assert_eq!(calls, 1);
    }
}
