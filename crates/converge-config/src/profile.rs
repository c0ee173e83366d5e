//! 待機・リトライのプロファイル定義

use crate::error::{ConfigError, Result};
use converge_core::{Backoff, RetryPolicy, WaitSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// 設定ファイル全体
///
/// ```yaml
/// waits:
///   transit_gateway.create:
///     timeout_secs: 900
///     poll_interval_ms: 10000
/// retries:
///   transit_gateway.delete:
///     max_elapsed_secs: 300
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvergeConfig {
    /// `"<kind>.<operation>"` をキーにした待機プロファイル
    #[serde(default)]
    pub waits: BTreeMap<String, WaitProfile>,

    /// `"<kind>.<operation>"` をキーにしたリトライプロファイル
    #[serde(default)]
    pub retries: BTreeMap<String, RetryProfile>,
}

impl ConvergeConfig {
    /// プリセットにプロファイルを重ねた WaitSpec を返す
    ///
    /// プロファイルが無ければプリセットをそのまま返す。
    pub fn wait_spec(&self, name: &str, preset: WaitSpec) -> Result<WaitSpec> {
        match self.waits.get(name) {
            Some(profile) => {
                tracing::debug!("Applying wait profile '{}'", name);
                let spec = profile.apply_to(preset);
                spec.validate().map_err(|source| ConfigError::InvalidProfile {
                    name: name.to_string(),
                    source,
                })?;
                Ok(spec)
            }
            None => Ok(preset),
        }
    }

    /// プリセットにリトライプロファイルを重ねた RetryPolicy を返す
    pub fn retry_policy<E>(&self, name: &str, preset: RetryPolicy<E>) -> Result<RetryPolicy<E>> {
        match self.retries.get(name) {
            Some(profile) => {
                tracing::debug!("Applying retry profile '{}'", name);
                profile.validate(name)?;
                Ok(profile.apply_to(preset))
            }
            None => Ok(preset),
        }
    }
}

/// 待機プロファイル
///
/// 指定したフィールドだけがプリセットを上書きする。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Vec<String>>,

    /// タイムアウト（秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// ポーリング間隔（ミリ秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,

    /// 初回ポーリング前の待機時間（ミリ秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treat_not_found_as_target: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_not_found_consecutive: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_target_consecutive: Option<u32>,
}

impl WaitProfile {
    pub fn apply_to(&self, mut spec: WaitSpec) -> WaitSpec {
        if let Some(pending) = &self.pending {
            spec.pending = pending.iter().map(Into::into).collect();
        }
        if let Some(target) = &self.target {
            spec.target = target.iter().map(Into::into).collect();
        }
        if let Some(failure) = &self.failure {
            spec.failure = failure.iter().map(Into::into).collect();
        }
        if let Some(secs) = self.timeout_secs {
            spec.timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = self.poll_interval_ms {
            spec.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.delay_ms {
            spec.delay = Duration::from_millis(ms);
        }
        if let Some(flag) = self.treat_not_found_as_target {
            spec.treat_not_found_as_target = flag;
        }
        if let Some(n) = self.min_not_found_consecutive {
            spec.min_not_found_consecutive = n;
        }
        if let Some(n) = self.min_target_consecutive {
            spec.min_target_consecutive = n;
        }
        spec
    }
}

/// リトライプロファイル
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryProfile {
    /// 全試行を通じた制限時間（秒）
    #[serde(default = "default_max_elapsed")]
    pub max_elapsed_secs: u64,
    /// 初期待機時間（ミリ秒）
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    /// 最大待機時間（ミリ秒）
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// Exponential倍率
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_elapsed() -> u64 {
    300 // 5分
}
fn default_initial_delay() -> u64 {
    1000 // 1秒
}
fn default_max_delay() -> u64 {
    30000 // 30秒
}
fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryProfile {
    fn default() -> Self {
        Self {
            max_elapsed_secs: default_max_elapsed(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
        }
    }
}

impl RetryProfile {
    pub fn max_elapsed(&self) -> Duration {
        Duration::from_secs(self.max_elapsed_secs)
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
        }
    }

    /// 分類関数はプリセットのものを引き継ぐ
    pub fn apply_to<E>(&self, mut policy: RetryPolicy<E>) -> RetryPolicy<E> {
        policy.max_elapsed = self.max_elapsed();
        policy.backoff = self.backoff();
        policy
    }

    fn validate(&self, name: &str) -> Result<()> {
        let message = if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            format!("multiplier は 1.0 以上である必要があります: {}", self.multiplier)
        } else if self.initial_delay_ms > self.max_delay_ms {
            format!(
                "initial_delay_ms ({}) が max_delay_ms ({}) を超えています",
                self.initial_delay_ms, self.max_delay_ms
            )
        } else {
            return Ok(());
        };

        Err(ConfigError::InvalidRetryProfile {
            name: name.to_string(),
            message,
        })
    }
}
