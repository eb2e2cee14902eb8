//! Optional refinement of the annual statistics by an external forecaster
//!
//! The forecaster is an out-of-process collaborator that fits ARIMA/GARCH
//! models to the synthetic price index and reports an annualized mean and
//! volatility. It is untrusted: any failure is logged and the historical
//! statistics are used instead. Exactly one attempt is made per request.
//!
//! # Process protocol
//!
//! The configured program is run with its own arguments followed by three
//! JSON arguments: the index as an array of numbers, the ARIMA order
//! `{"p","d","q"}` and the GARCH order `{"p","q"}`. Its stdout must contain a
//! JSON object with `annualized_return` and `annualized_volatility` (and
//! optionally `used_model`), or an `error` field. The first complete JSON
//! object in stdout is used, so surrounding log lines are tolerated.

use std::ffi::OsString;
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::config::{ArimaOrder, ForecastModel, GarchOrder};
use crate::error::BridgeError;
use crate::model::{AnnualStatistics, ModelUsed};

/// Refinement is skipped unless the index has more points than this
pub const MIN_INDEX_POINTS: usize = 50;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Largest forecaster stdout that is parsed
pub const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Annualized statistics produced by the external forecaster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refinement {
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub used_model: Option<String>,
}

/// Capability to refine return/volatility estimates from a price index
pub trait ForecastBridge: Send + Sync {
    fn refine(
        &self,
        index: &[f64],
        arima: ArimaOrder,
        garch: GarchOrder,
    ) -> Result<Refinement, BridgeError>;
}

impl<F> ForecastBridge for F
where
    F: Fn(&[f64], ArimaOrder, GarchOrder) -> Result<Refinement, BridgeError> + Send + Sync,
{
    fn refine(
        &self,
        index: &[f64],
        arima: ArimaOrder,
        garch: GarchOrder,
    ) -> Result<Refinement, BridgeError> {
        self(index, arima, garch)
    }
}

/// Bridge used when no forecaster is configured; always declines
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBridge;

impl ForecastBridge for NoBridge {
    fn refine(&self, _: &[f64], _: ArimaOrder, _: GarchOrder) -> Result<Refinement, BridgeError> {
        Err(BridgeError::NotConfigured)
    }
}

/// Runs the forecaster as a child process with a hard timeout
#[derive(Debug, Clone)]
pub struct ProcessBridge {
    program: OsString,
    args: Vec<OsString>,
    timeout: Duration,
}

impl ProcessBridge {
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Argument placed before the three JSON arguments, e.g. a script path
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, request: [String; 3]) -> Result<Vec<u8>, BridgeError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .args(request)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(BridgeError::Spawn)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Io(std::io::Error::other("child stdout not captured")))?;
        // Drain stdout concurrently so a chatty child cannot block on a full pipe.
        // The reader is never joined: a grandchild may hold the pipe open.
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut output = Vec::new();
            let result = stdout
                .take(MAX_OUTPUT_BYTES as u64 + 1)
                .read_to_end(&mut output)
                .map(|_| output);
            let _ = tx.send(result);
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(BridgeError::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let output = match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => return Err(BridgeError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(BridgeError::Io(std::io::Error::other(
                    "stdout reader stopped without a result",
                )));
            }
        };

        if output.len() > MAX_OUTPUT_BYTES {
            return Err(BridgeError::OutputTooLarge(MAX_OUTPUT_BYTES));
        }
        if !status.success() {
            return Err(BridgeError::ExitStatus(status));
        }
        Ok(output)
    }
}

impl ForecastBridge for ProcessBridge {
    fn refine(
        &self,
        index: &[f64],
        arima: ArimaOrder,
        garch: GarchOrder,
    ) -> Result<Refinement, BridgeError> {
        let request = [
            serde_json::to_string(index)?,
            serde_json::to_string(&arima)?,
            serde_json::to_string(&garch)?,
        ];
        let started = Instant::now();
        let output = self.run(request)?;
        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = output.len(),
            "forecast process finished"
        );
        parse_response(&String::from_utf8_lossy(&output))
    }
}

/// Wire shape of the forecaster's answer
#[derive(Debug, Deserialize)]
struct BridgeResponse {
    annualized_return: Option<f64>,
    annualized_volatility: Option<f64>,
    used_model: Option<String>,
    error: Option<String>,
}

/// Every balanced `{ .. }` span in `bytes`, ordered by opening position.
///
/// Quotes are only tracked inside an open brace and a string never spans a
/// newline, so stray quotes in log lines cannot hide a later object.
fn brace_pairs(bytes: &[u8]) -> Vec<(usize, usize)> {
    let mut open = Vec::new();
    let mut pairs = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' || b == b'\n' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' if !open.is_empty() => in_string = true,
            b'{' => open.push(i),
            b'}' => {
                if let Some(start) = open.pop() {
                    pairs.push((start, i));
                }
            }
            _ => {}
        }
    }

    pairs.sort_unstable_by_key(|&(start, _)| start);
    pairs
}

/// First balanced substring of `text` that parses as a JSON object
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    brace_pairs(text.as_bytes())
        .into_iter()
        .map(|(open, close)| &text[open..=close])
        .find(|candidate| serde_json::from_str::<IgnoredAny>(candidate).is_ok())
}

/// Interpret raw forecaster output
pub fn parse_response(output: &str) -> Result<Refinement, BridgeError> {
    let object = extract_json_object(output).ok_or(BridgeError::NoJson)?;
    let response: BridgeResponse = serde_json::from_str(object)?;

    if let Some(error) = response.error {
        return Err(BridgeError::Reported(error));
    }
    let annualized_return = response
        .annualized_return
        .ok_or(BridgeError::MissingField("annualized_return"))?;
    let annualized_volatility = response
        .annualized_volatility
        .ok_or(BridgeError::MissingField("annualized_volatility"))?;

    for (field, value) in [
        ("annualized_return", annualized_return),
        ("annualized_volatility", annualized_volatility),
    ] {
        if !value.is_finite() {
            return Err(BridgeError::NonFinite { field, value });
        }
    }

    Ok(Refinement {
        annualized_return,
        annualized_volatility,
        used_model: response.used_model,
    })
}

/// Statistics chosen for the simulation and where they came from
#[derive(Debug, Clone, PartialEq)]
pub struct ChosenStatistics {
    pub statistics: AnnualStatistics,
    pub model_used: ModelUsed,
    pub model_label: Option<String>,
}

impl ChosenStatistics {
    fn historical(statistics: AnnualStatistics) -> Self {
        Self {
            statistics,
            model_used: ModelUsed::Historical,
            model_label: None,
        }
    }
}

/// Try the bridge when the request asks for it and the index is long enough;
/// otherwise, or on any bridge failure, keep the historical statistics.
pub fn choose_statistics(
    bridge: &dyn ForecastBridge,
    index: &[f64],
    model: Option<&ForecastModel>,
    historical: AnnualStatistics,
) -> ChosenStatistics {
    let Some((arima, garch)) = model.and_then(ForecastModel::orders) else {
        return ChosenStatistics::historical(historical);
    };
    if index.len() <= MIN_INDEX_POINTS {
        tracing::debug!(
            points = index.len(),
            required = MIN_INDEX_POINTS + 1,
            "index too short for refinement, using historical statistics"
        );
        return ChosenStatistics::historical(historical);
    }

    match bridge.refine(index, arima, garch) {
        Ok(refinement) => {
            tracing::info!(
                mean = refinement.annualized_return,
                volatility = refinement.annualized_volatility,
                model = refinement.used_model.as_deref().unwrap_or("unknown"),
                "using refined statistics"
            );
            ChosenStatistics {
                statistics: AnnualStatistics {
                    mean_return: refinement.annualized_return,
                    volatility: refinement.annualized_volatility,
                },
                model_used: ModelUsed::Refined,
                model_label: refinement.used_model,
            }
        }
        Err(err) => {
            tracing::warn!("forecast refinement failed, using historical statistics: {err}");
            ChosenStatistics::historical(historical)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARIMA: ArimaOrder = ArimaOrder { p: 1, d: 0, q: 1 };
    const GARCH: GarchOrder = GarchOrder { p: 1, q: 1 };

    fn long_index() -> Vec<f64> {
        (0..60).map(|i| 100.0 + f64::from(i)).collect()
    }

    fn historical() -> AnnualStatistics {
        AnnualStatistics {
            mean_return: 0.07,
            volatility: 0.2,
        }
    }

    fn fixed(_: &[f64], _: ArimaOrder, _: GarchOrder) -> Result<Refinement, BridgeError> {
        Ok(Refinement {
            annualized_return: 0.05,
            annualized_volatility: 0.1,
            used_model: Some("ARIMA(1,0,1) + GARCH(1,1)".into()),
        })
    }

    fn failing(_: &[f64], _: ArimaOrder, _: GarchOrder) -> Result<Refinement, BridgeError> {
        Err(BridgeError::Reported("Not enough data".into()))
    }

    #[test]
    fn test_extract_object_amid_noise() {
        let output = "fitting model...\nwarning: {unbalanced\n{\"annualized_return\": 0.1, \"note\": \"}{\"}\ntrailing";
        assert_eq!(
            extract_json_object(output),
            Some("{\"annualized_return\": 0.1, \"note\": \"}{\"}")
        );
    }

    #[test]
    fn test_extract_nested_object() {
        let output = "x {\"a\": {\"b\": 1}} {\"c\": 2}";
        assert_eq!(extract_json_object(output), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn test_extract_after_stray_quote() {
        let output = "model said \"hello\nand \"unterminated\n{\"a\": 1}\n";
        assert_eq!(extract_json_object(output), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_extract_is_linear_in_brace_noise() {
        let object = "{\"annualized_return\": 0.1, \"annualized_volatility\": 0.2}";
        for noise in ["{".repeat(100_000), "{\"".repeat(50_000), "{x}".repeat(30_000)] {
            let output = format!("{noise}\n{object}");
            let started = Instant::now();
            assert_eq!(extract_json_object(&output), Some(object));
            assert!(
                started.elapsed() < Duration::from_secs(2),
                "scan took {:?}",
                started.elapsed()
            );
        }
    }

    #[test]
    fn test_extract_none() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{ not json }"), None);
        assert_eq!(extract_json_object(""), None);
    }

    #[test]
    fn test_parse_success() {
        let r = parse_response(
            "log\n{\"annualized_return\": 0.12, \"annualized_volatility\": 0.3, \"used_model\": \"ARIMA(1,0,1)\"}\n",
        )
        .unwrap();
        assert_eq!(r.annualized_return, 0.12);
        assert_eq!(r.annualized_volatility, 0.3);
        assert_eq!(r.used_model.as_deref(), Some("ARIMA(1,0,1)"));
    }

    #[test]
    fn test_parse_failures() {
        assert!(matches!(
            parse_response("{\"error\": \"Not enough data\"}"),
            Err(BridgeError::Reported(_))
        ));
        assert!(matches!(
            parse_response("{\"annualized_return\": 0.1}"),
            Err(BridgeError::MissingField("annualized_volatility"))
        ));
        assert!(matches!(
            parse_response("{\"annualized_return\": \"high\", \"annualized_volatility\": 0.1}"),
            Err(BridgeError::Malformed(_))
        ));
        assert!(matches!(parse_response("nothing"), Err(BridgeError::NoJson)));
    }

    #[test]
    fn test_choose_uses_refinement() {
        let index = long_index();
        let model = ForecastModel::new(ARIMA, GARCH);
        let chosen = choose_statistics(&fixed, &index, Some(&model), historical());
        assert_eq!(chosen.model_used, ModelUsed::Refined);
        assert_eq!(chosen.statistics.mean_return, 0.05);
        assert_eq!(chosen.statistics.volatility, 0.1);
        assert!(chosen.model_label.is_some());
    }

    #[test]
    fn test_choose_falls_back_on_failure() {
        let index = long_index();
        let model = ForecastModel::new(ARIMA, GARCH);
        let chosen = choose_statistics(&failing, &index, Some(&model), historical());
        assert_eq!(chosen.model_used, ModelUsed::Historical);
        assert_eq!(chosen.statistics, historical());

        let chosen = choose_statistics(&NoBridge, &index, Some(&model), historical());
        assert_eq!(chosen.model_used, ModelUsed::Historical);
    }

    #[test]
    fn test_choose_skips_short_index_or_missing_orders() {
        let model = ForecastModel::new(ARIMA, GARCH);
        let short: Vec<f64> = long_index().into_iter().take(MIN_INDEX_POINTS).collect();
        let chosen = choose_statistics(&fixed, &short, Some(&model), historical());
        assert_eq!(chosen.model_used, ModelUsed::Historical);

        let partial = ForecastModel {
            arima_order: Some(ARIMA),
            garch_order: None,
        };
        let chosen = choose_statistics(&fixed, &long_index(), Some(&partial), historical());
        assert_eq!(chosen.model_used, ModelUsed::Historical);

        let chosen = choose_statistics(&fixed, &long_index(), None, historical());
        assert_eq!(chosen.model_used, ModelUsed::Historical);
    }

    #[test]
    fn test_spawn_failure() {
        let bridge = ProcessBridge::new("/nonexistent/basketcast-forecaster");
        assert!(matches!(
            bridge.refine(&long_index(), ARIMA, GARCH),
            Err(BridgeError::Spawn(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_success_with_noise() {
        let bridge = ProcessBridge::new("sh").arg("-c").arg(
            r#"echo "loading data"; echo '{"annualized_return": 0.09, "annualized_volatility": 0.18, "used_model": "ARIMA(1,0,1) + GARCH(1,1)"}'; echo done"#,
        );
        let r = bridge.refine(&long_index(), ARIMA, GARCH).unwrap();
        assert_eq!(r.annualized_return, 0.09);
        assert_eq!(r.annualized_volatility, 0.18);
    }

    #[cfg(unix)]
    #[test]
    fn test_process_receives_json_arguments() {
        // sh -c assigns the trailing arguments to $0, $1, $2
        let bridge = ProcessBridge::new("sh").arg("-c").arg(
            r#"case "$1" in '{"p":2,"d":1,"q":0}') echo '{"annualized_return": 0.01, "annualized_volatility": 0.02}';; *) echo "{\"error\": \"bad order $1\"}";; esac"#,
        );
        let r = bridge
            .refine(&[1.0, 2.0], ArimaOrder { p: 2, d: 1, q: 0 }, GARCH)
            .unwrap();
        assert_eq!(r.annualized_return, 0.01);
    }

    #[cfg(unix)]
    #[test]
    fn test_process_nonzero_exit() {
        let bridge = ProcessBridge::new("sh").arg("-c").arg("exit 3");
        assert!(matches!(
            bridge.refine(&long_index(), ARIMA, GARCH),
            Err(BridgeError::ExitStatus(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_timeout() {
        let bridge = ProcessBridge::new("sh")
            .args(["-c", "sleep 5"])
            .timeout(Duration::from_millis(100));
        let started = Instant::now();
        assert!(matches!(
            bridge.refine(&long_index(), ARIMA, GARCH),
            Err(BridgeError::Timeout(_))
        ));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_covers_background_pipe_holder() {
        // The shell exits at once but its background job keeps stdout open
        let bridge = ProcessBridge::new("sh")
            .arg("-c")
            .arg(r#"sleep 4 & echo '{"annualized_return": 0.1, "annualized_volatility": 0.2}'"#)
            .timeout(Duration::from_millis(200));
        let started = Instant::now();
        assert!(matches!(
            bridge.refine(&long_index(), ARIMA, GARCH),
            Err(BridgeError::Timeout(_))
        ));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[test]
    fn test_oversized_output_rejected() {
        let bridge = ProcessBridge::new("sh")
            .arg("-c")
            .arg("head -c 2000000 /dev/zero")
            .timeout(Duration::from_secs(10));
        assert!(matches!(
            bridge.refine(&long_index(), ARIMA, GARCH),
            Err(BridgeError::OutputTooLarge(MAX_OUTPUT_BYTES))
        ));
    }
}
