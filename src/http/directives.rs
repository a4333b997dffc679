//! Path directives: side effects triggered by patterns in the request path.
//!
//! # Responsibilities
//! - Delay: `.../{sleep|delay}/{n}{ms|s}?` suspends the response
//! - Status: `.../status/{3-digit-code}` overrides the response status
//! - Echo index: `/echo[es][/{n}]` short-circuits capture entirely
//! - File: `/file/{hex-hash}` addresses the blob cache
//!
//! # Design Decisions
//! - Patterns are matched against the path only (no query string), in a fixed
//!   priority order decided by the handler
//! - Unparseable directives are silently ignored, never rejected
//! - Delays are capped strictly below one minute so a hostile caller cannot
//!   pin workers indefinitely

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

/// Hard upper bound on an injected delay.
const MAX_DELAY: Duration = Duration::from_secs(60);

static DELAY_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(sleep|delay)/([0-9]+)(m?s)?(/|$)?").unwrap());
static STATUS_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/status/([0-9]{3})(/|$)?").unwrap());
static ECHO_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/echo(es)?(/([0-9]+))?$").unwrap());
static FILE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/file/([a-f0-9]{64})$").unwrap());

/// Parse a delay directive from the path. Returns the duration to sleep,
/// already checked against the upper bound; out-of-bound or unparseable
/// delays yield `None`.
pub fn delay(path: &str) -> Option<Duration> {
    let caps = DELAY_PATH.captures(path)?;
    let amount: u64 = caps[2].parse().ok()?;
    let duration = match caps.get(3).map(|m| m.as_str()) {
        Some("s") => Duration::from_secs(amount),
        // Milliseconds when the unit is "ms" or omitted.
        _ => Duration::from_millis(amount),
    };
    (duration < MAX_DELAY).then_some(duration)
}

/// Parse a status override directive from the path.
pub fn status_override(path: &str) -> Option<u16> {
    let caps = STATUS_PATH.captures(path)?;
    caps[1].parse().ok()
}

/// Match the introspection path. `None` means the path is not an echo path;
/// `Some(None)` is `/echo` with no index; `Some(Some(n))` carries an index.
pub fn echo_index(path: &str) -> Option<Option<usize>> {
    let caps = ECHO_PATH.captures(path)?;
    Some(caps.get(3).and_then(|m| m.as_str().parse().ok()))
}

/// Match a blob retrieval path, yielding the content hash.
pub fn file_hash(path: &str) -> Option<&str> {
    let caps = FILE_PATH.captures(path)?;
    Some(caps.get(1).map(|m| m.as_str()).unwrap_or_default())
}
