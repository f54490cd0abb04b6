//! Framing and tokenization of AT responses.

use crate::status::Status;

/// Fixed terminal markers of the AT framing convention.
const OK_TERMINATOR: &str = "\r\nOK\r\n";
const ERROR_TERMINATOR: &str = "\r\nERROR\r\n";
const PROMPT_TERMINATOR: &str = "> ";

/// Which condition ended a successful read cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// `\r\nOK\r\n`
    Ok,
    /// `\r\nERROR\r\n`
    Error,
    /// Bare `> ` prompt, no status line follows.
    Prompt,
    /// The caller-supplied stop substring matched somewhere in the buffer.
    Stop,
}

/// Checks the whole accumulated buffer for a terminator condition.
///
/// Terminators can straddle poll boundaries, so this must always look at the
/// full buffer, never just the newest chunk. An empty `stop` disables only
/// the early-stop path.
pub(crate) fn find_terminator(buffer: &str, stop: &str) -> Option<Terminator> {
    if buffer.ends_with(OK_TERMINATOR) {
        return Some(Terminator::Ok);
    }
    if buffer.ends_with(ERROR_TERMINATOR) {
        return Some(Terminator::Error);
    }
    if buffer.ends_with(PROMPT_TERMINATOR) {
        return Some(Terminator::Prompt);
    }
    if !stop.is_empty() && buffer.contains(stop) {
        return Some(Terminator::Stop);
    }
    None
}

/// Splits a raw response blob into its non-empty logical lines.
///
/// Splits on `\r\n`, strips stray `\r` artifacts, drops empty lines,
/// preserves order. Pure and restartable.
pub fn tokenize(raw: &str) -> Vec<String> {
    raw.split("\r\n")
        .map(|line| line.replace('\r', ""))
        .filter(|line| !line.is_empty())
        .collect()
}

/// One complete read cycle: the tokenized lines plus how the cycle ended.
///
/// The first line is typically the command echo and the last line the
/// terminal status line. Aborted cycles (timeout, decode failure) keep
/// whatever text was accumulated so diagnostics can inspect it.
#[derive(Debug)]
pub struct Response {
    lines: Vec<String>,
    ending: Ending,
    raw: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    Complete(Terminator),
    Aborted(Status),
}

impl Response {
    pub(crate) fn complete(raw: String, terminator: Terminator) -> Self {
        Response {
            lines: tokenize(&raw),
            ending: Ending::Complete(terminator),
            raw,
        }
    }

    /// `status` must be [`Status::Timeout`] or [`Status::DecodeError`].
    pub(crate) fn aborted(raw: String, status: Status) -> Self {
        debug_assert!(matches!(status, Status::Timeout | Status::DecodeError));
        Response {
            lines: tokenize(&raw),
            ending: Ending::Aborted(status),
            raw,
        }
    }

    /// Logical lines, in arrival order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn last_line(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }

    /// Raw accumulated text, partial on aborted reads.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// True when a terminator condition was met before the deadline.
    pub fn is_complete(&self) -> bool {
        matches!(self.ending, Ending::Complete(_))
    }

    pub(crate) fn terminator(&self) -> Option<Terminator> {
        match self.ending {
            Ending::Complete(t) => Some(t),
            Ending::Aborted(_) => None,
        }
    }

    /// The single [`Status`] this exchange resolved to.
    ///
    /// Derived from the terminal line for complete reads: `OK` and `ERROR`
    /// map to their statuses, a prompt-terminated read maps to
    /// [`Status::Prompt`], anything else is [`Status::Unknown`]. Aborted
    /// reads carry their abort status through unchanged.
    pub fn status(&self) -> Status {
        match self.ending {
            Ending::Aborted(status) => status,
            Ending::Complete(Terminator::Prompt) => Status::Prompt,
            Ending::Complete(_) => match self.last_line() {
                Some("OK") => Status::Ok,
                Some("ERROR") => Status::Error,
                _ => Status::Unknown,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminator_detection() {
        let cases = [
            ("AT\r\n\r\nOK\r\n", "", Some(Terminator::Ok)),
            ("AT+FOO\r\n\r\nERROR\r\n", "", Some(Terminator::Error)),
            ("AT+CMGS=\"123\"\r\n> ", "", Some(Terminator::Prompt)),
            ("partial with no end", "", None),
            ("OK\r\n extra trailing", "", None),
            ("noise SMS Ready noise", "SMS Ready", Some(Terminator::Stop)),
            // An empty stop substring must not match everything.
            ("anything at all", "", None),
        ];
        for (i, (buffer, stop, expected)) in cases.into_iter().enumerate() {
            assert_eq!(find_terminator(buffer, stop), expected, "case {i}");
        }
    }

    #[test]
    fn tokenize_drops_empty_lines_and_cr() {
        let raw = "AT+CSQ\r\n\r\n+CSQ: 20,3\r\n\r\nOK\r\n";
        assert_eq!(tokenize(raw), vec!["AT+CSQ", "+CSQ: 20,3", "OK"]);
    }

    #[test]
    fn tokenize_is_idempotent_over_rejoin() {
        let raw = "AT+CGDCONT?\r\n+CGDCONT: 1,\"IP\",\"apn\"\r\n\r\nOK\r\n";
        let once = tokenize(raw);
        let again = tokenize(&once.join("\r\n"));
        assert_eq!(once, again);
    }

    #[test]
    fn status_from_terminal_line() {
        let ok = Response::complete("AT\r\n\r\nOK\r\n".into(), Terminator::Ok);
        assert_eq!(ok.status(), Status::Ok);

        let err =
            Response::complete("AT+X\r\n\r\nERROR\r\n".into(), Terminator::Error);
        assert_eq!(err.status(), Status::Error);

        let prompt = Response::complete("AT+CMGS\r\n> ".into(), Terminator::Prompt);
        assert_eq!(prompt.status(), Status::Prompt);

        let stopped =
            Response::complete("junk\r\nSMS Ready\r\n".into(), Terminator::Stop);
        assert_eq!(stopped.status(), Status::Unknown);

        let timed_out = Response::aborted("half a resp".into(), Status::Timeout);
        assert_eq!(timed_out.status(), Status::Timeout);
        assert_eq!(timed_out.raw(), "half a resp");
    }
}
