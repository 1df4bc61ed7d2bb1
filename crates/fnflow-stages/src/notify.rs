//! Notification senders and the decorators that wrap them.
//!
//! A [`Sender`] delivers one [`Notification`]. Behaviour such as logging,
//! retrying and rate limiting is layered on by wrapping a sender in another
//! sender, so any combination can be built without touching the base:
//!
//! ```
//! use fnflow_stages::notify::{Channel, Notification, Sender, SenderExt};
//!
//! let push = Channel::Push.retried(2).logged();
//! let note = Notification::new(Channel::Push, "user_789", "New message");
//! assert!(push.send(&note).is_ok());
//! ```
use fnflow_core::{StepError, StepResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    Push,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Self::Email, Self::Sms, Self::Push];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Push => "push",
        }
    }

    fn check_recipient(&self, recipient: &str) -> StepResult<()> {
        let ok = match self {
            Self::Email => recipient
                .split_once('@')
                .map_or(false, |(local, domain)| !local.is_empty() && !domain.is_empty()),
            Self::Sms => {
                recipient.len() > 1
                    && recipient.starts_with('+')
                    && recipient[1..].chars().all(|c| c.is_ascii_digit())
            }
            Self::Push => !recipient.trim().is_empty(),
        };
        if ok {
            Ok(())
        } else {
            Err(StepError::invalid_input(format!(
                "invalid {} recipient: {:?}",
                self, recipient
            )))
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            "push" => Ok(Self::Push),
            _ => Err(StepError::invalid_input(format!(
                "unsupported channel: {}",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub message: String,
    pub channel: Channel,
}

impl Notification {
    pub fn new(channel: Channel, recipient: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            message: message.into(),
            channel,
        }
    }
}

/// Delivers a notification.
pub trait Sender: Send + Sync {
    fn send(&self, notification: &Notification) -> StepResult<()>;
}

impl<S: Sender + ?Sized> Sender for &S {
    fn send(&self, notification: &Notification) -> StepResult<()> {
        (**self).send(notification)
    }
}

impl<S: Sender + ?Sized> Sender for Box<S> {
    fn send(&self, notification: &Notification) -> StepResult<()> {
        (**self).send(notification)
    }
}

/// Base handler for one channel. Refuses notifications addressed to another
/// channel and recipients that do not look like an address for it.
impl Sender for Channel {
    fn send(&self, notification: &Notification) -> StepResult<()> {
        if notification.channel != *self {
            return Err(StepError::invalid_input(format!(
                "{} notification routed to the {} sender",
                notification.channel, self
            )));
        }
        self.check_recipient(&notification.recipient)?;
        info!(
            channel = self.as_str(),
            recipient = %notification.recipient,
            message = %notification.message,
            "sending notification"
        );
        Ok(())
    }
}

/// Picks the base sender from the notification's own channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct Router;

impl Sender for Router {
    fn send(&self, notification: &Notification) -> StepResult<()> {
        notification.channel.send(notification)
    }
}

pub fn channel_sender(channel: Channel) -> Box<dyn Sender> {
    Box::new(channel)
}

/// Logs before and after each send. Errors are logged and passed on.
pub struct WithLogging<S> {
    inner: S,
}

impl<S: Sender> Sender for WithLogging<S> {
    fn send(&self, notification: &Notification) -> StepResult<()> {
        info!(
            "preparing to send notification via {}",
            notification.channel.as_str().to_uppercase()
        );
        let result = self.inner.send(notification);
        match &result {
            Ok(()) => info!(channel = notification.channel.as_str(), "notification sent"),
            Err(err) => warn!(
                channel = notification.channel.as_str(),
                error = %err,
                "error sending notification"
            ),
        }
        result
    }
}

/// Calls the inner sender up to `attempts` times in total, stopping at the
/// first success or at the first error that is not retryable.
pub struct WithRetry<S> {
    inner: S,
    attempts: u32,
}

impl<S: Sender> Sender for WithRetry<S> {
    fn send(&self, notification: &Notification) -> StepResult<()> {
        let mut attempt = 1;
        loop {
            debug!(attempt, "attempt to send notification");
            match self.inner.send(notification) {
                Ok(()) => return Ok(()),
                Err(err) if err.is_retryable() && attempt < self.attempts => {
                    debug!(attempt, error = %err, "send failed, trying again");
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_retryable() {
                        warn!(attempts = attempt, "failed to send notification after {} attempts", attempt);
                    }
                    return Err(err);
                }
            }
        }
    }
}

/// Counts sends against a fixed allowance.
///
/// With `limit = 5` sends one to five are allowed and the sixth is refused.
/// [`RateLimiter::remaining`] only checks and [`RateLimiter::record`] only
/// updates; [`RateLimiter::try_acquire`] does both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiter {
    limit: u32,
    sent: u32,
}

impl RateLimiter {
    pub fn new(limit: u32) -> Self {
        Self { limit, sent: 0 }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn sent(&self) -> u32 {
        self.sent
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.sent)
    }

    pub fn record(&mut self) {
        self.sent = self.sent.saturating_add(1);
    }

    /// Records a send if any allowance is left.
    pub fn try_acquire(&mut self) -> bool {
        if self.remaining() == 0 {
            return false;
        }
        self.record();
        true
    }

    pub fn reset(&mut self) {
        self.sent = 0;
    }
}

/// Refuses sends once the limiter's allowance is used up.
///
/// A refused send is `ResourceUnavailable { resource: "rate_limit:<channel>" }`
/// and never reaches the inner sender. Failed sends still count.
pub struct WithRateLimit<S> {
    inner: S,
    limiter: Mutex<RateLimiter>,
}

impl<S> WithRateLimit<S> {
    pub fn remaining(&self) -> StepResult<u32> {
        self.limiter
            .lock()
            .map(|limiter| limiter.remaining())
            .map_err(|_| StepError::failed("notify.rate_limit", "limiter lock poisoned"))
    }
}

impl<S: Sender> Sender for WithRateLimit<S> {
    fn send(&self, notification: &Notification) -> StepResult<()> {
        let acquired = self
            .limiter
            .lock()
            .map_err(|_| StepError::failed("notify.rate_limit", "limiter lock poisoned"))?
            .try_acquire();

        if !acquired {
            warn!(
                channel = notification.channel.as_str(),
                "rate limit reached, cannot send more notifications"
            );
            return Err(StepError::unavailable(format!(
                "rate_limit:{}",
                notification.channel
            )));
        }
        self.inner.send(notification)
    }
}

/// Decorator constructors for every sender.
pub trait SenderExt: Sender + Sized {
    fn logged(self) -> WithLogging<Self> {
        WithLogging { inner: self }
    }

    /// `attempts` counts the first call; zero is treated as one.
    fn retried(self, attempts: u32) -> WithRetry<Self> {
        WithRetry {
            inner: self,
            attempts: attempts.max(1),
        }
    }

    fn rate_limited(self, limit: u32) -> WithRateLimit<Self> {
        WithRateLimit {
            inner: self,
            limiter: Mutex::new(RateLimiter::new(limit)),
        }
    }
}

impl<S: Sender> SenderExt for S {}
