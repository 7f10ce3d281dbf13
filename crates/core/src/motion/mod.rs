use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Progress curve applied to a tween.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    /// Cubic ease-out: fast start, gentle landing.
    EaseOut,
    /// Ease-out bounce with three diminishing rebounds.
    Bounce,
}

impl Easing {
    /// Maps linear progress `t` in `[0, 1]` to eased progress. Input outside
    /// the range is clamped.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseOut => 1.0 - (1.0 - t).powi(3),
            Self::Bounce => bounce_out(t),
        }
    }
}

fn bounce_out(t: f32) -> f32 {
    const N: f32 = 7.5625;
    const D: f32 = 2.75;

    if t < 1.0 / D {
        N * t * t
    } else if t < 2.0 / D {
        let t = t - 1.5 / D;
        N * t * t + 0.75
    } else if t < 2.5 / D {
        let t = t - 2.25 / D;
        N * t * t + 0.9375
    } else {
        let t = t - 2.625 / D;
        N * t * t + 0.984375
    }
}

/// Identifies one of the animated scalars the renderer reads each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelId {
    /// World scroll offset.
    Scroll,
    /// Horizontal position of the player vehicle.
    Lane,
    /// Vertical offset of the non-player vehicle.
    NonPlayerOffset,
}

impl ChannelId {
    pub const ALL: [ChannelId; 3] = [Self::Scroll, Self::Lane, Self::NonPlayerOffset];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scroll => "scroll",
            Self::Lane => "lane",
            Self::NonPlayerOffset => "non_player_offset",
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonically increasing token that identifies one choreography run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Receipt for a started animation.
///
/// `serial` is unique per channel, `owner` is the run that started it. A
/// channel hands the ticket back from [`MotionChannel::advance`] exactly once,
/// when the tween settles, and never if it was cancelled first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationTicket {
    pub channel: ChannelId,
    pub serial: u64,
    pub owner: Generation,
}

#[derive(Debug, Clone)]
struct Tween {
    ticket: AnimationTicket,
    from: f32,
    to: f32,
    duration: Duration,
    elapsed: Duration,
    easing: Easing,
}

impl Tween {
    fn sample(&self) -> f32 {
        if self.duration.is_zero() {
            return self.to;
        }
        let t = self.elapsed.as_secs_f32() / self.duration.as_secs_f32();
        self.from + (self.to - self.from) * self.easing.apply(t)
    }

    fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// A single continuously varying scalar with at most one live tween.
#[derive(Debug, Clone)]
pub struct MotionChannel {
    id: ChannelId,
    value: Option<f32>,
    active: Option<Tween>,
    issued: u64,
}

impl MotionChannel {
    /// Creates a channel whose value is still undefined.
    pub fn new(id: ChannelId) -> Self {
        Self {
            id,
            value: None,
            active: None,
            issued: 0,
        }
    }

    pub fn with_value(id: ChannelId, value: f32) -> Self {
        Self {
            value: Some(value),
            ..Self::new(id)
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Current value. An undefined channel reads as `0.0`.
    pub fn value(&self) -> f32 {
        self.value.unwrap_or(0.0)
    }

    /// Current value, `None` if nothing has ever been written.
    pub fn raw_value(&self) -> Option<f32> {
        self.value
    }

    pub fn is_animating(&self) -> bool {
        self.active.is_some()
    }

    /// Ticket of the tween currently in flight.
    pub fn active_ticket(&self) -> Option<AnimationTicket> {
        self.active.as_ref().map(|tween| tween.ticket)
    }

    /// Writes `value` immediately, cancelling any in-flight tween.
    pub fn set(&mut self, value: f32) {
        self.cancel();
        self.value = Some(value);
    }

    /// Starts a tween from the current value to `target`.
    ///
    /// Any tween already in flight is cancelled first and stops where it
    /// currently is, so the new tween starts from that exact value.
    pub fn animate_to(
        &mut self,
        target: f32,
        duration: Duration,
        easing: Easing,
        owner: Generation,
    ) -> AnimationTicket {
        self.cancel();
        self.issued += 1;
        let ticket = AnimationTicket {
            channel: self.id,
            serial: self.issued,
            owner,
        };
        let from = self.value();
        self.value = Some(from);
        trace!(channel = %self.id, from, target, ?duration, ?easing, "tween started");
        self.active = Some(Tween {
            ticket,
            from,
            to: target,
            duration,
            elapsed: Duration::ZERO,
            easing,
        });
        ticket
    }

    /// Stops the in-flight tween at its current interpolated value. The
    /// cancelled ticket is returned and will never be reported as settled.
    pub fn cancel(&mut self) -> Option<AnimationTicket> {
        let tween = self.active.take()?;
        trace!(channel = %self.id, serial = tween.ticket.serial, value = self.value(), "tween cancelled");
        Some(tween.ticket)
    }

    /// Cancels the tween identified by `ticket`. A ticket that is no longer
    /// live is ignored.
    pub fn cancel_ticket(&mut self, ticket: AnimationTicket) -> bool {
        if self.active_ticket() == Some(ticket) {
            self.cancel();
            true
        } else {
            debug!(
                channel = %self.id,
                serial = ticket.serial,
                "cancel on stale animation handle ignored"
            );
            false
        }
    }

    /// Advances the in-flight tween by `dt`. Returns the ticket once the
    /// tween reaches its target; the value snaps to the exact target.
    pub fn advance(&mut self, dt: Duration) -> Option<AnimationTicket> {
        let tween = self.active.as_mut()?;
        tween.elapsed = tween.elapsed.saturating_add(dt);
        if tween.is_done() {
            let tween = self.active.take()?;
            self.value = Some(tween.to);
            return Some(tween.ticket);
        }
        self.value = Some(tween.sample());
        None
    }
}
