use keyframe::{AnimationSequence, CanTween, EasingFunction, Keyframe};
use serde::{Deserialize, Serialize};
use std::fmt;

// Define our own enum to store easing types uniformly
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingType {
    Linear,
    /// Default curve for card transitions.
    #[default]
    EaseIn,
    EaseOut,
    EaseInOut,
    /// Used while a card follows the pointer.
    EaseInOutCubic,
}

impl EasingFunction for EasingType {
    fn y(&self, x: f64) -> f64 {
        match self {
            EasingType::Linear => keyframe::functions::Linear.y(x),
            EasingType::EaseIn => keyframe::functions::EaseIn.y(x),
            EasingType::EaseOut => keyframe::functions::EaseOut.y(x),
            EasingType::EaseInOut => keyframe::functions::EaseInOut.y(x),
            EasingType::EaseInOutCubic => keyframe::functions::EaseInOutCubic.y(x),
        }
    }
}

impl EasingType {
    pub fn eval(&self, x: f32) -> f32 {
        self.y(x as f64) as f32
    }
}

/// A single value tweened over time with keyframe.
///
/// Times are in milliseconds relative to the start of the tween.
#[derive(Clone)]
pub struct Animated<T>
where
    T: Clone + CanTween + Default,
{
    pub sequence: AnimationSequence<T>,
    pub current_value: T,
    target: T,
}

impl<T> Animated<T>
where
    T: Clone + CanTween + Default,
{
    pub fn new(initial: T) -> Self {
        let kf = Keyframe::new(initial.clone(), 0.0, EasingType::Linear);

        Self {
            sequence: AnimationSequence::from(vec![kf]),
            current_value: initial.clone(),
            target: initial,
        }
    }

    /// A tween from `start` to `target` over `duration` milliseconds.
    ///
    /// Both keyframes carry the easing so the curve applies to the single
    /// segment between them. A non-positive duration jumps straight to `target`.
    pub fn tween(start: T, target: T, duration: f64, easing: EasingType) -> Self {
        if duration <= 0.0 {
            return Self::new(target);
        }

        let frames = vec![
            Keyframe::new(start.clone(), 0.0, easing),
            Keyframe::new(target.clone(), duration, easing),
        ];

        Self {
            sequence: AnimationSequence::from(frames),
            current_value: start,
            target,
        }
    }

    pub fn duration(&self) -> f64 {
        self.sequence.duration()
    }

    pub fn update(&mut self, time: f64) {
        if time >= self.duration() {
            self.current_value = self.target.clone();
            return;
        }
        self.sequence.advance_to(time.max(0.0));
        self.current_value = self.sequence.now();
    }

    pub fn is_complete(&self, time: f64) -> bool {
        time >= self.duration()
    }
}

impl<T> fmt::Debug for Animated<T>
where
    T: Clone + CanTween + Default + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animated")
            .field("current_value", &self.current_value)
            .field("target", &self.target)
            .finish()
    }
}
