//! Generation knobs, their ranges and step sizes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::ModelEntry;

/// Token cap sent for lightweight models whatever the user picked.
pub const LIGHTWEIGHT_TOKEN_CEILING: u32 = 512;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Knob {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub default: f32,
}

impl Knob {
    pub fn clamp(&self, v: f32) -> f32 {
        if v.is_nan() {
            return self.default;
        }
        let snapped = self.min + ((v - self.min) / self.step).round() * self.step;
        // Round away float noise so 0.1 + 0.2 shows as 0.3.
        let snapped = (snapped * 1000.0).round() / 1000.0;
        snapped.clamp(self.min, self.max)
    }

    pub fn contains(&self, v: f32) -> bool {
        v >= self.min && v <= self.max
    }
}

pub const TEMPERATURE: Knob = Knob {
    min: 0.0,
    max: 2.0,
    step: 0.1,
    default: 0.1,
};
pub const TOP_P: Knob = Knob {
    min: 0.0,
    max: 1.0,
    step: 0.05,
    default: 0.95,
};
pub const TOP_K: Knob = Knob {
    min: 0.0,
    max: 100.0,
    step: 5.0,
    default: 40.0,
};
pub const REPETITION_PENALTY: Knob = Knob {
    min: 1.0,
    max: 2.0,
    step: 0.1,
    default: 1.2,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LengthBounds {
    pub min: u32,
    pub max: u32,
    pub step: u32,
    pub default: u32,
}

impl LengthBounds {
    pub fn for_entry(entry: &ModelEntry) -> Self {
        if entry.is_lightweight() {
            Self {
                min: 64,
                max: 1024,
                step: 64,
                default: 512,
            }
        } else {
            Self {
                min: 64,
                max: 4096,
                step: 64,
                default: 2048,
            }
        }
    }

    pub fn contains(&self, v: u32) -> bool {
        v >= self.min && v <= self.max
    }

    pub fn clamp(&self, v: u32) -> u32 {
        let v = v.clamp(self.min, self.max);
        let steps = (v - self.min + self.step / 2) / self.step;
        (self.min + steps * self.step).min(self.max)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ParamError {
    #[error("{name} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Param {
    Sample,
    Temperature,
    TopP,
    TopK,
    MaxNewTokens,
    RepetitionPenalty,
}

impl Param {
    pub const ALL: [Param; 6] = [
        Param::Sample,
        Param::Temperature,
        Param::TopP,
        Param::TopK,
        Param::MaxNewTokens,
        Param::RepetitionPenalty,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Param::Sample => "Sampling",
            Param::Temperature => "Temperature",
            Param::TopP => "Top P",
            Param::TopK => "Top K",
            Param::MaxNewTokens => "Max Length",
            Param::RepetitionPenalty => "Repetition Penalty",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub do_sample: bool,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_new_tokens: u32,
    pub repetition_penalty: f32,
}

impl GenerationParameters {
    pub fn for_entry(entry: &ModelEntry) -> Self {
        Self {
            do_sample: true,
            temperature: TEMPERATURE.default,
            top_p: TOP_P.default,
            top_k: TOP_K.default as u32,
            max_new_tokens: LengthBounds::for_entry(entry).default,
            repetition_penalty: REPETITION_PENALTY.default,
        }
    }

    /// Adopt the length bounds of a newly selected model. An out-of-range
    /// length falls back to the new default.
    pub fn retarget(&mut self, entry: &ModelEntry) {
        let bounds = LengthBounds::for_entry(entry);
        if !bounds.contains(self.max_new_tokens) {
            self.max_new_tokens = bounds.default;
        }
    }

    /// Token cap actually sent for `entry`.
    pub fn effective_max_new_tokens(&self, entry: &ModelEntry) -> u32 {
        if entry.is_lightweight() {
            LIGHTWEIGHT_TOKEN_CEILING
        } else {
            self.max_new_tokens
        }
    }

    pub fn set_temperature(&mut self, v: f32) {
        self.temperature = TEMPERATURE.clamp(v);
    }

    pub fn set_top_p(&mut self, v: f32) {
        self.top_p = TOP_P.clamp(v);
    }

    pub fn set_top_k(&mut self, v: u32) {
        self.top_k = TOP_K.clamp(v as f32) as u32;
    }

    pub fn set_repetition_penalty(&mut self, v: f32) {
        self.repetition_penalty = REPETITION_PENALTY.clamp(v);
    }

    pub fn set_max_new_tokens(&mut self, v: u32, entry: &ModelEntry) {
        self.max_new_tokens = LengthBounds::for_entry(entry).clamp(v);
    }

    /// Move `param` by `steps` increments (negative steps decrease). The
    /// sampling flag toggles on any non-zero step.
    pub fn nudge(&mut self, param: Param, steps: i32, entry: &ModelEntry) {
        let n = steps as f32;
        match param {
            Param::Sample => {
                if steps != 0 {
                    self.do_sample = !self.do_sample;
                }
            }
            Param::Temperature => self.set_temperature(self.temperature + n * TEMPERATURE.step),
            Param::TopP => self.set_top_p(self.top_p + n * TOP_P.step),
            Param::TopK => {
                let v = (self.top_k as f32 + n * TOP_K.step).max(0.0);
                self.set_top_k(v as u32);
            }
            Param::MaxNewTokens => {
                let b = LengthBounds::for_entry(entry);
                let v = self.max_new_tokens as i64 + steps as i64 * b.step as i64;
                self.set_max_new_tokens(v.max(0) as u32, entry);
            }
            Param::RepetitionPenalty => {
                self.set_repetition_penalty(self.repetition_penalty + n * REPETITION_PENALTY.step)
            }
        }
    }

    pub fn display(&self, param: Param) -> String {
        match param {
            Param::Sample => String::from(if self.do_sample { "on" } else { "off" }),
            Param::Temperature => format!("{:.1}", self.temperature),
            Param::TopP => format!("{:.2}", self.top_p),
            Param::TopK => self.top_k.to_string(),
            Param::MaxNewTokens => self.max_new_tokens.to_string(),
            Param::RepetitionPenalty => format!("{:.1}", self.repetition_penalty),
        }
    }

    pub fn validate(&self, entry: &ModelEntry) -> Result<(), ParamError> {
        let checks = [
            ("temperature", self.temperature, TEMPERATURE),
            ("top_p", self.top_p, TOP_P),
            ("top_k", self.top_k as f32, TOP_K),
            ("repetition_penalty", self.repetition_penalty, REPETITION_PENALTY),
        ];
        for (name, value, knob) in checks {
            if !knob.contains(value) {
                return Err(ParamError::OutOfRange {
                    name,
                    value,
                    min: knob.min,
                    max: knob.max,
                });
            }
        }
        let b = LengthBounds::for_entry(entry);
        if !b.contains(self.max_new_tokens) {
            return Err(ParamError::OutOfRange {
                name: "max_new_tokens",
                value: self.max_new_tokens as f32,
                min: b.min as f32,
                max: b.max as f32,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModelRegistry;
    use pretty_assertions::assert_eq;

    fn entry(label: &str) -> ModelEntry {
        ModelRegistry::builtin().entry(label).cloned().unwrap()
    }

    #[test]
    fn defaults_follow_model_family() {
        let chat = GenerationParameters::for_entry(&entry("Mistral 7B"));
        assert_eq!(chat.max_new_tokens, 2048);
        assert_eq!(chat.top_k, 40);
        assert!(chat.do_sample);
        let gpt = GenerationParameters::for_entry(&entry("GPT-2"));
        assert_eq!(gpt.max_new_tokens, 512);
        assert!(gpt.validate(&entry("GPT-2")).is_ok());
    }

    #[test]
    fn retarget_resets_out_of_range_length() {
        let mistral = entry("Mistral 7B");
        let gpt = entry("GPT-Neo");
        let mut p = GenerationParameters::for_entry(&mistral);
        p.set_max_new_tokens(3000, &mistral);
        assert_eq!(p.max_new_tokens, 3008);
        p.retarget(&gpt);
        assert_eq!(p.max_new_tokens, 512);

        p.set_max_new_tokens(768, &gpt);
        p.retarget(&mistral);
        assert_eq!(p.max_new_tokens, 768);
    }

    #[test]
    fn setters_clamp_and_snap() {
        let e = entry("Mistral 7B");
        let mut p = GenerationParameters::for_entry(&e);
        p.set_temperature(5.0);
        assert_eq!(p.temperature, 2.0);
        p.set_top_p(0.93);
        assert_eq!(p.top_p, 0.95);
        p.set_top_k(101);
        assert_eq!(p.top_k, 100);
        p.set_repetition_penalty(0.5);
        assert_eq!(p.repetition_penalty, 1.0);
        p.set_max_new_tokens(10, &e);
        assert_eq!(p.max_new_tokens, 64);
    }

    #[test]
    fn nudge_moves_by_step() {
        let e = entry("Mistral 7B");
        let mut p = GenerationParameters::for_entry(&e);
        p.nudge(Param::Temperature, 2, &e);
        assert_eq!(p.display(Param::Temperature), "0.3");
        p.nudge(Param::TopK, -1, &e);
        assert_eq!(p.top_k, 35);
        p.nudge(Param::MaxNewTokens, 1, &e);
        assert_eq!(p.max_new_tokens, 2112);
        p.nudge(Param::Sample, 1, &e);
        assert!(!p.do_sample);
        p.nudge(Param::TopK, -100, &e);
        assert_eq!(p.top_k, 0);
    }

    #[test]
    fn lightweight_cap_overrides_user_length() {
        let gpt = entry("GPT-2");
        let mut p = GenerationParameters::for_entry(&gpt);
        p.max_new_tokens = 2048;
        assert_eq!(p.effective_max_new_tokens(&gpt), LIGHTWEIGHT_TOKEN_CEILING);
        let mistral = entry("Mistral 7B");
        assert_eq!(p.effective_max_new_tokens(&mistral), 2048);
    }

    #[test]
    fn validate_reports_out_of_range() {
        let e = entry("GPT-2");
        let mut p = GenerationParameters::for_entry(&e);
        p.max_new_tokens = 2048;
        assert!(matches!(
            p.validate(&e),
            Err(ParamError::OutOfRange { name: "max_new_tokens", .. })
        ));
        p.max_new_tokens = 512;
        p.top_p = 1.5;
        assert!(matches!(
            p.validate(&e),
            Err(ParamError::OutOfRange { name: "top_p", .. })
        ));
    }
}
