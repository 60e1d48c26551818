//! Stochastic user response simulator.
//!
//! The simulated user answers the oracle's dialogue acts on behalf of a
//! human whose real goal is the environment's hidden intent. Answers are
//! noisy but consistent with that goal: the intended object is picked more
//! often than chance, confirmations about it are accepted more often than
//! not, and an object the user just declined is rarely picked again straight
//! away.
//!
//! Every answer is appended to [`Memory::past_dialogs`] and folded back into
//! the [`OracleState`] so the next decision sees it.

use grasp_sim::Environment;
use grasp_sim::teleop::roll;
use grasp_types::{Memory, Object, Role, ToolCall, choice_label, find_object};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::oracle::{OracleState, PromptContext};

/// Reply probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserModel {
    /// Chance of staying silent when no answer is being waited for.
    pub silence_prob: f64,
    /// Chance of naming the hidden goal when it is among the offered labels.
    pub pick_intended_prob: f64,
    /// Chance of switching away from a pick the user just declined.
    pub avoid_declined_prob: f64,
    /// Chance of YES when the prompt is about the hidden goal.
    pub yes_if_intended_prob: f64,
    /// Chance of YES for any other object.
    pub yes_otherwise_prob: f64,
}

impl Default for UserModel {
    fn default() -> Self {
        Self {
            silence_prob: 0.6,
            pick_intended_prob: 0.7,
            avoid_declined_prob: 0.85,
            yes_if_intended_prob: 0.75,
            yes_otherwise_prob: 0.25,
        }
    }
}

impl UserModel {
    /// React to `call`, updating `memory` and `state`.
    ///
    /// Returns the user's reply, or `None` when the user said nothing.
    /// `state.last_prompt_context` is always cleared.
    pub fn respond<E, R>(
        &self,
        rng: &mut R,
        call: &ToolCall,
        env: &E,
        memory: &mut Memory,
        state: &mut OracleState,
    ) -> Option<String>
    where
        E: Environment,
        R: Rng + ?Sized,
    {
        let context = state.last_prompt_context.take();
        let args = call.as_interact()?;

        if !state.is_awaiting() && roll(rng, self.silence_prob) {
            debug!("user stays silent");
            return None;
        }

        let reply = match context {
            Some(PromptContext::CandidateQuestion { labels }) => {
                let offered: Vec<String> = if labels.is_empty() {
                    args.choices.iter().map(|c| choice_label(c).to_string()).collect()
                } else {
                    labels
                };
                let pick = self.pick_label(rng, &offered, env, state)?;
                if let Some(obj) = env.objects().iter().find(|o| o.label == pick) {
                    state.selected_obj_id = Some(obj.id.clone());
                    state.intended_obj_id = obj.id.clone();
                }
                state.awaiting_choice = false;
                state.awaiting_confirmation = false;
                pick
            }
            Some(PromptContext::Confirm { obj_id, .. }) => {
                let answer = self.yes_no(rng, &obj_id, env, state);
                state.awaiting_confirmation = false;
                answer
            }
            Some(PromptContext::Help { obj_id, .. }) => {
                let answer = self.yes_no(rng, &obj_id, env, state);
                state.awaiting_help = false;
                answer
            }
            None => {
                if !args.choices.iter().any(|c| c.to_uppercase().contains("YES")) {
                    return None;
                }
                String::from(if rng.gen_bool(0.5) { "YES" } else { "NO" })
            }
        };

        debug!(reply = %reply, "user replied");
        memory.push_turn(Role::User, reply.clone());
        Some(reply)
    }

    fn pick_label<E: Environment, R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        offered: &[String],
        env: &E,
        state: &OracleState,
    ) -> Option<String> {
        let objects = env.objects();
        let intended = find_object(objects, env.hidden_intent()).map(|o| o.label.as_str());
        let mut pick = match intended {
            Some(label)
                if offered.iter().any(|l| l == label) && roll(rng, self.pick_intended_prob) =>
            {
                label.to_string()
            }
            _ => offered.choose(rng)?.clone(),
        };

        let declined: Option<&Object> = state
            .last_declined_obj_id
            .as_deref()
            .and_then(|id| find_object(objects, id));
        if let Some(declined) = declined
            && pick == declined.label
            && offered.len() >= 2
            && roll(rng, self.avoid_declined_prob)
        {
            let others: Vec<&String> = offered.iter().filter(|l| **l != declined.label).collect();
            if let Some(other) = others.choose(rng) {
                pick = (*other).clone();
            }
        }
        Some(pick)
    }

    /// Answer a yes/no prompt about `obj_id`.
    fn yes_no<E: Environment, R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        obj_id: &str,
        env: &E,
        state: &mut OracleState,
    ) -> String {
        let p = if obj_id == env.hidden_intent() {
            self.yes_if_intended_prob
        } else {
            self.yes_otherwise_prob
        };
        let accepted = roll(rng, p);
        if accepted {
            state.pending_action_obj_id = Some(obj_id.to_string());
            state.intended_obj_id = obj_id.to_string();
            state.last_declined_obj_id = None;
        } else {
            state.last_declined_obj_id = Some(obj_id.to_string());
        }
        state.selected_obj_id = None;
        String::from(if accepted { "YES" } else { "NO" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grasp_sim::{GridWorld, GridWorldBuilder};
    use grasp_types::{InteractKind, ToolName, Yaw, ZBand, numbered_choices};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Mug is the hidden goal; apple sits next to it.
    fn scene() -> GridWorld {
        GridWorldBuilder::new(3, 3)
            .object("o0", "mug", "B1", Yaw::N)
            .object("o1", "apple", "B3", Yaw::E)
            .hold("B2", Yaw::N, ZBand::Mid, 6)
            .intended("o0")
            .build()
            .unwrap()
    }

    fn question() -> ToolCall {
        ToolCall::interact(
            InteractKind::Question,
            "Which one do you want to grasp?",
            numbered_choices(&["mug", "apple"]),
        )
    }

    fn asked(labels: &[&str]) -> OracleState {
        let mut state = OracleState::new("o0");
        state.awaiting_choice = true;
        state.last_prompt_context = Some(PromptContext::CandidateQuestion {
            labels: labels.iter().map(|l| l.to_string()).collect(),
        });
        state
    }

    fn confirm_state(obj_id: &str, label: &str) -> OracleState {
        let mut state = OracleState::new("o0");
        state.awaiting_confirmation = true;
        state.selected_obj_id = Some(obj_id.into());
        state.last_prompt_context = Some(PromptContext::Confirm {
            obj_id: obj_id.into(),
            label: label.into(),
            action: Some(ToolName::Approach),
        });
        state
    }

    fn yes_no_call() -> ToolCall {
        ToolCall::interact(
            InteractKind::Confirm,
            "Do you want me to approach the mug?",
            numbered_choices(&["YES", "NO"]),
        )
    }

    #[test]
    fn motion_calls_get_no_reply() {
        let world = scene();
        let mut state = asked(&["mug", "apple"]);
        let mut memory = Memory::default();
        let reply = UserModel::default().respond(
            &mut StdRng::seed_from_u64(0),
            &ToolCall::Approach { obj: "o0".into() },
            &world,
            &mut memory,
            &mut state,
        );
        assert!(reply.is_none());
        assert!(state.last_prompt_context.is_none());
        assert!(memory.past_dialogs.is_empty());
    }

    #[test]
    fn pick_updates_selection_and_intent() {
        let world = scene();
        let model = UserModel::default();
        for seed in 0..20 {
            let mut state = asked(&["mug", "apple"]);
            let mut memory = Memory::default();
            let mut rng = StdRng::seed_from_u64(seed);
            let reply = model
                .respond(&mut rng, &question(), &world, &mut memory, &mut state)
                .unwrap();
            let picked = world.objects().iter().find(|o| o.label == reply).unwrap();
            assert_eq!(state.selected_obj_id.as_deref(), Some(picked.id.as_str()));
            assert_eq!(state.intended_obj_id, picked.id);
            assert!(!state.awaiting_choice);
            assert!(state.last_prompt_context.is_none());
            assert_eq!(memory.past_dialogs.len(), 1);
            assert_eq!(memory.past_dialogs[0].role, Role::User);
        }
    }

    #[test]
    fn intended_label_is_preferred() {
        let world = scene();
        let model = UserModel::default();
        let mut rng = StdRng::seed_from_u64(11);
        let trials = 2000;
        let mut mug = 0;
        for _ in 0..trials {
            let mut state = asked(&["mug", "apple"]);
            let reply = model.respond(&mut rng, &question(), &world, &mut Memory::default(), &mut state);
            if reply.as_deref() == Some("mug") {
                mug += 1;
            }
        }
        // 0.7 + 0.3 * 0.5 = 0.85
        let rate = f64::from(mug) / f64::from(trials);
        assert!((0.80..0.90).contains(&rate), "mug picked at rate {rate}");
    }

    #[test]
    fn declined_object_is_rarely_repicked() {
        let world = scene();
        let model = UserModel::default();
        let trials: u32 = 2000;
        let mut repicks = 0u32;
        for seed in 0..trials {
            let mut rng = StdRng::seed_from_u64(u64::from(seed));
            let mut state = asked(&["mug", "apple"]);
            state.last_declined_obj_id = Some("o0".into());
            let reply = model.respond(&mut rng, &question(), &world, &mut Memory::default(), &mut state);
            if reply.as_deref() == Some("mug") {
                repicks += 1;
            }
        }
        let rate = f64::from(repicks) / f64::from(trials);
        assert!(rate <= 0.15, "declined object re-picked at rate {rate}");
    }

    #[test]
    fn yes_confirms_and_locks_target() {
        let world = scene();
        let model = UserModel {
            yes_if_intended_prob: 1.0,
            ..UserModel::default()
        };
        let mut state = confirm_state("o0", "mug");
        state.last_declined_obj_id = Some("o1".into());
        let mut memory = Memory::default();
        let reply = model.respond(&mut StdRng::seed_from_u64(0), &yes_no_call(), &world, &mut memory, &mut state);
        assert_eq!(reply.as_deref(), Some("YES"));
        assert_eq!(state.pending_action_obj_id.as_deref(), Some("o0"));
        assert_eq!(state.intended_obj_id, "o0");
        assert!(state.last_declined_obj_id.is_none());
        assert!(state.selected_obj_id.is_none());
        assert!(!state.awaiting_confirmation);
    }

    #[test]
    fn no_records_the_decline() {
        let world = scene();
        let model = UserModel {
            yes_otherwise_prob: 0.0,
            ..UserModel::default()
        };
        let mut state = confirm_state("o1", "apple");
        let reply = model.respond(
            &mut StdRng::seed_from_u64(0),
            &yes_no_call(),
            &world,
            &mut Memory::default(),
            &mut state,
        );
        assert_eq!(reply.as_deref(), Some("NO"));
        assert_eq!(state.last_declined_obj_id.as_deref(), Some("o1"));
        assert!(state.pending_action_obj_id.is_none());
        assert!(state.selected_obj_id.is_none());
        assert!(!state.awaiting_confirmation);
    }

    #[test]
    fn help_answer_clears_awaiting_help() {
        let world = scene();
        let mut state = OracleState::new("o0");
        state.awaiting_help = true;
        state.last_prompt_context = Some(PromptContext::Help {
            obj_id: "o0".into(),
            yaws: (Yaw::E, Yaw::W, Yaw::N),
        });
        let reply = UserModel::default().respond(
            &mut StdRng::seed_from_u64(5),
            &yes_no_call(),
            &world,
            &mut Memory::default(),
            &mut state,
        );
        assert!(matches!(reply.as_deref(), Some("YES" | "NO")));
        assert!(!state.awaiting_help);
    }

    #[test]
    fn unprompted_user_may_stay_silent() {
        let world = scene();
        let model = UserModel {
            silence_prob: 1.0,
            ..UserModel::default()
        };
        let mut state = OracleState::new("o0");
        state.last_prompt_context = Some(PromptContext::Confirm {
            obj_id: "o0".into(),
            label: "mug".into(),
            action: None,
        });
        let mut memory = Memory::default();
        let reply = model.respond(&mut StdRng::seed_from_u64(0), &yes_no_call(), &world, &mut memory, &mut state);
        assert!(reply.is_none());
        assert!(memory.past_dialogs.is_empty());
        assert!(state.last_prompt_context.is_none());
    }

    #[test]
    fn awaited_prompts_are_always_answered() {
        let world = scene();
        let model = UserModel {
            silence_prob: 1.0,
            ..UserModel::default()
        };
        let mut state = confirm_state("o0", "mug");
        let reply = model.respond(
            &mut StdRng::seed_from_u64(0),
            &yes_no_call(),
            &world,
            &mut Memory::default(),
            &mut state,
        );
        assert!(reply.is_some());
    }

    #[test]
    fn fallback_answers_only_yes_no_prompts() {
        let world = scene();
        let model = UserModel {
            silence_prob: 0.0,
            ..UserModel::default()
        };
        let mut memory = Memory::default();
        let mut state = OracleState::new("o0");
        let reply = model.respond(&mut StdRng::seed_from_u64(1), &yes_no_call(), &world, &mut memory, &mut state);
        assert!(matches!(reply.as_deref(), Some("YES" | "NO")));

        let mut state = OracleState::new("o0");
        let reply = model.respond(&mut StdRng::seed_from_u64(1), &question(), &world, &mut memory, &mut state);
        assert!(reply.is_none());
        assert_eq!(memory.past_dialogs.len(), 1);
    }
}
