use dupeguard_domain::{normalize_actor_identifier, ActorId, Verdict};

use crate::EngineState;

/// Verdicts still inside the retention horizon, oldest first.
pub fn active_verdicts(state: &EngineState, actor: Option<&str>) -> Vec<Verdict> {
    match actor.and_then(normalize_actor_identifier) {
        Some(actor) => state.verdicts.active(Some(&ActorId::new(actor))),
        None => state.verdicts.active(None),
    }
}
