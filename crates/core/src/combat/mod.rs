//! Ranged bombardment resolution.
//!
//! The resolution runs in the fixed order the rules demand: eligibility
//! scan, target discovery within range, target selection by the acting
//! player, damage rolls through the bridge, clamped damage application,
//! then side effects (history, moved flags, deaths, sound). All changes
//! for one strike are computed before any is applied.

pub mod policy;

use std::collections::BTreeSet;

use crate::bridge::{DelegateBridge, SoundClip};
use crate::change::Change;
use crate::config::RuleVariants;
use crate::dice::DiceKind;
use crate::error::EngineError;
use crate::ids::{PlayerId, TerritoryId, UnitId};
use crate::phase::{Endable, RequiresInput, Startable};
use crate::state::{GameState, Unit};
use crate::text;

pub use policy::{RollPlan, best_bonus_plan, map_default_plan};

/// Delegate for the bombardment phase.
#[derive(Clone, Copy, Debug, Default)]
pub struct BombardmentDelegate;

impl BombardmentDelegate {
    pub fn new() -> Self {
        Self
    }

    /// Executes one full bombardment resolution for the acting player.
    pub fn run(&mut self, bridge: &mut dyn DelegateBridge) -> Result<(), EngineError> {
        let player = bridge.player();
        let (origins, variants, player_name) = {
            let state = bridge.game().read();
            (
                eligible_origins(&state, player),
                state.variants.clone(),
                text::player_name(&state, player),
            )
        };
        if origins.is_empty() {
            bridge
                .history()
                .start_event(format!("{player_name} has no units able to bombard"));
            return Ok(());
        }
        if variants.per_launcher_targeting {
            self.run_per_launcher(bridge, player, &origins, &variants)
        } else {
            self.run_collective(bridge, player, &origins, &variants, &player_name)
        }
    }

    /// Every eligible origin independently selects one target. With the
    /// one-attack-per-territory sub-variant, already-struck territories
    /// leave the candidate pool.
    fn run_per_launcher(
        &mut self,
        bridge: &mut dyn DelegateBridge,
        player: PlayerId,
        origins: &[TerritoryId],
        variants: &RuleVariants,
    ) -> Result<(), EngineError> {
        let mut attacked: BTreeSet<TerritoryId> = BTreeSet::new();
        let mut strikes: Vec<(TerritoryId, TerritoryId)> = Vec::new();
        for &origin in origins {
            let mut candidates = {
                let state = bridge.game().read();
                targets_in_range(&state, origin, player, variants)?
            };
            if variants.one_attack_per_territory {
                candidates.retain(|territory| !attacked.contains(territory));
            }
            if candidates.is_empty() {
                continue;
            }
            // Ask even with a single candidate: declining is always legal.
            let candidates: Vec<TerritoryId> = candidates.into_iter().collect();
            let choice = bridge
                .remote_self()
                .choose_bombardment_target(&candidates, Some(origin))
                .map_err(|_| EngineError::Disconnected { player })?;
            if let Some(target) = choice {
                if !candidates.contains(&target) {
                    return Err(EngineError::invariant(format!(
                        "remote chose {target}, which is not a candidate"
                    )));
                }
                attacked.insert(target);
                strikes.push((target, origin));
            }
        }
        for (target, origin) in strikes {
            self.fire(bridge, player, target, Some(origin), variants)?;
        }
        Ok(())
    }

    /// All origins contribute to a single collective attack with one shared
    /// target for the whole turn.
    fn run_collective(
        &mut self,
        bridge: &mut dyn DelegateBridge,
        player: PlayerId,
        origins: &[TerritoryId],
        variants: &RuleVariants,
        player_name: &str,
    ) -> Result<(), EngineError> {
        let candidates: BTreeSet<TerritoryId> = {
            let state = bridge.game().read();
            let mut all = BTreeSet::new();
            for &origin in origins {
                all.extend(targets_in_range(&state, origin, player, variants)?);
            }
            all
        };
        if candidates.is_empty() {
            bridge
                .history()
                .start_event(format!("{player_name} has no targets to bombard"));
            return Ok(());
        }
        let candidates: Vec<TerritoryId> = candidates.into_iter().collect();
        let choice = bridge
            .remote_self()
            .choose_bombardment_target(&candidates, None)
            .map_err(|_| EngineError::Disconnected { player })?;
        if let Some(target) = choice {
            if !candidates.contains(&target) {
                return Err(EngineError::invariant(format!(
                    "remote chose {target}, which is not a candidate"
                )));
            }
            self.fire(bridge, player, target, None, variants)?;
        }
        Ok(())
    }

    /// Resolves one strike against `target`, launched from `origin` (or
    /// collectively, with no origin).
    fn fire(
        &mut self,
        bridge: &mut dyn DelegateBridge,
        player: PlayerId,
        target: TerritoryId,
        origin: Option<TerritoryId>,
        variants: &RuleVariants,
    ) -> Result<(), EngineError> {
        let strike = {
            let state = bridge.game().read();
            prepare_strike(&state, player, target, origin, variants)?
        };
        let Some(strike) = strike else {
            return Ok(());
        };

        // Select the victim unit when damage goes to units rather than the
        // territory. A lone candidate is auto-selected; otherwise the
        // player is asked until they pick one.
        let target_unit = if variants.bombing_damages_units {
            let candidates = {
                let state = bridge.game().read();
                attackable_units(&state, target, player)?
            };
            if candidates.is_empty() {
                return Ok(());
            }
            if candidates.len() == 1 {
                Some(candidates[0])
            } else {
                loop {
                    let choice = bridge
                        .remote_self()
                        .choose_unit_target(target, &candidates)
                        .map_err(|_| EngineError::Disconnected { player })?;
                    if let Some(unit) = choice {
                        if !candidates.contains(&unit) {
                            return Err(EngineError::invariant(format!(
                                "remote chose {unit}, which is not a candidate"
                            )));
                        }
                        break Some(unit);
                    }
                }
            }
        } else {
            None
        };

        // Reaching the roll with no attackers left is structurally
        // impossible; treat it as the fatal logic error it would be.
        if origin.is_some() && strike.rockets.is_empty() {
            return Err(EngineError::invariant(format!(
                "bombardment of {target} reached the roll step with no attackers"
            )));
        }

        let (raw_cost, transcript) = if strike.plan.sides > 0 {
            let rolls = bridge.random(
                strike.plan.sides,
                strike.attacks as usize,
                player,
                DiceKind::Bombing,
                &strike.annotation,
            )?;
            let transcript = format!(
                "Bombardment{} roll: {}",
                strike.origin_text,
                text::dice_text(&strike.plan.displayed(&rolls)),
            );
            (strike.plan.raw_cost(&rolls), transcript)
        } else {
            let transcript = format!(
                "Bombardment{} does {} damage per attack",
                strike.origin_text, strike.plan.flat_bonus,
            );
            (strike.plan.diceless_cost(strike.attacks), transcript)
        };

        // Compute every change for the strike before applying any of them.
        let outcome = {
            let state = bridge.game().read();
            settle_strike(&state, &strike, target, target_unit, raw_cost, variants)?
        };

        bridge.history().start_event(outcome.summary.clone());
        bridge.history().add_child(
            transcript,
            strike.rockets.iter().map(|&unit| unit.into()).collect(),
        );
        if let Some((description, related)) = &outcome.deaths {
            bridge.history().add_child(description.clone(), related.clone());
        }
        bridge.add_change(Change::Group(outcome.changes))?;
        let _ = bridge.remote_self().report(&outcome.summary);

        if outcome.cost > 0 {
            bridge.sound().play_for_all(SoundClip::BombardmentHit, player);
        }
        Ok(())
    }
}

impl Startable for BombardmentDelegate {
    fn start(&mut self, _bridge: &mut dyn DelegateBridge) -> Result<(), EngineError> {
        Ok(())
    }
}

impl Endable for BombardmentDelegate {
    fn end(&mut self, _bridge: &mut dyn DelegateBridge) -> Result<(), EngineError> {
        Ok(())
    }
}

impl RequiresInput for BombardmentDelegate {
    fn requires_user_input(&self, _state: &GameState) -> bool {
        false
    }
}

/// Everything a strike needs that is read from state before any blocking
/// call.
struct Strike {
    rockets: Vec<UnitId>,
    attacks: u32,
    plan: RollPlan,
    defender: Option<PlayerId>,
    attacker_name: String,
    annotation: String,
    origin_text: String,
}

/// What a settled strike applies and narrates.
struct StrikeOutcome {
    cost: u32,
    changes: Vec<Change>,
    summary: String,
    deaths: Option<(String, Vec<crate::ids::EntityRef>)>,
}

/// Step 1: territories of the acting player hosting an eligible attacker,
/// excluding territories conquered this turn.
pub fn eligible_origins(state: &GameState, player: PlayerId) -> Vec<TerritoryId> {
    state
        .territories
        .values()
        .filter(|territory| !state.conquered_this_turn.contains(&territory.id))
        .filter(|territory| {
            territory.units.iter().any(|&unit| {
                state
                    .units
                    .get(&unit)
                    .is_some_and(|record| is_eligible_attacker(state, record, player))
            })
        })
        .map(|territory| territory.id)
        .collect()
}

fn is_eligible_attacker(state: &GameState, unit: &Unit, player: PlayerId) -> bool {
    unit.owner == player
        && !unit.disabled
        && !unit.submerged
        && !unit.moved_this_turn
        && unit.transported_by.is_none()
        && state
            .unit_type(unit)
            .map(|data| data.can_bombard)
            .unwrap_or(false)
}

/// Step 2: territories reachable within the player's bombardment range,
/// routing only through territories that permit overflight (and, unless
/// the variant allows it, are not impassable), holding an attackable enemy
/// unit.
pub fn targets_in_range(
    state: &GameState,
    origin: TerritoryId,
    player: PlayerId,
    variants: &RuleVariants,
) -> Result<BTreeSet<TerritoryId>, EngineError> {
    let range = state.player(player)?.tech_profile.bombard_range;
    let admit = |territory: TerritoryId| {
        state.territories.get(&territory).is_some_and(|record| {
            record.allows_overflight && (variants.rockets_cross_impassable || !record.is_impassable)
        })
    };
    let mut targets = BTreeSet::new();
    for (territory, _steps) in state.data.map.reachable(origin, range, admit) {
        if !attackable_units(state, territory, player)?.is_empty() {
            targets.insert(territory);
        }
    }
    Ok(targets)
}

/// Enemy units in a territory that bombardment damage can still be applied
/// to: at war with the attacker, not in transit, damageable, and below
/// their damage cap.
pub fn attackable_units(
    state: &GameState,
    territory: TerritoryId,
    player: PlayerId,
) -> Result<Vec<UnitId>, EngineError> {
    let holder = state.territory(territory)?;
    let mut attackable = Vec::new();
    for &unit in &holder.units {
        let record = state.unit(unit)?;
        if !state.at_war(player, record.owner) || record.transported_by.is_some() {
            continue;
        }
        let data = state.unit_type(record)?;
        if data.can_be_damaged && data.remaining_damage_capacity(record.bombing_damage) > 0 {
            attackable.push(unit);
        }
    }
    Ok(attackable)
}

/// Steps 3–5 bookkeeping: attacker set, roll count, and dice plan.
/// Returns `None` when the origin contributes no attacks.
fn prepare_strike(
    state: &GameState,
    player: PlayerId,
    target: TerritoryId,
    origin: Option<TerritoryId>,
    variants: &RuleVariants,
) -> Result<Option<Strike>, EngineError> {
    let rockets: Vec<UnitId> = match origin {
        Some(origin) => {
            let holder = state.territory(origin)?;
            let mut rockets = Vec::new();
            for &unit in &holder.units {
                if is_eligible_attacker(state, state.unit(unit)?, player) {
                    rockets.push(unit);
                }
            }
            rockets
        }
        None => Vec::new(),
    };

    let profile = &state.player(player)?.tech_profile;
    let attacks = match origin {
        // A collective strike always takes exactly one roll.
        None => 1,
        Some(_) => {
            let dice = rockets.len() as u32 * profile.dice_per_attacker;
            profile.max_attacks_per_territory.min(dice)
        }
    };
    if attacks == 0 {
        return Ok(None);
    }

    let use_bonus = variants.use_bombing_bonus && origin.is_some();
    let plan = if use_bonus {
        let types = rockets
            .iter()
            .map(|&unit| state.unit_type(state.unit(unit)?))
            .collect::<Result<Vec<_>, _>>()?;
        best_bonus_plan(variants, types)
    } else {
        map_default_plan(variants)
    };

    let defender = state.territory(target)?.owner;
    let attacker_name = text::player_name(state, player);
    let annotation = format!(
        "Bombardment by {attacker_name} at {}",
        text::territory_name(state, target),
    );
    let origin_text = origin
        .map(|origin| format!(" from {}", text::territory_name(state, origin)))
        .unwrap_or_default();

    Ok(Some(Strike {
        rockets,
        attacks,
        plan,
        defender,
        attacker_name,
        annotation,
        origin_text,
    }))
}

/// Step 6–7: clamps the raw cost under the damage policy and assembles the
/// full change group for the strike.
fn settle_strike(
    state: &GameState,
    strike: &Strike,
    target: TerritoryId,
    target_unit: Option<UnitId>,
    raw_cost: u32,
    variants: &RuleVariants,
) -> Result<StrikeOutcome, EngineError> {
    let mut changes = Vec::new();
    let mut deaths = None;
    let territory = target;

    let (cost, summary) = if let Some(unit) = target_unit {
        let record = state.unit(unit)?;
        let data = state.unit_type(record)?;
        let cost = raw_cost.min(data.remaining_damage_capacity(record.bombing_damage));
        let updated = record.bombing_damage + cost;
        changes.push(Change::set_bombing_damage(state, unit, updated)?);

        if data.dies_at_max_damage
            && data.max_bombing_damage.is_some_and(|max| updated >= max)
        {
            // The captured removal record must match the unit as it will be
            // at removal time, after the damage change lands.
            let mut corpse = record.clone();
            corpse.bombing_damage = updated;
            changes.push(Change::RemoveUnits {
                territory,
                units: vec![corpse],
            });
            deaths = Some((
                format!(
                    "{} lost in {}",
                    data.name,
                    text::territory_name(state, territory)
                ),
                vec![unit.into()],
            ));
        }

        let summary = format!(
            "Bombardment of {} does {cost} damage to {}",
            text::territory_name(state, territory),
            data.name,
        );
        (cost, summary)
    } else {
        let record = state.territory(territory)?;
        let mut cost = raw_cost;
        if variants.limit_damage_to_production {
            let mut production = record.production;
            if variants.deduct_prior_damage {
                production =
                    production.saturating_sub(state.territory_damage_this_turn(territory));
            }
            cost = cost.min(production);
        }
        // The tracker counts pre-multiplier damage.
        let tracked = cost;
        cost *= variants.resource_multiplier;

        let summary = match strike.defender {
            Some(defender) => {
                let available = state
                    .player(defender)?
                    .resource(state.data.primary_resource);
                cost = cost.min(available);
                if cost > 0 {
                    changes.push(Change::ResourceDelta {
                        player: defender,
                        resource: state.data.primary_resource,
                        delta: -(cost as i64),
                    });
                }
                format!(
                    "{} lost {cost} {} to bombardment by {}",
                    text::player_name(state, defender),
                    state.data.resources.name(state.data.primary_resource),
                    strike.attacker_name,
                )
            }
            // An unowned territory has no balance to charge; the roll and
            // trackers still stand.
            None => format!(
                "Bombardment of {} finds no owner to charge",
                text::territory_name(state, territory)
            ),
        };
        if tracked > 0 {
            changes.push(Change::TerritoryDamageDelta {
                territory,
                delta: tracked as i64,
            });
        }
        (cost, summary)
    };

    if target_unit.is_some() && cost > 0 {
        changes.push(Change::TerritoryDamageDelta {
            territory,
            delta: cost as i64,
        });
    }

    // Step 7: the firing unit has acted this turn. One attacker is marked
    // per strike.
    if let Some(&rocket) = strike.rockets.first() {
        changes.push(Change::set_moved(state, rocket, true)?);
    }

    Ok(StrikeOutcome {
        cost,
        changes,
        summary,
        deaths,
    })
}
