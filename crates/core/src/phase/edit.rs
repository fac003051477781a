//! The edit phase: direct state surgery while edit mode is enabled.
//!
//! Every operation validates first and returns a [`Ruling`]; a rejected
//! edit applies nothing and writes no history. All changes for one edit are
//! grouped, so a fatal failure cannot leave a partial application.

use std::collections::BTreeSet;

use crate::bridge::DelegateBridge;
use crate::change::Change;
use crate::error::{EngineError, Rejection, Ruling};
use crate::ids::{PlayerId, RelationshipTypeId, ResourceId, TechId, TerritoryId, UnitId, UnitTypeId};
use crate::phase::{Endable, RequiresInput, Startable};
use crate::state::{Domain, GameState, Unit};
use crate::text;

/// Delegate for the edit phase. Stateless: edit mode itself lives in the
/// state store so it replays and saves like everything else.
#[derive(Clone, Copy, Debug, Default)]
pub struct EditDelegate;

impl EditDelegate {
    pub fn new() -> Self {
        Self
    }

    /// Flips edit mode. Applies nothing when already in the requested mode.
    pub fn set_edit_mode(
        &mut self,
        bridge: &mut dyn DelegateBridge,
        enabled: bool,
    ) -> Result<Ruling, EngineError> {
        let change = {
            let state = bridge.game().read();
            if state.edit_mode == enabled {
                return Ok(Ruling::Applied);
            }
            Change::set_edit_mode(&state, enabled)
        };
        bridge.history().start_event(format!(
            "Turning edit mode {}",
            if enabled { "on" } else { "off" }
        ));
        bridge.add_change(change)?;
        Ok(Ruling::Applied)
    }

    /// Removes units from a territory, one grouped change per owner.
    pub fn remove_units(
        &mut self,
        bridge: &mut dyn DelegateBridge,
        territory: TerritoryId,
        units: &[UnitId],
    ) -> Result<Ruling, EngineError> {
        // One (event text, removal change) batch per owning player.
        let mut batches = Vec::new();
        {
            let state = bridge.game().read();
            if !state.edit_mode {
                return Ok(Rejection::EditModeDisabled.into());
            }
            if units.is_empty() {
                return Ok(Ruling::Applied);
            }
            let holder = state.territory(territory)?;
            for &unit in units {
                if !holder.units.contains(&unit) {
                    return Ok(Rejection::UnitNotInTerritory { unit, territory }.into());
                }
            }
            let owners: BTreeSet<PlayerId> = units
                .iter()
                .map(|&unit| state.unit(unit).map(|record| record.owner))
                .collect::<Result<_, _>>()?;
            for owner in owners {
                let owned: Vec<UnitId> = units
                    .iter()
                    .copied()
                    .filter(|&unit| {
                        state
                            .units
                            .get(&unit)
                            .is_some_and(|record| record.owner == owner)
                    })
                    .collect();
                let description = format!(
                    "Removing units owned by {} from {}: {}",
                    text::player_name(&state, owner),
                    text::territory_name(&state, territory),
                    text::describe_units(&state, owned.iter().copied()),
                );
                batches.push((description, Change::remove_units(&state, territory, &owned)?));
            }
        }
        for (description, change) in batches {
            bridge.history().start_event(description);
            bridge.add_change(change)?;
        }
        Ok(Ruling::Applied)
    }

    /// Adds freshly created units to a territory. Land units placed on
    /// water must be coverable by compatible transport capacity — new or
    /// already present — or the whole action is rejected.
    pub fn add_units(
        &mut self,
        bridge: &mut dyn DelegateBridge,
        territory: TerritoryId,
        units: &[(UnitTypeId, PlayerId)],
    ) -> Result<Ruling, EngineError> {
        let (description, group) = {
            let state = bridge.game().read();
            if !state.edit_mode {
                return Ok(Rejection::EditModeDisabled.into());
            }
            if units.is_empty() {
                return Ok(Ruling::Applied);
            }
            let holder = state.territory(territory)?;
            let player = units[0].1;
            for &(unit_type, owner) in units {
                state.player(owner)?;
                if state.data.unit_types.get(unit_type).is_none() {
                    return Err(EngineError::invariant(format!("unregistered {unit_type}")));
                }
            }
            let type_of = |unit_type: UnitTypeId| {
                state
                    .data
                    .unit_types
                    .get(unit_type)
                    .expect("checked above")
            };

            if !holder.is_water
                && units
                    .iter()
                    .any(|&(unit_type, _)| type_of(unit_type).domain == Domain::Sea)
            {
                return Ok(Rejection::SeaUnitsOnLand.into());
            }

            // Pre-allocate ids so transport assignments can reference both
            // new and existing carriers.
            let first_id = state.next_unit_id().0;
            let records: Vec<Unit> = units
                .iter()
                .enumerate()
                .map(|(index, &(unit_type, owner))| {
                    Unit::new(UnitId(first_id + index as u32), unit_type, owner)
                })
                .collect();

            let mut assignments: Vec<(UnitId, UnitId)> = Vec::new();
            let land_indices: Vec<usize> = records
                .iter()
                .enumerate()
                .filter(|(_, unit)| type_of(unit.unit_type).domain == Domain::Land)
                .map(|(index, _)| index)
                .collect();
            if holder.is_water && !land_indices.is_empty() {
                if units.iter().any(|&(_, owner)| !state.is_allied(player, owner)) {
                    return Ok(Rejection::MixedOwnershipOnWater.into());
                }
                if land_indices
                    .iter()
                    .any(|&index| !type_of(records[index].unit_type).can_be_transported)
                {
                    return Ok(Rejection::UntransportableOnWater.into());
                }
                // Carrier pool: new sea units with capacity plus allied
                // transports already in the territory.
                let mut carriers: Vec<(UnitId, u32)> = records
                    .iter()
                    .filter(|unit| type_of(unit.unit_type).transport_capacity > 0)
                    .map(|unit| (unit.id, type_of(unit.unit_type).transport_capacity))
                    .collect();
                for &existing in &holder.units {
                    let record = state.unit(existing)?;
                    if state.is_allied(player, record.owner)
                        && state.unit_type(record)?.transport_capacity > 0
                    {
                        carriers.push((existing, state.free_transport_capacity(existing)?));
                    }
                }
                if carriers.is_empty() {
                    return Ok(Rejection::NotEnoughTransports.into());
                }
                // Greedy matching, heaviest load first onto the roomiest
                // carrier. If the match cannot cover every land unit the
                // whole action is rejected.
                let mut loads: Vec<usize> = land_indices.clone();
                loads.sort_by_key(|&index| {
                    std::cmp::Reverse(type_of(records[index].unit_type).transport_cost)
                });
                for index in loads {
                    let cost = type_of(records[index].unit_type).transport_cost;
                    let Some(best) = carriers.iter_mut().max_by_key(|carrier| carrier.1) else {
                        return Ok(Rejection::NotEnoughTransports.into());
                    };
                    if best.1 < cost {
                        return Ok(Rejection::NotEnoughTransports.into());
                    }
                    best.1 -= cost;
                    assignments.push((records[index].id, best.0));
                }
            }

            let description = format!(
                "Adding units owned by {} to {}: {}",
                text::player_name(&state, player),
                text::territory_name(&state, territory),
                describe_new_units(&state, units),
            );
            let mut members = vec![Change::AddUnits {
                territory,
                units: records,
            }];
            members.extend(assignments.into_iter().map(|(unit, carrier)| {
                Change::SetTransport {
                    unit,
                    prev: None,
                    next: Some(carrier),
                }
            }));
            (description, Change::Group(members))
        };
        bridge.history().start_event(description);
        bridge.add_change(group)?;
        Ok(Ruling::Applied)
    }

    /// Transfers territory ownership. Infrastructure follows the territory;
    /// enemy infrastructure is additionally marked as having moved.
    pub fn change_territory_owner(
        &mut self,
        bridge: &mut dyn DelegateBridge,
        territory: TerritoryId,
        new_owner: PlayerId,
    ) -> Result<Ruling, EngineError> {
        let (description, group) = {
            let state = bridge.game().read();
            if !state.edit_mode {
                return Ok(Rejection::EditModeDisabled.into());
            }
            let holder = state.territory(territory)?;
            state.player(new_owner)?;
            if holder.owner == Some(new_owner) {
                return Ok(Rejection::OwnerUnchanged { territory }.into());
            }

            let hostile = holder
                .owner
                .is_some_and(|old_owner| state.at_war(old_owner, new_owner));
            let mut members = Vec::new();
            for &unit in &holder.units {
                let record = state.unit(unit)?;
                if !state.unit_type(record)?.is_infrastructure {
                    continue;
                }
                if hostile {
                    if !state.at_war(record.owner, new_owner) {
                        continue;
                    }
                    members.push(Change::set_moved(&state, unit, true)?);
                }
                members.push(Change::set_unit_owner(&state, unit, new_owner)?);
            }
            members.push(Change::set_territory_owner(&state, territory, Some(new_owner))?);

            let old_name = holder
                .owner
                .map(|owner| text::player_name(&state, owner))
                .unwrap_or_else(|| "no one".to_string());
            let description = format!(
                "Changing ownership of {} from {} to {}",
                text::territory_name(&state, territory),
                old_name,
                text::player_name(&state, new_owner),
            );
            (description, Change::Group(members))
        };
        bridge.history().start_event(description);
        bridge.add_change(group)?;
        Ok(Ruling::Applied)
    }

    /// Sets a player's balance of one resource to a new total.
    pub fn set_resource_total(
        &mut self,
        bridge: &mut dyn DelegateBridge,
        player: PlayerId,
        resource: ResourceId,
        new_total: i64,
    ) -> Result<Ruling, EngineError> {
        let (description, change) = {
            let state = bridge.game().read();
            if !state.edit_mode {
                return Ok(Rejection::EditModeDisabled.into());
            }
            let old_total = state.player(player)?.resource(resource) as i64;
            if old_total == new_total {
                return Ok(Rejection::UnchangedTotal { resource }.into());
            }
            if new_total < 0 {
                return Ok(Rejection::InvalidTotal { resource }.into());
            }
            let description = format!(
                "Changing {} for {} from {} to {}",
                state.data.resources.name(resource),
                text::player_name(&state, player),
                old_total,
                new_total,
            );
            (
                description,
                Change::ResourceDelta {
                    player,
                    resource,
                    delta: new_total - old_total,
                },
            )
        };
        bridge.history().start_event(description);
        bridge.add_change(change)?;
        Ok(Ruling::Applied)
    }

    /// Grants technology advances to a player.
    pub fn add_techs(
        &mut self,
        bridge: &mut dyn DelegateBridge,
        player: PlayerId,
        techs: &[TechId],
    ) -> Result<Ruling, EngineError> {
        let batches = {
            let state = bridge.game().read();
            if !state.edit_mode {
                return Ok(Rejection::EditModeDisabled.into());
            }
            let record = state.player(player)?;
            for &tech in techs {
                if record.techs.contains(&tech) {
                    return Ok(Rejection::TechAlreadyKnown { player, tech }.into());
                }
            }
            techs
                .iter()
                .map(|&tech| {
                    (
                        format!(
                            "Adding technology {tech} for {}",
                            text::player_name(&state, player)
                        ),
                        Change::AddTech { player, tech },
                    )
                })
                .collect::<Vec<_>>()
        };
        for (description, change) in batches {
            bridge.history().start_event(description);
            bridge.add_change(change)?;
        }
        Ok(Ruling::Applied)
    }

    /// Revokes technology advances from a player.
    pub fn remove_techs(
        &mut self,
        bridge: &mut dyn DelegateBridge,
        player: PlayerId,
        techs: &[TechId],
    ) -> Result<Ruling, EngineError> {
        let batches = {
            let state = bridge.game().read();
            if !state.edit_mode {
                return Ok(Rejection::EditModeDisabled.into());
            }
            let record = state.player(player)?;
            for &tech in techs {
                if !record.techs.contains(&tech) {
                    return Ok(Rejection::TechNotKnown { player, tech }.into());
                }
            }
            techs
                .iter()
                .map(|&tech| {
                    (
                        format!(
                            "Removing technology {tech} for {}",
                            text::player_name(&state, player)
                        ),
                        Change::RemoveTech { player, tech },
                    )
                })
                .collect::<Vec<_>>()
        };
        for (description, change) in batches {
            bridge.history().start_event(description);
            bridge.add_change(change)?;
        }
        Ok(Ruling::Applied)
    }

    /// Sets accumulated combat hit damage per unit. No-op entries are
    /// skipped; if nothing remains, nothing is applied or logged.
    pub fn change_unit_hit_damage(
        &mut self,
        bridge: &mut dyn DelegateBridge,
        territory: TerritoryId,
        damages: &[(UnitId, u32)],
    ) -> Result<Ruling, EngineError> {
        self.change_damage(bridge, territory, damages, DamageAxis::Hits)
    }

    /// Sets accumulated bombardment damage per unit, validated against the
    /// unit type's damage capacity.
    pub fn change_unit_bombing_damage(
        &mut self,
        bridge: &mut dyn DelegateBridge,
        territory: TerritoryId,
        damages: &[(UnitId, u32)],
    ) -> Result<Ruling, EngineError> {
        self.change_damage(bridge, territory, damages, DamageAxis::Bombing)
    }

    fn change_damage(
        &mut self,
        bridge: &mut dyn DelegateBridge,
        territory: TerritoryId,
        damages: &[(UnitId, u32)],
        axis: DamageAxis,
    ) -> Result<Ruling, EngineError> {
        let Some((description, group)) = ({
            let state = bridge.game().read();
            if !state.edit_mode {
                return Ok(Rejection::EditModeDisabled.into());
            }
            let holder = state.territory(territory)?;
            let mut members = Vec::new();
            let mut touched = Vec::new();
            for &(unit, damage) in damages {
                if !holder.units.contains(&unit) {
                    return Ok(Rejection::UnitNotInTerritory { unit, territory }.into());
                }
                let record = state.unit(unit)?;
                let current = match axis {
                    DamageAxis::Hits => record.hits,
                    DamageAxis::Bombing => record.bombing_damage,
                };
                if axis == DamageAxis::Bombing {
                    let data = state.unit_type(record)?;
                    let in_range = data.can_be_damaged
                        && data.max_bombing_damage.is_none_or(|max| damage <= max);
                    if !in_range {
                        return Ok(Rejection::DamageOutOfRange { unit, damage }.into());
                    }
                }
                if current == damage {
                    continue;
                }
                touched.push(unit);
                members.push(match axis {
                    DamageAxis::Hits => Change::set_hit_damage(&state, unit, damage)?,
                    DamageAxis::Bombing => Change::set_bombing_damage(&state, unit, damage)?,
                });
            }
            if members.is_empty() {
                None
            } else {
                let description = format!(
                    "Changing unit {} damage in {}: {}",
                    match axis {
                        DamageAxis::Hits => "hit",
                        DamageAxis::Bombing => "bombing",
                    },
                    text::territory_name(&state, territory),
                    text::describe_units(&state, touched),
                );
                Some((description, Change::Group(members)))
            }
        }) else {
            return Ok(Ruling::Applied);
        };
        bridge.history().start_event(description);
        bridge.add_change(group)?;
        Ok(Ruling::Applied)
    }

    /// Relabels relationships between player pairs. Entries already at the
    /// requested type are skipped.
    pub fn change_relationships(
        &mut self,
        bridge: &mut dyn DelegateBridge,
        changes: &[(PlayerId, PlayerId, RelationshipTypeId)],
    ) -> Result<Ruling, EngineError> {
        if changes.is_empty() {
            return Ok(Ruling::Applied);
        }
        let batches = {
            let state = bridge.game().read();
            if !state.edit_mode {
                return Ok(Rejection::EditModeDisabled.into());
            }
            let mut batches = Vec::new();
            for &(a, b, new_type) in changes {
                state.player(a)?;
                state.player(b)?;
                let current = state.relationship(a, b);
                if current == new_type {
                    continue;
                }
                let name = |id: RelationshipTypeId| {
                    state
                        .data
                        .relationship_types
                        .get(id)
                        .map(|data| data.name.clone())
                        .unwrap_or_else(|| id.to_string())
                };
                batches.push((
                    format!(
                        "Editing relationship for {} and {} from {} to {}",
                        text::player_name(&state, a),
                        text::player_name(&state, b),
                        name(current),
                        name(new_type),
                    ),
                    Change::set_relationship(&state, a, b, new_type),
                ));
            }
            batches
        };
        for (description, change) in batches {
            bridge.history().start_event(description);
            bridge.add_change(change)?;
        }
        Ok(Ruling::Applied)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum DamageAxis {
    Hits,
    Bombing,
}

fn describe_new_units(state: &GameState, units: &[(UnitTypeId, PlayerId)]) -> String {
    let mut counts: std::collections::BTreeMap<&str, usize> = std::collections::BTreeMap::new();
    for &(unit_type, _) in units {
        let name = state
            .data
            .unit_types
            .get(unit_type)
            .map(|data| data.name.as_str())
            .unwrap_or("unknown");
        *counts.entry(name).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(name, count)| format!("{count} {name}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Startable for EditDelegate {
    fn start(&mut self, _bridge: &mut dyn DelegateBridge) -> Result<(), EngineError> {
        Ok(())
    }
}

impl Endable for EditDelegate {
    fn end(&mut self, _bridge: &mut dyn DelegateBridge) -> Result<(), EngineError> {
        Ok(())
    }
}

impl RequiresInput for EditDelegate {
    fn requires_user_input(&self, _state: &GameState) -> bool {
        // Edits are externally driven; the phase never blocks the round.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::fixtures::{self, FrontFixture};
    use crate::testkit::Harness;

    fn edit_harness() -> (Harness, FrontFixture) {
        let mut fixture = fixtures::two_player_front();
        fixture.state.edit_mode = true;
        let harness = Harness::new(fixture.state.clone());
        (harness, fixture)
    }

    #[test]
    fn remove_units_requires_edit_mode() {
        let mut fixture = fixtures::two_player_front();
        fixture.state.edit_mode = false;
        let mut harness = Harness::new(fixture.state.clone());
        let mut bridge = harness.bridge(fixture.attacker);

        let ruling = EditDelegate::new()
            .remove_units(&mut bridge, fixture.homeland, &[fixture.launcher])
            .unwrap();
        let rejection = ruling.rejection().expect("rejected");
        assert!(!rejection.to_string().is_empty());

        // Nothing applied, nothing logged.
        assert!(harness.journal.is_empty());
        assert!(harness.history.is_empty());
        assert_eq!(harness.lock.read().clone(), fixture.state);
    }

    #[test]
    fn removing_nothing_is_not_an_error() {
        let (mut harness, fixture) = edit_harness();
        let mut bridge = harness.bridge(fixture.attacker);
        let ruling = EditDelegate::new()
            .remove_units(&mut bridge, fixture.homeland, &[])
            .unwrap();
        assert!(ruling.is_applied());
        assert!(harness.journal.is_empty());
        assert!(harness.history.is_empty());
    }

    #[test]
    fn remove_units_applies_and_logs_per_owner() {
        let (mut harness, fixture) = edit_harness();
        let mut bridge = harness.bridge(fixture.attacker);
        let ruling = EditDelegate::new()
            .remove_units(
                &mut bridge,
                fixture.homeland,
                &[fixture.launcher, fixture.infantry],
            )
            .unwrap();
        assert!(ruling.is_applied());

        let state = harness.lock.read();
        assert!(!state.units.contains_key(&fixture.launcher));
        assert!(state.territory(fixture.homeland).unwrap().units.is_empty());
        drop(state);
        assert_eq!(harness.history.len(), 1);
        assert!(harness.history.events()[0].description.contains("Removing units"));
    }

    #[test]
    fn remove_units_rejects_units_elsewhere() {
        let (mut harness, fixture) = edit_harness();
        let mut bridge = harness.bridge(fixture.attacker);
        let ruling = EditDelegate::new()
            .remove_units(&mut bridge, fixture.homeland, &[fixture.factory])
            .unwrap();
        assert!(matches!(
            ruling.rejection(),
            Some(Rejection::UnitNotInTerritory { .. })
        ));
        assert!(harness.journal.is_empty());
    }

    #[test]
    fn land_units_on_water_ride_available_transports() {
        let (mut harness, fixture) = edit_harness();
        let mut bridge = harness.bridge(fixture.attacker);
        let ruling = EditDelegate::new()
            .add_units(
                &mut bridge,
                fixture.strait,
                &[
                    (fixture.infantry_type, fixture.attacker),
                    (fixture.infantry_type, fixture.attacker),
                ],
            )
            .unwrap();
        assert!(ruling.is_applied());

        let state = harness.lock.read();
        let strait = state.territory(fixture.strait).unwrap();
        assert_eq!(strait.units.len(), 3);
        let riders: Vec<_> = strait
            .units
            .iter()
            .filter(|&&unit| {
                state.unit(unit).unwrap().transported_by == Some(fixture.transport)
            })
            .collect();
        assert_eq!(riders.len(), 2);
    }

    #[test]
    fn overloaded_transports_reject_the_whole_addition() {
        let (mut harness, fixture) = edit_harness();
        let mut bridge = harness.bridge(fixture.attacker);
        // Three riders against a capacity of two: nothing is placed.
        let ruling = EditDelegate::new()
            .add_units(
                &mut bridge,
                fixture.strait,
                &[
                    (fixture.infantry_type, fixture.attacker),
                    (fixture.infantry_type, fixture.attacker),
                    (fixture.infantry_type, fixture.attacker),
                ],
            )
            .unwrap();
        assert_eq!(ruling.rejection(), Some(&Rejection::NotEnoughTransports));
        assert_eq!(harness.lock.read().territory(fixture.strait).unwrap().units.len(), 1);
        assert!(harness.journal.is_empty());
        assert!(harness.history.is_empty());
    }

    #[test]
    fn mixed_hostile_owners_cannot_share_water() {
        let (mut harness, fixture) = edit_harness();
        let mut bridge = harness.bridge(fixture.attacker);
        let ruling = EditDelegate::new()
            .add_units(
                &mut bridge,
                fixture.strait,
                &[
                    (fixture.infantry_type, fixture.attacker),
                    (fixture.infantry_type, fixture.defender),
                ],
            )
            .unwrap();
        assert_eq!(ruling.rejection(), Some(&Rejection::MixedOwnershipOnWater));
    }

    #[test]
    fn sea_units_cannot_be_added_to_land() {
        let (mut harness, fixture) = edit_harness();
        let mut bridge = harness.bridge(fixture.attacker);
        let ruling = EditDelegate::new()
            .add_units(
                &mut bridge,
                fixture.homeland,
                &[(fixture.transport_type, fixture.attacker)],
            )
            .unwrap();
        assert_eq!(ruling.rejection(), Some(&Rejection::SeaUnitsOnLand));
    }

    #[test]
    fn resource_totals_validate_before_applying() {
        let (mut harness, fixture) = edit_harness();
        let mut bridge = harness.bridge(fixture.attacker);
        let mut edit = EditDelegate::new();

        let unchanged = edit
            .set_resource_total(&mut bridge, fixture.defender, fixture.resource, 10)
            .unwrap();
        assert!(matches!(
            unchanged.rejection(),
            Some(Rejection::UnchangedTotal { .. })
        ));

        let negative = edit
            .set_resource_total(&mut bridge, fixture.defender, fixture.resource, -1)
            .unwrap();
        assert!(matches!(
            negative.rejection(),
            Some(Rejection::InvalidTotal { .. })
        ));

        let applied = edit
            .set_resource_total(&mut bridge, fixture.defender, fixture.resource, 25)
            .unwrap();
        assert!(applied.is_applied());
        // Only the applied edit reached history.
        assert_eq!(harness.history.len(), 1);
        assert_eq!(
            harness
                .lock
                .read()
                .player(fixture.defender)
                .unwrap()
                .resource(fixture.resource),
            25
        );
    }

    #[test]
    fn bombing_damage_edits_respect_the_damage_cap() {
        let (mut harness, fixture) = edit_harness();
        let mut bridge = harness.bridge(fixture.attacker);
        let mut edit = EditDelegate::new();

        let over = edit
            .change_unit_bombing_damage(&mut bridge, fixture.industrial, &[(fixture.factory, 99)])
            .unwrap();
        assert!(matches!(
            over.rejection(),
            Some(Rejection::DamageOutOfRange { .. })
        ));

        // Setting the current value is a silent no-op.
        let same = edit
            .change_unit_bombing_damage(&mut bridge, fixture.industrial, &[(fixture.factory, 0)])
            .unwrap();
        assert!(same.is_applied());

        let applied = edit
            .change_unit_bombing_damage(&mut bridge, fixture.industrial, &[(fixture.factory, 7)])
            .unwrap();
        assert!(applied.is_applied());
        assert_eq!(
            harness.lock.read().unit(fixture.factory).unwrap().bombing_damage,
            7
        );
        // The rejected and no-op calls left no trace; only the applied one.
        assert_eq!(harness.history.len(), 1);
    }

    #[test]
    fn hostile_takeover_seizes_infrastructure_and_marks_it_moved() {
        let (mut harness, fixture) = edit_harness();
        let mut bridge = harness.bridge(fixture.attacker);
        let ruling = EditDelegate::new()
            .change_territory_owner(&mut bridge, fixture.industrial, fixture.attacker)
            .unwrap();
        assert!(ruling.is_applied());

        let state = harness.lock.read();
        assert_eq!(
            state.territory(fixture.industrial).unwrap().owner,
            Some(fixture.attacker)
        );
        let factory = state.unit(fixture.factory).unwrap();
        assert_eq!(factory.owner, fixture.attacker);
        assert!(factory.moved_this_turn);
    }

    #[test]
    fn relationship_edit_is_observable_from_both_sides() {
        let (mut harness, fixture) = edit_harness();
        let mut bridge = harness.bridge(fixture.attacker);
        let ruling = EditDelegate::new()
            .change_relationships(
                &mut bridge,
                &[(fixture.attacker, fixture.defender, fixture.peace)],
            )
            .unwrap();
        assert!(ruling.is_applied());

        let state = harness.lock.read();
        assert_eq!(
            state.relationship(fixture.attacker, fixture.defender),
            fixture.peace
        );
        assert_eq!(
            state.relationship(fixture.defender, fixture.attacker),
            fixture.peace
        );
        drop(state);

        // Re-requesting the same relationship applies nothing new.
        let mut bridge = harness.bridge(fixture.attacker);
        EditDelegate::new()
            .change_relationships(
                &mut bridge,
                &[(fixture.attacker, fixture.defender, fixture.peace)],
            )
            .unwrap();
        assert_eq!(harness.journal.len(), 1);
    }

    #[test]
    fn tech_edits_validate_membership() {
        use crate::ids::TechId;
        let (mut harness, fixture) = edit_harness();
        let mut bridge = harness.bridge(fixture.attacker);
        let mut edit = EditDelegate::new();
        let radar = TechId(0);

        let missing = edit
            .remove_techs(&mut bridge, fixture.attacker, &[radar])
            .unwrap();
        assert!(matches!(
            missing.rejection(),
            Some(Rejection::TechNotKnown { .. })
        ));

        assert!(edit.add_techs(&mut bridge, fixture.attacker, &[radar]).unwrap().is_applied());
        let duplicate = edit.add_techs(&mut bridge, fixture.attacker, &[radar]).unwrap();
        assert!(matches!(
            duplicate.rejection(),
            Some(Rejection::TechAlreadyKnown { .. })
        ));
        assert!(
            harness
                .lock
                .read()
                .player(fixture.attacker)
                .unwrap()
                .techs
                .contains(&radar)
        );
    }
}
