//! Canned game setups for tests and simulations.

use crate::config::RuleVariants;
use crate::ids::{PlayerId, RelationshipTypeId, ResourceId, TerritoryId, UnitId, UnitTypeId};
use crate::state::{
    Domain, GameData, GameState, Player, RelationshipKind, Territory, UnitTypeData,
};

/// A small two-player front: an attacker with a bombardment unit in range
/// of the defender's factory territory, plus water and out-of-range
/// territories to exercise the edge cases.
pub struct FrontFixture {
    pub state: GameState,
    pub attacker: PlayerId,
    pub defender: PlayerId,
    pub resource: ResourceId,
    pub war: RelationshipTypeId,
    pub peace: RelationshipTypeId,
    /// Attacker-owned, hosts the launcher. Production 5.
    pub homeland: TerritoryId,
    /// Attacker-owned buffer between the fronts.
    pub frontier: TerritoryId,
    /// Defender-owned, hosts the factory. Production 3.
    pub industrial: TerritoryId,
    /// Defender-owned, between industrial and redoubt.
    pub hinterland: TerritoryId,
    /// Defender-owned, beyond bombardment range.
    pub redoubt: TerritoryId,
    /// Water, adjacent to the homeland.
    pub strait: TerritoryId,
    pub launcher: UnitId,
    pub factory: UnitId,
    pub far_factory: UnitId,
    pub infantry: UnitId,
    pub transport: UnitId,
    pub rocket_type: UnitTypeId,
    pub factory_type: UnitTypeId,
    pub infantry_type: UnitTypeId,
    pub transport_type: UnitTypeId,
}

/// Builds the front with default rule variants; tweak
/// `fixture.state.variants` afterwards for variant-specific tests.
pub fn two_player_front() -> FrontFixture {
    let mut data = GameData::default();

    let resource = data.resources.register("production points");
    let war = data.relationship_types.register("war", RelationshipKind::War);
    let peace = data.relationship_types.default_type;

    let rocket_type = data
        .unit_types
        .register(UnitTypeData::new("rocket launcher", Domain::Land).bombards());
    let factory_type = data.unit_types.register(
        UnitTypeData::new("factory", Domain::Land)
            .infrastructure()
            .damageable(20),
    );
    let infantry_type = data
        .unit_types
        .register(UnitTypeData::new("infantry", Domain::Land).transportable(1));
    let transport_type = data
        .unit_types
        .register(UnitTypeData::new("transport", Domain::Sea).transports(2));

    let homeland = TerritoryId(0);
    let frontier = TerritoryId(1);
    let industrial = TerritoryId(2);
    let hinterland = TerritoryId(3);
    let redoubt = TerritoryId(4);
    let strait = TerritoryId(5);

    data.map.connect(homeland, frontier);
    data.map.connect(frontier, industrial);
    data.map.connect(industrial, hinterland);
    data.map.connect(hinterland, redoubt);
    data.map.connect(homeland, strait);

    let mut state = GameState::new(data, RuleVariants::default());

    let attacker = PlayerId(0);
    let defender = PlayerId(1);
    state.add_player(Player::new(attacker, "Calloway").with_resource(resource, 20));
    state.add_player(Player::new(defender, "Ostrau").with_resource(resource, 10));
    let default = state.data.relationship_types.default_type;
    state.relationships.set(attacker, defender, war, default);

    let mut add_territory = |id, name: &str, owner, production, water| {
        let mut territory = Territory::new(id, name);
        territory.owner = owner;
        territory.production = production;
        territory.is_water = water;
        state.add_territory(territory);
    };
    add_territory(homeland, "homeland", Some(attacker), 5, false);
    add_territory(frontier, "frontier", Some(attacker), 1, false);
    add_territory(industrial, "industrial basin", Some(defender), 3, false);
    add_territory(hinterland, "hinterland", Some(defender), 2, false);
    add_territory(redoubt, "redoubt", Some(defender), 4, false);
    add_territory(strait, "strait", None, 0, true);

    let launcher = state.spawn_unit(homeland, rocket_type, attacker).unwrap();
    let infantry = state.spawn_unit(homeland, infantry_type, attacker).unwrap();
    let factory = state.spawn_unit(industrial, factory_type, defender).unwrap();
    let far_factory = state.spawn_unit(redoubt, factory_type, defender).unwrap();
    let transport = state.spawn_unit(strait, transport_type, attacker).unwrap();

    FrontFixture {
        state,
        attacker,
        defender,
        resource,
        war,
        peace,
        homeland,
        frontier,
        industrial,
        hinterland,
        redoubt,
        strait,
        launcher,
        factory,
        far_factory,
        infantry,
        transport,
        rocket_type,
        factory_type,
        infantry_type,
        transport_type,
    }
}
