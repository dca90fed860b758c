//! Simulation engine for the predator/prey lattice world.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

new_key_type! {
    /// Stable identity for one agent, backed by a generational slot map.
    pub struct AgentId;
}

/// Smallest cell edge, in pixels, that drawing collaborators can render.
pub const MIN_CELL_PIXELS: u32 = 3;

/// Number of step summaries retained for charting collaborators.
pub const HISTORY_CAPACITY: usize = 256;

/// Simulation clock (steps completed since the last reset).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Resets the tick counter back to zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

/// Lattice coordinates of one cell, row-major.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Coord {
    pub row: u32,
    pub col: u32,
}

impl Coord {
    /// Construct a new coordinate pair.
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// The two built-in kinds of agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Species {
    Predator,
    Prey,
}

/// Lifecycle parameters for one species, fixed for the length of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeciesParams {
    /// Age at which an agent dies of old age.
    pub death_age: u32,
    /// Belly drain applied in the starvation phase of every step.
    pub hunger_per_step: f32,
    /// Belly content given to agents placed at reset.
    pub initial_belly: f32,
    /// Upper bound on belly content.
    pub max_belly: f32,
    /// Minimum age before an agent may take part in reproduction.
    pub min_reproduction_age: u32,
    /// Percent chance, 0 to 100, that an eligible agent initiates reproduction.
    pub reproduction_chance: f32,
    /// Display tag consumed by drawing collaborators.
    pub color: String,
}

/// One predator or prey individual.
///
/// Species constants are stamped onto the agent at creation so a run never
/// re-reads them from configuration mid-flight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub species: Species,
    pub pos: Coord,
    pub age: u32,
    pub belly: f32,
    pub has_reproduced: bool,
    pub death_age: u32,
    pub hunger_per_step: f32,
    pub max_belly: f32,
    pub min_reproduction_age: u32,
    pub reproduction_chance: f32,
}

impl Agent {
    /// Create an age-zero agent at `pos` stamped with its species constants.
    #[must_use]
    pub fn new(species: Species, params: &SpeciesParams, belly: f32, pos: Coord) -> Self {
        Self {
            species,
            pos,
            age: 0,
            belly,
            has_reproduced: false,
            death_age: params.death_age,
            hunger_per_step: params.hunger_per_step,
            max_belly: params.max_belly,
            min_reproduction_age: params.min_reproduction_age,
            reproduction_chance: params.reproduction_chance,
        }
    }

    /// True while the agent can still fit more food in its belly.
    #[must_use]
    pub fn is_hungry(&self) -> bool {
        self.belly < self.max_belly
    }

    /// True when the agent may take part in reproduction this step.
    #[must_use]
    pub fn can_reproduce(&self) -> bool {
        !self.has_reproduced && self.age >= self.min_reproduction_age
    }
}

/// Aggregate counters reported after each step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepSummary {
    pub tick: Tick,
    pub predators: usize,
    pub prey: usize,
    pub total_food: f32,
}

/// Agent storage with stable identities and creation-order iteration.
///
/// Phases iterate a snapshot of the handles live at phase start; an identity
/// removed mid-phase simply stops resolving, so no agent is skipped or
/// visited twice while the pool shrinks underneath the iteration.
#[derive(Debug, Clone)]
pub struct AgentPool {
    slots: SlotMap<AgentId, usize>,
    handles: Vec<AgentId>,
    agents: Vec<Agent>,
}

impl Default for AgentPool {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentPool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            handles: Vec::new(),
            agents: Vec::new(),
        }
    }

    /// Number of live agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns true when no agents are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Returns true if `id` refers to a live agent.
    #[must_use]
    pub fn contains(&self, id: AgentId) -> bool {
        self.slots.contains_key(id)
    }

    /// Iterate live handles in creation order.
    pub fn iter_handles(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.handles.iter().copied()
    }

    /// Iterate live agents with their handles in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &Agent)> + '_ {
        self.handles.iter().copied().zip(self.agents.iter())
    }

    /// Mutably iterate live agents with their handles in creation order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (AgentId, &mut Agent)> + '_ {
        self.handles.iter().copied().zip(self.agents.iter_mut())
    }

    /// Borrow the agent behind `id`, if it is still alive.
    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        let index = self.slots.get(id).copied()?;
        self.agents.get(index)
    }

    /// Mutably borrow the agent behind `id`, if it is still alive.
    #[must_use]
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        let index = self.slots.get(id).copied()?;
        self.agents.get_mut(index)
    }

    /// Insert a new agent and return its handle.
    pub fn insert(&mut self, agent: Agent) -> AgentId {
        let index = self.agents.len();
        self.agents.push(agent);
        let id = self.slots.insert(index);
        self.handles.push(id);
        id
    }

    /// Remove `id`, returning its agent and keeping the creation order of
    /// everything behind it intact.
    pub fn remove(&mut self, id: AgentId) -> Option<Agent> {
        let index = self.slots.remove(id)?;
        let agent = self.agents.remove(index);
        let removed_handle = self.handles.remove(index);
        debug_assert_eq!(removed_handle, id);
        for handle in &self.handles[index..] {
            if let Some(slot) = self.slots.get_mut(*handle) {
                *slot -= 1;
            }
        }
        Some(agent)
    }

    /// Clear all stored agents.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.handles.clear();
        self.agents.clear();
    }
}

/// A configuration constraint violated by a candidate [`SimConfig`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Grid dimensions must be positive.
    #[error("the number of {field} must be positive")]
    NonPositiveDimension { field: &'static str },
    /// Display metrics have a floor so cells stay visible when drawn.
    #[error("{field} must be at least {minimum} pixels (got {value})")]
    CellMetricTooSmall {
        field: &'static str,
        minimum: u32,
        value: u32,
    },
    /// Rates cannot be negative.
    #[error("{field} cannot be negative (got {value})")]
    NegativeRate { field: &'static str, value: f32 },
    /// Joint bound on the initial population.
    #[error("initial agents ({agents}) exceed the available cells ({capacity})")]
    CapacityExceeded { agents: u64, capacity: u64 },
}

/// Static configuration for one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimConfig {
    /// Number of lattice rows.
    pub rows: u32,
    /// Number of lattice columns.
    pub cols: u32,
    /// Cell width in pixels, passed through to drawing collaborators.
    pub cell_width: u32,
    /// Cell height in pixels, passed through to drawing collaborators.
    pub cell_height: u32,
    /// Food added each step to every cell below `max_cell_food`.
    pub food_regrow: f32,
    /// Cap checked before regrowth; a near-full cell may overshoot it once.
    pub max_cell_food: f32,
    /// Predators placed at reset.
    pub initial_predators: u32,
    /// Prey placed at reset.
    pub initial_prey: u32,
    /// Predator lifecycle parameters.
    pub predator: SpeciesParams,
    /// Prey lifecycle parameters.
    pub prey: SpeciesParams,
    /// Fill style for cells, passed through to drawing collaborators.
    pub cell_color: String,
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rows: 16,
            cols: 16,
            cell_width: 16,
            cell_height: 16,
            food_regrow: 1.0,
            max_cell_food: 10.0,
            initial_predators: 20,
            initial_prey: 20,
            predator: SpeciesParams {
                death_age: 80,
                hunger_per_step: 1.0,
                initial_belly: 10.0,
                max_belly: 20.0,
                min_reproduction_age: 10,
                reproduction_chance: 80.0,
                color: "red".to_owned(),
            },
            prey: SpeciesParams {
                death_age: 60,
                hunger_per_step: 4.0,
                initial_belly: 10.0,
                max_belly: 20.0,
                min_reproduction_age: 5,
                reproduction_chance: 90.0,
                color: "blue".to_owned(),
            },
            cell_color: "green".to_owned(),
            rng_seed: None,
        }
    }
}

impl SimConfig {
    /// Check every structural constraint, collecting one error per violation.
    ///
    /// The capacity bound can be breached through several fields at once but
    /// is reported at most once per pass.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        if self.rows == 0 {
            errors.push(ConfigError::NonPositiveDimension { field: "rows" });
        }
        if self.cols == 0 {
            errors.push(ConfigError::NonPositiveDimension { field: "columns" });
        }
        if self.cell_width < MIN_CELL_PIXELS {
            errors.push(ConfigError::CellMetricTooSmall {
                field: "cell width",
                minimum: MIN_CELL_PIXELS,
                value: self.cell_width,
            });
        }
        if self.cell_height < MIN_CELL_PIXELS {
            errors.push(ConfigError::CellMetricTooSmall {
                field: "cell height",
                minimum: MIN_CELL_PIXELS,
                value: self.cell_height,
            });
        }
        if self.food_regrow < 0.0 {
            errors.push(ConfigError::NegativeRate {
                field: "food regrowth",
                value: self.food_regrow,
            });
        }
        let capacity = u64::from(self.rows) * u64::from(self.cols);
        let agents = u64::from(self.initial_predators) + u64::from(self.initial_prey);
        if agents > capacity {
            errors.push(ConfigError::CapacityExceeded { agents, capacity });
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Parameter block for `species`.
    #[must_use]
    pub fn species(&self, species: Species) -> &SpeciesParams {
        match species {
            Species::Predator => &self.predator,
            Species::Prey => &self.prey,
        }
    }

    /// RNG seeded from the configuration, or from entropy when no seed is set.
    fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

/// One lattice cell: a food stock plus at most one occupant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub food: f32,
    pub occupant: Option<AgentId>,
}

/// Row-major lattice of cells with occupancy tracking.
#[derive(Debug, Clone)]
pub struct Grid {
    rows: u32,
    cols: u32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Allocate a lattice with every cell's food stock at `max_cell_food`.
    fn new(rows: u32, cols: u32, max_cell_food: f32) -> Self {
        let cell = Cell {
            food: max_cell_food,
            occupant: None,
        };
        Self {
            rows,
            cols,
            cells: vec![cell; (rows as usize) * (cols as usize)],
        }
    }

    /// Number of rows in the lattice.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns in the lattice.
    #[must_use]
    pub const fn cols(&self) -> u32 {
        self.cols
    }

    /// Total number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Flat view of all cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Returns the flat index for `pos` without bounds checks.
    #[inline]
    fn offset(&self, pos: Coord) -> usize {
        (pos.row as usize) * (self.cols as usize) + (pos.col as usize)
    }

    /// Immutable access to the cell at `pos`.
    #[must_use]
    pub fn get(&self, pos: Coord) -> Option<&Cell> {
        if pos.row < self.rows && pos.col < self.cols {
            Some(&self.cells[self.offset(pos)])
        } else {
            None
        }
    }

    /// Mutable access to the cell at `pos`.
    fn get_mut(&mut self, pos: Coord) -> Option<&mut Cell> {
        if pos.row < self.rows && pos.col < self.cols {
            let idx = self.offset(pos);
            Some(&mut self.cells[idx])
        } else {
            None
        }
    }

    /// Iterate cells with their coordinates in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Coord, &Cell)> + '_ {
        let cols = self.cols as usize;
        self.cells
            .iter()
            .enumerate()
            .map(move |(idx, cell)| (Coord::new((idx / cols) as u32, (idx % cols) as u32), cell))
    }

    /// Adjacent coordinates as options ordered north, south, west, east.
    fn adjacent(&self, pos: Coord) -> [Option<Coord>; 4] {
        let north = pos.row.checked_sub(1).map(|row| Coord::new(row, pos.col));
        let south = pos
            .row
            .checked_add(1)
            .filter(|&row| row < self.rows)
            .map(|row| Coord::new(row, pos.col));
        let west = pos.col.checked_sub(1).map(|col| Coord::new(pos.row, col));
        let east = pos
            .col
            .checked_add(1)
            .filter(|&col| col < self.cols)
            .map(|col| Coord::new(pos.row, col));
        [north, south, west, east]
    }

    /// Orthogonally adjacent coordinates, scanned north, south, west, east.
    ///
    /// The fixed order is the tie-break used by occupant lookups and must not
    /// change underneath seeded tests.
    pub fn neighbors(&self, pos: Coord) -> impl Iterator<Item = Coord> {
        self.adjacent(pos).into_iter().flatten()
    }

    /// One unoccupied orthogonal neighbor of `pos`, drawn uniformly.
    ///
    /// Candidates are gathered north, west, south, east before the draw so
    /// seeded runs consume randomness in a stable order.
    pub fn random_open_neighbor(&self, pos: Coord, rng: &mut SmallRng) -> Option<Coord> {
        let [north, south, west, east] = self.adjacent(pos);
        let mut open = [Coord::new(0, 0); 4];
        let mut count = 0;
        for candidate in [north, west, south, east].into_iter().flatten() {
            if self.get(candidate).is_some_and(|cell| cell.occupant.is_none()) {
                open[count] = candidate;
                count += 1;
            }
        }
        if count == 0 {
            return None;
        }
        Some(open[rng.random_range(0..count)])
    }

    /// Uniformly random unoccupied cell, sampled by rejection with the row
    /// drawn before the column.
    ///
    /// Callers must leave at least one cell open; the capacity rule in
    /// [`SimConfig::validate`] guarantees that for initial placement.
    fn random_unoccupied(&self, rng: &mut SmallRng) -> Coord {
        debug_assert!(
            self.cells.iter().any(|cell| cell.occupant.is_none()),
            "no open cell left to place into"
        );
        loop {
            let row = rng.random_range(0..self.rows);
            let col = rng.random_range(0..self.cols);
            let pos = Coord::new(row, col);
            if self.get(pos).is_some_and(|cell| cell.occupant.is_none()) {
                return pos;
            }
        }
    }

    /// Add `rate` food to every cell strictly below `max`, returning the
    /// total amount added.
    ///
    /// A cell just under the cap receives the full increment and may finish
    /// above `max`; the cap only gates whether regrowth applies at all.
    fn regrow(&mut self, rate: f32, max: f32) -> f32 {
        let mut added = 0.0;
        for cell in &mut self.cells {
            if cell.food < max {
                cell.food += rate;
                added += rate;
            }
        }
        added
    }

    fn occupy(&mut self, pos: Coord, id: AgentId) {
        if let Some(cell) = self.get_mut(pos) {
            debug_assert!(cell.occupant.is_none(), "double occupancy at {pos:?}");
            cell.occupant = Some(id);
        }
    }

    fn vacate(&mut self, pos: Coord, id: AgentId) {
        if let Some(cell) = self.get_mut(pos) {
            debug_assert_eq!(cell.occupant, Some(id), "occupant mismatch at {pos:?}");
            cell.occupant = None;
        }
    }
}

/// The simulation engine: grid, agent pool, counters, and the step pipeline.
///
/// External collaborators drive it through `configure`, `reset`, and `step`,
/// and read it back through the counter and view accessors; nothing else
/// mutates the world.
pub struct Simulation {
    config: SimConfig,
    tick: Tick,
    rng: SmallRng,
    grid: Grid,
    agents: AgentPool,
    predator_count: usize,
    prey_count: usize,
    total_food: f32,
    history: VecDeque<StepSummary>,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("predators", &self.predator_count)
            .field("prey", &self.prey_count)
            .field("total_food", &self.total_food)
            .finish()
    }
}

impl Simulation {
    /// Build a simulation from `config`, validating it and populating the
    /// world.
    pub fn new(config: SimConfig) -> Result<Self, Vec<ConfigError>> {
        config.validate()?;
        let rng = config.seeded_rng();
        let mut sim = Self {
            grid: Grid::new(config.rows, config.cols, config.max_cell_food),
            tick: Tick::zero(),
            rng,
            agents: AgentPool::new(),
            predator_count: 0,
            prey_count: 0,
            total_food: 0.0,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            config,
        };
        sim.reset();
        Ok(sim)
    }

    /// Validate `candidate` and adopt it as the active configuration.
    ///
    /// A rejected candidate leaves the accepted configuration and the running
    /// world untouched; call [`Simulation::reset`] after acceptance to
    /// rebuild under the new parameters.
    pub fn configure(&mut self, candidate: SimConfig) -> Result<(), Vec<ConfigError>> {
        candidate.validate()?;
        self.config = candidate;
        Ok(())
    }

    /// Rebuild the grid and agent pool from the accepted configuration.
    ///
    /// Every cell starts at `max_cell_food`. Predators are placed before
    /// prey, each on a uniformly random unoccupied cell, and the tick counter
    /// returns to zero.
    pub fn reset(&mut self) {
        self.rng = self.config.seeded_rng();
        self.grid = Grid::new(self.config.rows, self.config.cols, self.config.max_cell_food);
        self.agents.clear();
        self.tick = Tick::zero();
        self.predator_count = 0;
        self.prey_count = 0;
        self.total_food = self.grid.cell_count() as f32 * self.config.max_cell_food;
        self.history.clear();
        for _ in 0..self.config.initial_predators {
            self.spawn_at_random(Species::Predator);
        }
        for _ in 0..self.config.initial_prey {
            self.spawn_at_random(Species::Prey);
        }
    }

    /// Execute one time step, returning the refreshed aggregate counters.
    ///
    /// Phases run in a fixed order; later phases observe the effects of
    /// earlier ones within the same step.
    pub fn step(&mut self) -> StepSummary {
        self.phase_regrow();
        self.phase_feed();
        self.phase_reproduce();
        self.phase_move();
        self.phase_starve();
        self.phase_age();
        self.tick = self.tick.next();
        self.debug_assert_links();
        let summary = self.summary();
        if self.history.len() >= HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(summary.clone());
        summary
    }

    fn phase_regrow(&mut self) {
        let added = self
            .grid
            .regrow(self.config.food_regrow, self.config.max_cell_food);
        self.total_food += added;
    }

    fn phase_feed(&mut self) {
        let roster: Vec<AgentId> = self.agents.iter_handles().collect();
        for id in roster {
            let Some(agent) = self.agents.get(id) else {
                continue;
            };
            match agent.species {
                Species::Prey => self.graze(id),
                Species::Predator => self.hunt(id),
            }
        }
    }

    /// Prey feeding: take as much of the cell's food as the belly can hold.
    fn graze(&mut self, id: AgentId) {
        let Some(agent) = self.agents.get(id) else {
            return;
        };
        if !agent.is_hungry() {
            return;
        }
        let pos = agent.pos;
        let room = agent.max_belly - agent.belly;
        let Some(cell) = self.grid.get_mut(pos) else {
            return;
        };
        let bite = room.min(cell.food);
        cell.food -= bite;
        if let Some(agent) = self.agents.get_mut(id) {
            agent.belly += bite;
        }
        self.total_food -= bite;
    }

    /// Predator feeding: consume one adjacent prey outright, topping the
    /// belly up to its maximum.
    fn hunt(&mut self, id: AgentId) {
        let Some(agent) = self.agents.get(id) else {
            return;
        };
        if !agent.is_hungry() {
            return;
        }
        let pos = agent.pos;
        let Some(victim) = self.first_neighbor_of_species(pos, Species::Prey) else {
            return;
        };
        if let Some(agent) = self.agents.get_mut(id) {
            agent.belly = agent.max_belly;
        }
        self.remove_agent(victim);
    }

    fn phase_reproduce(&mut self) {
        for (_, agent) in self.agents.iter_mut() {
            agent.has_reproduced = false;
        }
        let roster: Vec<AgentId> = self.agents.iter_handles().collect();
        for id in roster {
            let Some(agent) = self.agents.get(id) else {
                continue;
            };
            if !agent.can_reproduce() {
                continue;
            }
            let chance = agent.reproduction_chance;
            if self.rng.random_range(0.0..100.0) >= f64::from(chance) {
                continue;
            }
            self.try_reproduce(id);
        }
    }

    /// Pair `id` with an eligible same-species neighbor, spawning a child on
    /// an open neighboring cell when one exists.
    ///
    /// Both partners consume their eligibility for the step even when the
    /// birth is suppressed for lack of space.
    fn try_reproduce(&mut self, id: AgentId) {
        let Some(agent) = self.agents.get(id) else {
            return;
        };
        let species = agent.species;
        let pos = agent.pos;
        let belly = agent.belly;
        let Some(partner) = self.first_neighbor_of_species(pos, species) else {
            return;
        };
        if !self.agents.get(partner).is_some_and(Agent::can_reproduce) {
            return;
        }
        if let Some(open) = self.grid.random_open_neighbor(pos, &mut self.rng) {
            let params = self.config.species(species);
            let child = Agent::new(species, params, belly, open);
            self.insert_agent(child);
        }
        if let Some(agent) = self.agents.get_mut(id) {
            agent.has_reproduced = true;
        }
        if let Some(partner) = self.agents.get_mut(partner) {
            partner.has_reproduced = true;
        }
    }

    fn phase_move(&mut self) {
        let roster: Vec<AgentId> = self.agents.iter_handles().collect();
        for id in roster {
            let Some(agent) = self.agents.get(id) else {
                continue;
            };
            if agent.has_reproduced {
                continue;
            }
            let pos = agent.pos;
            let Some(target) = self.grid.random_open_neighbor(pos, &mut self.rng) else {
                continue;
            };
            self.grid.vacate(pos, id);
            self.grid.occupy(target, id);
            if let Some(agent) = self.agents.get_mut(id) {
                agent.pos = target;
            }
        }
    }

    fn phase_starve(&mut self) {
        let roster: Vec<AgentId> = self.agents.iter_handles().collect();
        for id in roster {
            let Some(agent) = self.agents.get_mut(id) else {
                continue;
            };
            agent.belly -= agent.hunger_per_step;
            let starved = agent.belly <= 0.0;
            if starved {
                self.remove_agent(id);
            }
        }
    }

    fn phase_age(&mut self) {
        let roster: Vec<AgentId> = self.agents.iter_handles().collect();
        for id in roster {
            let Some(agent) = self.agents.get_mut(id) else {
                continue;
            };
            agent.age += 1;
            let expired = agent.age >= agent.death_age;
            if expired {
                self.remove_agent(id);
            }
        }
    }

    /// First adjacent occupant of `species`, scanning neighbors north,
    /// south, west, east.
    #[must_use]
    pub fn first_neighbor_of_species(&self, pos: Coord, species: Species) -> Option<AgentId> {
        for neighbor in self.grid.neighbors(pos) {
            let Some(occupant) = self.grid.get(neighbor).and_then(|cell| cell.occupant) else {
                continue;
            };
            if self
                .agents
                .get(occupant)
                .is_some_and(|agent| agent.species == species)
            {
                return Some(occupant);
            }
        }
        None
    }

    fn spawn_at_random(&mut self, species: Species) {
        let pos = self.grid.random_unoccupied(&mut self.rng);
        let params = self.config.species(species);
        let agent = Agent::new(species, params, params.initial_belly, pos);
        self.insert_agent(agent);
    }

    fn insert_agent(&mut self, agent: Agent) -> AgentId {
        let pos = agent.pos;
        let species = agent.species;
        let id = self.agents.insert(agent);
        self.grid.occupy(pos, id);
        match species {
            Species::Predator => self.predator_count += 1,
            Species::Prey => self.prey_count += 1,
        }
        id
    }

    fn remove_agent(&mut self, id: AgentId) -> Option<Agent> {
        let agent = self.agents.remove(id)?;
        self.grid.vacate(agent.pos, id);
        match agent.species {
            Species::Predator => self.predator_count -= 1,
            Species::Prey => self.prey_count -= 1,
        }
        Some(agent)
    }

    /// Verify the cell/agent back-references in debug builds.
    fn debug_assert_links(&self) {
        #[cfg(debug_assertions)]
        {
            for (id, agent) in self.agents.iter() {
                let occupant = self.grid.get(agent.pos).and_then(|cell| cell.occupant);
                debug_assert_eq!(occupant, Some(id), "broken link at {:?}", agent.pos);
            }
            let occupied = self
                .grid
                .cells()
                .iter()
                .filter(|cell| cell.occupant.is_some())
                .count();
            debug_assert_eq!(occupied, self.agents.len(), "occupancy count drifted");
        }
    }

    /// The accepted configuration.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Current simulation tick.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    /// Read-only view of the lattice.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Number of live agents of both species.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Number of live predators.
    #[must_use]
    pub fn predator_count(&self) -> usize {
        self.predator_count
    }

    /// Number of live prey.
    #[must_use]
    pub fn prey_count(&self) -> usize {
        self.prey_count
    }

    /// Food summed over all cells, maintained incrementally.
    #[must_use]
    pub fn total_food(&self) -> f32 {
        self.total_food
    }

    /// Total number of cells in the lattice.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.grid.cell_count()
    }

    /// Borrow the agent behind `id`, if it is still alive.
    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    /// Iterate live agents with their handles in creation order.
    pub fn agents(&self) -> impl Iterator<Item = (AgentId, &Agent)> + '_ {
        self.agents.iter()
    }

    /// Iterate retained step summaries, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &StepSummary> {
        self.history.iter()
    }

    /// Aggregate counters as of the last completed phase.
    #[must_use]
    pub fn summary(&self) -> StepSummary {
        StepSummary {
            tick: self.tick,
            predators: self.predator_count,
            prey: self.prey_count,
            total_food: self.total_food,
        }
    }

    /// Live predators as a percentage of cell capacity.
    #[must_use]
    pub fn predator_percentage(&self) -> f32 {
        100.0 * self.predator_count as f32 / self.grid.cell_count() as f32
    }

    /// Live prey as a percentage of cell capacity.
    #[must_use]
    pub fn prey_percentage(&self) -> f32 {
        100.0 * self.prey_count as f32 / self.grid.cell_count() as f32
    }

    /// Total food as a percentage of what the lattice can hold.
    #[must_use]
    pub fn food_percentage(&self) -> f32 {
        100.0 * self.total_food / (self.grid.cell_count() as f32 * self.config.max_cell_food)
    }
}
