//! Arena owning every positioner of a focal plane.
//!
//! Adjacency is stored as indices into the arena, so neighbours are borrowed
//! only for the duration of a query. Operations that update one positioner
//! from its neighbours compute against shared borrows first, then apply.

use crate::actuator::{Actuator, SafetyBounds};
use crate::area::MAX_ADJACENTS;
use crate::error::{PositionerError, PositionerResult};
use crate::positioner::RoboticPositioner;
use tracing::{debug, trace};

#[derive(Debug, Default)]
pub struct Fleet {
    positioners: Vec<RoboticPositioner>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a positioner and returns its index.
    pub fn add(&mut self, positioner: RoboticPositioner) -> usize {
        self.positioners.push(positioner);
        self.positioners.len() - 1
    }

    pub fn len(&self) -> usize {
        self.positioners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positioners.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RoboticPositioner> {
        self.positioners.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut RoboticPositioner> {
        self.positioners.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoboticPositioner> {
        self.positioners.iter()
    }

    /// Indices of every positioner with the given identifier.
    pub fn find_by_id(&self, id: i32) -> Vec<usize> {
        self.positioners
            .iter()
            .enumerate()
            .filter(|(_, p)| p.id() == id)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn actuator(&self, index: usize) -> PositionerResult<&Actuator> {
        self.positioners
            .get(index)
            .map(RoboticPositioner::actuator)
            .ok_or_else(|| absent(index))
    }

    fn actuator_mut(&mut self, index: usize) -> PositionerResult<&mut Actuator> {
        self.positioners
            .get_mut(index)
            .map(RoboticPositioner::actuator_mut)
            .ok_or_else(|| absent(index))
    }

    /// Resolves the adjacency list of `index`.
    pub fn neighbours(&self, index: usize) -> PositionerResult<Vec<&Actuator>> {
        self.actuator(index)?
            .adjacents()
            .iter()
            .map(|&j| self.actuator(j))
            .collect()
    }

    /// Replaces the adjacency list of `index` after checking every entry.
    pub fn set_adjacents(&mut self, index: usize, adjacents: Vec<usize>) -> PositionerResult<()> {
        self.actuator(index)?;
        for (k, &j) in adjacents.iter().enumerate() {
            self.actuator(j)?;
            if j == index {
                return Err(PositionerError::invalid_argument(format!(
                    "positioner {index} cannot be adjacent to itself"
                )));
            }
            if adjacents[..k].contains(&j) {
                return Err(PositionerError::invalid_argument(format!(
                    "positioner {j} listed twice as adjacent to {index}"
                )));
            }
        }
        self.actuator_mut(index)?.set_adjacents(adjacents)
    }

    /// Links every pair of positioners whose bodies can reach each other,
    /// replacing all adjacency lists. Nothing changes if any positioner would
    /// end up with more than six neighbours.
    pub fn determine_adjacents(&mut self) -> PositionerResult<()> {
        let n = self.positioners.len();
        let mut lists: Vec<Vec<usize>> = vec![Vec::new(); n];
        for i in 0..n {
            let a = self.positioners[i].actuator();
            for j in (i + 1)..n {
                let b = self.positioners[j].actuator();
                if a.p0().distance(b.p0()) < a.r_max() + b.r_max() {
                    lists[i].push(j);
                    lists[j].push(i);
                }
            }
        }
        if let Some(i) = lists.iter().position(|l| l.len() > MAX_ADJACENTS) {
            return Err(PositionerError::invalid_argument(format!(
                "positioner {i} would have {} adjacents",
                lists[i].len()
            )));
        }
        for (positioner, list) in self.positioners.iter_mut().zip(lists) {
            positioner.actuator_mut().set_adjacents(list)?;
        }
        debug!(positioners = n, "adjacency determined");
        Ok(())
    }

    pub fn compute_safe_parameters(&self, index: usize) -> PositionerResult<SafetyBounds> {
        let neighbours = self.neighbours(index)?;
        self.actuator(index)?.compute_safe_parameters(&neighbours)
    }

    pub fn calculate_safe_parameters(&mut self, index: usize) -> PositionerResult<()> {
        let bounds = self.compute_safe_parameters(index)?;
        self.actuator_mut(index)?.set_safety(bounds);
        Ok(())
    }

    /// Recomputes the safe-area bounds of every positioner from the current
    /// layout. Either all bounds are updated or none.
    pub fn calculate_all_safe_parameters(&mut self) -> PositionerResult<()> {
        let bounds = (0..self.len())
            .map(|i| self.compute_safe_parameters(i))
            .collect::<PositionerResult<Vec<_>>>()?;
        for (positioner, b) in self.positioners.iter_mut().zip(bounds) {
            positioner.actuator_mut().set_safety(b);
        }
        Ok(())
    }

    pub fn has_collision_with_adjacent(&self, index: usize) -> PositionerResult<bool> {
        let a = self.actuator(index)?;
        Ok(self
            .neighbours(index)?
            .iter()
            .any(|b| a.has_collision_with(b)))
    }

    /// Indices of the adjacents currently colliding with `index`.
    pub fn find_colliding_adjacent(&self, index: usize) -> PositionerResult<Vec<usize>> {
        let a = self.actuator(index)?;
        let mut colliding = Vec::new();
        for &j in a.adjacents() {
            if a.has_collision_with(self.actuator(j)?) {
                colliding.push(j);
            }
        }
        Ok(colliding)
    }

    /// Like [`has_collision_with_adjacent`](Self::has_collision_with_adjacent),
    /// but skips pairs where neither side is pending.
    pub fn has_collision_with_pending_adjacent(&self, index: usize) -> PositionerResult<bool> {
        let a = self.actuator(index)?;
        for b in self.neighbours(index)? {
            if !a.pending() && !b.pending() {
                continue;
            }
            if a.has_collision_with(b) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Every colliding adjacent pair, each reported once as `(i, j)` with `i < j`.
    pub fn colliding_pairs(&self) -> PositionerResult<Vec<(usize, usize)>> {
        let mut pairs = Vec::new();
        for i in 0..self.len() {
            for j in self.find_colliding_adjacent(i)? {
                if i < j {
                    pairs.push((i, j));
                }
            }
        }
        trace!(pairs = pairs.len(), "collision sweep");
        Ok(pairs)
    }

    /// Refreshes every `collision` flag and returns how many are set.
    pub fn update_collision_flags(&mut self) -> PositionerResult<usize> {
        let flags = (0..self.len())
            .map(|i| self.has_collision_with_adjacent(i))
            .collect::<PositionerResult<Vec<_>>>()?;
        let count = flags.iter().filter(|&&f| f).count();
        for (positioner, flag) in self.positioners.iter_mut().zip(flags) {
            positioner.actuator_mut().set_collision(flag);
        }
        Ok(count)
    }

    pub fn clear_pending(&mut self) {
        for positioner in &mut self.positioners {
            positioner.actuator_mut().set_pending(false);
        }
    }
}

fn absent(index: usize) -> PositionerError {
    PositionerError::invalid_argument(format!("no positioner at index {index}"))
}
