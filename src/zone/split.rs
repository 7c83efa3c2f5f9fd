use std::collections::BTreeSet;

use tracing::info;

use crate::context::Geometry;
use crate::error::{Result, ZoneError};
use crate::math::Vector3;
use crate::registry::SurfaceRegistry;
use crate::rule::{HeadRule, SignedSurface};

use super::{Zone, ZoneState};

/// A partition plane, oriented so that `above` is the side towards `+axis`.
struct Cut {
    position: f64,
    above: SignedSurface,
}

impl Zone {
    /// Splits the zone into `n` parallel children separated by `partition`.
    ///
    /// The shared axis is the normal of the first partition plane. Every plane
    /// of the surround parallel to that axis is stripped; those caps must be
    /// top-level terms of the surround and bracket every partition plane. The
    /// first child keeps the lower caps, the last the upper caps, and the
    /// partition half-spaces bound the rest, so each point of the surround
    /// lies in exactly one child.
    ///
    /// Children start empty with this zone's divider as their front. An open
    /// master cell is removed and this zone is closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the zone is closed, `n` does not match the
    /// partition, a partition surface is not a plane, the planes are not
    /// parallel or coincide, or a plane lies outside the caps.
    pub fn split_into(
        &mut self,
        geometry: &mut Geometry,
        n: usize,
        partition: &[SignedSurface],
    ) -> Result<Vec<Zone>> {
        if self.state == ZoneState::Closed {
            return Err(ZoneError::InvalidState {
                zone: self.name.clone(),
                expected: "empty or master-active",
                found: self.state.as_str(),
            }
            .into());
        }
        if partition.is_empty() || n != partition.len() + 1 {
            return Err(self.bad_partition(format!(
                "{n} children need {} partition planes, got {}",
                n.saturating_sub(1),
                partition.len()
            )));
        }

        let reg = &geometry.surfaces;
        let axis = *self.plane_of(reg, partition[0])?.normal();
        let cuts = self.sorted_cuts(reg, partition, &axis)?;
        let (floors, ceilings) = self.caps(reg, &axis)?;

        let tol = self.settings.zero_tol;
        for cut in &cuts {
            let above_floors = floors.iter().all(|c| cut.position > c.position + tol);
            let below_ceilings = ceilings.iter().all(|c| cut.position < c.position - tol);
            if !above_floors || !below_ceilings {
                return Err(self.bad_partition(format!(
                    "partition plane {} lies outside the surround",
                    cut.above.id()
                )));
            }
        }

        let stripped = self
            .surround
            .remove_matched_planes(reg, &axis, self.settings.axis_tol)?;
        let lower_caps = HeadRule::from_surfaces(floors.iter().map(|c| c.above));
        let upper_caps = HeadRule::from_surfaces(ceilings.iter().map(|c| -c.above));

        let mut children = Vec::with_capacity(n);
        for k in 0..n {
            let lower = match k {
                0 => lower_caps.clone(),
                _ => HeadRule::surface(cuts[k - 1].above),
            };
            let upper = match cuts.get(k) {
                Some(cut) => HeadRule::surface(-cut.above),
                None => upper_caps.clone(),
            };
            let mut child = Zone::new(
                format!("{}{k}", self.name),
                HeadRule::intersect_all([&stripped, &lower, &upper]),
            )
            .with_settings(self.settings.clone())
            .with_back(self.back.clone());
            child.front = self.divider.clone();
            child.anchor = self.anchor.clone();
            children.push(child);
        }

        if let Some(master) = self.master.take() {
            geometry.cells.remove(master)?;
        }
        self.state = ZoneState::Closed;
        info!(zone = %self.name, children = n, "zone split");
        Ok(children)
    }

    fn plane_of<'r>(
        &self,
        reg: &'r SurfaceRegistry,
        s: SignedSurface,
    ) -> Result<&'r crate::geometry::Plane> {
        reg.surface(s.id())?
            .as_plane()
            .ok_or_else(|| self.bad_partition(format!("surface {} is not a plane", s.id())))
    }

    fn sorted_cuts(
        &self,
        reg: &SurfaceRegistry,
        partition: &[SignedSurface],
        axis: &Vector3,
    ) -> Result<Vec<Cut>> {
        let mut cuts = Vec::with_capacity(partition.len());
        for &s in partition {
            let plane = self.plane_of(reg, s)?;
            let along = plane.normal().dot(axis);
            if along.abs() < 1.0 - self.settings.axis_tol {
                return Err(self.bad_partition(format!(
                    "partition plane {} is not parallel to the first",
                    s.id()
                )));
            }
            let id = SignedSurface::new(s.id())
                .ok_or_else(|| self.bad_partition("surface 0 in partition".into()))?;
            cuts.push(Cut {
                position: plane.position_along(axis),
                above: if along > 0.0 { id } else { -id },
            });
        }
        cuts.sort_by(|a, b| a.position.total_cmp(&b.position));
        if cuts
            .windows(2)
            .any(|w| w[1].position - w[0].position < self.settings.zero_tol)
        {
            return Err(self.bad_partition("coincident partition planes".into()));
        }
        Ok(cuts)
    }

    /// Splits the surround's planes along `axis` into floors and ceilings.
    fn caps(&self, reg: &SurfaceRegistry, axis: &Vector3) -> Result<(Vec<Cut>, Vec<Cut>)> {
        let matched = self
            .surround
            .matched_planes(reg, axis, self.settings.axis_tol)?;
        let top: BTreeSet<SignedSurface> = self.surround.top_level_surfaces().into_iter().collect();
        let mut floors = Vec::new();
        let mut ceilings = Vec::new();
        for s in matched {
            if !top.contains(&s) {
                return Err(self.bad_partition(format!(
                    "cap {s} is nested inside a union"
                )));
            }
            let plane = self.plane_of(reg, s)?;
            let along = plane.normal().dot(axis);
            let id = SignedSurface::new(s.id())
                .ok_or_else(|| self.bad_partition("surface 0 in surround".into()))?;
            let cut = Cut {
                position: plane.position_along(axis),
                above: if along > 0.0 { id } else { -id },
            };
            // the cap keeps the side above its plane: a floor
            if (along > 0.0) == s.is_positive() {
                floors.push(cut);
            } else {
                ceilings.push(cut);
            }
        }
        Ok((floors, ceilings))
    }

    fn bad_partition(&self, reason: String) -> crate::error::BeamcsgError {
        ZoneError::InvalidPartition {
            zone: self.name.clone(),
            reason,
        }
        .into()
    }
}
