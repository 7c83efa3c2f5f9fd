use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::error::{RegistryError, Result};
use crate::geometry::{Sense, SurfaceKind};
use crate::math::{Point3, MATCH_TOL};
use crate::rule::{HeadRule, RuleParser, SignedSurface};

/// Spacing between surface blocks handed out by [`SurfaceRegistry::reserve_block`].
pub const BLOCK_SIZE: i32 = 10_000;

/// Owns every surface of the model and maps requested surface numbers onto
/// registered signed surfaces.
///
/// Components reserve a block and register their surfaces at
/// `base + offset`. When a new surface coincides with an already registered
/// one (or with its reverse) no new surface is stored: the requested number
/// becomes an alias of the existing signed surface. Adjacent components that
/// build their shared face independently therefore end up on the same id.
#[derive(Debug)]
pub struct SurfaceRegistry {
    surfaces: BTreeMap<i32, SurfaceKind>,
    aliases: HashMap<i32, SignedSurface>,
    next_block: i32,
    tolerance: f64,
}

impl Default for SurfaceRegistry {
    fn default() -> Self {
        Self {
            surfaces: BTreeMap::new(),
            aliases: HashMap::new(),
            next_block: BLOCK_SIZE,
            tolerance: MATCH_TOL,
        }
    }
}

impl SurfaceRegistry {
    /// Creates a new, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a fresh block of surface numbers and returns its base.
    ///
    /// # Errors
    ///
    /// Returns an error once the surface number range is used up.
    pub fn reserve_block(&mut self) -> Result<i32> {
        let base = self.next_block;
        self.next_block = base
            .checked_add(BLOCK_SIZE)
            .ok_or(RegistryError::BlocksExhausted)?;
        Ok(base)
    }

    /// Registers `surface` under the requested number.
    ///
    /// Returns the signed surface the number resolves to: the number itself
    /// for a new surface, or an existing surface (possibly negated) when an
    /// equivalent one is already registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested number is not positive or has been
    /// registered before.
    pub fn add(&mut self, requested: i32, surface: impl Into<SurfaceKind>) -> Result<SignedSurface> {
        if requested <= 0 || self.aliases.contains_key(&requested) {
            return Err(RegistryError::DuplicateSurface(requested).into());
        }
        let surface = surface.into();

        for (&id, existing) in &self.surfaces {
            if let Some(sense) = existing.matches(&surface, self.tolerance) {
                let resolved = SignedSurface::new(id)
                    .ok_or(RegistryError::SurfaceNotFound(id))?;
                let resolved = match sense {
                    Sense::Same => resolved,
                    Sense::Reversed => -resolved,
                };
                debug!(requested, %resolved, "surface merged onto existing surface");
                self.aliases.insert(requested, resolved);
                return Ok(resolved);
            }
        }

        let signed =
            SignedSurface::new(requested).ok_or(RegistryError::SurfaceNotFound(requested))?;
        self.surfaces.insert(requested, surface);
        self.aliases.insert(requested, signed);
        Ok(signed)
    }

    /// Resolves a requested number (with sign) to the registered signed surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the number was never registered.
    pub fn resolve(&self, requested: SignedSurface) -> Result<SignedSurface> {
        self.aliases
            .get(&requested.id())
            .map(|s| s.signed_by(requested))
            .ok_or_else(|| RegistryError::SurfaceNotFound(requested.id()).into())
    }

    /// Returns the registered surface with the given id.
    ///
    /// # Errors
    ///
    /// Returns an error if no surface is stored under `id`.
    pub fn surface(&self, id: i32) -> Result<&SurfaceKind> {
        self.surfaces
            .get(&id)
            .ok_or_else(|| RegistryError::SurfaceNotFound(id).into())
    }

    /// Tests whether `point` lies strictly on the selected side of `s`.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is not registered.
    pub fn side(&self, s: SignedSurface, point: &Point3) -> Result<bool> {
        let value = self.surface(s.id())?.side_value(point);
        Ok(if s.is_positive() { value > 0.0 } else { value < 0.0 })
    }

    /// Builds a rule from an offset template such as `"1 -2 (7 : -17)"`.
    ///
    /// Each number `±n` is resolved as `±(base + n)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is malformed or an offset is not
    /// registered.
    pub fn rule(&self, base: i32, template: &str) -> Result<HeadRule> {
        RuleParser::new(template, |offset: SignedSurface| -> Result<SignedSurface> {
            let requested = base
                .checked_add(offset.id())
                .and_then(SignedSurface::new)
                .ok_or(RegistryError::SurfaceNotFound(base))?;
            self.resolve(requested.signed_by(offset))
        })
        .parse()
    }

    /// Number of distinct surfaces stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Iterates over the stored surfaces in id order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &SurfaceKind)> {
        self.surfaces.iter().map(|(&id, s)| (id, s))
    }
}
