use std::fmt;

use crate::error::Result;
use crate::math::{Point3, Vector3};
use crate::registry::SurfaceRegistry;

use super::SignedSurface;

/// A boolean expression over signed half-spaces describing a region of space.
///
/// The tree is kept normalized by every constructor: intersections never
/// directly contain intersections, unions never directly contain unions,
/// single-child nodes collapse to the child, and the identity elements are
/// folded away. Two rules are distinguished:
///
/// - the *universe* (empty intersection), all of space, written `""`;
/// - the *null* rule (empty union), no space at all, written `"#()"`.
///
/// Complement is pushed down to the leaves, so complementing twice gives back
/// the same tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeadRule {
    node: Node,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Node {
    Leaf(SignedSurface),
    And(Vec<Node>),
    Or(Vec<Node>),
}

impl Node {
    fn and(children: Vec<Node>) -> Node {
        let mut out = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Node::And(inner) => out.extend(inner),
                Node::Or(ref inner) if inner.is_empty() => return Node::Or(Vec::new()),
                other => out.push(other),
            }
        }
        if out.len() == 1 {
            out.pop().unwrap_or(Node::And(Vec::new()))
        } else {
            Node::And(out)
        }
    }

    fn or(children: Vec<Node>) -> Node {
        let mut out = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Node::Or(inner) => out.extend(inner),
                Node::And(ref inner) if inner.is_empty() => return Node::And(Vec::new()),
                other => out.push(other),
            }
        }
        if out.len() == 1 {
            out.pop().unwrap_or(Node::Or(Vec::new()))
        } else {
            Node::Or(out)
        }
    }

    fn complement(&self) -> Node {
        match self {
            Node::Leaf(s) => Node::Leaf(-*s),
            Node::And(cs) => Node::Or(cs.iter().map(Node::complement).collect()),
            Node::Or(cs) => Node::And(cs.iter().map(Node::complement).collect()),
        }
    }

    fn collect_surfaces(&self, out: &mut Vec<SignedSurface>) {
        match self {
            Node::Leaf(s) => {
                if !out.contains(s) {
                    out.push(*s);
                }
            }
            Node::And(cs) | Node::Or(cs) => {
                for c in cs {
                    c.collect_surfaces(out);
                }
            }
        }
    }

    fn substitute(&self, old: SignedSurface, new: SignedSurface) -> Node {
        match self {
            Node::Leaf(s) if *s == old => Node::Leaf(new),
            Node::Leaf(s) if *s == -old => Node::Leaf(-new),
            Node::Leaf(s) => Node::Leaf(*s),
            Node::And(cs) => Node::and(cs.iter().map(|c| c.substitute(old, new)).collect()),
            Node::Or(cs) => Node::or(cs.iter().map(|c| c.substitute(old, new)).collect()),
        }
    }

    fn remove_matched(
        &self,
        surfaces: &SurfaceRegistry,
        axis: &Vector3,
        tol: f64,
    ) -> Result<Option<Node>> {
        match self {
            Node::Leaf(s) => {
                if plane_matches_axis(surfaces, *s, axis, tol)? {
                    Ok(None)
                } else {
                    Ok(Some(Node::Leaf(*s)))
                }
            }
            Node::And(cs) => {
                let mut kept = Vec::with_capacity(cs.len());
                for c in cs {
                    if let Some(n) = c.remove_matched(surfaces, axis, tol)? {
                        kept.push(n);
                    }
                }
                Ok(Some(Node::and(kept)))
            }
            Node::Or(cs) => {
                let mut kept = Vec::with_capacity(cs.len());
                for c in cs {
                    if let Some(n) = c.remove_matched(surfaces, axis, tol)? {
                        kept.push(n);
                    }
                }
                Ok((!kept.is_empty()).then(|| Node::or(kept)))
            }
        }
    }

    fn simplify(&self) -> Node {
        match self {
            Node::Leaf(s) => Node::Leaf(*s),
            Node::And(cs) => {
                let children = match Node::and(cs.iter().map(Node::simplify).collect()) {
                    Node::And(flat) => dedupe(flat.into_iter()),
                    other => return other,
                };
                let leaves: Vec<SignedSurface> = leaf_set(&children);
                if leaves.iter().any(|s| leaves.contains(&-*s)) {
                    return Node::Or(Vec::new());
                }
                // a (a : b) == a
                let children = children
                    .into_iter()
                    .filter(|c| match c {
                        Node::Or(inner) => !inner
                            .iter()
                            .any(|n| matches!(n, Node::Leaf(s) if leaves.contains(s))),
                        _ => true,
                    })
                    .collect();
                Node::and(children)
            }
            Node::Or(cs) => {
                let children = match Node::or(cs.iter().map(Node::simplify).collect()) {
                    Node::Or(flat) => dedupe(flat.into_iter()),
                    other => return other,
                };
                let leaves: Vec<SignedSurface> = leaf_set(&children);
                if leaves.iter().any(|s| leaves.contains(&-*s)) {
                    return Node::And(Vec::new());
                }
                // a : (a b) == a
                let children = children
                    .into_iter()
                    .filter(|c| match c {
                        Node::And(inner) => !inner
                            .iter()
                            .any(|n| matches!(n, Node::Leaf(s) if leaves.contains(s))),
                        _ => true,
                    })
                    .collect();
                Node::or(children)
            }
        }
    }

    fn is_valid(&self, point: &Point3, surfaces: &SurfaceRegistry) -> Result<bool> {
        match self {
            Node::Leaf(s) => surfaces.side(*s, point),
            Node::And(cs) => {
                for c in cs {
                    if !c.is_valid(point, surfaces)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Node::Or(cs) => {
                for c in cs {
                    if c.is_valid(point, surfaces)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn leaf_count(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::And(cs) | Node::Or(cs) => cs.iter().map(Node::leaf_count).sum(),
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Leaf(s) => write!(f, "{s}"),
            Node::And(cs) => {
                for (i, c) in cs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    if matches!(c, Node::Or(_)) {
                        f.write_str("(")?;
                        c.write(f)?;
                        f.write_str(")")?;
                    } else {
                        c.write(f)?;
                    }
                }
                Ok(())
            }
            Node::Or(cs) if cs.is_empty() => f.write_str("#()"),
            Node::Or(cs) => {
                for (i, c) in cs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" : ")?;
                    }
                    c.write(f)?;
                }
                Ok(())
            }
        }
    }
}

fn dedupe(children: impl Iterator<Item = Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    for c in children {
        if !out.contains(&c) {
            out.push(c);
        }
    }
    out
}

fn leaf_set(children: &[Node]) -> Vec<SignedSurface> {
    children
        .iter()
        .filter_map(|c| match c {
            Node::Leaf(s) => Some(*s),
            _ => None,
        })
        .collect()
}

fn plane_matches_axis(
    surfaces: &SurfaceRegistry,
    s: SignedSurface,
    axis: &Vector3,
    tol: f64,
) -> Result<bool> {
    Ok(surfaces
        .surface(s.id())?
        .plane_normal()
        .is_some_and(|n| n.dot(axis).abs() >= 1.0 - tol))
}

impl HeadRule {
    /// All of space.
    #[must_use]
    pub fn universe() -> Self {
        Self {
            node: Node::And(Vec::new()),
        }
    }

    /// The empty region.
    #[must_use]
    pub fn null() -> Self {
        Self {
            node: Node::Or(Vec::new()),
        }
    }

    /// A single half-space.
    #[must_use]
    pub fn surface(s: SignedSurface) -> Self {
        Self {
            node: Node::Leaf(s),
        }
    }

    /// Intersection of the given half-spaces (universe when empty).
    #[must_use]
    pub fn from_surfaces(surfaces: impl IntoIterator<Item = SignedSurface>) -> Self {
        Self {
            node: Node::and(surfaces.into_iter().map(Node::Leaf).collect()),
        }
    }

    /// Intersection of several rules.
    #[must_use]
    pub fn intersect_all<'a>(rules: impl IntoIterator<Item = &'a HeadRule>) -> Self {
        Self {
            node: Node::and(rules.into_iter().map(|r| r.node.clone()).collect()),
        }
    }

    /// Union of several rules.
    #[must_use]
    pub fn unite_all<'a>(rules: impl IntoIterator<Item = &'a HeadRule>) -> Self {
        Self {
            node: Node::or(rules.into_iter().map(|r| r.node.clone()).collect()),
        }
    }

    /// Returns `self ∩ other`.
    #[must_use]
    pub fn intersect(&self, other: &HeadRule) -> Self {
        Self {
            node: Node::and(vec![self.node.clone(), other.node.clone()]),
        }
    }

    /// Returns `self ∪ other`.
    #[must_use]
    pub fn unite(&self, other: &HeadRule) -> Self {
        Self {
            node: Node::or(vec![self.node.clone(), other.node.clone()]),
        }
    }

    /// Returns the complement, with negation pushed to the leaves.
    #[must_use]
    pub fn complement(&self) -> Self {
        Self {
            node: self.node.complement(),
        }
    }

    /// Returns `self ∩ complement(other)`.
    #[must_use]
    pub fn exclude(&self, other: &HeadRule) -> Self {
        self.intersect(&other.complement())
    }

    /// Drops every plane whose normal is parallel or antiparallel to `axis`.
    ///
    /// A removed term is neutral in its parent: it disappears from an
    /// intersection, and a union that loses all of its terms disappears too.
    ///
    /// # Errors
    ///
    /// Returns an error if a surface of the rule is not registered.
    pub fn remove_matched_planes(
        &self,
        surfaces: &SurfaceRegistry,
        axis: &Vector3,
        tol: f64,
    ) -> Result<Self> {
        let axis = axis.normalize();
        let node = self
            .node
            .remove_matched(surfaces, &axis, tol)?
            .unwrap_or(Node::And(Vec::new()));
        Ok(Self { node })
    }

    /// Lists the plane terms whose normal is parallel or antiparallel to `axis`.
    ///
    /// # Errors
    ///
    /// Returns an error if a surface of the rule is not registered.
    pub fn matched_planes(
        &self,
        surfaces: &SurfaceRegistry,
        axis: &Vector3,
        tol: f64,
    ) -> Result<Vec<SignedSurface>> {
        let axis = axis.normalize();
        let mut out = Vec::new();
        for s in self.surfaces() {
            if plane_matches_axis(surfaces, s, &axis, tol)? {
                out.push(s);
            }
        }
        Ok(out)
    }

    /// Replaces `old` by `new` (and `-old` by `-new`) throughout the tree.
    #[must_use]
    pub fn substitute_surface(&self, old: SignedSurface, new: SignedSurface) -> Self {
        Self {
            node: self.node.substitute(old, new),
        }
    }

    /// Removes duplicate terms, folds `s -s` to null and `s : -s` to the
    /// universe, and applies absorption against directly contained leaves.
    #[must_use]
    pub fn simplify(&self) -> Self {
        Self {
            node: self.node.simplify(),
        }
    }

    /// Tests whether `point` lies strictly inside the region.
    ///
    /// # Errors
    ///
    /// Returns an error if a surface of the rule is not registered.
    pub fn is_valid(&self, point: &Point3, surfaces: &SurfaceRegistry) -> Result<bool> {
        self.node.is_valid(point, surfaces)
    }

    /// Distinct signed surfaces in first-appearance order.
    #[must_use]
    pub fn surfaces(&self) -> Vec<SignedSurface> {
        let mut out = Vec::new();
        self.node.collect_surfaces(&mut out);
        out
    }

    /// Leaves that are direct terms of the top-level intersection.
    #[must_use]
    pub fn top_level_surfaces(&self) -> Vec<SignedSurface> {
        match &self.node {
            Node::Leaf(s) => vec![*s],
            Node::And(cs) => leaf_set(cs),
            Node::Or(_) => Vec::new(),
        }
    }

    /// Whether the signed surface appears anywhere in the tree.
    #[must_use]
    pub fn contains(&self, s: SignedSurface) -> bool {
        self.surfaces().contains(&s)
    }

    /// Returns the surface if the rule is a single half-space.
    #[must_use]
    pub fn as_surface(&self) -> Option<SignedSurface> {
        match self.node {
            Node::Leaf(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_universe(&self) -> bool {
        matches!(&self.node, Node::And(cs) if cs.is_empty())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(&self.node, Node::Or(cs) if cs.is_empty())
    }

    /// Whether the top level is a union of two or more terms.
    #[must_use]
    pub fn is_union(&self) -> bool {
        matches!(&self.node, Node::Or(cs) if !cs.is_empty())
    }

    /// Number of leaves in the tree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.node.leaf_count()
    }
}

impl Default for HeadRule {
    fn default() -> Self {
        Self::universe()
    }
}

impl From<SignedSurface> for HeadRule {
    fn from(s: SignedSurface) -> Self {
        Self::surface(s)
    }
}

impl fmt::Display for HeadRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.node.write(f)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn s(v: i32) -> SignedSurface {
        SignedSurface::new(v).unwrap()
    }

    fn leaf(v: i32) -> HeadRule {
        HeadRule::surface(s(v))
    }

    #[test]
    fn intersection_flattens() {
        let r = leaf(1).intersect(&leaf(-2)).intersect(&leaf(3));
        assert_eq!(r.to_string(), "1 -2 3");
    }

    #[test]
    fn union_inside_intersection_is_parenthesised() {
        let r = leaf(1).intersect(&leaf(2).unite(&leaf(3)));
        assert_eq!(r.to_string(), "1 (2 : 3)");
    }

    #[test]
    fn intersection_inside_union_relies_on_precedence() {
        let r = leaf(1).intersect(&leaf(2)).unite(&leaf(-3));
        assert_eq!(r.to_string(), "1 2 : -3");
    }

    #[test]
    fn complement_applies_de_morgan() {
        let r = leaf(1).intersect(&leaf(2).unite(&leaf(3)));
        assert_eq!(r.complement().to_string(), "-1 : -2 -3");
    }

    #[test]
    fn double_complement_is_identity() {
        let r = leaf(1).intersect(&leaf(-2).unite(&leaf(3).intersect(&leaf(4))));
        assert_eq!(r.complement().complement(), r);
    }

    #[test]
    fn identity_elements_fold() {
        let r = leaf(5);
        assert_eq!(r.intersect(&HeadRule::universe()), r);
        assert_eq!(r.unite(&HeadRule::null()), r);
        assert!(r.intersect(&HeadRule::null()).is_null());
        assert!(r.unite(&HeadRule::universe()).is_universe());
    }

    #[test]
    fn universe_and_null_are_complements() {
        assert!(HeadRule::universe().complement().is_null());
        assert!(HeadRule::null().complement().is_universe());
        assert_eq!(HeadRule::universe().to_string(), "");
        assert_eq!(HeadRule::null().to_string(), "#()");
    }

    #[test]
    fn simplify_detects_contradiction() {
        let r = leaf(1).intersect(&leaf(2)).intersect(&leaf(-1));
        assert!(r.simplify().is_null());
    }

    #[test]
    fn simplify_detects_tautology() {
        let r = leaf(4).unite(&leaf(-4));
        assert!(r.simplify().is_universe());
    }

    #[test]
    fn simplify_removes_duplicates_and_absorbs() {
        let r = leaf(1)
            .intersect(&leaf(2))
            .intersect(&leaf(1))
            .intersect(&leaf(1).unite(&leaf(7)));
        assert_eq!(r.simplify().to_string(), "1 2");
    }

    #[test]
    fn substitute_keeps_orientation() {
        let r = leaf(3).intersect(&leaf(-3).unite(&leaf(4)));
        let out = r.substitute_surface(s(3), s(-9));
        assert_eq!(out.to_string(), "-9 (9 : 4)");
    }

    #[test]
    fn surfaces_in_first_appearance_order() {
        let r = leaf(7).intersect(&leaf(-2).unite(&leaf(7)));
        assert_eq!(r.surfaces(), vec![s(7), s(-2)]);
        assert_eq!(r.top_level_surfaces(), vec![s(7)]);
        assert_eq!(r.leaf_count(), 3);
    }

    #[test]
    fn from_surfaces_builds_intersection() {
        let r = HeadRule::from_surfaces([s(1), s(-2)]);
        assert_eq!(r.to_string(), "1 -2");
        assert!(HeadRule::from_surfaces([]).is_universe());
        assert_eq!(HeadRule::from_surfaces([s(8)]).as_surface(), Some(s(8)));
    }
}
