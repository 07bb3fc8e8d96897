//! Dependency keys: what kind of thing, named what.
//!
//! A [`DepKey`] identifies a declaration independently of which file currently
//! defines it -- the same key read from two different file states must compare
//! equal. Keys are immutable values built from interned handles.

use std::cmp::Ordering;

use crate::intern::SymbolTable;
use crate::Symbol;

/// Whether a dependency is on a declaration's interface or its implementation.
///
/// An interface-level change (signature, layout) invalidates users; an
/// implementation-level change only invalidates clients that inline or
/// otherwise see through the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Aspect {
    /// The externally visible surface of the declaration.
    Interface,
    /// The declaration's body.
    Implementation,
}

impl Aspect {
    fn label(self) -> &'static str {
        match self {
            Aspect::Interface => "interface",
            Aspect::Implementation => "implementation",
        }
    }
}

/// Names the entity a key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Designator {
    /// A top-level value or function.
    TopLevel { name: Symbol },
    /// A nominal type (struct, enum, class, protocol).
    Nominal { name: Symbol },
    /// A member of a nominal type.
    Member { container: Symbol, member: Symbol },
}

impl Designator {
    /// Discriminant rank used by the total order.
    fn rank(self) -> u8 {
        match self {
            Designator::TopLevel { .. } => 0,
            Designator::Nominal { .. } => 1,
            Designator::Member { .. } => 2,
        }
    }
}

/// An immutable dependency key: `{ aspect, designator }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepKey {
    pub aspect: Aspect,
    pub designator: Designator,
}

impl DepKey {
    pub fn new(aspect: Aspect, designator: Designator) -> Self {
        DepKey { aspect, designator }
    }

    /// Shorthand for a top-level key.
    pub fn top_level(aspect: Aspect, name: Symbol) -> Self {
        DepKey::new(aspect, Designator::TopLevel { name })
    }

    /// Shorthand for a nominal-type key.
    pub fn nominal(aspect: Aspect, name: Symbol) -> Self {
        DepKey::new(aspect, Designator::Nominal { name })
    }

    /// Shorthand for a member key.
    pub fn member(aspect: Aspect, container: Symbol, member: Symbol) -> Self {
        DepKey::new(aspect, Designator::Member { container, member })
    }

    /// Total order over keys: aspect, then designator kind, then names by
    /// resolved-string order. Used for deterministic serialization and dumps.
    pub fn cmp_using(&self, other: &DepKey, table: &SymbolTable) -> Ordering {
        self.aspect
            .cmp(&other.aspect)
            .then_with(|| self.designator.rank().cmp(&other.designator.rank()))
            .then_with(|| match (self.designator, other.designator) {
                (
                    Designator::TopLevel { name: a },
                    Designator::TopLevel { name: b },
                )
                | (Designator::Nominal { name: a }, Designator::Nominal { name: b }) => {
                    table.cmp_symbols(a, b)
                }
                (
                    Designator::Member {
                        container: ca,
                        member: ma,
                    },
                    Designator::Member {
                        container: cb,
                        member: mb,
                    },
                ) => table
                    .cmp_symbols(ca, cb)
                    .then_with(|| table.cmp_symbols(ma, mb)),
                // Ranks already matched, so mixed variants are unreachable.
                _ => Ordering::Equal,
            })
    }

    /// Human-readable rendering for diagnostics.
    pub fn describe(&self, table: &SymbolTable) -> String {
        let entity = match self.designator {
            Designator::TopLevel { name } => format!("top-level '{}'", table.resolve(name)),
            Designator::Nominal { name } => format!("type '{}'", table.resolve(name)),
            Designator::Member { container, member } => format!(
                "member '{}.{}'",
                table.resolve(container),
                table.resolve(member)
            ),
        };
        format!("{} {}", self.aspect.label(), entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_from_interned_names_compare_equal() {
        let mut table = SymbolTable::new();
        let a = DepKey::top_level(Aspect::Interface, table.intern("f"));
        let b = DepKey::top_level(Aspect::Interface, table.intern("f"));
        assert_eq!(a, b);
    }

    #[test]
    fn aspect_dominates_ordering() {
        let mut table = SymbolTable::new();
        let zzz = DepKey::top_level(Aspect::Interface, table.intern("zzz"));
        let aaa = DepKey::top_level(Aspect::Implementation, table.intern("aaa"));
        assert_eq!(zzz.cmp_using(&aaa, &table), Ordering::Less);
    }

    #[test]
    fn designator_rank_orders_kinds() {
        let mut table = SymbolTable::new();
        let name = table.intern("m");
        let top = DepKey::top_level(Aspect::Interface, name);
        let nominal = DepKey::nominal(Aspect::Interface, name);
        let member = DepKey::member(Aspect::Interface, name, name);
        assert_eq!(top.cmp_using(&nominal, &table), Ordering::Less);
        assert_eq!(nominal.cmp_using(&member, &table), Ordering::Less);
    }

    #[test]
    fn names_compare_by_string() {
        let mut table = SymbolTable::new();
        // Inserted out of lexicographic order on purpose.
        let b = DepKey::nominal(Aspect::Interface, table.intern("Banana"));
        let a = DepKey::nominal(Aspect::Interface, table.intern("Apple"));
        assert_eq!(a.cmp_using(&b, &table), Ordering::Less);
    }

    #[test]
    fn member_ordering_uses_container_then_member() {
        let mut table = SymbolTable::new();
        let pt = table.intern("Point");
        let x = table.intern("x");
        let y = table.intern("y");
        let px = DepKey::member(Aspect::Interface, pt, x);
        let py = DepKey::member(Aspect::Interface, pt, y);
        assert_eq!(px.cmp_using(&py, &table), Ordering::Less);
        assert_eq!(py.cmp_using(&px, &table), Ordering::Greater);
        assert_eq!(px.cmp_using(&px, &table), Ordering::Equal);
    }

    #[test]
    fn describe_is_readable() {
        let mut table = SymbolTable::new();
        let key = DepKey::member(Aspect::Implementation, table.intern("Point"), table.intern("x"));
        assert_eq!(key.describe(&table), "implementation member 'Point.x'");
    }
}
